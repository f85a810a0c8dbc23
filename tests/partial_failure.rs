//! Partial-failure isolation: one malformed rule never takes down the
//! document. Three good rules plus one bad rule parse to exactly three rules
//! and one error, in every format.

use fabula::{parse, Format, Location};

#[test]
fn insimul_partial_failure() {
    let src = r#"
rule first { priority: 5 }

rule broken { when ( 42( ) priority: 5 }

rule second { when ( calm(X) ) priority: 4 }

tracery third { priority: 1 }
"#;
    let doc = parse(src, Format::Insimul).unwrap();
    assert_eq!(doc.rules.len(), 3);
    assert_eq!(doc.errors.len(), 1);
    let names: Vec<&str> = doc.rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["first", "second", "third"]);
    assert!(matches!(doc.errors[0].location, Location::Line(4)));
    assert_eq!(doc.errors[0].format, Format::Insimul);
}

#[test]
fn ensemble_partial_failure() {
    let src = r#"{
        "triggerRules": {
            "rules": [
                {"name": "a"},
                {"name": "b", "conditions": [{"type": "calm", "first": "X"}]},
                {"name": "broken", "conditions": [{"operator": "~", "first": "x", "value": 1}]},
                {"name": "c"}
            ]
        }
    }"#;
    let doc = parse(src, Format::Ensemble).unwrap();
    assert_eq!(doc.rules.len(), 3);
    assert_eq!(doc.errors.len(), 1);
    assert!(doc.errors[0].to_string().contains("triggerRules.rules[2]"));
}

#[test]
fn kismet_partial_failure() {
    let src = "\
default trait calm(X): placid(X). likelihood: 0.9
pattern feud: proud(X) -> rivalry(X, Y).
default trait broken(X): placid(X) likelihood 0.9
seek(X) :- lonely(X). weight: 0.5
";
    let doc = parse(src, Format::Kismet).unwrap();
    assert_eq!(doc.rules.len(), 3);
    assert_eq!(doc.errors.len(), 1);
    assert!(matches!(doc.errors[0].location, Location::Line(3)));
}

#[test]
fn tott_partial_failure() {
    let src = r#"{
        "trigger_rules": [
            {"name": "a", "type": "trigger"},
            {"name": "b", "type": "trigger"}
        ],
        "character_rules": [
            {"type": "trait"},
            {"name": "d", "type": "character"}
        ]
    }"#;
    let doc = parse(src, Format::Tott).unwrap();
    assert_eq!(doc.rules.len(), 3);
    assert_eq!(doc.errors.len(), 1);
    assert!(doc.errors[0].to_string().contains("character_rules[0]"));
}

#[test]
fn unreadable_json_document_is_fatal() {
    assert!(parse("][", Format::Ensemble).is_err());
    assert!(parse("][", Format::Tott).is_err());
}

#[test]
fn imported_of_attempted_counts() {
    let src = "\
default trait calm(X): placid(X). likelihood: 0.9
garbage line one
garbage line two
";
    let doc = parse(src, Format::Kismet).unwrap();
    assert_eq!(doc.imported(), 1);
    assert_eq!(doc.attempted(), 3);
}

#[test]
fn all_bad_document_can_be_treated_as_empty() {
    let doc = parse("garbage\nmore garbage\n", Format::Kismet).unwrap();
    let err = doc.require_rules().unwrap_err();
    assert_eq!(err.format, Format::Kismet);
    assert_eq!(err.attempted, 2);
    assert!(err.to_string().contains("no valid rules"));
}

#[test]
fn empty_source_is_empty_not_error() {
    let doc = parse("", Format::Insimul).unwrap();
    assert_eq!(doc.attempted(), 0);
    assert!(doc.require_rules().is_err());
}
