//! The Insimul block grammar: parser and generator side by side.
//!
//! ```text
//! (rule|pattern|genealogy|tracery) <name> {
//!     when ( <condition>* )
//!     then { <effect>* }
//!     priority: <int>
//!     likelihood: <float>
//!     tags: [ "tag" ... ]
//! }
//! ```
//!
//! `when`, `then`, `likelihood` and `tags` are optional; `#` starts a line
//! comment. The keyword table is not injective (`trigger`, `social` and
//! `relationship` all render as `rule`), so the generator records the
//! collapsed type in a `type:` tag that the parser lifts back out into
//! [`Provenance`](crate::Provenance).

use winnow::ascii::{dec_int, till_line_ending};
use winnow::combinator::{alt, cut_err, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::error::ParseError;
use crate::formats::{Format, GeneratedDocument, ParsedDocument, Warning};
use crate::types::{
    clamp_likelihood, ActionRef, CharacterRef, CompareOp, Condition, Effect, Parameters, Rule,
    RuleType, Value, DEFAULT_LIKELIHOOD,
};

/// Tag prefix used as the side channel for collapsed rule types.
const TYPE_TAG_PREFIX: &str = "type:";

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    'r' => s.push('\r'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn number(input: &mut &str) -> ModalResult<Value> {
    let text = (
        opt('-'),
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .parse_next(input)?;
    if text.contains('.') {
        let f: f64 = text.parse().map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Float(f))
    } else {
        let i: i64 = text.parse().map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Int(i))
    }
}

/// `true`/`false` parsed as whole words so identifiers like `truthy` are
/// left for the caller.
fn bool_word(input: &mut &str) -> ModalResult<Value> {
    let word = ident.parse_next(input)?;
    match word {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Err(ErrMode::from_input(input)),
    }
}

fn literal_value(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    alt((string_literal.map(Value::String), number, bool_word))
        .context(StrContext::Expected(StrContextValue::Description("value")))
        .parse_next(input)
}

fn float_literal(input: &mut &str) -> ModalResult<f64> {
    ws.parse_next(input)?;
    take_while(1.., |c: char| c.is_ascii_digit() || c == '.' || c == '-')
        .try_map(str::parse::<f64>)
        .parse_next(input)
}

// -- Conditions -------------------------------------------------------------

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        "==".value(CompareOp::Equals),
        ">".value(CompareOp::Greater),
        "<".value(CompareOp::Less),
    ))
    .parse_next(input)
}

/// `( operand [, operand] )`
fn atom_args(input: &mut &str) -> ModalResult<(String, Option<String>)> {
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let first = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description("operand")))
        .parse_next(input)?
        .to_owned();
    let second = opt(preceded((ws, ',', ws), ident))
        .parse_next(input)?
        .map(str::to_owned);
    ws.parse_next(input)?;
    cut_err(')').parse_next(input)?;
    Ok((first, second))
}

fn condition(input: &mut &str) -> ModalResult<Condition> {
    ws.parse_next(input)?;
    if opt('!').parse_next(input)?.is_some() {
        let predicate = cut_err(ident)
            .context(StrContext::Expected(StrContextValue::Description(
                "predicate after '!'",
            )))
            .parse_next(input)?
            .to_owned();
        let (first, second) = cut_err(atom_args).parse_next(input)?;
        return Ok(Condition::Predicate {
            predicate,
            first,
            second,
            negated: true,
        });
    }

    let name = ident.parse_next(input)?.to_owned();
    let checkpoint = input.checkpoint();
    if let Some(operator) = opt(compare_op).parse_next(input)? {
        let value = cut_err(literal_value).parse_next(input)?;
        return Ok(Condition::Comparison {
            first: name,
            operator,
            value,
        });
    }
    input.reset(&checkpoint);
    let (first, second) = atom_args.parse_next(input)?;
    Ok(Condition::Predicate {
        predicate: name,
        first,
        second,
        negated: false,
    })
}

fn condition_list(input: &mut &str) -> ModalResult<Vec<Condition>> {
    repeat(0.., terminated(condition, opt((ws, ',')))).parse_next(input)
}

// -- Effects ----------------------------------------------------------------

fn effect_kind<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    terminated(
        alt(("set", "modify", "relate", "trigger")),
        take_while(1.., |c: char| c.is_ascii_whitespace()),
    )
    .parse_next(input)
}

fn effect_value(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    alt((
        string_literal.map(Value::String),
        number,
        ident.map(|s: &str| match s {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => Value::String(other.to_owned()),
        }),
    ))
    .parse_next(input)
}

// The `set`, `modify` and `trigger` keywords require the second call
// argument.
fn required_value(value: Option<Value>, input: &mut &str) -> ModalResult<Value> {
    value.ok_or_else(|| ErrMode::from_input(input).cut())
}

fn effect(input: &mut &str) -> ModalResult<Effect> {
    ws.parse_next(input)?;
    let kind = opt(effect_kind).parse_next(input)?;
    let action = ident.parse_next(input)?.to_owned();
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let target = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description("target")))
        .parse_next(input)?
        .to_owned();
    let value = opt(preceded((ws, ','), effect_value)).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err(')').parse_next(input)?;

    Ok(match kind {
        Some("set") => Effect::Set {
            action,
            target,
            value: required_value(value, input)?,
            parameters: Parameters::new(),
        },
        Some("modify") => Effect::Modify {
            action,
            target,
            value: required_value(value, input)?,
            parameters: Parameters::new(),
        },
        Some("relate") => Effect::CreateRelationship {
            action,
            target,
            value,
        },
        Some("trigger") => Effect::TriggerEvent {
            action,
            target,
            value: required_value(value, input)?,
            parameters: Parameters::new(),
        },
        _ => Effect::Generic {
            action,
            target,
            value,
            parameters: Parameters::new(),
        },
    })
}

fn effect_list(input: &mut &str) -> ModalResult<Vec<Effect>> {
    repeat(0.., terminated(effect, opt((ws, ',')))).parse_next(input)
}

// -- Rule blocks ------------------------------------------------------------

fn keyword_to_type(keyword: &str) -> RuleType {
    match keyword {
        "pattern" => RuleType::Pattern,
        "genealogy" => RuleType::Genealogy,
        "tracery" => RuleType::Default,
        _ => RuleType::Trigger,
    }
}

fn when_block(input: &mut &str) -> ModalResult<Vec<Condition>> {
    (ws, "when", ws, '(').parse_next(input)?;
    let conditions = condition_list.parse_next(input)?;
    (ws, cut_err(')')).parse_next(input)?;
    Ok(conditions)
}

fn then_block(input: &mut &str) -> ModalResult<Vec<Effect>> {
    (ws, "then", ws, '{').parse_next(input)?;
    let effects = effect_list.parse_next(input)?;
    (ws, cut_err('}')).parse_next(input)?;
    Ok(effects)
}

fn tags_list(input: &mut &str) -> ModalResult<Vec<String>> {
    (ws, "tags", ws, ':', ws, '[').parse_next(input)?;
    let tags: Vec<String> =
        repeat(0.., terminated(preceded(ws, string_literal), opt((ws, ',')))).parse_next(input)?;
    (ws, cut_err(']')).parse_next(input)?;
    Ok(tags)
}

fn rule_block(input: &mut &str) -> ModalResult<Rule> {
    ws.parse_next(input)?;
    let keyword = alt(("rule", "pattern", "genealogy", "tracery"))
        .context(StrContext::Expected(StrContextValue::Description(
            "rule keyword",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "rule name",
        )))
        .parse_next(input)?
        .to_owned();
    ws.parse_next(input)?;
    cut_err('{').parse_next(input)?;

    let conditions = opt(when_block).parse_next(input)?.unwrap_or_default();
    let effects = opt(then_block).parse_next(input)?.unwrap_or_default();

    (ws, cut_err("priority"), ws, cut_err(':'), ws)
        .context(StrContext::Expected(StrContextValue::Description(
            "priority line",
        )))
        .parse_next(input)?;
    let priority: i64 = cut_err(dec_int::<_, i64, _>).parse_next(input)?;

    let likelihood = opt(preceded((ws, "likelihood", ws, ':'), cut_err(float_literal)))
        .parse_next(input)?
        .unwrap_or(DEFAULT_LIKELIHOOD);

    let raw_tags = opt(tags_list).parse_next(input)?.unwrap_or_default();

    ws.parse_next(input)?;
    cut_err('}').parse_next(input)?;

    let rule_type = keyword_to_type(keyword);
    let conditions = if rule_type == RuleType::Genealogy {
        conditions.into_iter().map(genealogize).collect()
    } else {
        conditions
    };

    let mut rule = Rule::new(name, rule_type);
    rule.conditions = conditions;
    rule.effects = effects;
    rule.priority = priority;
    rule.likelihood = clamp_likelihood(likelihood);
    for tag in raw_tags {
        if let Some(original) = tag.strip_prefix(TYPE_TAG_PREFIX) {
            if rule.provenance.is_none() {
                rule = rule.with_provenance(RuleType::from(original));
                continue;
            }
        }
        rule = rule.with_tag(tag);
    }
    Ok(rule)
}

/// Inside a `genealogy` block, two-operand atoms are relations.
fn genealogize(condition: Condition) -> Condition {
    match condition {
        Condition::Predicate {
            predicate,
            first,
            second: Some(second),
            negated: false,
        } => Condition::Genealogy {
            relation: predicate,
            first,
            second,
        },
        other => other,
    }
}

// -- Document parsing with block recovery -----------------------------------

fn reason_of(err: ErrMode<ContextError>) -> String {
    match err {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => {
            let msg = e.to_string();
            if msg.trim().is_empty() {
                "malformed rule block".to_owned()
            } else {
                msg
            }
        }
        ErrMode::Incomplete(_) => "incomplete rule block".to_owned(),
    }
}

/// Skip past the block that failed to parse: to the close of its brace pair
/// if one opens, otherwise to the next line.
fn skip_block(input: &str) -> &str {
    let mut depth = 0usize;
    let mut opened = false;
    for (i, ch) in input.char_indices() {
        match ch {
            '{' => {
                depth += 1;
                opened = true;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if opened && depth == 0 {
                    return &input[i + ch.len_utf8()..];
                }
            }
            '\n' if !opened => return &input[i + 1..],
            _ => {}
        }
    }
    ""
}

pub(crate) fn parse(source: &str) -> ParsedDocument {
    let mut rules = Vec::new();
    let mut errors = Vec::new();
    let mut input = source;
    loop {
        let _ = ws.parse_next(&mut input);
        if input.is_empty() {
            break;
        }
        let block_start = input;
        match rule_block.parse_next(&mut input) {
            Ok(rule) => rules.push(rule),
            Err(err) => {
                let offset = source.len() - block_start.len();
                let line = source[..offset].matches('\n').count() + 1;
                errors.push(ParseError::at_line(Format::Insimul, line, reason_of(err)));
                input = skip_block(block_start);
            }
        }
    }
    ParsedDocument {
        format: Format::Insimul,
        rules,
        errors,
    }
}

// -- Generation -------------------------------------------------------------

/// The keyword a canonical type renders as, and whether the rendering
/// collapses the type (requiring the `type:` tag side channel).
fn keyword_for(rule_type: &RuleType) -> (&'static str, bool) {
    match rule_type {
        RuleType::Trigger => ("rule", false),
        RuleType::Pattern => ("pattern", false),
        RuleType::Genealogy => ("genealogy", false),
        RuleType::Default => ("tracery", false),
        RuleType::Social
        | RuleType::Relationship
        | RuleType::Trait
        | RuleType::Volition
        | RuleType::Other(_) => ("rule", true),
    }
}

fn fmt_float(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn render_condition(condition: &Condition) -> String {
    match condition {
        Condition::Predicate {
            predicate,
            first,
            second,
            negated,
        } => {
            let bang = if *negated { "!" } else { "" };
            match second {
                Some(second) => format!("{bang}{predicate}({first}, {second})"),
                None => format!("{bang}{predicate}({first})"),
            }
        }
        Condition::Comparison {
            first,
            operator,
            value,
        } => format!("{first} {} {}", operator.symbol(), value.to_literal()),
        Condition::Genealogy {
            relation,
            first,
            second,
        } => format!("{relation}({first}, {second})"),
    }
}

fn render_effect(effect: &Effect) -> String {
    let call = |action: &str, target: &str, value: Option<&Value>| match value {
        Some(v) => format!("{action}({target}, {})", v.to_literal()),
        None => format!("{action}({target})"),
    };
    match effect {
        Effect::Set { action, target, value, .. } => {
            format!("set {}", call(action, target, Some(value)))
        }
        Effect::Modify { action, target, value, .. } => {
            format!("modify {}", call(action, target, Some(value)))
        }
        Effect::CreateRelationship { action, target, value } => {
            format!("relate {}", call(action, target, value.as_ref()))
        }
        Effect::TriggerEvent { action, target, value, .. } => {
            format!("trigger {}", call(action, target, Some(value)))
        }
        Effect::Generic { action, target, value, .. } => {
            call(action, target, value.as_ref())
        }
    }
}

fn render_rule(out: &mut String, rule: &Rule, warnings: &mut Vec<Warning>) {
    let effective = rule.effective_type().clone();
    let (keyword, collapsed) = keyword_for(&effective);
    if collapsed
        && !matches!(
            effective,
            RuleType::Social | RuleType::Relationship
        )
    {
        warnings.push(Warning::UnsupportedRuleType {
            rule: rule.name.clone(),
            rule_type: effective.clone(),
            rendered_as: "rule",
        });
    }

    out.push_str(&format!("{keyword} {} {{\n", rule.name));
    if !rule.conditions.is_empty() {
        out.push_str("    when (\n");
        for condition in &rule.conditions {
            out.push_str(&format!("        {}\n", render_condition(condition)));
        }
        out.push_str("    )\n");
    }
    if !rule.effects.is_empty() {
        out.push_str("    then {\n");
        for effect in &rule.effects {
            out.push_str(&format!("        {}\n", render_effect(effect)));
        }
        out.push_str("    }\n");
    }
    out.push_str(&format!("    priority: {}\n", rule.priority));

    let likelihood = clamp_likelihood(rule.likelihood);
    if (likelihood - rule.likelihood).abs() > f64::EPSILON {
        warnings.push(Warning::LikelihoodClamped {
            rule: rule.name.clone(),
            value: rule.likelihood,
        });
    }
    if likelihood != DEFAULT_LIKELIHOOD {
        out.push_str(&format!("    likelihood: {}\n", fmt_float(likelihood)));
    }

    let mut tags: Vec<String> = rule.tags.clone();
    if collapsed {
        tags.push(format!("{TYPE_TAG_PREFIX}{effective}"));
    }
    if !tags.is_empty() {
        let rendered: Vec<String> = tags
            .iter()
            .map(|t| Value::String(t.clone()).to_literal())
            .collect();
        out.push_str(&format!("    tags: [{}]\n", rendered.join(", ")));
    }
    out.push_str("}\n");
}

pub(crate) fn generate(
    rules: &[Rule],
    characters: &[CharacterRef],
    actions: &[ActionRef],
) -> GeneratedDocument {
    let mut text = String::new();
    let mut warnings = Vec::new();
    if !characters.is_empty() || !actions.is_empty() {
        warnings.push(Warning::RecordsUnsupported {
            format: Format::Insimul,
        });
    }
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        render_rule(&mut text, rule, &mut warnings);
    }
    GeneratedDocument { text, warnings }
}
