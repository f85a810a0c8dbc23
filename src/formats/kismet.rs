//! The Kismet clause grammar: parser and generator side by side.
//!
//! Kismet is line-oriented with no multi-line rule bodies. Exactly three
//! clause shapes exist, one rule per logical line:
//!
//! ```text
//! default trait <name>(<args>): <atoms>. likelihood: <float>
//! <name>(<args>) :- <atoms>. weight: <float>
//! pattern <name>: <atoms> -> <atoms>.
//! ```
//!
//! `%` starts a comment line. Keeping both directions in this module is what
//! guarantees the round-trip contract: the generator renders through the
//! same atom shapes the parser accepts, so emitted text is re-parseable by
//! construction.

use winnow::combinator::{alt, cut_err, opt, preceded, repeat, terminated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::error::ParseError;
use crate::formats::{Format, GeneratedDocument, ParsedDocument, Warning};
use crate::types::{
    clamp_likelihood, ActionRef, CharacterRef, CompareOp, Condition, Effect, Parameters, Rule,
    RuleType, Value,
};

// -- Lexical pieces ---------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

fn ws1(input: &mut &str) -> ModalResult<()> {
    take_while(1.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

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

// A trailing '.' stays unconsumed: it is the clause terminator, not part
// of the number.
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

fn float_literal(input: &mut &str) -> ModalResult<f64> {
    ws.parse_next(input)?;
    take_while(1.., |c: char| {
        c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')
    })
    .try_map(str::parse::<f64>)
    .parse_next(input)
}

fn arg_value(input: &mut &str) -> ModalResult<Value> {
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

// -- Atoms ------------------------------------------------------------------

fn kismet_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        ">".value(CompareOp::Greater),
        "<".value(CompareOp::Less),
        "=".value(CompareOp::Equals),
    ))
    .parse_next(input)
}

/// `( operand [, operand] )` with identifier operands.
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

fn cond_atom(input: &mut &str) -> ModalResult<Condition> {
    ws.parse_next(input)?;
    if opt(r"\+").parse_next(input)?.is_some() {
        ws.parse_next(input)?;
        let predicate = cut_err(ident)
            .context(StrContext::Expected(StrContextValue::Description(
                "predicate after '\\+'",
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
    if let Some(operator) = opt(kismet_op).parse_next(input)? {
        let value = cut_err(arg_value).parse_next(input)?;
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

fn cond_atoms(input: &mut &str) -> ModalResult<Vec<Condition>> {
    repeat(0.., terminated(cond_atom, opt((ws, ',')))).parse_next(input)
}

/// `action(target [, value])` on the effect side of a pattern clause.
fn effect_atom(input: &mut &str) -> ModalResult<Effect> {
    ws.parse_next(input)?;
    let action = ident.parse_next(input)?.to_owned();
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let target = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description("target")))
        .parse_next(input)?
        .to_owned();
    let value = opt(preceded((ws, ','), arg_value)).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err(')').parse_next(input)?;
    Ok(Effect::Generic {
        action,
        target,
        value,
        parameters: Parameters::new(),
    })
}

fn effect_atoms(input: &mut &str) -> ModalResult<Vec<Effect>> {
    repeat(0.., terminated(effect_atom, opt((ws, ',')))).parse_next(input)
}

// -- Clause shapes ----------------------------------------------------------

/// `default trait <name>(<args>): <atoms>. likelihood: <float>`
fn trait_clause(input: &mut &str) -> ModalResult<Rule> {
    ("default", ws1, "trait", ws1).parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "trait name",
        )))
        .parse_next(input)?
        .to_owned();
    let _subject = opt(atom_args).parse_next(input)?;
    (ws, cut_err(':')).parse_next(input)?;
    let conditions = cond_atoms.parse_next(input)?;
    (ws, cut_err('.')).parse_next(input)?;
    (ws, cut_err("likelihood"), ws, cut_err(':')).parse_next(input)?;
    let likelihood = cut_err(float_literal).parse_next(input)?;
    ws.parse_next(input)?;

    let mut rule = Rule::new(name, RuleType::Trait);
    rule.conditions = conditions;
    rule.likelihood = clamp_likelihood(likelihood);
    Ok(rule)
}

/// `pattern <name>: <atoms> -> <atoms>.`
fn pattern_clause(input: &mut &str) -> ModalResult<Rule> {
    ("pattern", ws1).parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "pattern name",
        )))
        .parse_next(input)?
        .to_owned();
    (ws, cut_err(':')).parse_next(input)?;
    let conditions = cond_atoms.parse_next(input)?;
    (ws, cut_err("->")).parse_next(input)?;
    let effects = effect_atoms.parse_next(input)?;
    (ws, cut_err('.')).parse_next(input)?;
    ws.parse_next(input)?;

    let mut rule = Rule::new(name, RuleType::Pattern);
    rule.conditions = conditions;
    rule.effects = effects;
    Ok(rule)
}

/// `<name>(<args>) :- <atoms>. weight: <float>`
///
/// The head names the rule and doubles as its single desire effect.
fn volition_clause(input: &mut &str) -> ModalResult<Rule> {
    ws.parse_next(input)?;
    let name = ident.parse_next(input)?.to_owned();
    let (first, second) = atom_args.parse_next(input)?;
    (ws, ":-").parse_next(input)?;
    let conditions = cut_err(cond_atoms).parse_next(input)?;
    (ws, cut_err('.')).parse_next(input)?;
    (ws, cut_err("weight"), ws, cut_err(':')).parse_next(input)?;
    let weight = cut_err(float_literal).parse_next(input)?;
    ws.parse_next(input)?;

    let mut parameters = Parameters::new();
    if let Some(second) = second {
        parameters.insert("second".to_owned(), Value::String(second));
    }
    let mut rule = Rule::new(name.clone(), RuleType::Volition);
    rule.conditions = conditions;
    rule.effects = vec![Effect::Generic {
        action: name,
        target: first,
        value: None,
        parameters,
    }];
    rule.weight = Some(weight);
    Ok(rule)
}

fn clause(input: &mut &str) -> ModalResult<Rule> {
    alt((trait_clause, pattern_clause, volition_clause)).parse_next(input)
}

// -- Document parsing -------------------------------------------------------

pub(crate) fn parse(source: &str) -> ParsedDocument {
    let mut rules = Vec::new();
    let mut errors = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        match clause.parse(line) {
            Ok(rule) => rules.push(rule),
            Err(err) => {
                errors.push(ParseError::at_line(
                    Format::Kismet,
                    idx + 1,
                    err.to_string(),
                ));
            }
        }
    }
    ParsedDocument {
        format: Format::Kismet,
        rules,
        errors,
    }
}

// -- Generation -------------------------------------------------------------

/// Force a string into the identifier shape the clause grammar accepts.
fn sanitize_ident(s: &str) -> String {
    let mut out: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !out
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    {
        out.insert(0, '_');
    }
    out
}

fn fmt_float(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn render_cond_atom(condition: &Condition) -> String {
    match condition {
        Condition::Predicate {
            predicate,
            first,
            second,
            negated,
        } => {
            let neg = if *negated { r"\+ " } else { "" };
            let predicate = sanitize_ident(predicate);
            let first = sanitize_ident(first);
            match second {
                Some(second) => format!("{neg}{predicate}({first}, {})", sanitize_ident(second)),
                None => format!("{neg}{predicate}({first})"),
            }
        }
        Condition::Comparison {
            first,
            operator,
            value,
        } => format!(
            "{} {} {}",
            sanitize_ident(first),
            operator.kismet_symbol(),
            value.to_literal()
        ),
        Condition::Genealogy {
            relation,
            first,
            second,
        } => format!(
            "{}({}, {})",
            sanitize_ident(relation),
            sanitize_ident(first),
            sanitize_ident(second)
        ),
    }
}

fn render_effect_atom(effect: &Effect) -> String {
    let action = sanitize_ident(effect.action());
    let target = sanitize_ident(effect.target());
    match effect.value() {
        Some(value) => format!("{action}({target}, {})", value.to_literal()),
        None => format!("{action}({target})"),
    }
}

fn render_atoms(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(render_cond_atom)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Subject variable for a head with no effect to draw from.
fn subject_of(rule: &Rule) -> String {
    rule.conditions
        .first()
        .map(|c| match c {
            Condition::Predicate { first, .. }
            | Condition::Comparison { first, .. }
            | Condition::Genealogy { first, .. } => sanitize_ident(first),
        })
        .unwrap_or_else(|| "X".to_owned())
}

fn render_trait(rule: &Rule, warnings: &mut Vec<Warning>) -> String {
    if !rule.effects.is_empty() {
        warnings.push(Warning::EffectsTruncated {
            rule: rule.name.clone(),
            dropped: rule.effects.len(),
        });
    }
    let likelihood = clamp_likelihood(rule.likelihood);
    if (likelihood - rule.likelihood).abs() > f64::EPSILON {
        warnings.push(Warning::LikelihoodClamped {
            rule: rule.name.clone(),
            value: rule.likelihood,
        });
    }
    format!(
        "default trait {}({}): {}. likelihood: {}",
        sanitize_ident(&rule.name),
        subject_of(rule),
        render_atoms(&rule.conditions),
        fmt_float(likelihood)
    )
}

fn render_volition(rule: &Rule, warnings: &mut Vec<Warning>) -> String {
    if rule.effects.len() > 1 {
        warnings.push(Warning::EffectsTruncated {
            rule: rule.name.clone(),
            dropped: rule.effects.len() - 1,
        });
    }
    let (target, second) = match rule.effects.first() {
        Some(effect) => {
            let second = match effect {
                Effect::Set { parameters, .. }
                | Effect::Modify { parameters, .. }
                | Effect::TriggerEvent { parameters, .. }
                | Effect::Generic { parameters, .. } => match parameters.get("second") {
                    Some(Value::String(s)) => Some(sanitize_ident(s)),
                    _ => None,
                },
                Effect::CreateRelationship { .. } => None,
            };
            (sanitize_ident(effect.target()), second)
        }
        None => (subject_of(rule), None),
    };
    let head_args = match second {
        Some(second) => format!("{target}, {second}"),
        None => target,
    };
    let raw_weight = rule.weight.unwrap_or(rule.likelihood);
    let weight = clamp_likelihood(raw_weight);
    if (weight - raw_weight).abs() > f64::EPSILON {
        warnings.push(Warning::LikelihoodClamped {
            rule: rule.name.clone(),
            value: raw_weight,
        });
    }
    format!(
        "{}({}) :- {}. weight: {}",
        sanitize_ident(&rule.name),
        head_args,
        render_atoms(&rule.conditions),
        fmt_float(weight)
    )
}

fn render_pattern(rule: &Rule) -> String {
    let effects = rule
        .effects
        .iter()
        .map(render_effect_atom)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "pattern {}: {} -> {}.",
        sanitize_ident(&rule.name),
        render_atoms(&rule.conditions),
        effects
    )
}

pub(crate) fn generate(
    rules: &[Rule],
    characters: &[CharacterRef],
    actions: &[ActionRef],
) -> GeneratedDocument {
    let mut lines = Vec::with_capacity(rules.len());
    let mut warnings = Vec::new();
    if !characters.is_empty() || !actions.is_empty() {
        warnings.push(Warning::RecordsUnsupported {
            format: Format::Kismet,
        });
    }
    for rule in rules {
        let effective = rule.effective_type().clone();
        let line = match effective {
            RuleType::Volition => render_volition(rule, &mut warnings),
            RuleType::Pattern => render_pattern(rule),
            RuleType::Trait => render_trait(rule, &mut warnings),
            other => {
                warnings.push(Warning::UnsupportedRuleType {
                    rule: rule.name.clone(),
                    rule_type: other,
                    rendered_as: "default trait",
                });
                render_trait(rule, &mut warnings)
            }
        };
        lines.push(line);
    }
    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    GeneratedDocument { text, warnings }
}
