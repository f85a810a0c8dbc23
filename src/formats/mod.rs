mod ensemble;
mod insimul;
mod kismet;
mod tott;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::{EmptyDocumentError, FormatError, ParseError};
use crate::types::{ActionRef, CharacterRef, Rule, RuleType};

/// The rule languages the compiler translates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Block-structured in-house text grammar.
    Insimul,
    /// Ensemble-style JSON schema (`triggerRules`/`volitionRules`).
    Ensemble,
    /// Prolog-flavored single-line clause language.
    Kismet,
    /// Talk-of-the-Town-style categorized JSON.
    Tott,
}

impl Format {
    /// All formats, in dispatch order.
    pub const ALL: [Format; 4] = [
        Format::Insimul,
        Format::Ensemble,
        Format::Kismet,
        Format::Tott,
    ];

    /// The lowercase tag used by the import/export surface.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Insimul => "insimul",
            Format::Ensemble => "ensemble",
            Format::Kismet => "kismet",
            Format::Tott => "tott",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format tag the import surface does not recognize.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown format '{0}', expected one of: insimul, ensemble, kismet, tott")]
pub struct UnknownFormatError(pub String);

impl FromStr for Format {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insimul" => Ok(Format::Insimul),
            "ensemble" => Ok(Format::Ensemble),
            "kismet" => Ok(Format::Kismet),
            "tott" => Ok(Format::Tott),
            other => Err(UnknownFormatError(other.to_owned())),
        }
    }
}

/// The result of parsing one source document: the rules that parsed plus one
/// error per rule that did not.
///
/// A malformed rule is dropped whole — never partially populated — and the
/// remaining rules still parse. Callers surface "imported N of M" from
/// [`imported`](Self::imported)/[`attempted`](Self::attempted).
#[derive(Debug)]
pub struct ParsedDocument {
    pub format: Format,
    pub rules: Vec<Rule>,
    pub errors: Vec<ParseError>,
}

impl ParsedDocument {
    /// Number of rules that parsed successfully.
    #[must_use]
    pub fn imported(&self) -> usize {
        self.rules.len()
    }

    /// Number of rules the document attempted to define, valid or not.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.rules.len() + self.errors.len()
    }

    /// Treat a document with zero parseable rules as fatal.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyDocumentError`] if no rule parsed.
    pub fn require_rules(self) -> Result<Vec<Rule>, EmptyDocumentError> {
        if self.rules.is_empty() {
            return Err(EmptyDocumentError {
                format: self.format,
                attempted: self.attempted(),
            });
        }
        Ok(self.rules)
    }
}

/// A generated source document plus the degradations applied to produce it.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub text: String,
    pub warnings: Vec<Warning>,
}

/// An intentional degradation applied by a generator.
///
/// Generators never fail on well-formed rules; anything a target format
/// cannot express degrades per the documented fallback tables and is
/// reported here rather than silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The rule's type has no direct representation in the target format and
    /// was rendered with the format's general keyword or category.
    UnsupportedRuleType {
        rule: String,
        rule_type: RuleType,
        rendered_as: &'static str,
    },
    /// The target shape could not carry every effect of the rule.
    EffectsTruncated { rule: String, dropped: usize },
    /// An out-of-range likelihood or weight was clamped into [0, 1].
    LikelihoodClamped { rule: String, value: f64 },
    /// The target format has no place for character/action records.
    RecordsUnsupported { format: Format },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnsupportedRuleType {
                rule,
                rule_type,
                rendered_as,
            } => write!(
                f,
                "rule '{rule}': type '{rule_type}' has no direct representation, rendered as '{rendered_as}'"
            ),
            Warning::EffectsTruncated { rule, dropped } => {
                write!(f, "rule '{rule}': {dropped} effect(s) not representable, dropped")
            }
            Warning::LikelihoodClamped { rule, value } => {
                write!(f, "rule '{rule}': likelihood/weight {value} clamped into [0, 1]")
            }
            Warning::RecordsUnsupported { format } => {
                write!(f, "{format} documents cannot carry character/action records")
            }
        }
    }
}

/// Parse a source document in the given format into canonical rules.
///
/// Returns `Err` only when the document as a whole is unreadable (e.g.
/// invalid JSON for a JSON-based format). Individual malformed rules are
/// dropped into [`ParsedDocument::errors`] while the rest of the document
/// still parses.
///
/// # Errors
///
/// Returns [`FormatError`] on a completely unparseable document.
pub fn parse(source: &str, format: Format) -> Result<ParsedDocument, FormatError> {
    let doc = match format {
        Format::Insimul => insimul::parse(source),
        Format::Ensemble => ensemble::parse(source)?,
        Format::Kismet => kismet::parse(source),
        Format::Tott => tott::parse(source)?,
    };
    for error in &doc.errors {
        tracing::warn!(format = %format, %error, "dropped malformed rule");
    }
    Ok(doc)
}

/// Generate a source document in the given format from canonical rules.
///
/// Never fails: unrepresentable values degrade per the per-format fallback
/// tables and surface in [`GeneratedDocument::warnings`].
#[must_use]
pub fn generate(rules: &[Rule], format: Format) -> GeneratedDocument {
    generate_with_records(rules, &[], &[], format)
}

/// Generate a source document, splicing in character and action records for
/// the formats that can carry them (Ensemble and Talk of the Town).
#[must_use]
pub fn generate_with_records(
    rules: &[Rule],
    characters: &[CharacterRef],
    actions: &[ActionRef],
    format: Format,
) -> GeneratedDocument {
    let doc = match format {
        Format::Insimul => insimul::generate(rules, characters, actions),
        Format::Ensemble => ensemble::generate(rules, characters, actions),
        Format::Kismet => kismet::generate(rules, characters, actions),
        Format::Tott => tott::generate(rules, characters, actions),
    };
    for warning in &doc.warnings {
        tracing::debug!(format = %format, %warning, "generator degradation");
    }
    doc
}
