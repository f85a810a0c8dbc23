mod error;
mod formats;
mod normalize;
mod types;

pub use error::{EmptyDocumentError, FabulaError, FormatError, Location, ParseError};
pub use formats::{
    generate, generate_with_records, parse, Format, GeneratedDocument, ParsedDocument,
    UnknownFormatError, Warning,
};
pub use types::{
    clamp_likelihood, ActionRef, CharacterRef, CompareOp, Condition, Effect, Parameters,
    Provenance, Rule, RuleType, Value, DEFAULT_LIKELIHOOD, DEFAULT_PRIORITY, VOLITION_PRIORITY,
};
