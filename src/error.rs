use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("cannot insert a case before slot {index}: valid case boundaries are 2..={max}")]
    InvalidInsertIndex { index: usize, max: usize },
    #[error("slot {0} already exists on this block")]
    DuplicateSlot(String),
    #[error("no slot named {0}")]
    UnknownSlot(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("no <mutation> element found")]
    MissingElement,
    #[error("malformed attribute near `{0}`")]
    MalformedAttribute(String),
    #[error("extra state must be an object or an XML string, got {0}")]
    UnsupportedExtraState(String),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("session document is not valid JSON or JSON5: {0}")]
    Syntax(String),
    #[error("step {step}: {source}")]
    Step {
        step: usize,
        #[source]
        source: ShapeError,
    },
    #[error(transparent)]
    Mutation(#[from] MutationError),
}
