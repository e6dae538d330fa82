//! Errors surfaced by OBJ loading.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ObjError {
    /// Neither a direct blob nor an `.obj` archive entry could be read.
    #[error("no OBJ geometry could be located in the asset")]
    SourceNotFound,

    #[error("object '{0}' not found")]
    ObjectNotFound(String),

    /// A `v`, `vt`, `vn` or `f` directive with too few tokens.
    #[error("malformed '{directive}' directive on line {line}")]
    MalformedLine { directive: String, line: usize },
}

pub type ObjResult<T> = Result<T, ObjError>;
