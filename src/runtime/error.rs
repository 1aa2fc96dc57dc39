use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Clone, Debug, Error)]
pub enum EvalError {
    #[error("Missing argument `{name}`")]
    MissingArgument { name: String },
    #[error("Unresolved identifier `{name}`")]
    UnresolvedIdentifier { name: String },
    #[error("Column `{name}` not found in the data")]
    UnknownDataVariable { name: String },
    #[error("Object `{name}` not found in the enclosing environment")]
    UnknownEnvVariable { name: String },
    #[error("Column `{name}` does not exist")]
    MissingColumn { name: String },
    #[error("Column position {index} is out of range for {width} columns")]
    IndexOutOfRange { index: usize, width: usize },
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("Column `{name}` has {len} rows but the table has {expected}")]
    LengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },
    #[error("Duplicate column `{name}`")]
    DuplicateColumn { name: String },
    #[error("Operation not supported: {message}")]
    Unsupported { message: String },
}
