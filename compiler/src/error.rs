use frugal_ast::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrugalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{file}:{line}:{column}: {msg}")]
    Syntax {
        file:   String,
        line:   usize,
        column: usize,
        msg:    String,
    },

    #[error("{0}")]
    Semantic(String),

    #[error("{0}")]
    Resolution(String),

    #[error("audit failed: errors were logged")]
    AuditFailure,

    #[error("generator error: {0}")]
    Generator(String),
}

impl From<ResolveError> for FrugalError {
    fn from(err: ResolveError) -> FrugalError {
        FrugalError::Resolution(err.to_string())
    }
}
