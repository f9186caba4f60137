use thiserror::Error;

/// A malformed JWCC document. Line and column are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("hujson: line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document is not valid JSON with comments and commas.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document parsed but a field has the wrong type.
    #[error("invalid devbox.json: {0}")]
    Decode(#[from] serde_json::Error),

    /// A message meant to be shown to the user as-is.
    #[error("{0}")]
    User(String),

    #[error("package {0} not found")]
    PackageNotFound(String),

    /// A state only a programming error can reach.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConfigError {
    pub fn user(msg: impl Into<String>) -> Self {
        ConfigError::User(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ConfigError::Internal(msg.into())
    }

    /// Whether the error should be reported to the user without a stack of
    /// internal context.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::User(_) | ConfigError::PackageNotFound(_) | ConfigError::Syntax(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
