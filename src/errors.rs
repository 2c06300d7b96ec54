use std::fmt;

/// Application-specific error types.
///
/// Only unrecoverable conditions travel as `AppError`. Remote failures for a
/// single probe, statement or insert are classified into [`ErrorKind`] values
/// and recorded instead of propagated.
#[derive(Debug)]
pub enum AppError {
    /// Configuration or manifest is unusable.
    Config(String),
    /// Lookup of an unknown entity (e.g. a table with no registered DDL).
    NotFound(String),
    /// Transport-level failure talking to the remote API (no HTTP status).
    Transport(String),
    /// Local file could not be read.
    Io(std::io::Error),
    /// JSON could not be parsed or produced.
    Json(serde_json::Error),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AppError::Io(e) => write!(f, "I/O error: {}", e),
            AppError::Json(e) => write!(f, "JSON error: {}", e),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(e) => Some(e),
            AppError::Json(e) => Some(e),
            AppError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {}", err))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err)
    }
}

/// Classification of a failed remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The expected table is absent. Recoverable by running the rendered DDL.
    Missing,
    /// Failed for a reason other than absence. Never used to infer schema state.
    Transient,
    /// Insert hit an existing unique or primary key. Folded into success.
    Conflict,
    /// The execution endpoint rejected a statement.
    MalformedStatement,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Missing => "missing",
            ErrorKind::Transient => "transient",
            ErrorKind::Conflict => "conflict",
            ErrorKind::MalformedStatement => "malformed statement",
        };
        f.write_str(label)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_display() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = result.context("reading schema.sql").unwrap_err();
        assert_eq!(err.to_string(), "reading schema.sql: I/O error: no such file");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(ErrorKind::Missing.to_string(), "missing");
        assert_eq!(
            ErrorKind::MalformedStatement.to_string(),
            "malformed statement"
        );
    }
}
