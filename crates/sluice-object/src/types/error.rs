//! Error type for blob store operations.

use std::fmt;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// A lightweight error carrying a message, an optional source, and a
/// retryable flag.
pub struct Error {
    message: String,
    source: Option<BoxedError>,
    retryable: bool,
    not_found: bool,
}

impl Error {
    /// Create a runtime error formatted as `[{label}] {msg}`.
    pub fn runtime(msg: impl fmt::Display, label: &str, retryable: bool) -> Self {
        Self {
            message: format!("[{label}] {msg}"),
            source: None,
            retryable,
            not_found: false,
        }
    }

    /// Create a connection error formatted as `[{label}] {msg}`.
    pub fn connection(msg: impl fmt::Display, label: &str, retryable: bool) -> Self {
        Self {
            message: format!("[{label}] connection failed: {msg}"),
            source: None,
            retryable,
            not_found: false,
        }
    }

    /// Create a non-retryable error for a missing container or object.
    pub fn not_found(what: impl fmt::Display, label: &str) -> Self {
        Self {
            message: format!("[{label}] {what} not found"),
            source: None,
            retryable: false,
            not_found: true,
        }
    }

    /// Create a non-retryable error for an operation the backend cannot perform.
    pub fn unsupported(operation: impl fmt::Display, label: &str) -> Self {
        Self {
            message: format!("[{label}] unsupported operation: {operation}"),
            source: None,
            retryable: false,
            not_found: false,
        }
    }

    /// Attach a source error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the caller should retry this operation.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Whether the error reports a missing container or object.
    pub fn is_not_found(&self) -> bool {
        self.not_found
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("message", &self.message)
            .field("retryable", &self.retryable)
            .field("not_found", &self.not_found)
            .field("source", &self.source)
            .finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        let not_found = matches!(err, object_store::Error::NotFound { .. });
        let retryable = !matches!(
            err,
            object_store::Error::NotFound { .. }
                | object_store::Error::PermissionDenied { .. }
                | object_store::Error::Unauthenticated { .. }
                | object_store::Error::AlreadyExists { .. }
                | object_store::Error::Precondition { .. }
                | object_store::Error::NotSupported { .. }
        );
        let mut error = Self::runtime(err.to_string(), "object-store", retryable).with_source(err);
        error.not_found = not_found;
        error
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn not_found_is_not_retryable() {
        let err = Error::not_found("container 'inbox'", "memory");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "[memory] container 'inbox' not found");
    }

    #[test]
    fn object_store_not_found_maps() {
        let err = Error::from(object_store::Error::NotFound {
            path: "a.txt".into(),
            source: "missing".into(),
        });
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert!(err.source().is_some());
    }

    #[test]
    fn object_store_generic_is_retryable() {
        let err = Error::from(object_store::Error::Generic {
            store: "test",
            source: "boom".into(),
        });
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
    }
}
