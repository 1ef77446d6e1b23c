use thiserror::Error;

/// Application-wide error types for Forage.
///
/// These surface only at construction time (building an HTTP client,
/// assembling a custom schema). Per-call fetch and validation paths never
/// return an `AppError`; they converge on typed outcomes instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP client could not be built.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// A schema definition is internally inconsistent (e.g. a numeric
    /// constraint declared on a text field).
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = AppError::SchemaError("min on boolean field".into());
        assert!(err.to_string().contains("min on boolean field"));

        let err = AppError::HttpError("builder failed".into());
        assert!(err.to_string().starts_with("HTTP error"));
    }
}
