use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShipperError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShipperError {
    /// Errors that must stop the process instead of being retried on the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShipperError::Config(_) | ShipperError::Discovery(_))
    }
}

impl From<serde_json::Error> for ShipperError {
    fn from(err: serde_json::Error) -> Self {
        ShipperError::Internal(format!("serialization failed: {}", err))
    }
}

impl From<reqwest::Error> for ShipperError {
    fn from(err: reqwest::Error) -> Self {
        ShipperError::Internal(format!("http client failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ShipperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ShipperError::Config("step".into()).is_fatal());
        assert!(ShipperError::Discovery("down".into()).is_fatal());
        assert!(!ShipperError::Query("timeout".into()).is_fatal());
        assert!(!ShipperError::Submission("403".into()).is_fatal());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = ShipperError::Submission("status 500".into());
        assert_eq!(err.to_string(), "Submission error: status 500");
    }
}
