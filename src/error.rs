use thiserror::Error;

/// Failures the scan pipeline recovers from locally.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl ScoutError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<std::io::Error> for ScoutError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for ScoutError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScoutError::parse("missing id");
        assert_eq!(err.to_string(), "parse error: missing id");
    }

    #[test]
    fn test_io_error_is_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: ScoutError = io.into();
        assert!(matches!(err, ScoutError::Persistence(_)));
        assert!(err.to_string().contains("read-only"));
    }
}
