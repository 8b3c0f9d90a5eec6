//! Error taxonomy for the analytics layer.
//!
//! Nothing in here is allowed to reach the page: tracking calls swallow and
//! log these, only `init_analytics` hands them back to the caller.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    /// Measurement id absent in a production build.
    #[error("analytics measurement id is not configured")]
    MissingConfiguration,
    /// The backend script reported a load error.
    #[error("analytics script failed to load: {0}")]
    ScriptLoadFailed(String),
    /// The backend never came up within the bootstrap deadline.
    #[error("analytics backend did not load within {0:?}")]
    InitTimeout(Duration),
    #[error("event name must be a non-empty string")]
    InvalidEventName,
    /// A custom parameter object refers back to one of its ancestors.
    #[error("custom parameters contain a circular reference at `{0}`")]
    CircularParameterReference(String),
    #[error("custom parameters nest deeper than {0} levels")]
    ParameterTooDeep(usize),
    #[error("unknown web-vitals metric `{0}`")]
    UnknownMetric(String),
    /// Neither `head`, `body` nor the document root accepted the loader.
    #[error("no insertion point available for the analytics script")]
    DomInsertionFailed,
}

/// Failure raised by the backend dispatch primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend dispatch failed: {0}")]
pub struct DispatchError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            AnalyticsError::InitTimeout(Duration::from_secs(10)).to_string(),
            "analytics backend did not load within 10s"
        );
        assert_eq!(
            AnalyticsError::CircularParameterReference("meta.self".into()).to_string(),
            "custom parameters contain a circular reference at `meta.self`"
        );
        assert_eq!(DispatchError("boom".into()).to_string(), "backend dispatch failed: boom");
    }
}
