use thiserror::Error;

/// Failure conditions reported by provider clients.
///
/// Clients only classify what went wrong; whether a condition is shown to the
/// user or collapsed into absence is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Condition {
    /// The weather provider could not resolve the requested city.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure, non-success status or unparseable payload.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The request did not complete within the configured timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The text provider refused to answer on safety grounds.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The provider answered but had nothing for us.
    #[error("no data: {0}")]
    NoData(String),
}

impl Condition {
    /// Only an unknown city name can be fixed by the user.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Condition::NotFound(_))
    }

    /// Whether re-issuing the same search might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Condition::Transient(_) | Condition::Timeout(_))
    }

    pub(crate) fn from_transport(what: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Condition::Timeout(format!("{what}: {err}"))
        } else {
            Condition::Transient(format!("{what}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_is_user_correctable() {
        assert!(Condition::NotFound("Atlantis".into()).is_user_correctable());
        assert!(!Condition::Transient("502".into()).is_user_correctable());
        assert!(!Condition::Timeout("10s".into()).is_user_correctable());
        assert!(!Condition::NoData("empty".into()).is_user_correctable());
    }

    #[test]
    fn transient_and_timeout_are_retryable() {
        assert!(Condition::Transient("502".into()).is_retryable());
        assert!(Condition::Timeout("10s".into()).is_retryable());
        assert!(!Condition::ContentBlocked("SAFETY".into()).is_retryable());
        assert!(!Condition::NotFound("Atlantis".into()).is_retryable());
    }

    #[test]
    fn display_includes_detail() {
        let msg = Condition::NotFound("city \"Atlantis\"".into()).to_string();
        assert_eq!(msg, "not found: city \"Atlantis\"");
    }
}
