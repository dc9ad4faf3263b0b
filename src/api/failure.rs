//! Normalized request failures.
//!
//! Every error leaving the request gateway is a [`ClassifiedFailure`]. Consumers
//! inspect its [`FailureKind`] and never the transport error underneath.

use std::fmt;

/// Message used when neither the server nor the transport supplied one.
pub const GENERIC_MESSAGE: &str = "An unexpected error occurred.";

/// Message used for transport-level failures (unreachable host, non-JSON body).
pub const NETWORK_MESSAGE: &str = "Network error";

/// Kind tag derived from the HTTP status of a failed request.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    Network,
    Unknown,
}

impl FailureKind {
    /// Map a raw HTTP status to a kind. Status `0` marks a transport failure.
    ///
    pub fn from_status(status: u16) -> FailureKind {
        match status {
            0 => FailureKind::Network,
            400 => FailureKind::BadRequest,
            401 => FailureKind::Unauthorized,
            403 => FailureKind::Forbidden,
            404 => FailureKind::NotFound,
            500 => FailureKind::ServerError,
            _ => FailureKind::Unknown,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::BadRequest => "bad request",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Forbidden => "forbidden",
            FailureKind::NotFound => "not found",
            FailureKind::ServerError => "server error",
            FailureKind::Network => "network",
            FailureKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A failed request, normalized from the response envelope or the transport.
///
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} (status {raw_status}): {message}")]
pub struct ClassifiedFailure {
    pub kind: FailureKind,
    pub message: String,
    pub raw_status: u16,
    pub code: Option<String>,
    pub details: Option<String>,
}

impl ClassifiedFailure {
    /// Build a failure for the given status, classifying it on the way.
    ///
    pub fn from_status(raw_status: u16, message: impl Into<String>) -> Self {
        ClassifiedFailure {
            kind: FailureKind::from_status(raw_status),
            message: message.into(),
            raw_status,
            code: None,
            details: None,
        }
    }

    /// Failure for a request that never produced a readable envelope.
    ///
    pub fn network() -> Self {
        ClassifiedFailure::from_status(0, NETWORK_MESSAGE)
    }

    /// Failure that did not come from an HTTP response at all, such as a
    /// malformed success payload or a runtime error reported by hand.
    ///
    pub fn unknown(message: impl Into<String>) -> Self {
        ClassifiedFailure {
            kind: FailureKind::Unknown,
            message: message.into(),
            raw_status: 0,
            code: None,
            details: None,
        }
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == FailureKind::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_status() {
        assert_eq!(FailureKind::from_status(0), FailureKind::Network);
        assert_eq!(FailureKind::from_status(400), FailureKind::BadRequest);
        assert_eq!(FailureKind::from_status(401), FailureKind::Unauthorized);
        assert_eq!(FailureKind::from_status(403), FailureKind::Forbidden);
        assert_eq!(FailureKind::from_status(404), FailureKind::NotFound);
        assert_eq!(FailureKind::from_status(500), FailureKind::ServerError);
        assert_eq!(FailureKind::from_status(418), FailureKind::Unknown);
        assert_eq!(FailureKind::from_status(502), FailureKind::Unknown);
    }

    #[test]
    fn test_failure_display() {
        let failure = ClassifiedFailure::from_status(404, "Board missing");
        let text = failure.to_string();
        assert!(text.contains("not found"));
        assert!(text.contains("404"));
        assert!(text.contains("Board missing"));
    }

    #[test]
    fn test_network_failure() {
        let failure = ClassifiedFailure::network();
        assert_eq!(failure.kind, FailureKind::Network);
        assert_eq!(failure.raw_status, 0);
        assert_eq!(failure.message, NETWORK_MESSAGE);
    }

    #[test]
    fn test_with_code() {
        let failure = ClassifiedFailure::from_status(400, "Bad credentials")
            .with_code(Some("INVALID_CREDENTIALS".to_string()));
        assert_eq!(failure.code.as_deref(), Some("INVALID_CREDENTIALS"));
        assert!(!failure.is_unauthorized());
        assert!(ClassifiedFailure::from_status(401, "").is_unauthorized());
    }
}
