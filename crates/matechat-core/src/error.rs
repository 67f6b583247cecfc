//! Shared error type across matechat crates.

use thiserror::Error;

/// How far an error reaches (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Turned into a notice; the session keeps going and the user may retry.
    Recoverable,
    /// The transport is unusable; the session ends.
    SessionFatal,
}

impl Severity {
    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Recoverable => "RECOVERABLE",
            Severity::SessionFatal => "SESSION_FATAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MateChatError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum MateChatError {
    /// The frame is not a JSON envelope at all.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
    /// The envelope names a type this client does not know.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// The type is known but `Data` has the wrong shape.
    #[error("malformed {msg_type} payload: {reason}")]
    MalformedPayload {
        msg_type: String,
        reason: String,
    },
    #[error("send failed: {0}")]
    Send(String),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("liveness probe failed: {0}")]
    ProbeFailed(String),
    #[error("server did not answer in time")]
    Timeout,
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl MateChatError {
    /// Map an error to how far it reaches.
    pub fn severity(&self) -> Severity {
        match self {
            MateChatError::UnknownType(_)
            | MateChatError::MalformedPayload { .. }
            | MateChatError::Send(_)
            | MateChatError::Timeout
            | MateChatError::Config(_)
            | MateChatError::UnsupportedVersion => Severity::Recoverable,
            MateChatError::InvalidEnvelope(_)
            | MateChatError::ConnectionLost(_)
            | MateChatError::ProbeFailed(_)
            | MateChatError::Internal(_) => Severity::SessionFatal,
        }
    }

    pub fn malformed(msg_type: &str, reason: impl Into<String>) -> Self {
        MateChatError::MalformedPayload {
            msg_type: msg_type.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_problems_are_recoverable() {
        assert_eq!(
            MateChatError::malformed("Chat", "expected string").severity(),
            Severity::Recoverable
        );
        assert_eq!(
            MateChatError::UnknownType("Dance".into()).severity(),
            Severity::Recoverable
        );
    }

    #[test]
    fn transport_problems_end_the_session() {
        assert_eq!(
            MateChatError::InvalidEnvelope("eof".into()).severity().as_str(),
            "SESSION_FATAL"
        );
        assert_eq!(
            MateChatError::ProbeFailed("timeout".into()).severity(),
            Severity::SessionFatal
        );
    }
}
