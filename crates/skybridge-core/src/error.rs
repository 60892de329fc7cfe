// ABOUTME: Defines PostError, the error taxonomy for a single post submission attempt.
// ABOUTME: Every variant renders to the "<ErrorKind>: <message>" status line shown to the user.

use thiserror::Error;

/// Status text used when a failure carries nothing recognisable to show.
pub const UNKNOWN_ERROR_TEXT: &str = "Unexpected Unknown Error";

/// Errors that can end a post submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostError {
    /// An invariant the caller was supposed to uphold did not hold, e.g.
    /// submitting without a session.
    #[error("unexpected state: {0}")]
    UnexpectedState(String),

    /// The draft was rejected before anything was sent.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A remote API answered with an error payload.
    #[error("remote error {kind}: {message}")]
    Remote { kind: String, message: String },

    /// Transport, decode, or any other failure with no better shape.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl PostError {
    /// Short kind name used as the prefix of the status line.
    pub fn kind(&self) -> &str {
        match self {
            PostError::UnexpectedState(_) => "UnexpectedStateError",
            PostError::Validation(_) => "ValidationError",
            PostError::Remote { kind, .. } => kind,
            PostError::Unknown(_) => "UnknownError",
        }
    }

    /// Format the user-visible status line for this error.
    pub fn status_text(&self) -> String {
        match self {
            PostError::UnexpectedState(msg) | PostError::Validation(msg) => {
                format!("{}: {}", self.kind(), msg)
            }
            PostError::Remote { kind, message } => format!("{}: {}", kind, message),
            PostError::Unknown(msg) if msg.trim().is_empty() => UNKNOWN_ERROR_TEXT.to_string(),
            PostError::Unknown(msg) => format!("{}: {}", self.kind(), msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_prefixes_kind() {
        assert_eq!(
            PostError::UnexpectedState("no session".into()).status_text(),
            "UnexpectedStateError: no session"
        );
        assert_eq!(
            PostError::Validation("too long".into()).status_text(),
            "ValidationError: too long"
        );
        assert_eq!(
            PostError::Unknown("connection reset".into()).status_text(),
            "UnknownError: connection reset"
        );
    }

    #[test]
    fn remote_error_uses_response_code_as_kind() {
        let err = PostError::Remote {
            kind: "InvalidRequest".into(),
            message: "Record/text must not be longer than 300 graphemes".into(),
        };
        assert_eq!(err.kind(), "InvalidRequest");
        assert_eq!(
            err.status_text(),
            "InvalidRequest: Record/text must not be longer than 300 graphemes"
        );
    }

    #[test]
    fn empty_unknown_error_falls_back_to_generic_text() {
        assert_eq!(PostError::Unknown(String::new()).status_text(), UNKNOWN_ERROR_TEXT);
        assert_eq!(PostError::Unknown("  ".into()).status_text(), UNKNOWN_ERROR_TEXT);
    }
}
