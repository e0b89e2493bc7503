use thiserror::Error;

/// Errors raised while talking to the remote messaging channel.
///
/// The variant decides whether the failed call may be retried: connectivity
/// problems and 5xx responses are transient, everything else is final.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel unreachable: {0}")]
    Connectivity(String),

    #[error("channel server error: HTTP {status}{}", format_detail(.message))]
    Server { status: u16, message: Option<String> },

    #[error("channel rejected request: HTTP {status}{}", format_detail(.message))]
    Rejected { status: u16, message: Option<String> },

    #[error("invalid channel response: {0}")]
    Decode(String),
}

fn format_detail(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(" - {message}"),
        None => String::new(),
    }
}

impl ChannelError {
    /// Builds the error matching an unsuccessful HTTP status.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        if status >= 500 {
            ChannelError::Server { status, message }
        } else {
            ChannelError::Rejected { status, message }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChannelError::Connectivity(_) | ChannelError::Server { .. }
        )
    }

    /// Message supplied by the remote side, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ChannelError::Server { message, .. } | ChannelError::Rejected { message, .. } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }
}

/// Session-level failures. None of these carry a partial aggregate: the
/// caller fixes the precondition and starts the whole session again.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("messaging channel is not connected (state: {state})")]
    NotConnected { state: String },

    #[error("a dispatch session is already running")]
    SessionActive,

    #[error("media upload failed for {file}: {reason}")]
    MediaUpload { file: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ChannelError::from_status(503, None).is_retryable());
        assert!(ChannelError::from_status(500, Some("boom".into())).is_retryable());
        assert!(!ChannelError::from_status(400, None).is_retryable());
        assert!(!ChannelError::from_status(422, None).is_retryable());
        assert!(ChannelError::Connectivity("timeout".into()).is_retryable());
        assert!(!ChannelError::Decode("bad json".into()).is_retryable());
    }

    #[test]
    fn test_server_message_ignores_blank() {
        let err = ChannelError::from_status(400, Some("  ".into()));
        assert_eq!(err.server_message(), None);

        let err = ChannelError::from_status(400, Some("invalid number".into()));
        assert_eq!(err.server_message(), Some("invalid number"));
        assert_eq!(
            err.to_string(),
            "channel rejected request: HTTP 400 - invalid number"
        );
    }
}
