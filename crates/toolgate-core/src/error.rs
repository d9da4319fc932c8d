/// Core error type for the toolgate system.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0} not set")]
    NotConfigured(String),

    #[error("{service} API error: {message}")]
    Upstream { service: String, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an upstream error for the named service.
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether the caller supplied a bad request (as opposed to a failure
    /// talking to the backing service).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_) | Self::MissingArgument(_) | Self::InvalidArguments(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_message() {
        let err = Error::UnknownTool("nope".to_string());
        assert_eq!(err.to_string(), "Unknown tool: nope");
    }

    #[test]
    fn upstream_message_carries_service() {
        let err = Error::upstream("Slack", "channel_not_found");
        assert_eq!(err.to_string(), "Slack API error: channel_not_found");
        assert!(!err.is_client_error());
    }

    #[test]
    fn client_errors() {
        assert!(Error::MissingArgument("text".into()).is_client_error());
        assert!(Error::InvalidArguments("bad".into()).is_client_error());
        assert!(!Error::NotConfigured("SLACK_BOT_TOKEN".into()).is_client_error());
    }
}
