//! Error taxonomy for the scripting bridge

/// Errors raised while talking to KWin, the journal or the process table
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IPC call {method} failed: {message}")]
    Ipc { method: String, message: String },

    #[error("Unexpected reply from KWin: {message}")]
    Protocol { message: String },

    #[error("Failed to parse {entity}: {message}")]
    Parse {
        entity: &'static str,
        message: String,
    },

    #[error("Invalid identifier '{value}': {message}")]
    Identifier { value: String, message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl BridgeError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BridgeError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        BridgeError::Protocol {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_protocol_error_display() {
        let error = BridgeError::protocol("expected 2 lines, got 1");
        assert_eq!(
            error.to_string(),
            "Unexpected reply from KWin: expected 2 lines, got 1"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let error = BridgeError::io(
            "writing script file",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.to_string().starts_with("I/O error while writing script file"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BridgeError>();
    }
}
