use thiserror::Error;

/// Errors that can occur while running a live speaking session.
///
/// None of these are retried automatically. Each is reported once through
/// `SessionDelegate::on_error` and followed by a full teardown.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl SessionError {
    /// Human-readable message suitable for showing to the student.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Microphone access was denied. Allow microphone access and try again.".into()
            }
            Self::DeviceUnavailable(detail) => {
                format!("No usable audio device was found ({detail}).")
            }
            Self::ConnectionError(detail) => {
                format!("Lost connection to the speaking coach ({detail}).")
            }
            Self::ProtocolError(detail) => {
                format!("The speaking coach sent an unexpected message ({detail}).")
            }
            Self::DecodeError(detail) => {
                format!("Could not play the coach's audio ({detail}).")
            }
            Self::ConfigurationFailed(detail) => {
                format!("The speaking session is misconfigured ({detail}).")
            }
        }
    }
}
