use crate::models::audio_models::SessionDiagnostics;
use crate::models::error::SessionError;
use crate::processing::transcript::ConversationHistory;

/// Session data read by handles and written by the session task and the
/// capture callback, protected by `parking_lot::Mutex`.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub(crate) diagnostics: SessionDiagnostics,
    pub(crate) history: ConversationHistory,
    pub(crate) last_error: Option<SessionError>,
    /// Set once the remote accepted the session; never cleared.
    pub(crate) opened: bool,
}
