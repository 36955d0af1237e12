use async_trait::async_trait;

use crate::models::audio_models::WireAudioBlob;
use crate::models::error::SessionError;
use crate::protocol::{ServerEvent, SetupMessage};

/// A bidirectional connection to the remote conversational endpoint.
///
/// Implemented by:
/// - `WebSocketTransport` (in `live-session-native`)
#[async_trait]
pub trait RealtimeTransport: Send {
    /// Connect and send `setup`. Resolves once the remote confirms the setup.
    ///
    /// Dropping the returned future abandons the attempt; `close` must still
    /// be safe to call afterwards.
    async fn connect(&mut self, setup: &SetupMessage) -> Result<(), SessionError>;

    /// Send one chunk of student audio.
    async fn send_audio(&mut self, blob: &WireAudioBlob) -> Result<(), SessionError>;

    /// Next event from the remote.
    ///
    /// `None` means the remote closed normally. Must be cancel-safe: an event
    /// is never lost when the future is dropped before completing.
    async fn next_event(&mut self) -> Option<Result<ServerEvent, SessionError>>;

    /// Close the connection. Safe to call when never connected or already closed.
    async fn close(&mut self) -> Result<(), SessionError>;
}
