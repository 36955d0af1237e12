//! # live-session-core
//!
//! Platform-agnostic core of a real-time spoken practice session.
//!
//! Captures student speech, streams it to a remote conversational model,
//! plays the coach's streamed audio back without gaps, tracks transcripts
//! per turn, and tears everything down on error, interruption or close.
//! Platform backends implement `MicrophoneProvider`, `PlaybackOutput` and
//! `RealtimeTransport` and plug into the generic `LiveSession`.
//!
//! ## Architecture
//!
//! ```text
//! live-session-core (this crate)
//! ├── traits/       ← MicrophoneProvider, PlaybackOutput, RealtimeTransport, SessionDelegate
//! ├── models/       ← SessionError, SessionState, SessionConfiguration, audio types
//! ├── processing/   ← PCM codec, resampler, frame buffer, outbound queue, playback scheduler, transcripts
//! ├── protocol/     ← setup / realtime-input / server message JSON
//! └── session/      ← CapturePipeline, SessionResources, LiveSession
//! ```

pub mod models;
pub mod processing;
pub mod protocol;
pub mod session;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{
    AudioChunk, AudioDevice, DeviceDirection, InputLevels, PlaybackBuffer, ScheduledSource, SessionDiagnostics,
    WireAudioBlob,
};
pub use models::config::SessionConfiguration;
pub use models::error::SessionError;
pub use models::state::SessionState;
pub use processing::outbound_queue::OutboundQueue;
pub use processing::playback_scheduler::PlaybackScheduler;
pub use processing::resampler::LinearResampler;
pub use processing::transcript::{ConversationHistory, TranscriptAccumulator};
pub use protocol::{parse_server_message, RealtimeInputMessage, ServerEvent, SetupMessage};
pub use session::lifecycle::{ReleaseReport, Resource};
pub use session::live::{LiveSession, SessionHandle};
pub use traits::audio_output::PlaybackOutput;
pub use traits::microphone::{AudioBufferCallback, MicrophoneProvider};
pub use traits::session_delegate::SessionDelegate;
pub use traits::transport::RealtimeTransport;
