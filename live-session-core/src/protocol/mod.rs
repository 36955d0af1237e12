//! JSON messages exchanged with the remote conversational endpoint.
//!
//! ```text
//! client → {"setup": {...}}
//! server → {"setupComplete": {}}
//! client → {"realtimeInput": {"mediaChunks": [{"mimeType", "data"}]}}   (repeated)
//! server → {"serverContent": {"inputTranscription" | "outputTranscription"
//!                             | "modelTurn" | "interrupted" | "turnComplete"}}
//! server → {"goAway": {"timeLeft"}}
//! ```

pub mod client;
pub mod server;

pub use client::{RealtimeInputMessage, SetupMessage};
pub use server::{parse_server_message, ServerEvent};
