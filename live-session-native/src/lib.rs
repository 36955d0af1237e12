//! # live-session-native
//!
//! Desktop backend for live-session-core.
//!
//! Provides:
//! - `CpalMicrophone`: Microphone capture via cpal in the device's native format
//! - `CpalPlaybackOutput`: Scheduled playback via cpal with a frame-counting clock
//! - `WebSocketTransport`: Connection to the conversational endpoint via tokio-tungstenite
//! - `DeviceEnumerator`: Input and output device enumeration
//! - `permissions`: Microphone access probe
//!
//! ## Usage
//! ```ignore
//! use live_session_core::{LiveSession, SessionConfiguration};
//! use live_session_native::{CpalMicrophone, CpalPlaybackOutput, WebSocketTransport};
//!
//! let config = SessionConfiguration::default();
//! let transport = WebSocketTransport::new(&config);
//! let handle = LiveSession::start(
//!     config,
//!     CpalMicrophone::default_device(),
//!     CpalPlaybackOutput::default_device(),
//!     transport,
//!     delegate,
//! )
//! .await?;
//! ```

pub mod cpal_microphone;
pub mod cpal_output;
pub mod device_enumerator;
mod errors;
pub mod permissions;
pub mod websocket_transport;

pub use cpal_microphone::CpalMicrophone;
pub use cpal_output::CpalPlaybackOutput;
pub use device_enumerator::DeviceEnumerator;
pub use websocket_transport::WebSocketTransport;
