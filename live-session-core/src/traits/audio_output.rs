use crate::models::audio_models::{AudioDevice, PlaybackBuffer};
use crate::models::error::SessionError;

/// Interface for a platform audio output that can play buffers at precise
/// times on its own clock.
///
/// Implemented by:
/// - `CpalPlaybackOutput` (desktop, in `live-session-native`)
/// - test doubles with a manually advanced clock
pub trait PlaybackOutput: Send {
    /// Acquire the output device for buffers of the given format.
    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<(), SessionError>;

    /// Monotonic output clock in seconds. Starts at 0 when opened.
    fn current_time(&self) -> f64;

    /// Play `buffer` starting at `start_at` on the output clock.
    ///
    /// A start time already in the past plays immediately.
    fn schedule(&mut self, id: u64, buffer: PlaybackBuffer, start_at: f64) -> Result<(), SessionError>;

    /// Stop a scheduled or playing buffer. Unknown ids are ignored.
    fn stop(&mut self, id: u64);

    /// Release the output device. Safe to call when already closed.
    fn close(&mut self) -> Result<(), SessionError>;

    /// Information about the device backing this output.
    fn device_info(&self) -> Option<AudioDevice> {
        None
    }
}
