use std::sync::Arc;

use crate::models::audio_models::AudioDevice;
use crate::models::error::SessionError;

/// Callback invoked when an audio buffer is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of channels (1 = mono, 2 = stereo interleaved).
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// Interface for a platform microphone.
///
/// Implemented by:
/// - `CpalMicrophone` (desktop, in `live-session-native`)
pub trait MicrophoneProvider: Send {
    /// Whether a capture device is currently present.
    fn is_available(&self) -> bool;

    /// Start capturing audio, delivering buffers via `callback`.
    ///
    /// The callback fires on the backend's audio thread, so keep processing minimal.
    /// Fails with `PermissionDenied` or `DeviceUnavailable`.
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError>;

    /// Stop capturing and release the device. Safe to call repeatedly.
    fn stop(&mut self) -> Result<(), SessionError>;

    /// Information about the audio device backing this provider.
    fn device_info(&self) -> Option<AudioDevice>;
}
