//! cpal microphone provider.
//!
//! Opens the device's native input format and delivers interleaved f32
//! samples via the `AudioBufferCallback`. Downmixing and resampling happen in
//! the core capture pipeline.

use std::sync::mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};

use live_session_core::models::audio_models::{AudioDevice, DeviceDirection};
use live_session_core::models::error::SessionError;
use live_session_core::traits::microphone::{AudioBufferCallback, MicrophoneProvider};

use crate::device_enumerator::{self, DeviceEnumerator};
use crate::errors;

/// Microphone capture through cpal.
///
/// cpal streams are not `Send`, so each capture runs on a dedicated thread
/// that owns the stream until `stop` signals it.
pub struct CpalMicrophone {
    device_name: Option<String>,
    device: Option<AudioDevice>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl CpalMicrophone {
    /// Capture from the system default microphone.
    pub fn default_device() -> Self {
        Self::with_device(None)
    }

    /// Capture from a specific microphone by name (None = system default).
    pub fn with_device(device_name: Option<String>) -> Self {
        Self {
            device_name,
            device: None,
            shutdown_tx: None,
            capture_handle: None,
        }
    }
}

impl MicrophoneProvider for CpalMicrophone {
    fn is_available(&self) -> bool {
        DeviceEnumerator::new()
            .input_device(self.device_name.as_deref())
            .is_ok()
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError> {
        if self.capture_handle.is_some() {
            return Err(SessionError::ConfigurationFailed("microphone already running".into()));
        }

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<AudioDevice, SessionError>>(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let device_name = self.device_name.clone();

        let handle = thread::Builder::new()
            .name("live-session-mic".into())
            .spawn(move || {
                let stream = match open_input_stream(device_name.as_deref(), callback) {
                    Ok((stream, info)) => {
                        let _ = ready_tx.send(Ok(info));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Blocks until stop() sends or drops the sender.
                let _ = shutdown_rx.recv();
                drop(stream);
                log::info!("microphone capture stopped");
            })
            .map_err(|e| SessionError::DeviceUnavailable(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(info)) => {
                log::info!("microphone capture started on '{}'", info.name);
                self.device = Some(info);
                self.shutdown_tx = Some(shutdown_tx);
                self.capture_handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(SessionError::DeviceUnavailable("capture thread exited before starting".into()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.capture_handle.take() {
            handle
                .join()
                .map_err(|_| SessionError::DeviceUnavailable("capture thread panicked".into()))?;
        }
        Ok(())
    }

    fn device_info(&self) -> Option<AudioDevice> {
        self.device.clone()
    }
}

impl Drop for CpalMicrophone {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Build and start an input stream in the device's native format.
///
/// Runs on the capture thread, which then owns the returned stream.
fn open_input_stream(
    device_name: Option<&str>,
    callback: AudioBufferCallback,
) -> Result<(cpal::Stream, AudioDevice), SessionError> {
    let enumerator = DeviceEnumerator::new();
    let device = enumerator.input_device(device_name)?;
    let info = device_info(&device, device_name.is_none());

    let supported = device
        .default_input_config()
        .map_err(|e| errors::from_default_config("microphone", e))?;
    let sample_format = supported.sample_format();
    let config = supported.config();
    let sample_rate = config.sample_rate.0 as f64;
    let channels = config.channels;
    log::debug!(
        "microphone native format: {} Hz, {} ch, {:?}",
        config.sample_rate.0,
        channels,
        sample_format
    );

    let on_error = |err: cpal::StreamError| log::error!("microphone stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| callback(data, sample_rate, channels),
            on_error,
            None,
        ),
        cpal::SampleFormat::I16 => {
            let mut scratch = Vec::new();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| s as f32 / 32768.0));
                    callback(&scratch, sample_rate, channels);
                },
                on_error,
                None,
            )
        }
        cpal::SampleFormat::U16 => {
            let mut scratch = Vec::new();
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0));
                    callback(&scratch, sample_rate, channels);
                },
                on_error,
                None,
            )
        }
        other => {
            return Err(SessionError::DeviceUnavailable(format!(
                "unsupported microphone sample format {other:?}"
            )))
        }
    }
    .map_err(|e| errors::from_build("microphone", e))?;

    stream.play().map_err(|e| errors::from_play("microphone", e))?;
    Ok((stream, info))
}

fn device_info(device: &cpal::Device, is_default: bool) -> AudioDevice {
    device_enumerator::device_info(device, DeviceDirection::Input, is_default)
}
