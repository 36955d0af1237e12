//! cpal playback output with sample-accurate scheduling.
//!
//! Scheduled buffers are converted to the device format up front and kept on
//! a timeline keyed by device frame. The output callback mixes whatever
//! overlaps the frames it renders and advances a frame counter, which is the
//! output clock exposed through `current_time`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use parking_lot::Mutex;

use live_session_core::models::audio_models::{AudioDevice, DeviceDirection, PlaybackBuffer};
use live_session_core::models::error::SessionError;
use live_session_core::processing::resampler::LinearResampler;
use live_session_core::traits::audio_output::PlaybackOutput;

use crate::device_enumerator::{self, DeviceEnumerator};
use crate::errors;

/// One scheduled buffer, already at the device rate and channel count.
#[derive(Debug)]
struct Voice {
    id: u64,
    start_frame: u64,
    /// Interleaved at the device channel count.
    samples: Vec<f32>,
}

/// Everything scheduled on the device, shared with the output callback.
#[derive(Debug)]
struct Timeline {
    voices: Vec<Voice>,
    channels: usize,
}

impl Timeline {
    fn new(channels: usize) -> Self {
        Self {
            voices: Vec::new(),
            channels: channels.max(1),
        }
    }

    /// Mix the voices overlapping `[first_frame, first_frame + out.len() / channels)` into `out`.
    ///
    /// Finished voices are dropped.
    fn render(&mut self, first_frame: u64, out: &mut [f32]) {
        out.fill(0.0);
        let channels = self.channels;
        let frames = (out.len() / channels) as u64;
        let end_frame = first_frame + frames;

        for voice in &self.voices {
            let voice_frames = (voice.samples.len() / channels) as u64;
            let voice_end = voice.start_frame + voice_frames;
            if voice_end <= first_frame || voice.start_frame >= end_frame {
                continue;
            }
            let from = voice.start_frame.max(first_frame);
            let to = voice_end.min(end_frame);
            for frame in from..to {
                let out_base = ((frame - first_frame) as usize) * channels;
                let in_base = ((frame - voice.start_frame) as usize) * channels;
                for c in 0..channels {
                    out[out_base + c] += voice.samples[in_base + c];
                }
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        self.voices
            .retain(|v| v.start_frame + (v.samples.len() / channels) as u64 > end_frame);
    }
}

/// Convert a decoded buffer to exactly `frames` interleaved frames at the
/// device format.
///
/// Missing channels repeat the last source channel; extra source channels
/// are ignored. A resampled tail shorter than `frames` holds its last sample.
fn to_device_format(buffer: &PlaybackBuffer, device_rate: u32, device_channels: usize, frames: usize) -> Vec<f32> {
    if buffer.channels.is_empty() || device_channels == 0 {
        return Vec::new();
    }

    let converted: Vec<Vec<f32>> = (0..device_channels)
        .map(|c| {
            let source = &buffer.channels[c.min(buffer.channels.len() - 1)];
            let mut resampler = LinearResampler::new(device_rate as f64);
            let mut samples = resampler.process(source, buffer.sample_rate as f64);
            let hold = samples.last().copied().unwrap_or(0.0);
            samples.resize(frames, hold);
            samples
        })
        .collect();

    let mut interleaved = Vec::with_capacity(frames * device_channels);
    for frame in 0..frames {
        for channel in &converted {
            interleaved.push(channel[frame]);
        }
    }
    interleaved
}

/// Place a buffer on the device timeline.
///
/// The voice spans `[round(start_at * rate), round((start_at + duration) * rate))`,
/// so a buffer starting where the previous one ended shares its boundary frame
/// exactly.
fn prepare_voice(id: u64, buffer: &PlaybackBuffer, start_at: f64, device_rate: u32, device_channels: usize) -> Voice {
    let rate = device_rate as f64;
    let start_at = start_at.max(0.0);
    let start_frame = (start_at * rate).round() as u64;
    let end_frame = ((start_at + buffer.duration_secs()) * rate).round() as u64;
    let frames = end_frame.saturating_sub(start_frame) as usize;
    Voice {
        id,
        start_frame,
        samples: to_device_format(buffer, device_rate, device_channels, frames),
    }
}

struct OpenStream {
    device_rate: u32,
    channels: usize,
    shutdown_tx: mpsc::Sender<()>,
    render_handle: thread::JoinHandle<()>,
}

/// Playback through cpal with a frame-counting clock.
pub struct CpalPlaybackOutput {
    device_name: Option<String>,
    device: Option<AudioDevice>,
    timeline: Arc<Mutex<Timeline>>,
    frames_rendered: Arc<AtomicU64>,
    stream: Option<OpenStream>,
}

impl CpalPlaybackOutput {
    pub fn default_device() -> Self {
        Self::with_device(None)
    }

    /// Play on a specific output device by name (None = system default).
    pub fn with_device(device_name: Option<String>) -> Self {
        Self {
            device_name,
            device: None,
            timeline: Arc::new(Mutex::new(Timeline::new(1))),
            frames_rendered: Arc::new(AtomicU64::new(0)),
            stream: None,
        }
    }
}

impl PlaybackOutput for CpalPlaybackOutput {
    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<(), SessionError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(AudioDevice, u32, usize), SessionError>>(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let device_name = self.device_name.clone();
        let timeline = Arc::clone(&self.timeline);
        let frames_rendered = Arc::clone(&self.frames_rendered);
        frames_rendered.store(0, Ordering::Release);

        let render_handle = thread::Builder::new()
            .name("live-session-playback".into())
            .spawn(move || {
                let stream = match open_output_stream(device_name.as_deref(), timeline, frames_rendered) {
                    Ok((stream, info, rate, channels)) => {
                        let _ = ready_tx.send(Ok((info, rate, channels)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let _ = shutdown_rx.recv();
                drop(stream);
                log::info!("playback stopped");
            })
            .map_err(|e| SessionError::DeviceUnavailable(format!("failed to spawn playback thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok((info, device_rate, device_channels))) => {
                log::info!(
                    "playback on '{}' at {} Hz, {} ch (coach audio {} Hz, {} ch)",
                    info.name,
                    device_rate,
                    device_channels,
                    sample_rate,
                    channels
                );
                self.device = Some(info);
                self.stream = Some(OpenStream {
                    device_rate,
                    channels: device_channels,
                    shutdown_tx,
                    render_handle,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = render_handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = render_handle.join();
                Err(SessionError::DeviceUnavailable("playback thread exited before starting".into()))
            }
        }
    }

    fn current_time(&self) -> f64 {
        match &self.stream {
            Some(stream) => self.frames_rendered.load(Ordering::Acquire) as f64 / stream.device_rate as f64,
            None => 0.0,
        }
    }

    fn schedule(&mut self, id: u64, buffer: PlaybackBuffer, start_at: f64) -> Result<(), SessionError> {
        let Some(stream) = &self.stream else {
            return Err(SessionError::DeviceUnavailable("playback output is not open".into()));
        };
        // Convert before locking; the output callback renders under this lock.
        let voice = prepare_voice(id, &buffer, start_at, stream.device_rate, stream.channels);
        self.timeline.lock().voices.push(voice);
        Ok(())
    }

    fn stop(&mut self, id: u64) {
        self.timeline.lock().voices.retain(|v| v.id != id);
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.timeline.lock().voices.clear();
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let _ = stream.shutdown_tx.send(());
        stream
            .render_handle
            .join()
            .map_err(|_| SessionError::DeviceUnavailable("playback thread panicked".into()))
    }

    fn device_info(&self) -> Option<AudioDevice> {
        self.device.clone()
    }
}

impl Drop for CpalPlaybackOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Build and start an output stream in the device's default format.
fn open_output_stream(
    device_name: Option<&str>,
    timeline: Arc<Mutex<Timeline>>,
    frames_rendered: Arc<AtomicU64>,
) -> Result<(cpal::Stream, AudioDevice, u32, usize), SessionError> {
    let enumerator = DeviceEnumerator::new();
    let device = enumerator.output_device(device_name)?;
    let info = device_enumerator::device_info(&device, DeviceDirection::Output, device_name.is_none());

    let supported = device
        .default_output_config()
        .map_err(|e| errors::from_default_config("output", e))?;
    let sample_format = supported.sample_format();
    let config = supported.config();
    let device_rate = config.sample_rate.0;
    let channels = config.channels as usize;
    *timeline.lock() = Timeline::new(channels);

    let on_error = |err: cpal::StreamError| log::error!("playback stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let first = frames_rendered.load(Ordering::Acquire);
                timeline.lock().render(first, data);
                frames_rendered.fetch_add((data.len() / channels) as u64, Ordering::AcqRel);
            },
            on_error,
            None,
        ),
        cpal::SampleFormat::I16 => {
            let mut scratch = Vec::new();
            device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0f32);
                    let first = frames_rendered.load(Ordering::Acquire);
                    timeline.lock().render(first, &mut scratch);
                    for (out, sample) in data.iter_mut().zip(&scratch) {
                        *out = (sample * 32767.0) as i16;
                    }
                    frames_rendered.fetch_add((data.len() / channels) as u64, Ordering::AcqRel);
                },
                on_error,
                None,
            )
        }
        other => {
            return Err(SessionError::DeviceUnavailable(format!(
                "unsupported output sample format {other:?}"
            )))
        }
    }
    .map_err(|e| errors::from_build("output", e))?;

    stream.play().map_err(|e| errors::from_play("output", e))?;
    Ok((stream, info, device_rate, channels))
}
