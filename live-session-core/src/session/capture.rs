use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::SessionConfiguration;
use crate::models::error::SessionError;
use crate::processing::frame_buffer::FrameBuffer;
use crate::processing::outbound_queue::OutboundQueue;
use crate::processing::resampler::{self, LinearResampler};
use crate::session::shared::SharedState;
use crate::traits::microphone::{AudioBufferCallback, MicrophoneProvider};

/// Microphone → mono → capture rate → fixed frames → outbound queue.
///
/// ```text
/// [MicrophoneProvider] → downmix → LinearResampler → FrameBuffer → [OutboundQueue]
///                                         └→ input levels / diagnostics
/// ```
pub struct CapturePipeline<M: MicrophoneProvider> {
    microphone: M,
    queue: Arc<OutboundQueue>,
    shared: Arc<Mutex<SharedState>>,
    target_sample_rate: u32,
    frame_size: usize,
    active: Arc<AtomicBool>,
    open: bool,
}

/// Per-stream state touched only from the audio callback.
struct CaptureStage {
    resampler: LinearResampler,
    framer: FrameBuffer,
}

impl<M: MicrophoneProvider> CapturePipeline<M> {
    pub(crate) fn new(
        microphone: M,
        config: &SessionConfiguration,
        queue: Arc<OutboundQueue>,
        shared: Arc<Mutex<SharedState>>,
    ) -> Self {
        Self {
            microphone,
            queue,
            shared,
            target_sample_rate: config.capture_sample_rate,
            frame_size: config.frame_size,
            active: Arc::new(AtomicBool::new(false)),
            open: false,
        }
    }

    /// Start the microphone. Frames flow into the queue until `close`.
    pub fn open(&mut self) -> Result<(), SessionError> {
        if self.open {
            return Ok(());
        }

        let stage = Mutex::new(CaptureStage {
            resampler: LinearResampler::new(self.target_sample_rate as f64),
            framer: FrameBuffer::new(self.frame_size),
        });
        let queue = Arc::clone(&self.queue);
        let shared = Arc::clone(&self.shared);
        let active = Arc::clone(&self.active);

        let callback: AudioBufferCallback = Arc::new(move |samples: &[f32], sample_rate: f64, channels: u16| {
            if !active.load(Ordering::Acquire) {
                return;
            }

            let mono = resampler::downmix_to_mono(samples, channels as usize);
            let frames = {
                let mut stage = stage.lock();
                let resampled = stage.resampler.process(&mono, sample_rate);

                let rms = resampler::rms_level(&resampled);
                let peak = resampler::peak_level(&resampled);
                {
                    let mut s = shared.lock();
                    s.diagnostics.input_levels.rms = rms;
                    s.diagnostics.input_levels.peak = peak;
                    s.diagnostics.capture_callback_count += 1;
                    if s.diagnostics.capture_format.is_empty() {
                        s.diagnostics.capture_format = format!("{sample_rate} Hz, {channels} ch, f32");
                    }
                }

                stage.framer.push(&resampled)
            };

            if frames.is_empty() {
                return;
            }
            let produced = frames.len() as u64;
            let mut dropped = 0u64;
            for frame in frames {
                if queue.push(frame).is_some() {
                    dropped += 1;
                }
            }
            if dropped > 0 {
                log::debug!("outbound queue full, dropped {} oldest chunk(s)", dropped);
            }

            let mut s = shared.lock();
            s.diagnostics.chunks_captured += produced;
            s.diagnostics.chunks_dropped += dropped;
        });

        self.active.store(true, Ordering::Release);
        if let Err(e) = self.microphone.start(callback) {
            self.active.store(false, Ordering::Release);
            return Err(e);
        }
        self.open = true;

        if let Some(device) = self.microphone.device_info() {
            log::info!("capturing from '{}'", device.name);
        }
        Ok(())
    }

    /// Stop the microphone and release the device.
    ///
    /// Does nothing if the pipeline is not open.
    pub fn close(&mut self) -> Result<(), SessionError> {
        self.active.store(false, Ordering::Release);
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.microphone.stop()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}
