use crate::models::audio_models::AudioChunk;

/// Accumulates mono samples and cuts them into fixed-size frames.
///
/// Blocks arrive in whatever size the device delivers; every time the
/// accumulated count reaches `frame_size` a chunk is emitted, so capture
/// lags by at most one frame.
#[derive(Debug)]
pub struct FrameBuffer {
    pending: Vec<f32>,
    frame_size: usize,
    next_sequence: u64,
}

impl FrameBuffer {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            pending: Vec::with_capacity(frame_size),
            frame_size,
            next_sequence: 0,
        }
    }

    /// Append samples, returning every frame they completed, in order.
    pub fn push(&mut self, mut samples: &[f32]) -> Vec<AudioChunk> {
        let mut frames = Vec::new();
        while !samples.is_empty() {
            let take = (self.frame_size - self.pending.len()).min(samples.len());
            self.pending.extend_from_slice(&samples[..take]);
            samples = &samples[take..];

            if self.pending.len() == self.frame_size {
                let full = std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_size));
                frames.push(AudioChunk {
                    sequence: self.next_sequence,
                    samples: full,
                });
                self.next_sequence += 1;
            }
        }
        frames
    }

    /// Samples waiting for the next frame to fill.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}
