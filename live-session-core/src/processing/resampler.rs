/// Streaming linear-interpolation resampler for mono audio.
///
/// Unlike a one-shot resample, the read position and the last input sample
/// carry over between calls, so consecutive device blocks join without clicks
/// and without losing fractional samples at block edges.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    pub target_sample_rate: f64,
    source_sample_rate: Option<f64>,
    /// Read position for the next output sample, relative to `previous`
    /// (index 0) when it is set, otherwise to the first sample of the block.
    position: f64,
    previous: Option<f32>,
}

impl LinearResampler {
    pub fn new(target_sample_rate: f64) -> Self {
        Self {
            target_sample_rate,
            source_sample_rate: None,
            position: 0.0,
            previous: None,
        }
    }

    /// Resample one block delivered at `source_sample_rate`.
    ///
    /// Returns the input unchanged if rates match. A change of source rate
    /// restarts interpolation from the new block.
    pub fn process(&mut self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        if (source_sample_rate - self.target_sample_rate).abs() < 0.01 {
            self.reset();
            return samples.to_vec();
        }
        if self.source_sample_rate != Some(source_sample_rate) {
            self.reset();
            self.source_sample_rate = Some(source_sample_rate);
        }
        if samples.is_empty() {
            return Vec::new();
        }

        let offset = usize::from(self.previous.is_some());
        let total = samples.len() + offset;
        let sample_at = |index: usize| -> f32 {
            match (index, self.previous) {
                (0, Some(previous)) => previous,
                _ => samples[index - offset],
            }
        };

        let step = source_sample_rate / self.target_sample_rate;
        let last = (total - 1) as f64;
        let mut output = Vec::with_capacity((samples.len() as f64 / step) as usize + 1);
        let mut position = self.position;
        while position < last {
            let index = position as usize;
            let fraction = (position - index as f64) as f32;
            output.push(sample_at(index) * (1.0 - fraction) + sample_at(index + 1) * fraction);
            position += step;
        }

        self.position = position - last;
        self.previous = samples.last().copied();
        output
    }

    pub fn reset(&mut self) {
        self.source_sample_rate = None;
        self.position = 0.0;
        self.previous = None;
    }
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// RMS level of samples (0.0–1.0 range for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}
