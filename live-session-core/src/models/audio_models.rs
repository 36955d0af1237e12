use serde::{Deserialize, Serialize};

/// One fixed-size block of mono capture audio, ready to be sent upstream.
///
/// Samples are f32 in `[-1.0, 1.0]` at the configured capture rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Capture order, starting at 0 for the first chunk of a session.
    pub sequence: u64,
    pub samples: Vec<f32>,
}

/// Base64-encoded 16-bit PCM as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAudioBlob {
    pub mime_type: String,
    pub data: String,
}

/// Decoded coach audio, one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
    pub frames: usize,
}

impl PlaybackBuffer {
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Length of the buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    /// Interleaved `[L0, R0, L1, R1, ...]` view, as most output devices expect.
    pub fn interleaved(&self) -> Vec<f32> {
        let channel_count = self.channels.len();
        let mut out = Vec::with_capacity(self.frames * channel_count);
        for frame in 0..self.frames {
            for channel in &self.channels {
                out.push(channel.get(frame).copied().unwrap_or(0.0));
            }
        }
        out
    }
}

/// A buffer that has been handed to the output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSource {
    pub id: u64,
    /// Output-clock time (seconds) the buffer starts playing.
    pub start_time: f64,
    pub duration: f64,
}

impl ScheduledSource {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Real-time input level metering (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputLevels {
    pub rms: f32,
    pub peak: f32,
}

/// Counters for debugging a live session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDiagnostics {
    pub capture_callback_count: u64,
    pub capture_format: String,
    pub chunks_captured: u64,
    pub chunks_sent: u64,
    pub chunks_dropped: u64,
    pub audio_fragments_received: u64,
    pub buffers_scheduled: u64,
    pub interruptions: u64,
    pub turns_completed: u64,
    pub input_levels: InputLevels,
}

/// Direction of an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceDirection {
    Input,
    Output,
}

/// An audio device available for capture or playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    pub direction: DeviceDirection,
    pub is_default: bool,
}
