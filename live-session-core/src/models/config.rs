use serde::{Deserialize, Serialize};

/// Sample rate the remote endpoint expects for student audio.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of the coach audio returned by the remote endpoint.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Samples per captured frame (≈256 ms at 16 kHz).
pub const CAPTURE_FRAME_SIZE: usize = 4096;

/// Configuration for a live speaking session.
///
/// Every field has a default, so a partial JSON document is enough to
/// override just the endpoint or the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfiguration {
    /// WebSocket endpoint of the conversational model.
    pub endpoint_url: String,

    /// API key, appended to the endpoint as the `key` query parameter.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model resource name sent in the setup message.
    pub model: String,

    /// Prebuilt voice used for the coach.
    pub voice_name: String,

    /// System instruction, opaque to the session.
    pub system_instruction: String,

    /// Capture rate sent upstream, in Hz (default: 16000).
    pub capture_sample_rate: u32,

    /// Samples per outbound chunk (default: 4096).
    pub frame_size: usize,

    /// Rate of coach audio when the fragment's MIME type does not say (default: 24000).
    pub playback_sample_rate: u32,

    /// Channels in coach audio (default: 1).
    pub playback_channels: u16,

    /// Frames held while the connection is establishing or stalled.
    /// When full, the oldest frame is dropped.
    pub outbound_queue_capacity: usize,

    /// How often finished playback sources are reaped, in milliseconds.
    pub playback_poll_interval_ms: u64,

    /// Specific microphone by name, or None for the system default.
    pub microphone_device: Option<String>,

    /// Specific output device by name, or None for the system default.
    pub output_device: Option<String>,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint_url.is_empty() {
            return Err("endpoint url must not be empty".into());
        }
        if !(self.endpoint_url.starts_with("ws://") || self.endpoint_url.starts_with("wss://")) {
            return Err(format!("endpoint url must use ws:// or wss://: {}", self.endpoint_url));
        }
        if self.model.is_empty() {
            return Err("model must not be empty".into());
        }
        if self.capture_sample_rate == 0 || self.playback_sample_rate == 0 {
            return Err("sample rates must be positive".into());
        }
        if self.frame_size == 0 {
            return Err("frame size must be positive".into());
        }
        if ![1, 2].contains(&self.playback_channels) {
            return Err(format!("unsupported playback channel count: {}", self.playback_channels));
        }
        if self.outbound_queue_capacity == 0 {
            return Err("outbound queue capacity must be positive".into());
        }
        if self.playback_poll_interval_ms == 0 {
            return Err("playback poll interval must be positive".into());
        }
        Ok(())
    }

    /// Endpoint URL with the API key attached, if one is configured.
    pub fn connection_url(&self) -> String {
        match &self.api_key {
            Some(key) if !key.is_empty() => {
                let separator = if self.endpoint_url.contains('?') { '&' } else { '?' };
                format!("{}{}key={}", self.endpoint_url, separator, key)
            }
            _ => self.endpoint_url.clone(),
        }
    }

    /// MIME descriptor for outbound audio, e.g. `audio/pcm;rate=16000`.
    pub fn capture_mime_type(&self) -> String {
        format!("audio/pcm;rate={}", self.capture_sample_rate)
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            endpoint_url: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".into(),
            api_key: None,
            model: "models/gemini-2.5-flash-native-audio-preview-09-2025".into(),
            voice_name: "Zephyr".into(),
            system_instruction: "You are a friendly English speaking coach. Keep replies short and encourage the student to keep talking.".into(),
            capture_sample_rate: CAPTURE_SAMPLE_RATE,
            frame_size: CAPTURE_FRAME_SIZE,
            playback_sample_rate: PLAYBACK_SAMPLE_RATE,
            playback_channels: 1,
            outbound_queue_capacity: 64,
            playback_poll_interval_ms: 50,
            microphone_device: None,
            output_device: None,
        }
    }
}
