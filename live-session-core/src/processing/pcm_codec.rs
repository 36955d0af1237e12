//! Float ↔ 16-bit little-endian PCM conversion and base64 transport encoding.
//!
//! Everything here is pure and allocation-only; no state is kept between calls.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::models::audio_models::{PlaybackBuffer, WireAudioBlob};
use crate::models::config::CAPTURE_SAMPLE_RATE;
use crate::models::error::SessionError;

/// MIME descriptor of the audio the remote endpoint expects.
pub const PCM_MIME_16K: &str = "audio/pcm;rate=16000";

const PCM_SCALE: f32 = 32768.0;

/// Encode mono f32 samples as a 16 kHz wire blob.
///
/// Each sample is multiplied by 32768 and truncated to `i16`. The cast
/// saturates, so `1.0` encodes as `32767` and anything below `-1.0` as `-32768`.
pub fn encode_chunk(samples: &[f32]) -> WireAudioBlob {
    encode_chunk_at(samples, CAPTURE_SAMPLE_RATE)
}

/// Same as [`encode_chunk`] but tagged with an explicit sample rate.
pub fn encode_chunk_at(samples: &[f32], sample_rate: u32) -> WireAudioBlob {
    let mime_type = if sample_rate == CAPTURE_SAMPLE_RATE {
        PCM_MIME_16K.to_string()
    } else {
        format!("audio/pcm;rate={sample_rate}")
    };
    WireAudioBlob {
        mime_type,
        data: STANDARD.encode(float_to_pcm16(samples)),
    }
}

/// Convert f32 samples to little-endian 16-bit PCM bytes.
///
/// Output length = `samples.len() * 2` bytes.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample * PCM_SCALE) as i16;
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}

/// Decode interleaved 16-bit LE PCM into a per-channel playback buffer.
///
/// The byte length must be a whole number of frames (`channel_count * 2`
/// bytes each); anything else is rejected rather than truncated.
pub fn decode_blob(
    bytes: &[u8],
    target_sample_rate: u32,
    channel_count: u16,
) -> Result<PlaybackBuffer, SessionError> {
    if channel_count == 0 {
        return Err(SessionError::DecodeError("channel count must be positive".into()));
    }
    if target_sample_rate == 0 {
        return Err(SessionError::DecodeError("sample rate must be positive".into()));
    }
    let channels = channel_count as usize;
    let frame_bytes = channels * 2;
    if bytes.len() % frame_bytes != 0 {
        return Err(SessionError::DecodeError(format!(
            "{} bytes is not a whole number of {}-channel 16-bit frames",
            bytes.len(),
            channels
        )));
    }

    let frames = bytes.len() / frame_bytes;
    let mut data = vec![Vec::with_capacity(frames); channels];
    for (index, pair) in bytes.chunks_exact(2).enumerate() {
        let value = i16::from_le_bytes([pair[0], pair[1]]);
        data[index % channels].push(value as f32 / PCM_SCALE);
    }

    Ok(PlaybackBuffer {
        sample_rate: target_sample_rate,
        channels: data,
        frames,
    })
}

/// Decode the base64 transport text of an inline audio part.
pub fn decode_transport(text: &str) -> Result<Vec<u8>, SessionError> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| SessionError::DecodeError(format!("invalid base64 audio: {e}")))
}

/// Read the `rate=` parameter of a PCM MIME type such as `audio/pcm;rate=24000`.
pub fn pcm_rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
}
