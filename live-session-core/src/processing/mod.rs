pub mod frame_buffer;
pub mod outbound_queue;
pub mod pcm_codec;
pub mod playback_scheduler;
pub mod resampler;
pub mod transcript;
