pub mod audio_output;
pub mod microphone;
pub mod session_delegate;
pub mod transport;
