//! Mapping of cpal failures onto session errors.
//!
//! cpal has no dedicated "permission denied" variant; backends report it as
//! a backend-specific error, so the message text is checked.

use live_session_core::models::error::SessionError;

fn looks_like_denial(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["permission", "denied", "not authorized", "access is"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn classify(context: &str, message: String) -> SessionError {
    if looks_like_denial(&message) {
        log::warn!("{} refused: {}", context, message);
        SessionError::PermissionDenied
    } else {
        SessionError::DeviceUnavailable(format!("{context}: {message}"))
    }
}

pub(crate) fn from_build(context: &str, err: cpal::BuildStreamError) -> SessionError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            SessionError::DeviceUnavailable(format!("{context}: device disconnected"))
        }
        other => classify(context, other.to_string()),
    }
}

pub(crate) fn from_play(context: &str, err: cpal::PlayStreamError) -> SessionError {
    match err {
        cpal::PlayStreamError::DeviceNotAvailable => {
            SessionError::DeviceUnavailable(format!("{context}: device disconnected"))
        }
        other => classify(context, other.to_string()),
    }
}

pub(crate) fn from_default_config(context: &str, err: cpal::DefaultStreamConfigError) -> SessionError {
    classify(context, err.to_string())
}

pub(crate) fn from_devices(err: cpal::DevicesError) -> SessionError {
    SessionError::DeviceUnavailable(format!("failed to enumerate devices: {err}"))
}
