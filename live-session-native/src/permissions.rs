//! Microphone access probe.
//!
//! Desktop platforms surface a denied microphone only when a stream is
//! opened, so the probe briefly builds (but never plays) an input stream on
//! the default device.

use cpal::traits::{DeviceTrait, HostTrait};

use live_session_core::models::error::SessionError;

use crate::errors;

/// Check if microphone access is available.
///
/// Returns `Ok(false)` when there is no capture device or access was refused.
/// Other failures are logged and treated as available, so the real error
/// surfaces when the session opens the device.
pub fn check_microphone_permission() -> Result<bool, SessionError> {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        return Ok(false);
    };

    let config = match device.default_input_config() {
        Ok(config) => config.config(),
        Err(e) => {
            return match errors::from_default_config("microphone", e) {
                SessionError::PermissionDenied => Ok(false),
                other => {
                    log::warn!("unexpected error checking microphone permission: {}", other);
                    Ok(true)
                }
            };
        }
    };

    let probe = device.build_input_stream(
        &config,
        |_data: &[f32], _: &cpal::InputCallbackInfo| {},
        |err| log::debug!("permission probe stream error: {}", err),
        None,
    );
    match probe {
        Ok(_stream) => Ok(true),
        Err(e) => match errors::from_build("microphone", e) {
            SessionError::PermissionDenied => Ok(false),
            other => {
                log::warn!("unexpected error checking microphone permission: {}", other);
                Ok(true)
            }
        },
    }
}
