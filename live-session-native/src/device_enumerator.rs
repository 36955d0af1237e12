//! Audio device enumeration through the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use live_session_core::models::audio_models::{AudioDevice, DeviceDirection};
use live_session_core::models::error::SessionError;

use crate::errors;

/// Lists and resolves input and output devices on the default host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List capture (microphone) devices.
    pub fn list_input_devices(&self) -> Result<Vec<AudioDevice>, SessionError> {
        let default_name = self.host.default_input_device().and_then(|d| d.name().ok());
        let devices = self.host.input_devices().map_err(errors::from_devices)?;
        Ok(describe(devices, DeviceDirection::Input, default_name.as_deref()))
    }

    /// List playback devices.
    pub fn list_output_devices(&self) -> Result<Vec<AudioDevice>, SessionError> {
        let default_name = self.host.default_output_device().and_then(|d| d.name().ok());
        let devices = self.host.output_devices().map_err(errors::from_devices)?;
        Ok(describe(devices, DeviceDirection::Output, default_name.as_deref()))
    }

    /// Resolve a microphone by name, or the default one.
    pub fn input_device(&self, name: Option<&str>) -> Result<cpal::Device, SessionError> {
        match name {
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| SessionError::DeviceUnavailable("no default microphone".into())),
            Some(wanted) => {
                let mut devices = self.host.input_devices().map_err(errors::from_devices)?;
                devices
                    .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                    .ok_or_else(|| SessionError::DeviceUnavailable(format!("microphone '{wanted}' not found")))
            }
        }
    }

    /// Resolve an output device by name, or the default one.
    pub fn output_device(&self, name: Option<&str>) -> Result<cpal::Device, SessionError> {
        match name {
            None => self
                .host
                .default_output_device()
                .ok_or_else(|| SessionError::DeviceUnavailable("no default output device".into())),
            Some(wanted) => {
                let mut devices = self.host.output_devices().map_err(errors::from_devices)?;
                devices
                    .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                    .ok_or_else(|| SessionError::DeviceUnavailable(format!("output '{wanted}' not found")))
            }
        }
    }
}

/// Describe a resolved cpal device.
pub(crate) fn device_info(device: &cpal::Device, direction: DeviceDirection, is_default: bool) -> AudioDevice {
    let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
    AudioDevice {
        id: device_id(direction, &name),
        name,
        direction,
        is_default,
    }
}

fn device_id(direction: DeviceDirection, name: &str) -> String {
    let prefix = match direction {
        DeviceDirection::Input => "input",
        DeviceDirection::Output => "output",
    };
    format!("{prefix}:{name}")
}

fn describe(
    devices: impl Iterator<Item = cpal::Device>,
    direction: DeviceDirection,
    default_name: Option<&str>,
) -> Vec<AudioDevice> {
    devices
        .enumerate()
        .map(|(index, device)| {
            let name = device.name().unwrap_or_else(|_| format!("Unknown Device {index}"));
            AudioDevice {
                id: device_id(direction, &name),
                is_default: default_name == Some(name.as_str()),
                name,
                direction,
            }
        })
        .collect()
}
