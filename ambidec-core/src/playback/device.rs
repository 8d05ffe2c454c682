//! Output device enumeration.

use serde::{Deserialize, Serialize};

/// Metadata about an audio output device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable device name reported by the OS.
    pub name: String,
    /// Whether this is the system default output device.
    pub is_default: bool,
    /// Output channel count of the device's default configuration.
    pub max_output_channels: u16,
}

/// Preferred-device matching: a preference selects any device whose
/// reported name contains it. Used by both `Player::open` and callers
/// resolving channel counts from the enumeration, so the two never pick
/// different devices for the same preference.
pub fn name_matches(device_name: &str, preference: &str) -> bool {
    device_name.contains(preference)
}

/// List all available audio output devices on the system.
///
/// Returns an empty `Vec` if cpal is not available or no devices exist.
/// The default device sorts first.
#[cfg(feature = "audio-cpal")]
pub fn list_output_devices() -> Vec<DeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    match host.output_devices() {
        Ok(devices) => {
            let mut list = devices
                .enumerate()
                .map(|(idx, device)| {
                    let name = device
                        .name()
                        .unwrap_or_else(|_| format!("Output Device {}", idx + 1));
                    let is_default = default_name.as_deref() == Some(name.as_str());
                    let max_output_channels = device
                        .default_output_config()
                        .map(|c| c.channels())
                        .unwrap_or(0);
                    DeviceInfo {
                        name,
                        is_default,
                        max_output_channels,
                    }
                })
                .collect::<Vec<_>>();

            list.sort_by_key(|d| (!d.is_default, d.name.to_ascii_lowercase()));
            list
        }
        Err(e) => {
            tracing::warn!("failed to enumerate output devices: {e}");
            if let Some(default) = host.default_output_device() {
                let name = default
                    .name()
                    .unwrap_or_else(|_| "Default Output Device".to_string());
                let max_output_channels = default
                    .default_output_config()
                    .map(|c| c.channels())
                    .unwrap_or(0);
                vec![DeviceInfo {
                    name,
                    is_default: true,
                    max_output_channels,
                }]
            } else {
                vec![]
            }
        }
    }
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_output_devices() -> Vec<DeviceInfo> {
    vec![]
}
