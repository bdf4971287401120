//! Accelerator device records

use serde::{Deserialize, Serialize};

/// Represents one accelerator in the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Host device path bound into the container (e.g. /dev/dri/renderD128)
    #[serde(alias = "device")]
    pub path: String,
    /// Human-readable device name, used for logging and eligibility
    pub name: String,
    /// Disabled devices are dropped before any queue is built
    #[serde(default)]
    pub disabled: bool,
}

impl Device {
    /// Create an enabled device
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            disabled: false,
        }
    }

    /// Device name as exported to the container, with spaces replaced by underscores
    pub fn env_name(&self) -> String {
        sanitize_device_name(&self.name)
    }

    /// Device path usable as a single path segment, e.g. `dev_dri_renderD128`
    pub fn path_segment(&self) -> String {
        self.path.trim_start_matches('/').replace('/', "_")
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}

/// Replace spaces in a device name so it is safe as an env value and a path segment
pub fn sanitize_device_name(name: &str) -> String {
    name.replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_name_replaces_spaces() {
        let device = Device::new("/dev/kfd0", "MI300 X");
        assert_eq!(device.env_name(), "MI300_X");
    }

    #[test]
    fn test_path_segment() {
        let device = Device::new("/dev/dri/renderD128", "GPU0");
        assert_eq!(device.path_segment(), "dev_dri_renderD128");
    }

    #[test]
    fn test_device_display() {
        let device = Device::new("/dev/dri/renderD128", "GPU0");
        assert_eq!(device.to_string(), "GPU0 (/dev/dri/renderD128)");
    }

    #[test]
    fn test_device_parse_with_alias() {
        let yaml = "device: /dev/dri/renderD129\nname: Radeon 7900\n";
        let device: Device = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(device.path, "/dev/dri/renderD129");
        assert!(!device.disabled);
    }
}
