//! Device/model eligibility

use benchlet_core::{Device, Model};

/// Whether `model` may run on `device`.
///
/// Exclusions match on the device name, never the path.
pub fn eligible(device: &Device, model: &Model) -> bool {
    !model.excluded_devices.contains(&device.name)
}
