use crate::device::{Device, DeviceEnumerator};
use anyhow::{Result, bail};

/// Device discovery for platforms without a backend. Always fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemDevices;

impl DeviceEnumerator for SystemDevices {
    fn list_detachable_devices(&self) -> Result<Vec<Device>> {
        bail!("removable device discovery is not supported on this platform")
    }
}
