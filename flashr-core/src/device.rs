//! The target device model and the logic that settles on exactly one of them.
use crate::choose::ChoosePolicy;
use crate::config::FlashConfig;
use crate::error::{FlashError, Result};
use crate::ui::Ui;
use std::fmt;
use std::path::PathBuf;

/// A removable block device that may be overwritten.
///
/// Instances come from a [`DeviceEnumerator`]; the rest of the library only
/// reads them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    /// The system path to the device (e.g., `/dev/sdb`).
    pub path: PathBuf,
    /// A human readable description, such as vendor, model and size.
    pub name: String,
    /// Every place the device or one of its partitions is mounted, in the
    /// order they must be detached.
    pub mountpoints: Vec<PathBuf>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.name)
    }
}

/// Lists the devices that are eligible as flash targets.
///
/// Implementations must only report removable media and must leave out the
/// disk the running system boots from.
pub trait DeviceEnumerator {
    fn list_detachable_devices(&self) -> anyhow::Result<Vec<Device>>;
}

/// Picks the single device this run will write to.
///
/// An explicitly configured path must match an enumerated device exactly.
/// Without one, a non-interactive run only proceeds when there is exactly one
/// candidate; it never guesses between several.
pub fn resolve(
    config: &FlashConfig,
    enumerator: &dyn DeviceEnumerator,
    policy: &dyn ChoosePolicy,
    ui: &mut dyn Ui,
) -> Result<Device> {
    let mut devices = enumerator
        .list_detachable_devices()
        .map_err(FlashError::Enumerate)?;
    if devices.is_empty() {
        return Err(FlashError::NoDevicesFound);
    }
    log::debug!("{} removable device(s) attached", devices.len());

    if let Some(wanted) = &config.device {
        return match devices.iter().position(|d| &d.path == wanted) {
            Some(index) => Ok(devices.swap_remove(index)),
            None => Err(FlashError::DeviceNotFound {
                path: wanted.clone(),
            }),
        };
    }

    let index = policy.choose_device(&devices, config.interactive, ui)?;
    if index >= devices.len() {
        return Err(FlashError::InvalidSelection {
            input: (index + 1).to_string(),
        });
    }
    let device = devices.swap_remove(index);
    log::info!("selected device {device}");
    Ok(device)
}
