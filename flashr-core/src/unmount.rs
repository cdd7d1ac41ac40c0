//! Detaching a device's filesystems before it is overwritten.
use crate::device::Device;
use crate::error::{FlashError, Result};
use crate::ui::Ui;
use std::io;
use std::path::Path;

/// The OS operation that detaches a mounted filesystem.
pub trait MountTable {
    fn unmount(&mut self, mountpoint: &Path) -> io::Result<()>;
}

impl<M: MountTable + ?Sized> MountTable for &mut M {
    fn unmount(&mut self, mountpoint: &Path) -> io::Result<()> {
        (**self).unmount(mountpoint)
    }
}

/// Unmounts through the host kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemMounts;

impl MountTable for SystemMounts {
    #[cfg(target_os = "linux")]
    fn unmount(&mut self, mountpoint: &Path) -> io::Result<()> {
        use nix::mount::{MntFlags, umount2};

        umount2(mountpoint, MntFlags::empty()).map_err(io::Error::from)
    }

    #[cfg(not(target_os = "linux"))]
    fn unmount(&mut self, mountpoint: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot unmount {} on this platform", mountpoint.display()),
        ))
    }
}

/// Unmounts every mountpoint of `device`, in order.
///
/// Stops at the first failure. Mountpoints already detached stay detached and
/// the remaining ones are left alone.
pub fn run(device: &Device, mounts: &mut dyn MountTable, ui: &mut dyn Ui) -> Result<()> {
    for mountpoint in &device.mountpoints {
        ui.say(&format!("Unmounting {}", mountpoint.display()));
        log::info!("unmounting {}", mountpoint.display());
        mounts
            .unmount(mountpoint)
            .map_err(|source| FlashError::Unmount {
                mountpoint: mountpoint.clone(),
                source,
            })?;
    }
    Ok(())
}
