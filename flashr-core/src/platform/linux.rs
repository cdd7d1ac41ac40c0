use crate::device::{Device, DeviceEnumerator};
use anyhow::{Result, anyhow};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Discovers removable block devices through `/sys/block`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemDevices;

impl DeviceEnumerator for SystemDevices {
    /// Scans `/sys/block` for removable devices.
    ///
    /// The filtering logic is as follows:
    /// 1.  Find the disk holding `/` and exclude it.
    /// 2.  Skip loop devices (e.g., `loop0`).
    /// 3.  Keep only devices whose `removable` flag is set.
    /// 4.  Drop devices reporting a size of zero, which are usually empty
    ///     card readers.
    ///
    /// Mountpoints of the disk and all of its partitions are collected so the
    /// whole device can be detached before writing.
    fn list_detachable_devices(&self) -> Result<Vec<Device>> {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let mounts: Vec<(String, PathBuf)> = disks
            .iter()
            .map(|disk| {
                (
                    kernel_name(Path::new(disk.name())),
                    disk.mount_point().to_path_buf(),
                )
            })
            .collect();

        let system_disk = mounts
            .iter()
            .find(|(_, mount_point)| mount_point == Path::new("/"))
            .map(|(name, _)| parent_device_name(name))
            .ok_or_else(|| anyhow!("Could not determine system drive."))?;

        let mut devices = Vec::new();
        for entry in fs::read_dir("/sys/block")?.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("loop") || name == system_disk {
                continue;
            }

            let removable = read_sys_file(&name, "removable")
                .map(|s| s == "1")
                .unwrap_or(false);
            if !removable {
                continue;
            }

            let size_sectors = read_sys_file(&name, "size")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);
            if size_sectors == 0 {
                continue;
            }

            let mountpoints = mounts
                .iter()
                .filter(|(partition, mp)| {
                    !mp.as_os_str().is_empty() && belongs_to(partition, &name)
                })
                .map(|(_, mp)| mp.clone())
                .collect();

            log::debug!("found removable device {name}");
            devices.push(Device {
                path: PathBuf::from("/dev").join(&name),
                name: describe(&name, size_sectors * 512),
                mountpoints,
            });
        }

        devices.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(devices)
    }
}

/// Helper to read a specific file from the /sys/block filesystem.
fn read_sys_file(device_name: &str, file: &str) -> io::Result<String> {
    let path = PathBuf::from("/sys/block").join(device_name).join(file);
    fs::read_to_string(path).map(|s| s.trim().to_string())
}

/// `sysinfo` reports `/dev/sdb1` on some systems and `sdb1` on others.
fn kernel_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .to_string()
}

/// Strips a partition suffix: `sda1` -> `sda`, `mmcblk0p2` -> `mmcblk0`,
/// `nvme0n1p3` -> `nvme0n1`.
fn parent_device_name(partition: &str) -> String {
    if partition.starts_with("mmcblk") || partition.starts_with("nvme") {
        if let Some(index) = partition.rfind('p') {
            let suffix = &partition[index + 1..];
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                return partition[..index].to_string();
            }
        }
        return partition.to_string();
    }
    partition
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .to_string()
}

/// Whether `partition` is `device` itself or one of its partitions.
fn belongs_to(partition: &str, device: &str) -> bool {
    match partition.strip_prefix(device) {
        Some("") => true,
        Some(rest) => {
            let digits = rest.strip_prefix('p').unwrap_or(rest);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Builds a display name such as `SanDisk Ultra, 14.9 GB`.
fn describe(name: &str, size_bytes: u64) -> String {
    let label = ["device/vendor", "device/model"]
        .iter()
        .filter_map(|file| read_sys_file(name, file).ok())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let label = if label.is_empty() {
        name.to_string()
    } else {
        label
    };
    let size_gb = size_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    format!("{label}, {size_gb:.1} GB")
}
