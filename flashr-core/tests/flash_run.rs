use flashr_core::checksum::digest;
use flashr_core::{
    Device, DeviceEnumerator, FlashConfig, FlashError, Flasher, MountTable, Progress, Stage, Ui,
};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MIB: usize = 1024 * 1024;

struct Unattended(Vec<String>);

impl Ui for Unattended {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        panic!("unexpected prompt: {question}")
    }

    fn say(&mut self, message: &str) {
        self.0.push(message.to_string());
    }
}

struct Attached(Vec<Device>);

impl DeviceEnumerator for Attached {
    fn list_detachable_devices(&self) -> anyhow::Result<Vec<Device>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct NoMounts;

impl MountTable for NoMounts {
    fn unmount(&mut self, mountpoint: &Path) -> io::Result<()> {
        panic!("nothing should be mounted, got {}", mountpoint.display())
    }
}

/// Flips one bit on the device between the write and verify passes.
struct CorruptBeforeVerify {
    device: PathBuf,
    offset: u64,
}

impl Progress for CorruptBeforeVerify {
    fn start(&mut self, stage: Stage, _total: Option<u64>) {
        if stage != Stage::Verify {
            return;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.device)
            .unwrap();
        let mut byte = [0u8; 1];
        file.seek(SeekFrom::Start(self.offset)).unwrap();
        file.read_exact(&mut byte).unwrap();
        byte[0] ^= 0x10;
        file.seek(SeekFrom::Start(self.offset)).unwrap();
        file.write_all(&byte).unwrap();
        file.sync_all().unwrap();
    }
}

fn usb(path: &Path) -> Device {
    Device {
        path: path.to_path_buf(),
        name: "USB Disk".to_string(),
        mountpoints: Vec::new(),
    }
}

fn pseudo_random(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

fn setup(image: &[u8]) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("disk.img");
    fs::write(&image_path, image).unwrap();
    let device_path = dir.path().join("sdb");
    fs::write(&device_path, vec![0xeeu8; image.len() + 4096]).unwrap();
    (dir, image_path, device_path)
}

#[test]
fn verified_flash_round_trips() {
    let data = pseudo_random(3 * MIB + 511);
    let (dir, _image, device) = setup(&data);
    let mut ui = Unattended(Vec::new());

    let result = Flasher::new(FlashConfig::new().interactive(false), &mut ui)
        .with_workdir(dir.path())
        .with_devices(Attached(vec![usb(&device)]))
        .with_mounts(NoMounts)
        .run()
        .unwrap();

    assert_eq!(result.bytes_written, data.len() as u64);
    assert_eq!(result.checksum, Some(digest(&data)));

    let on_device = fs::read(&device).unwrap();
    assert_eq!(&on_device[..data.len()], &data[..]);
    assert!(on_device[data.len()..].iter().all(|&b| b == 0xee));
    assert!(ui.0.iter().any(|m| m.contains("disk.img")));
}

#[test]
fn corrupted_bit_fails_verification() {
    let data = pseudo_random(MIB);
    let (dir, image, device) = setup(&data);
    let mut ui = Unattended(Vec::new());
    let config = FlashConfig::new().image(&image).interactive(false);

    let err = Flasher::new(config, &mut ui)
        .with_workdir(dir.path())
        .with_devices(Attached(vec![usb(&device)]))
        .with_mounts(NoMounts)
        .with_progress(CorruptBeforeVerify {
            device: device.clone(),
            offset: 123_456,
        })
        .run()
        .unwrap_err();

    assert!(matches!(err, FlashError::ChecksumMismatch { .. }));
    assert_eq!(err.bytes_written(), Some(MIB as u64));
}

#[test]
fn several_devices_without_prompting_is_refused() {
    let data = pseudo_random(4096);
    let (dir, image, device) = setup(&data);
    let other = dir.path().join("sdc");
    fs::write(&other, b"").unwrap();
    let before = fs::read(&device).unwrap();
    let mut ui = Unattended(Vec::new());
    let config = FlashConfig::new().image(&image).interactive(false);

    let err = Flasher::new(config, &mut ui)
        .with_devices(Attached(vec![usb(&device), usb(&other)]))
        .with_mounts(NoMounts)
        .run()
        .unwrap_err();

    assert!(matches!(err, FlashError::AmbiguousDevice { count: 2 }));
    assert!(!err.is_destructive());
    assert_eq!(fs::read(&device).unwrap(), before);
    assert!(fs::read(&other).unwrap().is_empty());
}

#[test]
fn compressed_image_is_written_decompressed() {
    let data = pseudo_random(MIB + 3);
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("disk.img.xz");
    let mut encoder = xz2::write::XzEncoder::new(fs::File::create(&image).unwrap(), 1);
    encoder.write_all(&data).unwrap();
    encoder.finish().unwrap();
    let device = dir.path().join("sdb");
    fs::write(&device, b"").unwrap();

    let mut ui = Unattended(Vec::new());
    let result = Flasher::new(FlashConfig::new().interactive(false), &mut ui)
        .with_workdir(dir.path())
        .with_devices(Attached(vec![usb(&device)]))
        .with_mounts(NoMounts)
        .run()
        .unwrap();

    assert_eq!(result.bytes_written, data.len() as u64);
    assert_eq!(fs::read(&device).unwrap(), data);
}

#[test]
fn truncated_archive_is_reported_as_an_image_error() {
    let data = pseudo_random(2 * MIB);
    let dir = TempDir::new().unwrap();
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 1);
    encoder.write_all(&data).unwrap();
    let compressed = encoder.finish().unwrap();
    let image = dir.path().join("disk.img.xz");
    fs::write(&image, &compressed[..compressed.len() / 2]).unwrap();
    let device = dir.path().join("sdb");
    fs::write(&device, b"").unwrap();

    let mut ui = Unattended(Vec::new());
    let config = FlashConfig::new().image(&image).interactive(false);
    let err = Flasher::new(config, &mut ui)
        .with_devices(Attached(vec![usb(&device)]))
        .with_mounts(NoMounts)
        .run()
        .unwrap_err();

    assert!(matches!(err, FlashError::ReadImage { .. }), "{err}");
    assert!(err.is_destructive());
}
