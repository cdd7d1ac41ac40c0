//! Contains the logic for streaming an image onto a device.
use crate::checksum::HashingWriter;
use crate::copy::{CopyError, copy_with_progress};
use crate::error::{FlashError, Result};
use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::AtomicBool;

/// The outcome of a successful write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashResult {
    pub bytes_written: u64,
    /// Digest of everything written. Present only when verification was
    /// requested, and its presence is what triggers the verify pass.
    pub checksum: Option<Vec<u8>>,
}

/// Writes the whole of `image` to the start of the device at `device_path`.
///
/// With `verify` set, the device handle is wrapped in a [`HashingWriter`] so
/// the digest of the written bytes is built during the same pass. The data
/// is synced to the medium before returning, and the device is closed on
/// every path out of this function.
///
/// # Errors
///
/// - [`FlashError::OpenDevice`] if the device cannot be opened read-write.
/// - [`FlashError::ReadImage`] if the image stream fails, e.g. a truncated
///   compressed file.
/// - [`FlashError::Write`] on a write or sync failure.
/// - [`FlashError::Canceled`] if `running` is cleared mid-copy.
///
/// The last two carry the number of bytes already on the device.
pub fn run<R, F>(
    image: &mut R,
    device_path: &Path,
    verify: bool,
    running: &AtomicBool,
    on_progress: F,
) -> Result<FlashResult>
where
    R: Read + ?Sized,
    F: FnMut(u64),
{
    let mut device_file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(device_path)
        .map_err(|source| FlashError::OpenDevice {
            path: device_path.to_path_buf(),
            source,
        })?;
    log::info!(
        "writing to {} (checksum {})",
        device_path.display(),
        if verify { "on" } else { "off" }
    );

    let (copied, checksum) = if verify {
        let mut sink = HashingWriter::new(&mut device_file);
        let copied = copy_with_progress(running, &mut sink, image, on_progress);
        (copied, Some(sink.finalize()))
    } else {
        let copied = copy_with_progress(running, &mut device_file, image, on_progress);
        (copied, None)
    };

    let bytes_written = copied.map_err(|e| match e {
        CopyError::Canceled { copied } => FlashError::Canceled {
            bytes_written: copied,
        },
        CopyError::Read { copied, source } => FlashError::ReadImage {
            bytes_written: copied,
            source,
        },
        CopyError::Write { copied, source } => FlashError::Write {
            bytes_written: copied,
            source,
        },
    })?;

    log::debug!("syncing {} after {bytes_written} bytes", device_path.display());
    device_file
        .sync_all()
        .map_err(|source| FlashError::Write {
            bytes_written,
            source,
        })?;

    Ok(FlashResult {
        bytes_written,
        checksum,
    })
}
