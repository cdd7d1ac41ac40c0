//! Read-back verification of a finished write.
use crate::checksum::HashingWriter;
use crate::copy::{CopyError, copy_with_progress};
use crate::error::{FlashError, Result};
use crate::flash::FlashResult;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::AtomicBool;

/// Re-reads exactly `result.bytes_written` bytes from the start of the device
/// and checks their digest against `result.checksum`.
///
/// Bytes past the written region are never read. A result without a checksum
/// has nothing to compare against and passes trivially.
///
/// # Errors
///
/// - [`FlashError::ChecksumMismatch`] if the digests differ.
/// - [`FlashError::Verify`] if the device cannot be reopened or read back in
///   full.
/// - [`FlashError::Canceled`] if `running` is cleared mid-read.
pub fn run<F>(
    result: &FlashResult,
    device_path: &Path,
    running: &AtomicBool,
    on_progress: F,
) -> Result<()>
where
    F: FnMut(u64),
{
    let Some(expected) = &result.checksum else {
        log::debug!("no checksum recorded, skipping verification");
        return Ok(());
    };
    let bytes_written = result.bytes_written;

    // The write already happened, so even an open failure is reported with
    // the byte count.
    let device_file = File::open(device_path).map_err(|source| FlashError::Verify {
        bytes_written,
        bytes_verified: 0,
        source,
    })?;
    log::info!(
        "verifying {bytes_written} bytes on {}",
        device_path.display()
    );

    let mut region = device_file.take(bytes_written);
    let mut hasher = HashingWriter::new(io::sink());
    let verified = copy_with_progress(running, &mut hasher, &mut region, on_progress)
        .map_err(|e| match e {
            CopyError::Canceled { .. } => FlashError::Canceled { bytes_written },
            CopyError::Read { copied, source } | CopyError::Write { copied, source } => {
                FlashError::Verify {
                    bytes_written,
                    bytes_verified: copied,
                    source,
                }
            }
        })?;

    if verified < bytes_written {
        return Err(FlashError::Verify {
            bytes_written,
            bytes_verified: verified,
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("device ended after {verified} of {bytes_written} bytes"),
            ),
        });
    }

    let actual = hasher.finalize();
    if &actual != expected {
        log::warn!("checksum mismatch on {}", device_path.display());
        return Err(FlashError::ChecksumMismatch {
            bytes_written,
            expected: expected.clone(),
            actual,
        });
    }

    log::info!("verification of {} passed", device_path.display());
    Ok(())
}
