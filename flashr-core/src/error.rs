//! The error type shared by every stage of a flash run.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, FlashError>;

/// Everything that can end a flash run.
///
/// Every variant is terminal: no stage retries or recovers locally. Variants
/// are split into two groups. Selection-stage failures happen before the
/// device is opened for writing, so nothing on it has changed. The remaining
/// ones (see [`FlashError::bytes_written`]) happen once the device has been
/// touched and the caller must tell the user how much was overwritten.
#[derive(Error, Debug)]
pub enum FlashError {
    #[error("no image files found in the current directory")]
    NoImageFound,

    #[error("invalid selection: {input:?}")]
    InvalidSelection { input: String },

    #[error("no removable devices found")]
    NoDevicesFound,

    #[error("configured device {} is not a removable device", path.display())]
    DeviceNotFound { path: PathBuf },

    #[error("found {count} removable devices; refusing to pick one without a prompt")]
    AmbiguousDevice { count: usize },

    #[error("operation canceled by user")]
    UserCanceled,

    #[error("failed to open image {}: {source}", path.display())]
    OpenImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to scan for image files: {source}")]
    ScanDirectory {
        #[source]
        source: io::Error,
    },

    #[error("failed to enumerate devices: {0:#}")]
    Enumerate(anyhow::Error),

    #[error("prompt failed: {0}")]
    Prompt(#[source] io::Error),

    #[error("failed to unmount {}: {source}", mountpoint.display())]
    Unmount {
        mountpoint: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open device {}: {source}", path.display())]
    OpenDevice {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write failed after {bytes_written} bytes: {source}")]
    Write {
        bytes_written: u64,
        #[source]
        source: io::Error,
    },

    #[error("reading the image failed after {bytes_written} bytes were written: {source}")]
    ReadImage {
        bytes_written: u64,
        #[source]
        source: io::Error,
    },

    #[error("flash canceled after {bytes_written} bytes were written")]
    Canceled { bytes_written: u64 },

    #[error("verification read failed after {bytes_verified} bytes: {source}")]
    Verify {
        bytes_written: u64,
        bytes_verified: u64,
        #[source]
        source: io::Error,
    },

    #[error(
        "checksum mismatch over {bytes_written} written bytes (wrote {}, read back {}); the data on the device is not reliable",
        hex::encode(expected),
        hex::encode(actual)
    )]
    ChecksumMismatch {
        bytes_written: u64,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },
}

impl FlashError {
    /// How many bytes reached the device before this failure, if the failure
    /// happened once writing had started.
    pub fn bytes_written(&self) -> Option<u64> {
        match self {
            FlashError::Write { bytes_written, .. }
            | FlashError::ReadImage { bytes_written, .. }
            | FlashError::Canceled { bytes_written }
            | FlashError::Verify { bytes_written, .. }
            | FlashError::ChecksumMismatch { bytes_written, .. } => Some(*bytes_written),
            _ => None,
        }
    }

    /// Whether the device may have been left partially overwritten.
    ///
    /// A cancel that lands before the first chunk leaves the device as it was.
    pub fn is_destructive(&self) -> bool {
        match self {
            FlashError::Canceled { bytes_written } => *bytes_written > 0,
            other => other.bytes_written().is_some(),
        }
    }
}
