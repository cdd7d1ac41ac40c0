//! The core, UI-agnostic library for the `flashr` image flasher.
//!
//! `flashr-core` takes a disk image and writes it byte-for-byte onto a
//! removable block device. It is used by the `flashr` CLI but never talks to a
//! terminal itself: every question and status message goes through the
//! [`Ui`] trait, and progress goes through [`Progress`].
//!
//! The library is structured into several key modules:
//! - [`source`]: finds the image to flash and opens it, decompressing `.gz`,
//!   `.xz` and `.zst` on the fly.
//! - [`device`]: the [`Device`] model and the selector that settles on exactly
//!   one target.
//! - [`choose`]: the policy used when there is more than one candidate.
//! - [`unmount`]: detaches a device's filesystems.
//! - [`mod@flash`]: streams the image onto the device, optionally hashing it.
//! - [`mod@verify`]: reads the written region back and compares digests.
//! - [`platform`]: OS-specific discovery of removable devices.
//! - [`flasher`]: ties the stages together into one run.
//!
//! ## Example: an unattended, verified flash
//!
//! ```rust,no_run
//! use flashr_core::{FlashConfig, Flasher, Ui};
//! use std::io;
//!
//! struct Quiet;
//!
//! impl Ui for Quiet {
//!     fn ask(&mut self, _question: &str) -> io::Result<String> {
//!         Err(io::Error::other("no prompts in unattended mode"))
//!     }
//!
//!     fn say(&mut self, message: &str) {
//!         println!("{message}");
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = FlashConfig::new()
//!         .image("raspios.img.xz")
//!         .device("/dev/sdb")
//!         .interactive(false)
//!         .verify(true);
//!
//!     let result = Flasher::new(config, Quiet).run()?;
//!     println!("{} bytes written and verified", result.bytes_written);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod choose;
pub mod config;
pub mod copy;
pub mod device;
pub mod error;
pub mod flash;
pub mod flasher;
pub mod platform;
pub mod progress;
pub mod source;
pub mod ui;
pub mod unmount;
pub mod verify;

#[cfg(test)]
mod testing;

pub use choose::{ChoosePolicy, DefaultPolicy, ImageCandidate};
pub use config::FlashConfig;
pub use device::{Device, DeviceEnumerator};
pub use error::{FlashError, Result};
pub use flash::FlashResult;
pub use flasher::Flasher;
pub use platform::SystemDevices;
pub use progress::{NoProgress, Progress, Stage};
pub use source::{DecompressingOpener, ImageOpener, ImageStream, SourceImage};
pub use ui::Ui;
pub use unmount::{MountTable, SystemMounts};
