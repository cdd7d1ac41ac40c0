//! Provides platform-specific device discovery.
//!
//! Each submodule exposes a [`SystemDevices`] type implementing
//! [`crate::device::DeviceEnumerator`], selected with `#[cfg]` so the rest of
//! the library never has to care which OS it runs on.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::*;

#[cfg(not(target_os = "linux"))]
mod unsupported;
#[cfg(not(target_os = "linux"))]
pub use self::unsupported::*;
