use std::path::PathBuf;

/// Settings for a single flash run. Built once up front and never changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashConfig {
    /// Image to write. When unset, the working directory is scanned.
    pub image: Option<PathBuf>,
    /// Target device path. When unset, the device is chosen from the
    /// enumerated removable devices.
    pub device: Option<PathBuf>,
    /// Whether the user may be prompted.
    pub interactive: bool,
    /// Whether to checksum the write and read it back afterwards.
    pub verify: bool,
}

impl FlashConfig {
    pub fn new() -> Self {
        Self {
            image: None,
            device: None,
            interactive: true,
            verify: true,
        }
    }

    pub fn image(mut self, image: impl Into<PathBuf>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn device(mut self, device: impl Into<PathBuf>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self::new()
    }
}
