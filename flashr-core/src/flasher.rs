//! Drives one complete flash run from selection to verification.
use crate::choose::{ChoosePolicy, DefaultPolicy};
use crate::config::FlashConfig;
use crate::device::{self, DeviceEnumerator};
use crate::error::{FlashError, Result};
use crate::flash::{self, FlashResult};
use crate::platform::SystemDevices;
use crate::progress::{NoProgress, Progress, Stage};
use crate::source::{self, DecompressingOpener, ImageOpener};
use crate::ui::Ui;
use crate::unmount::{self, MountTable, SystemMounts};
use crate::verify;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runs the whole pipeline: pick the image and device, confirm, unmount,
/// write, sync and (optionally) verify.
///
/// Every collaborator is replaceable. [`Flasher::new`] wires in the real
/// filesystem, `/sys/block` and the kernel's unmount; the `with_*` methods
/// swap any of them out.
pub struct Flasher<'a> {
    config: FlashConfig,
    ui: Box<dyn Ui + 'a>,
    opener: Box<dyn ImageOpener + 'a>,
    devices: Box<dyn DeviceEnumerator + 'a>,
    mounts: Box<dyn MountTable + 'a>,
    policy: Box<dyn ChoosePolicy + 'a>,
    progress: Box<dyn Progress + 'a>,
    workdir: PathBuf,
    running: Arc<AtomicBool>,
}

impl<'a> Flasher<'a> {
    pub fn new(config: FlashConfig, ui: impl Ui + 'a) -> Self {
        Self {
            config,
            ui: Box::new(ui),
            opener: Box::new(DecompressingOpener),
            devices: Box::new(SystemDevices),
            mounts: Box::new(SystemMounts),
            policy: Box::new(DefaultPolicy),
            progress: Box::new(NoProgress),
            workdir: PathBuf::from("."),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_opener(mut self, opener: impl ImageOpener + 'a) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn with_devices(mut self, devices: impl DeviceEnumerator + 'a) -> Self {
        self.devices = Box::new(devices);
        self
    }

    pub fn with_mounts(mut self, mounts: impl MountTable + 'a) -> Self {
        self.mounts = Box::new(mounts);
        self
    }

    pub fn with_policy(mut self, policy: impl ChoosePolicy + 'a) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_progress(mut self, progress: impl Progress + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Directory scanned for images when none is configured.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Shared cancellation flag. Clearing it stops the write or verify pass
    /// at the next chunk boundary.
    pub fn with_running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Performs the run. Every error is terminal and nothing is retried.
    ///
    /// Selection errors and [`FlashError::UserCanceled`] are returned before
    /// the device is opened. A run canceled before unmounting also ends in
    /// [`FlashError::UserCanceled`], with nothing unmounted. Anything later carries the number of bytes
    /// already written (see [`FlashError::bytes_written`]).
    pub fn run(&mut self) -> Result<FlashResult> {
        let mut image = source::resolve(
            &self.config,
            &self.workdir,
            self.opener.as_ref(),
            self.policy.as_ref(),
            self.ui.as_mut(),
        )?;
        let device = device::resolve(
            &self.config,
            self.devices.as_ref(),
            self.policy.as_ref(),
            self.ui.as_mut(),
        )?;

        self.ui
            .say(&format!("Going to flash to {}.", device.path.display()));
        if self.config.interactive {
            self.confirm()?;
        }
        if !self.running.load(Ordering::SeqCst) {
            log::info!("canceled before touching {}", device.path.display());
            return Err(FlashError::UserCanceled);
        }

        unmount::run(&device, self.mounts.as_mut(), self.ui.as_mut())?;

        let progress = &mut self.progress;
        progress.start(Stage::Write, image.size);
        let result = match flash::run(
            &mut image,
            &device.path,
            self.config.verify,
            &self.running,
            |n| progress.advance(Stage::Write, n),
        ) {
            Ok(result) => {
                progress.finish(Stage::Write);
                result
            }
            Err(e) => {
                progress.abandon(Stage::Write);
                return Err(e);
            }
        };
        drop(image);

        #[cfg(unix)]
        nix::unistd::sync();

        if result.checksum.is_some() {
            progress.start(Stage::Verify, Some(result.bytes_written));
            let verified = verify::run(&result, &device.path, &self.running, |n| {
                progress.advance(Stage::Verify, n)
            });
            match verified {
                Ok(()) => progress.finish(Stage::Verify),
                Err(e) => {
                    progress.abandon(Stage::Verify);
                    return Err(e);
                }
            }
        }

        log::info!(
            "flashed {} bytes to {}",
            result.bytes_written,
            device.path.display()
        );
        Ok(result)
    }

    /// Accepts any non-empty prefix of "yes", ignoring case and whitespace.
    fn confirm(&mut self) -> Result<()> {
        let answer = self
            .ui
            .ask("Are you sure?")
            .map_err(FlashError::Prompt)?;
        let answer = answer.trim().to_lowercase();
        if answer.is_empty() || !"yes".starts_with(answer.as_str()) {
            log::info!("user declined the confirmation prompt");
            return Err(FlashError::UserCanceled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::digest;
    use crate::testing::{FakeDevices, RecordingMounts, ScriptedUi, device};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        image: PathBuf,
        device: PathBuf,
    }

    fn fixture(image: &[u8]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("disk.img");
        fs::write(&image_path, image).unwrap();
        let device_path = dir.path().join("sdb");
        fs::write(&device_path, b"").unwrap();
        Fixture {
            image: image_path,
            device: device_path,
            dir,
        }
    }

    fn devices_for(f: &Fixture, mountpoints: &[&str]) -> FakeDevices {
        FakeDevices::new(vec![device(
            f.device.to_str().unwrap(),
            "USB Disk",
            mountpoints,
        )])
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl Progress for Recorder {
        fn start(&mut self, stage: Stage, total: Option<u64>) {
            self.0.push(format!("start {stage:?} {total:?}"));
        }

        fn finish(&mut self, stage: Stage) {
            self.0.push(format!("finish {stage:?}"));
        }

        fn abandon(&mut self, stage: Stage) {
            self.0.push(format!("abandon {stage:?}"));
        }
    }

    #[test]
    fn interactive_run_confirms_then_writes_and_verifies() {
        let f = fixture(b"image contents");
        let mut ui = ScriptedUi::new(&["1", "y"]);
        let mut mounts = RecordingMounts::default();
        let mut recorder = Recorder::default();

        let result = Flasher::new(FlashConfig::new().image(&f.image), &mut ui)
            .with_devices(devices_for(&f, &["/mnt/usb"]))
            .with_mounts(&mut mounts)
            .with_progress(&mut recorder)
            .with_workdir(f.dir.path())
            .run()
            .unwrap();

        assert_eq!(result.bytes_written, 14);
        assert_eq!(result.checksum, Some(digest(b"image contents")));
        assert_eq!(fs::read(&f.device).unwrap(), b"image contents");
        assert_eq!(ui.questions.len(), 2);
        assert_eq!(ui.questions[1], "Are you sure?");
        assert_eq!(mounts.unmounted, [PathBuf::from("/mnt/usb")]);
        assert_eq!(
            recorder.0,
            [
                "start Write Some(14)",
                "finish Write",
                "start Verify Some(14)",
                "finish Verify"
            ]
        );
    }

    #[test]
    fn declining_confirmation_writes_nothing() {
        for answer in ["no", "", "yess", "nope"] {
            let f = fixture(b"image contents");
            let mut ui = ScriptedUi::new(&["1", answer]);
            let mut mounts = RecordingMounts::default();

            let err = Flasher::new(FlashConfig::new().image(&f.image), &mut ui)
                .with_devices(devices_for(&f, &["/mnt/usb"]))
                .with_mounts(&mut mounts)
                .run()
                .unwrap_err();

            assert!(matches!(err, FlashError::UserCanceled), "{answer:?}");
            assert!(mounts.attempted.is_empty());
            assert!(fs::read(&f.device).unwrap().is_empty());
        }
    }

    #[test]
    fn confirmation_accepts_prefixes_of_yes() {
        for answer in ["y", "Ye", " YES \n"] {
            let f = fixture(b"abc");
            let mut ui = ScriptedUi::new(&["1", answer]);
            Flasher::new(FlashConfig::new().image(&f.image), &mut ui)
                .with_devices(devices_for(&f, &[]))
                .with_mounts(RecordingMounts::default())
                .run()
                .unwrap();
        }
    }

    #[test]
    fn without_verify_there_is_no_checksum_or_verify_pass() {
        let f = fixture(b"no verify");
        let mut ui = ScriptedUi::new(&[]);
        let mut recorder = Recorder::default();
        let config = FlashConfig::new()
            .image(&f.image)
            .interactive(false)
            .verify(false);

        let result = Flasher::new(config, &mut ui)
            .with_devices(devices_for(&f, &[]))
            .with_mounts(RecordingMounts::default())
            .with_progress(&mut recorder)
            .run()
            .unwrap();

        assert!(result.checksum.is_none());
        assert_eq!(recorder.0, ["start Write Some(9)", "finish Write"]);
        assert!(ui.questions.is_empty());
    }

    #[test]
    fn unmount_failure_aborts_before_writing() {
        let f = fixture(b"image contents");
        let mut ui = ScriptedUi::new(&[]);
        let config = FlashConfig::new().image(&f.image).interactive(false);

        let err = Flasher::new(config, &mut ui)
            .with_devices(devices_for(&f, &["/mnt/a", "/mnt/b"]))
            .with_mounts(RecordingMounts::failing_on("/mnt/a"))
            .run()
            .unwrap_err();

        assert!(matches!(err, FlashError::Unmount { .. }));
        assert!(fs::read(&f.device).unwrap().is_empty());
    }

    #[test]
    fn cancel_before_write_leaves_mounts_and_device_alone() {
        let f = fixture(b"image contents");
        let mut ui = ScriptedUi::new(&[]);
        let mut mounts = RecordingMounts::default();
        let mut recorder = Recorder::default();
        let config = FlashConfig::new().image(&f.image).interactive(false);

        let err = Flasher::new(config, &mut ui)
            .with_devices(devices_for(&f, &["/mnt/a"]))
            .with_mounts(&mut mounts)
            .with_progress(&mut recorder)
            .with_running(Arc::new(AtomicBool::new(false)))
            .run()
            .unwrap_err();

        assert!(matches!(err, FlashError::UserCanceled));
        assert!(!err.is_destructive());
        assert!(mounts.attempted.is_empty());
        assert!(recorder.0.is_empty());
        assert!(fs::read(&f.device).unwrap().is_empty());
    }
}
