//! Test doubles for the external collaborators.
use crate::device::{Device, DeviceEnumerator};
use crate::ui::Ui;
use crate::unmount::MountTable;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

pub fn device(path: &str, name: &str, mountpoints: &[&str]) -> Device {
    Device {
        path: PathBuf::from(path),
        name: name.to_string(),
        mountpoints: mountpoints.iter().map(PathBuf::from).collect(),
    }
}

/// Replays canned answers and records everything it is asked and told.
#[derive(Debug, Default)]
pub struct ScriptedUi {
    answers: VecDeque<String>,
    pub questions: Vec<String>,
    pub said: Vec<String>,
}

impl ScriptedUi {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl Ui for ScriptedUi {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left"))
    }

    fn say(&mut self, message: &str) {
        self.said.push(message.to_string());
    }
}

pub struct FakeDevices {
    devices: Vec<Device>,
    failure: Option<&'static str>,
}

impl FakeDevices {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            failure: None,
        }
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            devices: Vec::new(),
            failure: Some(message),
        }
    }
}

impl DeviceEnumerator for FakeDevices {
    fn list_detachable_devices(&self) -> anyhow::Result<Vec<Device>> {
        match self.failure {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(self.devices.clone()),
        }
    }
}

/// Records unmount calls and fails on one chosen mountpoint.
#[derive(Debug, Default)]
pub struct RecordingMounts {
    fail_on: Option<PathBuf>,
    pub attempted: Vec<PathBuf>,
    pub unmounted: Vec<PathBuf>,
}

impl RecordingMounts {
    pub fn failing_on(mountpoint: &str) -> Self {
        Self {
            fail_on: Some(PathBuf::from(mountpoint)),
            ..Self::default()
        }
    }
}

impl MountTable for RecordingMounts {
    fn unmount(&mut self, mountpoint: &Path) -> io::Result<()> {
        self.attempted.push(mountpoint.to_path_buf());
        if self.fail_on.as_deref() == Some(mountpoint) {
            return Err(io::Error::new(io::ErrorKind::ResourceBusy, "target is busy"));
        }
        self.unmounted.push(mountpoint.to_path_buf());
        Ok(())
    }
}
