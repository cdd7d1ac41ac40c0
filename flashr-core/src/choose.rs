//! Policy for picking one candidate out of several.
//!
//! Both selectors hand their candidate lists to a [`ChoosePolicy`] and get back
//! a zero-based index. Keeping the heuristics here means a different policy
//! can be plugged into [`crate::Flasher`] without touching the engine.
use crate::device::Device;
use crate::error::{FlashError, Result};
use crate::ui::Ui;
use std::path::PathBuf;
use std::time::SystemTime;

/// An image file found while scanning a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageCandidate {
    pub path: PathBuf,
    pub modified: SystemTime,
}

pub trait ChoosePolicy {
    /// Returns the index of the image to flash. `candidates` is never empty.
    fn choose_image(
        &self,
        candidates: &[ImageCandidate],
        interactive: bool,
        ui: &mut dyn Ui,
    ) -> Result<usize>;

    /// Returns the index of the device to flash. `devices` is never empty.
    fn choose_device(&self, devices: &[Device], interactive: bool, ui: &mut dyn Ui)
    -> Result<usize>;
}

/// Newest image when unattended, exactly-one device when unattended, and a
/// numbered menu otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPolicy;

impl ChoosePolicy for DefaultPolicy {
    fn choose_image(
        &self,
        candidates: &[ImageCandidate],
        interactive: bool,
        ui: &mut dyn Ui,
    ) -> Result<usize> {
        if !interactive {
            return most_recent(candidates).ok_or(FlashError::NoImageFound);
        }

        let mut question = String::new();
        for (i, candidate) in candidates.iter().enumerate() {
            question.push_str(&format!("{}. {}\n", i + 1, display_name(&candidate.path)));
        }
        question.push_str("Which image should we use (type number)?");
        ask_index(ui, &question, candidates.len())
    }

    fn choose_device(
        &self,
        devices: &[Device],
        interactive: bool,
        ui: &mut dyn Ui,
    ) -> Result<usize> {
        if !interactive {
            // Never auto-pick between several destructive targets.
            return match devices.len() {
                1 => Ok(0),
                count => Err(FlashError::AmbiguousDevice { count }),
            };
        }

        let mut question = String::from("Which device should we choose?:\n");
        for (i, device) in devices.iter().enumerate() {
            question.push_str(&format!("{}. {}\n", i + 1, device));
        }
        ask_index(ui, &question, devices.len())
    }
}

/// Index of the newest candidate. Only a strictly newer timestamp displaces
/// the current pick, so the first of several equal timestamps wins.
pub fn most_recent(candidates: &[ImageCandidate]) -> Option<usize> {
    let mut best: Option<(usize, SystemTime)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        match best {
            Some((_, newest)) if candidate.modified <= newest => {}
            _ => best = Some((i, candidate.modified)),
        }
    }
    best.map(|(i, _)| i)
}

/// Turns a typed 1-based menu answer into a zero-based index in `[0, len)`.
pub fn parse_selection(answer: &str, len: usize) -> Result<usize> {
    let invalid = || FlashError::InvalidSelection {
        input: answer.to_string(),
    };
    let number: i64 = answer.trim().parse().map_err(|_| invalid())?;
    let index = number.checked_sub(1).ok_or_else(invalid)?;
    if index < 0 || index >= len as i64 {
        return Err(invalid());
    }
    Ok(index as usize)
}

fn ask_index(ui: &mut dyn Ui, question: &str, len: usize) -> Result<usize> {
    let answer = ui.ask(question).map_err(FlashError::Prompt)?;
    parse_selection(&answer, len)
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}
