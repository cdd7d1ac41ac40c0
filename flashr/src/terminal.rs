//! The terminal side of the library's `Ui` and `Progress` hooks.
use console::style;
use dialoguer::{Input, theme::ColorfulTheme};
use flashr_core::{Progress, Stage, Ui};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::time::Duration;

/// Prompts with `dialoguer` and prints status lines with `console` styling.
pub struct TerminalUi;

impl Ui for TerminalUi {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        // Menus arrive as several lines; only the last one is the prompt.
        let (body, prompt) = match question.strip_suffix('\n') {
            Some(menu) => (menu, "Enter a number"),
            None => question.rsplit_once('\n').unwrap_or(("", question)),
        };
        for line in body.lines() {
            println!("  {line}");
        }

        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(io::Error::other)
    }

    fn say(&mut self, message: &str) {
        println!("{} {}", style("==>").cyan().bold(), message);
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .expect("progress template is valid")
        .progress_chars("■ ")
}

/// Draws one bar per stage. Bars are created when their stage starts.
#[derive(Default)]
pub struct Bars {
    write: Option<ProgressBar>,
    verify: Option<ProgressBar>,
}

impl Bars {
    fn slot(&mut self, stage: Stage) -> &mut Option<ProgressBar> {
        match stage {
            Stage::Write => &mut self.write,
            Stage::Verify => &mut self.verify,
        }
    }
}

impl Progress for Bars {
    fn start(&mut self, stage: Stage, total: Option<u64>) {
        let bar = match total {
            Some(len) => ProgressBar::new(len).with_style(bar_style(
                "{prefix:12} [{elapsed_precise}] [{bar:40.magenta/black}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )),
            // Compressed images have no known size until they are exhausted.
            None => ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .template("{prefix:12} [{elapsed_precise}] [{spinner:.green}] {bytes} ({bytes_per_sec}) {msg}")
                    .expect("progress template is valid"),
            ),
        };
        if total.is_none() {
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        bar.set_prefix(match stage {
            Stage::Write => "Writing",
            Stage::Verify => "Verifying",
        });
        *self.slot(stage) = Some(bar);
    }

    fn advance(&mut self, stage: Stage, done: u64) {
        if let Some(bar) = self.slot(stage) {
            bar.set_position(done);
        }
    }

    fn finish(&mut self, stage: Stage) {
        if let Some(bar) = self.slot(stage).take() {
            bar.finish_with_message(match stage {
                Stage::Write => "Write complete.",
                Stage::Verify => "Verification successful.",
            });
        }
    }

    fn abandon(&mut self, stage: Stage) {
        if let Some(bar) = self.slot(stage).take() {
            bar.abandon_with_message("❌ Operation failed.");
        }
    }
}
