mod logging;
mod terminal;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use flashr_core::{
    DeviceEnumerator, FlashConfig, FlashError, FlashResult, Flasher, SystemDevices,
};
use std::io::{IsTerminal, stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use terminal::{Bars, TerminalUi};

#[cfg(unix)]
use libc::ECHOCTL;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(unix)]
use termios::{TCSANOW, Termios, tcsetattr};

#[derive(Parser)]
#[command(name = "flashr")]
#[command(about = "A safe, scriptable disk image flasher", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an image to a removable device
    Write {
        /// Image file to write; defaults to an image found in the current directory
        image: Option<PathBuf>,

        /// Target device, e.g. /dev/sdb
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// Never prompt: use the newest image and the only attached device
        #[arg(short = 'y', long = "yes", alias = "non-interactive")]
        yes: bool,

        /// Skip write verification
        #[arg(short = 'n', long = "no-verify")]
        no_verify: bool,
    },
    /// List available removable devices
    List,
}

/// On Unix, disables `ECHOCTL` so Ctrl+C is not echoed as `^C` over the
/// progress bars. The original terminal state is restored on drop.
struct TermRestorer {
    #[cfg(unix)]
    original_termios: Option<Termios>,
}

impl TermRestorer {
    fn new() -> Self {
        #[cfg(unix)]
        {
            let fd = stdout().as_raw_fd();
            let original_termios = stdout()
                .is_terminal()
                .then(|| Termios::from_fd(fd).ok())
                .flatten()
                .filter(|original| {
                    let mut quiet = *original;
                    quiet.c_lflag &= !ECHOCTL;
                    tcsetattr(fd, TCSANOW, &quiet).is_ok()
                });
            Self { original_termios }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }
}

impl Drop for TermRestorer {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(ref original_termios) = self.original_termios {
            tcsetattr(stdout().as_raw_fd(), TCSANOW, original_termios).ok();
        }
    }
}

fn list_devices() -> Result<()> {
    let devices = SystemDevices.list_detachable_devices()?;
    if devices.is_empty() {
        println!("No removable devices found.");
        return Ok(());
    }

    println!("Found {} removable devices:", devices.len());
    println!("\n  {:<14} {:<32} {}", "DEVICE", "NAME", "MOUNTED AT");
    println!("  {:-<14} {:-<32} {:-<20}", "", "", "");
    for device in devices {
        let location = if device.mountpoints.is_empty() {
            "(Not mounted)".to_string()
        } else {
            device
                .mountpoints
                .iter()
                .map(|m| m.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  {:<14} {:<32} {}",
            device.path.display(),
            device.name,
            location
        );
    }
    Ok(())
}

/// Explains a failed run. Failures after writing started get the byte count
/// so the user knows the device is no longer in its original state.
fn report_failure(err: &FlashError) {
    match err {
        FlashError::ChecksumMismatch { bytes_written, .. } => {
            eprintln!(
                "\n{} The data read back from the device does not match what was written.",
                style("VERIFICATION FAILED:").red().bold()
            );
            eprintln!(
                "  {bytes_written} bytes were written, but the device cannot be trusted to hold them."
            );
            eprintln!("  Re-flash the image or replace the media.");
        }
        _ => {
            if let (true, Some(written)) = (err.is_destructive(), err.bytes_written()) {
                eprintln!(
                    "\n{} {written} bytes had already been written; the device is probably unusable until it is flashed again.",
                    style("WARNING:").red().bold()
                );
            }
        }
    }
}

/// Anything short of a completed write exits non-zero, a declined prompt
/// included.
fn exit_code(result: &flashr_core::Result<FlashResult>) -> ExitCode {
    if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // This guard will be dropped when main() exits, restoring the terminal.
    let _term_restorer = TermRestorer::new();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    match cli.command {
        Commands::Write {
            image,
            device,
            yes,
            no_verify,
        } => {
            let mut config = FlashConfig::new().interactive(!yes).verify(!no_verify);
            config.image = image;
            config.device = device;

            let result = Flasher::new(config, TerminalUi)
                .with_progress(Bars::default())
                .with_running(running)
                .run();

            match &result {
                Ok(result) => {
                    let verified = if result.checksum.is_some() {
                        "and verified"
                    } else {
                        "(verification skipped)"
                    };
                    println!(
                        "\n✨ Successfully flashed {} bytes {}.",
                        style(result.bytes_written).cyan(),
                        verified
                    );
                }
                Err(FlashError::UserCanceled) => {
                    println!("Write operation cancelled.");
                }
                Err(e) => {
                    report_failure(e);
                    eprintln!("\n{} {e}", style("Error:").red().bold());
                }
            }
            return Ok(exit_code(&result));
        }
        Commands::List => list_devices()?,
    }

    Ok(ExitCode::SUCCESS)
}
