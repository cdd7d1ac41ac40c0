//! Finding and opening the image to flash.
//!
//! Compressed images (`.gz`, `.xz`, `.zst`) are decompressed on the fly while
//! they are read, so the flash engine only ever sees the raw image bytes and
//! nothing is staged on disk.
use crate::choose::{ChoosePolicy, ImageCandidate};
use crate::config::FlashConfig;
use crate::error::{FlashError, Result};
use crate::ui::Ui;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use xz2::read::XzDecoder;
use zstd::stream::read::Decoder as ZstdDecoder;

/// A readable image stream. Dropping it closes the underlying file.
pub type ImageStream = Box<dyn Read>;

const IMAGE_EXTENSIONS: &[&str] = &["img", "iso", "raw"];
const COMPRESSED_EXTENSIONS: &[&str] = &["gz", "gzip", "xz", "zst", "zstd"];

/// Turns a path into a stream of raw image bytes.
pub trait ImageOpener {
    fn open(&self, path: &Path) -> io::Result<ImageStream>;

    /// Number of bytes [`ImageOpener::open`] will yield for `path`, when that
    /// is known without reading the whole stream.
    fn size_hint(&self, _path: &Path) -> Option<u64> {
        None
    }
}

/// The opened image together with its decoded length, if known up front.
pub struct SourceImage {
    pub stream: ImageStream,
    pub size: Option<u64>,
}

impl Read for SourceImage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

/// Opens images from the local filesystem, decompressing by file extension.
/// Unrecognised extensions are read as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecompressingOpener;

impl ImageOpener for DecompressingOpener {
    fn open(&self, path: &Path) -> io::Result<ImageStream> {
        let file = BufReader::new(File::open(path)?);
        let reader: ImageStream = match lowercase_extension(path).as_str() {
            "gz" | "gzip" => Box::new(GzDecoder::new(file)),
            "xz" => Box::new(XzDecoder::new(file)),
            "zst" | "zstd" => Box::new(ZstdDecoder::with_buffer(file)?),
            _ => Box::new(file),
        };
        Ok(reader)
    }

    /// Only uncompressed images have a size known before decoding.
    fn size_hint(&self, path: &Path) -> Option<u64> {
        if COMPRESSED_EXTENSIONS.contains(&lowercase_extension(path).as_str()) {
            return None;
        }
        fs::metadata(path).ok().map(|m| m.len())
    }
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Whether a file name looks like a disk image, optionally compressed:
/// `disk.img`, `os.iso`, `rootfs.img.xz`, ...
pub fn is_image_file(path: &Path) -> bool {
    let ext = lowercase_extension(path);
    if COMPRESSED_EXTENSIONS.contains(&ext.as_str()) {
        return path.file_stem().is_some_and(|stem| {
            IMAGE_EXTENSIONS.contains(&lowercase_extension(Path::new(stem)).as_str())
        });
    }
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Lists image-like regular files directly inside `dir`, sorted by name so
/// that the encounter order is stable.
pub fn scan_dir(dir: &Path) -> io::Result<Vec<ImageCandidate>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_image_file(&path) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        candidates.push(ImageCandidate {
            path,
            modified: metadata.modified()?,
        });
    }
    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(candidates)
}

/// Settles on the image for this run and opens it.
///
/// A configured image is opened directly. Otherwise `workdir` is scanned and
/// the policy picks among the candidates found there.
pub fn resolve(
    config: &FlashConfig,
    workdir: &Path,
    opener: &dyn ImageOpener,
    policy: &dyn ChoosePolicy,
    ui: &mut dyn Ui,
) -> Result<SourceImage> {
    let chosen = match &config.image {
        Some(path) => path.clone(),
        None => {
            let mut candidates =
                scan_dir(workdir).map_err(|source| FlashError::ScanDirectory { source })?;
            if candidates.is_empty() {
                return Err(FlashError::NoImageFound);
            }
            log::debug!(
                "found {} image candidate(s) in {}",
                candidates.len(),
                workdir.display()
            );
            let index = policy.choose_image(&candidates, config.interactive, ui)?;
            if index >= candidates.len() {
                return Err(FlashError::InvalidSelection {
                    input: (index + 1).to_string(),
                });
            }
            candidates.swap_remove(index).path
        }
    };

    ui.say(&format!("Using image {}", chosen.display()));
    log::info!("opening image {}", chosen.display());
    let stream = opener
        .open(&chosen)
        .map_err(|source| FlashError::OpenImage {
            path: chosen.clone(),
            source,
        })?;
    Ok(SourceImage {
        size: opener.size_hint(&chosen),
        stream,
    })
}
