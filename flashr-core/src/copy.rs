//! Chunked, cancellable copying with progress callbacks.
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Size of one transfer chunk (1 MiB).
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Why a copy stopped early. Both variants carry the number of bytes that
/// had been fully written when it stopped.
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("copy canceled after {copied} bytes")]
    Canceled { copied: u64 },

    #[error("reading failed after {copied} bytes: {source}")]
    Read {
        copied: u64,
        #[source]
        source: io::Error,
    },

    #[error("writing failed after {copied} bytes: {source}")]
    Write {
        copied: u64,
        #[source]
        source: io::Error,
    },
}

impl CopyError {
    pub fn copied(&self) -> u64 {
        match self {
            CopyError::Canceled { copied }
            | CopyError::Read { copied, .. }
            | CopyError::Write { copied, .. } => *copied,
        }
    }
}

/// Copies `reader` into `writer` until the reader is exhausted.
///
/// The reader is drained into a [`CHUNK_SIZE`] buffer and each chunk is handed
/// to the writer with a single `write_all`, so a chunk is either fully written
/// or the error is returned before the next one starts. `running` is checked
/// before every chunk; clearing it stops the copy at the next chunk boundary.
/// `on_progress` receives the running total after every chunk.
pub fn copy_with_progress<R, W, F>(
    running: &AtomicBool,
    writer: &mut W,
    reader: &mut R,
    mut on_progress: F,
) -> Result<u64, CopyError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: FnMut(u64),
{
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut copied: u64 = 0;

    loop {
        if !running.load(Ordering::SeqCst) {
            log::debug!("copy canceled at {copied} bytes");
            return Err(CopyError::Canceled { copied });
        }

        let filled = fill_chunk(reader, &mut buffer)
            .map_err(|source| CopyError::Read { copied, source })?;
        if filled == 0 {
            break;
        }

        writer
            .write_all(&buffer[..filled])
            .map_err(|source| CopyError::Write { copied, source })?;
        copied += filled as u64;
        on_progress(copied);

        if filled < buffer.len() {
            break;
        }
    }

    writer
        .flush()
        .map_err(|source| CopyError::Write { copied, source })?;
    Ok(copied)
}

/// Reads until `buf` is full or the reader hits EOF. Returns the bytes read.
fn fill_chunk<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
