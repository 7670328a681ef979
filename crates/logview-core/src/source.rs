//! Seekable, re-openable byte stream over a log file.
//!
//! A [`FileSource`] is the single point of contact with the file system for
//! log content. It is read-only and remembers the path it was opened from so
//! it can be re-opened in place when the file is rotated.
//!
//! Concurrency contract: at most one thread may seek/read at a time. The
//! owning facade enforces this by keeping the source behind a mutex shared
//! between the reader API and the indexer ([`SharedSource`]).

use crate::error::{CoreError, Result};
use logview_common::BytePos;
use memchr::memchr;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// The byte source as shared between the facade, the readers and the
/// indexer. `None` means the source is currently closed.
pub type SharedSource = Arc<Mutex<Option<FileSource>>>;

/// Read-only, seekable access to a named byte stream.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: File,
}

impl FileSource {
    /// Open the file at `path` for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        Ok(FileSource { path, file })
    }

    /// The path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length of the open file, as observed now.
    pub fn size(&self) -> Result<BytePos> {
        Ok(BytePos(self.file.metadata()?.len()))
    }

    /// Position the read cursor at an absolute offset.
    pub fn seek(&mut self, pos: BytePos) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos.get()))?;
        Ok(())
    }

    /// Read up to `len` bytes from the current position.
    ///
    /// Returns fewer bytes only at end of file.
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        let filled = self.read_into(&mut buffer)?;
        buffer.truncate(filled);
        Ok(buffer)
    }

    /// Fill `buffer` from the current position, stopping early only at end
    /// of file. Returns the number of bytes read.
    pub fn read_into(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut filled = 0;

        while filled < buffer.len() {
            match self.file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CoreError::Io(e)),
            }
        }

        Ok(filled)
    }

    /// Read bytes up to and including the next `\n`, or to end of file.
    ///
    /// The cursor is left just past the terminator.
    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = match self.file.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CoreError::Io(e)),
            };
            if n == 0 {
                break;
            }

            if let Some(nl) = memchr(b'\n', &chunk[..n]) {
                line.extend_from_slice(&chunk[..=nl]);
                // Rewind to just past the terminator
                self.file.seek(SeekFrom::Current(nl as i64 + 1 - n as i64))?;
                break;
            }
            line.extend_from_slice(&chunk[..n]);
        }

        Ok(line)
    }

    /// Close and re-open the file by path.
    ///
    /// Used when the file under the path may have been replaced (rotation):
    /// the open handle follows the old inode, but we want to follow the
    /// name.
    pub fn reopen(&mut self) -> Result<()> {
        debug!("re-opening source {:?}", self.path);
        self.file = File::open(&self.path)?;
        Ok(())
    }
}

/// Build a shared slot holding an open source.
pub fn shared(source: FileSource) -> SharedSource {
    Arc::new(Mutex::new(Some(source)))
}
