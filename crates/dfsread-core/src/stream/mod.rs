//! Seekable streaming read surface.

mod read_runner;

use std::io;
use std::sync::Arc;

use crate::error::ClientError;
use crate::runner::ClientContext;
use crate::stats::ReadStatistics;

use read_runner::StreamCore;

/// A seekable byte stream over one remote file.
///
/// Reads block until bytes arrive or the request fails; a transport failure
/// tears the connection down and the next read transparently reconnects at
/// the cursor, avoiding data nodes that already failed for this stream.
pub struct DfsInputStream {
    core: StreamCore,
}

impl DfsInputStream {
    pub(crate) fn open(
        ctx: Arc<ClientContext>,
        path: &str,
        buffer_size: usize,
        read_param: Option<String>,
        stats: ReadStatistics,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            core: StreamCore::open(ctx, path, buffer_size, read_param, stats)?,
        })
    }

    /// Current cursor position.
    pub fn pos(&self) -> u64 {
        self.core.pos
    }

    /// Total length once a response declared one, `-1` while unknown.
    pub fn file_length(&self) -> i64 {
        self.core.file_length
    }

    /// Override the known length (e.g. from an out-of-band stat).
    pub fn set_file_length(&mut self, len: i64) {
        self.core.file_length = len;
    }

    /// Read a single byte; `None` at end of stream.
    pub fn read_byte(&mut self) -> Result<Option<u8>, ClientError> {
        let mut byte = [0u8; 1];
        match self.core.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Read into `buf`; `Ok(0)` means end of stream (or an empty `buf`).
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ClientError> {
        self.core.read(buf)
    }

    /// Reposition the cursor. A no-op when `new_pos` equals the cursor;
    /// otherwise the connection is torn down and the next read reopens at
    /// the new offset.
    pub fn seek_to(&mut self, new_pos: u64) -> Result<(), ClientError> {
        self.core.seek(new_pos)
    }

    /// Close idempotently; subsequent reads fail with `StreamClosed`.
    pub fn close(&mut self) {
        self.core.close();
    }
}

impl io::Read for DfsInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.core.read(buf).map_err(io::Error::from)
    }
}

impl io::Seek for DfsInputStream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(p) => p as i64,
            io::SeekFrom::Current(delta) => self.core.pos as i64 + delta,
            io::SeekFrom::End(delta) => {
                if self.core.file_length < 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "stream length unknown",
                    ));
                }
                self.core.file_length + delta
            }
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }
        self.core.seek(target as u64).map_err(io::Error::from)?;
        Ok(self.core.pos)
    }
}
