//! The raw `getdents64(2)` enumeration primitive and a parser for its record stream.
//!
//! The kernel fills the caller's buffer with packed `linux_dirent64` records:
//!
//! ```text
//! offset 0   d_ino     u64
//! offset 8   d_off     i64
//! offset 16  d_reclen  u16   length of this record, including padding
//! offset 18  d_type    u8
//! offset 19  d_name    NUL-terminated, padded up to d_reclen
//! ```
//!
//! The parser advances by `d_reclen` and refuses records whose length is zero or runs past
//! the filled part of the buffer, so a malformed stream ends in an error instead of a loop.

use std::{
    ffi::OsString,
    fs::File,
    io,
    os::{
        fd::{AsRawFd, RawFd},
        unix::ffi::OsStringExt,
    },
};

use log::debug;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Size of the fixed part of a `linux_dirent64` record, up to and including `d_type`.
pub const DIRENT64_HEADER_LEN: usize = 19;

/// Buffer size used when draining a directory.
pub const ENUMERATION_BUFFER_LEN: usize = 4096;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The `d_type` tag of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Unknown,
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    Regular,
    Symlink,
    Socket,
}

/// One parsed directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirent {
    /// Inode number reported for the entry
    pub ino: u64,

    /// Opaque cursor for resuming after this entry
    pub offset: i64,

    /// Entry type tag
    pub kind: EntryKind,

    /// Entry name, without the terminating NUL
    pub name: OsString,
}

/// A malformed record in a `getdents64` buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirentError {
    /// The record claims a length of zero, which would never advance the cursor.
    #[error("record at offset {offset} has zero length")]
    ZeroRecordLength { offset: usize },

    /// The record header does not fit in what is left of the buffer.
    #[error("record at offset {offset} is truncated: {len} bytes left, header needs 19")]
    ShortHeader { offset: usize, len: usize },

    /// The record's self-described length runs past the filled part of the buffer.
    #[error("record at offset {offset} claims {reclen} bytes but only {len} remain")]
    RecordOverrun {
        offset: usize,
        reclen: usize,
        len: usize,
    },

    /// The record's self-described length is smaller than the fixed header.
    #[error("record at offset {offset} claims {reclen} bytes, less than its header")]
    UndersizedRecord { offset: usize, reclen: usize },

    /// The record's name has no NUL terminator within the record.
    #[error("record at offset {offset} has an unterminated name")]
    UnterminatedName { offset: usize },
}

/// Failure while draining a directory.
#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("getdents64 failed: {0}")]
    Syscall(#[from] io::Error),

    #[error("malformed getdents64 buffer: {0}")]
    Parse(#[from] DirentError),
}

/// Iterator over the records in a filled `getdents64` buffer.
///
/// Yields `Err` at most once: iteration stops after the first malformed record.
pub struct DirentIter<'a> {
    buf: &'a [u8],
    pos: usize,
    failed: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl EntryKind {
    /// Maps a raw `d_type` value.
    pub fn from_d_type(d_type: u8) -> Self {
        match d_type {
            libc::DT_FIFO => EntryKind::Fifo,
            libc::DT_CHR => EntryKind::CharDevice,
            libc::DT_DIR => EntryKind::Directory,
            libc::DT_BLK => EntryKind::BlockDevice,
            libc::DT_REG => EntryKind::Regular,
            libc::DT_LNK => EntryKind::Symlink,
            libc::DT_SOCK => EntryKind::Socket,
            _ => EntryKind::Unknown,
        }
    }
}

impl<'a> DirentIter<'a> {
    /// Iterates over `buf`, which must hold exactly the bytes the kernel reported as filled.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            failed: false,
        }
    }

    fn parse_record(&self) -> Result<(Dirent, usize), DirentError> {
        let offset = self.pos;
        let rest = &self.buf[offset..];

        if rest.len() < DIRENT64_HEADER_LEN {
            return Err(DirentError::ShortHeader {
                offset,
                len: rest.len(),
            });
        }

        let reclen = u16::from_ne_bytes([rest[16], rest[17]]) as usize;
        if reclen == 0 {
            return Err(DirentError::ZeroRecordLength { offset });
        }
        if reclen < DIRENT64_HEADER_LEN {
            return Err(DirentError::UndersizedRecord { offset, reclen });
        }
        if reclen > rest.len() {
            return Err(DirentError::RecordOverrun {
                offset,
                reclen,
                len: rest.len(),
            });
        }

        let ino = u64::from_ne_bytes(field(rest, 0));
        let d_off = i64::from_ne_bytes(field(rest, 8));
        let kind = EntryKind::from_d_type(rest[18]);

        let name_bytes = &rest[DIRENT64_HEADER_LEN..reclen];
        let name_len = name_bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or(DirentError::UnterminatedName { offset })?;

        let entry = Dirent {
            ino,
            offset: d_off,
            kind,
            name: OsString::from_vec(name_bytes[..name_len].to_vec()),
        };

        Ok((entry, reclen))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Iterator for DirentIter<'_> {
    type Item = Result<Dirent, DirentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }

        match self.parse_record() {
            Ok((entry, reclen)) => {
                self.pos += reclen;
                Some(Ok(entry))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Issues one raw `getdents64` call on `fd`. Returns the number of bytes filled; 0 is end of
/// stream.
///
/// Takes a raw descriptor so callers can probe closed or non-directory descriptors.
pub fn getdents64(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    // Safe because the kernel writes at most `buf.len()` bytes into `buf` and we check the
    // return value.
    let res = unsafe {
        libc::syscall(
            libc::SYS_getdents64,
            fd,
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(res as usize)
}

/// Drains an open directory handle until `getdents64` reports end of stream.
pub fn read_dir_entries(dir: &File) -> Result<Vec<Dirent>, EnumerateError> {
    let mut buf = vec![0u8; ENUMERATION_BUFFER_LEN];
    let mut entries = Vec::new();

    loop {
        let filled = getdents64(dir.as_raw_fd(), &mut buf)?;
        if filled == 0 {
            break;
        }

        debug!("getdents64 filled {} bytes", filled);
        for entry in DirentIter::new(&buf[..filled]) {
            entries.push(entry?);
        }
    }

    Ok(entries)
}

fn field<const N: usize>(rest: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&rest[at..at + N]);
    out
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
