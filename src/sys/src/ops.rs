//! Mutating primitives that std does not expose directly.
//!
//! Every wrapper issues exactly one syscall and returns the raw OS error on failure, so the
//! caller can classify `ENOSYS`/`EOPNOTSUPP`/`EPERM` without losing the errno.

use std::{
    ffi::{CStr, CString},
    fs::File,
    io, mem,
    os::{
        fd::{AsRawFd, RawFd},
        unix::ffi::OsStrExt,
    },
    path::Path,
};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// `truncate(2)` by path.
pub fn truncate(path: &Path, len: u64) -> io::Result<()> {
    let c_path = path_to_cstring(path)?;

    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe { libc::truncate(c_path.as_ptr(), len as libc::off_t) };
    check(res)
}

/// `utimes(2)`: sets atime and mtime with microsecond resolution.
pub fn utimes(path: &Path, atime_secs: i64, mtime_secs: i64) -> io::Result<()> {
    let c_path = path_to_cstring(path)?;
    let times = [timeval(atime_secs), timeval(mtime_secs)];

    // Safe because `times` outlives the call and we check the return value.
    let res = unsafe { libc::utimes(c_path.as_ptr(), times.as_ptr()) };
    check(res)
}

/// `utimensat(2)` relative to `AT_FDCWD`, following symlinks.
///
/// `path` must be absolute for the call to be independent of the working directory.
pub fn utimensat(path: &Path, atime_secs: i64, mtime_secs: i64) -> io::Result<()> {
    let c_path = path_to_cstring(path)?;
    let times = [timespec(atime_secs), timespec(mtime_secs)];

    // Safe because `times` outlives the call and we check the return value.
    let res = unsafe { libc::utimensat(libc::AT_FDCWD, c_path.as_ptr(), times.as_ptr(), 0) };
    check(res)
}

/// `futimens(3)` on an open descriptor.
pub fn futimens(file: &File, atime_secs: i64, mtime_secs: i64) -> io::Result<()> {
    let times = [timespec(atime_secs), timespec(mtime_secs)];

    // Safe because `times` outlives the call and we check the return value.
    let res = unsafe { libc::futimens(file.as_raw_fd(), times.as_ptr()) };
    check(res)
}

/// `setxattr(2)`, following a terminal symlink.
pub fn setxattr(path: &Path, name: &CStr, value: &[u8]) -> io::Result<()> {
    let c_path = path_to_cstring(path)?;

    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe {
        libc::setxattr(
            c_path.as_ptr(),
            name.as_ptr(),
            value.as_ptr() as *const libc::c_void,
            value.len(),
            0,
        )
    };
    check(res)
}

/// `lsetxattr(2)`, acting on a terminal symlink itself.
pub fn lsetxattr(path: &Path, name: &CStr, value: &[u8]) -> io::Result<()> {
    let c_path = path_to_cstring(path)?;

    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe {
        libc::lsetxattr(
            c_path.as_ptr(),
            name.as_ptr(),
            value.as_ptr() as *const libc::c_void,
            value.len(),
            0,
        )
    };
    check(res)
}

/// `fsetxattr(2)` on an open descriptor.
pub fn fsetxattr(file: &File, name: &CStr, value: &[u8]) -> io::Result<()> {
    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe {
        libc::fsetxattr(
            file.as_raw_fd(),
            name.as_ptr(),
            value.as_ptr() as *const libc::c_void,
            value.len(),
            0,
        )
    };
    check(res)
}

/// `removexattr(2)`, following a terminal symlink.
pub fn removexattr(path: &Path, name: &CStr) -> io::Result<()> {
    let c_path = path_to_cstring(path)?;

    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe { libc::removexattr(c_path.as_ptr(), name.as_ptr()) };
    check(res)
}

/// `lremovexattr(2)`, acting on a terminal symlink itself.
pub fn lremovexattr(path: &Path, name: &CStr) -> io::Result<()> {
    let c_path = path_to_cstring(path)?;

    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe { libc::lremovexattr(c_path.as_ptr(), name.as_ptr()) };
    check(res)
}

/// `fremovexattr(2)` on an open descriptor.
pub fn fremovexattr(file: &File, name: &CStr) -> io::Result<()> {
    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe { libc::fremovexattr(file.as_raw_fd(), name.as_ptr()) };
    check(res)
}

/// `fallocate(2)` with the given mode bits.
pub fn fallocate(file: &File, mode: i32, offset: u64, len: u64) -> io::Result<()> {
    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe {
        libc::fallocate(
            file.as_raw_fd(),
            mode,
            offset as libc::off_t,
            len as libc::off_t,
        )
    };
    check(res)
}

/// Duplicates `fd` onto the lowest free descriptor at or above `min`, with `FD_CLOEXEC` set.
pub fn dup_at_least(fd: RawFd, min: RawFd) -> io::Result<RawFd> {
    // Safe because this doesn't modify any memory and we check the return value.
    let res = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, min) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(res)
}

/// Closes a raw descriptor that is not owned by any `File`.
pub fn close(fd: RawFd) -> io::Result<()> {
    // Safe because the caller owns `fd` and never uses it again as an open descriptor.
    let res = unsafe { libc::close(fd) };
    check(res)
}

pub(crate) fn path_to_cstring(path: &Path) -> io::Result<CString> {
    Ok(CString::new(path.as_os_str().as_bytes())?)
}

fn check(res: libc::c_int) -> io::Result<()> {
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

fn timeval(secs: i64) -> libc::timeval {
    // Zeroed first because some targets carry padding fields in `timeval`.
    let mut tv: libc::timeval = unsafe { mem::zeroed() };
    tv.tv_sec = secs as libc::time_t;
    tv
}

fn timespec(secs: i64) -> libc::timespec {
    // Zeroed first because some targets carry padding fields in `timespec`.
    let mut ts: libc::timespec = unsafe { mem::zeroed() };
    ts.tv_sec = secs as libc::time_t;
    ts
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{
        fs::{self, OpenOptions},
        os::unix::fs::MetadataExt,
    };

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_truncate_shrinks_file() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("file1");
        fs::write(&path, b"Hello, World!")?;

        truncate(&path, 5)?;
        assert_eq!(fs::read(&path)?, b"Hello");

        Ok(())
    }

    #[test]
    fn test_truncate_missing_file() -> io::Result<()> {
        let dir = TempDir::new()?;
        let err = truncate(&dir.path().join("missing"), 0).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));

        Ok(())
    }

    #[test]
    fn test_timestamp_calling_conventions() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("file1");
        fs::write(&path, b"data")?;

        utimes(&path, 1_000_000_000, 1_000_000_000)?;
        assert_eq!(fs::metadata(&path)?.mtime(), 1_000_000_000);

        utimensat(&path, 1_000_000_001, 1_000_000_001)?;
        assert_eq!(fs::metadata(&path)?.mtime(), 1_000_000_001);

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        futimens(&file, 1_000_000_002, 1_000_000_002)?;
        assert_eq!(file.metadata()?.mtime(), 1_000_000_002);
        assert_eq!(file.metadata()?.atime(), 1_000_000_002);

        Ok(())
    }

    #[test]
    fn test_path_with_nul_is_rejected() {
        let path = Path::new(std::ffi::OsStr::from_bytes(b"bad\0path"));
        let err = truncate(path, 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_dup_at_least_and_close() -> io::Result<()> {
        let dir = TempDir::new()?;
        let file = File::open(dir.path())?;

        let fd = dup_at_least(file.as_raw_fd(), 256)?;
        assert!(fd >= 256);
        close(fd)?;

        Ok(())
    }
}
