//! Conformance check for the lazy directory enumeration protocol (`getdents64`).
//!
//! Drains a directory through the raw primitive, then probes the two failure modes callers
//! depend on: a closed descriptor must fail with `EBADF` and a non-directory with `ENOTDIR`.

use std::{
    fs::{File, OpenOptions},
    io,
    os::{
        fd::{AsRawFd, IntoRawFd, RawFd},
        unix::fs::OpenOptionsExt,
    },
    path::PathBuf,
    sync::Mutex,
};

use log::{debug, info};
use nix::{
    errno::Errno,
    sys::resource::{getrlimit, Resource},
};
use sys::{
    dirent::{self, ENUMERATION_BUFFER_LEN},
    identity, EntryKind,
};

use crate::{
    context::Context,
    error::Failure,
    outcome::{Interrupt, Step},
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Name of the enumeration scenario.
pub const SCENARIO_NAME: &str = "getdents64";

/// Lowest descriptor number the closed-handle probe parks its descriptor at. Ordinary opens take
/// the lowest free number, so a closed number this high is not handed out again before the probe.
/// Lowered to fit under `RLIMIT_NOFILE` when the soft limit is smaller.
const PARKED_FD_FLOOR: RawFd = 256;

/// Serializes park/close/probe sequences so two checks running in one process cannot hand each
/// other the parked number.
static CLOSED_PROBE: Mutex<()> = Mutex::new(());

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Runs the enumeration check against the configured directory and entry.
pub fn run(ctx: &Context) -> Step {
    let dir_path = ctx.config().enumeration_target().to_path_buf();
    let entry_name = ctx.config().enumeration_entry.clone();
    let entry_path = dir_path.join(&entry_name);

    if identity::attributes_of_link(&entry_path)
        .map_err(|e| Failure::syscall("lstat", e))?
        .is_none()
    {
        info!("{}: {} not present", SCENARIO_NAME, entry_path.display());
        return Err(Interrupt::Skip(format!(
            "{} not in {}",
            entry_name,
            dir_path.display()
        )));
    }

    let dir = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECTORY)
        .open(&dir_path)
        .map_err(|e| Failure::syscall("open(O_DIRECTORY)", e))?;

    check_listing(&dir, dir_path, &entry_name)?;
    check_closed_descriptor(dir)?;

    let file = File::open(&entry_path).map_err(|e| Failure::syscall("open(O_RDONLY)", e))?;
    expect_errno(
        dirent::getdents64(file.as_raw_fd(), &mut [0u8; ENUMERATION_BUFFER_LEN]),
        Errno::ENOTDIR,
        "getdents64 (regular file)",
    )?;

    Ok(())
}

fn check_listing(dir: &File, dir_path: PathBuf, entry_name: &str) -> Result<(), Failure> {
    let entries = dirent::read_dir_entries(dir).map_err(|source| Failure::Enumeration {
        path: dir_path.clone(),
        source,
    })?;
    debug!(
        "{}: {} entries in {}",
        SCENARIO_NAME,
        entries.len(),
        dir_path.display()
    );

    if entries.is_empty() {
        return Err(Failure::EmptyListing { path: dir_path });
    }

    let entry = entries
        .iter()
        .find(|e| e.name == entry_name)
        .ok_or_else(|| Failure::MissingEntry {
            path: dir_path,
            name: entry_name.to_string(),
        })?;

    if entry.kind != EntryKind::Regular {
        return Err(Failure::WrongEntryKind {
            name: entry_name.to_string(),
            expected: EntryKind::Regular,
            observed: entry.kind,
        });
    }

    Ok(())
}

/// Closes every descriptor referring to `dir` and probes the closed number.
///
/// The directory is first parked above the low descriptor range. When the descriptor limit
/// leaves no room up there, the original number is closed and probed instead.
fn check_closed_descriptor(dir: File) -> Result<(), Failure> {
    let _guard = CLOSED_PROBE.lock().unwrap_or_else(|e| e.into_inner());

    let closed = match sys::ops::dup_at_least(dir.as_raw_fd(), parking_floor()) {
        Ok(parked) => {
            drop(dir);
            parked
        }
        Err(e) if matches!(e.raw_os_error(), Some(libc::EINVAL | libc::EMFILE)) => {
            debug!(
                "{}: no high descriptor slot ({}), probing the original number",
                SCENARIO_NAME, e
            );
            dir.into_raw_fd()
        }
        Err(e) => return Err(Failure::syscall("fcntl(F_DUPFD_CLOEXEC)", e)),
    };
    sys::ops::close(closed).map_err(|e| Failure::syscall("close", e))?;

    expect_errno(
        dirent::getdents64(closed, &mut [0u8; ENUMERATION_BUFFER_LEN]),
        Errno::EBADF,
        "getdents64 (closed descriptor)",
    )
}

/// The parking floor, clamped below the soft descriptor limit.
fn parking_floor() -> RawFd {
    match getrlimit(Resource::RLIMIT_NOFILE) {
        Ok((soft, _)) => soft
            .saturating_sub(1)
            .min(PARKED_FD_FLOOR as libc::rlim_t) as RawFd,
        Err(_) => PARKED_FD_FLOOR,
    }
}

fn expect_errno(
    res: io::Result<usize>,
    expected: Errno,
    operation: &'static str,
) -> Result<(), Failure> {
    match res {
        Ok(_) => Err(Failure::UnexpectedSuccess {
            operation,
            expected,
        }),
        Err(e) if e.raw_os_error() == Some(expected as i32) => {
            debug!("{}: {} failed with {} as expected", SCENARIO_NAME, operation, expected);
            Ok(())
        }
        Err(observed) => Err(Failure::WrongError {
            operation,
            expected,
            observed,
        }),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::{config::SuiteConfig, outcome::Outcome};

    fn run_in(dir: &TempDir, config: impl FnOnce(SuiteConfig) -> SuiteConfig) -> io::Result<Outcome> {
        let ctx = Context::new(config(SuiteConfig::new(dir.path())))?;
        Ok(Outcome::from(run(&ctx)))
    }

    #[test]
    fn test_enumeration_passes_on_well_formed_directory() -> io::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("test.txt"), b"data")?;
        fs::create_dir(dir.path().join("subdir"))?;

        let outcome = run_in(&dir, |c| c)?;
        assert!(outcome.is_passed(), "{}", outcome);

        Ok(())
    }

    #[test]
    fn test_enumeration_skips_without_entry() -> io::Result<()> {
        let dir = TempDir::new()?;

        let outcome = run_in(&dir, |c| c)?;
        assert!(outcome.is_skipped(), "{}", outcome);

        Ok(())
    }

    #[test]
    fn test_enumeration_rejects_entry_of_wrong_kind() -> io::Result<()> {
        let dir = TempDir::new()?;
        fs::create_dir(dir.path().join("marker"))?;

        match run_in(&dir, |c| c.enumeration_entry("marker"))? {
            Outcome::Failed(Failure::WrongEntryKind { observed, .. }) => {
                assert_eq!(observed, EntryKind::Directory)
            }
            other => panic!("unexpected outcome: {}", other),
        }

        Ok(())
    }

    #[test]
    fn test_enumeration_custom_directory() -> io::Result<()> {
        let dir = TempDir::new()?;
        let sub = dir.path().join("sub");
        fs::create_dir(&sub)?;
        fs::write(sub.join("marker"), b"data")?;

        let outcome = run_in(&dir, |c| c.enumeration_dir(&sub).enumeration_entry("marker"))?;
        assert!(outcome.is_passed(), "{}", outcome);

        Ok(())
    }

    #[test]
    fn test_parking_floor_fits_descriptor_limit() -> io::Result<()> {
        let (soft, _) = getrlimit(Resource::RLIMIT_NOFILE)?;

        let floor = parking_floor();
        assert!(floor <= PARKED_FD_FLOOR);
        assert!((floor as libc::rlim_t) < soft.max(1));

        Ok(())
    }

    #[test]
    fn test_expect_errno() {
        assert!(expect_errno(
            Err(io::Error::from_raw_os_error(libc::EBADF)),
            Errno::EBADF,
            "probe"
        )
        .is_ok());

        assert!(matches!(
            expect_errno(Ok(0), Errno::EBADF, "probe"),
            Err(Failure::UnexpectedSuccess { .. })
        ));

        assert!(matches!(
            expect_errno(
                Err(io::Error::from_raw_os_error(libc::EIO)),
                Errno::ENOTDIR,
                "probe"
            ),
            Err(Failure::WrongError { .. })
        ));
    }
}
