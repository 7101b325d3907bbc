//! Identity assertions made after every mutating call.
//!
//! A scenario snapshots the identity of its fixture once, before the first trigger, and then
//! re-resolves it through every access path the call could have disturbed. The path-based,
//! descriptor-based and link-based queries are checked separately: a filesystem that keeps one
//! of them stable across copy-up does not necessarily keep the others stable.

use std::{
    fs::{File, OpenOptions},
    os::unix::fs::OpenOptionsExt,
    path::Path,
};

use log::debug;
use sys::{identity, Identity};

use crate::error::Failure;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Holds the identity snapshot of one storage object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checker {
    expected: Identity,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Checker {
    pub fn new(expected: Identity) -> Self {
        Self { expected }
    }

    /// The snapshot every query is compared against.
    pub fn expected(&self) -> Identity {
        self.expected
    }

    /// `stat(path)` must still report the snapshot.
    pub fn assert_stable(&self, path: &Path, operation: &'static str) -> Result<(), Failure> {
        assert_stable(path, self.expected, operation)
    }

    /// `lstat(path)` must still report the snapshot.
    pub fn assert_stable_link(&self, path: &Path, operation: &'static str) -> Result<(), Failure> {
        let observed = identity::identity_of_link(path)
            .map_err(|e| Failure::syscall("lstat", e))?
            .ok_or_else(|| Failure::Vanished {
                operation,
                path: path.to_path_buf(),
            })?;

        debug!("lstat {} after {}: {}", path.display(), operation, observed);
        self.compare(observed, operation)
    }

    /// `fstat(file)` must still report the snapshot.
    pub fn assert_stable_open(&self, file: &File, operation: &'static str) -> Result<(), Failure> {
        let observed =
            identity::identity_of_open(file).map_err(|e| Failure::syscall("fstat", e))?;

        debug!("fstat after {}: {}", operation, observed);
        self.compare(observed, operation)
    }

    /// Every query form must still report the snapshot: `stat(path)`, `lstat(path)` and `fstat`
    /// on a fresh descriptor. The descriptor is opened with `O_PATH` so the check itself neither
    /// needs read permission nor triggers a copy-up.
    pub fn assert_all(&self, path: &Path, operation: &'static str) -> Result<(), Failure> {
        self.assert_stable(path, operation)?;
        self.assert_stable_link(path, operation)?;

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_PATH | libc::O_NOFOLLOW)
            .open(path)
            .map_err(|e| Failure::syscall("open(O_PATH)", e))?;
        self.assert_stable_open(&file, operation)
    }

    /// `path` must no longer resolve.
    pub fn assert_absent(&self, path: &Path, operation: &'static str) -> Result<(), Failure> {
        match identity::identity_of(path).map_err(|e| Failure::syscall("stat", e))? {
            None => {
                debug!("stat {} after {}: no such entry", path.display(), operation);
                Ok(())
            }
            Some(identity) => Err(Failure::StillPresent {
                operation,
                path: path.to_path_buf(),
                identity,
            }),
        }
    }

    /// The object reachable at `path` must have at least `minimum` links.
    pub fn assert_link_count(
        &self,
        path: &Path,
        minimum: u64,
        operation: &'static str,
    ) -> Result<(), Failure> {
        let attrs = identity::attributes_of(path)
            .map_err(|e| Failure::syscall("stat", e))?
            .ok_or_else(|| Failure::Vanished {
                operation,
                path: path.to_path_buf(),
            })?;

        debug!("nlink {} after {}: {}", path.display(), operation, attrs.nlink);
        if attrs.nlink < minimum {
            return Err(Failure::LinkCount {
                operation,
                path: path.to_path_buf(),
                minimum,
                observed: attrs.nlink,
            });
        }

        Ok(())
    }

    fn compare(&self, observed: Identity, operation: &'static str) -> Result<(), Failure> {
        if observed != self.expected {
            return Err(Failure::IdentityChanged {
                operation,
                expected: self.expected,
                observed,
            });
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Re-resolves `path` with `stat` and compares the result to `expected`.
///
/// A path that no longer exists is reported as [`Failure::Vanished`], not as an identity change.
pub fn assert_stable(path: &Path, expected: Identity, operation: &'static str) -> Result<(), Failure> {
    let observed = identity::identity_of(path)
        .map_err(|e| Failure::syscall("stat", e))?
        .ok_or_else(|| Failure::Vanished {
            operation,
            path: path.to_path_buf(),
        })?;

    debug!("stat {} after {}: {}", path.display(), operation, observed);
    Checker::new(expected).compare(observed, operation)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
