use std::{io, path::PathBuf};

use nix::errno::Errno;
use sys::{EntryKind, EnumerateError, Identity};
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A hard failure: either an identity/consistency invariant was violated or a syscall failed in a
/// way no environment limitation explains.
#[derive(Debug, Error)]
pub enum Failure {
    /// The object's identity differs from the snapshot taken before the operation.
    #[error("identity changed after {operation}: was {expected}, now {observed}")]
    IdentityChanged {
        operation: &'static str,
        expected: Identity,
        observed: Identity,
    },

    /// A path that must still resolve returned "no such entry".
    #[error("{} no longer exists after {operation}", .path.display())]
    Vanished {
        operation: &'static str,
        path: PathBuf,
    },

    /// A path that must be gone still resolves.
    #[error("{} still resolves after {operation} ({identity})", .path.display())]
    StillPresent {
        operation: &'static str,
        path: PathBuf,
        identity: Identity,
    },

    /// The link count is lower than the operation guarantees.
    #[error("link count of {} is {observed} after {operation}, expected at least {minimum}", .path.display())]
    LinkCount {
        operation: &'static str,
        path: PathBuf,
        minimum: u64,
        observed: u64,
    },

    /// A syscall failed with an error outside the tolerated set.
    #[error("{operation} failed: {source}")]
    Syscall {
        operation: &'static str,
        source: io::Error,
    },

    /// A call expected to fail succeeded.
    #[error("{operation} succeeded, expected {expected}")]
    UnexpectedSuccess {
        operation: &'static str,
        expected: Errno,
    },

    /// A call failed, but not with the expected error.
    #[error("{operation} failed with {observed}, expected {expected}")]
    WrongError {
        operation: &'static str,
        expected: Errno,
        observed: io::Error,
    },

    /// Enumerating a directory produced no records at all.
    #[error("enumerating {} returned no entries", .path.display())]
    EmptyListing { path: PathBuf },

    /// A known entry is missing from a directory listing.
    #[error("{name:?} not found while enumerating {}", .path.display())]
    MissingEntry { path: PathBuf, name: String },

    /// A listed entry carries the wrong type tag.
    #[error("{name:?} listed as {observed:?}, expected {expected:?}")]
    WrongEntryKind {
        name: String,
        expected: EntryKind,
        observed: EntryKind,
    },

    /// Draining a directory failed or produced a malformed record.
    #[error("enumerating {}: {source}", .path.display())]
    Enumeration {
        path: PathBuf,
        source: EnumerateError,
    },
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Failure {
    /// Wraps an unexpected syscall error.
    pub fn syscall(operation: &'static str, source: io::Error) -> Self {
        Failure::Syscall { operation, source }
    }
}
