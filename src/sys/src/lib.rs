//! Low-level filesystem access for the ovlcheck copy-up harness.
//!
//! This crate holds everything that talks to the kernel directly: identity queries
//! (`stat`/`lstat`/`fstat`), the mutating primitives std does not wrap, and the raw
//! `getdents64` enumeration primitive together with a parser for its record stream.

pub mod dirent;
pub mod identity;
pub mod ops;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use dirent::{Dirent, DirentError, DirentIter, EntryKind, EnumerateError};
pub use identity::{Attributes, Identity};
