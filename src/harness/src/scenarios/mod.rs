//! One scenario per copy-up trigger.
//!
//! Every scenario follows the same shape: resolve the fixture (skip if absent), apply each
//! calling convention of the trigger in turn, and after every call re-resolve the identity
//! through each access path the call could have disturbed. Descriptors are scoped to the block
//! that uses them, so they are closed on every exit path, including early skips and failures.

use std::{
    fs::{File, OpenOptions},
    path::Path,
};

use crate::{context::Context, error::Failure, outcome::Step, trigger::Trigger};

mod chmod;
mod chown;
mod fallocate;
mod link;
mod rename;
mod truncate;
mod utimes;
mod write;
mod xattr;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Runs the scenario for `trigger`.
pub fn run(trigger: Trigger, ctx: &Context) -> Step {
    match trigger {
        Trigger::ContentWrite => write::run(ctx),
        Trigger::SizeChange => truncate::run(ctx),
        Trigger::PermissionChange => chmod::run(ctx),
        Trigger::OwnershipChange => chown::run(ctx),
        Trigger::Rename => rename::run(ctx),
        Trigger::LinkCreation => link::run(ctx),
        Trigger::TimestampChange => utimes::run(ctx),
        Trigger::AttributeSet => xattr::run(ctx),
        Trigger::SpacePreallocate => fallocate::run(ctx),
    }
}

/// Opens `path` with `options`; any failure is a hard failure labelled `operation`.
fn open(path: &Path, options: &OpenOptions, operation: &'static str) -> Step<File> {
    options
        .open(path)
        .map_err(|e| Failure::syscall(operation, e).into())
}

fn open_read(path: &Path) -> Step<File> {
    open(path, OpenOptions::new().read(true), "open(O_RDONLY)")
}

fn open_write(path: &Path) -> Step<File> {
    open(path, OpenOptions::new().write(true), "open(O_WRONLY)")
}

fn open_read_write(path: &Path) -> Step<File> {
    open(
        path,
        OpenOptions::new().read(true).write(true),
        "open(O_RDWR)",
    )
}
