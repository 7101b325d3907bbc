use std::{
    fs::OpenOptions,
    io::Write,
    os::unix::fs::FileExt,
};

use crate::{context::Context, fixtures, outcome::Step, trigger::Trigger};

use super::{open, open_read, open_write};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Bytes appended through the path-opened descriptor.
const APPENDED: &[u8] = b" appended data";

/// Bytes written in place through `pwrite`.
const OVERWRITE: &[u8] = b"COPY";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::ContentWrite;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let path = &fixture.path;
    let checker = &fixture.checker;

    // Appending through a fresh descriptor triggers the copy-up
    {
        let mut file = open(
            path,
            OpenOptions::new().append(true),
            "open(O_WRONLY|O_APPEND)",
        )?;
        ctx.apply(trigger, "write", file.write_all(APPENDED))?;
        checker.assert_stable_open(&file, "write")?;
    }
    checker.assert_stable(path, "write")?;

    {
        let file = open_read(path)?;
        checker.assert_stable_open(&file, "write")?;
    }

    // In-place overwrite through a descriptor, checked on that same descriptor
    {
        let file = open_write(path)?;
        ctx.apply(trigger, "pwrite", file.write_all_at(OVERWRITE, 0))?;
        checker.assert_stable_open(&file, "pwrite")?;
    }
    checker.assert_stable(path, "pwrite")?;

    Ok(())
}
