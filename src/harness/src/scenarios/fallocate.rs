use sys::ops;

use crate::{context::Context, fixtures, outcome::Step, trigger::Trigger};

use super::open_read_write;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Bytes preallocated from offset 0.
const PREALLOCATE_LEN: u64 = 1024;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::SpacePreallocate;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let path = &fixture.path;
    let checker = &fixture.checker;

    {
        let file = open_read_write(path)?;
        ctx.apply(
            trigger,
            "fallocate",
            ops::fallocate(&file, 0, 0, PREALLOCATE_LEN),
        )?;
        checker.assert_stable_open(&file, "fallocate")?;
    }
    checker.assert_stable(path, "fallocate")?;

    Ok(())
}
