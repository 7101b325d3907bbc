use sys::ops;

use crate::{context::Context, fixtures, outcome::Step, trigger::Trigger};

use super::open_read_write;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Timestamp set by `utimes`; each later calling convention uses the next second so every call
/// is an actual change.
const BASE_TIME: i64 = 1_000_000_000;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Exercises the three timestamp calling conventions: legacy microsecond by path, nanosecond by
/// path, and nanosecond by descriptor.
pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::TimestampChange;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let path = &fixture.path;
    let checker = &fixture.checker;

    ctx.apply(trigger, "utimes", ops::utimes(path, BASE_TIME, BASE_TIME))?;
    checker.assert_all(path, "utimes")?;

    ctx.apply(
        trigger,
        "utimensat",
        ops::utimensat(path, BASE_TIME + 1, BASE_TIME + 1),
    )?;
    checker.assert_all(path, "utimensat")?;

    {
        let file = open_read_write(path)?;
        ctx.apply(
            trigger,
            "futimens",
            ops::futimens(&file, BASE_TIME + 2, BASE_TIME + 2),
        )?;
        checker.assert_stable_open(&file, "futimens")?;
    }
    checker.assert_stable(path, "futimens")?;

    Ok(())
}
