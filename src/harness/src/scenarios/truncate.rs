use sys::ops;

use crate::{context::Context, fixtures, outcome::Step, trigger::Trigger};

use super::open_write;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Length passed to `truncate`.
const PATH_LEN: u64 = 10;

/// Length passed to `ftruncate`.
const FD_LEN: u64 = 5;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::SizeChange;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let path = &fixture.path;
    let checker = &fixture.checker;

    ctx.apply(trigger, "truncate", ops::truncate(path, PATH_LEN))?;
    checker.assert_all(path, "truncate")?;

    {
        let file = open_write(path)?;
        ctx.apply(trigger, "ftruncate", file.set_len(FD_LEN))?;
        checker.assert_stable_open(&file, "ftruncate")?;
    }
    checker.assert_stable(path, "ftruncate")?;

    Ok(())
}
