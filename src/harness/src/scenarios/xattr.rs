use std::ffi::CStr;

use sys::ops;

use crate::{context::Context, fixtures, outcome::Step, trigger::Trigger};

use super::open_read;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Set by path, later removed by path.
const ATTR: &CStr = c"user.test_attr";

/// Set by path without following symlinks.
const ATTR_NOFOLLOW: &CStr = c"user.test_attr2";

/// Set and removed through a descriptor.
const ATTR_FD: &CStr = c"user.test_attr3";

const VALUE: &[u8] = b"test_value";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::AttributeSet;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let path = &fixture.path;
    let checker = &fixture.checker;

    ctx.apply(trigger, "setxattr", ops::setxattr(path, ATTR, VALUE))?;
    checker.assert_all(path, "setxattr")?;

    // The fixture is not a symlink, so this must behave exactly like setxattr
    ctx.apply(
        trigger,
        "lsetxattr",
        ops::lsetxattr(path, ATTR_NOFOLLOW, VALUE),
    )?;
    checker.assert_all(path, "lsetxattr")?;

    {
        let file = open_read(path)?;
        ctx.apply(trigger, "fsetxattr", ops::fsetxattr(&file, ATTR_FD, VALUE))?;
        checker.assert_stable_open(&file, "fsetxattr")?;
    }

    ctx.apply(trigger, "removexattr", ops::removexattr(path, ATTR))?;
    checker.assert_all(path, "removexattr")?;

    ctx.apply(
        trigger,
        "lremovexattr",
        ops::lremovexattr(path, ATTR_NOFOLLOW),
    )?;
    checker.assert_all(path, "lremovexattr")?;

    {
        let file = open_read(path)?;
        ctx.apply(trigger, "fremovexattr", ops::fremovexattr(&file, ATTR_FD))?;
        checker.assert_stable_open(&file, "fremovexattr")?;
    }
    checker.assert_stable(path, "fremovexattr")?;

    Ok(())
}
