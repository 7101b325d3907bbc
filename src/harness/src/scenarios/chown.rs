use std::os::unix::fs::{chown, fchown, lchown};

use sys::identity;

use crate::{context::Context, error::Failure, fixtures, outcome::Step, trigger::Trigger};

use super::open_read;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Changes ownership to the current owner. No attribute actually changes, but the call must
/// still copy the file up.
pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::OwnershipChange;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let path = &fixture.path;
    let checker = &fixture.checker;

    let attrs = identity::attributes_of(path)
        .map_err(|e| Failure::syscall("stat", e))?
        .ok_or_else(|| Failure::Vanished {
            operation: "stat",
            path: path.clone(),
        })?;
    let (uid, gid) = (Some(attrs.uid), Some(attrs.gid));

    ctx.apply(trigger, "chown", chown(path, uid, gid))?;
    checker.assert_stable(path, "chown")?;

    ctx.apply(trigger, "lchown", lchown(path, uid, gid))?;
    checker.assert_stable(path, "lchown")?;
    checker.assert_stable_link(path, "lchown")?;

    {
        let file = open_read(path)?;
        ctx.apply(trigger, "fchown", fchown(&file, uid, gid))?;
        checker.assert_stable_open(&file, "fchown")?;
    }
    checker.assert_stable(path, "fchown")?;

    Ok(())
}
