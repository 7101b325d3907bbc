use std::{fs, os::unix::fs::PermissionsExt};

use crate::{context::Context, fixtures, outcome::Step, trigger::Trigger};

use super::open_read;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::PermissionChange;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let path = &fixture.path;
    let checker = &fixture.checker;

    ctx.apply(
        trigger,
        "chmod",
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)),
    )?;
    checker.assert_all(path, "chmod")?;

    // fchmod only needs ownership, not a writable descriptor
    {
        let file = open_read(path)?;
        ctx.apply(
            trigger,
            "fchmod",
            file.set_permissions(fs::Permissions::from_mode(0o700)),
        )?;
        checker.assert_stable_open(&file, "fchmod")?;
    }
    checker.assert_stable(path, "fchmod")?;

    Ok(())
}
