use std::fs;

use crate::{
    context::Context,
    error::Failure,
    fixtures::{self, RENAME_TARGET},
    outcome::Step,
    trigger::Trigger,
};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Renames the fixture within the base directory. The identity must follow the object to its
/// new name and the old name must stop resolving.
pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::Rename;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let old_path = &fixture.path;
    let new_path = ctx.path(RENAME_TARGET);
    let checker = &fixture.checker;

    fixtures::remove_stale(&new_path).map_err(|e| Failure::syscall("unlink", e))?;

    ctx.apply(trigger, "rename", fs::rename(old_path, &new_path))?;
    checker.assert_stable(&new_path, "rename")?;
    checker.assert_stable_link(&new_path, "rename")?;
    checker.assert_absent(old_path, "rename")?;

    fs::remove_file(&new_path).map_err(|e| Failure::syscall("unlink", e))?;

    Ok(())
}
