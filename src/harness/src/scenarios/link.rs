use std::fs;

use crate::{
    context::Context,
    error::Failure,
    fixtures::{self, HARDLINK, HARDLINK2},
    outcome::Step,
    trigger::Trigger,
};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates two hard links to the fixture, removes the first, and checks every surviving name
/// after each step.
pub(super) fn run(ctx: &Context) -> Step {
    let trigger = Trigger::LinkCreation;
    let fixture = fixtures::resolve(ctx, trigger)?;
    let orig = &fixture.path;
    let link1 = ctx.path(HARDLINK);
    let link2 = ctx.path(HARDLINK2);
    let checker = &fixture.checker;

    for stale in [&link1, &link2] {
        fixtures::remove_stale(stale).map_err(|e| Failure::syscall("unlink", e))?;
    }

    // The first link triggers the copy-up
    ctx.apply(trigger, "link", fs::hard_link(orig, &link1))?;
    checker.assert_stable(orig, "link (original)")?;
    checker.assert_stable(&link1, "link (new link)")?;
    checker.assert_link_count(orig, 2, "link")?;

    ctx.apply(trigger, "link", fs::hard_link(orig, &link2))?;
    checker.assert_stable(&link2, "link (second link)")?;
    checker.assert_stable(orig, "link (after second link)")?;
    checker.assert_link_count(orig, 2, "second link")?;

    checker.assert_stable_link(orig, "link (lstat original)")?;
    checker.assert_stable_link(&link1, "link (lstat new link)")?;

    ctx.apply(trigger, "unlink", fs::remove_file(&link1))?;
    checker.assert_absent(&link1, "unlink")?;
    checker.assert_stable(orig, "unlink (original)")?;
    checker.assert_stable(&link2, "unlink (remaining link)")?;
    checker.assert_link_count(orig, 2, "unlink")?;

    fs::remove_file(&link2).map_err(|e| Failure::syscall("unlink", e))?;

    Ok(())
}
