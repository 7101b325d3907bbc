use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    os::unix::fs::{OpenOptionsExt, PermissionsExt},
    path::{Path, PathBuf},
};

use log::{debug, info};
use sys::identity;

use crate::{
    checker::Checker,
    context::Context,
    error::Failure,
    outcome::{Interrupt, Step},
    trigger::Trigger,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Regular file the enumeration check expects to find.
pub const ENUMERATION_ENTRY: &str = "test.txt";

/// Content of every seeded fixture. Longer than the 10-byte truncate target.
pub const FIXTURE_PAYLOAD: &[u8] = b"copy-up fixture payload\n";

/// Mode of every seeded fixture, set explicitly so the process umask does not matter.
pub const FIXTURE_MODE: u32 = 0o644;

/// Where the rename scenario moves its fixture.
pub const RENAME_TARGET: &str = "copyup_rename_test_renamed.txt";

/// First hard link created by the link scenario.
pub const HARDLINK: &str = "copyup_link_test_hardlink.txt";

/// Second hard link created by the link scenario.
pub const HARDLINK2: &str = "copyup_link_test_hardlink2.txt";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A fixture that exists in the base directory, with its identity snapshot.
#[derive(Debug)]
pub struct Fixture {
    /// Absolute path of the fixture
    pub path: PathBuf,

    /// Snapshot of the fixture's identity before any trigger ran
    pub checker: Checker,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Locates the fixture for `trigger` and snapshots its identity.
///
/// A missing fixture skips the scenario. The identity is queried twice: an untouched path must
/// report the same value both times.
pub fn resolve(ctx: &Context, trigger: Trigger) -> Step<Fixture> {
    let path = ctx.path(trigger.fixture());

    let Some(expected) = identity::identity_of(&path).map_err(|e| Failure::syscall("stat", e))?
    else {
        info!(
            "{}: {} not in base layer",
            trigger.scenario_name(),
            trigger.fixture()
        );
        return Err(Interrupt::Skip(format!(
            "{} not in base layer",
            trigger.fixture()
        )));
    };

    let checker = Checker::new(expected);
    checker.assert_stable(&path, "repeated stat")?;
    debug!("{}: {} is {}", trigger.scenario_name(), path.display(), expected);

    Ok(Fixture { path, checker })
}

/// Removes `path` if it exists. Used for artefacts a previous run may have left behind.
pub fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        res => res,
    }
}

/// Populates `dir` with every fixture the suite looks for.
///
/// Meant to run against the base layer before the filesystem under test is mounted. Existing
/// fixtures are rewritten, and artefacts of earlier rename/link runs are removed. Returns the
/// paths written.
pub fn seed(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(Trigger::ALL.len() + 1);

    let names = Trigger::ALL
        .iter()
        .map(|t| t.fixture())
        .chain(std::iter::once(ENUMERATION_ENTRY));

    for name in names {
        let path = dir.join(name);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(FIXTURE_MODE)
            .open(&path)?;
        file.write_all(FIXTURE_PAYLOAD)?;
        file.set_permissions(fs::Permissions::from_mode(FIXTURE_MODE))?;

        debug!("seeded {}", path.display());
        written.push(path);
    }

    for stale in [RENAME_TARGET, HARDLINK, HARDLINK2] {
        remove_stale(&dir.join(stale))?;
    }

    info!("seeded {} fixtures in {}", written.len(), dir.display());
    Ok(written)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
