use std::{fmt, io, str::FromStr};

use nix::errno::Errno;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The catalog of operations that force a copy-up of a base-layer-only file.
///
/// Declaration order is the order the suite runs them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// `write` / `pwrite`
    ContentWrite,

    /// `truncate` / `ftruncate`
    SizeChange,

    /// `chmod` / `fchmod`
    PermissionChange,

    /// `chown` / `lchown` / `fchown`
    OwnershipChange,

    /// `rename`
    Rename,

    /// `link` / `unlink`
    LinkCreation,

    /// `utimes` / `utimensat` / `futimens`
    TimestampChange,

    /// `setxattr` / `lsetxattr` / `fsetxattr` / `removexattr` / `fremovexattr`
    AttributeSet,

    /// `fallocate`
    SpacePreallocate,
}

/// What happened when a mutating call was applied.
#[derive(Debug)]
pub enum TriggerResult {
    /// The call succeeded.
    Applied,

    /// The filesystem or kernel does not implement the call.
    Unsupported(Errno),

    /// The environment lacks the privilege the call needs.
    Denied(Errno),

    /// Any other error.
    Failed(io::Error),
}

/// Which errors a trigger tolerates as environment limitations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    /// Whether `EPERM` counts as [`TriggerResult::Denied`] rather than a failure.
    pub permit_denied: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown trigger {0:?} (expected one of: write, truncate, chmod, chown, rename, link, utimes, xattr, fallocate)")]
pub struct UnknownTrigger(pub String);

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Trigger {
    /// Every trigger, in run order.
    pub const ALL: [Trigger; 9] = [
        Trigger::ContentWrite,
        Trigger::SizeChange,
        Trigger::PermissionChange,
        Trigger::OwnershipChange,
        Trigger::Rename,
        Trigger::LinkCreation,
        Trigger::TimestampChange,
        Trigger::AttributeSet,
        Trigger::SpacePreallocate,
    ];

    /// Short name, as accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::ContentWrite => "write",
            Trigger::SizeChange => "truncate",
            Trigger::PermissionChange => "chmod",
            Trigger::OwnershipChange => "chown",
            Trigger::Rename => "rename",
            Trigger::LinkCreation => "link",
            Trigger::TimestampChange => "utimes",
            Trigger::AttributeSet => "xattr",
            Trigger::SpacePreallocate => "fallocate",
        }
    }

    /// Name of the base-layer fixture this trigger mutates.
    pub fn fixture(&self) -> &'static str {
        match self {
            Trigger::ContentWrite => "copyup_write_test.txt",
            Trigger::SizeChange => "copyup_truncate_test.txt",
            Trigger::PermissionChange => "copyup_chmod_test.txt",
            Trigger::OwnershipChange => "copyup_chown_test.txt",
            Trigger::Rename => "copyup_rename_test.txt",
            Trigger::LinkCreation => "copyup_link_test.txt",
            Trigger::TimestampChange => "copyup_utimes_test.txt",
            Trigger::AttributeSet => "copyup_xattr_test.txt",
            Trigger::SpacePreallocate => "copyup_fallocate_test.txt",
        }
    }

    /// Name of the scenario exercising this trigger.
    pub fn scenario_name(&self) -> &'static str {
        match self {
            Trigger::ContentWrite => "copyup-write",
            Trigger::SizeChange => "copyup-truncate",
            Trigger::PermissionChange => "copyup-chmod",
            Trigger::OwnershipChange => "copyup-chown",
            Trigger::Rename => "copyup-rename",
            Trigger::LinkCreation => "copyup-link",
            Trigger::TimestampChange => "copyup-utimes",
            Trigger::AttributeSet => "copyup-xattr",
            Trigger::SpacePreallocate => "copyup-fallocate",
        }
    }

    /// Ownership and attribute changes may be refused for lack of privilege; everything else
    /// treats `EPERM` as a failure.
    pub fn tolerance(&self) -> Tolerance {
        match self {
            Trigger::OwnershipChange | Trigger::AttributeSet => Tolerance::PRIVILEGED,
            _ => Tolerance::STRICT,
        }
    }
}

impl Tolerance {
    /// Only "not implemented" and "not supported" are tolerated.
    pub const STRICT: Tolerance = Tolerance {
        permit_denied: false,
    };

    /// "Not permitted" is tolerated as well.
    pub const PRIVILEGED: Tolerance = Tolerance {
        permit_denied: true,
    };

    /// Tags the result of one mutating call.
    pub fn classify(&self, res: io::Result<()>) -> TriggerResult {
        let err = match res {
            Ok(()) => return TriggerResult::Applied,
            Err(err) => err,
        };

        let Some(raw) = err.raw_os_error() else {
            return TriggerResult::Failed(err);
        };

        // ENOTSUP and EOPNOTSUPP share a value on Linux.
        match Errno::from_raw(raw) {
            errno @ (Errno::ENOSYS | Errno::EOPNOTSUPP) => TriggerResult::Unsupported(errno),
            errno @ Errno::EPERM if self.permit_denied => TriggerResult::Denied(errno),
            _ => TriggerResult::Failed(err),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trigger {
    type Err = UnknownTrigger;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trigger::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTrigger(s.to_string()))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn os_err(errno: i32) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(errno))
    }

    #[test]
    fn test_classify_applied() {
        assert!(matches!(
            Tolerance::STRICT.classify(Ok(())),
            TriggerResult::Applied
        ));
    }

    #[test]
    fn test_classify_unsupported_for_every_tolerance() {
        for tolerance in [Tolerance::STRICT, Tolerance::PRIVILEGED] {
            assert!(matches!(
                tolerance.classify(os_err(libc::ENOSYS)),
                TriggerResult::Unsupported(Errno::ENOSYS)
            ));
            assert!(matches!(
                tolerance.classify(os_err(libc::ENOTSUP)),
                TriggerResult::Unsupported(_)
            ));
            assert!(matches!(
                tolerance.classify(os_err(libc::EOPNOTSUPP)),
                TriggerResult::Unsupported(_)
            ));
        }
    }

    #[test]
    fn test_classify_eperm_depends_on_tolerance() {
        assert!(matches!(
            Tolerance::PRIVILEGED.classify(os_err(libc::EPERM)),
            TriggerResult::Denied(Errno::EPERM)
        ));
        assert!(matches!(
            Tolerance::STRICT.classify(os_err(libc::EPERM)),
            TriggerResult::Failed(_)
        ));
    }

    #[test]
    fn test_classify_other_errors_fail() {
        for errno in [libc::EACCES, libc::ENOENT, libc::EIO, libc::EROFS] {
            assert!(matches!(
                Tolerance::PRIVILEGED.classify(os_err(errno)),
                TriggerResult::Failed(_)
            ));
        }

        let custom = Err(io::Error::new(io::ErrorKind::WriteZero, "short write"));
        assert!(matches!(
            Tolerance::PRIVILEGED.classify(custom),
            TriggerResult::Failed(_)
        ));
    }

    #[test]
    fn test_trigger_tolerances() {
        assert_eq!(Trigger::OwnershipChange.tolerance(), Tolerance::PRIVILEGED);
        assert_eq!(Trigger::AttributeSet.tolerance(), Tolerance::PRIVILEGED);
        assert_eq!(Trigger::SpacePreallocate.tolerance(), Tolerance::STRICT);
        assert_eq!(Trigger::LinkCreation.tolerance(), Tolerance::STRICT);
    }

    #[test]
    fn test_trigger_names_round_trip_and_are_unique() {
        let mut fixtures = HashSet::new();
        for trigger in Trigger::ALL {
            assert_eq!(trigger.name().parse::<Trigger>(), Ok(trigger));
            assert!(fixtures.insert(trigger.fixture()));
            assert!(trigger.fixture().starts_with("copyup_"));
        }

        assert_eq!(
            "mknod".parse::<Trigger>(),
            Err(UnknownTrigger("mknod".to_string()))
        );
    }
}
