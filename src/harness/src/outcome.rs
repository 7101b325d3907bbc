use std::fmt;

use crate::error::Failure;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Early exit from a scenario.
///
/// Carried through `?` so a scenario body reads as straight-line code: an environment limitation
/// ends the scenario as skipped, an invariant violation ends it as failed.
#[derive(Debug)]
pub enum Interrupt {
    /// The environment cannot exercise this scenario (missing fixture, unsupported call,
    /// missing privilege).
    Skip(String),

    /// A hard failure.
    Fail(Failure),
}

/// The result of one step (or of a whole scenario body).
pub type Step<T = ()> = Result<T, Interrupt>;

/// Terminal state of a scenario.
#[derive(Debug)]
pub enum Outcome {
    Passed,
    Skipped(String),
    Failed(Failure),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<Failure> for Interrupt {
    fn from(failure: Failure) -> Self {
        Interrupt::Fail(failure)
    }
}

impl From<Step> for Outcome {
    fn from(step: Step) -> Self {
        match step {
            Ok(()) => Outcome::Passed,
            Err(Interrupt::Skip(reason)) => Outcome::Skipped(reason),
            Err(Interrupt::Fail(failure)) => Outcome::Failed(failure),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            Outcome::Failed(failure) => write!(f, "failed: {}", failure),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn body(skip: bool, fail: bool) -> Step {
        if skip {
            return Err(Interrupt::Skip("no fixture".into()));
        }
        if fail {
            Err(Failure::syscall(
                "chmod",
                io::Error::from_raw_os_error(libc::EIO),
            ))?;
        }
        Ok(())
    }

    #[test]
    fn test_step_maps_to_outcome() {
        assert!(Outcome::from(body(false, false)).is_passed());

        let skipped = Outcome::from(body(true, false));
        assert!(skipped.is_skipped());
        assert_eq!(skipped.to_string(), "skipped: no fixture");

        let failed = Outcome::from(body(false, true));
        assert!(failed.is_failed());
        assert!(failed.to_string().starts_with("failed: chmod failed:"));
    }
}
