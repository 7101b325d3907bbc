use std::{
    fs, io,
    path::{Path, PathBuf},
};

use caps::{has_cap, CapSet, Capability};
use log::{debug, warn};

use crate::{
    config::SuiteConfig,
    error::Failure,
    outcome::{Interrupt, Step},
    trigger::{Trigger, TriggerResult},
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Privileges of the running process that decide whether ownership and attribute changes can
/// succeed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// Effective UID of the process
    pub euid: libc::uid_t,

    /// Whether CAP_CHOWN is in the effective set
    pub cap_chown: bool,

    /// Whether CAP_FOWNER is in the effective set
    pub cap_fowner: bool,
}

/// Everything a scenario needs: the resolved configuration and the environment it runs in.
#[derive(Debug, Clone)]
pub struct Context {
    config: SuiteConfig,
    environment: Environment,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Environment {
    /// Inspects the current process.
    pub fn probe() -> Self {
        Self {
            // SAFETY: This syscall is always safe to call and always succeeds.
            euid: unsafe { libc::geteuid() },
            cap_chown: has_cap(None, CapSet::Effective, Capability::CAP_CHOWN).unwrap_or_default(),
            cap_fowner: has_cap(None, CapSet::Effective, Capability::CAP_FOWNER)
                .unwrap_or_default(),
        }
    }

    /// One-line summary appended to "not permitted" skip reasons.
    pub fn describe(&self) -> String {
        format!(
            "euid {}, CAP_CHOWN {}, CAP_FOWNER {}",
            self.euid,
            if self.cap_chown { "present" } else { "absent" },
            if self.cap_fowner { "present" } else { "absent" },
        )
    }
}

impl Context {
    /// Resolves `config` into a context.
    ///
    /// The base path is canonicalized up front so that every fixture path is absolute and no
    /// scenario depends on the working directory.
    pub fn new(mut config: SuiteConfig) -> io::Result<Self> {
        config.base = fs::canonicalize(&config.base)?;
        if let Some(dir) = config.enumeration_dir.take() {
            config.enumeration_dir = Some(fs::canonicalize(dir)?);
        }

        let environment = Environment::probe();
        debug!("environment: {}", environment.describe());

        Ok(Self {
            config,
            environment,
        })
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The directory under test.
    pub fn base(&self) -> &Path {
        &self.config.base
    }

    /// Absolute path of `name` directly under the base directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.config.base.join(name)
    }

    /// Classifies the result of one mutating call made on behalf of `trigger`.
    ///
    /// Unsupported and denied calls end the scenario as skipped; any other error ends it as
    /// failed.
    pub fn apply(&self, trigger: Trigger, operation: &'static str, res: io::Result<()>) -> Step {
        match trigger.tolerance().classify(res) {
            TriggerResult::Applied => {
                debug!("{}: {} applied", trigger.scenario_name(), operation);
                Ok(())
            }
            TriggerResult::Unsupported(errno) => {
                warn!("{}: {} unsupported ({})", trigger.scenario_name(), operation, errno);
                Err(Interrupt::Skip(format!("{} not supported ({})", operation, errno)))
            }
            TriggerResult::Denied(errno) => {
                warn!("{}: {} denied ({})", trigger.scenario_name(), operation, errno);
                Err(Interrupt::Skip(format!(
                    "{} not permitted ({}; {})",
                    operation,
                    errno,
                    self.environment.describe()
                )))
            }
            TriggerResult::Failed(source) => Err(Failure::syscall(operation, source).into()),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
