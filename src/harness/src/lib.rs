//! Copy-up identity conformance scenarios for layered filesystems.
//!
//! Every scenario starts from a fixture that lives only in the lower layer, applies one family of
//! mutating calls that forces a copy-up, and asserts that the file's identity (its inode number)
//! is the same through every access path before and after. A separate check drains a directory
//! through the raw `getdents64` primitive and probes its error contract.

pub mod checker;
pub mod config;
pub mod context;
pub mod enumeration;
pub mod error;
pub mod fixtures;
pub mod outcome;
pub mod report;
pub mod scenarios;
pub mod suite;
pub mod trigger;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use checker::Checker;
pub use config::SuiteConfig;
pub use context::{Context, Environment};
pub use error::Failure;
pub use outcome::{Interrupt, Outcome, Step};
pub use report::{ConsoleReporter, Reporter};
pub use suite::{CopyUpScenario, EnumerationCheck, Scenario, ScenarioResult, Suite, SuiteReport};
pub use trigger::{Tolerance, Trigger, TriggerResult, UnknownTrigger};
