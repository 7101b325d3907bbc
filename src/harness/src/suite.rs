//! Sequential driver for the scenario catalog.
//!
//! Scenarios run one at a time in catalog order. A skipped scenario does not stop the run; the
//! first failed one does, and its failure is the result of the whole run.

use std::io;

use log::{info, warn};

use crate::{
    config::SuiteConfig,
    context::Context,
    enumeration,
    error::Failure,
    outcome::{Outcome, Step},
    report::Reporter,
    scenarios,
    trigger::Trigger,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A single named check the suite can run.
pub trait Scenario {
    /// Name used in status lines.
    fn name(&self) -> &str;

    /// Runs the check to completion.
    fn run(&self, ctx: &Context) -> Step;
}

/// Copy-up identity scenario for one trigger family.
#[derive(Debug, Clone, Copy)]
pub struct CopyUpScenario(pub Trigger);

/// The `getdents64` enumeration check.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerationCheck;

/// An ordered list of scenarios bound to one context.
pub struct Suite {
    ctx: Context,
    scenarios: Vec<Box<dyn Scenario>>,
}

/// Terminal state of one scenario in a run.
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub outcome: Outcome,
}

/// Results of a suite run, in the order the scenarios ran.
///
/// Scenarios after the first failure are not run and do not appear here.
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub results: Vec<ScenarioResult>,

    /// Number of scenarios the suite was built with.
    pub planned: usize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Suite {
    /// Creates a suite running `scenarios` in the given order.
    pub fn new(ctx: Context, scenarios: Vec<Box<dyn Scenario>>) -> Self {
        Self { ctx, scenarios }
    }

    /// Builds the standard catalog for `config`: the selected copy-up scenarios in catalog order,
    /// followed by the enumeration check when enabled.
    pub fn standard(config: SuiteConfig) -> io::Result<Self> {
        let mut scenarios: Vec<Box<dyn Scenario>> = config
            .selected_triggers()
            .into_iter()
            .map(|t| Box::new(CopyUpScenario(t)) as Box<dyn Scenario>)
            .collect();

        if config.enumeration {
            scenarios.push(Box::new(EnumerationCheck));
        }

        Ok(Self::new(Context::new(config)?, scenarios))
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Names of the scenarios in run order.
    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name()).collect()
    }

    /// Runs the scenarios, stopping after the first failure.
    pub fn run(&self, reporter: &mut dyn Reporter) -> SuiteReport {
        info!(
            "running {} scenarios against {} ({})",
            self.scenarios.len(),
            self.ctx.base().display(),
            self.ctx.environment().describe()
        );

        let mut report = SuiteReport {
            results: Vec::with_capacity(self.scenarios.len()),
            planned: self.scenarios.len(),
        };

        for scenario in &self.scenarios {
            reporter.scenario_started(scenario.name());
            let outcome = Outcome::from(scenario.run(&self.ctx));

            match &outcome {
                Outcome::Passed => info!("{}: passed", scenario.name()),
                Outcome::Skipped(reason) => warn!("{}: skipped: {}", scenario.name(), reason),
                Outcome::Failed(failure) => warn!("{}: failed: {}", scenario.name(), failure),
            }
            reporter.scenario_finished(scenario.name(), &outcome);

            let stop = outcome.is_failed();
            report.results.push(ScenarioResult {
                name: scenario.name().to_string(),
                outcome,
            });

            if stop {
                warn!(
                    "stopping after {}; {} scenarios not run",
                    scenario.name(),
                    report.not_run()
                );
                break;
            }
        }

        reporter.suite_finished(&report);
        report
    }
}

impl SuiteReport {
    /// True when no scenario failed.
    pub fn success(&self) -> bool {
        self.failure().is_none()
    }

    /// Process exit status: 0 when every scenario passed or was skipped, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    /// The failure that stopped the run, with the name of its scenario.
    pub fn failure(&self) -> Option<(&str, &Failure)> {
        self.results.iter().find_map(|r| match &r.outcome {
            Outcome::Failed(failure) => Some((r.name.as_str(), failure)),
            _ => None,
        })
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_passed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_failed()).count()
    }

    /// Scenarios left unrun because an earlier one failed.
    pub fn not_run(&self) -> usize {
        self.planned.saturating_sub(self.results.len())
    }

    /// Outcome of the scenario called `name`, if it ran.
    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Scenario for CopyUpScenario {
    fn name(&self) -> &str {
        self.0.scenario_name()
    }

    fn run(&self, ctx: &Context) -> Step {
        scenarios::run(self.0, ctx)
    }
}

impl Scenario for EnumerationCheck {
    fn name(&self) -> &str {
        enumeration::SCENARIO_NAME
    }

    fn run(&self, ctx: &Context) -> Step {
        enumeration::run(ctx)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use tempfile::TempDir;

    use super::*;
    use crate::outcome::Interrupt;

    enum Behavior {
        Pass,
        Skip,
        Fail,
    }

    struct Stub {
        name: &'static str,
        behavior: Behavior,
        ran: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Scenario for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, _ctx: &Context) -> Step {
            self.ran.borrow_mut().push(self.name);
            match self.behavior {
                Behavior::Pass => Ok(()),
                Behavior::Skip => Err(Interrupt::Skip("stubbed".into())),
                Behavior::Fail => Err(Failure::syscall(
                    "stub",
                    io::Error::from_raw_os_error(libc::EIO),
                )
                .into()),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        finished: usize,
        summaries: usize,
    }

    impl Reporter for Recorder {
        fn scenario_started(&mut self, name: &str) {
            self.started.push(name.to_string());
        }

        fn scenario_finished(&mut self, _name: &str, _outcome: &Outcome) {
            self.finished += 1;
        }

        fn suite_finished(&mut self, _report: &SuiteReport) {
            self.summaries += 1;
        }
    }

    fn stub_suite(
        dir: &TempDir,
        plan: Vec<(&'static str, Behavior)>,
    ) -> io::Result<(Suite, Rc<RefCell<Vec<&'static str>>>)> {
        let ran = Rc::new(RefCell::new(Vec::new()));
        let scenarios = plan
            .into_iter()
            .map(|(name, behavior)| {
                Box::new(Stub {
                    name,
                    behavior,
                    ran: ran.clone(),
                }) as Box<dyn Scenario>
            })
            .collect();

        let ctx = Context::new(SuiteConfig::new(dir.path()))?;
        Ok((Suite::new(ctx, scenarios), ran))
    }

    #[test]
    fn test_skips_do_not_stop_the_run() -> io::Result<()> {
        let dir = TempDir::new()?;
        let (suite, ran) = stub_suite(
            &dir,
            vec![
                ("first", Behavior::Skip),
                ("second", Behavior::Pass),
                ("third", Behavior::Skip),
            ],
        )?;

        let mut recorder = Recorder::default();
        let report = suite.run(&mut recorder);

        assert_eq!(*ran.borrow(), vec!["first", "second", "third"]);
        assert!(report.success());
        assert_eq!(report.exit_code(), 0);
        assert_eq!((report.passed(), report.skipped()), (1, 2));
        assert_eq!(recorder.started, vec!["first", "second", "third"]);
        assert_eq!(recorder.finished, 3);
        assert_eq!(recorder.summaries, 1);

        Ok(())
    }

    #[test]
    fn test_first_failure_stops_the_run() -> io::Result<()> {
        let dir = TempDir::new()?;
        let (suite, ran) = stub_suite(
            &dir,
            vec![
                ("first", Behavior::Pass),
                ("second", Behavior::Fail),
                ("third", Behavior::Pass),
                ("fourth", Behavior::Fail),
            ],
        )?;

        let report = suite.run(&mut Recorder::default());

        assert_eq!(*ran.borrow(), vec!["first", "second"]);
        assert!(!report.success());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.not_run(), 2);
        assert_eq!(report.failure().map(|(name, _)| name), Some("second"));
        assert!(report.outcome("third").is_none());

        Ok(())
    }

    #[test]
    fn test_standard_catalog_order() -> io::Result<()> {
        let dir = TempDir::new()?;

        let suite = Suite::standard(SuiteConfig::new(dir.path()))?;
        assert_eq!(
            suite.scenario_names(),
            vec![
                "copyup-write",
                "copyup-truncate",
                "copyup-chmod",
                "copyup-chown",
                "copyup-rename",
                "copyup-link",
                "copyup-utimes",
                "copyup-xattr",
                "copyup-fallocate",
                "getdents64",
            ]
        );

        let filtered = Suite::standard(
            SuiteConfig::new(dir.path())
                .only([Trigger::Rename, Trigger::ContentWrite])
                .enumeration(false),
        )?;
        assert_eq!(
            filtered.scenario_names(),
            vec!["copyup-write", "copyup-rename"]
        );

        Ok(())
    }

    #[test]
    fn test_empty_base_skips_everything() -> io::Result<()> {
        let dir = TempDir::new()?;

        let report = Suite::standard(SuiteConfig::new(dir.path()))?.run(&mut Recorder::default());
        assert_eq!(report.results.len(), 10);
        assert_eq!(report.skipped(), 10);
        assert!(report.success());

        Ok(())
    }
}
