use std::io::{self, Write};

use log::error;

use crate::{outcome::Outcome, suite::SuiteReport};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Receives progress from a suite run.
pub trait Reporter {
    fn scenario_started(&mut self, name: &str);

    fn scenario_finished(&mut self, name: &str, outcome: &Outcome);

    fn suite_finished(&mut self, report: &SuiteReport);
}

/// Writes one status line per scenario.
///
/// Pass and skip lines plus the final summary go to `out`. Failure diagnostics go to `err`.
pub struct ConsoleReporter<O: Write, E: Write> {
    out: O,
    err: E,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<O: Write, E: Write> ConsoleReporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl ConsoleReporter<io::Stdout, io::Stderr> {
    /// A reporter bound to the process's standard streams.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<O: Write, E: Write> Reporter for ConsoleReporter<O, E> {
    fn scenario_started(&mut self, _name: &str) {}

    fn scenario_finished(&mut self, name: &str, outcome: &Outcome) {
        let res = match outcome {
            Outcome::Passed => writeln!(self.out, "PASS {}", name),
            Outcome::Skipped(reason) => writeln!(self.out, "SKIP {}: {}", name, reason),
            Outcome::Failed(failure) => writeln!(self.err, "FAIL {}: {}", name, failure),
        };

        if let Err(e) = res {
            error!("failed to write status of {}: {}", name, e);
        }
    }

    fn suite_finished(&mut self, report: &SuiteReport) {
        let mut summary = format!(
            "{} passed, {} skipped, {} failed",
            report.passed(),
            report.skipped(),
            report.failed()
        );
        if report.not_run() > 0 {
            summary.push_str(&format!(", {} not run", report.not_run()));
        }

        if let Err(e) = writeln!(self.out, "{}", summary).and_then(|_| self.out.flush()) {
            error!("failed to write summary: {}", e);
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
