use std::{fs, io};

use ovlcheck_harness::{
    fixtures::{self, FIXTURE_PAYLOAD, HARDLINK, HARDLINK2, RENAME_TARGET},
    ConsoleReporter, Outcome, Suite, SuiteConfig, SuiteReport, Trigger,
};
use tempfile::TempDir;

fn run(config: SuiteConfig) -> io::Result<SuiteReport> {
    let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new());
    Ok(Suite::standard(config)?.run(&mut reporter))
}

fn seeded() -> io::Result<TempDir> {
    let dir = TempDir::new()?;
    fixtures::seed(dir.path())?;
    Ok(dir)
}

#[test]
fn test_full_suite_on_seeded_directory() -> io::Result<()> {
    let dir = seeded()?;

    let report = run(SuiteConfig::new(dir.path()))?;

    // A plain filesystem keeps identities stable, so nothing may fail. Ownership, attribute and
    // preallocation calls may be refused by the host and show up as skips.
    for result in &report.results {
        assert!(
            !result.outcome.is_failed(),
            "{}: {}",
            result.name,
            result.outcome
        );
    }
    assert_eq!(report.results.len(), 10);
    assert_eq!(report.exit_code(), 0);

    for always in ["copyup-write", "copyup-truncate", "copyup-chmod", "copyup-rename"] {
        assert!(
            matches!(report.outcome(always), Some(Outcome::Passed)),
            "{} did not pass",
            always
        );
    }
    assert!(matches!(report.outcome("getdents64"), Some(Outcome::Passed)));

    Ok(())
}

#[test]
fn test_write_and_truncate_leave_expected_content() -> io::Result<()> {
    let dir = seeded()?;

    let report = run(
        SuiteConfig::new(dir.path())
            .only([Trigger::ContentWrite, Trigger::SizeChange])
            .enumeration(false),
    )?;
    assert_eq!(report.passed(), 2);

    let mut expected = FIXTURE_PAYLOAD.to_vec();
    expected.extend_from_slice(b" appended data");
    expected[..4].copy_from_slice(b"COPY");
    assert_eq!(fs::read(dir.path().join("copyup_write_test.txt"))?, expected);

    assert_eq!(
        fs::read(dir.path().join("copyup_truncate_test.txt"))?,
        &FIXTURE_PAYLOAD[..5]
    );

    Ok(())
}

#[test]
fn test_rename_and_link_clean_up_after_themselves() -> io::Result<()> {
    let dir = seeded()?;
    fs::write(dir.path().join(HARDLINK), b"stale")?;

    let report = run(
        SuiteConfig::new(dir.path())
            .only([Trigger::Rename, Trigger::LinkCreation])
            .enumeration(false),
    )?;
    assert_eq!(report.passed(), 2, "{:?}", report);

    assert!(!dir.path().join("copyup_rename_test.txt").exists());
    assert!(!dir.path().join(RENAME_TARGET).exists());
    assert!(!dir.path().join(HARDLINK).exists());
    assert!(!dir.path().join(HARDLINK2).exists());
    assert_eq!(
        fs::metadata(dir.path().join("copyup_link_test.txt"))?.len(),
        FIXTURE_PAYLOAD.len() as u64
    );

    Ok(())
}

#[test]
fn test_rerun_after_rename_skips_missing_fixture() -> io::Result<()> {
    let dir = seeded()?;
    let config = SuiteConfig::new(dir.path())
        .only([Trigger::Rename])
        .enumeration(false);

    assert_eq!(run(config.clone())?.passed(), 1);

    let report = run(config)?;
    match report.outcome("copyup-rename") {
        Some(Outcome::Skipped(reason)) => {
            assert_eq!(reason, "copyup_rename_test.txt not in base layer")
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(report.success());

    Ok(())
}

#[test]
fn test_empty_directory_skips_every_scenario() -> io::Result<()> {
    let dir = TempDir::new()?;

    let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new());
    let report = Suite::standard(SuiteConfig::new(dir.path()))?.run(&mut reporter);

    assert_eq!(report.skipped(), 10);
    assert_eq!(report.exit_code(), 0);

    let (out, err) = reporter.into_inner();
    let out = String::from_utf8_lossy(&out);
    assert!(out.contains("SKIP copyup-write: copyup_write_test.txt not in base layer"));
    assert!(out.ends_with("0 passed, 10 skipped, 0 failed\n"));
    assert!(err.is_empty());

    Ok(())
}

#[test]
fn test_missing_base_is_a_setup_error() -> io::Result<()> {
    let dir = TempDir::new()?;

    let err = Suite::standard(SuiteConfig::new(dir.path().join("missing")))
        .err()
        .expect("missing base accepted");
    assert_eq!(err.kind(), io::ErrorKind::NotFound);

    Ok(())
}
