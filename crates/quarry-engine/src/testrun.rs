//! Running tests targets in sandboxes and classifying what happened.
//!
//! Each tests target runs as one sandboxed shell that sources the
//! target's test files in order and prints a completion marker at the
//! very end. A suite that exits zero without printing the marker was
//! terminated mid-run (for example by a fixture calling `exit 0` during
//! setup) and is reported as a failure, never as a pass.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use quarry_address::Address;
use quarry_buildfile::TargetKind;
use quarry_source::{Fileset, Filespec, Snapshot};

use crate::error::EngineError;
use crate::process::{self, ProcessRequest, ProcessResult};
use crate::resolve::DependencyGraph;
use crate::workspace::{Target, Workspace};

/// Printed by the driver after the last test file has run to completion.
pub const COMPLETION_MARKER: &str = "quarry: tests complete";

/// Options controlling a test run.
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    /// Overrides every target's declared timeout, still clamped to the
    /// configured maximum.
    pub timeout_override: Option<u64>,
    /// Targets carrying any of these tags are skipped.
    pub skip_tags: Vec<String>,
}

/// What one tests target did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    /// The suite exited non-zero, or died on a signal (`None`).
    Failed { exit_code: Option<i32> },
    /// The suite exited zero before running to completion.
    EarlyExit,
    /// The suite was killed after `limit` seconds.
    TimedOut { limit: u64 },
    /// The target carried a skip tag.
    Skipped { tag: String },
}

impl TestOutcome {
    /// Whether this outcome counts against the run. Skips do not.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed { .. } | Self::EarlyExit | Self::TimedOut { .. }
        )
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::Failed {
                exit_code: Some(code),
            } => write!(f, "FAILED (exit {code})"),
            Self::Failed { exit_code: None } => f.write_str("FAILED (killed)"),
            Self::EarlyExit => f.write_str("FAILED (suite exited before completing)"),
            Self::TimedOut { limit } => write!(f, "TIMEOUT (after {limit}s)"),
            Self::Skipped { tag } => write!(f, "SKIPPED (tag `{tag}`)"),
        }
    }
}

/// The full record of one tests target's run.
#[derive(Debug)]
pub struct TestReport {
    pub address: Address,
    pub outcome: TestOutcome,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

/// Run every tests target among `roots`, in address order. Non-tests
/// targets are ignored, so callers can pass a spec's matches directly.
///
/// # Errors
/// Returns an error if sources cannot be expanded or a sandbox cannot be
/// prepared. Test failures are reported in the outcome, not as errors.
pub fn run_tests(
    workspace: &Workspace,
    graph: &DependencyGraph,
    roots: &[Address],
    options: &TestOptions,
) -> Result<Vec<TestReport>, EngineError> {
    let mut reports = Vec::new();
    for address in roots {
        let target = workspace.get(address).ok_or_else(|| EngineError::UnknownTarget {
            address: address.to_string(),
        })?;
        if target.kind() != TargetKind::Tests {
            continue;
        }
        if let Some(tag) = options.skip_tags.iter().find(|t| target.decl.has_tag(t)) {
            reports.push(TestReport {
                address: address.clone(),
                outcome: TestOutcome::Skipped { tag: tag.clone() },
                duration: Duration::ZERO,
                stdout: String::new(),
                stderr: String::new(),
            });
            continue;
        }
        reports.push(run_one(workspace, graph, target, options)?);
    }
    Ok(reports)
}

fn run_one(
    workspace: &Workspace,
    graph: &DependencyGraph,
    target: &Target,
    options: &TestOptions,
) -> Result<TestReport, EngineError> {
    // The sandbox holds the sources of the whole transitive closure; only
    // the target's own files are executed.
    let closure = graph.transitive_closure(&[target.address.clone()])?;
    let mut all_files: BTreeSet<String> = BTreeSet::new();
    let mut own_files: Vec<String> = Vec::new();

    for address in &closure {
        let member = workspace.get(address).ok_or_else(|| EngineError::UnknownTarget {
            address: address.to_string(),
        })?;
        let filespec = Filespec::from_sources(&member.address.spec_path, &member.decl.sources)?;
        let fileset = filespec.expand(workspace.root())?;
        if *address == target.address {
            own_files.clone_from(&fileset.files);
        }
        all_files.extend(fileset.files);
    }

    let fileset = Fileset {
        files: all_files.into_iter().collect(),
    };
    let snapshot = Snapshot::capture(workspace.root(), &fileset)?;

    let limit = workspace
        .config()
        .effective_timeout(options.timeout_override.or(target.decl.timeout));

    let request = ProcessRequest {
        argv: vec![
            "sh".to_owned(),
            "-ec".to_owned(),
            driver_script(&own_files),
        ],
        snapshot: Some(snapshot),
        timeout: Some(Duration::from_secs(limit)),
        ..ProcessRequest::default()
    };

    let result = process::execute(workspace.root(), &request)?;
    let outcome = classify(&result, limit);
    Ok(TestReport {
        address: target.address.clone(),
        outcome,
        duration: result.duration,
        stdout: result.stdout,
        stderr: result.stderr,
    })
}

/// The driver sources each test file in the current shell, so an `exit`
/// inside a file terminates the whole suite. The marker is only reached
/// when every file has run.
fn driver_script(files: &[String]) -> String {
    let mut script = String::new();
    for file in files {
        script.push_str(". './");
        script.push_str(file);
        script.push_str("'\n");
    }
    script.push_str("echo '");
    script.push_str(COMPLETION_MARKER);
    script.push_str("'\n");
    script
}

fn classify(result: &ProcessResult, limit: u64) -> TestOutcome {
    if result.timed_out {
        return TestOutcome::TimedOut { limit };
    }
    match result.exit_code {
        Some(0) if result.stdout.contains(COMPLETION_MARKER) => TestOutcome::Passed,
        Some(0) => TestOutcome::EarlyExit,
        exit_code => TestOutcome::Failed { exit_code },
    }
}
