//! Assertions over pipeline run summaries.

use crate::core::StageStatus;
use crate::pipeline::RunSummary;

/// Asserts that `stage` has an outcome with `status`.
///
/// # Panics
///
/// Panics if the stage has no outcome or a different status.
pub fn assert_stage_status(summary: &RunSummary, stage: &str, status: StageStatus) {
    match summary.outcome(stage) {
        Some(outcome) => assert_eq!(
            outcome.status, status,
            "stage '{stage}' has status {}, expected {status}",
            outcome.status
        ),
        None => panic!("stage '{stage}' has no outcome"),
    }
}

/// Asserts exactly which stages were spawned, in order.
///
/// # Panics
///
/// Panics if the invoked stages differ.
pub fn assert_invoked(summary: &RunSummary, expected: &[&str]) {
    assert_eq!(
        summary.invoked_stages(),
        expected,
        "unexpected set of invoked stages"
    );
}

/// Asserts that nothing was spawned.
///
/// # Panics
///
/// Panics if any stage was invoked.
pub fn assert_nothing_invoked(summary: &RunSummary) {
    assert_invoked(summary, &[]);
}
