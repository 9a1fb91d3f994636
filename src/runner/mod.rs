//! Runner module - Async execution layer
//!
//! The grading entry points are blocking; runners move them off the async
//! executor:
//! - `InlineRunner`: runs to completion, no time limit
//! - `GuardedRunner`: stops the run after a wall-clock limit
//!
//! The runner module does NOT:
//! - Compare values or decide verdicts
//! - Cache compiled units between runs

pub mod guarded;
pub mod inline;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::core::{AdhocOutcome, GradingOutcome, Problem};

/// Result of a runner call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunReport<T> {
    /// The run finished and produced its outcome
    Completed(T),
    /// The run was stopped after `limit_ms`
    TimedOut {
        #[serde(rename = "limitMs")]
        limit_ms: u64,
    },
}

impl<T> RunReport<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            RunReport::Completed(outcome) => Some(outcome),
            RunReport::TimedOut { .. } => None,
        }
    }
}

/// Runner trait for grading submissions from async code
#[async_trait]
pub trait Runner: Send + Sync {
    /// Grade `source` against the problem's test cases
    async fn run_tests(&self, problem: &Problem, source: &str) -> Result<RunReport<GradingOutcome>>;

    /// Call the problem's entry point once with `args`
    async fn run_custom(
        &self,
        problem: &Problem,
        source: &str,
        args: &[JsonValue],
    ) -> Result<RunReport<AdhocOutcome>>;
}

/// Run blocking grading work on the blocking pool.
async fn spawn_grading<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Grading task failed")
}

// Re-exports
pub use guarded::GuardedRunner;
pub use inline::InlineRunner;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GradingStatus, TestCase};
    use crate::judger::GradeOptions;
    use serde_json::json;

    #[test]
    fn test_runners_share_the_trait() {
        let problem = Problem::new(
            "sum-range",
            "sumRange",
            vec![TestCase::expecting("one to ten", vec![json!(1), json!(10)], json!(55))],
        );
        let source = "function sumRange(a, b) { let s = 0; for (let i = a; i <= b; i++) s += i; return s; }";
        let runners: Vec<Box<dyn Runner>> = vec![
            Box::new(InlineRunner::new(GradeOptions::default())),
            Box::new(GuardedRunner::new(GradeOptions::default(), 5_000)),
        ];
        for runner in &runners {
            let report = tokio_test::block_on(runner.run_tests(&problem, source)).unwrap();
            assert_eq!(report.completed().unwrap().summary.status, GradingStatus::Pass);
        }
    }

    #[test]
    fn test_completed_accessor() {
        let timed_out: RunReport<u32> = RunReport::TimedOut { limit_ms: 10 };
        assert_eq!(timed_out.completed(), None);
        assert_eq!(RunReport::Completed(7).completed(), Some(7));
    }
}
