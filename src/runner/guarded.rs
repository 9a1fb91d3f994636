//! Guarded runner implementation
//!
//! Same as the inline runner, but each run gets a wall-clock limit. When the
//! limit expires the runner raises the interpreter's interrupt flag, which is
//! polled at every call and loop iteration, and reports `TimedOut`. The
//! blocking thread then unwinds on its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::{spawn_grading, RunReport, Runner};
use crate::config::get_config;
use crate::core::{AdhocOutcome, GradingOutcome, Problem};
use crate::judger::{run_tests_with, GradeOptions};
use crate::playground::run_custom_with;

pub struct GuardedRunner {
    options: GradeOptions,
    /// Wall-clock limit in milliseconds, 0 disables it
    limit_ms: u64,
}

impl GuardedRunner {
    pub fn new(options: GradeOptions, limit_ms: u64) -> Self {
        Self { options, limit_ms }
    }

    /// Runner using the global configuration and its `time_limit_ms`
    pub fn from_config() -> Self {
        let config = get_config();
        Self::new(GradeOptions::from_config(config), config.time_limit_ms)
    }

    pub fn limit_ms(&self) -> u64 {
        self.limit_ms
    }

    async fn guard<T, F>(&self, label: &str, work: F) -> Result<RunReport<T>>
    where
        F: FnOnce(GradeOptions) -> T + Send + 'static,
        T: Send + 'static,
    {
        let flag = Arc::new(AtomicBool::new(false));
        let options = self.options.clone().with_interrupt(flag.clone());
        let task = spawn_grading(move || work(options));

        if self.limit_ms == 0 {
            return Ok(RunReport::Completed(task.await?));
        }

        match tokio::time::timeout(Duration::from_millis(self.limit_ms), task).await {
            Ok(outcome) => Ok(RunReport::Completed(outcome?)),
            Err(_) => {
                flag.store(true, Ordering::Relaxed);
                warn!("{} exceeded {}ms, interrupting", label, self.limit_ms);
                Ok(RunReport::TimedOut {
                    limit_ms: self.limit_ms,
                })
            }
        }
    }
}

#[async_trait]
impl Runner for GuardedRunner {
    async fn run_tests(&self, problem: &Problem, source: &str) -> Result<RunReport<GradingOutcome>> {
        debug!("Guarded test run for {} ({}ms)", problem.id, self.limit_ms);
        let label = format!("Test run of {}", problem.id);
        let problem = problem.clone();
        let source = source.to_string();
        self.guard(&label, move |options| {
            run_tests_with(&problem, &source, &options)
        })
        .await
    }

    async fn run_custom(
        &self,
        problem: &Problem,
        source: &str,
        args: &[JsonValue],
    ) -> Result<RunReport<AdhocOutcome>> {
        debug!("Guarded ad-hoc run for {} ({}ms)", problem.id, self.limit_ms);
        let label = format!("Ad-hoc run of {}", problem.id);
        let problem = problem.clone();
        let source = source.to_string();
        let args = args.to_vec();
        self.guard(&label, move |options| {
            run_custom_with(&problem, &source, &args, &options)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AdhocStatus, GradingStatus, TestCase};
    use serde_json::json;
    use std::time::Instant;

    fn problem() -> Problem {
        Problem::new(
            "count-up",
            "countUp",
            vec![TestCase::expecting("small", vec![json!(3)], json!(3))],
        )
    }

    #[tokio::test]
    async fn test_fast_run_completes() {
        let runner = GuardedRunner::new(GradeOptions::default(), 5_000);
        let report = runner
            .run_tests(&problem(), "function countUp(n) { let i = 0; while (i < n) i++; return i; }")
            .await
            .unwrap();
        assert_eq!(report.completed().unwrap().summary.status, GradingStatus::Pass);
    }

    #[tokio::test]
    async fn test_infinite_loop_times_out() {
        let runner = GuardedRunner::new(GradeOptions::default(), 200);
        let started = Instant::now();
        let report = runner
            .run_tests(&problem(), "function countUp() { while (true) {} }")
            .await
            .unwrap();
        assert_eq!(report, RunReport::TimedOut { limit_ms: 200 });
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_runaway_recursion_in_ad_hoc_run_times_out() {
        let runner = GuardedRunner::new(GradeOptions::default(), 150);
        let report = runner
            .run_custom(
                &problem(),
                "function spin(n) { for (;;) { n++; } } function countUp() { return spin(0); }",
                &[],
            )
            .await
            .unwrap();
        assert!(matches!(report, RunReport::TimedOut { limit_ms: 150 }));
    }

    #[tokio::test]
    async fn test_zero_limit_disables_guard() {
        let runner = GuardedRunner::new(GradeOptions::default(), 0);
        let report = runner
            .run_custom(&problem(), "function countUp(n) { return n + 1; }", &[json!(1)])
            .await
            .unwrap();
        let outcome = report.completed().unwrap();
        assert_eq!(outcome.status, AdhocStatus::Success);
        assert_eq!(outcome.formatted.as_deref(), Some("2"));
    }

    #[test]
    fn test_timed_out_report_json() {
        let report: RunReport<AdhocOutcome> = RunReport::TimedOut { limit_ms: 5000 };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({ "timed-out": { "limitMs": 5000 } })
        );
    }
}
