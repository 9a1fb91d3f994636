//! Inline runner implementation
//!
//! Runs the grading entry points on the blocking pool without a time limit,
//! so every report is `Completed`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{spawn_grading, RunReport, Runner};
use crate::config::get_config;
use crate::core::{AdhocOutcome, GradingOutcome, Problem};
use crate::judger::{run_tests_with, GradeOptions};
use crate::playground::run_custom_with;

pub struct InlineRunner {
    options: GradeOptions,
}

impl InlineRunner {
    pub fn new(options: GradeOptions) -> Self {
        Self { options }
    }

    /// Runner using the global configuration
    pub fn from_config() -> Self {
        Self::new(GradeOptions::from_config(get_config()))
    }
}

#[async_trait]
impl Runner for InlineRunner {
    async fn run_tests(&self, problem: &Problem, source: &str) -> Result<RunReport<GradingOutcome>> {
        debug!("Inline test run for {}", problem.id);
        let problem = problem.clone();
        let source = source.to_string();
        let options = self.options.clone();
        let outcome = spawn_grading(move || run_tests_with(&problem, &source, &options)).await?;
        Ok(RunReport::Completed(outcome))
    }

    async fn run_custom(
        &self,
        problem: &Problem,
        source: &str,
        args: &[JsonValue],
    ) -> Result<RunReport<AdhocOutcome>> {
        debug!("Inline ad-hoc run for {}", problem.id);
        let problem = problem.clone();
        let source = source.to_string();
        let args = args.to_vec();
        let options = self.options.clone();
        let outcome =
            spawn_grading(move || run_custom_with(&problem, &source, &args, &options)).await?;
        Ok(RunReport::Completed(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AdhocStatus, GradingStatus, TestCase};
    use serde_json::json;

    fn problem() -> Problem {
        Problem::new(
            "camelize",
            "camelize",
            vec![
                TestCase::expecting("kebab", vec![json!("background-color")], json!("backgroundColor")),
                TestCase::expecting("single", vec![json!("color")], json!("color")),
            ],
        )
    }

    const SOURCE: &str =
        "function camelize(text) { return text.replace(/-([a-z])/g, (_, c) => c.toUpperCase()); }";

    #[tokio::test]
    async fn test_inline_run_tests() {
        let runner = InlineRunner::new(GradeOptions::default());
        let report = runner.run_tests(&problem(), SOURCE).await.unwrap();
        let outcome = report.completed().unwrap();
        assert_eq!(outcome.summary.status, GradingStatus::Pass);
        assert_eq!(outcome.items.len(), 2);
    }

    #[tokio::test]
    async fn test_inline_run_custom() {
        let runner = InlineRunner::new(GradeOptions::default());
        let report = runner
            .run_custom(&problem(), SOURCE, &[json!("border-top-width")])
            .await
            .unwrap();
        let outcome = report.completed().unwrap();
        assert_eq!(outcome.status, AdhocStatus::Success);
        assert_eq!(outcome.formatted.as_deref(), Some("\"borderTopWidth\""));
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_isolated() {
        let runner = InlineRunner::new(GradeOptions::default());
        let leaky = "var seen = (typeof seen === 'number' ? seen : 0) + 1; \
                     function camelize() { return String(seen); }";
        let (one, two) = (problem(), problem());
        let (first, second) = tokio::join!(
            runner.run_custom(&one, leaky, &[]),
            runner.run_custom(&two, leaky, &[])
        );
        for report in [first.unwrap(), second.unwrap()] {
            assert_eq!(report.completed().unwrap().formatted.as_deref(), Some("\"1\""));
        }
    }
}
