//! Judger module - runs a submission against a problem's test cases
//!
//! Compilation and every case run sequentially on one evaluation thread.
//! A failing or throwing case never stops later cases, and an internal fault
//! while running one case is recorded as that case's error.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::checker::values_equal;
use crate::compiler::{compile, CompiledUnit};
use crate::config::{get_config, GraderConfig};
use crate::core::outcome::duration_ms;
use crate::core::{CaseResult, GradingOutcome, GradingStatus, Problem, RunSummary, TestCase};
use crate::engine::{
    describe_unwind, on_evaluation_thread, panic_message, EvalOptions, EvalResult, Value,
};
use crate::formatter::format_value;

/// Expected text reported when a predicate accepts the result
pub const PASSED_CUSTOM_CHECK: &str = "passed the custom check";
/// Expected text reported when a predicate rejects the result
pub const ASSERT_MUST_RETURN_TRUE: &str = "the assert function must return true";

/// Per-run settings derived from [`GraderConfig`]
#[derive(Debug, Clone)]
pub struct GradeOptions {
    pub eval: EvalOptions,
    pub max_equality_depth: usize,
    pub stack_size_mb: usize,
}

impl GradeOptions {
    pub fn from_config(config: &GraderConfig) -> Self {
        Self {
            eval: config.eval_options(),
            max_equality_depth: config.max_equality_depth,
            stack_size_mb: config.stack_size_mb,
        }
    }

    /// Let another thread stop the run by raising `flag`.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.eval.interrupt = Some(flag);
        self
    }
}

impl Default for GradeOptions {
    fn default() -> Self {
        Self::from_config(&GraderConfig::default())
    }
}

/// Grade `source` against every test case of `problem` with the global configuration.
pub fn run_tests(problem: &Problem, source: &str) -> GradingOutcome {
    run_tests_with(problem, source, &GradeOptions::from_config(get_config()))
}

pub fn run_tests_with(problem: &Problem, source: &str, options: &GradeOptions) -> GradingOutcome {
    let started = Instant::now();
    let outcome = on_evaluation_thread(options.stack_size_mb, || grade(problem, source, options))
        .unwrap_or_else(|e| {
            warn!("Grading of {} failed outside any case: {}", problem.id, e);
            GradingOutcome::compile_error(format!("Cannot evaluate code: {}", e), 0.0)
        });
    let outcome = GradingOutcome {
        summary: RunSummary {
            duration_ms: duration_ms(started.elapsed()),
            ..outcome.summary
        },
        items: outcome.items,
    };

    info!(
        "Test run summary: problem_id={}, status={}, passed={}/{}, duration_ms={}",
        problem.id,
        outcome.summary.status,
        outcome.pass_count(),
        problem.tests.len(),
        outcome.summary.duration_ms
    );
    outcome
}

fn grade(problem: &Problem, source: &str, options: &GradeOptions) -> GradingOutcome {
    let compiled = catch_unwind(AssertUnwindSafe(|| {
        compile(source, &problem.function_name, options.eval.clone())
    }));
    let mut unit = match compiled {
        Ok(Ok(unit)) => unit,
        Ok(Err(e)) => return GradingOutcome::compile_error(e.to_string(), 0.0),
        Err(panic) => {
            let reason = panic_message(&*panic);
            warn!("Interpreter fault while compiling {}: {}", problem.id, reason);
            return GradingOutcome::compile_error(
                format!("Cannot evaluate code: internal error: {}", reason),
                0.0,
            );
        }
    };

    let mut items = Vec::with_capacity(problem.tests.len());
    for (index, case) in problem.tests.iter().enumerate() {
        let item = run_case(&mut unit, case, options.max_equality_depth);
        debug!(
            "Case {} ({}) of {}: {}",
            index + 1,
            item.description,
            problem.id,
            item.outcome
        );
        items.push(item);
    }

    let total = items.len();
    let passed = items.iter().filter(|item| item.passed()).count();
    let (status, message) = if passed == total {
        (GradingStatus::Pass, "All tests passed 🎉".to_string())
    } else {
        (GradingStatus::Fail, format!("{} / {} cases passed.", passed, total))
    };
    GradingOutcome {
        summary: RunSummary {
            status,
            message,
            duration_ms: 0.0,
        },
        items,
    }
}

fn run_case(unit: &mut CompiledUnit, case: &TestCase, max_depth: usize) -> CaseResult {
    let description = case.description.clone();
    let prepared = catch_unwind(AssertUnwindSafe(|| {
        let args: Vec<Value> = case
            .arguments()
            .iter()
            .map(|arg| unit.value_from_json(arg))
            .collect();
        let formatted: Vec<String> = args.iter().map(format_value).collect();
        (args, formatted)
    }));
    let (args, formatted) = match prepared {
        Ok(prepared) => prepared,
        Err(panic) => return internal_fault(description, Vec::new(), &*panic),
    };

    match catch_unwind(AssertUnwindSafe(|| {
        evaluate_case(unit, case, &args, max_depth)
    })) {
        Ok(Ok((passed, expected, received))) => {
            CaseResult::compared(description, formatted, passed, expected, received)
        }
        Ok(Err(unwind)) => {
            let (message, stack) = describe_unwind(&unwind);
            CaseResult::errored(description, formatted, message, stack)
        }
        Err(panic) => internal_fault(description, formatted, &*panic),
    }
}

/// Error item for a case whose evaluation panicked inside the interpreter.
fn internal_fault(description: String, args: Vec<String>, panic: &(dyn Any + Send)) -> CaseResult {
    let reason = panic_message(panic);
    warn!("Interpreter fault in case {}: {}", description, reason);
    CaseResult::errored(
        description,
        args,
        format!("Internal error: {}", reason),
        String::new(),
    )
}

/// `(passed, expected, received)` for one case.
fn evaluate_case(
    unit: &mut CompiledUnit,
    case: &TestCase,
    args: &[Value],
    max_depth: usize,
) -> EvalResult<(bool, String, String)> {
    let output = unit.invoke(args)?;
    match &case.assert {
        Some(source) => {
            let predicate = unit.predicate(source)?;
            let passed = unit.check(&predicate, output.clone())?;
            let expected = if passed {
                PASSED_CUSTOM_CHECK
            } else {
                ASSERT_MUST_RETURN_TRUE
            };
            Ok((passed, expected.to_string(), format_value(&output)))
        }
        None => {
            let expected = match &case.expected {
                Some(json) => unit.value_from_json(json),
                None => Value::Undefined,
            };
            let passed = values_equal(&output, &expected, max_depth);
            Ok((passed, format_value(&expected), format_value(&output)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CaseVerdict;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    const REVERSE: &str =
        "function reverseString(input) { return input.split('').reverse().join(''); }";

    fn reverse_problem() -> Problem {
        Problem::new(
            "reverse-string",
            "reverseString",
            vec![
                TestCase::expecting("basic", vec![json!("garden")], json!("nedrag")),
                TestCase::expecting("empty", vec![json!("")], json!("")),
                TestCase::expecting("palindrome", vec![json!("level")], json!("level")),
            ],
        )
    }

    fn grade_default(problem: &Problem, source: &str) -> GradingOutcome {
        run_tests_with(problem, source, &GradeOptions::default())
    }

    #[test]
    fn test_reverse_string_passes() {
        let outcome = grade_default(&reverse_problem(), REVERSE);
        assert_eq!(outcome.summary.status, GradingStatus::Pass);
        assert_eq!(outcome.summary.message, "All tests passed 🎉");
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.items[0].args, vec!["\"garden\"".to_string()]);
        assert_eq!(outcome.items[0].expected.as_deref(), Some("\"nedrag\""));
        assert_eq!(outcome.items[0].received.as_deref(), Some("\"nedrag\""));
        assert!(outcome.summary.duration_ms >= 0.0);
    }

    #[test]
    fn test_missing_entry_point_is_compile_error() {
        let outcome = grade_default(&reverse_problem(), "function other() {}");
        assert_eq!(outcome.summary.status, GradingStatus::CompileError);
        assert!(outcome.summary.message.contains("reverseString"));
        assert!(outcome.items.is_empty());
    }

    #[test]
    fn test_throwing_solution_fails_every_case_with_error() {
        let outcome = grade_default(
            &reverse_problem(),
            "function reverseString() { throw new Error('boom'); }",
        );
        assert_eq!(outcome.summary.status, GradingStatus::Fail);
        assert_eq!(outcome.summary.message, "0 / 3 cases passed.");
        for item in &outcome.items {
            assert_eq!(item.outcome, CaseVerdict::Error);
            assert_eq!(item.error.as_deref(), Some("boom"));
            assert!(item.stack.as_deref().unwrap().starts_with("Error: boom"));
            assert_eq!(item.expected, None);
        }
    }

    #[test]
    fn test_throwing_case_does_not_abort_later_cases() {
        let problem = Problem::new(
            "double",
            "double",
            vec![
                TestCase::expecting("one", vec![json!(1)], json!(2)),
                TestCase::expecting("two", vec![json!(2)], json!(4)),
                TestCase::expecting("three", vec![json!(3)], json!(6)),
            ],
        );
        let outcome = grade_default(
            &problem,
            "function double(n) { if (n === 2) throw new RangeError('no twos'); return n * 2; }",
        );
        let verdicts: Vec<CaseVerdict> = outcome.items.iter().map(|i| i.outcome).collect();
        assert_eq!(verdicts, vec![CaseVerdict::Pass, CaseVerdict::Error, CaseVerdict::Pass]);
        assert_eq!(outcome.summary.message, "2 / 3 cases passed.");
    }

    #[test]
    fn test_wrong_answer_reports_both_values() {
        let outcome = grade_default(&reverse_problem(), "function reverseString(s) { return s; }");
        let first = &outcome.items[0];
        assert_eq!(first.outcome, CaseVerdict::Fail);
        assert_eq!(first.expected.as_deref(), Some("\"nedrag\""));
        assert_eq!(first.received.as_deref(), Some("\"garden\""));
        assert_eq!(outcome.pass_count(), 2);
    }

    #[test]
    fn test_assert_predicates() {
        let problem = Problem::new(
            "pairs",
            "pairs",
            vec![
                TestCase::asserting("three items", vec![json!(3)], "(result) => result.length === 3"),
                TestCase::asserting("four items", vec![json!(2)], "(result) => result.length === 4"),
            ],
        );
        let outcome = grade_default(&problem, "function pairs(n) { return Array.from({ length: n }, (_, i) => i); }");
        assert_eq!(outcome.items[0].outcome, CaseVerdict::Pass);
        assert_eq!(outcome.items[0].expected.as_deref(), Some(PASSED_CUSTOM_CHECK));
        assert_eq!(outcome.items[1].outcome, CaseVerdict::Fail);
        assert_eq!(outcome.items[1].expected.as_deref(), Some(ASSERT_MUST_RETURN_TRUE));
        assert_eq!(outcome.items[1].received.as_deref(), Some("[\n  0,\n  1\n]"));
    }

    #[test]
    fn test_absent_expected_means_undefined() {
        let problem: Problem = serde_json::from_value(json!({
            "id": "noop",
            "functionName": "noop",
            "tests": [
                { "description": "returns nothing", "args": [] },
                { "description": "not null", "args": [], "expected": null }
            ]
        }))
        .unwrap();
        let outcome = grade_default(&problem, "function noop() {}");
        assert_eq!(outcome.items[0].outcome, CaseVerdict::Pass);
        assert_eq!(outcome.items[0].expected.as_deref(), Some("undefined"));
        assert_eq!(outcome.items[1].outcome, CaseVerdict::Fail);
        assert_eq!(outcome.items[1].expected.as_deref(), Some("null"));
    }

    #[test]
    fn test_arguments_are_formatted_before_the_call() {
        let problem = Problem::new(
            "mutate",
            "mutate",
            vec![TestCase::expecting("push", vec![json!([1])], json!(2))],
        );
        let outcome = grade_default(&problem, "function mutate(list) { list.push(9); return list.length; }");
        assert_eq!(outcome.items[0].args, vec!["[\n  1\n]".to_string()]);
        assert_eq!(outcome.summary.status, GradingStatus::Pass);
    }

    #[test]
    fn test_outcomes_are_deterministic_apart_from_duration() {
        let problem = reverse_problem();
        let source = "function reverseString(s) { return s.length > 4 ? s : [...s].reverse().join(''); }";
        let mut first = grade_default(&problem, source);
        let mut second = grade_default(&problem, source);
        first.summary.duration_ms = 0.0;
        second.summary.duration_ms = 0.0;
        assert_eq!(first, second);
    }

    #[test]
    fn test_raised_interrupt_stops_cases() {
        let flag = Arc::new(AtomicBool::new(true));
        let options = GradeOptions::default().with_interrupt(flag.clone());
        let outcome = run_tests_with(&reverse_problem(), REVERSE, &options);
        assert_eq!(outcome.summary.status, GradingStatus::Fail);
        assert_eq!(outcome.items.len(), 3);
        for item in &outcome.items {
            assert_eq!(item.error.as_deref(), Some("Execution interrupted"));
        }
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_run_tests_with_global_config() {
        let outcome = run_tests(&reverse_problem(), REVERSE);
        assert_eq!(outcome.summary.status, GradingStatus::Pass);
        assert_eq!(outcome.items.len(), 3);
    }

    #[test]
    fn test_internal_fault_keeps_formatted_arguments() {
        let panic = std::panic::catch_unwind(|| panic!("broken invariant")).unwrap_err();
        let item = internal_fault("basic".to_string(), vec!["\"garden\"".to_string()], &*panic);
        assert_eq!(item.outcome, CaseVerdict::Error);
        assert_eq!(item.args, vec!["\"garden\"".to_string()]);
        assert_eq!(item.error.as_deref(), Some("Internal error: broken invariant"));
    }
}
