//! Playground module - ad-hoc execution outside the test suite
//!
//! - `run_custom`: compile a submission and call its entry point once
//! - `parse_arguments`: turn the caller's JSON text into an argument list

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

use crate::compiler::compile;
use crate::config::get_config;
use crate::core::outcome::duration_ms;
use crate::core::{AdhocOutcome, Problem};
use crate::engine::{describe_unwind, on_evaluation_thread, panic_message, Value};
use crate::formatter::format_value;
use crate::judger::GradeOptions;

/// Argument text the caller could not turn into an argument list
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidArguments {
    #[error("Failed to parse arguments as JSON: {0}")]
    Json(String),
    #[error("Arguments must be a JSON array, e.g. [\"sample\", 42]")]
    NotAnArray,
}

/// Parse argument text; empty (or blank) text means no arguments.
pub fn parse_arguments(text: &str) -> Result<Vec<JsonValue>, InvalidArguments> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(text) {
        Ok(JsonValue::Array(items)) => Ok(items),
        Ok(_) => Err(InvalidArguments::NotAnArray),
        Err(e) => Err(InvalidArguments::Json(e.to_string())),
    }
}

/// Run the problem's entry point once with `args`, using the global configuration.
pub fn run_custom(problem: &Problem, source: &str, args: &[JsonValue]) -> AdhocOutcome {
    run_custom_with(problem, source, args, &GradeOptions::from_config(get_config()))
}

pub fn run_custom_with(
    problem: &Problem,
    source: &str,
    args: &[JsonValue],
    options: &GradeOptions,
) -> AdhocOutcome {
    let started = Instant::now();
    let mut outcome = on_evaluation_thread(options.stack_size_mb, || {
        catch_unwind(AssertUnwindSafe(|| execute(problem, source, args, options))).unwrap_or_else(
            |panic| {
                let reason = panic_message(&*panic);
                warn!("Interpreter fault in ad-hoc run of {}: {}", problem.id, reason);
                AdhocOutcome::runtime_error(format!("Internal error: {}", reason), String::new(), 0.0)
            },
        )
    })
    .unwrap_or_else(|e| {
        warn!("Ad-hoc run of {} failed: {}", problem.id, e);
        AdhocOutcome::runtime_error(e.to_string(), String::new(), 0.0)
    });
    outcome.duration_ms = duration_ms(started.elapsed());

    info!(
        "Ad-hoc run summary: problem_id={}, status={}, duration_ms={}",
        problem.id, outcome.status, outcome.duration_ms
    );
    outcome
}

fn execute(problem: &Problem, source: &str, args: &[JsonValue], options: &GradeOptions) -> AdhocOutcome {
    let mut unit = match compile(source, &problem.function_name, options.eval.clone()) {
        Ok(unit) => unit,
        Err(e) => return AdhocOutcome::compile_error(e.to_string(), 0.0),
    };
    let args: Vec<Value> = args.iter().map(|arg| unit.value_from_json(arg)).collect();
    match unit.invoke(&args) {
        Ok(value) => AdhocOutcome::success(format_value(&value), 0.0),
        Err(unwind) => {
            let (message, stack) = describe_unwind(&unwind);
            AdhocOutcome::runtime_error(message, stack, 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AdhocStatus;
    use serde_json::json;

    const PALINDROME: &str = r#"
function isPalindrome(text) {
  const cleaned = text.toLowerCase().replace(/[^a-z0-9]/g, '');
  return cleaned === [...cleaned].reverse().join('');
}
"#;

    fn palindrome_problem() -> Problem {
        Problem::new("is-palindrome", "isPalindrome", Vec::new())
    }

    fn run(source: &str, args: &[JsonValue]) -> AdhocOutcome {
        run_custom_with(&palindrome_problem(), source, args, &GradeOptions::default())
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments("").unwrap(), Vec::<JsonValue>::new());
        assert_eq!(parse_arguments("  \n").unwrap(), Vec::<JsonValue>::new());
        assert_eq!(
            parse_arguments(r#"["sample", 42, {"a": null}]"#).unwrap(),
            vec![json!("sample"), json!(42), json!({ "a": null })]
        );
        assert_eq!(parse_arguments("{\"a\": 1}"), Err(InvalidArguments::NotAnArray));
        assert!(matches!(parse_arguments("[1,"), Err(InvalidArguments::Json(_))));
        assert!(parse_arguments("\"text\"")
            .unwrap_err()
            .to_string()
            .contains("JSON array"));
    }

    #[test]
    fn test_success_formats_return_value() {
        let outcome = run(PALINDROME, &[json!("abba")]);
        assert_eq!(outcome.status, AdhocStatus::Success);
        assert_eq!(outcome.formatted.as_deref(), Some("true"));
        assert_eq!(outcome.message, None);

        let outcome = run(PALINDROME, &[json!("No lemon, no melon")]);
        assert_eq!(outcome.formatted.as_deref(), Some("true"));
    }

    #[test]
    fn test_compile_error() {
        let outcome = run("function somethingElse() {}", &[]);
        assert_eq!(outcome.status, AdhocStatus::CompileError);
        assert!(outcome.message.unwrap().contains("isPalindrome"));
        assert_eq!(outcome.formatted, None);
    }

    #[test]
    fn test_runtime_error_reports_message_and_stack() {
        let outcome = run(PALINDROME, &[]);
        assert_eq!(outcome.status, AdhocStatus::RuntimeError);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Cannot read properties of undefined (reading 'toLowerCase')")
        );
        assert!(outcome.stack.unwrap().starts_with("TypeError: "));
    }

    #[test]
    fn test_undefined_result() {
        let outcome = run("function isPalindrome() {}", &[json!(1)]);
        assert_eq!(outcome.formatted.as_deref(), Some("undefined"));
    }

    #[test]
    fn test_run_custom_with_global_config() {
        let outcome = run_custom(&palindrome_problem(), PALINDROME, &[json!("abba")]);
        assert_eq!(outcome.status, AdhocStatus::Success);
        assert_eq!(outcome.formatted.as_deref(), Some("true"));
    }
}
