//! Outcome records returned by the grading entry points.
//!
//! Field names serialize in camelCase (`durationMs`); optional fields are left
//! out of the JSON when they do not apply to the outcome.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::verdict::{AdhocStatus, CaseVerdict, GradingStatus};

/// Elapsed time in milliseconds, rounded to two decimals.
pub fn duration_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub status: GradingStatus,
    pub message: String,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub description: String,
    /// Formatted arguments, one entry per argument
    pub args: Vec<String>,
    pub outcome: CaseVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl CaseResult {
    pub fn compared(
        description: String,
        args: Vec<String>,
        passed: bool,
        expected: String,
        received: String,
    ) -> Self {
        Self {
            description,
            args,
            outcome: if passed { CaseVerdict::Pass } else { CaseVerdict::Fail },
            expected: Some(expected),
            received: Some(received),
            error: None,
            stack: None,
        }
    }

    pub fn errored(description: String, args: Vec<String>, error: String, stack: String) -> Self {
        Self {
            description,
            args,
            outcome: CaseVerdict::Error,
            expected: None,
            received: None,
            error: Some(error),
            stack: Some(stack),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == CaseVerdict::Pass
    }
}

/// Summary plus one case result per test case, in declared order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingOutcome {
    pub summary: RunSummary,
    pub items: Vec<CaseResult>,
}

impl GradingOutcome {
    pub fn compile_error(message: String, duration_ms: f64) -> Self {
        Self {
            summary: RunSummary {
                status: GradingStatus::CompileError,
                message,
                duration_ms,
            },
            items: Vec::new(),
        }
    }

    pub fn pass_count(&self) -> usize {
        self.items.iter().filter(|item| item.passed()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdhocOutcome {
    pub status: AdhocStatus,
    pub duration_ms: f64,
    /// Formatted return value (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl AdhocOutcome {
    pub fn success(formatted: String, duration_ms: f64) -> Self {
        Self {
            status: AdhocStatus::Success,
            duration_ms,
            formatted: Some(formatted),
            message: None,
            stack: None,
        }
    }

    pub fn compile_error(message: String, duration_ms: f64) -> Self {
        Self {
            status: AdhocStatus::CompileError,
            duration_ms,
            formatted: None,
            message: Some(message),
            stack: None,
        }
    }

    pub fn runtime_error(message: String, stack: String, duration_ms: f64) -> Self {
        Self {
            status: AdhocStatus::RuntimeError,
            duration_ms,
            formatted: None,
            message: Some(message),
            stack: Some(stack),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duration_rounding() {
        assert_eq!(duration_ms(Duration::from_micros(1_234_567)), 1234.57);
        assert_eq!(duration_ms(Duration::from_nanos(4_999)), 0.0);
        assert_eq!(duration_ms(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_grading_outcome_json_shape() {
        let outcome = GradingOutcome {
            summary: RunSummary {
                status: GradingStatus::Fail,
                message: "1 / 2 cases passed.".to_string(),
                duration_ms: 0.5,
            },
            items: vec![
                CaseResult::compared(
                    "basic".to_string(),
                    vec!["\"ab\"".to_string()],
                    true,
                    "\"ba\"".to_string(),
                    "\"ba\"".to_string(),
                ),
                CaseResult::errored("boom".to_string(), vec![], "boom".to_string(), String::new()),
            ],
        };
        assert_eq!(outcome.pass_count(), 1);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "summary": { "status": "fail", "message": "1 / 2 cases passed.", "durationMs": 0.5 },
                "items": [
                    { "description": "basic", "args": ["\"ab\""], "outcome": "pass", "expected": "\"ba\"", "received": "\"ba\"" },
                    { "description": "boom", "args": [], "outcome": "error", "error": "boom", "stack": "" }
                ]
            })
        );
    }

    #[test]
    fn test_adhoc_outcome_json_shape() {
        let outcome = AdhocOutcome::success("true".to_string(), 1.25);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "status": "success", "durationMs": 1.25, "formatted": "true" })
        );
    }
}
