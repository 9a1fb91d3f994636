use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall status of a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradingStatus {
    Pass,
    Fail,
    CompileError,
}

impl fmt::Display for GradingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GradingStatus::Pass => "pass",
            GradingStatus::Fail => "fail",
            GradingStatus::CompileError => "compile-error",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseVerdict {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for CaseVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaseVerdict::Pass => "pass",
            CaseVerdict::Fail => "fail",
            CaseVerdict::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Status of an ad-hoc execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdhocStatus {
    Success,
    CompileError,
    RuntimeError,
}

impl fmt::Display for AdhocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdhocStatus::Success => "success",
            AdhocStatus::CompileError => "compile-error",
            AdhocStatus::RuntimeError => "runtime-error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serialized_form() {
        for status in [GradingStatus::Pass, GradingStatus::Fail, GradingStatus::CompileError] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        assert_eq!(
            serde_json::to_string(&AdhocStatus::RuntimeError).unwrap(),
            "\"runtime-error\""
        );
        assert_eq!(CaseVerdict::Error.to_string(), "error");
    }
}
