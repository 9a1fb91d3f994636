//! Problem definitions
//!
//! The grading entry points only read `id`, `function_name` and `tests`; the
//! remaining fields describe the exercise for the catalog and review export.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!("Unknown difficulty: {} (expected Easy, Medium or Hard)", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_code: Option<String>,
    /// Name of the function the submission must define
    pub function_name: String,
    pub tests: Vec<TestCase>,
}

impl Problem {
    /// Minimal problem with just an entry point and test cases.
    pub fn new(id: impl Into<String>, function_name: impl Into<String>, tests: Vec<TestCase>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            summary: String::new(),
            difficulty: None,
            category: None,
            tags: Vec::new(),
            prompt: String::new(),
            constraints: Vec::new(),
            starter_code: None,
            function_name: function_name.into(),
            tests,
        }
    }
}

/// One test case: positional arguments plus an expected value or an `assert` predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub description: String,
    /// Anything other than a JSON array is treated as no arguments.
    #[serde(default)]
    pub args: JsonValue,
    /// `None` stands for `undefined` (the key is absent); `Some(Null)` is `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected: Option<JsonValue>,
    /// Source text of a predicate, e.g. `(result) => result.length === 3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

impl TestCase {
    pub fn expecting(description: impl Into<String>, args: Vec<JsonValue>, expected: JsonValue) -> Self {
        Self {
            description: description.into(),
            args: JsonValue::Array(args),
            expected: Some(expected),
            assert: None,
        }
    }

    pub fn asserting(description: impl Into<String>, args: Vec<JsonValue>, predicate: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            args: JsonValue::Array(args),
            expected: None,
            assert: Some(predicate.into()),
        }
    }

    pub fn arguments(&self) -> &[JsonValue] {
        match &self.args {
            JsonValue::Array(items) => items,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expected_null_is_not_absent() {
        let with_null: TestCase =
            serde_json::from_value(json!({ "args": [1], "expected": null })).unwrap();
        assert_eq!(with_null.expected, Some(JsonValue::Null));

        let absent: TestCase = serde_json::from_value(json!({ "args": [1] })).unwrap();
        assert_eq!(absent.expected, None);
        assert_eq!(absent.description, "");
    }

    #[test]
    fn test_non_array_args_mean_no_arguments() {
        let case: TestCase =
            serde_json::from_value(json!({ "args": "oops", "expected": 1 })).unwrap();
        assert!(case.arguments().is_empty());
    }

    #[test]
    fn test_problem_camel_case_fields() {
        let problem: Problem = serde_json::from_value(json!({
            "id": "reverse-string",
            "functionName": "reverseString",
            "difficulty": "Easy",
            "starterCode": "function reverseString(input) {}",
            "tests": []
        }))
        .unwrap();
        assert_eq!(problem.function_name, "reverseString");
        assert_eq!(problem.difficulty, Some(Difficulty::Easy));
        assert!(problem.tags.is_empty());
    }

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("extreme".parse::<Difficulty>().is_err());
        assert!(Difficulty::Easy < Difficulty::Hard);
    }
}
