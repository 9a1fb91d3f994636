//! Markdown review export
//!
//! Bundles the problem statement, the learner's code and the latest test
//! results into one document for an external reviewer.

use crate::core::{CaseResult, CaseVerdict, GradingOutcome, GradingStatus, Problem};

fn status_label(status: GradingStatus) -> &'static str {
    match status {
        GradingStatus::Pass => "✅ pass",
        GradingStatus::Fail => "❌ fail",
        GradingStatus::CompileError => "⚠️ compile-error",
    }
}

fn outcome_label(outcome: CaseVerdict) -> &'static str {
    match outcome {
        CaseVerdict::Pass => "✅ pass",
        CaseVerdict::Fail => "❌ fail",
        CaseVerdict::Error => "⚠️ error",
    }
}

pub fn build_markdown(problem: &Problem, code: &str, outcome: Option<&GradingOutcome>) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Review request".into());
    lines.push(
        "You are a professional JavaScript code reviewer. Read the information below and evaluate the learner's solution."
            .into(),
    );
    lines.push(
        "If there is room for improvement, give **concrete findings with corrected examples**; if you judge the solution acceptable, state the grounds."
            .into(),
    );
    lines.push(
        "Always cover correctness, performance, readability, extensibility and safety.".into(),
    );
    lines.push(String::new());

    lines.push("## Problem overview".into());
    lines.push(format!("- ID: {}", problem.id));
    lines.push(format!("- Title: {}", problem.title));
    if let Some(difficulty) = problem.difficulty {
        lines.push(format!("- Difficulty: {}", difficulty));
    }
    if let Some(category) = &problem.category {
        lines.push(format!("- Category: {}", category));
    }
    if !problem.tags.is_empty() {
        lines.push(format!("- Tags: {}", problem.tags.join(", ")));
    }
    lines.push(String::new());
    push_section(&mut lines, "### Summary", &problem.summary);
    push_section(&mut lines, "### Problem statement", &problem.prompt);
    if !problem.constraints.is_empty() {
        lines.push("### Constraints".into());
        lines.extend(problem.constraints.iter().map(|c| format!("- {}", c)));
        lines.push(String::new());
    }

    lines.push("## Learner code".into());
    lines.push("```javascript".into());
    lines.push(if code.is_empty() {
        "// No code was entered".to_string()
    } else {
        code.to_string()
    });
    lines.push("```".into());
    lines.push(String::new());

    lines.push("## Test results".into());
    match outcome {
        None => lines.push("- Tests have not been run yet.".into()),
        Some(outcome) => push_results(&mut lines, outcome),
    }

    lines.push("---".into());
    lines.push("### Output template".into());
    lines.push("1. **Overall assessment**: pass / hold / fail plus a short summary of the reasons".into());
    lines.push("2. **Findings**: concrete improvements as bullet points, with sample code".into());
    lines.push("3. **Advice**: guidance for further study".into());
    lines.join("\n").trim_end().to_string()
}

fn push_section(lines: &mut Vec<String>, heading: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    lines.push(heading.to_string());
    lines.push(body.trim().to_string());
    lines.push(String::new());
}

fn push_results(lines: &mut Vec<String>, outcome: &GradingOutcome) {
    let summary = &outcome.summary;
    lines.push(format!("- Status: {}", status_label(summary.status)));
    lines.push(format!("- Message: {}", summary.message));
    if summary.status == GradingStatus::CompileError {
        return;
    }
    lines.push(format!("- Duration: {}ms", summary.duration_ms));
    lines.push(String::new());
    lines.push("### Case details".into());
    for (index, item) in outcome.items.iter().enumerate() {
        push_case(lines, index, item);
    }
}

fn push_case(lines: &mut Vec<String>, index: usize, item: &CaseResult) {
    let description = if item.description.is_empty() {
        "Test"
    } else {
        &item.description
    };
    lines.push(format!("#### Case {}: {}", index + 1, description));
    lines.push(format!("- Result: {}", outcome_label(item.outcome)));
    if !item.args.is_empty() {
        lines.push(format!("- Input: {}", item.args.join(", ")));
    }
    if item.outcome == CaseVerdict::Error {
        lines.push(format!("- Error: {}", item.error.as_deref().unwrap_or_default()));
        if let Some(stack) = item.stack.as_deref().filter(|s| !s.is_empty()) {
            lines.push("```".into());
            lines.push(stack.to_string());
            lines.push("```".into());
        }
    } else {
        lines.push(format!("- Expected: {}", item.expected.as_deref().unwrap_or_default()));
        lines.push(format!("- Received: {}", item.received.as_deref().unwrap_or_default()));
    }
    lines.push(String::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Difficulty, RunSummary, TestCase};
    use serde_json::json;

    fn problem() -> Problem {
        let mut problem = Problem::new(
            "reverse-string",
            "reverseString",
            vec![TestCase::expecting("basic", vec![json!("garden")], json!("nedrag"))],
        );
        problem.title = "Reverse a string".to_string();
        problem.difficulty = Some(Difficulty::Easy);
        problem.category = Some("Strings".to_string());
        problem.tags = vec!["string".to_string(), "fundamental".to_string()];
        problem.summary = "Return the input reversed.\n".to_string();
        problem.constraints = vec!["0 <= length <= 10^5".to_string()];
        problem
    }

    #[test]
    fn test_not_run_yet() {
        let markdown = build_markdown(&problem(), "", None);
        assert!(markdown.starts_with("# Review request\n"));
        assert!(markdown.contains("- Difficulty: Easy\n- Category: Strings\n- Tags: string, fundamental"));
        assert!(markdown.contains("### Summary\nReturn the input reversed.\n\n"));
        assert!(!markdown.contains("### Problem statement"));
        assert!(markdown.contains("### Constraints\n- 0 <= length <= 10^5"));
        assert!(markdown.contains("```javascript\n// No code was entered\n```"));
        assert!(markdown.contains("- Tests have not been run yet."));
        assert!(markdown.ends_with("3. **Advice**: guidance for further study"));
    }

    #[test]
    fn test_case_details() {
        let outcome = GradingOutcome {
            summary: RunSummary {
                status: GradingStatus::Fail,
                message: "1 / 2 cases passed.".to_string(),
                duration_ms: 1.5,
            },
            items: vec![
                CaseResult::compared(
                    "basic".to_string(),
                    vec!["\"garden\"".to_string()],
                    true,
                    "\"nedrag\"".to_string(),
                    "\"nedrag\"".to_string(),
                ),
                CaseResult::errored(
                    String::new(),
                    vec!["1".to_string(), "2".to_string()],
                    "boom".to_string(),
                    "Error: boom\n    at reverseString (solution.js:1:30)".to_string(),
                ),
            ],
        };
        let markdown = build_markdown(&problem(), "function reverseString() {}", Some(&outcome));
        assert!(markdown.contains("- Status: ❌ fail\n- Message: 1 / 2 cases passed.\n- Duration: 1.5ms"));
        assert!(markdown.contains(
            "#### Case 1: basic\n- Result: ✅ pass\n- Input: \"garden\"\n- Expected: \"nedrag\"\n- Received: \"nedrag\""
        ));
        assert!(markdown.contains(
            "#### Case 2: Test\n- Result: ⚠️ error\n- Input: 1, 2\n- Error: boom\n```\nError: boom\n"
        ));
    }

    #[test]
    fn test_compile_error_has_no_case_details() {
        let outcome = GradingOutcome::compile_error("Cannot evaluate code: nope".to_string(), 0.1);
        let markdown = build_markdown(&problem(), "x", Some(&outcome));
        assert!(markdown.contains("- Status: ⚠️ compile-error\n- Message: Cannot evaluate code: nope"));
        assert!(!markdown.contains("### Case details"));
        assert!(!markdown.contains("- Duration"));
    }
}
