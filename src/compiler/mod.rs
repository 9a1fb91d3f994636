//! Compiler module - Source text to invocable unit
//!
//! `compile` evaluates a submission in a fresh realm and locates its entry
//! point:
//! - syntax errors and top-level runtime errors are wrapped into one
//!   `CompileError` that carries the underlying cause
//! - a missing or non-callable entry point names the expected function
//! - the candidate function is located, never called
//!
//! A `CompiledUnit` owns its interpreter, so it lives and dies on the thread
//! that compiled it.

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use crate::engine::parser::{parse_expression_source, parse_program};
use crate::engine::value::{describe_for_error, Value};
use crate::engine::{describe_unwind, EvalOptions, EvalResult, Interpreter};

/// Failure to turn source text into a callable unit.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot evaluate code: {cause}")]
pub struct CompileError {
    pub cause: String,
}

impl CompileError {
    fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

pub struct CompiledUnit {
    interpreter: Interpreter,
    entry: Value,
    entry_name: String,
}

/// Evaluate `source` in a fresh realm and bind its `entry_name` function.
pub fn compile(
    source: &str,
    entry_name: &str,
    options: EvalOptions,
) -> Result<CompiledUnit, CompileError> {
    let program = parse_program(source)
        .map_err(|e| CompileError::new(format!("{} ({})", e.message, e.pos)))?;

    let mut interpreter = Interpreter::new(options);
    if let Err(unwind) = interpreter.run_program(&program) {
        return Err(CompileError::new(describe_unwind(&unwind).0));
    }

    match interpreter.global_binding(entry_name) {
        Some(entry) if entry.is_callable() => {
            debug!("Compiled entry point {}", entry_name);
            Ok(CompiledUnit {
                interpreter,
                entry,
                entry_name: entry_name.to_string(),
            })
        }
        _ => Err(CompileError::new(format!(
            "function {} was not found. Check that the function name matches the exercise.",
            entry_name
        ))),
    }
}

impl CompiledUnit {
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Convert catalog JSON into a value of this unit's realm.
    pub fn value_from_json(&mut self, json: &JsonValue) -> Value {
        self.interpreter.from_json(json)
    }

    /// Call the entry point with positional arguments and `this` undefined.
    pub fn invoke(&mut self, args: &[Value]) -> EvalResult<Value> {
        let entry = self.entry.clone();
        self.interpreter.call(&entry, &Value::Undefined, args)
    }

    /// Evaluate predicate source text against the built-ins only.
    ///
    /// Syntax errors surface as a thrown `SyntaxError` so the caller reports
    /// them like any other failure of the case.
    pub fn predicate(&mut self, source: &str) -> EvalResult<Value> {
        let expr = match parse_expression_source(source) {
            Ok(expr) => expr,
            Err(e) => {
                return self
                    .interpreter
                    .throw("SyntaxError", format!("{} ({})", e.message, e.pos))
            }
        };
        let predicate = self.interpreter.evaluate(&expr)?;
        if !predicate.is_callable() {
            return self.interpreter.type_error(format!(
                "assert {} is not a function",
                describe_for_error(&predicate)
            ));
        }
        Ok(predicate)
    }

    /// Apply a predicate to a returned value; truthiness decides the result.
    pub fn check(&mut self, predicate: &Value, output: Value) -> EvalResult<bool> {
        let verdict = self
            .interpreter
            .call(predicate, &Value::Undefined, &[output])?;
        Ok(verdict.is_truthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{describe_thrown, Unwind};
    use crate::formatter::format_value;
    use serde_json::json;

    fn compile_default(source: &str, entry: &str) -> Result<CompiledUnit, CompileError> {
        compile(source, entry, EvalOptions::default())
    }

    fn cause(result: Result<CompiledUnit, CompileError>) -> String {
        match result {
            Ok(_) => panic!("expected a compile error"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn test_compile_and_invoke() {
        let mut unit = compile_default(
            "function reverseString(input) { return input.split('').reverse().join(''); }",
            "reverseString",
        )
        .unwrap();
        assert_eq!(unit.entry_name(), "reverseString");
        let arg = unit.value_from_json(&json!("garden"));
        let output = unit.invoke(&[arg]).ok().unwrap();
        assert_eq!(format_value(&output), "\"nedrag\"");
    }

    #[test]
    fn test_entry_point_bound_by_const_arrow() {
        let mut unit = compile_default("const double = (n) => n * 2;", "double").unwrap();
        let output = unit.invoke(&[Value::Number(21.0)]).ok().unwrap();
        assert_eq!(format_value(&output), "42");
    }

    #[test]
    fn test_missing_entry_point_names_it() {
        assert_eq!(
            cause(compile_default("function other() {}", "reverseString")),
            "Cannot evaluate code: function reverseString was not found. Check that the function name matches the exercise."
        );
        assert!(cause(compile_default("const reverseString = 'nope';", "reverseString"))
            .contains("reverseString"));
    }

    #[test]
    fn test_syntax_errors_are_wrapped() {
        let message = cause(compile_default("function f( {", "f"));
        assert!(message.starts_with("Cannot evaluate code: "));
    }

    #[test]
    fn test_top_level_errors_are_wrapped() {
        assert_eq!(
            cause(compile_default("throw new Error('setup failed'); function f() {}", "f")),
            "Cannot evaluate code: setup failed"
        );
        assert!(cause(compile_default("undeclared = 1; function f() {}", "f"))
            .contains("undeclared is not defined"));
        assert!(cause(compile_default("const x = 1; x = 2; function f() {}", "f"))
            .contains("Assignment to constant variable"));
    }

    #[test]
    fn test_each_compile_is_isolated() {
        let first = compile_default("var counter = 1; function f() { return counter; }", "f");
        assert!(first.is_ok());
        assert!(cause(compile_default("function g() { return counter; } g();", "g"))
            .contains("counter is not defined"));
    }

    #[test]
    fn test_predicates_cannot_see_submission_bindings() {
        let mut unit =
            compile_default("const Array = null; function f() { return [1, 2, 3]; }", "f").unwrap();
        let predicate = unit
            .predicate("(result) => Array.isArray(result) && result.length === 3")
            .ok()
            .unwrap();
        let output = unit.invoke(&[]).ok().unwrap();
        assert!(unit.check(&predicate, output).ok().unwrap());
    }

    #[test]
    fn test_invalid_predicates_throw() {
        let mut unit = compile_default("function f() {}", "f").unwrap();
        match unit.predicate("(result) =>") {
            Err(Unwind::Throw(value)) => assert!(!describe_thrown(&value).0.is_empty()),
            _ => panic!("expected a SyntaxError"),
        }
        match unit.predicate("42") {
            Err(Unwind::Throw(value)) => {
                assert_eq!(describe_thrown(&value).0, "assert number '42' is not a function")
            }
            _ => panic!("expected a TypeError"),
        }
    }
}
