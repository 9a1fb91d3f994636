//! Checker module - structural equality for grading
//!
//! Decides whether a returned value matches the expected one:
//! - primitives and identical references compare with SameValue (`NaN` equals
//!   `NaN`, `+0` and `-0` differ)
//! - arrays compare element by element
//! - plain objects compare by own enumerable key set and per-key values, in
//!   any key order
//! - any other pairing (array vs object, functions, maps, sets, errors,
//!   regular expressions) is equal only by identity
//!
//! There is no cycle detection; nesting deeper than the configured bound is
//! reported as "not equal".

use tracing::warn;

use crate::config::get_config;
use crate::engine::value::{same_value, ObjectKind, Value};

struct DepthExceeded;

/// Structural equality with the configured depth bound.
pub fn equals(a: &Value, b: &Value) -> bool {
    values_equal(a, b, get_config().max_equality_depth)
}

/// Structural equality descending at most `max_depth` levels of nesting.
pub fn values_equal(a: &Value, b: &Value, max_depth: usize) -> bool {
    match equal_at(a, b, 0, max_depth) {
        Ok(equal) => equal,
        Err(DepthExceeded) => {
            warn!(
                "Equality check exceeded depth {}, treating values as different",
                max_depth
            );
            false
        }
    }
}

fn equal_at(a: &Value, b: &Value, depth: usize, max_depth: usize) -> Result<bool, DepthExceeded> {
    if same_value(a, b) {
        return Ok(true);
    }
    let (Value::Object(left), Value::Object(right)) = (a, b) else {
        return Ok(false);
    };
    if depth >= max_depth {
        return Err(DepthExceeded);
    }
    let left = left.borrow();
    let right = right.borrow();
    match (&left.kind, &right.kind) {
        (ObjectKind::Array(xs), ObjectKind::Array(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if !equal_at(x, y, depth + 1, max_depth)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (ObjectKind::Ordinary, ObjectKind::Ordinary) => {
            if left.props.len() != right.props.len() {
                return Ok(false);
            }
            for (key, x) in &left.props {
                let Some(y) = right.props.get(key) else {
                    return Ok(false);
                };
                if !equal_at(x, y, depth + 1, max_depth)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::parse_program;
    use crate::engine::{EvalOptions, Interpreter};

    const DEPTH: usize = 512;

    /// Evaluate `left` and `right` in one realm and compare them.
    fn compare(left: &str, right: &str) -> bool {
        let source = format!("const left = {}; const right = {};", left, right);
        let program = parse_program(&source).unwrap();
        let mut interpreter = Interpreter::new(EvalOptions::default());
        if interpreter.run_program(&program).is_err() {
            panic!("program failed: {}", source);
        }
        values_equal(
            &interpreter.global_binding("left").unwrap(),
            &interpreter.global_binding("right").unwrap(),
            DEPTH,
        )
    }

    #[test]
    fn test_primitives_use_same_value() {
        assert!(compare("NaN", "NaN"));
        assert!(compare("'abc'", "'abc'"));
        assert!(compare("undefined", "undefined"));
        assert!(!compare("0", "-0"));
        assert!(!compare("1", "'1'"));
        assert!(!compare("null", "undefined"));
    }

    #[test]
    fn test_every_value_equals_itself() {
        let program = parse_program(
            "const values = [NaN, 0, 'x', null, [1, [2]], { a: { b: 1 } }, new Map(), /x/, () => 1];",
        )
        .unwrap();
        let mut interpreter = Interpreter::new(EvalOptions::default());
        assert!(interpreter.run_program(&program).is_ok());
        let values = interpreter
            .global_binding("values")
            .and_then(|v| v.as_object().and_then(|o| o.array_items()))
            .unwrap();
        for value in &values {
            assert!(values_equal(value, value, DEPTH));
        }
    }

    #[test]
    fn test_arrays() {
        assert!(compare("[1, [2, 3]]", "[1, [2, 3]]"));
        assert!(!compare("[1, 2]", "[2, 1]"));
        assert!(!compare("[1, 2]", "[1, 2, 3]"));
        assert!(compare("[]", "[]"));
        assert!(compare("[NaN]", "[NaN]"));
    }

    #[test]
    fn test_plain_objects_ignore_key_order() {
        assert!(compare("{ a: 1, b: 2 }", "{ b: 2, a: 1 }"));
        assert!(!compare("{ a: 1 }", "{ a: 1, b: 2 }"));
        assert!(!compare("{ a: 1, c: 2 }", "{ a: 1, b: 2 }"));
        assert!(compare("{ a: undefined }", "{ a: undefined }"));
        assert!(!compare("{ a: undefined }", "{ b: undefined }"));
        assert!(compare("{ list: [{ x: 1 }] }", "{ list: [{ x: 1 }] }"));
    }

    #[test]
    fn test_other_kinds_equal_only_by_identity() {
        assert!(!compare("[]", "{}"));
        assert!(!compare("{ 0: 'a', length: 1 }", "['a']"));
        assert!(!compare("new Map([[1, 2]])", "new Map([[1, 2]])"));
        assert!(!compare("new Set()", "new Set()"));
        assert!(!compare("new Error('x')", "new Error('x')"));
        assert!(!compare("/a/", "/a/"));
        assert!(!compare("() => 1", "() => 1"));
    }

    #[test]
    fn test_depth_bound_counts_as_not_equal() {
        let program = parse_program(
            "function nest(n) { let v = []; for (let i = 0; i < n; i++) v = [v]; return v; } \
             const a = nest(20); const b = nest(20);",
        )
        .unwrap();
        let mut interpreter = Interpreter::new(EvalOptions::default());
        assert!(interpreter.run_program(&program).is_ok());
        let a = interpreter.global_binding("a").unwrap();
        let b = interpreter.global_binding("b").unwrap();
        assert!(values_equal(&a, &b, 64));
        assert!(!values_equal(&a, &b, 10));
    }

    #[test]
    fn test_equals_uses_global_config() {
        let program = parse_program("const a = { x: [1, { y: 2 }] }; const b = { x: [1, { y: 2 }] };")
            .unwrap();
        let mut interpreter = Interpreter::new(EvalOptions::default());
        assert!(interpreter.run_program(&program).is_ok());
        let a = interpreter.global_binding("a").unwrap();
        let b = interpreter.global_binding("b").unwrap();
        assert!(equals(&a, &b));
        assert!(!equals(&a, &Value::Null));
    }
}
