//! Value formatter - display form of runtime values
//!
//! Used for argument lists, expected/received values and ad-hoc results:
//! - strings: quoted JSON string literal
//! - `undefined`: `undefined`
//! - functions: their source text
//! - everything else: `JSON.stringify(value, null, 2)`, falling back to the
//!   value's string conversion when the structure is circular

use crate::engine::builtins::json;
use crate::engine::value::{to_js_string, Value};

const INDENT: &str = "  ";

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => json::quote(s),
        Value::Undefined => "undefined".to_string(),
        Value::Object(object) => match object.function() {
            Some(function) => function.source_text(),
            None => serialize(value),
        },
        _ => serialize(value),
    }
}

fn serialize(value: &Value) -> String {
    match json::stringify(value, INDENT) {
        Ok(Some(text)) => text,
        Ok(None) | Err(_) => to_js_string(value).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::parse_program;
    use crate::engine::{EvalOptions, Interpreter};

    fn format_source(expr: &str) -> String {
        let program = parse_program(&format!("const value = {};", expr)).unwrap();
        let mut interpreter = Interpreter::new(EvalOptions::default());
        if interpreter.run_program(&program).is_err() {
            panic!("program failed: {}", expr);
        }
        format_value(&interpreter.global_binding("value").unwrap())
    }

    #[test]
    fn test_primitives() {
        assert_eq!(format_source("'he said \"hi\"\\n'"), r#""he said \"hi\"\n""#);
        assert_eq!(format_source("undefined"), "undefined");
        assert_eq!(format_source("null"), "null");
        assert_eq!(format_source("true"), "true");
        assert_eq!(format_source("-0"), "0");
        assert_eq!(format_source("NaN"), "null");
        assert_eq!(format_source("1e21"), "1e+21");
    }

    #[test]
    fn test_structures_use_two_space_indent() {
        assert_eq!(format_source("[]"), "[]");
        assert_eq!(format_source("{}"), "{}");
        assert_eq!(format_source("[1, 'a']"), "[\n  1,\n  \"a\"\n]");
        assert_eq!(
            format_source("{ a: [1], b: { c: null } }"),
            "{\n  \"a\": [\n    1\n  ],\n  \"b\": {\n    \"c\": null\n  }\n}"
        );
    }

    #[test]
    fn test_host_serializer_rules() {
        assert_eq!(
            format_source("[undefined, () => 1, Infinity]"),
            "[\n  null,\n  null,\n  null\n]"
        );
        assert_eq!(format_source("{ a: undefined, f() {}, b: 2 }"), "{\n  \"b\": 2\n}");
        assert_eq!(format_source("new Map([[1, 2]])"), "{}");
        assert_eq!(format_source("new Set([1])"), "{}");
        assert_eq!(format_source("new Error('x')"), "{}");
        assert_eq!(format_source("/a+/g"), "{}");
    }

    #[test]
    fn test_functions_render_source() {
        assert_eq!(format_source("(a, b) => a + b"), "(a, b) => a + b");
        assert_eq!(
            format_source("function add(a, b) { return a + b; }"),
            "function add(a, b) { return a + b; }"
        );
        assert_eq!(format_source("Math.max"), "function max() { [native code] }");
    }

    #[test]
    fn test_circular_falls_back_to_string_conversion() {
        let program =
            parse_program("const obj = {}; obj.self = obj; const arr = [1, 2]; arr.push(arr);")
                .unwrap();
        let mut interpreter = Interpreter::new(EvalOptions::default());
        assert!(interpreter.run_program(&program).is_ok());
        assert_eq!(
            format_value(&interpreter.global_binding("obj").unwrap()),
            "[object Object]"
        );
        assert_eq!(format_value(&interpreter.global_binding("arr").unwrap()), "1,2,");
    }

    #[test]
    fn test_deterministic() {
        let source = "{ z: 1, a: [3, { y: 'q' }], 2: 'two', 1: 'one' }";
        assert_eq!(format_source(source), format_source(source));
        assert!(format_source(source).starts_with("{\n  \"1\": \"one\",\n  \"2\": \"two\",\n  \"z\""));
    }
}
