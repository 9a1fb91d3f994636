//! `JSON.stringify` and `JSON.parse`.
//!
//! [`stringify`] is also the serializer behind the value formatter, so it
//! follows the host serializer's rules exactly: non-finite numbers become
//! `null`, `undefined` and functions are dropped from objects and become
//! `null` in arrays, and every non-array object kind contributes only its own
//! enumerable properties.

use thiserror::Error;

use super::arg;
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::number::{number_to_string, to_integer};
use crate::engine::value::{to_js_string, JsObject, ObjRef, Value};

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("Converting circular structure to JSON")]
    Circular,
}

pub fn install(interpreter: &mut Interpreter) {
    let json = super::namespace(
        interpreter,
        &[("stringify", json_stringify, 3), ("parse", json_parse, 2)],
    );
    interpreter.define_global("JSON", Value::Object(json));
}

/// Serialize `value`; `None` when the value itself is not serializable.
pub fn stringify(value: &Value, gap: &str) -> Result<Option<String>, JsonError> {
    let mut serializer = Serializer {
        gap,
        indent: String::new(),
        stack: Vec::new(),
    };
    serializer.value(value)
}

struct Serializer<'a> {
    gap: &'a str,
    indent: String,
    stack: Vec<ObjRef>,
}

impl Serializer<'_> {
    fn value(&mut self, value: &Value) -> Result<Option<String>, JsonError> {
        Ok(Some(match value {
            Value::Undefined => return Ok(None),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if n.is_finite() => number_to_string(*n),
            Value::Number(_) => "null".to_string(),
            Value::String(s) => quote(s),
            Value::Object(object) => {
                if object.is_function() {
                    return Ok(None);
                }
                if self.stack.iter().any(|seen| seen.ptr_eq(object)) {
                    return Err(JsonError::Circular);
                }
                self.stack.push(object.clone());
                let result = match object.array_items() {
                    Some(items) => self.array(&items),
                    None => {
                        let entries = enumerable_entries(&object.borrow());
                        self.object(&entries)
                    }
                };
                self.stack.pop();
                result?
            }
        }))
    }

    fn array(&mut self, items: &[Value]) -> Result<String, JsonError> {
        if items.is_empty() {
            return Ok("[]".to_string());
        }
        let outer = self.indent.clone();
        self.indent.push_str(self.gap);
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            parts.push(self.value(item)?.unwrap_or_else(|| "null".to_string()));
        }
        let text = self.wrap('[', parts, ']', &outer);
        self.indent = outer;
        Ok(text)
    }

    fn object(&mut self, entries: &[(String, Value)]) -> Result<String, JsonError> {
        let outer = self.indent.clone();
        self.indent.push_str(self.gap);
        let separator = if self.gap.is_empty() { ":" } else { ": " };
        let mut parts = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if let Some(text) = self.value(value)? {
                parts.push(format!("{}{}{}", quote(key), separator, text));
            }
        }
        let text = if parts.is_empty() {
            "{}".to_string()
        } else {
            self.wrap('{', parts, '}', &outer)
        };
        self.indent = outer;
        Ok(text)
    }

    fn wrap(&self, open: char, parts: Vec<String>, close: char, outer: &str) -> String {
        if self.gap.is_empty() {
            return format!("{}{}{}", open, parts.join(","), close);
        }
        let separator = format!(",\n{}", self.indent);
        format!(
            "{}\n{}{}\n{}{}",
            open,
            self.indent,
            parts.join(&separator),
            outer,
            close
        )
    }
}

fn enumerable_entries(object: &JsObject) -> Vec<(String, Value)> {
    object
        .own_keys()
        .into_iter()
        .filter_map(|key| {
            let value = object.props.get(&key)?.clone();
            Some((key.to_string(), value))
        })
        .collect()
}

/// JSON string literal with the host serializer's escapes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Indentation unit from the `space` argument of `JSON.stringify`.
fn gap_from(space: &Value) -> String {
    match space {
        Value::Number(n) => " ".repeat(to_integer(*n).clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    }
}

fn json_stringify(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let gap = gap_from(&arg(args, 2));
    match stringify(&arg(args, 0), &gap) {
        Ok(Some(text)) => Ok(Value::string(text)),
        Ok(None) => Ok(Value::Undefined),
        Err(err) => interpreter.type_error(err.to_string()),
    }
}

fn json_parse(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = to_js_string(&arg(args, 0));
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => Ok(interpreter.from_json(&json)),
        Err(err) => {
            let shown: String = text.chars().take(32).collect();
            interpreter.throw(
                "SyntaxError",
                format!("\"{}\" is not valid JSON ({})", shown, err),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_primitives_and_escapes() {
        assert_eq!(stringify(&Value::string("a\"b\n\u{1}"), "").unwrap().unwrap(), r#""a\"b\n\u0001""#);
        assert_eq!(stringify(&Value::Number(f64::NAN), "").unwrap().unwrap(), "null");
        assert!(stringify(&Value::Undefined, "").unwrap().is_none());
    }

    #[test]
    fn test_host_serializer_rules() {
        assert_eq!(eval_json("[undefined, () => 1, Infinity]"), "[null,null,null]");
        assert_eq!(eval_json("{ a: undefined, b: () => 1, c: 1 }"), r#"{"c":1}"#);
        assert_eq!(eval_json("[new Map([[1, 2]]), new Set([1]), /x/g, new Error('e')]"), "[{},{},{},{}]");
        assert_eq!(eval_json("JSON.stringify({ a: [1, { b: 2 }], c: {} }, null, 2)"), r#""{\n  \"a\": [\n    1,\n    {\n      \"b\": 2\n    }\n  ],\n  \"c\": {}\n}""#);
    }

    #[test]
    fn test_circular_structures_throw() {
        assert_eq!(
            eval_error("const a = {}; a.self = a; JSON.stringify(a);"),
            "Converting circular structure to JSON"
        );
        assert_eq!(eval_json("(() => { const x = [1]; return [x, x]; })()"), "[[1],[1]]");
    }

    #[test]
    fn test_parse() {
        assert_eq!(eval_json(r#"JSON.parse('{"b": [1, 2.5, null], "a": "x"}')"#), r#"{"b":[1,2.5,null],"a":"x"}"#);
        assert!(eval_error("JSON.parse('{oops}');").contains("is not valid JSON"));
    }
}
