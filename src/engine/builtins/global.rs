//! Global constants, global functions and `console`.

use tracing::debug;

use super::arg;
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::number::{parse_float as parse_float_text, parse_int as parse_int_text, to_int32};
use crate::engine::value::{to_js_string, to_number, JsString, NativeFn, Value};

pub fn install(interpreter: &mut Interpreter) {
    interpreter.define_global_constant("undefined", Value::Undefined);
    interpreter.define_global_constant("NaN", Value::Number(f64::NAN));
    interpreter.define_global_constant("Infinity", Value::Number(f64::INFINITY));

    let functions: [(&str, NativeFn, u32); 4] = [
        ("parseInt", parse_int, 2),
        ("parseFloat", parse_float, 1),
        ("isNaN", is_nan, 1),
        ("isFinite", is_finite, 1),
    ];
    for (name, function, length) in functions {
        let value = interpreter.native_function(name, function, None, length);
        interpreter.define_global(name, value);
    }

    let console = super::namespace(
        interpreter,
        &[
            ("log", console_log, 0),
            ("info", console_log, 0),
            ("debug", console_log, 0),
            ("warn", console_log, 0),
            ("error", console_log, 0),
        ],
    );
    interpreter.define_global("console", Value::Object(console));
}

pub fn parse_int(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = to_js_string(&arg(args, 0));
    let radix = match arg(args, 1) {
        Value::Undefined => None,
        other => Some(to_int32(to_number(&other)) as u32),
    };
    Ok(Value::Number(parse_int_text(&text, radix)))
}

pub fn parse_float(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = to_js_string(&arg(args, 0));
    Ok(Value::Number(parse_float_text(&text)))
}

fn is_nan(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(to_number(&arg(args, 0)).is_nan()))
}

fn is_finite(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(to_number(&arg(args, 0)).is_finite()))
}

/// Console output of user code goes to the trace log, never to the report.
fn console_log(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let line = args
        .iter()
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => to_js_string(other),
        })
        .collect::<Vec<JsString>>()
        .join(" ");
    debug!(target: "practice_judge::console", "{}", line);
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_global_functions() {
        assert_eq!(eval_json("parseInt('42px')"), "42");
        assert_eq!(eval_json("parseInt('ff', 16)"), "255");
        assert_eq!(eval_json("parseFloat('3.5e1x')"), "35");
        assert_eq!(eval_json("[isNaN('abc'), isFinite('12'), isFinite(Infinity)]"), "[true,true,false]");
    }

    #[test]
    fn test_constants_are_read_only_and_console_is_silent() {
        assert_eq!(eval_json("(console.log('hi', 1), typeof undefined)"), r#""undefined""#);
        assert_eq!(eval_json("NaN === NaN"), "false");
        assert_eq!(
            eval_error("undefined = 1;"),
            "Cannot assign to read only property 'undefined' of object '#<Object>'"
        );
    }
}
