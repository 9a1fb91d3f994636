//! Error constructors. Each one works with or without `new`.

use super::arg;
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::value::{to_js_string, NativeFn, ObjectKind, Value};

macro_rules! error_constructors {
    ($($name:ident => $label:literal),* $(,)?) => {
        $(
            fn $name(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
                construct(interpreter, $label, args)
            }
        )*

        pub fn install(interpreter: &mut Interpreter) {
            $(
                super::define_constructor(interpreter, $label, $name, Some($name), 1, &[]);
            )*
        }
    };
}

error_constructors! {
    error => "Error",
    type_error => "TypeError",
    range_error => "RangeError",
    syntax_error => "SyntaxError",
    reference_error => "ReferenceError",
    eval_error => "EvalError",
}

pub fn method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "toString" => to_string,
        _ => return None,
    })
}

fn construct(interpreter: &mut Interpreter, name: &str, args: &[Value]) -> EvalResult<Value> {
    let message = match arg(args, 0) {
        Value::Undefined => String::new(),
        other => to_js_string(&other).to_string(),
    };
    Ok(interpreter.make_error(name, message))
}

fn to_string(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let (name, message) = match this.as_object().map(|o| o.borrow()) {
        Some(inner) => match &inner.kind {
            ObjectKind::Error(error) => (error.name.to_string(), error.message.to_string()),
            _ => ("Error".to_string(), String::new()),
        },
        None => ("Error".to_string(), String::new()),
    };
    Ok(Value::string(match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{}: {}", name, message),
    }))
}

#[cfg(test)]
mod tests {
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_error_values() {
        assert_eq!(
            eval_json("(() => { const e = new RangeError('bad'); return [e.name, e.message, String(e), e instanceof Error, e instanceof TypeError]; })()"),
            r#"["RangeError","bad","RangeError: bad",true,false]"#
        );
        assert_eq!(eval_json("TypeError('x').toString()"), r#""TypeError: x""#);
        assert_eq!(eval_json("new Error().message"), r#""""#);
    }

    #[test]
    fn test_thrown_errors_carry_stack() {
        assert_eq!(
            eval_json("(() => { try { throw new Error('boom'); } catch (e) { return e.stack.split('\\n')[0]; } })()"),
            r#""Error: boom""#
        );
        assert_eq!(eval_error("throw new SyntaxError('nope');"), "nope");
        assert_eq!(eval_error("throw { message: 'plain' };"), "plain");
        assert_eq!(eval_error("throw 42;"), "42");
    }
}
