//! `call`, `apply`, `bind` and `toString` on functions.

use super::arg;
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::value::{Function, JsObject, NativeFn, ObjectKind, Value};

pub fn install(interpreter: &mut Interpreter) {
    super::define_constructor(interpreter, "Function", function_call, None, 1, &[]);
}

pub fn method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "call" => call,
        "apply" => apply,
        "bind" => bind,
        "toString" => to_string,
        _ => return None,
    })
}

fn function_call(interpreter: &mut Interpreter, _this: &Value, _args: &[Value]) -> EvalResult<Value> {
    interpreter.throw("EvalError", "Code generation from strings disallowed for this context")
}

fn call(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let receiver = arg(args, 0);
    let rest = args.get(1..).unwrap_or_default();
    interpreter.call(this, &receiver, rest)
}

fn apply(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let receiver = arg(args, 0);
    let list = match arg(args, 1) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Object(object) if object.is_array() => object.array_items().unwrap_or_default(),
        _ => return interpreter.type_error("CreateListFromArrayLike called on non-object"),
    };
    interpreter.call(this, &receiver, &list)
}

fn bind(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    if !this.is_callable() {
        return interpreter.type_error("Bind must be called on a function");
    }
    let bound = Function::Bound {
        target: this.clone(),
        this: arg(args, 0),
        args: args.get(1..).unwrap_or_default().to_vec(),
    };
    Ok(Value::Object(
        interpreter.alloc(JsObject::new(ObjectKind::Function(bound))),
    ))
}

fn to_string(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    match this.as_object().and_then(|o| o.function()) {
        Some(function) => Ok(Value::string(function.source_text())),
        None => interpreter.type_error("Function.prototype.toString requires that 'this' be a Function"),
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_call_apply_bind() {
        assert_eq!(
            eval_json("(function (a, b) { return [this.x, a, b]; }).call({ x: 1 }, 2, 3)"),
            "[1,2,3]"
        );
        assert_eq!(eval_json("Math.max.apply(null, [1, 5, 2])"), "5");
        assert_eq!(
            eval_json("(() => { const add = (a, b) => a + b; const inc = add.bind(null, 1); return [inc(4), inc.length, inc.name]; })()"),
            r#"[5,1,"bound add"]"#
        );
    }

    #[test]
    fn test_source_text() {
        assert_eq!(eval_json("(function f(a) { return a; }).toString()"), r#""function f(a) { return a; }""#);
        assert_eq!(eval_json("String(Math.abs)"), r#""function abs() { [native code] }""#);
        assert_eq!(
            eval_error("Function('return 1');"),
            "Code generation from strings disallowed for this context"
        );
    }
}
