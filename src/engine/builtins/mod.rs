//! Built-in globals of a fresh realm and the instance methods of each value kind.
//!
//! Instance methods are not stored on the objects: a member lookup that misses
//! the object's own properties falls back to [`lookup_method`], keyed by the
//! receiver's kind.

pub mod array;
pub mod collections;
pub mod error;
pub mod function;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod regexp;
pub mod string;

use super::interpreter::{EvalResult, Interpreter};
use super::value::{JsObject, JsString, NativeFn, ObjRef, ObjectKind, Value};

/// `(name, function, length)` of a static member.
pub type Member = (&'static str, NativeFn, u32);

pub fn install(interpreter: &mut Interpreter) {
    global::install(interpreter);
    object::install(interpreter);
    function::install(interpreter);
    array::install(interpreter);
    string::install(interpreter);
    number::install(interpreter);
    math::install(interpreter);
    json::install(interpreter);
    collections::install(interpreter);
    regexp::install(interpreter);
    error::install(interpreter);
}

/// Built-in method `name` for values of the receiver's kind.
pub fn lookup_method(receiver: &Value, name: &str) -> Option<NativeFn> {
    match receiver {
        Value::String(_) => string::method(name),
        Value::Number(_) => number::method(name),
        Value::Bool(_) => number::boolean_method(name),
        Value::Object(object) => {
            let specific = match &object.borrow().kind {
                ObjectKind::Array(_) => array::method(name),
                ObjectKind::Function(_) => function::method(name),
                ObjectKind::Error(_) => error::method(name),
                ObjectKind::Map(_) => collections::map_method(name),
                ObjectKind::Set(_) => collections::set_method(name),
                ObjectKind::RegExp(_) => regexp::method(name),
                ObjectKind::Ordinary => None,
            };
            specific.or_else(|| object::method(name))
        }
        Value::Undefined | Value::Null => None,
    }
}

/// `object instanceof <built-in constructor named constructor>`.
pub fn is_instance(constructor: &str, object: &ObjRef) -> bool {
    let inner = object.borrow();
    match (constructor, &inner.kind) {
        ("Object", _) => true,
        ("Array", ObjectKind::Array(_)) => true,
        ("Function", ObjectKind::Function(_)) => true,
        ("Map", ObjectKind::Map(_)) => true,
        ("Set", ObjectKind::Set(_)) => true,
        ("RegExp", ObjectKind::RegExp(_)) => true,
        ("Error", ObjectKind::Error(_)) => true,
        (name, ObjectKind::Error(error)) => error.name.as_str() == name,
        _ => false,
    }
}

pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Object holding native functions, e.g. `Math` or `JSON`.
pub fn namespace(interpreter: &mut Interpreter, members: &[Member]) -> ObjRef {
    let object = interpreter.alloc(JsObject::new(ObjectKind::Ordinary));
    add_members(interpreter, &object, members);
    object
}

pub fn add_members(interpreter: &mut Interpreter, target: &ObjRef, members: &[Member]) {
    for (name, function, length) in members {
        let value = interpreter.native_function(name, *function, None, *length);
        target.borrow_mut().props.insert(JsString::from(*name), value);
    }
}

/// Register a global constructor with its static members.
pub fn define_constructor(
    interpreter: &mut Interpreter,
    name: &str,
    call: NativeFn,
    construct: Option<NativeFn>,
    length: u32,
    statics: &[Member],
) -> ObjRef {
    let constructor = interpreter.native_object(name, call, construct, length);
    add_members(interpreter, &constructor, statics);
    interpreter.define_global(name, Value::Object(constructor.clone()));
    constructor
}

/// Receiver as an object of the expected kind, or a `TypeError` naming the method.
pub fn this_object<'a>(
    interpreter: &mut Interpreter,
    this: &'a Value,
    method: &str,
    accepts: fn(&ObjectKind) -> bool,
) -> EvalResult<&'a ObjRef> {
    match this {
        Value::Object(object) if accepts(&object.borrow().kind) => Ok(object),
        other => interpreter.type_error(format!(
            "Method {} called on incompatible receiver {}",
            method,
            super::value::describe_for_error(other)
        )),
    }
}

/// Relative index argument (`slice`, `at`, `splice`) resolved against `len`.
pub fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = super::number::to_integer(super::value::to_number(value));
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::engine::interpreter::{describe_thrown, EvalOptions, Interpreter, Unwind};
    use crate::engine::parser::parse_program;
    use crate::engine::value::Value;

    /// Evaluate an expression and render it through `JSON.stringify`.
    pub fn eval_json(src: &str) -> String {
        let program = parse_program(&format!("const __result = JSON.stringify({});", src))
            .expect("expression parses");
        let mut interpreter = Interpreter::new(EvalOptions::default());
        match interpreter.run_program(&program) {
            Ok(()) => match interpreter.global_binding("__result") {
                Some(Value::String(s)) => s.to_string(),
                Some(Value::Undefined) => "undefined".to_string(),
                other => format!("{:?}", other),
            },
            Err(Unwind::Throw(value)) => format!("threw {}", describe_thrown(&value).0),
            Err(_) => "interrupted".to_string(),
        }
    }

    /// Run statements and return the thrown error's message.
    pub fn eval_error(src: &str) -> String {
        let program = parse_program(src).expect("program parses");
        let mut interpreter = Interpreter::new(EvalOptions::default());
        match interpreter.run_program(&program) {
            Err(Unwind::Throw(value)) => describe_thrown(&value).0,
            _ => "no error".to_string(),
        }
    }
}
