//! `Object` statics and the methods every object answers to.

use super::arg;
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::value::{
    describe_for_error, same_value, to_js_string, JsString, NativeFn, PropertyKey, Value,
};

pub fn install(interpreter: &mut Interpreter) {
    super::define_constructor(
        interpreter,
        "Object",
        object_call,
        Some(object_call),
        1,
        &[
            ("keys", keys, 1),
            ("values", values, 1),
            ("entries", entries, 1),
            ("assign", assign, 2),
            ("fromEntries", from_entries, 1),
            ("freeze", freeze, 1),
            ("isFrozen", is_frozen, 1),
            ("create", create, 2),
            ("hasOwn", has_own, 2),
            ("is", is, 2),
            ("getOwnPropertyNames", keys, 1),
        ],
    );
}

pub fn method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "hasOwnProperty" => has_own_property,
        "toString" => to_string,
        "toLocaleString" => to_string,
        "valueOf" => value_of,
        _ => return None,
    })
}

fn object_call(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(match arg(args, 0) {
        value @ Value::Object(_) => value,
        _ => interpreter.new_object(),
    })
}

/// Argument that must be convertible to an object.
fn require_object_coercible(interpreter: &mut Interpreter, value: &Value) -> EvalResult<()> {
    if value.is_nullish() {
        return interpreter.type_error("Cannot convert undefined or null to object");
    }
    Ok(())
}

fn keys(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interpreter, &target)?;
    let keys = interpreter
        .own_entries(&target)
        .into_iter()
        .map(|(key, _)| Value::String(key))
        .collect();
    Ok(interpreter.new_array(keys))
}

fn values(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interpreter, &target)?;
    let values = interpreter
        .own_entries(&target)
        .into_iter()
        .map(|(_, value)| value)
        .collect();
    Ok(interpreter.new_array(values))
}

fn entries(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interpreter, &target)?;
    let pairs = interpreter.own_entries(&target);
    let entries = pairs
        .into_iter()
        .map(|(key, value)| interpreter.new_array(vec![Value::String(key), value]))
        .collect();
    Ok(interpreter.new_array(entries))
}

fn assign(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interpreter, &target)?;
    if !matches!(target, Value::Object(_)) {
        return interpreter.type_error(format!(
            "Object.assign target {} is not an object",
            describe_for_error(&target)
        ));
    }
    for source in args.iter().skip(1) {
        for (key, value) in interpreter.own_entries(source) {
            interpreter.set(&target, &PropertyKey::from_str(&key), value)?;
        }
    }
    Ok(target)
}

fn from_entries(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let pairs = interpreter.iterate(&arg(args, 0))?;
    let result = interpreter.new_object();
    for pair in pairs {
        if !matches!(pair, Value::Object(_)) {
            return interpreter.type_error(format!(
                "Iterator value {} is not an entry object",
                to_js_string(&pair)
            ));
        }
        let key = interpreter.get(&pair, &PropertyKey::Index(0))?;
        let value = interpreter.get(&pair, &PropertyKey::Index(1))?;
        interpreter.set(&result, &PropertyKey::from_value(&key), value)?;
    }
    Ok(result)
}

fn freeze(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    if let Value::Object(object) = &target {
        object.borrow_mut().frozen = true;
    }
    Ok(target)
}

fn is_frozen(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(match arg(args, 0) {
        Value::Object(object) => object.borrow().frozen,
        _ => true,
    }))
}

/// Objects carry no prototype chain, so only `Object.create(null)` is accepted.
fn create(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match arg(args, 0) {
        Value::Null => {}
        Value::Object(_) => {
            return interpreter
                .type_error("Object.create with a prototype object is not supported");
        }
        other => {
            return interpreter.type_error(format!(
                "Object prototype may only be an Object or null: {}",
                to_js_string(&other)
            ))
        }
    }
    if let Value::Object(_) = arg(args, 1) {
        return interpreter.type_error("Object.create property descriptors are not supported");
    }
    Ok(interpreter.new_object())
}

fn own_property(interpreter: &mut Interpreter, target: &Value, key: &Value) -> EvalResult<bool> {
    require_object_coercible(interpreter, target)?;
    let key = to_js_string(key);
    Ok(interpreter
        .own_entries(target)
        .iter()
        .any(|(own, _)| own.as_str() == key.as_str()))
}

fn has_own(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    own_property(interpreter, &arg(args, 0), &arg(args, 1)).map(Value::Bool)
}

fn is(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(same_value(&arg(args, 0), &arg(args, 1))))
}

fn has_own_property(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    own_property(interpreter, this, &arg(args, 0)).map(Value::Bool)
}

fn to_string(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let tag = match this {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        Value::Object(object) => object.class_name(),
        Value::String(_) => "String",
        Value::Number(_) => "Number",
        Value::Bool(_) => "Boolean",
    };
    Ok(Value::String(JsString::from(format!("[object {}]", tag))))
}

fn value_of(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(this.clone())
}

#[cfg(test)]
mod tests {
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_key_order_puts_integer_keys_first() {
        assert_eq!(eval_json("Object.keys({ b: 1, 2: 0, a: 2, 1: 0 })"), r#"["1","2","b","a"]"#);
        assert_eq!(eval_json("Object.entries({ x: 1 })"), r#"[["x",1]]"#);
        assert_eq!(eval_json("Object.values([3, 4])"), "[3,4]");
        assert_eq!(eval_json("Object.keys('ab')"), r#"["0","1"]"#);
    }

    #[test]
    fn test_assign_and_from_entries() {
        assert_eq!(eval_json("Object.assign({ a: 1 }, { b: 2 }, null, { a: 3 })"), r#"{"a":3,"b":2}"#);
        assert_eq!(eval_json("Object.fromEntries([['a', 1], ['b', 2]])"), r#"{"a":1,"b":2}"#);
        assert_eq!(eval_json("Object.fromEntries(new Map([['k', 'v']]))"), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_freeze_and_ownership() {
        assert_eq!(
            eval_json("(() => { const o = Object.freeze({ a: 1 }); return [Object.isFrozen(o), o.hasOwnProperty('a'), Object.hasOwn(o, 'b')]; })()"),
            "[true,true,false]"
        );
        assert_eq!(eval_json("Object.prototype"), "undefined");
        assert_eq!(eval_json("({}).toString()"), r#""[object Object]""#);
        assert_eq!(eval_json("Object.keys(Object.create(null))"), "[]");
        assert_eq!(eval_error("Object.keys(null);"), "Cannot convert undefined or null to object");
    }
}
