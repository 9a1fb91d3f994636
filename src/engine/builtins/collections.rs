//! `Map` and `Set`. Entries keep insertion order; keys compare by SameValueZero.
//! `keys`, `values` and `entries` return arrays rather than iterators.

use indexmap::IndexMap;

use super::arg;
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::value::{
    describe_for_error, to_js_string, JsObject, MapKey, NativeFn, ObjRef, ObjectKind, PropertyKey,
    Value,
};

pub fn install(interpreter: &mut Interpreter) {
    super::define_constructor(interpreter, "Map", map_call, Some(construct_map), 0, &[]);
    super::define_constructor(interpreter, "Set", set_call, Some(construct_set), 0, &[]);
}

pub fn map_method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "get" => map_get,
        "set" => map_set,
        "has" => map_has,
        "delete" => map_delete,
        "clear" => clear,
        "forEach" => map_for_each,
        "keys" => map_keys,
        "values" => map_values,
        "entries" => map_entries,
        _ => return None,
    })
}

pub fn set_method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "add" => set_add,
        "has" => set_has,
        "delete" => set_delete,
        "clear" => clear,
        "forEach" => set_for_each,
        "keys" | "values" => set_values,
        "entries" => set_entries,
        _ => return None,
    })
}

/// `-0` is stored as `+0`, as the host does.
fn normalize_key(value: Value) -> Value {
    match value {
        Value::Number(n) if n == 0.0 => Value::Number(0.0),
        other => other,
    }
}

fn map_call(interpreter: &mut Interpreter, _this: &Value, _args: &[Value]) -> EvalResult<Value> {
    interpreter.type_error("Constructor Map requires 'new'")
}

fn set_call(interpreter: &mut Interpreter, _this: &Value, _args: &[Value]) -> EvalResult<Value> {
    interpreter.type_error("Constructor Set requires 'new'")
}

fn initial_items(interpreter: &mut Interpreter, args: &[Value]) -> EvalResult<Vec<Value>> {
    match arg(args, 0) {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        source => interpreter.iterate(&source),
    }
}

fn construct_map(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut entries = IndexMap::new();
    for entry in initial_items(interpreter, args)? {
        if !matches!(entry, Value::Object(_)) {
            return interpreter.type_error(format!(
                "Iterator value {} is not an entry object",
                to_js_string(&entry)
            ));
        }
        let key = normalize_key(interpreter.get(&entry, &PropertyKey::Index(0))?);
        let value = interpreter.get(&entry, &PropertyKey::Index(1))?;
        entries.insert(MapKey::from_value(&key), (key, value));
    }
    Ok(Value::Object(
        interpreter.alloc(JsObject::new(ObjectKind::Map(entries))),
    ))
}

fn construct_set(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut entries = IndexMap::new();
    for item in initial_items(interpreter, args)? {
        let item = normalize_key(item);
        entries.entry(MapKey::from_value(&item)).or_insert(item);
    }
    Ok(Value::Object(
        interpreter.alloc(JsObject::new(ObjectKind::Set(entries))),
    ))
}

fn this_map<'a>(interpreter: &mut Interpreter, this: &'a Value, method: &str) -> EvalResult<&'a ObjRef> {
    super::this_object(interpreter, this, method, |kind| matches!(kind, ObjectKind::Map(_)))
}

fn this_set<'a>(interpreter: &mut Interpreter, this: &'a Value, method: &str) -> EvalResult<&'a ObjRef> {
    super::this_object(interpreter, this, method, |kind| matches!(kind, ObjectKind::Set(_)))
}

fn map_pairs(object: &ObjRef) -> Vec<(Value, Value)> {
    match &object.borrow().kind {
        ObjectKind::Map(entries) => entries.values().cloned().collect(),
        _ => Vec::new(),
    }
}

fn set_items(object: &ObjRef) -> Vec<Value> {
    match &object.borrow().kind {
        ObjectKind::Set(entries) => entries.values().cloned().collect(),
        _ => Vec::new(),
    }
}

fn map_get(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let map = this_map(interpreter, this, "Map.prototype.get")?;
    let key = MapKey::from_value(&arg(args, 0));
    Ok(match &map.borrow().kind {
        ObjectKind::Map(entries) => entries
            .get(&key)
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    })
}

fn map_set(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let map = this_map(interpreter, this, "Map.prototype.set")?;
    let key = normalize_key(arg(args, 0));
    if let ObjectKind::Map(entries) = &mut map.borrow_mut().kind {
        entries.insert(MapKey::from_value(&key), (key, arg(args, 1)));
    }
    Ok(this.clone())
}

fn map_has(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let map = this_map(interpreter, this, "Map.prototype.has")?;
    let key = MapKey::from_value(&arg(args, 0));
    Ok(Value::Bool(match &map.borrow().kind {
        ObjectKind::Map(entries) => entries.contains_key(&key),
        _ => false,
    }))
}

fn map_delete(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let map = this_map(interpreter, this, "Map.prototype.delete")?;
    let key = MapKey::from_value(&arg(args, 0));
    Ok(Value::Bool(match &mut map.borrow_mut().kind {
        ObjectKind::Map(entries) => entries.shift_remove(&key).is_some(),
        _ => false,
    }))
}

fn clear(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let object = super::this_object(interpreter, this, "clear", |kind| {
        matches!(kind, ObjectKind::Map(_) | ObjectKind::Set(_))
    })?;
    match &mut object.borrow_mut().kind {
        ObjectKind::Map(entries) => entries.clear(),
        ObjectKind::Set(entries) => entries.clear(),
        _ => {}
    }
    Ok(Value::Undefined)
}

fn callback(interpreter: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let f = arg(args, 0);
    if !f.is_callable() {
        return interpreter.type_error(format!("{} is not a function", describe_for_error(&f)));
    }
    Ok(f)
}

fn map_for_each(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let map = this_map(interpreter, this, "Map.prototype.forEach")?;
    let f = callback(interpreter, args)?;
    for (key, value) in map_pairs(map) {
        interpreter.call(&f, &arg(args, 1), &[value, key, this.clone()])?;
    }
    Ok(Value::Undefined)
}

fn map_keys(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let map = this_map(interpreter, this, "Map.prototype.keys")?;
    let keys = map_pairs(map).into_iter().map(|(key, _)| key).collect();
    Ok(interpreter.new_array(keys))
}

fn map_values(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let map = this_map(interpreter, this, "Map.prototype.values")?;
    let values = map_pairs(map).into_iter().map(|(_, value)| value).collect();
    Ok(interpreter.new_array(values))
}

fn map_entries(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let map = this_map(interpreter, this, "Map.prototype.entries")?;
    let entries = map_pairs(map)
        .into_iter()
        .map(|(key, value)| interpreter.new_array(vec![key, value]))
        .collect();
    Ok(interpreter.new_array(entries))
}

fn set_add(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let set = this_set(interpreter, this, "Set.prototype.add")?;
    let item = normalize_key(arg(args, 0));
    if let ObjectKind::Set(entries) = &mut set.borrow_mut().kind {
        entries.entry(MapKey::from_value(&item)).or_insert(item);
    }
    Ok(this.clone())
}

fn set_has(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let set = this_set(interpreter, this, "Set.prototype.has")?;
    let key = MapKey::from_value(&arg(args, 0));
    Ok(Value::Bool(match &set.borrow().kind {
        ObjectKind::Set(entries) => entries.contains_key(&key),
        _ => false,
    }))
}

fn set_delete(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let set = this_set(interpreter, this, "Set.prototype.delete")?;
    let key = MapKey::from_value(&arg(args, 0));
    Ok(Value::Bool(match &mut set.borrow_mut().kind {
        ObjectKind::Set(entries) => entries.shift_remove(&key).is_some(),
        _ => false,
    }))
}

fn set_for_each(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let set = this_set(interpreter, this, "Set.prototype.forEach")?;
    let f = callback(interpreter, args)?;
    for item in set_items(set) {
        interpreter.call(&f, &arg(args, 1), &[item.clone(), item, this.clone()])?;
    }
    Ok(Value::Undefined)
}

fn set_values(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let set = this_set(interpreter, this, "Set.prototype.values")?;
    let items = set_items(set);
    Ok(interpreter.new_array(items))
}

fn set_entries(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let set = this_set(interpreter, this, "Set.prototype.entries")?;
    let entries = set_items(set)
        .into_iter()
        .map(|item| interpreter.new_array(vec![item.clone(), item]))
        .collect();
    Ok(interpreter.new_array(entries))
}

#[cfg(test)]
mod tests {
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_map_operations() {
        assert_eq!(
            eval_json("(() => { const m = new Map([['a', 1]]); m.set('b', 2).set('a', 3); m.delete('b'); return [m.get('a'), m.has('b'), m.size, m.entries()]; })()"),
            r#"[3,false,1,[["a",3]]]"#
        );
        assert_eq!(
            eval_json("(() => { const m = new Map(); m.set(NaN, 'n').set(-0, 'z'); return [m.get(NaN), m.get(0), Object.is(m.keys()[1], 0)]; })()"),
            r#"["n","z",true]"#
        );
        assert_eq!(
            eval_json("(() => { const m = new Map([[1, 'x'], [2, 'y']]); const out = []; m.forEach((v, k) => out.push(k + v)); return out; })()"),
            r#"["1x","2y"]"#
        );
    }

    #[test]
    fn test_set_operations() {
        assert_eq!(eval_json("[...new Set('banana')]"), r#"["b","a","n"]"#);
        assert_eq!(
            eval_json("(() => { const s = new Set([1, 2]); s.add(2).add(3); s.delete(1); return [s.size, s.has(3), s.values()]; })()"),
            "[2,true,[2,3]]"
        );
        assert_eq!(eval_json("(() => { const o = {}; return new Set([o, o, {}]).size; })()"), "2");
    }

    #[test]
    fn test_constructors_require_new() {
        assert_eq!(eval_error("Map();"), "Constructor Map requires 'new'");
        assert_eq!(eval_error("new Map([1]);"), "Iterator value 1 is not an entry object");
    }
}
