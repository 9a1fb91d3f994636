//! `Array` statics and array instance methods.
//!
//! Callback-taking methods fix the length when they start and read each
//! element live, so callbacks that mutate the array see the host's behaviour.

use std::cmp::Ordering;

use super::{arg, relative_index};
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::number::to_integer;
use crate::engine::value::{
    describe_for_error, same_value_zero, strict_equals, to_js_string, to_number, JsString,
    NativeFn, ObjRef, ObjectKind, PropertyKey, Value,
};

/// Longest array `Array(n)`, `Array.from` or `fill` will materialise.
const MAX_DENSE_LENGTH: usize = 1 << 24;

pub fn install(interpreter: &mut Interpreter) {
    super::define_constructor(
        interpreter,
        "Array",
        construct_array,
        Some(construct_array),
        1,
        &[("isArray", is_array, 1), ("from", from, 1), ("of", of, 0)],
    );
}

pub fn method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "push" => push,
        "pop" => pop,
        "shift" => shift,
        "unshift" => unshift,
        "splice" => splice,
        "reverse" => reverse,
        "sort" => sort,
        "fill" => fill,
        "slice" => slice,
        "concat" => concat,
        "join" => join,
        "toString" => to_string,
        "indexOf" => index_of,
        "lastIndexOf" => last_index_of,
        "includes" => includes,
        "at" => at,
        "find" => find,
        "findIndex" => find_index,
        "findLast" => find_last,
        "findLastIndex" => find_last_index,
        "filter" => filter,
        "map" => map,
        "forEach" => for_each,
        "some" => some,
        "every" => every,
        "reduce" => reduce,
        "reduceRight" => reduce_right,
        "flat" => flat,
        "flatMap" => flat_map,
        "keys" => keys,
        "values" => values,
        "entries" => entries,
        "toSorted" => to_sorted,
        "toReversed" => to_reversed,
        _ => return None,
    })
}

fn this_array<'a>(interpreter: &mut Interpreter, this: &'a Value, method: &str) -> EvalResult<&'a ObjRef> {
    super::this_object(interpreter, this, method, |kind| {
        matches!(kind, ObjectKind::Array(_))
    })
}

fn snapshot(object: &ObjRef) -> Vec<Value> {
    object.array_items().unwrap_or_default()
}

fn length(object: &ObjRef) -> usize {
    match &object.borrow().kind {
        ObjectKind::Array(items) => items.len(),
        _ => 0,
    }
}

fn element(object: &ObjRef, index: usize) -> Option<Value> {
    match &object.borrow().kind {
        ObjectKind::Array(items) => items.get(index).cloned(),
        _ => None,
    }
}

/// Run `f` on the elements of a non-frozen array.
fn modify<R>(
    interpreter: &mut Interpreter,
    object: &ObjRef,
    f: impl FnOnce(&mut Vec<Value>) -> R,
) -> EvalResult<R> {
    let frozen = object.borrow().frozen;
    if frozen {
        return interpreter.type_error("Cannot assign to read only property '0' of object '[object Array]'");
    }
    let mut inner = object.borrow_mut();
    match &mut inner.kind {
        ObjectKind::Array(items) => Ok(f(items)),
        _ => Ok(f(&mut Vec::new())),
    }
}

fn dense_length(interpreter: &mut Interpreter, value: &Value) -> EvalResult<usize> {
    let n = to_number(value);
    if n < 0.0 || n.fract() != 0.0 || n > MAX_DENSE_LENGTH as f64 || n.is_nan() {
        return interpreter.range_error("Invalid array length");
    }
    Ok(n as usize)
}

fn construct_array(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    if let [Value::Number(_)] = args {
        let len = dense_length(interpreter, &args[0])?;
        return Ok(interpreter.new_array(vec![Value::Undefined; len]));
    }
    Ok(interpreter.new_array(args.to_vec()))
}

fn is_array(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(arg(args, 0).is_array()))
}

fn of(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(interpreter.new_array(args.to_vec()))
}

/// `Array.from` over iterables and `{ length }` array-likes.
fn from(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let source = arg(args, 0);
    let mapper = arg(args, 1);
    if !matches!(mapper, Value::Undefined) && !mapper.is_callable() {
        return interpreter.type_error(format!(
            "{} is not a function",
            describe_for_error(&mapper)
        ));
    }
    let items = match &source {
        Value::Undefined | Value::Null => {
            return interpreter.type_error(format!(
                "{} is not iterable",
                to_js_string(&source)
            ))
        }
        Value::Object(object)
            if object.is_ordinary() || object.is_function() =>
        {
            let len = interpreter.get_named(&source, "length")?;
            let len = match len {
                Value::Undefined => 0,
                other => dense_length(interpreter, &Value::Number(to_integer(to_number(&other)).max(0.0)))?,
            };
            let mut items = Vec::with_capacity(len);
            for i in 0..len {
                items.push(interpreter.get(&source, &PropertyKey::Index(i))?);
            }
            items
        }
        Value::Number(_) | Value::Bool(_) => Vec::new(),
        _ => interpreter.iterate(&source)?,
    };
    if matches!(mapper, Value::Undefined) {
        return Ok(interpreter.new_array(items));
    }
    let mut mapped = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        mapped.push(interpreter.call(&mapper, &Value::Undefined, &[item, Value::Number(i as f64)])?);
    }
    Ok(interpreter.new_array(mapped))
}

fn push(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.push")?;
    if array.borrow().frozen {
        return interpreter.type_error(format!(
            "Cannot add property {}, object is not extensible",
            length(array)
        ));
    }
    let len = modify(interpreter, array, |items| {
        items.extend_from_slice(args);
        items.len()
    })?;
    Ok(Value::Number(len as f64))
}

fn pop(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.pop")?;
    Ok(modify(interpreter, array, |items| items.pop())?.unwrap_or(Value::Undefined))
}

fn shift(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.shift")?;
    let first = modify(interpreter, array, |items| {
        (!items.is_empty()).then(|| items.remove(0))
    })?;
    Ok(first.unwrap_or(Value::Undefined))
}

fn unshift(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.unshift")?;
    let len = modify(interpreter, array, |items| {
        items.splice(0..0, args.iter().cloned());
        items.len()
    })?;
    Ok(Value::Number(len as f64))
}

fn splice(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.splice")?;
    let len = length(array);
    let start = relative_index(&arg(args, 0), len, 0);
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => to_integer(to_number(&args[1])).clamp(0.0, (len - start) as f64) as usize,
    };
    let inserted = args.get(2..).unwrap_or_default();
    let removed: Vec<Value> = modify(interpreter, array, |items| {
        items
            .splice(start..start + delete_count, inserted.iter().cloned())
            .collect()
    })?;
    Ok(interpreter.new_array(removed))
}

fn reverse(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.reverse")?;
    modify(interpreter, array, |items| items.reverse())?;
    Ok(this.clone())
}

fn to_reversed(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.toReversed")?;
    let mut items = snapshot(array);
    items.reverse();
    Ok(interpreter.new_array(items))
}

fn fill(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.fill")?;
    let len = length(array);
    let start = relative_index(&arg(args, 1), len, 0);
    let end = relative_index(&arg(args, 2), len, len);
    let value = arg(args, 0);
    modify(interpreter, array, |items| {
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    })?;
    Ok(this.clone())
}

fn sort(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.sort")?;
    let sorted = sort_values(interpreter, snapshot(array), &arg(args, 0))?;
    modify(interpreter, array, |items| *items = sorted)?;
    Ok(this.clone())
}

fn to_sorted(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.toSorted")?;
    let sorted = sort_values(interpreter, snapshot(array), &arg(args, 0))?;
    Ok(interpreter.new_array(sorted))
}

/// Stable sort; `undefined` elements go last without reaching the comparator.
fn sort_values(interpreter: &mut Interpreter, items: Vec<Value>, comparator: &Value) -> EvalResult<Vec<Value>> {
    if !matches!(comparator, Value::Undefined) && !comparator.is_callable() {
        return interpreter
            .type_error("The comparison function must be either a function or undefined");
    }
    let (defined, undefined): (Vec<Value>, Vec<Value>) = items
        .into_iter()
        .partition(|item| !matches!(item, Value::Undefined));
    let mut compare = |a: &Value, b: &Value| -> EvalResult<Ordering> {
        if matches!(comparator, Value::Undefined) {
            let (a, b) = (to_js_string(a), to_js_string(b));
            return Ok(a.encode_utf16().cmp(b.encode_utf16()));
        }
        let result = interpreter.call(comparator, &Value::Undefined, &[a.clone(), b.clone()])?;
        let n = to_number(&result);
        Ok(if n < 0.0 {
            Ordering::Less
        } else if n > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        })
    };
    let mut sorted = merge_sort(defined, &mut compare)?;
    sorted.extend(undefined);
    Ok(sorted)
}

fn merge_sort(
    mut items: Vec<Value>,
    compare: &mut impl FnMut(&Value, &Value) -> EvalResult<Ordering>,
) -> EvalResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare)?;
    let right = merge_sort(right, compare)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => compare(b, a)? == Ordering::Less,
            _ => break,
        };
        out.extend(if take_right { right.next() } else { left.next() });
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

fn slice(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.slice")?;
    let items = snapshot(array);
    let start = relative_index(&arg(args, 0), items.len(), 0);
    let end = relative_index(&arg(args, 1), items.len(), items.len());
    let part = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Ok(interpreter.new_array(part))
}

fn concat(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.concat")?;
    let mut items = snapshot(array);
    for value in args {
        match value.as_object().and_then(|o| o.array_items()) {
            Some(more) => items.extend(more),
            None => items.push(value.clone()),
        }
    }
    Ok(interpreter.new_array(items))
}

fn join_items(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::Undefined | Value::Null => JsString::from(""),
            other => to_js_string(other),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn join(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.join")?;
    let separator = match arg(args, 0) {
        Value::Undefined => JsString::from(","),
        other => to_js_string(&other),
    };
    Ok(Value::string(join_items(&snapshot(array), &separator)))
}

fn to_string(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(to_js_string(this)))
}

fn index_of(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.indexOf")?;
    let items = snapshot(array);
    let target = arg(args, 0);
    let from = relative_index(&arg(args, 1), items.len(), 0);
    let found = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, item)| strict_equals(item, &target));
    Ok(Value::Number(found.map(|(i, _)| i as f64).unwrap_or(-1.0)))
}

fn last_index_of(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.lastIndexOf")?;
    let items = snapshot(array);
    let target = arg(args, 0);
    let limit = match args.get(1) {
        None => items.len(),
        Some(value) => {
            let n = to_integer(to_number(value));
            if n < 0.0 {
                let from = items.len() as f64 + n;
                if from < 0.0 {
                    return Ok(Value::Number(-1.0));
                }
                from as usize + 1
            } else {
                (n as usize).saturating_add(1).min(items.len())
            }
        }
    };
    let found = items[..limit]
        .iter()
        .rposition(|item| strict_equals(item, &target));
    Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
}

fn includes(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.includes")?;
    let items = snapshot(array);
    let target = arg(args, 0);
    let from = relative_index(&arg(args, 1), items.len(), 0);
    Ok(Value::Bool(
        items[from..].iter().any(|item| same_value_zero(item, &target)),
    ))
}

fn at(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.at")?;
    let len = length(array) as f64;
    let n = to_integer(to_number(&arg(args, 0)));
    let index = if n < 0.0 { len + n } else { n };
    if index < 0.0 || index >= len {
        return Ok(Value::Undefined);
    }
    Ok(element(array, index as usize).unwrap_or(Value::Undefined))
}

fn callback(interpreter: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
    let f = arg(args, 0);
    if !f.is_callable() {
        return interpreter.type_error(format!("{} is not a function", describe_for_error(&f)));
    }
    Ok(f)
}

/// Call the callback for every index in `indices`, stopping when `visit` says so.
fn each(
    interpreter: &mut Interpreter,
    this: &Value,
    args: &[Value],
    method: &str,
    reverse: bool,
    mut visit: impl FnMut(usize, Value, Value) -> bool,
) -> EvalResult<()> {
    let array = this_array(interpreter, this, method)?;
    let f = callback(interpreter, args)?;
    let this_arg = arg(args, 1);
    let len = length(array);
    let order: Box<dyn Iterator<Item = usize>> = if reverse {
        Box::new((0..len).rev())
    } else {
        Box::new(0..len)
    };
    for i in order {
        let item = element(array, i).unwrap_or(Value::Undefined);
        let result = interpreter.call(
            &f,
            &this_arg,
            &[item.clone(), Value::Number(i as f64), this.clone()],
        )?;
        if !visit(i, item, result) {
            break;
        }
    }
    Ok(())
}

fn find(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut found = Value::Undefined;
    each(interpreter, this, args, "Array.prototype.find", false, |_, item, result| {
        if result.is_truthy() {
            found = item;
            return false;
        }
        true
    })?;
    Ok(found)
}

fn find_index(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut found = -1.0;
    each(interpreter, this, args, "Array.prototype.findIndex", false, |i, _, result| {
        if result.is_truthy() {
            found = i as f64;
            return false;
        }
        true
    })?;
    Ok(Value::Number(found))
}

fn find_last(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut found = Value::Undefined;
    each(interpreter, this, args, "Array.prototype.findLast", true, |_, item, result| {
        if result.is_truthy() {
            found = item;
            return false;
        }
        true
    })?;
    Ok(found)
}

fn find_last_index(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut found = -1.0;
    each(interpreter, this, args, "Array.prototype.findLastIndex", true, |i, _, result| {
        if result.is_truthy() {
            found = i as f64;
            return false;
        }
        true
    })?;
    Ok(Value::Number(found))
}

fn filter(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut kept = Vec::new();
    each(interpreter, this, args, "Array.prototype.filter", false, |_, item, result| {
        if result.is_truthy() {
            kept.push(item);
        }
        true
    })?;
    Ok(interpreter.new_array(kept))
}

fn map(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut mapped = Vec::new();
    each(interpreter, this, args, "Array.prototype.map", false, |_, _, result| {
        mapped.push(result);
        true
    })?;
    Ok(interpreter.new_array(mapped))
}

fn for_each(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    each(interpreter, this, args, "Array.prototype.forEach", false, |_, _, _| true)?;
    Ok(Value::Undefined)
}

fn some(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut any = false;
    each(interpreter, this, args, "Array.prototype.some", false, |_, _, result| {
        any = result.is_truthy();
        !any
    })?;
    Ok(Value::Bool(any))
}

fn every(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut all = true;
    each(interpreter, this, args, "Array.prototype.every", false, |_, _, result| {
        all = result.is_truthy();
        all
    })?;
    Ok(Value::Bool(all))
}

fn fold(interpreter: &mut Interpreter, this: &Value, args: &[Value], reverse: bool) -> EvalResult<Value> {
    let method = if reverse {
        "Array.prototype.reduceRight"
    } else {
        "Array.prototype.reduce"
    };
    let array = this_array(interpreter, this, method)?;
    let f = callback(interpreter, args)?;
    let len = length(array);
    let mut indices: Box<dyn Iterator<Item = usize>> = if reverse {
        Box::new((0..len).rev())
    } else {
        Box::new(0..len)
    };
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match indices.next() {
            Some(i) => element(array, i).unwrap_or(Value::Undefined),
            None => return interpreter.type_error("Reduce of empty array with no initial value"),
        },
    };
    for i in indices {
        let item = element(array, i).unwrap_or(Value::Undefined);
        acc = interpreter.call(
            &f,
            &Value::Undefined,
            &[acc, item, Value::Number(i as f64), this.clone()],
        )?;
    }
    Ok(acc)
}

fn reduce(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    fold(interpreter, this, args, false)
}

fn reduce_right(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    fold(interpreter, this, args, true)
}

fn flatten_into(out: &mut Vec<Value>, items: Vec<Value>, depth: f64) {
    for item in items {
        match item.as_object().and_then(|o| o.array_items()) {
            Some(inner) if depth >= 1.0 => flatten_into(out, inner, depth - 1.0),
            _ => out.push(item),
        }
    }
}

fn flat(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.flat")?;
    let depth = match arg(args, 0) {
        Value::Undefined => 1.0,
        other => to_integer(to_number(&other)),
    };
    let mut out = Vec::new();
    flatten_into(&mut out, snapshot(array), depth);
    Ok(interpreter.new_array(out))
}

fn flat_map(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut mapped = Vec::new();
    each(interpreter, this, args, "Array.prototype.flatMap", false, |_, _, result| {
        mapped.push(result);
        true
    })?;
    let mut out = Vec::new();
    flatten_into(&mut out, mapped, 1.0);
    Ok(interpreter.new_array(out))
}

fn keys(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.keys")?;
    let indices = (0..length(array)).map(|i| Value::Number(i as f64)).collect();
    Ok(interpreter.new_array(indices))
}

fn values(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.values")?;
    let items = snapshot(array);
    Ok(interpreter.new_array(items))
}

fn entries(interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let array = this_array(interpreter, this, "Array.prototype.entries")?;
    let pairs = snapshot(array)
        .into_iter()
        .enumerate()
        .map(|(i, item)| interpreter.new_array(vec![Value::Number(i as f64), item]))
        .collect();
    Ok(interpreter.new_array(pairs))
}

#[cfg(test)]
mod tests {
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_mutators() {
        assert_eq!(
            eval_json("(() => { const a = [1, 2]; const n = a.push(3, 4); a.unshift(0); a.shift(); a.pop(); return [n, a]; })()"),
            "[4,[1,2,3]]"
        );
        assert_eq!(
            eval_json("(() => { const a = [1, 2, 3, 4, 5]; const removed = a.splice(1, 2, 'x'); return [removed, a]; })()"),
            r#"[[2,3],[1,"x",4,5]]"#
        );
        assert_eq!(eval_json("new Array(3).fill(0)"), "[0,0,0]");
        assert_eq!(eval_json("[1, 2, 3].reverse()"), "[3,2,1]");
    }

    #[test]
    fn test_sort_is_stable_and_string_ordered_by_default() {
        assert_eq!(eval_json("[10, 9, 1, 100].sort()"), "[1,10,100,9]");
        assert_eq!(eval_json("[3, undefined, 1].sort((a, b) => a - b)"), "[1,3,null]");
        assert_eq!(
            eval_json("[{ k: 1, v: 'a' }, { k: 0, v: 'b' }, { k: 1, v: 'c' }].sort((x, y) => x.k - y.k).map(o => o.v).join('')"),
            r#""bac""#
        );
        assert_eq!(eval_json("(() => { const a = [2, 1]; const b = a.toSorted(); return [a, b]; })()"), "[[2,1],[1,2]]");
        assert_eq!(
            eval_error("[2, 1].sort((a, b) => { throw new Error('boom'); });"),
            "boom"
        );
    }

    #[test]
    fn test_higher_order_methods() {
        assert_eq!(eval_json("[1, 2, 3].map((x, i) => x * i)"), "[0,2,6]");
        assert_eq!(eval_json("[1, 2, 3, 4].filter(x => x % 2 === 0)"), "[2,4]");
        assert_eq!(eval_json("[1, 2, 3].reduce((a, b) => a + b)"), "6");
        assert_eq!(eval_json("['a', 'b'].reduceRight((a, b) => a + b, '')"), r#""ba""#);
        assert_eq!(eval_json("[[1, [2]], 3].flat()"), "[1,[2],3]");
        assert_eq!(eval_json("[[1, [2]], 3].flat(Infinity)"), "[1,2,3]");
        assert_eq!(eval_json("[1, 2].flatMap(x => [x, x])"), "[1,1,2,2]");
        assert_eq!(eval_json("[5, 6, 7].findLast(x => x < 7)"), "6");
        assert_eq!(eval_json("[[1, 2].some(x => x > 1), [1, 2].every(x => x > 1)]"), "[true,false]");
        assert_eq!(
            eval_error("[].reduce((a, b) => a + b);"),
            "Reduce of empty array with no initial value"
        );
        assert_eq!(eval_error("[1].map(undefined);"), "undefined is not a function");
    }

    #[test]
    fn test_search_methods() {
        assert_eq!(eval_json("[1, 2, 1].lastIndexOf(1)"), "2");
        assert_eq!(eval_json("[NaN].includes(NaN)"), "true");
        assert_eq!(eval_json("[NaN].indexOf(NaN)"), "-1");
        assert_eq!(eval_json("[1, 2, 3].at(-1)"), "3");
        assert_eq!(eval_json("[1, [2, 3], null].join('-')"), r#""1-2,3-""#);
    }

    #[test]
    fn test_array_statics() {
        assert_eq!(eval_json("Array.from({ length: 3 }, (_, i) => i * 2)"), "[0,2,4]");
        assert_eq!(eval_json("Array.from('héllo').length"), "5");
        assert_eq!(eval_json("Array.from(new Set([1, 1, 2]))"), "[1,2]");
        assert_eq!(eval_json("[Array.isArray([]), Array.isArray({})]"), "[true,false]");
        assert_eq!(eval_json("Array.of(7)"), "[7]");
        assert_eq!(eval_error("new Array(-1);"), "Invalid array length");
    }

    #[test]
    fn test_frozen_arrays_reject_mutation() {
        assert_eq!(
            eval_error("Object.freeze([1]).push(2);"),
            "Cannot add property 1, object is not extensible"
        );
    }
}
