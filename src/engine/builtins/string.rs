//! `String` statics and string instance methods. Indices count Unicode scalar values.

use super::regexp::{
    as_regexp, split_regexp, string_match, string_match_all, string_replace, string_search,
};
use super::{arg, relative_index};
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::number::{is_js_whitespace, to_integer, to_uint32};
use crate::engine::value::{to_js_string, to_number, JsString, NativeFn, Value};

/// Longest string `repeat`/`padStart` may build.
const MAX_STRING_CHARS: usize = 1 << 28;

pub fn install(interpreter: &mut Interpreter) {
    super::define_constructor(
        interpreter,
        "String",
        string_call,
        None,
        1,
        &[
            ("fromCharCode", from_char_code, 1),
            ("fromCodePoint", from_code_point, 1),
        ],
    );
}

pub fn method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "at" => at,
        "charAt" => char_at,
        "charCodeAt" => char_code_at,
        "codePointAt" => char_code_at,
        "indexOf" => index_of,
        "lastIndexOf" => last_index_of,
        "includes" => includes,
        "startsWith" => starts_with,
        "endsWith" => ends_with,
        "slice" => slice,
        "substring" => substring,
        "substr" => substr,
        "toUpperCase" | "toLocaleUpperCase" => to_upper_case,
        "toLowerCase" | "toLocaleLowerCase" => to_lower_case,
        "trim" => trim,
        "trimStart" => trim_start,
        "trimEnd" => trim_end,
        "padStart" => pad_start,
        "padEnd" => pad_end,
        "repeat" => repeat,
        "split" => split,
        "concat" => concat,
        "replace" => replace,
        "replaceAll" => replace_all,
        "match" => match_method,
        "matchAll" => match_all,
        "search" => search,
        "localeCompare" => locale_compare,
        "normalize" | "toString" | "valueOf" => value_of,
        _ => return None,
    })
}

fn this_string(this: &Value) -> JsString {
    to_js_string(this)
}

fn string_call(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(match args.first() {
        Some(value) => Value::String(to_js_string(value)),
        None => Value::string(""),
    })
}

fn from_char_code(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units: Vec<u16> = args
        .iter()
        .map(|value| (to_uint32(to_number(value)) & 0xFFFF) as u16)
        .collect();
    let text: String = char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    Ok(Value::string(text))
}

fn from_code_point(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut text = String::new();
    for value in args {
        let n = to_number(value);
        let c = (n.fract() == 0.0 && (0.0..=1_114_111.0).contains(&n))
            .then(|| char::from_u32(n as u32))
            .flatten();
        match c {
            Some(c) => text.push(c),
            None => {
                return interpreter.range_error(format!(
                    "Invalid code point {}",
                    to_js_string(value)
                ))
            }
        }
    }
    Ok(Value::string(text))
}

fn value_of(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(this_string(this)))
}

fn at(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let n = to_integer(to_number(&arg(args, 0)));
    let index = if n < 0.0 { s.char_len() as f64 + n } else { n };
    Ok(char_value(&s, index))
}

fn char_value(s: &JsString, index: f64) -> Value {
    if index < 0.0 {
        return Value::Undefined;
    }
    s.char_at(index as usize)
        .map(|c| Value::string(c.to_string()))
        .unwrap_or(Value::Undefined)
}

fn char_at(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let index = to_integer(to_number(&arg(args, 0)));
    Ok(match char_value(&s, index) {
        Value::Undefined => Value::string(""),
        other => other,
    })
}

fn char_code_at(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let index = to_integer(to_number(&arg(args, 0)));
    if index < 0.0 {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(
        s.char_at(index as usize)
            .map(|c| c as u32 as f64)
            .unwrap_or(f64::NAN),
    ))
}

fn reject_regexp(interpreter: &mut Interpreter, value: &Value, method: &str) -> EvalResult<()> {
    if as_regexp(value).is_some() {
        return interpreter.type_error(format!(
            "First argument to String.prototype.{} must not be a regular expression",
            method
        ));
    }
    Ok(())
}

/// Char position argument clamped to `0..=len`.
fn position(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    to_integer(to_number(value)).clamp(0.0, len as f64) as usize
}

fn index_of(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let needle = to_js_string(&arg(args, 0));
    let from = position(&arg(args, 1), s.char_len(), 0);
    let start = s.byte_offset(from);
    Ok(Value::Number(match s[start..].find(needle.as_str()) {
        Some(offset) => s.char_index(start + offset) as f64,
        None => -1.0,
    }))
}

fn last_index_of(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let needle = to_js_string(&arg(args, 0));
    let from_arg = to_number(&arg(args, 1));
    let from = if from_arg.is_nan() {
        s.char_len()
    } else {
        position(&Value::Number(from_arg), s.char_len(), s.char_len())
    };
    let limit = s.byte_offset(from);
    let found = s
        .match_indices(needle.as_str())
        .map(|(i, _)| i)
        .take_while(|i| *i <= limit)
        .last();
    Ok(Value::Number(match found {
        Some(i) => s.char_index(i) as f64,
        None if needle.is_empty() => from as f64,
        None => -1.0,
    }))
}

fn includes(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    reject_regexp(interpreter, &arg(args, 0), "includes")?;
    let s = this_string(this);
    let needle = to_js_string(&arg(args, 0));
    let from = s.byte_offset(position(&arg(args, 1), s.char_len(), 0));
    Ok(Value::Bool(s[from..].contains(needle.as_str())))
}

fn starts_with(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    reject_regexp(interpreter, &arg(args, 0), "startsWith")?;
    let s = this_string(this);
    let needle = to_js_string(&arg(args, 0));
    let from = s.byte_offset(position(&arg(args, 1), s.char_len(), 0));
    Ok(Value::Bool(s[from..].starts_with(needle.as_str())))
}

fn ends_with(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    reject_regexp(interpreter, &arg(args, 0), "endsWith")?;
    let s = this_string(this);
    let needle = to_js_string(&arg(args, 0));
    let end = s.byte_offset(position(&arg(args, 1), s.char_len(), s.char_len()));
    Ok(Value::Bool(s[..end].ends_with(needle.as_str())))
}

fn slice(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let len = s.char_len();
    let start = relative_index(&arg(args, 0), len, 0);
    let end = relative_index(&arg(args, 1), len, len);
    if start >= end {
        return Ok(Value::string(""));
    }
    Ok(Value::string(s.slice_chars(start, end)))
}

fn substring(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let len = s.char_len();
    let a = position(&arg(args, 0), len, 0);
    let b = position(&arg(args, 1), len, len);
    Ok(Value::string(s.slice_chars(a.min(b), a.max(b))))
}

fn substr(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let len = s.char_len();
    let start = relative_index(&arg(args, 0), len, 0);
    let count = match arg(args, 1) {
        Value::Undefined => len,
        other => to_integer(to_number(&other)).max(0.0).min(len as f64) as usize,
    };
    let end = (start + count).min(len);
    Ok(Value::string(s.slice_chars(start, end)))
}

fn to_upper_case(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this_string(this).to_uppercase()))
}

fn to_lower_case(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this_string(this).to_lowercase()))
}

fn trim(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this_string(this).trim_matches(is_js_whitespace)))
}

fn trim_start(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(
        this_string(this).trim_start_matches(is_js_whitespace),
    ))
}

fn trim_end(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this_string(this).trim_end_matches(is_js_whitespace)))
}

fn padding(interpreter: &mut Interpreter, s: &JsString, args: &[Value]) -> EvalResult<String> {
    let target = to_integer(to_number(&arg(args, 0)));
    let filler = match arg(args, 1) {
        Value::Undefined => JsString::from(" "),
        other => to_js_string(&other),
    };
    if target <= s.char_len() as f64 || filler.is_empty() {
        return Ok(String::new());
    }
    if target > MAX_STRING_CHARS as f64 {
        return interpreter.range_error("Invalid string length");
    }
    let needed = target as usize - s.char_len();
    Ok(filler.chars().cycle().take(needed).collect())
}

fn pad_start(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let pad = padding(interpreter, &s, args)?;
    Ok(Value::string(pad + s.as_str()))
}

fn pad_end(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let pad = padding(interpreter, &s, args)?;
    Ok(Value::string(s.to_string() + &pad))
}

fn repeat(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let count = to_integer(to_number(&arg(args, 0)));
    if count < 0.0 || count.is_infinite() {
        return interpreter.range_error(format!(
            "Invalid count value: {}",
            to_js_string(&arg(args, 0))
        ));
    }
    if s.char_len() as f64 * count > MAX_STRING_CHARS as f64 {
        return interpreter.range_error("Invalid string length");
    }
    Ok(Value::string(s.repeat(count as usize)))
}

fn split(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    let separator = arg(args, 0);
    let limit = match arg(args, 1) {
        Value::Undefined => u32::MAX as usize,
        other => to_uint32(to_number(&other)) as usize,
    };
    if limit == 0 {
        return Ok(interpreter.new_array(Vec::new()));
    }
    if let Some(regexp) = as_regexp(&separator) {
        return split_regexp(interpreter, &s, regexp, limit);
    }
    let parts: Vec<Value> = match separator {
        Value::Undefined => vec![Value::String(s.clone())],
        other => {
            let separator = to_js_string(&other);
            if separator.is_empty() {
                s.chars()
                    .take(limit)
                    .map(|c| Value::string(c.to_string()))
                    .collect()
            } else {
                s.split(separator.as_str())
                    .take(limit)
                    .map(Value::string)
                    .collect()
            }
        }
    };
    Ok(interpreter.new_array(parts))
}

fn concat(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut out = this_string(this).to_string();
    for value in args {
        out.push_str(&to_js_string(value));
    }
    Ok(Value::string(out))
}

fn replace(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    string_replace(interpreter, &s, &arg(args, 0), &arg(args, 1), false)
}

fn replace_all(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    string_replace(interpreter, &s, &arg(args, 0), &arg(args, 1), true)
}

fn match_method(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    string_match(interpreter, &s, &arg(args, 0))
}

fn match_all(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    string_match_all(interpreter, &s, &arg(args, 0))
}

fn search(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let s = this_string(this);
    string_search(interpreter, &s, &arg(args, 0))
}

/// Case-insensitive first, then code-point order as a tie-break.
fn locale_compare(_interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let a = this_string(this);
    let b = to_js_string(&arg(args, 0));
    let ordering = a
        .to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.as_str().cmp(a.as_str()));
    Ok(Value::Number(match ordering {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    }))
}

#[cfg(test)]
mod tests {
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_indexing_and_slicing() {
        assert_eq!(eval_json("'hello'.slice(-3)"), r#""llo""#);
        assert_eq!(eval_json("'hello'.substring(4, 1)"), r#""ell""#);
        assert_eq!(eval_json("'hello'.substr(1, 3)"), r#""ell""#);
        assert_eq!(eval_json("'héllo'.charAt(1) + 'abc'.at(-1)"), r#""éc""#);
        assert_eq!(eval_json("'abc'.charCodeAt(0)"), "97");
        assert_eq!(eval_json("'abc'.charCodeAt(5)"), "null");
        assert_eq!(eval_json("'abcabc'.indexOf('c', 3)"), "5");
        assert_eq!(eval_json("'abcabc'.lastIndexOf('b')"), "4");
        assert_eq!(eval_json("'😀x'.indexOf('x')"), "1");
    }

    #[test]
    fn test_transformations() {
        assert_eq!(eval_json("'  Hi  '.trim().toUpperCase()"), r#""HI""#);
        assert_eq!(eval_json("'5'.padStart(3, '0') + '|' + 'ab'.padEnd(5, 'xy')"), r#""005|abxyx""#);
        assert_eq!(eval_json("'ab'.repeat(3)"), r#""ababab""#);
        assert_eq!(eval_json("'a,b,,c'.split(',')"), r#"["a","b","","c"]"#);
        assert_eq!(eval_json("'abc'.split('')"), r#"["a","b","c"]"#);
        assert_eq!(eval_json("'a b c'.split(' ', 2)"), r#"["a","b"]"#);
        assert_eq!(eval_json("'abc'.split()"), r#"["abc"]"#);
        assert_eq!(eval_json("'a.b.c'.replace('.', '-')"), r#""a-b.c""#);
        assert_eq!(eval_json("'a.b.c'.replaceAll('.', '-')"), r#""a-b-c""#);
        assert_eq!(eval_json("String.fromCharCode(72, 105)"), r#""Hi""#);
        assert_eq!(eval_json("String(12.5) + String(null)"), r#""12.5null""#);
        assert_eq!(eval_json("['b', 'a', 'C'].sort((x, y) => x.localeCompare(y))"), r#"["a","b","C"]"#);
    }

    #[test]
    fn test_invalid_arguments() {
        assert_eq!(eval_error("'a'.repeat(-1);"), "Invalid count value: -1");
        assert_eq!(
            eval_error("'a'.includes(/a/);"),
            "First argument to String.prototype.includes must not be a regular expression"
        );
    }
}
