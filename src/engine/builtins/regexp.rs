//! `RegExp` on top of the `regex` crate.
//!
//! Patterns are translated from the host dialect: `\d` and `\w` stay ASCII,
//! `\uXXXX` becomes `\x{XXXX}`, `[^]` matches anything. Look-around and
//! back-references have no equivalent and are rejected at compile time.

use std::rc::Rc;

use regex::{Regex, RegexBuilder};

use super::arg;
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::value::{
    to_js_string, JsObject, JsString, NativeFn, ObjRef, ObjectKind, Value,
};

const VALID_FLAGS: &str = "dgimsuy";

/// Compile a pattern with host-language flags.
pub fn compile_regex(pattern: &str, flags: &str) -> Result<Regex, String> {
    let mut seen = String::new();
    for flag in flags.chars() {
        if !VALID_FLAGS.contains(flag) || seen.contains(flag) {
            return Err(format!("Invalid regular expression flags '{}'", flags));
        }
        seen.push(flag);
    }
    let translated = translate_pattern(pattern)
        .map_err(|reason| format!("Invalid regular expression: /{}/{}: {}", pattern, flags, reason))?;
    RegexBuilder::new(&translated)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| {
            let reason = e
                .to_string()
                .lines()
                .rev()
                .find(|line| line.starts_with("error:"))
                .map(|line| line.trim_start_matches("error:").trim().to_string())
                .unwrap_or_else(|| "invalid pattern".to_string());
            format!("Invalid regular expression: /{}/{}: {}", pattern, flags, reason)
        })
}

fn translate_pattern(pattern: &str) -> Result<String, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut in_class = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                let Some(&next) = chars.get(i + 1) else {
                    return Err("\\ at end of pattern".to_string());
                };
                i += 2;
                match next {
                    'd' => out.push_str(if in_class { "0-9" } else { "[0-9]" }),
                    'D' => out.push_str(if in_class { "\\D" } else { "[^0-9]" }),
                    'w' => out.push_str(if in_class { "0-9A-Za-z_" } else { "[0-9A-Za-z_]" }),
                    'W' => out.push_str(if in_class { "\\W" } else { "[^0-9A-Za-z_]" }),
                    'b' if in_class => out.push_str("\\x08"),
                    's' | 'S' | 'b' | 'B' | 'n' | 'r' | 't' | 'f' | 'v' => {
                        out.push('\\');
                        out.push(next);
                    }
                    '0' => out.push_str("\\x00"),
                    '1'..='9' => return Err("back-references are not supported".to_string()),
                    'k' => return Err("named back-references are not supported".to_string()),
                    'c' => return Err("control escapes are not supported".to_string()),
                    'x' => {
                        let hex: String = chars.iter().skip(i).take(2).collect();
                        if hex.len() == 2 && hex.chars().all(|h| h.is_ascii_hexdigit()) {
                            out.push_str("\\x");
                            out.push_str(&hex);
                            i += 2;
                        } else {
                            out.push('x');
                        }
                    }
                    'u' => {
                        if chars.get(i) == Some(&'{') {
                            let end = chars[i..]
                                .iter()
                                .position(|&h| h == '}')
                                .ok_or_else(|| "invalid Unicode escape".to_string())?;
                            let hex: String = chars[i + 1..i + end].iter().collect();
                            out.push_str(&format!("\\x{{{}}}", hex));
                            i += end + 1;
                        } else {
                            let hex: String = chars.iter().skip(i).take(4).collect();
                            if hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit()) {
                                out.push_str(&format!("\\x{{{}}}", hex));
                                i += 4;
                            } else {
                                out.push('u');
                            }
                        }
                    }
                    'p' | 'P' => {
                        out.push('\\');
                        out.push(next);
                    }
                    other if other.is_ascii_alphanumeric() => {
                        return Err(format!("invalid escape \\{}", other));
                    }
                    other => out.push_str(&regex::escape(&other.to_string())),
                }
                continue;
            }
            '[' if !in_class => {
                if chars.get(i + 1) == Some(&'^') && chars.get(i + 2) == Some(&']') {
                    out.push_str("[\\s\\S]");
                    i += 3;
                    continue;
                }
                if chars.get(i + 1) == Some(&']') {
                    out.push_str("[^\\s\\S]");
                    i += 2;
                    continue;
                }
                in_class = true;
                out.push('[');
                if chars.get(i + 1) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '[' | '&' | '~' if in_class => {
                out.push('\\');
                out.push(c);
            }
            '-' if in_class && chars.get(i + 1) == Some(&'-') => {
                out.push_str("\\-");
            }
            '(' if !in_class && chars.get(i + 1) == Some(&'?') => {
                let rest: String = chars[i + 2..].iter().take(2).collect();
                if rest.starts_with('=') || rest.starts_with('!') || rest == "<=" || rest == "<!" {
                    return Err("look-around assertions are not supported".to_string());
                }
                out.push('(');
            }
            _ => out.push(c),
        }
        i += 1;
    }
    if in_class {
        return Err("missing terminating ] for character class".to_string());
    }
    Ok(out)
}

pub fn install(interpreter: &mut Interpreter) {
    super::define_constructor(
        interpreter,
        "RegExp",
        construct_regexp,
        Some(construct_regexp),
        2,
        &[],
    );
}

pub fn method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "test" => test,
        "exec" => exec_method,
        "toString" => to_string,
        _ => return None,
    })
}

fn construct_regexp(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let pattern = arg(args, 0);
    let flags = arg(args, 1);
    let (source, inherited) = match &pattern {
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::RegExp(data) => (data.source.to_string(), Some(data.flags.to_string())),
            _ => (to_js_string(&pattern).to_string(), None),
        },
        Value::Undefined => (String::new(), None),
        other => (to_js_string(other).to_string(), None),
    };
    let flags = match flags {
        Value::Undefined => inherited.unwrap_or_default(),
        other => to_js_string(&other).to_string(),
    };
    let source = if source == "(?:)" { String::new() } else { source };
    interpreter.new_regexp(&source, &flags)
}

struct RegExpState {
    regex: Rc<Regex>,
    global: bool,
    sticky: bool,
    last_index: usize,
}

fn state(object: &ObjRef) -> Option<RegExpState> {
    match &object.borrow().kind {
        ObjectKind::RegExp(data) => Some(RegExpState {
            regex: data.regex.clone(),
            global: data.global(),
            sticky: data.sticky(),
            last_index: data.last_index,
        }),
        _ => None,
    }
}

fn set_last_index(object: &ObjRef, index: usize) {
    if let ObjectKind::RegExp(data) = &mut object.borrow_mut().kind {
        data.last_index = index;
    }
}

fn this_regexp<'a>(interpreter: &mut Interpreter, this: &'a Value, method: &str) -> EvalResult<&'a ObjRef> {
    super::this_object(interpreter, this, method, |kind| {
        matches!(kind, ObjectKind::RegExp(_))
    })
}

/// Regular-expression object behind a value, if it is one.
pub fn as_regexp(value: &Value) -> Option<&ObjRef> {
    match value {
        Value::Object(object) if matches!(object.borrow().kind, ObjectKind::RegExp(_)) => {
            Some(object)
        }
        _ => None,
    }
}

/// One match: byte spans of the whole match and every group.
struct Found {
    spans: Vec<Option<(usize, usize)>>,
}

impl Found {
    fn from_captures(captures: &regex::Captures<'_>) -> Self {
        Self {
            spans: captures
                .iter()
                .map(|m| m.map(|m| (m.start(), m.end())))
                .collect(),
        }
    }

    fn whole(&self) -> (usize, usize) {
        self.spans.first().copied().flatten().unwrap_or((0, 0))
    }
}

/// `RegExp.prototype.exec` including `lastIndex` handling.
pub fn exec(interpreter: &mut Interpreter, object: &ObjRef, input: &JsString) -> EvalResult<Value> {
    let Some(state) = state(object) else {
        return interpreter.type_error("RegExp.prototype.exec called on incompatible receiver");
    };
    let tracks_index = state.global || state.sticky;
    let start = if tracks_index { state.last_index } else { 0 };
    if start > input.char_len() {
        set_last_index(object, 0);
        return Ok(Value::Null);
    }
    let byte_start = input.byte_offset(start);
    let found = state
        .regex
        .captures_at(input.as_str(), byte_start)
        .map(|captures| Found::from_captures(&captures))
        .filter(|found| !state.sticky || found.whole().0 == byte_start);
    match found {
        Some(found) => {
            if tracks_index {
                set_last_index(object, input.char_index(found.whole().1));
            }
            Ok(match_array(interpreter, &state.regex, &found, input))
        }
        None => {
            if tracks_index {
                set_last_index(object, 0);
            }
            Ok(Value::Null)
        }
    }
}

fn match_array(interpreter: &mut Interpreter, regex: &Regex, found: &Found, input: &JsString) -> Value {
    let items: Vec<Value> = found
        .spans
        .iter()
        .map(|span| match span {
            Some((start, end)) => Value::string(&input[*start..*end]),
            None => Value::Undefined,
        })
        .collect();
    let groups = named_groups(interpreter, regex, found, input);
    let mut array = JsObject::new(ObjectKind::Array(items));
    array.props.insert(
        JsString::from("index"),
        Value::Number(input.char_index(found.whole().0) as f64),
    );
    array
        .props
        .insert(JsString::from("input"), Value::String(input.clone()));
    array.props.insert(JsString::from("groups"), groups);
    Value::Object(interpreter.alloc(array))
}

fn named_groups(interpreter: &mut Interpreter, regex: &Regex, found: &Found, input: &str) -> Value {
    if regex.capture_names().all(|name| name.is_none()) {
        return Value::Undefined;
    }
    let mut groups = JsObject::new(ObjectKind::Ordinary);
    for (i, name) in regex.capture_names().enumerate() {
        if let Some(name) = name {
            let value = match found.spans.get(i).copied().flatten() {
                Some((start, end)) => Value::string(&input[start..end]),
                None => Value::Undefined,
            };
            groups.props.insert(JsString::from(name), value);
        }
    }
    Value::Object(interpreter.alloc(groups))
}

fn test(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = this_regexp(interpreter, this, "RegExp.prototype.test")?;
    let input = to_js_string(&arg(args, 0));
    let result = exec(interpreter, object, &input)?;
    Ok(Value::Bool(!matches!(result, Value::Null)))
}

fn exec_method(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let object = this_regexp(interpreter, this, "RegExp.prototype.exec")?;
    let input = to_js_string(&arg(args, 0));
    exec(interpreter, object, &input)
}

fn to_string(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(to_js_string(this)))
}

// ---------------------------------------------------------------------------
// String methods taking a pattern
// ---------------------------------------------------------------------------

/// Pattern argument of `match`/`matchAll`/`search` as a RegExp object.
fn coerce_regexp(interpreter: &mut Interpreter, pattern: &Value, flags: &str) -> EvalResult<ObjRef> {
    if let Some(object) = as_regexp(pattern) {
        return Ok(object.clone());
    }
    let source = match pattern {
        Value::Undefined => String::new(),
        other => to_js_string(other).to_string(),
    };
    match interpreter.new_regexp(&source, flags)? {
        Value::Object(object) => Ok(object),
        _ => interpreter.type_error("RegExp construction failed"),
    }
}

/// `String.prototype.match`.
pub fn string_match(interpreter: &mut Interpreter, input: &JsString, pattern: &Value) -> EvalResult<Value> {
    let object = coerce_regexp(interpreter, pattern, "")?;
    let Some(state) = state(&object) else {
        return Ok(Value::Null);
    };
    if !state.global {
        return exec(interpreter, &object, input);
    }
    set_last_index(&object, 0);
    let matches: Vec<Value> = state
        .regex
        .find_iter(input.as_str())
        .map(|m| Value::string(m.as_str()))
        .collect();
    if matches.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(interpreter.new_array(matches))
    }
}

/// `String.prototype.matchAll`, materialized as an array of match arrays.
pub fn string_match_all(interpreter: &mut Interpreter, input: &JsString, pattern: &Value) -> EvalResult<Value> {
    if let Some(object) = as_regexp(pattern) {
        if state(object).is_some_and(|s| !s.global) {
            return interpreter
                .type_error("String.prototype.matchAll called with a non-global RegExp argument");
        }
    }
    let object = coerce_regexp(interpreter, pattern, "g")?;
    let Some(state) = state(&object) else {
        return Ok(interpreter.new_array(Vec::new()));
    };
    let found: Vec<Found> = state
        .regex
        .captures_iter(input.as_str())
        .map(|captures| Found::from_captures(&captures))
        .collect();
    let items = found
        .iter()
        .map(|found| match_array(interpreter, &state.regex, found, input))
        .collect();
    Ok(interpreter.new_array(items))
}

/// `String.prototype.search`.
pub fn string_search(interpreter: &mut Interpreter, input: &JsString, pattern: &Value) -> EvalResult<Value> {
    let object = coerce_regexp(interpreter, pattern, "")?;
    let index = state(&object)
        .and_then(|state| state.regex.find(input.as_str()).map(|m| m.start()))
        .map(|start| input.char_index(start) as f64)
        .unwrap_or(-1.0);
    Ok(Value::Number(index))
}

/// `String.prototype.replace` / `replaceAll` for both string and RegExp patterns.
pub fn string_replace(
    interpreter: &mut Interpreter,
    input: &JsString,
    pattern: &Value,
    replacement: &Value,
    all: bool,
) -> EvalResult<Value> {
    let (found, regex) = if let Some(object) = as_regexp(pattern) {
        let Some(state) = state(object) else {
            return Ok(Value::String(input.clone()));
        };
        if all && !state.global {
            return interpreter.type_error("replaceAll must be called with a global RegExp");
        }
        let found: Vec<Found> = if state.global {
            set_last_index(object, 0);
            state
                .regex
                .captures_iter(input.as_str())
                .map(|captures| Found::from_captures(&captures))
                .collect()
        } else {
            state
                .regex
                .captures(input.as_str())
                .map(|captures| Found::from_captures(&captures))
                .into_iter()
                .collect()
        };
        (found, Some(state.regex))
    } else {
        let needle = to_js_string(pattern);
        (find_literal(input, &needle, all), None)
    };

    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for found in &found {
        let (start, end) = found.whole();
        out.push_str(&input[last..start]);
        if replacement.is_callable() {
            let mut call_args: Vec<Value> = found
                .spans
                .iter()
                .map(|span| match span {
                    Some((s, e)) => Value::string(&input[*s..*e]),
                    None => Value::Undefined,
                })
                .collect();
            call_args.push(Value::Number(input.char_index(start) as f64));
            call_args.push(Value::String(input.clone()));
            if let Some(regex) = &regex {
                if regex.capture_names().any(|name| name.is_some()) {
                    let groups = named_groups(interpreter, regex, found, input);
                    call_args.push(groups);
                }
            }
            let result = interpreter.call(replacement, &Value::Undefined, &call_args)?;
            out.push_str(&to_js_string(&result));
        } else {
            let template = to_js_string(replacement);
            expand_replacement(&template, found, input, regex.as_deref(), &mut out);
        }
        last = end;
    }
    out.push_str(&input[last..]);
    Ok(Value::string(out))
}

fn find_literal(input: &JsString, needle: &str, all: bool) -> Vec<Found> {
    let mut found = Vec::new();
    let mut from = 0;
    while from <= input.len() {
        let Some(offset) = input[from..].find(needle) else {
            break;
        };
        let start = from + offset;
        let end = start + needle.len();
        found.push(Found {
            spans: vec![Some((start, end))],
        });
        if !all {
            break;
        }
        from = if needle.is_empty() {
            match input[end..].chars().next() {
                Some(c) => end + c.len_utf8(),
                None => break,
            }
        } else {
            end
        };
    }
    found
}

/// Expand `$&`, `$1`, `$<name>`, `` $` ``, `$'` and `$$` in a replacement template.
fn expand_replacement(template: &str, found: &Found, input: &str, regex: Option<&Regex>, out: &mut String) {
    let (start, end) = found.whole();
    let group = |index: usize| -> Option<&str> {
        found
            .spans
            .get(index)
            .copied()
            .flatten()
            .map(|(s, e)| &input[s..e])
    };
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '$' || i + 1 == chars.len() {
            out.push(c);
            i += 1;
            continue;
        }
        let next = chars[i + 1];
        match next {
            '$' => {
                out.push('$');
                i += 2;
            }
            '&' => {
                out.push_str(&input[start..end]);
                i += 2;
            }
            '`' => {
                out.push_str(&input[..start]);
                i += 2;
            }
            '\'' => {
                out.push_str(&input[end..]);
                i += 2;
            }
            '0'..='9' => {
                let groups = found.spans.len();
                let one = next.to_digit(10).unwrap_or(0) as usize;
                let two = chars
                    .get(i + 2)
                    .and_then(|d| d.to_digit(10))
                    .map(|d| one * 10 + d as usize);
                match two {
                    Some(n) if n >= 1 && n < groups => {
                        out.push_str(group(n).unwrap_or(""));
                        i += 3;
                    }
                    _ if one >= 1 && one < groups => {
                        out.push_str(group(one).unwrap_or(""));
                        i += 2;
                    }
                    _ => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            '<' if regex.is_some_and(|r| r.capture_names().any(|n| n.is_some())) => {
                let close = chars[i + 2..].iter().position(|&ch| ch == '>');
                match (close, regex) {
                    (Some(len), Some(regex)) => {
                        let name: String = chars[i + 2..i + 2 + len].iter().collect();
                        let index = regex.capture_names().position(|n| n == Some(name.as_str()));
                        if let Some(text) = index.and_then(group) {
                            out.push_str(text);
                        }
                        i += len + 3;
                    }
                    _ => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }
}

/// `String.prototype.split` with a RegExp separator.
pub fn split_regexp(interpreter: &mut Interpreter, input: &JsString, separator: &ObjRef, limit: usize) -> EvalResult<Value> {
    let Some(state) = state(separator) else {
        return Ok(interpreter.new_array(vec![Value::String(input.clone())]));
    };
    let text = input.as_str();
    if text.is_empty() {
        let items = if state.regex.is_match("") {
            Vec::new()
        } else {
            vec![Value::String(input.clone())]
        };
        return Ok(interpreter.new_array(items));
    }
    let mut parts = Vec::new();
    let mut p = 0;
    let mut q = 0;
    while q < text.len() && parts.len() < limit {
        let Some(captures) = state.regex.captures_at(text, q) else {
            break;
        };
        let found = Found::from_captures(&captures);
        let (start, end) = found.whole();
        if start >= text.len() {
            break;
        }
        if end == p {
            q = start + text[start..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        parts.push(Value::string(&text[p..start]));
        for span in found.spans.iter().skip(1) {
            if parts.len() >= limit {
                break;
            }
            parts.push(match span {
                Some((s, e)) => Value::string(&text[*s..*e]),
                None => Value::Undefined,
            });
        }
        p = end;
        q = if end == start {
            end + text[end..].chars().next().map_or(1, char::len_utf8)
        } else {
            end
        };
    }
    if parts.len() < limit {
        parts.push(Value::string(&text[p..]));
    }
    Ok(interpreter.new_array(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_translation_rules() {
        assert_eq!(translate_pattern(r"\d+").unwrap(), "[0-9]+");
        assert_eq!(translate_pattern(r"[\w-]").unwrap(), "[0-9A-Za-z_-]");
        assert_eq!(translate_pattern(r"\u0041").unwrap(), r"\x{0041}");
        assert_eq!(translate_pattern("[^]").unwrap(), r"[\s\S]");
        assert_eq!(translate_pattern(r"\/").unwrap(), "/");
        assert!(translate_pattern(r"(a)\1").is_err());
        assert!(translate_pattern("a(?=b)").is_err());
    }

    #[test]
    fn test_compile_flags() {
        assert!(compile_regex("abc", "gi").unwrap().is_match("xABCx"));
        assert!(compile_regex("a", "gg").is_err());
        assert!(compile_regex("a", "q").is_err());
        let multiline = compile_regex("^b$", "m").unwrap();
        assert!(multiline.is_match("a\nb"));
    }

    #[test]
    fn test_exec_and_last_index() {
        assert_eq!(
            eval_json("(() => { const re = /(\\d)(\\w)/g; const a = re.exec('1a 2b'); const b = re.exec('1a 2b'); return [a[0], a.index, b[2], re.lastIndex]; })()"),
            r#"["1a",0,"b",5]"#
        );
        assert_eq!(eval_json("/^\\s*$/.test('  ')"), "true");
    }

    #[test]
    fn test_string_pattern_methods() {
        assert_eq!(
            eval_json("'a-b_c'.replace(/[-_](\\w)/g, (m, c) => c.toUpperCase())"),
            r#""aBC""#
        );
        assert_eq!(eval_json("'x1y22'.replace(/(\\d+)/g, '<$1>')"), r#""x<1>y<22>""#);
        assert_eq!(eval_json("'aaa'.replaceAll('a', '$$')"), r#""$$$""#);
        assert_eq!(eval_json("'one  two three'.split(/\\s+/)"), r#"["one","two","three"]"#);
        assert_eq!(eval_json("'abc'.split(/(b)/)"), r#"["a","b","c"]"#);
        assert_eq!(eval_json("'a1b2'.match(/\\d/g)"), r#"["1","2"]"#);
        assert_eq!(eval_json("'hello'.search(/l+/)"), "2");
        assert_eq!(
            eval_json("[...'k=v;x=y'.matchAll(/(?<key>\\w)=(\\w)/g)].map(m => m.groups.key)"),
            r#"["k","x"]"#
        );
    }

    #[test]
    fn test_replace_all_requires_global() {
        assert_eq!(
            eval_error("'aa'.replaceAll(/a/, 'b');"),
            "replaceAll must be called with a global RegExp"
        );
    }
}
