//! `Number` and `Boolean` constructors with their instance methods.

use super::arg;
use super::global::{parse_float, parse_int};
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::number::{number_to_string, to_fixed, to_integer, to_radix_string};
use crate::engine::value::{to_js_string, to_number, JsString, NativeFn, Value};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn install(interpreter: &mut Interpreter) {
    let number = super::define_constructor(
        interpreter,
        "Number",
        number_call,
        None,
        1,
        &[
            ("isInteger", is_integer, 1),
            ("isSafeInteger", is_safe_integer, 1),
            ("isFinite", is_finite, 1),
            ("isNaN", is_nan, 1),
            ("parseInt", parse_int, 2),
            ("parseFloat", parse_float, 1),
        ],
    );
    let constants = [
        ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
        ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
        ("EPSILON", f64::EPSILON),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ];
    {
        let mut inner = number.borrow_mut();
        for (name, value) in constants {
            inner.props.insert(JsString::from(name), Value::Number(value));
        }
    }

    super::define_constructor(interpreter, "Boolean", boolean_call, None, 1, &[]);
}

pub fn method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "toFixed" => number_to_fixed,
        "toPrecision" => to_precision,
        "toString" => number_to_string_method,
        "toLocaleString" => number_to_string_method,
        "valueOf" => value_of,
        _ => return None,
    })
}

pub fn boolean_method(name: &str) -> Option<NativeFn> {
    Some(match name {
        "toString" => boolean_to_string,
        "valueOf" => value_of,
        _ => return None,
    })
}

fn number_call(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(match args.first() {
        Some(value) => to_number(value),
        None => 0.0,
    }))
}

fn boolean_call(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(arg(args, 0).is_truthy()))
}

fn number_arg(args: &[Value]) -> Option<f64> {
    match args.first() {
        Some(Value::Number(n)) => Some(*n),
        _ => None,
    }
}

fn is_integer(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(
        number_arg(args).is_some_and(|n| n.is_finite() && n.trunc() == n),
    ))
}

fn is_safe_integer(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(number_arg(args).is_some_and(|n| {
        n.is_finite() && n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
    })))
}

fn is_finite(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(number_arg(args).is_some_and(f64::is_finite)))
}

fn is_nan(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(number_arg(args).is_some_and(f64::is_nan)))
}

fn this_number(interpreter: &mut Interpreter, this: &Value, method: &str) -> EvalResult<f64> {
    match this {
        Value::Number(n) => Ok(*n),
        other => interpreter.type_error(format!(
            "Number.prototype.{} requires that 'this' be a Number, not {}",
            method,
            to_js_string(other)
        )),
    }
}

fn number_to_fixed(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let n = this_number(interpreter, this, "toFixed")?;
    let digits = to_integer(to_number(&arg(args, 0)));
    if !(0.0..=100.0).contains(&digits) {
        return interpreter.range_error("toFixed() digits argument must be between 0 and 100");
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(Value::string(number_to_string(n)));
    }
    Ok(Value::string(to_fixed(n, digits as usize)))
}

fn to_precision(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let n = this_number(interpreter, this, "toPrecision")?;
    if matches!(arg(args, 0), Value::Undefined) || !n.is_finite() {
        return Ok(Value::string(number_to_string(n)));
    }
    let precision = to_integer(to_number(&arg(args, 0)));
    if !(1.0..=100.0).contains(&precision) {
        return interpreter.range_error("toPrecision() argument must be between 1 and 100");
    }
    Ok(Value::string(format_precision(n, precision as usize)))
}

/// Significant-digit formatting: fixed notation unless the exponent is out of range.
fn format_precision(n: f64, precision: usize) -> String {
    let scientific = format!("{:.*e}", precision - 1, n);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if n == 0.0 || (exponent >= -6 && exponent < precision as i32) {
        let fraction = (precision as i32 - 1 - exponent).max(0) as usize;
        return to_fixed(n, fraction);
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{}", mantissa, sign, exponent.abs())
}

fn number_to_string_method(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let n = this_number(interpreter, this, "toString")?;
    let radix = match arg(args, 0) {
        Value::Undefined => 10.0,
        other => to_integer(to_number(&other)),
    };
    if !(2.0..=36.0).contains(&radix) {
        return interpreter.range_error("toString() radix must be between 2 and 36");
    }
    if radix == 10.0 {
        return Ok(Value::string(number_to_string(n)));
    }
    Ok(Value::string(to_radix_string(n, radix as u32)))
}

fn boolean_to_string(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(to_js_string(this)))
}

fn value_of(_interpreter: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(this.clone())
}

#[cfg(test)]
mod tests {
    use super::format_precision;
    use crate::engine::builtins::testing::{eval_error, eval_json};

    #[test]
    fn test_number_statics() {
        assert_eq!(
            eval_json("[Number.isInteger(5), Number.isInteger('5'), Number.isNaN('x'), Number.isSafeInteger(2 ** 53)]"),
            "[true,false,false,false]"
        );
        assert_eq!(eval_json("Number('  12 ') + Number('') + Number(true)"), "13");
        assert_eq!(eval_json("Number.MAX_SAFE_INTEGER"), "9007199254740991");
        assert_eq!(eval_json("Number.parseInt('08')"), "8");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(eval_json("(1.005).toFixed(2)"), r#""1.00""#);
        assert_eq!(eval_json("(255).toString(16)"), r#""ff""#);
        assert_eq!(eval_json("(123.456).toPrecision(4)"), r#""123.5""#);
        assert_eq!(eval_json("[Boolean(''), Boolean('0'), true.toString()]"), r#"[false,true,"true"]"#);
        assert_eq!(eval_error("(1).toFixed(101);"), "toFixed() digits argument must be between 0 and 100");
    }

    #[test]
    fn test_format_precision() {
        assert_eq!(format_precision(0.000123, 2), "0.00012");
        assert_eq!(format_precision(123456.0, 2), "1.2e+5");
        assert_eq!(format_precision(9.99, 2), "10");
        assert_eq!(format_precision(0.0, 3), "0.00");
    }
}
