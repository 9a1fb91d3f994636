use super::{arg, Member};
use crate::engine::ast::BinaryOp;
use crate::engine::interpreter::{EvalResult, Interpreter};
use crate::engine::number::{to_int32, to_uint32};
use crate::engine::value::{to_number, JsString, Value};

macro_rules! unary {
    ($($name:ident => $f:expr),* $(,)?) => {
        $(
            fn $name(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
                let f: fn(f64) -> f64 = $f;
                Ok(Value::Number(f(to_number(&arg(args, 0)))))
            }
        )*
    };
}

unary! {
    abs => f64::abs,
    floor => f64::floor,
    ceil => f64::ceil,
    trunc => f64::trunc,
    sign => |x| if x.is_nan() || x == 0.0 { x } else { x.signum() },
    sqrt => f64::sqrt,
    cbrt => f64::cbrt,
    exp => f64::exp,
    expm1 => f64::exp_m1,
    log => f64::ln,
    log2 => f64::log2,
    log10 => f64::log10,
    log1p => f64::ln_1p,
    sin => f64::sin,
    cos => f64::cos,
    tan => f64::tan,
    asin => f64::asin,
    acos => f64::acos,
    atan => f64::atan,
    sinh => f64::sinh,
    cosh => f64::cosh,
    tanh => f64::tanh,
    asinh => f64::asinh,
    acosh => f64::acosh,
    atanh => f64::atanh,
    fround => |x| x as f32 as f64,
    round => js_round,
    clz32 => |x| to_uint32(x).leading_zeros() as f64,
}

/// Rounds half-way cases towards +∞.
fn js_round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

pub fn install(interpreter: &mut Interpreter) {
    let members: &[Member] = &[
        ("abs", abs, 1),
        ("floor", floor, 1),
        ("ceil", ceil, 1),
        ("trunc", trunc, 1),
        ("round", round, 1),
        ("sign", sign, 1),
        ("sqrt", sqrt, 1),
        ("cbrt", cbrt, 1),
        ("exp", exp, 1),
        ("expm1", expm1, 1),
        ("log", log, 1),
        ("log2", log2, 1),
        ("log10", log10, 1),
        ("log1p", log1p, 1),
        ("sin", sin, 1),
        ("cos", cos, 1),
        ("tan", tan, 1),
        ("asin", asin, 1),
        ("acos", acos, 1),
        ("atan", atan, 1),
        ("sinh", sinh, 1),
        ("cosh", cosh, 1),
        ("tanh", tanh, 1),
        ("asinh", asinh, 1),
        ("acosh", acosh, 1),
        ("atanh", atanh, 1),
        ("fround", fround, 1),
        ("clz32", clz32, 1),
        ("atan2", atan2, 2),
        ("pow", pow, 2),
        ("imul", imul, 2),
        ("hypot", hypot, 2),
        ("max", max, 2),
        ("min", min, 2),
        ("random", random, 0),
    ];
    let math = super::namespace(interpreter, members);
    let constants = [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ];
    {
        let mut inner = math.borrow_mut();
        for (name, value) in constants {
            inner.props.insert(JsString::from(name), Value::Number(value));
        }
    }
    interpreter.define_global("Math", Value::Object(math));
}

fn binary(args: &[Value]) -> (f64, f64) {
    (to_number(&arg(args, 0)), to_number(&arg(args, 1)))
}

fn atan2(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (y, x) = binary(args);
    Ok(Value::Number(y.atan2(x)))
}

fn pow(interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    interpreter.binary(BinaryOp::Pow, &arg(args, 0), &arg(args, 1))
}

fn imul(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (a, b) = binary(args);
    Ok(Value::Number(to_int32(a).wrapping_mul(to_int32(b)) as f64))
}

fn hypot(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let values: Vec<f64> = args.iter().map(to_number).collect();
    if values.iter().any(|v| v.is_infinite()) {
        return Ok(Value::Number(f64::INFINITY));
    }
    Ok(Value::Number(values.iter().map(|v| v * v).sum::<f64>().sqrt()))
}

fn extremum(args: &[Value], pick_max: bool) -> f64 {
    let mut result = if pick_max {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    };
    for value in args {
        let n = to_number(value);
        if n.is_nan() {
            return f64::NAN;
        }
        let better = if pick_max {
            n > result || (n == 0.0 && result == 0.0 && result.is_sign_negative())
        } else {
            n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative())
        };
        if better {
            result = n;
        }
    }
    result
}

fn max(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(extremum(args, true)))
}

fn min(_interpreter: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(extremum(args, false)))
}

fn random(interpreter: &mut Interpreter, _this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(interpreter.next_random()))
}

#[cfg(test)]
mod tests {
    use super::js_round;
    use crate::engine::builtins::testing::eval_json;

    #[test]
    fn test_rounding() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert_eq!(js_round(0.49999999999999994), 0.0);
        assert!(js_round(-0.4).is_sign_negative());
        assert_eq!(eval_json("[Math.floor(-1.5), Math.ceil(1.2), Math.trunc(-1.7), Math.sign(-3)]"), "[-2,2,-1,-1]");
    }

    #[test]
    fn test_extrema() {
        assert_eq!(eval_json("[Math.max(1, 3, 2), Math.min(), Math.max()]"), "[3,null,null]");
        assert_eq!(eval_json("Math.max(1, NaN)"), "null");
        assert_eq!(eval_json("Math.max(...[4, 9, 2])"), "9");
        assert_eq!(eval_json("[Math.pow(2, 10), Math.hypot(3, 4), Math.imul(3, 4)]"), "[1024,5,12]");
    }

    #[test]
    fn test_random_stays_in_unit_interval() {
        assert_eq!(
            eval_json("Array.from({ length: 100 }, () => Math.random()).every(x => x >= 0 && x < 1)"),
            "true"
        );
    }
}
