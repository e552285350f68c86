//! Arithmetic functions over `f64` with IEEE-754 semantics.
use std::f64::consts;

use super::{Const, Function, registry::Registry};

pub const ADD: &str = "add";
pub const SUB: &str = "sub";
pub const MUL: &str = "mul";
pub const DIV: &str = "div";
pub const MOD: &str = "mod";
pub const POW: &str = "pow";
pub const NEG: &str = "neg";

/// Names of the constants non-finite values print as.
pub const INF: &str = "inf";
pub const NAN: &str = "NaN";

macro_rules! unary {
    ($name:expr, $f:expr) => {
        Function::of($name, 1, |v: &[f64]| ($f)(v[0]))
    };
}

macro_rules! binary {
    ($name:expr, $f:expr) => {
        Function::of($name, 2, |v: &[f64]| ($f)(v[0], v[1]))
    };
}

impl Registry<f64> {
    /// The arithmetic function set with the constants `PI`, `π`, `e` (also
    /// spelled `E`), `inf` and `NaN`.
    pub fn math() -> Self {
        let mut registry = Registry::new();

        for function in [
            binary!(ADD, |a: f64, b: f64| a + b),
            binary!(SUB, |a: f64, b: f64| a - b),
            binary!(MUL, |a: f64, b: f64| a * b),
            binary!(DIV, |a: f64, b: f64| a / b),
            binary!(MOD, |a: f64, b: f64| a % b),
            binary!(POW, pow),
            unary!("abs", f64::abs),
            unary!(NEG, |a: f64| -a),
            unary!("id", |a: f64| a),
            binary!("min", min),
            binary!("max", max),
            unary!("ceil", f64::ceil),
            unary!("floor", f64::floor),
            unary!("signum", signum),
            unary!("rint", f64::round_ties_even),
            unary!("sqr", |a: f64| a * a),
            unary!("sqrt", f64::sqrt),
            unary!("cbrt", f64::cbrt),
            binary!("hypot", f64::hypot),
            unary!("exp", f64::exp),
            unary!("log", f64::ln),
            unary!("log10", f64::log10),
            unary!("sin", f64::sin),
            unary!("cos", f64::cos),
            unary!("tan", f64::tan),
            unary!("asin", f64::asin),
            unary!("acos", f64::acos),
            unary!("atan", f64::atan),
            unary!("cosh", f64::cosh),
            unary!("sinh", f64::sinh),
            unary!("tanh", f64::tanh),
            binary!("gt", |a: f64, b: f64| if a > b { 1.0 } else { -1.0 }),
        ] {
            registry.register(function);
        }

        let pi = Const::named("π", consts::PI);
        let e = Const::named("e", consts::E);
        registry
            .register_constant("PI", pi.clone())
            .register_constant("π", pi)
            .register_constant("e", e.clone())
            .register_constant("E", e)
            .register_constant(INF, Const::named(INF, f64::INFINITY))
            .register_constant(NAN, Const::named(NAN, f64::NAN));

        registry
    }
}

// A NaN exponent always yields NaN, even for a base of 1.
fn pow(a: f64, b: f64) -> f64 {
    if b.is_nan() { f64::NAN } else { a.powf(b) }
}

// Zeros and NaN map to themselves.
fn signum(a: f64) -> f64 {
    if a == 0.0 || a.is_nan() { a } else { a.signum() }
}

fn min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_negative() { a } else { b }
    } else {
        a.min(b)
    }
}

fn max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_positive() { a } else { b }
    } else {
        a.max(b)
    }
}
