//! Expression engine for evaluator-backed properties
//!
//! Expressions are stored by value inside `InstallEvaluator` commands and
//! evaluated on demand against the live property map. They deliberately have
//! no access to anything except property cells and playback time, so a
//! recorded program replays identically on every machine.

use crate::{Error, PropertyId, PropertyStore, Result, Value};
use serde::{Deserialize, Serialize};

/// An expression that can be evaluated to produce a Value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    // === Literals ===
    /// A literal value
    Literal(Value),

    // === Property access ===
    /// Read a live property cell
    Prop(PropertyId),
    /// Read the current playback time in seconds
    Time,

    // === Arithmetic ===
    /// Add two expressions
    Add(Box<Expr>, Box<Expr>),
    /// Subtract second from first
    Sub(Box<Expr>, Box<Expr>),
    /// Multiply two expressions
    Mul(Box<Expr>, Box<Expr>),
    /// Divide first by second
    Div(Box<Expr>, Box<Expr>),
    /// Negate a numeric value
    Neg(Box<Expr>),
    /// Minimum of two values
    Min(Box<Expr>, Box<Expr>),
    /// Maximum of two values
    Max(Box<Expr>, Box<Expr>),
    /// Clamp value between min and max
    Clamp(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Interpolate: `Lerp(a, b, t)` is `a + (b - a) * t`
    Lerp(Box<Expr>, Box<Expr>, Box<Expr>),

    // === Comparison ===
    /// Less than
    Lt(Box<Expr>, Box<Expr>),
    /// Greater than
    Gt(Box<Expr>, Box<Expr>),

    // === Conditionals ===
    /// If-then-else
    If(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate this expression against the live property map
    pub fn eval(&self, props: &PropertyStore) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),

            Expr::Prop(id) => props
                .value(*id)
                .cloned()
                .ok_or(Error::PropertyNotFound(*id)),
            Expr::Time => Ok(Value::Float(props.time())),

            Expr::Add(a, b) => {
                let va = a.eval(props)?;
                let vb = b.eval(props)?;
                numeric_op(&va, &vb, |x, y| x + y)
            }
            Expr::Sub(a, b) => {
                let va = a.eval(props)?;
                let vb = b.eval(props)?;
                numeric_op(&va, &vb, |x, y| x - y)
            }
            Expr::Mul(a, b) => {
                let va = a.eval(props)?;
                let vb = b.eval(props)?;
                numeric_op(&va, &vb, |x, y| x * y)
            }
            Expr::Div(a, b) => {
                let va = a.eval(props)?;
                let vb = b.eval(props)?;
                let fb = vb.as_float().ok_or_else(|| Error::TypeError {
                    expected: "number".to_string(),
                    got: vb.type_name().to_string(),
                })?;
                if fb == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                numeric_op(&va, &vb, |x, y| x / y)
            }
            Expr::Neg(a) => {
                let f = as_number(&a.eval(props)?)?;
                Ok(Value::Float(-f))
            }
            Expr::Min(a, b) => {
                let fa = as_number(&a.eval(props)?)?;
                let fb = as_number(&b.eval(props)?)?;
                Ok(Value::Float(fa.min(fb)))
            }
            Expr::Max(a, b) => {
                let fa = as_number(&a.eval(props)?)?;
                let fb = as_number(&b.eval(props)?)?;
                Ok(Value::Float(fa.max(fb)))
            }
            Expr::Clamp(val, min, max) => {
                let fv = as_number(&val.eval(props)?)?;
                let fmin = as_number(&min.eval(props)?)?;
                let fmax = as_number(&max.eval(props)?)?;
                Ok(Value::Float(fv.clamp(fmin, fmax)))
            }
            Expr::Lerp(a, b, t) => {
                let fa = as_number(&a.eval(props)?)?;
                let fb = as_number(&b.eval(props)?)?;
                let ft = as_number(&t.eval(props)?)?;
                Ok(Value::Float(fa + (fb - fa) * ft))
            }

            Expr::Lt(a, b) => {
                let fa = as_number(&a.eval(props)?)?;
                let fb = as_number(&b.eval(props)?)?;
                Ok(Value::Bool(fa < fb))
            }
            Expr::Gt(a, b) => {
                let fa = as_number(&a.eval(props)?)?;
                let fb = as_number(&b.eval(props)?)?;
                Ok(Value::Bool(fa > fb))
            }

            Expr::If(cond, then_expr, else_expr) => {
                let vc = cond.eval(props)?;
                if vc.is_truthy() {
                    then_expr.eval(props)
                } else {
                    else_expr.eval(props)
                }
            }
        }
    }

    /// Create a literal expression
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Create a property access expression
    pub fn prop(id: PropertyId) -> Self {
        Expr::Prop(id)
    }
}

/// Helper to perform numeric operations
fn numeric_op(a: &Value, b: &Value, op: fn(f64, f64) -> f64) -> Result<Value> {
    let fa = as_number(a)?;
    let fb = as_number(b)?;
    Ok(Value::Float(op(fa, fb)))
}

/// Helper to coerce a value to f64
fn as_number(v: &Value) -> Result<f64> {
    v.as_float().ok_or_else(|| Error::TypeError {
        expected: "number".to_string(),
        got: v.type_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        let props = PropertyStore::new();

        let expr = Expr::lit(42i64);
        assert_eq!(expr.eval(&props).unwrap(), Value::Int(42));

        let expr = Expr::lit(2.5);
        assert_eq!(expr.eval(&props).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_arithmetic() {
        let props = PropertyStore::new();

        let expr = Expr::Add(Box::new(Expr::lit(10.0)), Box::new(Expr::lit(5.0)));
        assert_eq!(expr.eval(&props).unwrap().as_float(), Some(15.0));

        let expr = Expr::Mul(Box::new(Expr::lit(3.0)), Box::new(Expr::lit(4.0)));
        assert_eq!(expr.eval(&props).unwrap().as_float(), Some(12.0));
    }

    #[test]
    fn test_division_by_zero() {
        let props = PropertyStore::new();
        let expr = Expr::Div(Box::new(Expr::lit(1.0)), Box::new(Expr::lit(0.0)));
        assert!(matches!(expr.eval(&props), Err(Error::DivisionByZero)));
    }

    #[test]
    fn test_property_access() {
        let mut props = PropertyStore::new();
        let id = props.mint(Value::Float(100.0));

        let expr = Expr::prop(id);
        assert_eq!(expr.eval(&props).unwrap().as_float(), Some(100.0));

        let missing = Expr::prop(PropertyId::new(999));
        assert!(matches!(
            missing.eval(&props),
            Err(Error::PropertyNotFound(_))
        ));
    }

    #[test]
    fn test_time_access() {
        let mut props = PropertyStore::new();
        props.set_time(1.5);

        let expr = Expr::Time;
        assert_eq!(expr.eval(&props).unwrap().as_float(), Some(1.5));
    }

    #[test]
    fn test_lerp_clamp() {
        let props = PropertyStore::new();

        let expr = Expr::Lerp(
            Box::new(Expr::lit(0.0)),
            Box::new(Expr::lit(10.0)),
            Box::new(Expr::lit(0.25)),
        );
        assert_eq!(expr.eval(&props).unwrap().as_float(), Some(2.5));

        let expr = Expr::Clamp(
            Box::new(Expr::lit(5.0)),
            Box::new(Expr::lit(0.0)),
            Box::new(Expr::lit(1.0)),
        );
        assert_eq!(expr.eval(&props).unwrap().as_float(), Some(1.0));
    }

    #[test]
    fn test_conditional() {
        let props = PropertyStore::new();

        let expr = Expr::If(
            Box::new(Expr::Gt(Box::new(Expr::lit(2.0)), Box::new(Expr::lit(1.0)))),
            Box::new(Expr::lit("yes")),
            Box::new(Expr::lit("no")),
        );
        assert_eq!(expr.eval(&props).unwrap().as_str(), Some("yes"));
    }
}
