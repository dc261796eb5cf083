//! Evaluator descriptors for dynamic properties
//!
//! A property "possessed" by an evaluator stores no per-frame samples;
//! its value at any playback time is recomputed from the descriptor and the
//! live property map. Descriptors are plain data (no captured closures), so
//! they can be recorded inside commands, cloned, and serialized.

use crate::{Ease, Expr, PropertyStore, Result, Value};
use serde::{Deserialize, Serialize};

/// A time-parameterized value recipe attached to a property cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Evaluator {
    /// Eased interpolation from `from` to `to` over `[start, start + duration)`
    ///
    /// Before `start` the value is `from`; after the window it is `to`.
    Linear {
        from: f64,
        to: f64,
        start: f64,
        duration: f64,
        ease: Ease,
    },
    /// Arbitrary arithmetic over live property values and playback time
    Expr(Expr),
}

impl Evaluator {
    /// Eased interpolation shorthand
    pub fn linear(from: f64, to: f64, start: f64, duration: f64) -> Self {
        Evaluator::Linear {
            from,
            to,
            start,
            duration,
            ease: Ease::Linear,
        }
    }

    /// Compute the current value against the live property map
    ///
    /// Playback time is read from the reserved TIME cell, which is how
    /// interpolation sees elapsed time without capturing external state.
    pub fn evaluate(&self, props: &PropertyStore) -> Result<Value> {
        match self {
            Evaluator::Linear {
                from,
                to,
                start,
                duration,
                ease,
            } => {
                let progress = if *duration <= 0.0 {
                    1.0
                } else {
                    (props.time() - start) / duration
                };
                let eased = ease.apply(progress);
                Ok(Value::Float(from + (to - from) * eased))
            }
            Evaluator::Expr(expr) => expr.eval(props),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PropertyId;

    #[test]
    fn test_linear_window() {
        let mut props = PropertyStore::new();
        let ev = Evaluator::linear(10.0, 20.0, 1.0, 2.0);

        props.set_time(0.5);
        assert_eq!(ev.evaluate(&props).unwrap().as_float(), Some(10.0));

        props.set_time(2.0);
        assert_eq!(ev.evaluate(&props).unwrap().as_float(), Some(15.0));

        props.set_time(5.0);
        assert_eq!(ev.evaluate(&props).unwrap().as_float(), Some(20.0));
    }

    #[test]
    fn test_zero_duration() {
        let mut props = PropertyStore::new();
        props.set_time(0.0);

        let ev = Evaluator::linear(1.0, 2.0, 0.0, 0.0);
        assert_eq!(ev.evaluate(&props).unwrap().as_float(), Some(2.0));
    }

    #[test]
    fn test_expr_evaluator() {
        let mut props = PropertyStore::new();
        let base = props.mint(Value::Float(3.0));
        props.set_time(2.0);

        // base + time
        let ev = Evaluator::Expr(Expr::Add(
            Box::new(Expr::prop(base)),
            Box::new(Expr::Time),
        ));
        assert_eq!(ev.evaluate(&props).unwrap().as_float(), Some(5.0));

        let bad = Evaluator::Expr(Expr::prop(PropertyId::new(404)));
        assert!(bad.evaluate(&props).is_err());
    }
}
