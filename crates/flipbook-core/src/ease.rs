//! Easing curves for tweened properties

use serde::{Deserialize, Serialize};

/// An easing curve mapping normalized progress to normalized progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Ease {
    /// No easing
    #[default]
    Linear,
    /// Quadratic ease-in
    InQuad,
    /// Quadratic ease-out
    OutQuad,
    /// Quadratic ease-in-out
    InOutQuad,
    /// Cubic ease-in
    InCubic,
    /// Cubic ease-out
    OutCubic,
    /// Cubic ease-in-out
    InOutCubic,
}

impl Ease {
    /// Apply the curve to a progress value, clamped to `[0, 1]`
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        for ease in [
            Ease::Linear,
            Ease::InQuad,
            Ease::OutQuad,
            Ease::InOutQuad,
            Ease::InCubic,
            Ease::OutCubic,
            Ease::InOutCubic,
        ] {
            assert_eq!(ease.apply(0.0), 0.0, "{:?} at 0", ease);
            assert_eq!(ease.apply(1.0), 1.0, "{:?} at 1", ease);
        }
    }

    #[test]
    fn test_clamping() {
        assert_eq!(Ease::Linear.apply(-0.5), 0.0);
        assert_eq!(Ease::Linear.apply(1.5), 1.0);
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(Ease::Linear.apply(0.5), 0.5);
        assert_eq!(Ease::InOutQuad.apply(0.5), 0.5);
        assert!(Ease::InQuad.apply(0.5) < 0.5);
        assert!(Ease::OutQuad.apply(0.5) > 0.5);
    }
}
