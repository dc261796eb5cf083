//! Virtual time for baking and playback
//!
//! The bake scheduler and the replay machine both measure time in seconds on
//! a virtual clock that never consults the wall clock. The bake side advances
//! in fixed steps of one frame; the playback side moves by arbitrary deltas.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete frame counter on the bake clock
pub type Tick = u64;

/// Frames per second of the virtual clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate(pub u32);

impl FrameRate {
    /// Seconds covered by one tick
    pub fn dt(&self) -> f64 {
        1.0 / self.0 as f64
    }

    /// Convert a tick count to seconds
    pub fn seconds(&self, tick: Tick) -> f64 {
        tick as f64 * self.dt()
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        FrameRate(60)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}fps", self.0)
    }
}

/// The virtual bake clock: a tick counter plus a frame rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    /// Current tick number
    pub tick: Tick,
    /// Frame rate used to derive seconds
    pub fps: FrameRate,
}

impl Clock {
    /// Create a clock at t=0
    pub fn new(fps: FrameRate) -> Self {
        Self { tick: 0, fps }
    }

    /// Advance to the next tick
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Current virtual time in seconds
    pub fn seconds(&self) -> f64 {
        self.fps.seconds(self.tick)
    }

    /// First tick at or after the given time in seconds
    ///
    /// Times a rounding error short of a frame boundary land on that
    /// boundary, not one frame later.
    pub fn tick_at(&self, seconds: f64) -> Tick {
        ((seconds * self.fps.0 as f64) - 1e-9).ceil().max(0.0) as Tick
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(FrameRate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_seconds() {
        let mut clock = Clock::new(FrameRate(60));
        assert_eq!(clock.seconds(), 0.0);

        for _ in 0..60 {
            clock.advance();
        }
        assert!((clock.seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_at() {
        let clock = Clock::new(FrameRate(60));
        assert_eq!(clock.tick_at(0.0), 0);
        assert_eq!(clock.tick_at(1.0), 60);
        // Times between ticks round up to the next frame boundary
        assert_eq!(clock.tick_at(0.001), 1);
    }

    #[test]
    fn test_frame_rate_dt() {
        assert!((FrameRate(60).dt() - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(FrameRate::default().0, 60);
        assert_eq!(format!("{}", FrameRate(30)), "30fps");
    }
}
