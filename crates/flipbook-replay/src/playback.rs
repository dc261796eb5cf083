//! Presentation-side playback control
//!
//! One `Playback` lives on the presentation context. It owns the current
//! `ReplayMachine`, drives it once per presentation tick, and swaps in
//! freshly baked programs from the hand-off mailbox without losing the
//! user's place on the timeline.

use crate::{ReplayMachine, WorldSnapshot};
use flipbook_bake::ProgramSlot;
use flipbook_core::{AudioTimeline, Baked, BakeFailure, Handle};
use tracing::debug;

/// State of the playback controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// No program installed yet
    Idle,
    /// Auto-advancing
    Playing,
    /// Holding position
    Paused,
    /// Reached the end of the program
    Finished,
}

/// Drives a replay machine from presentation ticks
pub struct Playback {
    machine: Option<ReplayMachine>,
    state: PlayState,
    /// Playback rate multiplier (1.0 = real time)
    speed: f64,
    handles: Vec<Handle>,
    audio: AudioTimeline,
    failure: Option<BakeFailure>,
}

impl Playback {
    /// Create a controller with nothing installed
    pub fn new() -> Self {
        Self {
            machine: None,
            state: PlayState::Idle,
            speed: 1.0,
            handles: Vec::new(),
            audio: AudioTimeline::default(),
            failure: None,
        }
    }

    /// Current controller state
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Check whether a program is installed
    pub fn has_program(&self) -> bool {
        self.machine.is_some()
    }

    /// Interaction points of the installed bake
    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    /// Audio timeline of the installed bake
    pub fn audio(&self) -> &AudioTimeline {
        &self.audio
    }

    /// Failure report of the installed bake, if it recovered from one
    pub fn failure(&self) -> Option<&BakeFailure> {
        self.failure.as_ref()
    }

    /// Swap in a new bake, preserving relative progress
    ///
    /// Carrying `progress = t / duration` over (not absolute time) keeps the
    /// playhead visually in place when a rebake changes the duration.
    pub fn install(&mut self, baked: Baked) {
        let progress = self.get_progress();
        debug!(
            duration = baked.program.duration,
            progress, "installing new program"
        );

        let mut machine = ReplayMachine::new(baked.program);
        machine.seek(progress);
        self.machine = Some(machine);
        self.handles = baked.handles;
        self.audio = baked.audio;
        self.failure = baked.failure;
        if self.state == PlayState::Idle || self.state == PlayState::Finished {
            self.state = PlayState::Paused;
        }
    }

    /// Drain the hand-off mailbox; true when a new program was installed
    pub fn poll(&mut self, slot: &ProgramSlot) -> bool {
        match slot.take() {
            Some(baked) => {
                self.install(baked);
                true
            }
            None => false,
        }
    }

    /// Start auto-advancing
    pub fn play(&mut self) {
        if self.machine.is_some() && self.state != PlayState::Finished {
            self.state = PlayState::Playing;
        }
    }

    /// Hold position
    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
        }
    }

    /// Toggle between playing and paused
    pub fn toggle(&mut self) {
        match self.state {
            PlayState::Playing => self.pause(),
            PlayState::Paused => self.play(),
            PlayState::Finished => {
                // Replay from the start
                self.seek(0.0);
                self.play();
            }
            PlayState::Idle => {}
        }
    }

    /// Set the playback rate multiplier
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.max(0.0);
    }

    /// Advance by one presentation tick of `dt` wall seconds
    ///
    /// Only moves while playing; flips to `Finished` at the end boundary.
    pub fn tick(&mut self, dt: f64) {
        if self.state != PlayState::Playing {
            return;
        }
        let speed = self.speed;
        if let Some(machine) = self.machine.as_mut() {
            let at_boundary = machine.step(dt * speed);
            if at_boundary && machine.time() >= machine.duration() {
                self.state = PlayState::Finished;
            }
        }
    }

    /// Move by a signed delta in seconds, regardless of state
    pub fn step(&mut self, delta: f64) {
        if let Some(machine) = self.machine.as_mut() {
            machine.step(delta);
        }
        self.refresh_finished();
    }

    /// Seek to a relative progress in `[0, 1]`
    pub fn seek(&mut self, progress: f64) {
        if let Some(machine) = self.machine.as_mut() {
            machine.seek(progress);
        }
        self.refresh_finished();
    }

    /// Seek to an absolute time in seconds
    pub fn seek_seconds(&mut self, t: f64) {
        if let Some(machine) = self.machine.as_mut() {
            machine.seek_seconds(t);
        }
        self.refresh_finished();
    }

    /// Current progress in `[0, 1]`
    pub fn get_progress(&self) -> f64 {
        self.machine.as_ref().map_or(0.0, |m| m.progress())
    }

    /// Current playback time in seconds
    pub fn get_playback_time(&self) -> f64 {
        self.machine.as_ref().map_or(0.0, |m| m.time())
    }

    /// Duration of the installed program in seconds
    pub fn duration(&self) -> f64 {
        self.machine.as_ref().map_or(0.0, |m| m.duration())
    }

    /// Resolve the current world state for the renderer
    pub fn snapshot(&self) -> Option<WorldSnapshot> {
        self.machine.as_ref().map(|m| m.snapshot())
    }

    /// Leaving the end boundary by seeking clears the finished latch
    fn refresh_finished(&mut self) {
        if self.state == PlayState::Finished {
            if let Some(machine) = self.machine.as_ref() {
                if machine.time() < machine.duration() {
                    self.state = PlayState::Paused;
                }
            }
        }
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipbook_bake::{BakeCx, BakeConfig, BakeResult, BakeScheduler, EntitySeed, Poll, Wait};
    use flipbook_core::FrameRate;

    fn bake_two_seconds() -> Baked {
        let mut step = 0usize;
        let root = move |cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
            step += 1;
            match step {
                1 => {
                    cx.world.create(EntitySeed::new("circle").with_field("x", 0.0))?;
                    Ok(Poll::Pending(Wait::Seconds(2.0)))
                }
                _ => Ok(Poll::Done),
            }
        };
        BakeScheduler::new(BakeConfig {
            fps: FrameRate(60),
            ..Default::default()
        })
        .bake(Box::new(root))
    }

    #[test]
    fn test_idle_until_installed() {
        let mut playback = Playback::new();
        assert_eq!(playback.state(), PlayState::Idle);
        assert!(playback.snapshot().is_none());

        playback.play();
        assert_eq!(playback.state(), PlayState::Idle);

        playback.install(bake_two_seconds());
        assert_eq!(playback.state(), PlayState::Paused);
        assert!(playback.snapshot().is_some());
    }

    #[test]
    fn test_tick_advances_and_finishes() {
        let mut playback = Playback::new();
        playback.install(bake_two_seconds());
        playback.play();

        playback.tick(0.5);
        assert!((playback.get_playback_time() - 0.5).abs() < 1e-9);
        assert_eq!(playback.state(), PlayState::Playing);

        playback.tick(10.0);
        assert_eq!(playback.state(), PlayState::Finished);
        assert!((playback.get_progress() - 1.0).abs() < 1e-9);

        // Scrubbing away from the end releases the latch
        playback.seek(0.25);
        assert_eq!(playback.state(), PlayState::Paused);
    }

    #[test]
    fn test_paused_tick_holds_position() {
        let mut playback = Playback::new();
        playback.install(bake_two_seconds());

        playback.tick(0.5);
        assert_eq!(playback.get_playback_time(), 0.0);
    }

    #[test]
    fn test_install_preserves_relative_progress() {
        let mut playback = Playback::new();
        playback.install(bake_two_seconds());
        playback.seek(0.5);
        assert!((playback.get_playback_time() - 1.0).abs() < 1e-9);

        // A rebake lands; the playhead keeps its relative place
        playback.install(bake_two_seconds());
        assert!((playback.get_progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_poll_drains_slot() {
        let slot = ProgramSlot::new();
        let mut playback = Playback::new();

        assert!(!playback.poll(&slot));

        slot.publish(bake_two_seconds());
        assert!(playback.poll(&slot));
        assert!(playback.has_program());
        assert!(!playback.poll(&slot), "slot drains on read");
    }

    #[test]
    fn test_speed_multiplier() {
        let mut playback = Playback::new();
        playback.install(bake_two_seconds());
        playback.set_speed(2.0);
        playback.play();

        playback.tick(0.25);
        assert!((playback.get_playback_time() - 0.5).abs() < 1e-9);
    }
}
