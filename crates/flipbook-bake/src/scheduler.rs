//! The deterministic bake scheduler
//!
//! Runs a cooperative animator under a fixed-step virtual clock and turns
//! its side effects into a finished `Program`. The schedule is fully
//! deterministic: tasks are resumed in spawn order, the clock advances by
//! exactly one frame per tick, and nothing ever consults wall-clock time.

use crate::{Animator, BakeCx, EntitySeed, Poll, Wait, World};
use flipbook_core::{Baked, BakeFailure, FrameRate, Tick};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error};

/// Bake parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BakeConfig {
    /// Virtual clock rate
    pub fps: FrameRate,
    /// Hard bound on baked duration, in virtual seconds
    pub max_duration: f64,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            fps: FrameRate::default(),
            max_duration: 300.0,
        }
    }
}

/// Lifecycle of one bake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No bake has run yet
    NotStarted,
    /// Currently resuming tasks within a tick
    Running,
    /// Between ticks with tasks still pending
    Suspended,
    /// The root animator finished (or the duration bound was reached)
    Completed,
    /// The bake recovered from a failure; the error animation was substituted
    Failed,
}

/// One suspended animator and its wake tick
struct Task {
    animator: Box<dyn Animator>,
    wake: Tick,
    root: bool,
    done: bool,
}

/// Runs animators against a virtual clock and produces `Baked` results
pub struct BakeScheduler {
    config: BakeConfig,
    state: SchedulerState,
}

impl BakeScheduler {
    /// Create a scheduler with the given config
    pub fn new(config: BakeConfig) -> Self {
        Self {
            config,
            state: SchedulerState::NotStarted,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Bake a program from the root animator
    ///
    /// Never panics and never returns an error: a failing procedure yields
    /// the fixed error animation with `failure` set.
    pub fn bake(&mut self, root: Box<dyn Animator>) -> Baked {
        self.state = SchedulerState::Running;
        let mut world = World::new(self.config.fps);
        world.open_editor("bake");

        match self.run(&mut world, root) {
            Ok(()) => {
                self.state = SchedulerState::Completed;
                let handles = world.take_handles();
                let audio = world.take_audio();
                world.close_editor();
                let program = world.finish();
                debug!(
                    duration = program.duration,
                    commands = program.len(),
                    "bake completed"
                );
                Baked {
                    program,
                    handles,
                    audio,
                    failure: None,
                }
            }
            Err(failure) => {
                self.state = SchedulerState::Failed;
                error!(message = %failure.message, "bake failed; substituting error animation");
                let program = self.error_program(&failure.message);
                Baked {
                    program,
                    handles: Vec::new(),
                    audio: Default::default(),
                    failure: Some(failure),
                }
            }
        }
    }

    /// The cooperative loop; `Err` means the partial world must be discarded
    fn run(&mut self, world: &mut World, root: Box<dyn Animator>) -> Result<(), BakeFailure> {
        let mut tasks = vec![Task {
            animator: root,
            wake: 0,
            root: true,
            done: false,
        }];

        loop {
            self.state = SchedulerState::Running;
            let now_tick = world.clock().tick;

            // Resume every due task in spawn order. Tasks spawned during a
            // resumption are appended, so this same pass gives them their
            // first resumption within the spawning tick.
            let mut i = 0;
            while i < tasks.len() {
                if !tasks[i].done && tasks[i].wake <= now_tick {
                    Self::resume_task(world, &mut tasks, i)?;
                }
                i += 1;
            }
            tasks.retain(|t| !t.done);

            // Re-evaluate possessed cells once per tick, after all
            // structural commands for the tick have been recorded.
            world
                .evaluate_pass()
                .map_err(|e| BakeFailure {
                    message: e.to_string(),
                    trace: format!("{:?}", e),
                })?;

            if !tasks.iter().any(|t| t.root) {
                return Ok(());
            }
            if world.now() >= self.config.max_duration {
                debug!(max = self.config.max_duration, "duration bound reached");
                return Ok(());
            }

            self.state = SchedulerState::Suspended;
            world.advance_tick();
        }
    }

    /// Resume one task, converting `Err` and panics into `BakeFailure`
    fn resume_task(
        world: &mut World,
        tasks: &mut Vec<Task>,
        index: usize,
    ) -> Result<(), BakeFailure> {
        let mut cx = BakeCx::new(world);
        let outcome = catch_unwind(AssertUnwindSafe(|| tasks[index].animator.resume(&mut cx)));
        let spawned = cx.take_spawned();

        let now_tick = world.clock().tick;
        for animator in spawned {
            tasks.push(Task {
                animator,
                wake: now_tick,
                root: false,
                done: false,
            });
        }

        match outcome {
            Ok(Ok(Poll::Done)) => {
                tasks[index].done = true;
                Ok(())
            }
            Ok(Ok(Poll::Pending(wait))) => {
                tasks[index].wake = wake_tick(world, wait);
                Ok(())
            }
            Ok(Err(e)) => Err(BakeFailure {
                message: e.to_string(),
                trace: format!("{:?}", e),
            }),
            Err(payload) => Err(BakeFailure {
                message: panic_message(&payload),
                trace: String::new(),
            }),
        }
    }

    /// The fixed two-line animation shown in place of a failed bake
    fn error_program(&self, message: &str) -> flipbook_core::Program {
        let mut world = World::new(self.config.fps);
        world.open_editor("error");
        let _ = world.create(
            EntitySeed::new("text")
                .with_state("text", "Something went wrong")
                .with_field("opacity", 1.0)
                .with_sort_key(1),
        );
        let _ = world.create(
            EntitySeed::new("text")
                .with_state("text", message)
                .with_field("opacity", 1.0)
                .with_sort_key(2),
        );
        // Hold the message on screen for one second of timeline
        for _ in 0..self.config.fps.0 {
            world.advance_tick();
        }
        world.close_editor();
        world.finish()
    }
}

impl Default for BakeScheduler {
    fn default() -> Self {
        Self::new(BakeConfig::default())
    }
}

/// First tick at which a wait point is satisfied, always in the future
fn wake_tick(world: &World, wait: Wait) -> Tick {
    let next = world.clock().tick + 1;
    match wait {
        Wait::Tick => next,
        Wait::Seconds(s) => world.clock().tick_at(world.now() + s).max(next),
        Wait::Until(t) => world.clock().tick_at(t).max(next),
    }
}

/// Best-effort human-readable panic payload
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "procedure panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BakeError, BakeResult};
    use flipbook_core::{CommandOp, Ease, EntityId, Value};

    fn config() -> BakeConfig {
        BakeConfig {
            fps: FrameRate(60),
            ..Default::default()
        }
    }

    #[test]
    fn test_bake_simple_timeline() {
        let mut step = 0usize;
        let mut id = EntityId::NONE;
        let root = move |cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
            step += 1;
            match step {
                1 => {
                    id = cx.world.create(EntitySeed::new("circle").with_field("x", 0.0))?;
                    Ok(Poll::Pending(Wait::Seconds(1.0)))
                }
                _ => {
                    cx.world.set_field(id, "x", 5.0)?;
                    Ok(Poll::Done)
                }
            }
        };

        let mut scheduler = BakeScheduler::new(config());
        let baked = scheduler.bake(Box::new(root));

        assert!(baked.failure.is_none());
        assert_eq!(scheduler.state(), SchedulerState::Completed);
        assert!((baked.program.duration - 1.0).abs() < 1e-9);
        baked.program.validate().unwrap();

        // The write landed at the 1s mark, not at t=0
        let write = baked
            .program
            .commands
            .iter()
            .find(|c| matches!(c.op, CommandOp::SetProperty { .. }))
            .unwrap();
        assert!((write.time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_spawned_tasks_resume_in_spawn_order() {
        let root = |cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
            cx.spawn(Box::new(|cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
                cx.world.marker("first");
                Ok(Poll::Done)
            }));
            cx.spawn(Box::new(|cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
                cx.world.marker("second");
                Ok(Poll::Done)
            }));
            Ok(Poll::Done)
        };

        let baked = BakeScheduler::new(config()).bake(Box::new(root));
        let names: Vec<_> = baked.program.markers().map(|(_, n)| n.to_string()).collect();
        assert_eq!(names, vec!["first", "second"]);
        // Both spawned markers landed inside the spawning tick
        for (time, _) in baked.program.markers() {
            assert_eq!(time, 0.0);
        }
    }

    #[test]
    fn test_tween_records_install_and_uninstall() {
        let mut step = 0usize;
        let root = move |cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
            step += 1;
            match step {
                1 => {
                    let id = cx.world.create(EntitySeed::new("circle").with_field("x", 0.0))?;
                    let pid = cx.world.field_property(id, "x")?;
                    cx.tween(pid, 8.0, 0.5, Ease::Linear);
                    Ok(Poll::Pending(Wait::Seconds(1.0)))
                }
                _ => Ok(Poll::Done),
            }
        };

        let baked = BakeScheduler::new(config()).bake(Box::new(root));
        assert!(baked.failure.is_none());
        baked.program.validate().unwrap();

        let installs = baked
            .program
            .commands
            .iter()
            .filter(|c| matches!(c.op, CommandOp::InstallEvaluator { .. }))
            .count();
        let uninstall = baked
            .program
            .commands
            .iter()
            .find_map(|c| match &c.op {
                CommandOp::UninstallEvaluator { after, .. } => Some(after.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(installs, 1);
        // The hand-off value is the exact tween target
        assert_eq!(uninstall, Value::Float(8.0));
    }

    #[test]
    fn test_failure_before_first_yield_substitutes_error_animation() {
        let root = |_cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
            Err(BakeError::Procedure("bad input".to_string()))
        };

        let mut scheduler = BakeScheduler::new(config());
        let baked = scheduler.bake(Box::new(root));

        assert!(baked.has_error());
        assert_eq!(scheduler.state(), SchedulerState::Failed);
        assert_eq!(baked.failure.as_ref().unwrap().message, "procedure failed: bad input");

        // The substituted program renders the two fixed lines
        let texts = baked
            .program
            .commands
            .iter()
            .filter(|c| matches!(c.op, CommandOp::CreateEntity { .. }))
            .count();
        assert_eq!(texts, 2);
        baked.program.validate().unwrap();
        assert!(baked.program.duration > 0.0);
    }

    #[test]
    fn test_panic_is_caught() {
        let root = |_cx: &mut BakeCx<'_>| -> BakeResult<Poll> { panic!("boom") };

        let baked = BakeScheduler::new(config()).bake(Box::new(root));
        assert!(baked.has_error());
        assert_eq!(baked.failure.as_ref().unwrap().message, "boom");
    }

    #[test]
    fn test_max_duration_bound() {
        let root = |cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
            cx.world.marker("beat");
            Ok(Poll::Pending(Wait::Tick))
        };

        let mut scheduler = BakeScheduler::new(BakeConfig {
            fps: FrameRate(60),
            max_duration: 0.1,
        });
        let baked = scheduler.bake(Box::new(root));

        assert!(baked.failure.is_none());
        assert!(baked.program.duration <= 0.1 + 1e-9);
        assert_eq!(scheduler.state(), SchedulerState::Completed);
    }

    #[test]
    fn test_handles_and_audio_collected() {
        let root = |cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
            cx.world.add_handle("grab-me");
            cx.world.push_audio("whoosh");
            Ok(Poll::Done)
        };

        let baked = BakeScheduler::new(config()).bake(Box::new(root));
        assert_eq!(baked.handles.len(), 1);
        assert_eq!(baked.handles[0].name, "grab-me");
        assert_eq!(baked.audio.cues.len(), 1);
        assert_eq!(baked.audio.cues[0].start, 0.0);
    }
}
