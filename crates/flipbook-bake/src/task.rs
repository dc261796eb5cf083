//! Cooperative animator tasks
//!
//! A user procedure is an explicit state machine, not a language coroutine:
//! every `resume` call runs until the next wait point and reports how long
//! to sleep on the virtual clock. The scheduler owns the clock and polls
//! suspended animators when their wake time arrives.

use crate::{BakeResult, World};
use flipbook_core::{Ease, Evaluator, PropertyId};

/// A wait point: how long an animator sleeps on the virtual clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wait {
    /// Resume on the next tick
    Tick,
    /// Resume once the given number of seconds has elapsed
    Seconds(f64),
    /// Resume once the clock reaches the given absolute time
    Until(f64),
}

/// Result of one animator resumption
#[derive(Debug)]
pub enum Poll {
    /// Suspended; resume at the given wait point
    Pending(Wait),
    /// The animator has finished
    Done,
}

/// Context handed to every animator resumption
///
/// Carries the world explicitly (there is no ambient "current world") and
/// collects detached animators spawned during this resumption.
pub struct BakeCx<'a> {
    /// The recording world
    pub world: &'a mut World,
    spawned: Vec<Box<dyn Animator>>,
}

impl<'a> BakeCx<'a> {
    pub(crate) fn new(world: &'a mut World) -> Self {
        Self {
            world,
            spawned: Vec::new(),
        }
    }

    /// Current virtual time in seconds
    pub fn time(&self) -> f64 {
        self.world.now()
    }

    /// Spawn a detached animator
    ///
    /// It runs cooperatively on the same clock and records into the same
    /// log; its first resumption happens within the current tick, after the
    /// spawning animator yields. Resumption order is spawn order.
    pub fn spawn(&mut self, animator: Box<dyn Animator>) {
        self.spawned.push(animator);
    }

    /// Convenience: spawn a tween on an entity field or dynamic property
    pub fn tween(&mut self, property: PropertyId, to: f64, duration: f64, ease: Ease) {
        self.spawn(Box::new(Tween::new(property, to, duration, ease)));
    }

    pub(crate) fn take_spawned(&mut self) -> Vec<Box<dyn Animator>> {
        std::mem::take(&mut self.spawned)
    }
}

/// A cooperative animation procedure
///
/// `resume` is called once at bake start and again whenever the wait point
/// it returned has been reached. Returning `Err` aborts the bake and takes
/// the error-substitution path.
pub trait Animator: Send {
    /// Run until the next wait point or completion
    fn resume(&mut self, cx: &mut BakeCx<'_>) -> BakeResult<Poll>;
}

// A bare closure works as a one-shot animator body; useful in tests and for
// procedures with no state of their own.
impl<F> Animator for F
where
    F: FnMut(&mut BakeCx<'_>) -> BakeResult<Poll> + Send,
{
    fn resume(&mut self, cx: &mut BakeCx<'_>) -> BakeResult<Poll> {
        self(cx)
    }
}

/// Built-in interpolation task
///
/// On its first resumption it reads the property's current value, installs
/// a `Linear` evaluator from there to `to`, and sleeps until the window
/// closes; on its second it releases the evaluator with the exact target
/// value, so the hand-off carries no floating point drift.
pub struct Tween {
    property: PropertyId,
    to: f64,
    duration: f64,
    ease: Ease,
    installed: bool,
}

impl Tween {
    /// Tween `property` to `to` over `duration` seconds from now
    pub fn new(property: PropertyId, to: f64, duration: f64, ease: Ease) -> Self {
        Self {
            property,
            to,
            duration,
            ease,
            installed: false,
        }
    }
}

impl Animator for Tween {
    fn resume(&mut self, cx: &mut BakeCx<'_>) -> BakeResult<Poll> {
        if !self.installed {
            let start = cx.time();
            let from = cx
                .world
                .property(self.property)?
                .as_float()
                .unwrap_or(0.0);
            cx.world.begin_evaluator(
                self.property,
                Evaluator::Linear {
                    from,
                    to: self.to,
                    start,
                    duration: self.duration,
                    ease: self.ease,
                },
            )?;
            self.installed = true;
            Ok(Poll::Pending(Wait::Until(start + self.duration)))
        } else {
            cx.world.end_evaluator(self.property, self.to)?;
            Ok(Poll::Done)
        }
    }
}

/// Run a list of animators one after another
pub struct Seq {
    stages: std::collections::VecDeque<Box<dyn Animator>>,
}

impl Seq {
    /// Build a sequence from stages, run in order
    pub fn new(stages: Vec<Box<dyn Animator>>) -> Self {
        Self {
            stages: stages.into(),
        }
    }
}

impl Animator for Seq {
    fn resume(&mut self, cx: &mut BakeCx<'_>) -> BakeResult<Poll> {
        while let Some(stage) = self.stages.front_mut() {
            match stage.resume(cx)? {
                Poll::Pending(wait) => return Ok(Poll::Pending(wait)),
                Poll::Done => {
                    self.stages.pop_front();
                }
            }
        }
        Ok(Poll::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipbook_core::{FrameRate, Value};

    #[test]
    fn test_closure_animator() {
        let mut world = World::new(FrameRate(60));
        world.open_editor("test");
        let mut cx = BakeCx::new(&mut world);

        let mut body = |cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
            cx.world.marker("hello");
            Ok(Poll::Done)
        };
        assert!(matches!(body.resume(&mut cx).unwrap(), Poll::Done));
        assert_eq!(world.log_len(), 1);
    }

    #[test]
    fn test_tween_installs_then_releases() {
        let mut world = World::new(FrameRate(60));
        world.open_editor("test");
        let pid = world.create_property(2.0);

        let mut tween = Tween::new(pid, 10.0, 1.0, Ease::Linear);

        let mut cx = BakeCx::new(&mut world);
        match tween.resume(&mut cx).unwrap() {
            Poll::Pending(Wait::Until(t)) => assert_eq!(t, 1.0),
            other => panic!("unexpected poll {:?}", other),
        }
        assert!(world.props().get(pid).unwrap().evaluator.is_some());

        let mut cx = BakeCx::new(&mut world);
        assert!(matches!(tween.resume(&mut cx).unwrap(), Poll::Done));
        assert!(world.props().get(pid).unwrap().evaluator.is_none());
        assert_eq!(world.property(pid).unwrap(), Value::Float(10.0));
    }

    #[test]
    fn test_seq_runs_stages_in_order() {
        let mut world = World::new(FrameRate(60));
        world.open_editor("test");

        let mut seq = Seq::new(vec![
            Box::new(|cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
                cx.world.marker("first");
                Ok(Poll::Done)
            }),
            Box::new(|cx: &mut BakeCx<'_>| -> BakeResult<Poll> {
                cx.world.marker("second");
                Ok(Poll::Done)
            }),
        ]);

        let mut cx = BakeCx::new(&mut world);
        assert!(matches!(seq.resume(&mut cx).unwrap(), Poll::Done));

        let names: Vec<_> = world
            .log()
            .iter()
            .filter_map(|c| match &c.op {
                flipbook_core::CommandOp::Marker { name } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
