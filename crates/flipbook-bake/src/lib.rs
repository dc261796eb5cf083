//! Flipbook Bake - Deterministic recording side of the flipbook engine
//!
//! This crate turns an imperative animation procedure into a replayable
//! `Program`:
//! - `World` - the mutation-recording façade user code talks to
//! - `Animator`/`Wait`/`Poll` - the explicit cooperative task protocol
//! - `BakeScheduler` - the fixed-step virtual-clock executor
//! - `ProgramSlot`/`RebakeSignal` - the hand-off to the playback context
//!
//! Baking is one deterministic forward execution; nothing here consults
//! wall-clock time or ambient global state. A failing procedure never
//! escapes: the scheduler substitutes a fixed error animation and reports
//! the failure in-band.

mod error;
mod mailbox;
mod scheduler;
mod task;
mod world;

pub use error::{BakeError, BakeResult};
pub use mailbox::{ProgramSlot, RebakeSignal};
pub use scheduler::{BakeConfig, BakeScheduler, SchedulerState};
pub use task::{Animator, BakeCx, Poll, Seq, Tween, Wait};
pub use world::{EntitySeed, World};
