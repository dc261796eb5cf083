//! Flipbook Replay - Playback side of the flipbook engine
//!
//! Consumes the `Program` a bake produced and reconstructs exact world
//! state at any playback time, in either direction:
//! - `ReplayMachine` - applies/undoes commands around a moving playhead
//! - `WorldSnapshot` - the resolved read-only view the renderer consumes
//! - `Playback` - presentation-side controller (play/pause/seek, program
//!   swap-in from the bake mailbox)
//!
//! Evaluator-backed properties are recomputed lazily once per step, so
//! scrubbing backward never replays from t=0 and the log carries no
//! per-frame samples.

mod machine;
mod playback;
mod snapshot;

pub use machine::ReplayMachine;
pub use playback::{PlayState, Playback};
pub use snapshot::{EntityView, RenderTargetView, WorldSnapshot};
