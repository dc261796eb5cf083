//! Timestamped command records
//!
//! Every observable mutation during a bake becomes exactly one command.
//! Commands are immutable facts ordered by non-decreasing timestamp;
//! commands sharing a timestamp keep their emission order, and that order is
//! load-bearing (a field's `CreateProperty` records precede the owning
//! `CreateEntity` record).

use crate::{Entity, EntityId, Evaluator, PropertyId, Value};
use serde::{Deserialize, Serialize};

/// A recorded command: a virtual timestamp plus the operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Virtual time in seconds at which the command was recorded
    pub time: f64,
    /// The operation
    pub op: CommandOp,
}

impl Command {
    /// Create a command at a timestamp
    pub fn new(time: f64, op: CommandOp) -> Self {
        Self { time, op }
    }
}

/// The operation carried by a command
///
/// Marked non-exhaustive: replayers must treat operations they do not know
/// as warnings, not errors, so older players can scrub newer programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CommandOp {
    /// An entity came into existence; carries the full creation snapshot
    CreateEntity {
        /// The entity exactly as registered, field bindings included
        entity: Entity,
    },
    /// An entity was removed (children are destroyed by their own commands)
    DestroyEntity {
        /// The removed entity
        id: EntityId,
    },
    /// A non-animated entity attribute changed
    SetEntityField {
        id: EntityId,
        field: String,
        /// Value before the write (required for undo)
        old: Value,
        /// Value after the write
        new: Value,
    },
    /// A property cell came into existence
    CreateProperty {
        id: PropertyId,
        initial: Value,
    },
    /// A property cell's concrete value changed
    SetProperty {
        id: PropertyId,
        /// Value before the write (required for undo)
        old: Value,
        /// Value after the write
        new: Value,
    },
    /// An evaluator possessed a property cell
    InstallEvaluator {
        id: PropertyId,
        evaluator: Evaluator,
        /// The concrete value the cell held immediately before possession
        before: Value,
    },
    /// An evaluator released a property cell
    UninstallEvaluator {
        id: PropertyId,
        evaluator: Evaluator,
        /// The value that remains after release (the last one produced)
        after: Value,
    },
    /// The active camera switched
    SetActiveCamera {
        old: EntityId,
        new: EntityId,
    },
    /// An offscreen render target came into existence
    CreateRenderTarget {
        id: u64,
        width: u32,
        height: u32,
    },
    /// A named point on the timeline; no state effect
    Marker {
        name: String,
    },
    /// Terminal record carrying the total duration in seconds
    End {
        duration: f64,
    },
}

impl CommandOp {
    /// Short operation name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            CommandOp::CreateEntity { .. } => "create_entity",
            CommandOp::DestroyEntity { .. } => "destroy_entity",
            CommandOp::SetEntityField { .. } => "set_entity_field",
            CommandOp::CreateProperty { .. } => "create_property",
            CommandOp::SetProperty { .. } => "set_property",
            CommandOp::InstallEvaluator { .. } => "install_evaluator",
            CommandOp::UninstallEvaluator { .. } => "uninstall_evaluator",
            CommandOp::SetActiveCamera { .. } => "set_active_camera",
            CommandOp::CreateRenderTarget { .. } => "create_render_target",
            CommandOp::Marker { .. } => "marker",
            CommandOp::End { .. } => "end",
        }
    }

    /// Check if this is the terminal record
    pub fn is_end(&self) -> bool {
        matches!(self, CommandOp::End { .. })
    }
}
