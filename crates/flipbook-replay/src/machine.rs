//! The bidirectional replay machine
//!
//! Consumes a baked `Program` and answers "what is the world state at time
//! T" for any T without re-running user code. The machine maintains the
//! invariant that command `i` is applied iff `commands[i].time <=
//! playback_time`; stepping forward applies commands in log order, stepping
//! backward undoes them in reverse log order, and every command op has an
//! exact undo.
//!
//! A program that violates its own invariants (a write to a missing
//! property, an undo of a command that was never applied) is corrupted;
//! those paths panic deliberately instead of replaying garbage.

use crate::snapshot::{EntityView, RenderTargetView, WorldSnapshot};
use flipbook_core::{
    Command, CommandOp, Entity, EntityId, EntityStore, Program, PropertyCell, PropertyId,
    PropertyStore,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::warn;

/// An entity removed by an applied `DestroyEntity`, kept for exact undo
#[derive(Debug, Clone)]
struct Retired {
    entity: Entity,
    cells: Vec<(PropertyId, PropertyCell)>,
}

/// Replays a program to arbitrary playback times, forward or backward
#[derive(Debug)]
pub struct ReplayMachine {
    program: Program,
    /// Commands `[..cursor]` are applied
    cursor: usize,
    /// Current playback time in seconds
    time: f64,
    entities: EntityStore,
    props: PropertyStore,
    active_camera: EntityId,
    render_targets: IndexMap<u64, (u32, u32)>,
    /// Destroy stash, keyed by command index
    retired: HashMap<usize, Retired>,
}

impl ReplayMachine {
    /// Take ownership of a program, positioned at t=0
    ///
    /// Commands timestamped at exactly 0.0 are applied immediately.
    pub fn new(program: Program) -> Self {
        let mut machine = Self {
            program,
            cursor: 0,
            time: 0.0,
            entities: EntityStore::new(),
            props: PropertyStore::new(),
            active_camera: EntityId::NONE,
            render_targets: IndexMap::new(),
            retired: HashMap::new(),
        };
        machine.step(0.0);
        machine
    }

    /// The program being replayed
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Current playback time in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Total duration in seconds
    pub fn duration(&self) -> f64 {
        self.program.duration
    }

    /// Current progress in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.program.duration > 0.0 {
            self.time / self.program.duration
        } else {
            0.0
        }
    }

    /// Move playback by a signed delta in seconds
    ///
    /// Returns true when playback sits at either boundary afterwards, which
    /// callers use to stop auto-advance.
    pub fn step(&mut self, delta: f64) -> bool {
        let new_time = (self.time + delta).clamp(0.0, self.program.duration);

        if delta >= 0.0 {
            while self.cursor < self.program.commands.len()
                && self.program.commands[self.cursor].time <= new_time
            {
                let command = self.program.commands[self.cursor].clone();
                self.apply(&command);
                self.cursor += 1;
            }
        } else {
            while self.cursor > 0 && self.program.commands[self.cursor - 1].time > new_time {
                let command = self.program.commands[self.cursor - 1].clone();
                self.undo(self.cursor - 1, &command);
                self.cursor -= 1;
            }
        }

        self.time = new_time;
        self.props.set_time(new_time);
        if let Err(e) = self.props.evaluate_pass() {
            panic!("replay corrupted: evaluator pass failed: {}", e);
        }

        new_time <= 0.0 || new_time >= self.program.duration
    }

    /// Seek to a relative progress in `[0, 1]`
    pub fn seek(&mut self, progress: f64) -> bool {
        let target = progress.clamp(0.0, 1.0) * self.program.duration;
        self.step(target - self.time)
    }

    /// Seek to an absolute time in seconds
    pub fn seek_seconds(&mut self, t: f64) -> bool {
        self.step(t - self.time)
    }

    /// Resolve the current world state into a read-only view
    ///
    /// Pure: calling this any number of times changes nothing.
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut entities: Vec<EntityView> = self
            .entities
            .iter()
            .filter(|e| e.active)
            .map(|e| {
                let mut fields = IndexMap::new();
                for (name, pid) in &e.fields {
                    let value = self.props.value(*pid).cloned().unwrap_or_else(|| {
                        panic!("replay corrupted: {} bound to missing {}", e.id, pid)
                    });
                    fields.insert(name.clone(), value);
                }
                EntityView {
                    id: e.id,
                    kind: e.kind.clone(),
                    parent: e.parent,
                    sort_key: e.sort_key,
                    state: e.state.clone(),
                    fields,
                }
            })
            .collect();
        // Id order breaks sort-key ties, so the view is stable no matter
        // what order undo restored entities in
        entities.sort_by_key(|e| (e.sort_key, e.id.raw()));

        WorldSnapshot {
            time: self.time,
            entities,
            camera: if self.active_camera.is_none() {
                None
            } else {
                Some(self.active_camera)
            },
            render_targets: self
                .render_targets
                .iter()
                .map(|(id, (width, height))| RenderTargetView {
                    id: *id,
                    width: *width,
                    height: *height,
                })
                .collect(),
        }
    }

    fn apply(&mut self, command: &Command) {
        match &command.op {
            CommandOp::CreateEntity { entity } => {
                if self.entities.insert(entity.clone()).is_some() {
                    panic!("replay corrupted: {} created while live", entity.id);
                }
            }
            CommandOp::DestroyEntity { id } => {
                let Some(entity) = self.entities.remove(*id) else {
                    panic!("replay corrupted: {} destroyed while not live", id);
                };
                let cells = entity
                    .fields
                    .values()
                    .map(|pid| {
                        let cell = self.props.remove(*pid).unwrap_or_else(|| {
                            panic!("replay corrupted: {} bound to missing {}", id, pid)
                        });
                        (*pid, cell)
                    })
                    .collect();
                self.retired.insert(self.cursor, Retired { entity, cells });
            }
            CommandOp::SetEntityField { id, field, new, .. } => {
                self.write_attr(*id, field, new.clone());
            }
            CommandOp::CreateProperty { id, initial } => {
                if self.props.insert(*id, initial.clone()).is_some() {
                    panic!("replay corrupted: {} created while live", id);
                }
            }
            CommandOp::SetProperty { id, new, .. } => {
                if self.props.set_value(*id, new.clone()).is_err() {
                    panic!("replay corrupted: write to missing {}", id);
                }
            }
            CommandOp::InstallEvaluator {
                id,
                evaluator,
                before,
            } => {
                // Seed with the pre-install value; the first evaluation of
                // this step overwrites it
                if self.props.set_value(*id, before.clone()).is_err()
                    || self.props.install(*id, evaluator.clone()).is_err()
                {
                    panic!("replay corrupted: evaluator installed on missing {}", id);
                }
            }
            CommandOp::UninstallEvaluator { id, after, .. } => {
                match self.props.uninstall(*id) {
                    Ok(Some(_)) => {}
                    _ => panic!("replay corrupted: no evaluator to release on {}", id),
                }
                if self.props.set_value(*id, after.clone()).is_err() {
                    panic!("replay corrupted: write to missing {}", id);
                }
            }
            CommandOp::SetActiveCamera { new, .. } => {
                self.active_camera = *new;
            }
            CommandOp::CreateRenderTarget { id, width, height } => {
                self.render_targets.insert(*id, (*width, *height));
            }
            CommandOp::Marker { .. } | CommandOp::End { .. } => {}
            op => {
                warn!(op = op.name(), "skipping unknown command op");
            }
        }
    }

    fn undo(&mut self, index: usize, command: &Command) {
        match &command.op {
            CommandOp::CreateEntity { entity } => {
                if self.entities.remove(entity.id).is_none() {
                    panic!("replay corrupted: undo of {} while not live", entity.id);
                }
            }
            CommandOp::DestroyEntity { id } => {
                let Some(retired) = self.retired.remove(&index) else {
                    panic!("replay corrupted: undo of unapplied destroy of {}", id);
                };
                for (pid, cell) in retired.cells {
                    self.props.restore(pid, cell);
                }
                self.entities.insert(retired.entity);
            }
            CommandOp::SetEntityField { id, field, old, .. } => {
                self.write_attr(*id, field, old.clone());
            }
            CommandOp::CreateProperty { id, .. } => {
                if self.props.remove(*id).is_none() {
                    panic!("replay corrupted: undo of missing {}", id);
                }
            }
            CommandOp::SetProperty { id, old, .. } => {
                if self.props.set_value(*id, old.clone()).is_err() {
                    panic!("replay corrupted: write to missing {}", id);
                }
            }
            CommandOp::InstallEvaluator { id, before, .. } => {
                match self.props.uninstall(*id) {
                    Ok(Some(_)) => {}
                    _ => panic!("replay corrupted: undo install with no evaluator on {}", id),
                }
                if self.props.set_value(*id, before.clone()).is_err() {
                    panic!("replay corrupted: write to missing {}", id);
                }
            }
            CommandOp::UninstallEvaluator { id, evaluator, .. } => {
                // Re-attach; the stored value is stale until the next
                // evaluation pass overwrites it
                if self.props.install(*id, evaluator.clone()).is_err() {
                    panic!("replay corrupted: evaluator re-attach on missing {}", id);
                }
            }
            CommandOp::SetActiveCamera { old, .. } => {
                self.active_camera = *old;
            }
            CommandOp::CreateRenderTarget { id, .. } => {
                self.render_targets.shift_remove(id);
            }
            CommandOp::Marker { .. } | CommandOp::End { .. } => {}
            op => {
                warn!(op = op.name(), "skipping unknown command op");
            }
        }
    }

    fn write_attr(&mut self, id: EntityId, field: &str, value: flipbook_core::Value) {
        let Some(entity) = self.entities.get_mut(id) else {
            panic!("replay corrupted: field write to missing {}", id);
        };
        if let Err(e) = entity.set_attr(field, value) {
            panic!("replay corrupted: field write to {}: {}", id, e);
        }
    }
}
