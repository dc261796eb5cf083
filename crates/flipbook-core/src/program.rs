//! The finished, immutable command program and its bake metadata

use crate::{Command, CommandOp, EntityId, Error, FrameRate, PropertyId, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A finished, time-ordered command sequence bounded by a terminal `End`
///
/// Immutable once produced by the bake scheduler. Replaying it forward from
/// t=0 reproduces exactly the state the scheduler observed while recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// The ordered command log
    pub commands: Vec<Command>,
    /// Total duration in seconds (copied from the terminal `End`)
    pub duration: f64,
    /// Frame rate the program was baked at
    pub fps: FrameRate,
}

impl Program {
    /// Assemble a program from a recorded log
    ///
    /// The log must already carry its terminal `End`; `duration` is read
    /// from it.
    pub fn new(commands: Vec<Command>, fps: FrameRate) -> Result<Self> {
        let duration = match commands.last().map(|c| &c.op) {
            Some(CommandOp::End { duration }) => *duration,
            _ => {
                return Err(Error::InvalidProgram(
                    "missing terminal End command".to_string(),
                ))
            }
        };
        Ok(Self {
            commands,
            duration,
            fps,
        })
    }

    /// An empty program of zero duration
    pub fn empty(fps: FrameRate) -> Self {
        Self {
            commands: vec![Command::new(0.0, CommandOp::End { duration: 0.0 })],
            duration: 0.0,
            fps,
        }
    }

    /// Number of commands, terminal `End` included
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the program holds nothing but its terminal `End`
    pub fn is_empty(&self) -> bool {
        self.commands.len() <= 1
    }

    /// Named timeline markers with their times, in log order
    pub fn markers(&self) -> impl Iterator<Item = (f64, &str)> {
        self.commands.iter().filter_map(|c| match &c.op {
            CommandOp::Marker { name } => Some((c.time, name.as_str())),
            _ => None,
        })
    }

    /// Check the structural invariants of the log
    ///
    /// - commands sorted by non-decreasing time, within `[0, duration]`
    /// - exactly one `End`, in terminal position
    /// - no destroy before the matching create
    /// - no property reference before the matching `CreateProperty`
    /// - no evaluator uninstall without a live install
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidProgram(msg));

        if self.commands.is_empty() {
            return invalid("program has no commands".to_string());
        }

        let mut created_entities: HashSet<EntityId> = HashSet::new();
        let mut live_entities: HashSet<EntityId> = HashSet::new();
        let mut created_props: HashSet<PropertyId> = HashSet::new();
        let mut possessed: HashSet<PropertyId> = HashSet::new();
        let mut last_time = 0.0f64;

        let require_prop = |props: &HashSet<PropertyId>, id: PropertyId, at: f64| {
            if props.contains(&id) {
                Ok(())
            } else {
                Err(Error::InvalidProgram(format!(
                    "{} referenced at t={} before CreateProperty",
                    id, at
                )))
            }
        };

        for (i, cmd) in self.commands.iter().enumerate() {
            if cmd.time < last_time {
                return invalid(format!(
                    "command {} at t={} precedes t={}",
                    i, cmd.time, last_time
                ));
            }
            last_time = cmd.time;

            if cmd.time > self.duration {
                return invalid(format!(
                    "command {} at t={} is past duration {}",
                    i, cmd.time, self.duration
                ));
            }

            let terminal = i + 1 == self.commands.len();
            if cmd.op.is_end() != terminal {
                return invalid(format!("End command at position {} of {}", i, self.len()));
            }

            match &cmd.op {
                CommandOp::CreateEntity { entity } => {
                    if !created_entities.insert(entity.id) {
                        return invalid(format!("{} created twice", entity.id));
                    }
                    live_entities.insert(entity.id);
                }
                CommandOp::DestroyEntity { id } => {
                    if !live_entities.remove(id) {
                        return invalid(format!("{} destroyed while not live", id));
                    }
                }
                CommandOp::CreateProperty { id, .. } => {
                    if !created_props.insert(*id) {
                        return invalid(format!("{} created twice", id));
                    }
                }
                CommandOp::SetProperty { id, .. } => {
                    require_prop(&created_props, *id, cmd.time)?;
                }
                CommandOp::InstallEvaluator { id, .. } => {
                    require_prop(&created_props, *id, cmd.time)?;
                    possessed.insert(*id);
                }
                CommandOp::UninstallEvaluator { id, .. } => {
                    if !possessed.remove(id) {
                        return invalid(format!(
                            "evaluator uninstalled from {} with none installed",
                            id
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Summarize the log for diagnostics
    pub fn stats(&self) -> ProgramStats {
        let mut stats = ProgramStats {
            total_commands: self.commands.len(),
            ..Default::default()
        };
        for cmd in &self.commands {
            match &cmd.op {
                CommandOp::CreateEntity { .. } => stats.entities_created += 1,
                CommandOp::DestroyEntity { .. } => stats.entities_destroyed += 1,
                CommandOp::SetProperty { .. } | CommandOp::SetEntityField { .. } => {
                    stats.writes += 1
                }
                CommandOp::InstallEvaluator { .. } => stats.evaluators_installed += 1,
                CommandOp::Marker { .. } => stats.markers += 1,
                _ => {}
            }
        }
        stats
    }
}

/// Statistics about a program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramStats {
    /// Total number of commands
    pub total_commands: usize,
    /// Number of entity creations
    pub entities_created: usize,
    /// Number of entity destructions
    pub entities_destroyed: usize,
    /// Number of field/property writes
    pub writes: usize,
    /// Number of evaluator installs
    pub evaluators_installed: usize,
    /// Number of markers
    pub markers: usize,
}

/// A named interaction point collected while baking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    /// User-chosen name
    pub name: String,
    /// Virtual time at which the handle was registered
    pub time: f64,
}

/// One scheduled sound on the audio timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCue {
    /// Resource name of the sound
    pub name: String,
    /// Virtual start time in seconds
    pub start: f64,
}

/// All sounds scheduled during a bake, in emission order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTimeline {
    /// Scheduled cues
    pub cues: Vec<AudioCue>,
}

impl AudioTimeline {
    /// Append a cue
    pub fn push(&mut self, cue: AudioCue) {
        self.cues.push(cue);
    }
}

/// Report of a recovered bake failure
///
/// The bake that produced it still carries a renderable program (the fixed
/// error animation), never an unhandled failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BakeFailure {
    /// Human-readable failure message
    pub message: String,
    /// Failure context (error chain or panic payload), possibly empty
    pub trace: String,
}

/// The complete bake result handed from the baking context to playback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baked {
    /// The replayable program
    pub program: Program,
    /// Named interaction points collected during the bake
    pub handles: Vec<Handle>,
    /// Audio cues collected during the bake
    pub audio: AudioTimeline,
    /// Present when the user procedure failed and the error animation was
    /// substituted
    pub failure: Option<BakeFailure>,
}

impl Baked {
    /// Check if this bake recovered from a user failure
    pub fn has_error(&self) -> bool {
        self.failure.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, Value};

    fn end(t: f64) -> Command {
        Command::new(t, CommandOp::End { duration: t })
    }

    #[test]
    fn test_program_requires_end() {
        assert!(Program::new(vec![], FrameRate::default()).is_err());

        let program = Program::new(vec![end(2.0)], FrameRate::default()).unwrap();
        assert_eq!(program.duration, 2.0);
        assert!(program.is_empty());
    }

    #[test]
    fn test_validate_ordering() {
        let mut commands = vec![
            Command::new(1.0, CommandOp::Marker { name: "late".into() }),
            Command::new(0.5, CommandOp::Marker { name: "early".into() }),
        ];
        commands.push(end(2.0));
        let program = Program::new(commands, FrameRate::default()).unwrap();
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_validate_destroy_before_create() {
        let commands = vec![
            Command::new(0.0, CommandOp::DestroyEntity { id: EntityId::new(1) }),
            end(1.0),
        ];
        let program = Program::new(commands, FrameRate::default()).unwrap();
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_validate_dangling_property() {
        let commands = vec![
            Command::new(
                0.0,
                CommandOp::SetProperty {
                    id: PropertyId::new(5),
                    old: Value::Null,
                    new: Value::Float(1.0),
                },
            ),
            end(1.0),
        ];
        let program = Program::new(commands, FrameRate::default()).unwrap();
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_validate_well_formed() {
        let entity = Entity::new(EntityId::new(1), "circle");
        let commands = vec![
            Command::new(0.0, CommandOp::CreateProperty {
                id: PropertyId::new(1),
                initial: Value::Float(0.0),
            }),
            Command::new(0.0, CommandOp::CreateEntity { entity }),
            Command::new(0.5, CommandOp::SetProperty {
                id: PropertyId::new(1),
                old: Value::Float(0.0),
                new: Value::Float(3.0),
            }),
            Command::new(1.0, CommandOp::DestroyEntity { id: EntityId::new(1) }),
            end(1.0),
        ];
        let program = Program::new(commands, FrameRate::default()).unwrap();
        program.validate().unwrap();

        let stats = program.stats();
        assert_eq!(stats.entities_created, 1);
        assert_eq!(stats.entities_destroyed, 1);
        assert_eq!(stats.writes, 1);
    }

    #[test]
    fn test_markers() {
        let commands = vec![
            Command::new(0.25, CommandOp::Marker { name: "a".into() }),
            Command::new(0.75, CommandOp::Marker { name: "b".into() }),
            end(1.0),
        ];
        let program = Program::new(commands, FrameRate::default()).unwrap();
        let markers: Vec<_> = program.markers().collect();
        assert_eq!(markers, vec![(0.25, "a"), (0.75, "b")]);
    }
}
