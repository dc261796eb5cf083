//! The recording world: every observable mutation becomes one command
//!
//! User procedures never touch the command log directly. They call the
//! `World` façade, which tracks live entity/property state (so it can
//! capture old values and suppress no-op writes) and appends exactly zero or
//! one timestamped command per call. The world is passed explicitly into
//! every animator resumption; there is no ambient "current world".

use crate::{BakeError, BakeResult};
use flipbook_core::{
    AudioCue, AudioTimeline, Clock, Command, CommandOp, Entity, EntityId, EntityStore, Evaluator,
    FrameRate, Handle, Program, PropertyId, PropertyStore, Value, ValueMap,
};
use indexmap::IndexMap;
use tracing::warn;

/// Creation-time description of an entity
///
/// Entries in `fields` become property-store-backed cells when the entity is
/// created; entries in `state` stay plain attributes.
#[derive(Debug, Clone, Default)]
pub struct EntitySeed {
    /// Entity kind ("circle", "text", "camera", ...)
    pub kind: String,
    /// Non-animated attributes
    pub state: ValueMap,
    /// Animatable fields and their initial values
    pub fields: ValueMap,
    /// Parent entity
    pub parent: EntityId,
    /// Draw/sort order key
    pub sort_key: i64,
    /// Owned by a collection (not independently destroyable)
    pub managed: bool,
}

impl EntitySeed {
    /// Start a seed of the given kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Add an animatable field
    pub fn with_field(mut self, name: impl Into<String>, initial: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), initial.into());
        self
    }

    /// Add a non-animated attribute
    pub fn with_state(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.insert(name.into(), value.into());
        self
    }

    /// Set the parent entity
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = parent;
        self
    }

    /// Set the sort key
    pub fn with_sort_key(mut self, sort_key: i64) -> Self {
        self.sort_key = sort_key;
        self
    }

    /// Mark the entity as collection-owned
    pub fn managed(mut self) -> Self {
        self.managed = true;
        self
    }
}

/// The mutation-recording façade used by user procedures during a bake
#[derive(Debug)]
pub struct World {
    entities: EntityStore,
    props: PropertyStore,
    log: Vec<Command>,
    clock: Clock,
    editor: Option<String>,
    active_camera: EntityId,
    next_target: u64,
    handles: Vec<Handle>,
    audio: AudioTimeline,
}

impl World {
    /// Create an empty world at t=0
    pub fn new(fps: FrameRate) -> Self {
        Self {
            entities: EntityStore::new(),
            props: PropertyStore::new(),
            log: Vec::new(),
            clock: Clock::new(fps),
            editor: None,
            active_camera: EntityId::NONE,
            next_target: 0,
            handles: Vec::new(),
            audio: AudioTimeline::default(),
        }
    }

    /// Current virtual time in seconds
    pub fn now(&self) -> f64 {
        self.clock.seconds()
    }

    /// The virtual clock
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Advance the clock one tick and move the reserved TIME cell with it
    ///
    /// Normally driven by the scheduler, once per bake tick.
    pub fn advance_tick(&mut self) {
        self.clock.advance();
        self.props.set_time(self.clock.seconds());
    }

    /// Re-evaluate all possessed cells once (run by the scheduler per tick)
    pub fn evaluate_pass(&mut self) -> BakeResult<()> {
        self.props.evaluate_pass()?;
        Ok(())
    }

    // === Editor scope ===

    /// Open an editor scope; structural mutation requires one
    pub fn open_editor(&mut self, name: impl Into<String>) {
        self.editor = Some(name.into());
    }

    /// Close the editor scope
    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    fn require_editor(&self) -> BakeResult<()> {
        if self.editor.is_some() {
            Ok(())
        } else {
            warn!("structural mutation with no editor scope open; ignored");
            Err(BakeError::NoEditor)
        }
    }

    // === Entities ===

    /// Create an entity, minting fresh property cells for all of its fields
    pub fn create(&mut self, seed: EntitySeed) -> BakeResult<EntityId> {
        self.require_editor()?;
        if !seed.parent.is_none() {
            self.entities.require(seed.parent)?;
        }

        let id = self.entities.mint_id();
        let mut bindings: IndexMap<String, PropertyId> = IndexMap::new();
        for (name, initial) in &seed.fields {
            let pid = self.props.mint(initial.clone());
            self.record(CommandOp::CreateProperty {
                id: pid,
                initial: initial.clone(),
            });
            bindings.insert(name.clone(), pid);
        }

        let entity = Entity {
            id,
            kind: seed.kind,
            state: seed.state,
            parent: seed.parent,
            active: true,
            sort_key: seed.sort_key,
            managed: seed.managed,
            fields: bindings,
        };
        self.record(CommandOp::CreateEntity {
            entity: entity.clone(),
        });
        self.entities.insert(entity);
        Ok(id)
    }

    /// Clone a live entity: values copied, every identity fresh
    ///
    /// The clone gets a new entity id and new property ids for all fields
    /// (no two live entities ever share a cell). Clones are never managed;
    /// ownership does not follow the copy.
    pub fn clone_entity(&mut self, id: EntityId) -> BakeResult<EntityId> {
        let source = self.entities.require(id)?;
        let mut seed = EntitySeed {
            kind: source.kind.clone(),
            state: source.state.clone(),
            parent: source.parent,
            sort_key: source.sort_key,
            ..Default::default()
        };
        for (name, pid) in &source.fields {
            let value = self
                .props
                .value(*pid)
                .cloned()
                .ok_or(flipbook_core::Error::PropertyNotFound(*pid))?;
            seed.fields.insert(name.clone(), value);
        }
        self.create(seed)
    }

    /// Destroy an entity and, recursively, its children (children first)
    ///
    /// A no-op when the entity is already gone. Rejected while the entity is
    /// collection-owned; `detach` it first.
    pub fn destroy(&mut self, id: EntityId) -> BakeResult<()> {
        self.require_editor()?;
        let Some(entity) = self.entities.get(id) else {
            return Ok(());
        };
        if entity.managed {
            warn!(entity = %id, "destroy rejected: managed lifetime");
            return Err(BakeError::ManagedLifetime(id));
        }
        self.destroy_cascade(id);
        Ok(())
    }

    /// Cascade worker; the managed guard applies only to the direct target
    fn destroy_cascade(&mut self, id: EntityId) {
        for child in self.entities.children_of(id) {
            self.destroy_cascade(child);
        }
        if let Some(entity) = self.entities.remove(id) {
            for pid in entity.fields.values() {
                self.props.remove(*pid);
            }
            self.record(CommandOp::DestroyEntity { id });
        }
    }

    /// Release an entity from its owning collection
    ///
    /// Clears the managed flag and the parent link (both recorded), after
    /// which `destroy` is allowed.
    pub fn detach(&mut self, id: EntityId) -> BakeResult<()> {
        self.set_field(id, "managed", Value::Bool(false))?;
        self.set_field(id, "parent", Value::EntityRef(EntityId::NONE))
    }

    /// Write an entity field
    ///
    /// Property-backed fields route to the backing cell; anything else is an
    /// attribute write. Writing the current value appends nothing.
    pub fn set_field(&mut self, id: EntityId, field: &str, new: impl Into<Value>) -> BakeResult<()> {
        let new = new.into();
        let entity = self.entities.require(id)?;
        if let Some(pid) = entity.field(field) {
            return self.set_property(pid, new);
        }

        let old = entity.attr(field).unwrap_or(Value::Null);
        if old.same_as(&new) {
            return Ok(());
        }
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(flipbook_core::Error::EntityNotFound(id))?;
        entity.set_attr(field, new.clone())?;
        self.record(CommandOp::SetEntityField {
            id,
            field: field.to_string(),
            old,
            new,
        });
        Ok(())
    }

    /// Read an entity field (live value, evaluator results included)
    pub fn field(&self, id: EntityId, field: &str) -> BakeResult<Value> {
        let entity = self.entities.require(id)?;
        if let Some(pid) = entity.field(field) {
            return Ok(self
                .props
                .value(pid)
                .cloned()
                .ok_or(flipbook_core::Error::PropertyNotFound(pid))?);
        }
        Ok(entity.attr(field).unwrap_or(Value::Null))
    }

    /// Backing cell of an animatable field
    pub fn field_property(&self, id: EntityId, field: &str) -> BakeResult<PropertyId> {
        let entity = self.entities.require(id)?;
        entity
            .field(field)
            .ok_or_else(|| {
                flipbook_core::Error::EvaluationError(format!(
                    "{} has no animatable field `{}`",
                    id, field
                ))
                .into()
            })
    }

    // === Properties ===

    /// Create a generic dynamic property cell not tied to an entity field
    pub fn create_property(&mut self, initial: impl Into<Value>) -> PropertyId {
        let initial = initial.into();
        let id = self.props.mint(initial.clone());
        self.record(CommandOp::CreateProperty { id, initial });
        id
    }

    /// Write a property cell; writing the current value appends nothing
    pub fn set_property(&mut self, id: PropertyId, new: impl Into<Value>) -> BakeResult<()> {
        let new = new.into();
        let old = self
            .props
            .value(id)
            .cloned()
            .ok_or(flipbook_core::Error::PropertyNotFound(id))?;
        if old.same_as(&new) {
            return Ok(());
        }
        self.props.set_value(id, new.clone())?;
        self.record(CommandOp::SetProperty { id, old, new });
        Ok(())
    }

    /// Read a property cell
    pub fn property(&self, id: PropertyId) -> BakeResult<Value> {
        Ok(self
            .props
            .value(id)
            .cloned()
            .ok_or(flipbook_core::Error::PropertyNotFound(id))?)
    }

    /// Possess a property with an evaluator
    ///
    /// Records the concrete value the cell held immediately before
    /// possession; that value is what an undo of the install restores.
    pub fn begin_evaluator(&mut self, id: PropertyId, evaluator: Evaluator) -> BakeResult<()> {
        let cell = self
            .props
            .get(id)
            .ok_or(flipbook_core::Error::PropertyNotFound(id))?;
        if cell.evaluator.is_some() {
            warn!(property = %id, "evaluator install rejected: cell already possessed");
            return Err(BakeError::EvaluatorBusy(id));
        }
        let before = cell.value.clone();
        self.props.install(id, evaluator.clone())?;
        self.record(CommandOp::InstallEvaluator {
            id,
            evaluator,
            before,
        });
        Ok(())
    }

    /// Release a property from its evaluator, leaving an explicit final value
    pub fn end_evaluator(&mut self, id: PropertyId, final_value: impl Into<Value>) -> BakeResult<()> {
        let final_value = final_value.into();
        let removed = self
            .props
            .uninstall(id)?
            .ok_or(BakeError::NoEvaluator(id))?;
        self.props.set_value(id, final_value.clone())?;
        self.record(CommandOp::UninstallEvaluator {
            id,
            evaluator: removed,
            after: final_value,
        });
        Ok(())
    }

    // === Scene-level switches ===

    /// Switch the active camera; same camera twice appends nothing
    pub fn set_active_camera(&mut self, id: EntityId) -> BakeResult<()> {
        if !id.is_none() {
            self.entities.require(id)?;
        }
        if id == self.active_camera {
            return Ok(());
        }
        let old = std::mem::replace(&mut self.active_camera, id);
        self.record(CommandOp::SetActiveCamera { old, new: id });
        Ok(())
    }

    /// Register an offscreen render target
    pub fn create_render_target(&mut self, width: u32, height: u32) -> u64 {
        self.next_target += 1;
        let id = self.next_target;
        self.record(CommandOp::CreateRenderTarget { id, width, height });
        id
    }

    /// Drop a named marker at the current time
    pub fn marker(&mut self, name: impl Into<String>) {
        self.record(CommandOp::Marker { name: name.into() });
    }

    /// Register a named interaction point (bake metadata, not a command)
    pub fn add_handle(&mut self, name: impl Into<String>) {
        self.handles.push(Handle {
            name: name.into(),
            time: self.now(),
        });
    }

    /// Schedule a sound starting at the current time (bake metadata)
    pub fn push_audio(&mut self, name: impl Into<String>) {
        let start = self.now();
        self.audio.push(AudioCue {
            name: name.into(),
            start,
        });
    }

    // === Log access ===

    /// Number of recorded commands so far
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// The recorded commands so far
    pub fn log(&self) -> &[Command] {
        &self.log
    }

    /// Live entity registry (read-only)
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Live property store (read-only)
    pub fn props(&self) -> &PropertyStore {
        &self.props
    }

    /// Discard all recorded state; the failure path starts over from here
    pub fn reset(&mut self) {
        *self = World::new(self.clock.fps);
    }

    /// Collected interaction points
    pub(crate) fn take_handles(&mut self) -> Vec<Handle> {
        std::mem::take(&mut self.handles)
    }

    /// Collected audio cues
    pub(crate) fn take_audio(&mut self) -> AudioTimeline {
        std::mem::take(&mut self.audio)
    }

    /// Seal the log with the terminal `End` and hand out the program
    pub fn finish(mut self) -> Program {
        let duration = self.now();
        self.record(CommandOp::End { duration });
        Program {
            commands: self.log,
            duration,
            fps: self.clock.fps,
        }
    }

    fn record(&mut self, op: CommandOp) {
        let time = self.now();
        debug_assert!(
            self.log.last().map_or(true, |c| c.time <= time),
            "command log went backward in time"
        );
        self.log.push(Command::new(time, op));
    }
}
