//! Entity instances and the live entity registry

use crate::{EntityId, Error, PropertyId, Result, Value, ValueMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A live entity instance
///
/// The animatable fields are not stored here: each one is backed by a
/// property cell, and `fields` maps field names to cell ids. The `state` bag
/// holds non-animated metadata captured at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity
    pub id: EntityId,
    /// The kind of entity ("circle", "text", "camera", ...)
    pub kind: String,
    /// Non-animated attributes captured at creation
    pub state: ValueMap,
    /// Parent entity (`EntityId::NONE` for roots)
    pub parent: EntityId,
    /// Whether the entity participates in snapshots
    pub active: bool,
    /// Draw/sort order key
    pub sort_key: i64,
    /// True when owned by a collection; such entities cannot be destroyed
    /// directly, only after being detached from their owner
    pub managed: bool,
    /// Animatable field name -> backing property cell
    pub fields: IndexMap<String, PropertyId>,
}

impl Entity {
    /// Create a root entity with empty state
    pub fn new(id: EntityId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            state: ValueMap::new(),
            parent: EntityId::NONE,
            active: true,
            sort_key: 0,
            managed: false,
            fields: IndexMap::new(),
        }
    }

    /// Read an attribute: builtin (`parent`, `active`, `sort_key`, `managed`)
    /// or a state bag entry
    pub fn attr(&self, field: &str) -> Option<Value> {
        match field {
            "parent" => Some(Value::EntityRef(self.parent)),
            "active" => Some(Value::Bool(self.active)),
            "sort_key" => Some(Value::Int(self.sort_key)),
            "managed" => Some(Value::Bool(self.managed)),
            _ => self.state.get(field).cloned(),
        }
    }

    /// Write an attribute, returning the previous value
    pub fn set_attr(&mut self, field: &str, value: Value) -> Result<Value> {
        let type_err = |expected: &str, got: &Value| Error::TypeError {
            expected: expected.to_string(),
            got: got.type_name().to_string(),
        };
        match field {
            "parent" => {
                let new = value.as_entity_ref().ok_or_else(|| type_err("entity_ref", &value))?;
                Ok(Value::EntityRef(std::mem::replace(&mut self.parent, new)))
            }
            "active" => {
                let new = value.as_bool().ok_or_else(|| type_err("bool", &value))?;
                Ok(Value::Bool(std::mem::replace(&mut self.active, new)))
            }
            "sort_key" => {
                let new = value.as_int().ok_or_else(|| type_err("int", &value))?;
                Ok(Value::Int(std::mem::replace(&mut self.sort_key, new)))
            }
            "managed" => {
                let new = value.as_bool().ok_or_else(|| type_err("bool", &value))?;
                Ok(Value::Bool(std::mem::replace(&mut self.managed, new)))
            }
            _ => Ok(self
                .state
                .insert(field.to_string(), value)
                .unwrap_or(Value::Null)),
        }
    }

    /// Backing property id of an animatable field
    pub fn field(&self, name: &str) -> Option<PropertyId> {
        self.fields.get(name).copied()
    }
}

/// The live entity registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStore {
    /// All entities by id, in creation order
    entities: IndexMap<EntityId, Entity>,
    /// Next id to mint (0 is the NONE sentinel)
    next_id: u64,
}

impl EntityStore {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entities: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Mint a fresh entity id (recording side)
    pub fn mint_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register an entity
    ///
    /// Returns the previously registered entity for the same id, which a
    /// well-formed program never produces.
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id, entity)
    }

    /// Remove an entity, returning it for later restoration
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.shift_remove(&id)
    }

    /// Get an entity by id
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Get an entity or an `EntityNotFound` error
    pub fn require(&self, id: EntityId) -> Result<&Entity> {
        self.get(id).ok_or(Error::EntityNotFound(id))
    }

    /// Check whether an entity is registered
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Direct children of an entity, in creation order
    pub fn children_of(&self, id: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.parent == id)
            .map(|e| e.id)
            .collect()
    }

    /// All entity ids in creation order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// All entities in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_attrs() {
        let mut entity = Entity::new(EntityId::new(1), "circle");
        entity.state.insert("label".into(), "dot".into());

        assert_eq!(entity.attr("active"), Some(Value::Bool(true)));
        assert_eq!(entity.attr("label").and_then(|v| v.as_str().map(String::from)), Some("dot".into()));

        let old = entity.set_attr("active", Value::Bool(false)).unwrap();
        assert_eq!(old, Value::Bool(true));
        assert!(!entity.active);

        // Builtin attrs are typed
        assert!(entity.set_attr("sort_key", Value::Bool(true)).is_err());
    }

    #[test]
    fn test_store_mint_and_children() {
        let mut store = EntityStore::new();
        let root_id = store.mint_id();
        store.insert(Entity::new(root_id, "group"));

        let a = store.mint_id();
        let mut child = Entity::new(a, "circle");
        child.parent = root_id;
        store.insert(child);

        let b = store.mint_id();
        let mut child = Entity::new(b, "circle");
        child.parent = root_id;
        store.insert(child);

        assert_eq!(store.len(), 3);
        assert_eq!(store.children_of(root_id), vec![a, b]);
        assert!(store.children_of(a).is_empty());
    }

    #[test]
    fn test_ids_never_reused() {
        let mut store = EntityStore::new();
        let a = store.mint_id();
        store.insert(Entity::new(a, "circle"));
        store.remove(a);
        let b = store.mint_id();
        assert_ne!(a, b);
    }
}
