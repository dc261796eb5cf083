//! Read-only resolved views of the replayed world
//!
//! A snapshot is what the renderer consumes once per presentation tick:
//! every live entity with its evaluator-resolved field values, the active
//! camera, and the registered render targets. Snapshots are plain data;
//! producing one has no side effects on the machine.

use flipbook_core::{EntityId, Value, ValueMap};
use indexmap::IndexMap;
use serde::Serialize;

/// One live entity, fields resolved to concrete values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    /// Entity identity
    pub id: EntityId,
    /// Entity kind ("circle", "text", "camera", ...)
    pub kind: String,
    /// Parent entity (`EntityId::NONE` for roots)
    pub parent: EntityId,
    /// Draw/sort order key
    pub sort_key: i64,
    /// Non-animated attributes
    pub state: ValueMap,
    /// Animatable fields with evaluators applied
    pub fields: IndexMap<String, Value>,
}

/// A registered offscreen render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderTargetView {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

/// The resolved world at one playback time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    /// Playback time the view was resolved at
    pub time: f64,
    /// Active entities in draw order (sort key, then creation order)
    pub entities: Vec<EntityView>,
    /// Active camera, if one is set
    pub camera: Option<EntityId>,
    /// Registered render targets
    pub render_targets: Vec<RenderTargetView>,
}

impl WorldSnapshot {
    /// Look up an entity view by id
    pub fn entity(&self, id: EntityId) -> Option<&EntityView> {
        self.entities.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_lookup() {
        let view = EntityView {
            id: EntityId::new(1),
            kind: "circle".into(),
            parent: EntityId::NONE,
            sort_key: 0,
            state: ValueMap::new(),
            fields: IndexMap::new(),
        };
        let snapshot = WorldSnapshot {
            time: 0.0,
            entities: vec![view],
            camera: None,
            render_targets: Vec::new(),
        };

        assert!(snapshot.entity(EntityId::new(1)).is_some());
        assert!(snapshot.entity(EntityId::new(2)).is_none());
    }
}
