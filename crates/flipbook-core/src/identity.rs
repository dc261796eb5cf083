//! Identity types for entities and property cells

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an entity instance within one bake
///
/// Defaults to the `NONE` sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The "no entity" sentinel, used for absent parents and cameras
    pub const NONE: EntityId = EntityId(0);

    /// Create a new entity ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Check if this is the none sentinel
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "entity:none")
        } else {
            write!(f, "entity:{}", self.0)
        }
    }
}

/// Unique identifier for a property cell
///
/// Ids are minted once per cell for the life of one world and never reused,
/// even when a logically identical field is recreated. A cloned entity gets
/// fresh ids for all of its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub u64);

impl PropertyId {
    /// The reserved playback-time cell, present in every property store
    pub const TIME: PropertyId = PropertyId(0);

    /// Create a new property ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Check if this is the reserved time cell
    pub fn is_time(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_time() {
            write!(f, "prop:time")
        } else {
            write!(f, "prop:{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id() {
        let id = EntityId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "entity:42");
        assert!(EntityId::NONE.is_none());
        assert!(!id.is_none());
    }

    #[test]
    fn test_property_id() {
        let id = PropertyId::new(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(format!("{}", id), "prop:7");
        assert!(PropertyId::TIME.is_time());
        assert_eq!(format!("{}", PropertyId::TIME), "prop:time");
    }
}
