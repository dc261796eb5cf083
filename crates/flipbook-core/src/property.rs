//! Property cells: the independently-addressable value storage
//!
//! Both sides of the system keep one `PropertyStore`: the recording `World`
//! so it can capture old values and suppress no-op writes, and the replay
//! machine as its live state. Ids are minted monotonically and never reused;
//! the replay side inserts cells at the ids the recording side minted.

use crate::{Error, Evaluator, PropertyId, Result, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One value cell, possibly possessed by an evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyCell {
    /// Current stored value (the last evaluation result while possessed)
    pub value: Value,
    /// Installed evaluator, if the cell is currently dynamic
    pub evaluator: Option<Evaluator>,
}

impl PropertyCell {
    /// Create a plain cell holding a concrete value
    pub fn new(value: Value) -> Self {
        Self {
            value,
            evaluator: None,
        }
    }
}

/// Storage for all property cells of one world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyStore {
    /// All cells by id, in creation order
    cells: IndexMap<PropertyId, PropertyCell>,
    /// Next id to mint (ids are never reused)
    next_id: u64,
}

impl PropertyStore {
    /// Create a store containing only the reserved TIME cell at t=0
    pub fn new() -> Self {
        let mut cells = IndexMap::new();
        cells.insert(PropertyId::TIME, PropertyCell::new(Value::Float(0.0)));
        Self { cells, next_id: 1 }
    }

    /// Mint a fresh cell (recording side)
    pub fn mint(&mut self, initial: Value) -> PropertyId {
        let id = PropertyId::new(self.next_id);
        self.next_id += 1;
        self.cells.insert(id, PropertyCell::new(initial));
        id
    }

    /// Insert a cell at a recorded id (replay side)
    ///
    /// Returns the previous cell if the id was already present, which a
    /// well-formed program never produces.
    pub fn insert(&mut self, id: PropertyId, initial: Value) -> Option<PropertyCell> {
        self.cells.insert(id, PropertyCell::new(initial))
    }

    /// Remove a cell, returning it for later restoration
    pub fn remove(&mut self, id: PropertyId) -> Option<PropertyCell> {
        self.cells.shift_remove(&id)
    }

    /// Restore a previously removed cell with its full state
    pub fn restore(&mut self, id: PropertyId, cell: PropertyCell) {
        self.cells.insert(id, cell);
    }

    /// Get a cell
    pub fn get(&self, id: PropertyId) -> Option<&PropertyCell> {
        self.cells.get(&id)
    }

    /// Check whether a cell exists
    pub fn contains(&self, id: PropertyId) -> bool {
        self.cells.contains_key(&id)
    }

    /// Get a cell's current value
    pub fn value(&self, id: PropertyId) -> Option<&Value> {
        self.cells.get(&id).map(|c| &c.value)
    }

    /// Overwrite a cell's value, returning the previous one
    pub fn set_value(&mut self, id: PropertyId, value: Value) -> Result<Value> {
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(Error::PropertyNotFound(id))?;
        Ok(std::mem::replace(&mut cell.value, value))
    }

    /// Attach an evaluator to a cell
    pub fn install(&mut self, id: PropertyId, evaluator: Evaluator) -> Result<()> {
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(Error::PropertyNotFound(id))?;
        cell.evaluator = Some(evaluator);
        Ok(())
    }

    /// Detach a cell's evaluator, returning it
    pub fn uninstall(&mut self, id: PropertyId) -> Result<Option<Evaluator>> {
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(Error::PropertyNotFound(id))?;
        Ok(cell.evaluator.take())
    }

    /// Current playback time (the reserved TIME cell)
    pub fn time(&self) -> f64 {
        self.cells
            .get(&PropertyId::TIME)
            .and_then(|c| c.value.as_float())
            .unwrap_or(0.0)
    }

    /// Move the reserved TIME cell
    pub fn set_time(&mut self, seconds: f64) {
        if let Some(cell) = self.cells.get_mut(&PropertyId::TIME) {
            cell.value = Value::Float(seconds);
        }
    }

    /// Re-evaluate every possessed cell once, in property id order
    ///
    /// Ids are minted in creation order, so this is creation order and stays
    /// stable even after cells are removed and restored. A later evaluator
    /// sees an earlier one's freshly written value; a backward reference
    /// sees the previous pass's value. Cycles therefore read
    /// stale-but-deterministic values instead of erroring.
    pub fn evaluate_pass(&mut self) -> Result<()> {
        let mut dynamic: Vec<(PropertyId, Evaluator)> = self
            .cells
            .iter()
            .filter_map(|(id, cell)| cell.evaluator.clone().map(|ev| (*id, ev)))
            .collect();
        dynamic.sort_by_key(|(id, _)| id.raw());

        for (id, evaluator) in dynamic {
            let value = evaluator.evaluate(self)?;
            self.set_value(id, value)?;
        }
        Ok(())
    }

    /// Number of cells, including the reserved TIME cell
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the store holds only the TIME cell
    pub fn is_empty(&self) -> bool {
        self.cells.len() <= 1
    }

    /// Iterate all cells in creation order
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyCell)> {
        self.cells.iter().map(|(id, cell)| (*id, cell))
    }
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new()
    }
}
