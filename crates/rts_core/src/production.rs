//! Unit production queues for trainer buildings.
//!
//! The first item in a queue advances one tick per simulation tick. A
//! finished item stays at the front until the simulation finds room to spawn
//! it next to the building.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::UnitType;

/// An item in a production queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionItem {
    /// The unit being produced.
    pub unit_type: Arc<UnitType>,
    /// Ticks spent so far.
    pub progress: u32,
}

impl ProductionItem {
    /// Create a new production item.
    #[must_use]
    pub const fn new(unit_type: Arc<UnitType>) -> Self {
        Self {
            unit_type,
            progress: 0,
        }
    }

    /// Check if production is complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= self.unit_type.train_ticks
    }

    /// Advance production by one tick.
    pub fn tick(&mut self) {
        if !self.is_complete() {
            self.progress += 1;
        }
    }
}

/// Production queue for a trainer building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionQueue {
    queue: VecDeque<ProductionItem>,
    max_queue_size: usize,
}

impl Default for ProductionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductionQueue {
    /// Default maximum queue size.
    pub const DEFAULT_MAX_QUEUE_SIZE: usize = 5;

    /// Create a new empty production queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            max_queue_size: Self::DEFAULT_MAX_QUEUE_SIZE,
        }
    }

    /// Check if the queue is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.max_queue_size
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get the number of items in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Append an item. Returns `false` if the queue is full.
    pub fn push(&mut self, unit_type: Arc<UnitType>) -> bool {
        if self.is_full() {
            return false;
        }
        self.queue.push_back(ProductionItem::new(unit_type));
        true
    }

    /// Get the currently producing item.
    #[must_use]
    pub fn current(&self) -> Option<&ProductionItem> {
        self.queue.front()
    }

    /// Advance the front item. Returns its type if it is ready to spawn.
    pub fn tick(&mut self) -> Option<Arc<UnitType>> {
        let item = self.queue.front_mut()?;
        item.tick();
        item.is_complete().then(|| Arc::clone(&item.unit_type))
    }

    /// Remove the front item once it has been spawned.
    pub fn pop_complete(&mut self) -> Option<ProductionItem> {
        if self.queue.front().is_some_and(ProductionItem::is_complete) {
            self.queue.pop_front()
        } else {
            None
        }
    }
}
