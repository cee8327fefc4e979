//! Ordered collections of live exercise objects.

use crate::exercise::{apply_update, Exercise, UpdateError};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A shared, mutable exercise slot.
///
/// Reloads write through the same `Arc`, so anyone holding a slot sees
/// updated parameters on the next read.
pub type ExerciseSlot = Arc<RwLock<Exercise>>;

/// The running playlist.
pub struct Playlist {
    slots: Vec<ExerciseSlot>,

    /// Slot names in order; names never change through an update
    names: Vec<String>,
}

impl Playlist {
    /// Wraps freshly loaded exercises into new slots.
    pub fn new(exercises: Vec<Exercise>) -> Self {
        let names = exercises.iter().map(|e| e.name.clone()).collect();
        let slots = exercises
            .into_iter()
            .map(|e| Arc::new(RwLock::new(e)))
            .collect();
        Self { slots, names }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot at the given position.
    pub fn slot(&self, index: usize) -> Option<&ExerciseSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[ExerciseSlot] {
        &self.slots
    }

    /// Exercise names in playlist order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Value copy of the exercise at `index`, taken under a read lock.
    pub async fn exercise(&self, index: usize) -> Option<Exercise> {
        match self.slots.get(index) {
            Some(slot) => Some(slot.read().await.clone()),
            None => None,
        }
    }

    /// True when `fresh` has the same length and the same name at every
    /// position, i.e. it can be applied in place.
    pub fn same_shape(&self, fresh: &[Exercise]) -> bool {
        self.names.len() == fresh.len()
            && self.names.iter().zip(fresh).all(|(name, e)| *name == e.name)
    }

    /// Applies `fresh` slot by slot, keeping every slot's identity.
    ///
    /// Returns `(name, changed fields)` for each slot that changed.
    /// Callers should check [`Playlist::same_shape`] first; a mismatch
    /// stops at the first offending slot.
    pub async fn apply_updates(
        &self,
        fresh: Vec<Exercise>,
    ) -> Result<Vec<(String, Vec<&'static str>)>, UpdateError> {
        let mut report = Vec::new();
        for (slot, fresh) in self.slots.iter().zip(fresh) {
            let mut current = slot.write().await;
            let changed = apply_update(&mut current, fresh)?;
            if !changed.is_empty() {
                report.push((current.name.clone(), changed));
            }
        }
        Ok(report)
    }
}
