//! Optimistic reordering of modules and contents.
//!
//! An [`OrderedCollection`] is the single authoritative in-memory list for
//! a session. [`OrderedCollection::begin_reorder`] captures a snapshot,
//! applies the new order immediately and hands back a [`MutationToken`].
//! The caller then persists the change and either confirms the token or
//! rolls the collection back to the snapshot. Only one mutation may be in
//! flight per collection.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::progress::{ContentItem, ModuleItem};
use crate::types::DbId;

/// An item with a stable id and a 1-based position.
pub trait Positioned: Clone {
    fn id(&self) -> DbId;
    fn position(&self) -> i32;
    fn set_position(&mut self, position: i32);
}

impl Positioned for ModuleItem {
    fn id(&self) -> DbId {
        self.id
    }
    fn position(&self) -> i32 {
        self.position
    }
    fn set_position(&mut self, position: i32) {
        self.position = position;
    }
}

impl Positioned for ContentItem {
    fn id(&self) -> DbId {
        self.id
    }
    fn position(&self) -> i32 {
        self.position
    }
    fn set_position(&mut self, position: i32) {
        self.position = position;
    }
}

/// Identifies the in-flight mutation of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationToken(u64);

#[derive(Debug)]
struct PendingMutation<T> {
    token: MutationToken,
    snapshot: Vec<T>,
}

/// Check that `requested` is a permutation of `current`.
pub fn validate_reorder(current: &[DbId], requested: &[DbId]) -> Result<(), CoreError> {
    let unique: HashSet<DbId> = requested.iter().copied().collect();
    if unique.len() != requested.len() {
        return Err(CoreError::Validation(
            "Reorder request contains duplicate ids".to_string(),
        ));
    }
    if requested.len() != current.len() || !current.iter().all(|id| unique.contains(id)) {
        return Err(CoreError::Validation(format!(
            "Reorder request must list exactly the {} existing ids",
            current.len()
        )));
    }
    Ok(())
}

/// `items` arranged in `order`, positions renumbered from 1.
///
/// Ids in `order` that are not in `items` are skipped.
pub fn apply_order<T: Positioned>(items: &[T], order: &[DbId]) -> Vec<T> {
    order
        .iter()
        .filter_map(|id| items.iter().find(|item| item.id() == *id))
        .zip(1..)
        .map(|(item, position)| {
            let mut item = item.clone();
            item.set_position(position);
            item
        })
        .collect()
}

/// An ordered list with at most one optimistic mutation in flight.
#[derive(Debug)]
pub struct OrderedCollection<T> {
    items: Vec<T>,
    pending: Option<PendingMutation<T>>,
    next_token: u64,
}

impl<T: Positioned> OrderedCollection<T> {
    /// Build a collection, sorting `items` by position.
    pub fn new(mut items: Vec<T>) -> Self {
        items.sort_by_key(|item| (item.position(), item.id()));
        Self {
            items,
            pending: None,
            next_token: 1,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn ids(&self) -> Vec<DbId> {
        self.items.iter().map(Positioned::id).collect()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply `order` optimistically.
    pub fn begin_reorder(&mut self, order: &[DbId]) -> Result<MutationToken, CoreError> {
        if self.pending.is_some() {
            return Err(CoreError::Conflict(
                "Another reorder is still in flight for this collection".to_string(),
            ));
        }
        validate_reorder(&self.ids(), order)?;

        let token = MutationToken(self.next_token);
        self.next_token += 1;

        let reordered = apply_order(&self.items, order);
        let snapshot = std::mem::replace(&mut self.items, reordered);
        self.pending = Some(PendingMutation { token, snapshot });
        Ok(token)
    }

    /// The store accepted the mutation; drop the snapshot.
    pub fn confirm(&mut self, token: MutationToken) -> Result<(), CoreError> {
        self.take_pending(token).map(|_| ())
    }

    /// The store rejected the mutation; restore the snapshot.
    pub fn rollback(&mut self, token: MutationToken) -> Result<(), CoreError> {
        let pending = self.take_pending(token)?;
        self.items = pending.snapshot;
        Ok(())
    }

    fn take_pending(&mut self, token: MutationToken) -> Result<PendingMutation<T>, CoreError> {
        match self.pending.take() {
            Some(pending) if pending.token == token => Ok(pending),
            other => {
                self.pending = other;
                Err(CoreError::Conflict(
                    "Mutation token does not match the in-flight reorder".to_string(),
                ))
            }
        }
    }
}
