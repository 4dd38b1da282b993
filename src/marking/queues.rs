// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Work postponed until the current top-down pass has returned.
//!
//! All three queues are strict FIFO and accept an entity at most once over
//! the whole run, which bounds the drain loop by the number of entities.

use alloc::collections::{BTreeSet, VecDeque};

use crate::program::EntityId;

/// One unit of deferred work, in the order the drain loop serves them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deferred {
    /// An entity to mark with a fresh context (primitive operations,
    /// concurrent operations, companions).
    Entity(EntityId),
    /// Invariant and default initial condition of a type, with the entity
    /// whose explicit mode governs the reports.
    TypeAspects {
        ty: EntityId,
        anchor: Option<EntityId>,
    },
    /// Access type whose designated type was incomplete when it was marked.
    IncompleteAccess(EntityId),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeferredQueues {
    entities: VecDeque<EntityId>,
    type_aspects: VecDeque<(EntityId, Option<EntityId>)>,
    incomplete_access: VecDeque<EntityId>,
    queued_entities: BTreeSet<EntityId>,
    queued_aspects: BTreeSet<EntityId>,
    queued_incomplete: BTreeSet<EntityId>,
}

impl DeferredQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_entity(&mut self, id: &EntityId) -> bool {
        if !self.queued_entities.insert(id.clone()) {
            return false;
        }
        self.entities.push_back(id.clone());
        true
    }

    pub fn push_type_aspects(&mut self, ty: &EntityId, anchor: Option<&EntityId>) -> bool {
        if !self.queued_aspects.insert(ty.clone()) {
            return false;
        }
        self.type_aspects.push_back((ty.clone(), anchor.cloned()));
        true
    }

    pub fn push_incomplete_access(&mut self, access: &EntityId) -> bool {
        if !self.queued_incomplete.insert(access.clone()) {
            return false;
        }
        self.incomplete_access.push_back(access.clone());
        true
    }

    /// Next item: plain entities first, then type aspects, then incomplete
    /// accesses.
    pub fn pop(&mut self) -> Option<Deferred> {
        if let Some(id) = self.entities.pop_front() {
            return Some(Deferred::Entity(id));
        }
        if let Some((ty, anchor)) = self.type_aspects.pop_front() {
            return Some(Deferred::TypeAspects { ty, anchor });
        }
        self.incomplete_access
            .pop_front()
            .map(Deferred::IncompleteAccess)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.type_aspects.is_empty() && self.incomplete_access.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len() + self.type_aspects.len() + self.incomplete_access.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> EntityId {
        EntityId::new(name)
    }

    #[test]
    fn drains_by_priority_then_fifo() {
        let mut queues = DeferredQueues::new();
        assert!(queues.push_incomplete_access(&id("Ptr")));
        assert!(queues.push_type_aspects(&id("T"), Some(&id("P"))));
        assert!(queues.push_entity(&id("A")));
        assert!(queues.push_entity(&id("B")));

        assert_eq!(queues.pop(), Some(Deferred::Entity(id("A"))));
        assert_eq!(queues.pop(), Some(Deferred::Entity(id("B"))));
        assert_eq!(
            queues.pop(),
            Some(Deferred::TypeAspects {
                ty: id("T"),
                anchor: Some(id("P"))
            })
        );
        assert_eq!(queues.pop(), Some(Deferred::IncompleteAccess(id("Ptr"))));
        assert_eq!(queues.pop(), None);
        assert!(queues.is_empty());
    }

    #[test]
    fn entities_are_queued_once_per_run() {
        let mut queues = DeferredQueues::new();
        assert!(queues.push_entity(&id("A")));
        assert!(!queues.push_entity(&id("A")));
        assert_eq!(queues.pop(), Some(Deferred::Entity(id("A"))));
        assert!(!queues.push_entity(&id("A")));
        assert_eq!(queues.len(), 0);
    }
}
