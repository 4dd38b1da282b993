// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::Anchor;
use crate::program::{EntityId, NodeId};

use super::ordering::EntityList;
use super::queues::DeferredQueues;

/// Scope whose verdict is being decided: the declaration of an entity or
/// the body of a subprogram, package, task or protected unit.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Frame {
    Entity(EntityId),
    Body(EntityId),
}

/// Mutable state of one marking run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkingState {
    pub(crate) visited: BTreeSet<EntityId>,
    pub(crate) in_subset: BTreeSet<EntityId>,
    pub(crate) body_in_subset: BTreeSet<EntityId>,
    pub(crate) full_view_hidden: BTreeSet<EntityId>,
    /// Representative types that may hold partially initialized values;
    /// `true` when the property is declared rather than inherited.
    pub(crate) relaxed_init: BTreeMap<EntityId, bool>,
    /// Entities declared inside a loop, with that loop.
    pub(crate) loop_entities: BTreeMap<EntityId, NodeId>,
    /// Incomplete type to the access type that designates it.
    pub(crate) incomplete_views: BTreeMap<EntityId, EntityId>,
    pub(crate) root_causes: BTreeMap<EntityId, Anchor>,
    pub(crate) body_root_causes: BTreeMap<EntityId, Anchor>,
    /// Types whose deferred invariant or default initial condition failed.
    pub(crate) rejected_aspects: BTreeSet<EntityId>,
    /// Frames that consulted an entity while it was (possibly
    /// provisionally) in the subset.
    pub(crate) dependents: BTreeMap<EntityId, BTreeSet<Frame>>,
    /// Frames running in `on` mode.
    pub(crate) reporting_frames: BTreeSet<Frame>,
    pub(crate) queues: DeferredQueues,
    pub(crate) ordered: EntityList,
}

impl MarkingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visited(&self, id: &EntityId) -> bool {
        self.visited.contains(id)
    }

    pub fn is_in_subset(&self, id: &EntityId) -> bool {
        self.in_subset.contains(id)
    }

    pub fn is_body_in_subset(&self, id: &EntityId) -> bool {
        self.body_in_subset.contains(id)
    }

    pub fn root_cause(&self, id: &EntityId) -> Option<&Anchor> {
        self.root_causes.get(id)
    }

    pub fn queues(&self) -> &DeferredQueues {
        &self.queues
    }

    pub fn ordered(&self) -> &EntityList {
        &self.ordered
    }

    pub(crate) fn record_dependency(&mut self, consulted: &EntityId, frame: &Frame) {
        if let Frame::Entity(own) = frame {
            if own == consulted {
                return;
            }
        }
        self.dependents
            .entry(consulted.clone())
            .or_default()
            .insert(frame.clone());
    }

    /// Record the relaxed-initialization property on `ty`. Inherited marks
    /// never downgrade a declared one.
    pub(crate) fn record_relaxed_init(&mut self, ty: &EntityId, own: bool) -> bool {
        match self.relaxed_init.get(ty) {
            Some(true) => false,
            Some(false) if !own => false,
            _ => {
                self.relaxed_init.insert(ty.clone(), own);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxed_init_is_never_downgraded() {
        let mut state = MarkingState::new();
        let ty = EntityId::new("T");
        assert!(state.record_relaxed_init(&ty, false));
        assert!(!state.record_relaxed_init(&ty, false));
        assert!(state.record_relaxed_init(&ty, true));
        assert!(!state.record_relaxed_init(&ty, false));
        assert_eq!(state.relaxed_init.get(&ty), Some(&true));
    }

    #[test]
    fn frames_do_not_depend_on_themselves() {
        let mut state = MarkingState::new();
        let t = EntityId::new("T");
        state.record_dependency(&t, &Frame::Entity(t.clone()));
        assert!(state.dependents.is_empty());
        state.record_dependency(&t, &Frame::Body(t.clone()));
        assert_eq!(state.dependents[&t].len(), 1);
    }
}
