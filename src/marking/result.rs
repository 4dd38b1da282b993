// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use serde::Serialize;

use crate::diagnostics::Anchor;
use crate::program::{EntityId, NodeId};

use super::state::MarkingState;

/// Read-only outcome of a run, consumed by the translator.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MarkingResult {
    in_subset: BTreeSet<EntityId>,
    body_in_subset: BTreeSet<EntityId>,
    ordered: Vec<EntityId>,
    relaxed_init: BTreeMap<EntityId, bool>,
    full_view_hidden: BTreeSet<EntityId>,
    root_causes: BTreeMap<EntityId, Anchor>,
    body_root_causes: BTreeMap<EntityId, Anchor>,
    incomplete_views: BTreeMap<EntityId, EntityId>,
    loop_entities: BTreeMap<EntityId, NodeId>,
    rejected_aspects: BTreeSet<EntityId>,
}

impl MarkingResult {
    pub(crate) fn from_state(state: MarkingState) -> Self {
        MarkingResult {
            in_subset: state.in_subset,
            body_in_subset: state.body_in_subset,
            ordered: state.ordered.into_entries(),
            relaxed_init: state.relaxed_init,
            full_view_hidden: state.full_view_hidden,
            root_causes: state.root_causes,
            body_root_causes: state.body_root_causes,
            incomplete_views: state.incomplete_views,
            loop_entities: state.loop_entities,
            rejected_aspects: state.rejected_aspects,
        }
    }

    pub fn in_subset(&self, id: &EntityId) -> bool {
        self.in_subset.contains(id)
    }

    pub fn body_in_subset(&self, id: &EntityId) -> bool {
        self.body_in_subset.contains(id)
    }

    pub fn in_subset_entities(&self) -> &BTreeSet<EntityId> {
        &self.in_subset
    }

    pub fn body_in_subset_entities(&self) -> &BTreeSet<EntityId> {
        &self.body_in_subset
    }

    /// Accepted entities in dependency order.
    pub fn ordered_entities(&self) -> &[EntityId] {
        &self.ordered
    }

    /// `Some(true)` when the type declares relaxed initialization,
    /// `Some(false)` when it inherits it from a part.
    pub fn relaxed_init(&self, ty: &EntityId) -> Option<bool> {
        self.relaxed_init.get(ty).copied()
    }

    pub fn full_view_hidden(&self, ty: &EntityId) -> bool {
        self.full_view_hidden.contains(ty)
    }

    pub fn root_cause(&self, id: &EntityId) -> Option<&Anchor> {
        self.root_causes.get(id)
    }

    pub fn body_root_cause(&self, id: &EntityId) -> Option<&Anchor> {
        self.body_root_causes.get(id)
    }

    /// Access type through which an incomplete type was completed.
    pub fn incomplete_view(&self, incomplete: &EntityId) -> Option<&EntityId> {
        self.incomplete_views.get(incomplete)
    }

    pub fn enclosing_loop(&self, id: &EntityId) -> Option<NodeId> {
        self.loop_entities.get(id).copied()
    }

    pub fn has_rejected_aspects(&self, ty: &EntityId) -> bool {
        self.rejected_aspects.contains(ty)
    }
}
