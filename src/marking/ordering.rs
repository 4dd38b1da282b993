// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::{collections::BTreeSet, vec::Vec};

use crate::program::EntityId;

/// Accepted entities in the order the translator must declare them.
///
/// Entities are appended when their frame succeeds, which already puts
/// dependencies first. An entity with a prerequisite (the partial view of a
/// full type, the concurrent type of an operation) is held back until that
/// prerequisite has been appended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityList {
    entries: Vec<EntityId>,
    published: BTreeSet<EntityId>,
    /// `(prerequisite, entity)` pairs in arrival order.
    held: Vec<(EntityId, EntityId)>,
}

impl EntityList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, entity: &EntityId, prerequisite: Option<&EntityId>) {
        if self.published.contains(entity) || self.held.iter().any(|(_, e)| e == entity) {
            return;
        }
        if let Some(prerequisite) = prerequisite {
            if prerequisite != entity && !self.published.contains(prerequisite) {
                self.held.push((prerequisite.clone(), entity.clone()));
                return;
            }
        }
        self.append(entity.clone());
    }

    fn append(&mut self, entity: EntityId) {
        let mut ready = Vec::from([entity]);
        while let Some(next) = ready.pop() {
            self.entries.push(next.clone());
            self.published.insert(next.clone());

            // Release everything waiting on `next`, keeping arrival order.
            let mut released = Vec::new();
            self.held.retain(|(prerequisite, waiting)| {
                if *prerequisite == next {
                    released.push(waiting.clone());
                    false
                } else {
                    true
                }
            });
            ready.extend(released.into_iter().rev());
        }
    }

    /// Forget a retracted entity.
    pub fn remove(&mut self, entity: &EntityId) {
        if self.published.remove(entity) {
            self.entries.retain(|e| e != entity);
        }
        self.held.retain(|(_, waiting)| waiting != entity);
    }

    /// Append the entities whose prerequisite never got published.
    pub fn finish(&mut self) {
        let held = core::mem::take(&mut self.held);
        for (_, entity) in held {
            if self.published.insert(entity.clone()) {
                self.entries.push(entity);
            }
        }
    }

    pub fn contains(&self, entity: &EntityId) -> bool {
        self.published.contains(entity)
    }

    pub fn entries(&self) -> &[EntityId] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<EntityId> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> EntityId {
        EntityId::new(name)
    }

    fn names(list: &EntityList) -> Vec<&str> {
        list.entries().iter().map(|e| e.as_str()).collect()
    }

    #[test]
    fn held_entities_follow_their_prerequisite() {
        let mut list = EntityList::new();
        list.publish(&id("Full"), Some(&id("Partial")));
        list.publish(&id("Other"), None);
        list.publish(&id("Partial"), None);
        assert_eq!(names(&list), ["Other", "Partial", "Full"]);
    }

    #[test]
    fn chains_of_prerequisites_are_released_in_order() {
        let mut list = EntityList::new();
        list.publish(&id("C"), Some(&id("B")));
        list.publish(&id("B"), Some(&id("A")));
        list.publish(&id("D"), Some(&id("A")));
        list.publish(&id("A"), None);
        assert_eq!(names(&list), ["A", "B", "C", "D"]);
    }

    #[test]
    fn removal_and_finish() {
        let mut list = EntityList::new();
        list.publish(&id("X"), None);
        list.publish(&id("Y"), Some(&id("Never")));
        list.publish(&id("Z"), Some(&id("Never")));
        list.remove(&id("X"));
        list.remove(&id("Z"));
        list.finish();
        assert_eq!(names(&list), ["Y"]);
        assert!(!list.contains(&id("X")));
    }
}
