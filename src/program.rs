// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Front-end view of the program being marked.
//!
//! The engine never builds or rewrites this model. A front end resolves names,
//! types and overloading, computes the global effects of subprograms, and
//! hands over a [`Program`]: a list of compilation units (trees of
//! [`Node`]s) together with the entity graph ([`Entity`] records keyed by
//! their unique [`EntityId`]). Entity facets that the marker inspects when it
//! marks the entity (initial values, defaults, contracts) are owned by the
//! entity itself, so marking an entity never has to locate its declaration
//! in the tree.
//!
//! Every node, wherever it lives, receives a [`NodeId`] when the program is
//! built. Diagnostics and root causes refer to nodes through these ids.

mod entity;
mod node;
mod numbers;

use alloc::{collections::BTreeMap, format, string::ToString, vec::Vec};
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MarkingError, Result};
use crate::Rc;

pub use entity::{
    AccessKind, ComponentInfo, ContractCase, Entity, EntityKind, GlobalEffects, ObjectInfo,
    PackageInfo, ParameterInfo, ParameterMode, SubprogramInfo, SubprogramKind, SubsetMode,
    TypeDef, TypeInfo,
};
pub use node::{
    Association, BinaryOp, Branch, CaseAlternative, LoopScheme, Node, NodeKind, PragmaArgument,
    UnaryOp,
};
pub use numbers::Rational;

/// Unique name of an entity. The front end guarantees uniqueness across the
/// whole program (typically the fully qualified, overload-disambiguated
/// name).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Rc<str>);

impl EntityId {
    pub fn new(name: &str) -> Self {
        EntityId(Rc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(name: &str) -> Self {
        EntityId::new(name)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a node within one [`Program`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Deserialize)]
struct ProgramFile {
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    units: Vec<Node>,
}

/// A whole program: compilation units plus the entity graph.
#[derive(Clone, Debug)]
pub struct Program {
    units: Vec<Node>,
    entities: BTreeMap<EntityId, Entity>,
    node_count: u32,
}

impl Program {
    /// Assemble a program and number every node it contains.
    pub fn new(entities: Vec<Entity>, units: Vec<Node>) -> Result<Self> {
        let mut next = 0;
        let mut map = BTreeMap::new();

        for mut entity in entities {
            entity.number_nodes(&mut next);
            let name = entity.name.clone();
            if map.insert(name.clone(), entity).is_some() {
                return Err(MarkingError::invariant(format!(
                    "entity `{name}` is declared twice"
                )));
            }
        }

        let mut units = units;
        for unit in units.iter_mut() {
            unit.number(&mut next);
        }

        Ok(Program {
            units,
            entities: map,
            node_count: next,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ProgramFile =
            serde_json::from_str(json).map_err(|e| MarkingError::Load {
                what: "program",
                message: e.to_string(),
            })?;
        Program::new(file.entities, file.units)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: ProgramFile = serde_yaml::from_str(yaml).map_err(|e| MarkingError::Load {
            what: "program",
            message: e.to_string(),
        })?;
        Program::new(file.entities, file.units)
    }

    pub fn units(&self) -> &[Node] {
        &self.units
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity(&self, id: &EntityId) -> Result<&Entity> {
        self.entities
            .get(id)
            .ok_or_else(|| MarkingError::UnknownEntity(id.clone()))
    }

    pub fn type_info(&self, id: &EntityId) -> Result<&TypeInfo> {
        match &self.entity(id)?.kind {
            EntityKind::Type(info) => Ok(info),
            kind => Err(MarkingError::invariant(format!(
                "{} `{id}` is used as a type",
                kind.describe()
            ))),
        }
    }

    pub fn subprogram_info(&self, id: &EntityId) -> Result<&SubprogramInfo> {
        match &self.entity(id)?.kind {
            EntityKind::Subprogram(info) => Ok(info),
            _ => Err(MarkingError::invariant(format!(
                "entity `{id}` is used as a subprogram"
            ))),
        }
    }

    /// Declared type of an object, parameter, component or discriminant.
    pub fn declared_type(&self, id: &EntityId) -> Result<Option<&EntityId>> {
        Ok(self.entity(id)?.declared_type())
    }

    /// Whether the entity is declared outside of any subprogram, task or
    /// protected unit.
    pub fn is_library_level(&self, id: &EntityId) -> Result<bool> {
        let mut scope = self.entity(id)?.scope.clone();
        while let Some(current) = scope {
            let entity = self.entity(&current)?;
            match &entity.kind {
                EntityKind::Package(_) => scope = entity.scope.clone(),
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn numbering_covers_units_and_facets() {
        let object = Entity::new(
            "X",
            EntityKind::Object(ObjectInfo {
                ty: EntityId::new("Integer"),
                constant: false,
                init: Some(Node::new(NodeKind::IntegerLiteral { value: 1 })),
                volatile: false,
                relaxed_init: false,
            }),
        );
        let unit = Node::new(NodeKind::ObjectDeclaration {
            entity: EntityId::new("X"),
        });

        let program = Program::new(vec![object], vec![unit]).unwrap();
        assert_eq!(program.node_count(), 2);
        assert_eq!(program.units()[0].id, NodeId(1));
    }

    #[test]
    fn duplicate_entities_are_rejected() {
        let make = || Entity::new("P", EntityKind::Exception {});
        assert!(matches!(
            Program::new(vec![make(), make()], vec![]),
            Err(MarkingError::Invariant(_))
        ));
    }

    #[test]
    fn unknown_entity_lookup_fails() {
        let program = Program::new(vec![], vec![]).unwrap();
        assert!(matches!(
            program.entity(&EntityId::new("Missing")),
            Err(MarkingError::UnknownEntity(_))
        ));
    }
}
