// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::{string::String, vec::Vec};

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::numbers::{deserialize_big_int, Rational};
use super::{EntityId, Node};
use crate::Location;

/// Explicit subset-mode annotation of an entity or a body. Unannotated
/// entities inherit the mode of their scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsetMode {
    On,
    Off,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubprogramKind {
    Function,
    Procedure,
    Entry,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    /// Access-to-variable: values of the type own their designated object.
    #[default]
    Variable,
    Constant,
    Subprogram,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ObjectInfo {
    #[serde(rename = "type")]
    pub ty: EntityId,
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub init: Option<Node>,
    #[serde(default)]
    pub volatile: bool,
    #[serde(default)]
    pub relaxed_init: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ParameterInfo {
    #[serde(rename = "type")]
    pub ty: EntityId,
    #[serde(default)]
    pub mode: ParameterMode,
    #[serde(default)]
    pub default: Option<Node>,
    #[serde(default)]
    pub relaxed_init: bool,
}

/// Record components and discriminants.
#[derive(Clone, Debug, Deserialize)]
pub struct ComponentInfo {
    #[serde(rename = "type")]
    pub ty: EntityId,
    #[serde(default)]
    pub default: Option<Node>,
    #[serde(default)]
    pub relaxed_init: bool,
}

/// Non-local state read and written by a subprogram, as computed by the
/// flow analysis of the front end.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GlobalEffects {
    #[serde(default)]
    pub reads: Vec<EntityId>,
    #[serde(default)]
    pub writes: Vec<EntityId>,
    #[serde(default)]
    pub loc: Location,
}

/// `guard => consequence`. A missing guard stands for `others`.
#[derive(Clone, Debug, Deserialize)]
pub struct ContractCase {
    #[serde(default)]
    pub guard: Option<Node>,
    pub consequence: Node,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SubprogramInfo {
    pub kind: SubprogramKind,
    #[serde(default)]
    pub params: Vec<EntityId>,
    #[serde(default)]
    pub result: Option<EntityId>,
    #[serde(default)]
    pub pre: Option<Node>,
    #[serde(default)]
    pub post: Option<Node>,
    #[serde(default)]
    pub class_wide_pre: Option<Node>,
    #[serde(default)]
    pub class_wide_post: Option<Node>,
    #[serde(default)]
    pub contract_cases: Vec<ContractCase>,
    #[serde(default)]
    pub effects: GlobalEffects,
    #[serde(default)]
    pub volatile_function: bool,
    #[serde(default)]
    pub dispatching: bool,
    /// Inherited operations this one overrides.
    #[serde(default)]
    pub overridden: Vec<EntityId>,
    /// Entities that must be marked along with this one (implicit
    /// instantiations and the like).
    #[serde(default)]
    pub companions: Vec<EntityId>,
}

impl SubprogramInfo {
    pub fn is_function(&self) -> bool {
        self.kind == SubprogramKind::Function
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PackageInfo {
    #[serde(default)]
    pub initial_condition: Option<Node>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDef {
    Signed {
        #[serde(deserialize_with = "deserialize_big_int")]
        low: BigInt,
        #[serde(deserialize_with = "deserialize_big_int")]
        high: BigInt,
    },
    Modular {
        #[serde(deserialize_with = "deserialize_big_int")]
        modulus: BigInt,
    },
    Floating {
        digits: u32,
    },
    OrdinaryFixed {
        small: Rational,
    },
    DecimalFixed {
        digits: u32,
        delta: Rational,
    },
    Enumeration {
        #[serde(default)]
        literals: Vec<String>,
    },
    Array {
        indices: Vec<EntityId>,
        component: EntityId,
    },
    Record {
        #[serde(default)]
        discriminants: Vec<EntityId>,
        #[serde(default)]
        components: Vec<EntityId>,
        /// Parent of a type extension.
        #[serde(default)]
        parent: Option<EntityId>,
        #[serde(default)]
        interfaces: Vec<EntityId>,
        #[serde(default)]
        tagged: bool,
    },
    Interface {
        #[serde(default)]
        parents: Vec<EntityId>,
    },
    Access {
        designated: EntityId,
        #[serde(default)]
        kind: AccessKind,
        #[serde(default)]
        anonymous: bool,
        #[serde(default)]
        storage_pool: bool,
        #[serde(default)]
        storage_size: bool,
    },
    Private {
        #[serde(default)]
        full_view: Option<EntityId>,
        #[serde(default)]
        discriminants: Vec<EntityId>,
        #[serde(default)]
        tagged: bool,
    },
    Incomplete {
        #[serde(default)]
        full_view: Option<EntityId>,
    },
    Subtype {
        parent: EntityId,
        #[serde(default)]
        constraint: Vec<Node>,
    },
    Derived {
        parent: EntityId,
        #[serde(default)]
        constraint: Vec<Node>,
    },
    ClassWide {
        root: EntityId,
        #[serde(default)]
        constrained: bool,
    },
    Task {
        #[serde(default)]
        discriminants: Vec<EntityId>,
        #[serde(default)]
        entries: Vec<EntityId>,
    },
    Protected {
        #[serde(default)]
        discriminants: Vec<EntityId>,
        #[serde(default)]
        components: Vec<EntityId>,
        #[serde(default)]
        operations: Vec<EntityId>,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct TypeInfo {
    #[serde(flatten)]
    pub def: TypeDef,
    #[serde(default)]
    pub invariant: Option<Node>,
    #[serde(default)]
    pub default_initial_condition: Option<Node>,
    #[serde(default)]
    pub predicate_function: Option<EntityId>,
    #[serde(default)]
    pub relaxed_init: bool,
    /// Private type annotated as owning.
    #[serde(default)]
    pub ownership: bool,
    #[serde(default)]
    pub volatile: bool,
    #[serde(default)]
    pub primitives: Vec<EntityId>,
}

impl TypeInfo {
    pub fn new(def: TypeDef) -> Self {
        TypeInfo {
            def,
            invariant: None,
            default_initial_condition: None,
            predicate_function: None,
            relaxed_init: false,
            ownership: false,
            volatile: false,
            primitives: Vec::new(),
        }
    }

    pub fn is_tagged(&self) -> bool {
        match &self.def {
            TypeDef::Record { tagged, .. } | TypeDef::Private { tagged, .. } => *tagged,
            TypeDef::Interface { .. } | TypeDef::ClassWide { .. } => true,
            _ => false,
        }
    }

    pub fn is_concurrent(&self) -> bool {
        matches!(self.def, TypeDef::Task { .. } | TypeDef::Protected { .. })
    }

    /// Type one step closer to the representative type, if any.
    pub fn underlying(&self) -> Option<&EntityId> {
        match &self.def {
            TypeDef::Subtype { parent, .. } | TypeDef::Derived { parent, .. } => Some(parent),
            TypeDef::Private { full_view, .. } | TypeDef::Incomplete { full_view } => {
                full_view.as_ref()
            }
            _ => None,
        }
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        let constraint: &mut [Node] = match &mut self.def {
            TypeDef::Subtype { constraint, .. } | TypeDef::Derived { constraint, .. } => {
                constraint
            }
            _ => &mut [],
        };
        self.invariant
            .iter_mut()
            .chain(self.default_initial_condition.iter_mut())
            .chain(constraint.iter_mut())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Object(ObjectInfo),
    Parameter(ParameterInfo),
    Component(ComponentInfo),
    Discriminant(ComponentInfo),
    Type(TypeInfo),
    Subprogram(SubprogramInfo),
    Package(PackageInfo),
    AbstractState {},
    Number {
        #[serde(default)]
        value: Option<Node>,
    },
    Exception {},
}

impl EntityKind {
    pub fn describe(&self) -> &'static str {
        match self {
            EntityKind::Object(_) => "object",
            EntityKind::Parameter(_) => "parameter",
            EntityKind::Component(_) => "component",
            EntityKind::Discriminant(_) => "discriminant",
            EntityKind::Type(_) => "type",
            EntityKind::Subprogram(_) => "subprogram",
            EntityKind::Package(_) => "package",
            EntityKind::AbstractState {} => "abstract state",
            EntityKind::Number { .. } => "number",
            EntityKind::Exception {} => "exception",
        }
    }
}

/// Symbol-table record handed over by the front end.
#[derive(Clone, Debug, Deserialize)]
pub struct Entity {
    pub name: EntityId,
    #[serde(default)]
    pub loc: Location,
    /// Enclosing entity; `None` for library-level units.
    #[serde(default)]
    pub scope: Option<EntityId>,
    #[serde(default)]
    pub mode: Option<SubsetMode>,
    #[serde(flatten)]
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(name: &str, kind: EntityKind) -> Self {
        Entity {
            name: EntityId::new(name),
            loc: Location::default(),
            scope: None,
            mode: None,
            kind,
        }
    }

    pub fn in_scope(mut self, scope: &str) -> Self {
        self.scope = Some(EntityId::new(scope));
        self
    }

    pub fn with_mode(mut self, mode: SubsetMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn declared_type(&self) -> Option<&EntityId> {
        match &self.kind {
            EntityKind::Object(info) => Some(&info.ty),
            EntityKind::Parameter(info) => Some(&info.ty),
            EntityKind::Component(info) | EntityKind::Discriminant(info) => Some(&info.ty),
            _ => None,
        }
    }

    pub(crate) fn number_nodes(&mut self, next: &mut u32) {
        match &mut self.kind {
            EntityKind::Object(info) => {
                if let Some(init) = &mut info.init {
                    init.number(next);
                }
            }
            EntityKind::Parameter(ParameterInfo { default, .. })
            | EntityKind::Component(ComponentInfo { default, .. })
            | EntityKind::Discriminant(ComponentInfo { default, .. })
            | EntityKind::Number { value: default } => {
                if let Some(node) = default {
                    node.number(next);
                }
            }
            EntityKind::Type(info) => {
                for node in info.nodes_mut() {
                    node.number(next);
                }
            }
            EntityKind::Subprogram(info) => {
                for node in [
                    &mut info.pre,
                    &mut info.post,
                    &mut info.class_wide_pre,
                    &mut info.class_wide_post,
                ]
                .into_iter()
                .flatten()
                {
                    node.number(next);
                }
                for case in info.contract_cases.iter_mut() {
                    if let Some(guard) = &mut case.guard {
                        guard.number(next);
                    }
                    case.consequence.number(next);
                }
            }
            EntityKind::Package(info) => {
                if let Some(condition) = &mut info.initial_condition {
                    condition.number(next);
                }
            }
            EntityKind::AbstractState {} | EntityKind::Exception {} => {}
        }
    }
}
