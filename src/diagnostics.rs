// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Verdict explanations emitted while marking.
//!
//! The engine does not render text. It hands structured reports to a
//! [`DiagnosticSink`]; [`Diagnostics`] is a sink that simply collects them.

use alloc::{string::String, vec::Vec};

use serde::Serialize;

use crate::program::{EntityId, Node, NodeId};
use crate::Location;

/// Site a report or a root cause is attributed to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case", tag = "anchor")]
pub enum Anchor {
    Node { id: NodeId, loc: Location },
    Entity { entity: EntityId, loc: Location },
    /// The global-effects facet of a subprogram.
    GlobalEffects { subprogram: EntityId, loc: Location },
}

impl Anchor {
    pub fn node(node: &Node) -> Self {
        Anchor::Node {
            id: node.id,
            loc: node.loc,
        }
    }

    pub fn entity(entity: &EntityId, loc: Location) -> Self {
        Anchor::Entity {
            entity: entity.clone(),
            loc,
        }
    }

    pub fn loc(&self) -> Location {
        match self {
            Anchor::Node { loc, .. }
            | Anchor::Entity { loc, .. }
            | Anchor::GlobalEffects { loc, .. } => *loc,
        }
    }

    /// Entity the anchor designates, if it is not a tree node.
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            Anchor::Node { .. } => None,
            Anchor::Entity { entity, .. } => Some(entity),
            Anchor::GlobalEffects { subprogram, .. } => Some(subprogram),
        }
    }
}

/// Breaches of a subset legality rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ViolationKind {
    /// A referenced entity is not in the subset.
    EntityNotInSubset { entity: EntityId },
    /// An entity consulted while it was provisionally accepted was rejected
    /// later on.
    DependsOnExcluded { entity: EntityId },
    AnonymousAccessComponent,
    OwningComponentInExtension { component: EntityId },
    DuplicatedOwningValue,
    AccessStorageClause,
    FunctionWithOutParameter { parameter: EntityId },
    FunctionWithSideEffects,
    VolatileInFunction { entity: EntityId },
    AnonymousAccessResult,
    TraversalFirstParameter,
    TraversalReturn,
    SpecificPreconditionOnDispatching,
    MoveSource,
    BorrowSource,
    ObserveSource,
    ActualNotPath,
    IncompatibleAccessTypes,
    AccessEquality,
    ArrayConversionIndex,
    FixedPointScaling,
    StaticAttributePrefix { attribute: String },
    GotoStatement,
    AbortStatement,
    CodeStatement,
    VolatileNotLibraryLevel,
    UnknownPragma { name: String },
}

/// Constructs the engine deliberately declines to handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "feature")]
pub enum UnsupportedFeature {
    IntegerRange,
    ModulusTooLarge,
    FloatDigits { digits: u32 },
    FixedPointSmall,
    DecimalFixedPoint,
    FixedPointFloatResult,
    ArrayDimensions { dimensions: usize },
    ConstrainedClassWide,
    RelaxedInitWithInvariant,
    MultipleInheritance,
    MissingCompletion,
    Attribute { name: String },
    Pragma { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "warning")]
pub enum WarningKind {
    /// The attribute is supported, but its value is only known to the
    /// compiler.
    ImpreciseAttribute { name: String },
    UnknownPragma { name: String },
}

/// Receiver of the reports produced during a run.
pub trait DiagnosticSink {
    fn report_violation(&mut self, at: &Anchor, kind: ViolationKind, root_cause: Option<&Anchor>);

    fn report_unsupported(&mut self, at: &Anchor, feature: UnsupportedFeature);

    fn report_warning(&mut self, _at: &Anchor, _warning: WarningKind) {}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Violation(ViolationKind),
    Unsupported(UnsupportedFeature),
    Warning(WarningKind),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub at: Anchor,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<Anchor>,
}

impl Diagnostic {
    pub fn is_violation(&self) -> bool {
        matches!(self.kind, DiagnosticKind::Violation(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, DiagnosticKind::Unsupported(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.kind, DiagnosticKind::Warning(_))
    }
}

/// Sink that keeps every report in arrival order.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn violations(&self) -> impl Iterator<Item = (&Anchor, &ViolationKind)> {
        self.items.iter().filter_map(|d| match &d.kind {
            DiagnosticKind::Violation(kind) => Some((&d.at, kind)),
            _ => None,
        })
    }

    pub fn unsupported(&self) -> impl Iterator<Item = (&Anchor, &UnsupportedFeature)> {
        self.items.iter().filter_map(|d| match &d.kind {
            DiagnosticKind::Unsupported(feature) => Some((&d.at, feature)),
            _ => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&Anchor, &WarningKind)> {
        self.items.iter().filter_map(|d| match &d.kind {
            DiagnosticKind::Warning(warning) => Some((&d.at, warning)),
            _ => None,
        })
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl DiagnosticSink for Diagnostics {
    fn report_violation(&mut self, at: &Anchor, kind: ViolationKind, root_cause: Option<&Anchor>) {
        self.items.push(Diagnostic {
            at: at.clone(),
            kind: DiagnosticKind::Violation(kind),
            root_cause: root_cause.cloned(),
        });
    }

    fn report_unsupported(&mut self, at: &Anchor, feature: UnsupportedFeature) {
        self.items.push(Diagnostic {
            at: at.clone(),
            kind: DiagnosticKind::Unsupported(feature),
            root_cause: None,
        });
    }

    fn report_warning(&mut self, at: &Anchor, warning: WarningKind) {
        self.items.push(Diagnostic {
            at: at.clone(),
            kind: DiagnosticKind::Warning(warning),
            root_cause: None,
        });
    }
}
