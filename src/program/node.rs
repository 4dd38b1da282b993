// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::{boxed::Box, string::String, vec::Vec};

use serde::Deserialize;

use super::{EntityId, NodeId, SubsetMode};
use crate::Location;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Rem,
    Power,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    AndThen,
    OrElse,
}

impl BinaryOp {
    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Minus,
    Abs,
    Not,
}

/// One association of an aggregate: `choice | choice => value`, or
/// `others => value`. Positional associations have no choices.
#[derive(Clone, Debug, Deserialize)]
pub struct Association {
    #[serde(default)]
    pub choices: Vec<Node>,
    #[serde(default)]
    pub others: bool,
    pub value: Node,
}

impl Association {
    /// Whether the value is copied into more than one component.
    pub fn covers_several_components(&self) -> bool {
        self.others
            || self.choices.len() > 1
            || self
                .choices
                .iter()
                .any(|choice| matches!(choice.kind, NodeKind::Range { .. }))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Branch {
    pub condition: Node,
    #[serde(default)]
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CaseAlternative {
    #[serde(default)]
    pub choices: Vec<Node>,
    #[serde(default)]
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopScheme {
    While {
        condition: Box<Node>,
    },
    For {
        parameter: EntityId,
        domain: Box<Node>,
        #[serde(default)]
        reverse: bool,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct PragmaArgument {
    #[serde(default)]
    pub name: Option<String>,
    pub value: Node,
}

/// Shapes of the tree handed over by the front end.
///
/// The front end is contracted to rewrite away anything not listed here
/// (generic declarations are instantiated, renamings are resolved).
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // Expressions.
    Identifier {
        entity: EntityId,
    },
    /// A word with no entity behind it. Only valid as a pragma argument.
    Name {
        text: String,
    },
    IntegerLiteral {
        value: i64,
    },
    RealLiteral {
        text: String,
    },
    StringLiteral {
        value: String,
    },
    /// Literal of the enumeration type given as the node type.
    EnumerationLiteral {
        literal: String,
    },
    NullLiteral {},
    Aggregate {
        #[serde(default)]
        associations: Vec<Association>,
    },
    Selected {
        prefix: Box<Node>,
        component: EntityId,
    },
    Indexed {
        prefix: Box<Node>,
        indices: Vec<Node>,
    },
    Slice {
        prefix: Box<Node>,
        range: Box<Node>,
    },
    /// Explicit or implicit dereference of an access value.
    Dereference {
        prefix: Box<Node>,
    },
    Call {
        callee: EntityId,
        #[serde(default)]
        args: Vec<Node>,
    },
    Attribute {
        prefix: Box<Node>,
        name: String,
        #[serde(default)]
        args: Vec<Node>,
    },
    Conversion {
        target: EntityId,
        expr: Box<Node>,
    },
    Qualified {
        target: EntityId,
        expr: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Allocator {
        target: EntityId,
        #[serde(default)]
        init: Option<Box<Node>>,
    },
    IfExpression {
        condition: Box<Node>,
        then_value: Box<Node>,
        else_value: Box<Node>,
    },
    Quantified {
        variable: EntityId,
        domain: Box<Node>,
        predicate: Box<Node>,
        #[serde(default)]
        existential: bool,
    },
    Range {
        low: Box<Node>,
        high: Box<Node>,
    },
    Membership {
        expr: Box<Node>,
        choices: Vec<Node>,
    },

    // Statements.
    Assignment {
        target: Box<Node>,
        value: Box<Node>,
    },
    ProcedureCall {
        callee: EntityId,
        #[serde(default)]
        args: Vec<Node>,
    },
    Return {
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    If {
        branches: Vec<Branch>,
        #[serde(default)]
        else_body: Vec<Node>,
    },
    Case {
        selector: Box<Node>,
        alternatives: Vec<CaseAlternative>,
    },
    Loop {
        #[serde(default)]
        scheme: Option<LoopScheme>,
        #[serde(default)]
        body: Vec<Node>,
    },
    Block {
        #[serde(default)]
        declarations: Vec<Node>,
        #[serde(default)]
        statements: Vec<Node>,
    },
    Exit {
        #[serde(default)]
        condition: Option<Box<Node>>,
    },
    Goto {
        label: String,
    },
    Raise {
        #[serde(default)]
        exception: Option<EntityId>,
    },
    Delay {
        value: Box<Node>,
    },
    Abort {},
    CodeStatement {},
    NullStatement {},
    Pragma {
        name: String,
        #[serde(default)]
        args: Vec<PragmaArgument>,
    },

    // Declarations.
    ObjectDeclaration {
        entity: EntityId,
    },
    TypeDeclaration {
        entity: EntityId,
    },
    SubprogramDeclaration {
        entity: EntityId,
    },
    NumberDeclaration {
        entity: EntityId,
    },
    ExceptionDeclaration {
        entity: EntityId,
    },
    PackageDeclaration {
        entity: EntityId,
        #[serde(default)]
        visible: Vec<Node>,
        #[serde(default)]
        private: Vec<Node>,
    },
    SubprogramBody {
        entity: EntityId,
        #[serde(default)]
        mode: Option<SubsetMode>,
        #[serde(default)]
        declarations: Vec<Node>,
        #[serde(default)]
        statements: Vec<Node>,
    },
    PackageBody {
        entity: EntityId,
        #[serde(default)]
        mode: Option<SubsetMode>,
        #[serde(default)]
        declarations: Vec<Node>,
        #[serde(default)]
        statements: Vec<Node>,
    },
    TaskBody {
        entity: EntityId,
        #[serde(default)]
        mode: Option<SubsetMode>,
        #[serde(default)]
        declarations: Vec<Node>,
        #[serde(default)]
        statements: Vec<Node>,
    },
    ProtectedBody {
        entity: EntityId,
        #[serde(default)]
        mode: Option<SubsetMode>,
        #[serde(default)]
        bodies: Vec<Node>,
    },

    // Compilation units.
    CompilationUnit {
        #[serde(default)]
        context: Vec<Node>,
        unit: Box<Node>,
    },
    WithClause {
        unit: EntityId,
    },
    UseClause {},
}

/// A tree element. The static type is present on expressions whose type the
/// front end resolved.
#[derive(Clone, Debug, Deserialize)]
pub struct Node {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default)]
    pub loc: Location,
    #[serde(default, rename = "type")]
    pub ty: Option<EntityId>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            id: NodeId::default(),
            loc: Location::default(),
            ty: None,
            kind,
        }
    }

    pub fn typed(kind: NodeKind, ty: &str) -> Self {
        Node {
            ty: Some(EntityId::new(ty)),
            ..Node::new(kind)
        }
    }

    pub fn at(mut self, loc: Location) -> Self {
        self.loc = loc;
        self
    }

    pub(crate) fn number(&mut self, next: &mut u32) {
        self.id = NodeId(*next);
        *next += 1;
        self.for_each_child_mut(&mut |child| child.number(next));
    }

    fn for_each_child_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        fn all(nodes: &mut [Node], f: &mut dyn FnMut(&mut Node)) {
            for node in nodes.iter_mut() {
                f(node);
            }
        }

        match &mut self.kind {
            NodeKind::Identifier { .. }
            | NodeKind::Name { .. }
            | NodeKind::IntegerLiteral { .. }
            | NodeKind::RealLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::EnumerationLiteral { .. }
            | NodeKind::NullLiteral {}
            | NodeKind::Goto { .. }
            | NodeKind::Raise { .. }
            | NodeKind::Abort {}
            | NodeKind::CodeStatement {}
            | NodeKind::NullStatement {}
            | NodeKind::ObjectDeclaration { .. }
            | NodeKind::TypeDeclaration { .. }
            | NodeKind::SubprogramDeclaration { .. }
            | NodeKind::NumberDeclaration { .. }
            | NodeKind::ExceptionDeclaration { .. }
            | NodeKind::WithClause { .. }
            | NodeKind::UseClause {} => {}

            NodeKind::Aggregate { associations } => {
                for association in associations.iter_mut() {
                    all(&mut association.choices, f);
                    f(&mut association.value);
                }
            }
            NodeKind::Selected { prefix, .. } | NodeKind::Dereference { prefix } => f(prefix),
            NodeKind::Indexed { prefix, indices } => {
                f(prefix);
                all(indices, f);
            }
            NodeKind::Slice { prefix, range } => {
                f(prefix);
                f(range);
            }
            NodeKind::Call { args, .. } | NodeKind::ProcedureCall { args, .. } => all(args, f),
            NodeKind::Attribute { prefix, args, .. } => {
                f(prefix);
                all(args, f);
            }
            NodeKind::Conversion { expr, .. } | NodeKind::Qualified { expr, .. } => f(expr),
            NodeKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            NodeKind::Unary { operand, .. } => f(operand),
            NodeKind::Allocator { init, .. } => {
                if let Some(init) = init {
                    f(init);
                }
            }
            NodeKind::IfExpression {
                condition,
                then_value,
                else_value,
            } => {
                f(condition);
                f(then_value);
                f(else_value);
            }
            NodeKind::Quantified {
                domain, predicate, ..
            } => {
                f(domain);
                f(predicate);
            }
            NodeKind::Range { low, high } => {
                f(low);
                f(high);
            }
            NodeKind::Membership { expr, choices } => {
                f(expr);
                all(choices, f);
            }
            NodeKind::Assignment { target, value } => {
                f(target);
                f(value);
            }
            NodeKind::Return { value } | NodeKind::Exit { condition: value } => {
                if let Some(value) = value {
                    f(value);
                }
            }
            NodeKind::If {
                branches,
                else_body,
            } => {
                for branch in branches.iter_mut() {
                    f(&mut branch.condition);
                    all(&mut branch.body, f);
                }
                all(else_body, f);
            }
            NodeKind::Case {
                selector,
                alternatives,
            } => {
                f(selector);
                for alternative in alternatives.iter_mut() {
                    all(&mut alternative.choices, f);
                    all(&mut alternative.body, f);
                }
            }
            NodeKind::Loop { scheme, body } => {
                match scheme {
                    Some(LoopScheme::While { condition }) => f(condition),
                    Some(LoopScheme::For { domain, .. }) => f(domain),
                    None => {}
                }
                all(body, f);
            }
            NodeKind::Block {
                declarations,
                statements,
            }
            | NodeKind::SubprogramBody {
                declarations,
                statements,
                ..
            }
            | NodeKind::PackageBody {
                declarations,
                statements,
                ..
            }
            | NodeKind::TaskBody {
                declarations,
                statements,
                ..
            } => {
                all(declarations, f);
                all(statements, f);
            }
            NodeKind::Delay { value } => f(value),
            NodeKind::Pragma { args, .. } => {
                for arg in args.iter_mut() {
                    f(&mut arg.value);
                }
            }
            NodeKind::PackageDeclaration {
                visible, private, ..
            } => {
                all(visible, f);
                all(private, f);
            }
            NodeKind::ProtectedBody { bodies, .. } => all(bodies, f),
            NodeKind::CompilationUnit { context, unit } => {
                all(context, f);
                f(unit);
            }
        }
    }
}
