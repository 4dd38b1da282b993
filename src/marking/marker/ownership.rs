// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Move, borrow and observe rules for owning values.
//!
//! A path is a chain of selections, indexing, slicing and dereferences
//! rooted at a single object, possibly through calls to traversal
//! functions. Owning values may only be transferred or shared through
//! paths.

use alloc::vec::Vec;

use crate::diagnostics::{Anchor, ViolationKind};
use crate::error::Result;
use crate::program::{AccessKind, EntityId, EntityKind, Node, NodeKind};

use super::Marker;

/// What lies between a path and its root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathRoot {
    /// Root object or parameter.
    pub object: Option<EntityId>,
    /// Traversal function whose result roots the path.
    pub traversal: Option<EntityId>,
    pub constant_root: bool,
    pub crosses_slice: bool,
    pub crosses_constant_access: bool,
    pub crosses_variable_dereference: bool,
    pub volatile_or_concurrent: bool,
}

fn strip_conversions(expr: &Node) -> &Node {
    match &expr.kind {
        NodeKind::Conversion { expr, .. } | NodeKind::Qualified { expr, .. } => {
            strip_conversions(expr)
        }
        _ => expr,
    }
}

/// The expressions a conditional may evaluate to. Anything else is its own
/// single dependent expression.
fn dependent_expressions(expr: &Node) -> Vec<&Node> {
    fn collect<'n>(expr: &'n Node, out: &mut Vec<&'n Node>) {
        match &strip_conversions(expr).kind {
            NodeKind::IfExpression {
                then_value,
                else_value,
                ..
            } => {
                collect(then_value, out);
                collect(else_value, out);
            }
            _ => out.push(expr),
        }
    }

    let mut out = Vec::new();
    collect(expr, &mut out);
    out
}

impl PathRoot {
    /// Combines the roots of two branches. An object or traversal survives
    /// only when both branches share it; crossings of either branch count.
    fn merge(self, other: PathRoot) -> PathRoot {
        PathRoot {
            object: if self.object == other.object {
                self.object
            } else {
                None
            },
            traversal: if self.traversal == other.traversal {
                self.traversal
            } else {
                None
            },
            constant_root: self.constant_root || other.constant_root,
            crosses_slice: self.crosses_slice || other.crosses_slice,
            crosses_constant_access: self.crosses_constant_access || other.crosses_constant_access,
            crosses_variable_dereference: self.crosses_variable_dereference
                && other.crosses_variable_dereference,
            volatile_or_concurrent: self.volatile_or_concurrent || other.volatile_or_concurrent,
        }
    }
}

impl<'a> Marker<'a> {
    /// Shapes that denote an existing value rather than create one.
    pub(crate) fn is_name(&self, expr: &Node) -> Result<bool> {
        Ok(match &strip_conversions(expr).kind {
            NodeKind::Identifier { entity } => matches!(
                self.program.entity(entity)?.kind,
                EntityKind::Object(_) | EntityKind::Parameter(_)
            ),
            NodeKind::Selected { .. }
            | NodeKind::Indexed { .. }
            | NodeKind::Slice { .. }
            | NodeKind::Dereference { .. } => true,
            NodeKind::Call { callee, .. } => self.is_traversal_call(callee)?,
            NodeKind::IfExpression {
                then_value,
                else_value,
                ..
            } => self.is_name(then_value)? || self.is_name(else_value)?,
            _ => false,
        })
    }

    pub fn is_path_expression(&self, expr: &Node) -> Result<bool> {
        Ok(match &expr.kind {
            NodeKind::Identifier { entity } => matches!(
                self.program.entity(entity)?.kind,
                EntityKind::Object(_) | EntityKind::Parameter(_)
            ),
            NodeKind::Selected { prefix, .. }
            | NodeKind::Indexed { prefix, .. }
            | NodeKind::Slice { prefix, .. }
            | NodeKind::Dereference { prefix } => self.is_path_expression(prefix)?,
            NodeKind::Conversion { expr, .. } | NodeKind::Qualified { expr, .. } => {
                self.is_path_expression(expr)?
            }
            NodeKind::Call { callee, args } => {
                self.is_traversal_call(callee)?
                    && match args.first() {
                        Some(first) => self.is_path_expression(first)?,
                        None => false,
                    }
            }
            NodeKind::IfExpression {
                then_value,
                else_value,
                ..
            } => self.is_path_expression(then_value)? && self.is_path_expression(else_value)?,
            NodeKind::NullLiteral {} => true,
            _ => false,
        })
    }

    pub fn path_root(&self, expr: &Node) -> Result<PathRoot> {
        let mut root = PathRoot::default();
        self.walk_path(expr, &mut root)?;
        Ok(root)
    }

    fn walk_path(&self, expr: &Node, root: &mut PathRoot) -> Result<()> {
        match &expr.kind {
            NodeKind::Identifier { entity } => {
                let object = self.program.entity(entity)?;
                let volatile = match &object.kind {
                    EntityKind::Object(info) => info.volatile,
                    _ => false,
                };
                if let Some(ty) = object.declared_type() {
                    if volatile || self.is_volatile_type(ty)? || self.is_concurrent_type(ty)? {
                        root.volatile_or_concurrent = true;
                    }
                }
                root.constant_root = self.is_constant_object(entity)?;
                root.object = Some(entity.clone());
            }
            NodeKind::Selected { prefix, .. } | NodeKind::Indexed { prefix, .. } => {
                self.walk_path(prefix, root)?
            }
            NodeKind::Slice { prefix, .. } => {
                root.crosses_slice = true;
                self.walk_path(prefix, root)?
            }
            NodeKind::Dereference { prefix } => {
                if let Some(ty) = &prefix.ty {
                    match self.access_view(ty)?.map(|view| view.kind) {
                        Some(AccessKind::Constant) => root.crosses_constant_access = true,
                        Some(AccessKind::Variable) => root.crosses_variable_dereference = true,
                        _ => {}
                    }
                }
                self.walk_path(prefix, root)?
            }
            NodeKind::Conversion { expr, .. } | NodeKind::Qualified { expr, .. } => {
                self.walk_path(expr, root)?
            }
            NodeKind::Call { callee, args } if self.is_traversal_call(callee)? => {
                let info = self.program.subprogram_info(callee)?;
                if let Some(result) = &info.result {
                    if let Some(view) = self.access_view(result)? {
                        if view.kind == AccessKind::Constant {
                            root.crosses_constant_access = true;
                        }
                    }
                }
                root.traversal = Some(callee.clone());
                if let Some(first) = args.first() {
                    self.walk_path(first, root)?;
                }
            }
            NodeKind::IfExpression {
                then_value,
                else_value,
                ..
            } => {
                let branches = self.path_root(then_value)?.merge(self.path_root(else_value)?);
                root.object = branches.object;
                root.constant_root = branches.constant_root;
                if branches.traversal.is_some() {
                    root.traversal = branches.traversal;
                }
                root.crosses_slice |= branches.crosses_slice;
                root.crosses_constant_access |= branches.crosses_constant_access;
                root.crosses_variable_dereference |= branches.crosses_variable_dereference;
                root.volatile_or_concurrent |= branches.volatile_or_concurrent;
            }
            _ => {}
        }
        Ok(())
    }

    /// Moving `expr` into a new owner. Values that are not names are fresh
    /// and always movable. Each branch of a conditional is checked on its own.
    pub fn check_source_of_move(&self, expr: &Node, to_constant: bool) -> Result<bool> {
        for branch in dependent_expressions(expr) {
            if !self.is_movable(branch, to_constant)? {
                self.violation(Anchor::node(expr), ViolationKind::MoveSource);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is_movable(&self, expr: &Node, to_constant: bool) -> Result<bool> {
        if !self.is_name(expr)? {
            return Ok(true);
        }
        if !self.is_path_expression(expr)? {
            return Ok(false);
        }
        let root = self.path_root(expr)?;
        Ok(!root.volatile_or_concurrent && (to_constant || !root.crosses_constant_access))
    }

    /// Borrowing (`is_observe == false`) or observing `expr`. Each branch of
    /// a conditional must be a valid source on its own.
    pub fn check_source_of_borrow_or_observe(&self, expr: &Node, is_observe: bool) -> Result<bool> {
        let kind = if is_observe {
            ViolationKind::ObserveSource
        } else {
            ViolationKind::BorrowSource
        };
        for branch in dependent_expressions(expr) {
            if !self.is_borrowable(branch, is_observe)? {
                self.violation(Anchor::node(expr), kind);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is_borrowable(&self, expr: &Node, is_observe: bool) -> Result<bool> {
        let expr = strip_conversions(expr);
        if matches!(expr.kind, NodeKind::NullLiteral {}) {
            return Ok(true);
        }
        if !self.is_path_expression(expr)? {
            return Ok(false);
        }

        let root = self.path_root(expr)?;
        if root.object.is_none() && root.traversal.is_none() {
            return Ok(false);
        }
        if !is_observe {
            let constant = root.constant_root && !root.crosses_variable_dereference;
            if constant || root.crosses_slice || root.crosses_constant_access {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every value `expr` may produce is null or a path rooted at
    /// `object`.
    pub(crate) fn is_rooted_at(&self, expr: &Node, object: Option<&EntityId>) -> Result<bool> {
        for branch in dependent_expressions(expr) {
            if matches!(strip_conversions(branch).kind, NodeKind::NullLiteral {}) {
                continue;
            }
            if !self.is_path_expression(branch)?
                || self.path_root(branch)?.object.as_ref() != object
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// An anonymous access type only accepts values designating the same
    /// representative type.
    pub fn check_compatible_access_types(&self, expected: &EntityId, expr: &Node) -> Result<bool> {
        let Some(expected_view) = self.access_view(expected)? else {
            return Ok(true);
        };
        if !expected_view.anonymous
            || expected_view.kind == AccessKind::Subprogram
            || matches!(expr.kind, NodeKind::NullLiteral {})
        {
            return Ok(true);
        }
        let Some(actual) = &expr.ty else {
            return Ok(true);
        };

        let compatible = match self.access_view(actual)? {
            Some(actual_view) if actual_view.kind != AccessKind::Subprogram => {
                let (expected_rep, _) = self.representative(expected_view.designated)?;
                let (actual_rep, _) = self.representative(actual_view.designated)?;
                expected_rep == actual_rep
            }
            _ => false,
        };
        if !compatible {
            self.violation(Anchor::node(expr), ViolationKind::IncompatibleAccessTypes);
        }
        Ok(compatible)
    }
}
