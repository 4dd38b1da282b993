// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::{format, string::ToString};

use crate::diagnostics::{Anchor, UnsupportedFeature, ViolationKind, WarningKind};
use crate::error::{MarkingError, Result};
use crate::marking::attributes::{attribute_category, AttributeCategory};
use crate::marking::state::MarkingState;
use crate::program::{
    AccessKind, Association, BinaryOp, EntityId, EntityKind, Node, NodeKind, ParameterMode,
};

use super::Marker;

impl<'a> Marker<'a> {
    /// Mark an expression. When its static type is out of the subset, only
    /// the subexpressions are visited: the type violation masks whatever
    /// else the node would report.
    pub(crate) fn mark_expr(&self, state: &mut MarkingState, expr: &Node) -> Result<()> {
        if let Some(ty) = &expr.ty {
            if !self.require(state, ty, &Anchor::node(expr))? {
                return self.mark_subexpressions(state, expr);
            }
        }

        match &expr.kind {
            NodeKind::Identifier { entity } => {
                self.require(state, entity, &Anchor::node(expr))?;
            }
            NodeKind::Name { text } => {
                return Err(MarkingError::invariant(format!(
                    "unresolved name `{text}` at node {}",
                    expr.id
                )))
            }
            NodeKind::IntegerLiteral { .. }
            | NodeKind::RealLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::EnumerationLiteral { .. }
            | NodeKind::NullLiteral {} => {}
            NodeKind::Aggregate { associations } => {
                self.mark_aggregate(state, associations)?;
            }
            NodeKind::Selected { prefix, component } => {
                self.mark_expr(state, prefix)?;
                if matches!(
                    self.program.entity(component)?.kind,
                    EntityKind::Component(_) | EntityKind::Discriminant(_)
                ) {
                    self.require(state, component, &Anchor::node(expr))?;
                }
            }
            NodeKind::Indexed { prefix, indices } => {
                self.mark_expr(state, prefix)?;
                for index in indices {
                    self.mark_expr(state, index)?;
                }
            }
            NodeKind::Slice { prefix, range } => {
                self.mark_expr(state, prefix)?;
                self.mark_expr(state, range)?;
            }
            NodeKind::Dereference { prefix } => self.mark_expr(state, prefix)?,
            NodeKind::Call { callee, args } => {
                self.mark_call(state, expr, callee, args)?;
            }
            NodeKind::Attribute { prefix, name, args } => {
                self.mark_attribute(state, expr, prefix, name)?;
                for arg in args {
                    self.mark_expr(state, arg)?;
                }
            }
            NodeKind::Conversion { target, expr: operand } => {
                let target_ok = self.require(state, target, &Anchor::node(expr))?;
                self.mark_expr(state, operand)?;
                if target_ok {
                    self.check_array_conversion(expr, target, operand)?;
                }
            }
            NodeKind::Qualified { target, expr: operand } => {
                self.require(state, target, &Anchor::node(expr))?;
                self.mark_expr(state, operand)?;
            }
            NodeKind::Binary { op, left, right } => {
                self.mark_expr(state, left)?;
                self.mark_expr(state, right)?;
                self.check_binary(expr, *op, left, right)?;
            }
            NodeKind::Unary { operand, .. } => self.mark_expr(state, operand)?,
            NodeKind::Allocator { target, init } => {
                let target_ok = self.require(state, target, &Anchor::node(expr))?;
                if let Some(init) = init {
                    self.mark_expr(state, init)?;
                    if target_ok && self.is_deep(target)? {
                        self.check_source_of_move(init, false)?;
                    }
                }
            }
            NodeKind::IfExpression {
                condition,
                then_value,
                else_value,
            } => {
                self.mark_expr(state, condition)?;
                self.mark_expr(state, then_value)?;
                self.mark_expr(state, else_value)?;
            }
            NodeKind::Quantified {
                variable,
                domain,
                predicate,
                ..
            } => {
                self.require(state, variable, &Anchor::node(expr))?;
                self.mark_expr(state, domain)?;
                self.mark_expr(state, predicate)?;
            }
            NodeKind::Range { low, high } => {
                self.mark_expr(state, low)?;
                self.mark_expr(state, high)?;
            }
            NodeKind::Membership { expr: operand, choices } => {
                self.mark_expr(state, operand)?;
                for choice in choices {
                    self.mark_choice(state, choice)?;
                }
            }
            _ => {
                return Err(MarkingError::invariant(format!(
                    "node {} is not an expression",
                    expr.id
                )))
            }
        }
        Ok(())
    }

    /// Choices may name a subtype instead of a value.
    fn mark_choice(&self, state: &mut MarkingState, choice: &Node) -> Result<()> {
        if let NodeKind::Identifier { entity } = &choice.kind {
            if matches!(self.program.entity(entity)?.kind, EntityKind::Type(_)) {
                self.require(state, entity, &Anchor::node(choice))?;
                return Ok(());
            }
        }
        self.mark_expr(state, choice)
    }

    /// Visit the children of an expression without checking it.
    fn mark_subexpressions(&self, state: &mut MarkingState, expr: &Node) -> Result<()> {
        match &expr.kind {
            NodeKind::Aggregate { associations } => {
                for association in associations {
                    for choice in &association.choices {
                        self.mark_choice(state, choice)?;
                    }
                    self.mark_expr(state, &association.value)?;
                }
            }
            NodeKind::Selected { prefix, .. } | NodeKind::Dereference { prefix } => {
                self.mark_expr(state, prefix)?
            }
            NodeKind::Indexed { prefix, indices } => {
                self.mark_expr(state, prefix)?;
                for index in indices {
                    self.mark_expr(state, index)?;
                }
            }
            NodeKind::Slice { prefix, range } => {
                self.mark_expr(state, prefix)?;
                self.mark_expr(state, range)?;
            }
            NodeKind::Call { args, .. } => {
                for arg in args {
                    self.mark_expr(state, arg)?;
                }
            }
            NodeKind::Attribute { prefix, args, .. } => {
                self.mark_attribute_prefix(state, prefix)?;
                for arg in args {
                    self.mark_expr(state, arg)?;
                }
            }
            NodeKind::Conversion { expr: operand, .. }
            | NodeKind::Qualified { expr: operand, .. }
            | NodeKind::Unary { operand, .. } => self.mark_expr(state, operand)?,
            NodeKind::Binary { left, right, .. } | NodeKind::Range { low: left, high: right } => {
                self.mark_expr(state, left)?;
                self.mark_expr(state, right)?;
            }
            NodeKind::Allocator { init, .. } => {
                if let Some(init) = init {
                    self.mark_expr(state, init)?;
                }
            }
            NodeKind::IfExpression {
                condition,
                then_value,
                else_value,
            } => {
                self.mark_expr(state, condition)?;
                self.mark_expr(state, then_value)?;
                self.mark_expr(state, else_value)?;
            }
            NodeKind::Quantified {
                domain, predicate, ..
            } => {
                self.mark_expr(state, domain)?;
                self.mark_expr(state, predicate)?;
            }
            NodeKind::Membership { expr: operand, choices } => {
                self.mark_expr(state, operand)?;
                for choice in choices {
                    self.mark_choice(state, choice)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn mark_aggregate(&self, state: &mut MarkingState, associations: &[Association]) -> Result<()> {
        for association in associations {
            for choice in &association.choices {
                self.mark_choice(state, choice)?;
            }
            let value = &association.value;
            self.mark_expr(state, value)?;

            let Some(ty) = &value.ty else {
                continue;
            };
            if !state.in_subset.contains(ty) || !self.is_deep(ty)? {
                continue;
            }
            if association.covers_several_components() && self.is_name(value)? {
                // The same owning value would land in several components.
                self.violation(Anchor::node(value), ViolationKind::DuplicatedOwningValue);
            } else {
                self.check_source_of_move(value, false)?;
            }
        }
        Ok(())
    }

    /// Calls in expressions and procedure call statements.
    pub(crate) fn mark_call(
        &self,
        state: &mut MarkingState,
        call: &Node,
        callee: &EntityId,
        args: &[Node],
    ) -> Result<()> {
        let callee_ok = self.require(state, callee, &Anchor::node(call))?;
        let info = self.program.subprogram_info(callee)?;

        for arg in args {
            self.mark_expr(state, arg)?;
        }
        if !callee_ok {
            return Ok(());
        }

        for (param, arg) in info.params.iter().zip(args) {
            let param_info = match &self.program.entity(param)?.kind {
                EntityKind::Parameter(param_info) => param_info,
                _ => {
                    return Err(MarkingError::invariant(format!(
                        "`{param}` is listed as a parameter of `{callee}`"
                    )))
                }
            };
            let ty = &param_info.ty;
            if !state.in_subset.contains(ty) {
                continue;
            }

            if let Some(view) = self
                .access_view(ty)?
                .filter(|view| view.anonymous && view.kind != AccessKind::Subprogram)
            {
                self.check_source_of_borrow_or_observe(arg, view.kind == AccessKind::Constant)?;
                self.check_compatible_access_types(ty, arg)?;
                continue;
            }
            if !self.is_deep(ty)? {
                continue;
            }
            match param_info.mode {
                ParameterMode::In => {
                    if self.is_name(arg)? {
                        self.check_source_of_borrow_or_observe(arg, true)?;
                    }
                }
                ParameterMode::Out | ParameterMode::InOut => {
                    if !self.is_path_expression(arg)? {
                        self.violation(Anchor::node(arg), ViolationKind::ActualNotPath);
                    }
                }
            }
        }
        Ok(())
    }

    fn mark_attribute_prefix(&self, state: &mut MarkingState, prefix: &Node) -> Result<bool> {
        if let NodeKind::Identifier { entity } = &prefix.kind {
            if matches!(self.program.entity(entity)?.kind, EntityKind::Type(_)) {
                self.require(state, entity, &Anchor::node(prefix))?;
                return Ok(true);
            }
        }
        self.mark_expr(state, prefix)?;
        Ok(false)
    }

    fn mark_attribute(
        &self,
        state: &mut MarkingState,
        expr: &Node,
        prefix: &Node,
        name: &str,
    ) -> Result<()> {
        let denotes_type = self.mark_attribute_prefix(state, prefix)?;
        let at = Anchor::node(expr);
        match attribute_category(name) {
            AttributeCategory::Always => {}
            AttributeCategory::StaticOnly => {
                if !denotes_type {
                    self.violation(
                        at,
                        ViolationKind::StaticAttributePrefix {
                            attribute: name.to_string(),
                        },
                    );
                }
            }
            AttributeCategory::Warn => self.warning(
                at,
                WarningKind::ImpreciseAttribute {
                    name: name.to_string(),
                },
            ),
            AttributeCategory::Unsupported => self.unsupported(
                at,
                UnsupportedFeature::Attribute {
                    name: name.to_string(),
                },
            ),
        }
        Ok(())
    }

    /// Conversions between array types must not change the representation
    /// of the index values.
    fn check_array_conversion(&self, expr: &Node, target: &EntityId, operand: &Node) -> Result<()> {
        let Some(source) = &operand.ty else {
            return Ok(());
        };
        if !self.is_array_type(target)? || !self.is_array_type(source)? {
            return Ok(());
        }
        let target_indices = self.array_indices(target)?;
        let source_indices = self.array_indices(source)?;
        for (target_index, source_index) in target_indices.iter().zip(source_indices) {
            let target_repr = self.index_representation(target_index)?;
            let source_repr = self.index_representation(source_index)?;
            if target_repr != source_repr {
                self.violation(Anchor::node(expr), ViolationKind::ArrayConversionIndex);
                break;
            }
        }
        Ok(())
    }

    fn check_binary(&self, expr: &Node, op: BinaryOp, left: &Node, right: &Node) -> Result<()> {
        match op {
            BinaryOp::Multiply | BinaryOp::Divide => {
                self.check_fixed_point_operation(expr, op, left, right)
            }
            _ if op.is_equality() => self.check_access_equality(expr, left, right),
            _ => Ok(()),
        }
    }

    /// Access values may only be compared with `null`.
    fn check_access_equality(&self, expr: &Node, left: &Node, right: &Node) -> Result<()> {
        let is_null = |node: &Node| matches!(node.kind, NodeKind::NullLiteral {});
        if is_null(left) || is_null(right) {
            return Ok(());
        }
        let Some(ty) = left.ty.as_ref().or(right.ty.as_ref()) else {
            return Ok(());
        };
        if self.is_object_access(ty)? {
            self.violation(Anchor::node(expr), ViolationKind::AccessEquality);
        }
        Ok(())
    }
}
