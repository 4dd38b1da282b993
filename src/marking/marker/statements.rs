// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::{format, string::ToString};

use crate::diagnostics::{Anchor, UnsupportedFeature, ViolationKind, WarningKind};
use crate::error::{MarkingError, Result};
use crate::marking::pragmas::{classify_pragma, PragmaClass};
use crate::marking::scope::ScopeGuard;
use crate::marking::state::MarkingState;
use crate::program::{AccessKind, LoopScheme, Node, NodeKind, PragmaArgument};

use super::Marker;

impl<'a> Marker<'a> {
    /// Mark a declaration, a body or a statement.
    pub(crate) fn mark_node(&self, state: &mut MarkingState, node: &Node) -> Result<()> {
        let at = Anchor::node(node);
        match &node.kind {
            NodeKind::ObjectDeclaration { entity } => {
                let loop_node = self.scope.borrow().loop_node;
                if let Some(loop_node) = loop_node {
                    state.loop_entities.insert(entity.clone(), loop_node);
                }
                self.require_declared(state, entity, &at)?;
            }
            NodeKind::TypeDeclaration { entity }
            | NodeKind::SubprogramDeclaration { entity }
            | NodeKind::NumberDeclaration { entity }
            | NodeKind::ExceptionDeclaration { entity }
            | NodeKind::PackageDeclaration { entity, .. } => {
                self.require_declared(state, entity, &at)?;
            }
            NodeKind::SubprogramBody {
                entity,
                mode,
                declarations,
                statements,
            }
            | NodeKind::PackageBody {
                entity,
                mode,
                declarations,
                statements,
            }
            | NodeKind::TaskBody {
                entity,
                mode,
                declarations,
                statements,
            } => {
                self.mark_body(state, entity, *mode, |marker, state| {
                    for item in declarations.iter().chain(statements) {
                        marker.mark_node(state, item)?;
                    }
                    Ok(())
                })?;
            }
            NodeKind::ProtectedBody {
                entity,
                mode,
                bodies,
            } => {
                self.mark_body(state, entity, *mode, |marker, state| {
                    for body in bodies {
                        marker.mark_node(state, body)?;
                    }
                    Ok(())
                })?;
            }

            NodeKind::Assignment { target, value } => {
                self.mark_expr(state, target)?;
                self.mark_expr(state, value)?;
                if let Some(ty) = &target.ty {
                    if state.in_subset.contains(ty) {
                        self.check_initialization(ty, value, false)?;
                    }
                }
            }
            NodeKind::ProcedureCall { callee, args } => {
                self.mark_call(state, node, callee, args)?;
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.mark_expr(state, value)?;
                    self.check_return(state, value)?;
                }
            }
            NodeKind::If {
                branches,
                else_body,
            } => {
                for branch in branches {
                    self.mark_expr(state, &branch.condition)?;
                    for statement in &branch.body {
                        self.mark_node(state, statement)?;
                    }
                }
                for statement in else_body {
                    self.mark_node(state, statement)?;
                }
            }
            NodeKind::Case {
                selector,
                alternatives,
            } => {
                self.mark_expr(state, selector)?;
                for alternative in alternatives {
                    for choice in &alternative.choices {
                        self.mark_expr(state, choice)?;
                    }
                    for statement in &alternative.body {
                        self.mark_node(state, statement)?;
                    }
                }
            }
            NodeKind::Loop { scheme, body } => {
                let _guard = ScopeGuard::enter_loop(&self.scope, node.id);
                match scheme {
                    Some(LoopScheme::While { condition }) => self.mark_expr(state, condition)?,
                    Some(LoopScheme::For {
                        parameter, domain, ..
                    }) => {
                        state.loop_entities.insert(parameter.clone(), node.id);
                        self.mark_expr(state, domain)?;
                        self.require_declared(state, parameter, &at)?;
                    }
                    None => {}
                }
                for statement in body {
                    self.mark_node(state, statement)?;
                }
            }
            NodeKind::Block {
                declarations,
                statements,
            } => {
                for item in declarations.iter().chain(statements) {
                    self.mark_node(state, item)?;
                }
            }
            NodeKind::Exit { condition } => {
                if let Some(condition) = condition {
                    self.mark_expr(state, condition)?;
                }
            }
            NodeKind::Raise { exception } => {
                if let Some(exception) = exception {
                    self.require(state, exception, &at)?;
                }
            }
            NodeKind::Delay { value } => self.mark_expr(state, value)?,
            NodeKind::Goto { .. } => self.violation(at, ViolationKind::GotoStatement),
            NodeKind::Abort {} => self.violation(at, ViolationKind::AbortStatement),
            NodeKind::CodeStatement {} => self.violation(at, ViolationKind::CodeStatement),
            NodeKind::NullStatement {} | NodeKind::UseClause {} => {}
            NodeKind::Pragma { name, args } => self.mark_pragma(state, node, name, args)?,

            NodeKind::CompilationUnit { .. } | NodeKind::WithClause { .. } => {
                return Err(MarkingError::invariant(format!(
                    "node {} can only appear at the top of a unit",
                    node.id
                )))
            }
            _ => {
                return Err(MarkingError::invariant(format!(
                    "expression node {} used as a statement",
                    node.id
                )))
            }
        }
        Ok(())
    }

    /// Ownership rules for the value returned by the current subprogram.
    fn check_return(&self, state: &MarkingState, value: &Node) -> Result<()> {
        let subprogram = self.scope.borrow().subprogram.clone();
        let Some(subprogram) = subprogram else {
            return Ok(());
        };
        let info = self.program.subprogram_info(&subprogram)?;
        let Some(result) = &info.result else {
            return Ok(());
        };
        if !state.in_subset.contains(result) {
            return Ok(());
        }

        if self.is_traversal_function(info)? {
            if matches!(value.kind, NodeKind::NullLiteral {}) {
                return Ok(());
            }
            if !self.is_rooted_at(value, info.params.first())? {
                self.violation(Anchor::node(value), ViolationKind::TraversalReturn);
                return Ok(());
            }
            let is_observe = self
                .access_view(result)?
                .is_some_and(|view| view.kind == AccessKind::Constant);
            self.check_source_of_borrow_or_observe(value, is_observe)?;
        } else if self.is_deep(result)? {
            self.check_source_of_move(value, false)?;
        }
        Ok(())
    }

    pub(crate) fn mark_pragma(
        &self,
        state: &mut MarkingState,
        node: &Node,
        name: &str,
        args: &[PragmaArgument],
    ) -> Result<()> {
        let at = Anchor::node(node);
        match classify_pragma(name) {
            PragmaClass::Assertion => {
                for arg in args {
                    // Check names and messages are not expressions.
                    if matches!(
                        arg.value.kind,
                        NodeKind::Name { .. } | NodeKind::StringLiteral { .. }
                    ) {
                        continue;
                    }
                    self.mark_expr(state, &arg.value)?;
                }
            }
            PragmaClass::Mode | PragmaClass::NoEffect => {}
            PragmaClass::Unsupported => self.unsupported(
                at,
                UnsupportedFeature::Pragma {
                    name: name.to_string(),
                },
            ),
            PragmaClass::Unknown => {
                if self.options.reject_unknown_pragmas {
                    self.violation(
                        at,
                        ViolationKind::UnknownPragma {
                            name: name.to_string(),
                        },
                    );
                } else {
                    self.warning(
                        at,
                        WarningKind::UnknownPragma {
                            name: name.to_string(),
                        },
                    );
                }
            }
        }
        Ok(())
    }
}
