// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::collections::BTreeMap;

use log::debug;

use crate::diagnostics::Anchor;
use crate::error::Result;
use crate::marking::scope::{ScopeContext, ScopeGuard};
use crate::marking::state::{Frame, MarkingState};
use crate::program::{Entity, EntityId, EntityKind, Node, NodeKind, PackageInfo, SubsetMode};

use super::Marker;

/// Index every package declaration reachable from `node` by its entity.
pub(super) fn collect_package_declarations<'a>(
    node: &'a Node,
    map: &mut BTreeMap<EntityId, &'a Node>,
) {
    match &node.kind {
        NodeKind::CompilationUnit { unit, .. } => collect_package_declarations(unit, map),
        NodeKind::PackageDeclaration {
            entity,
            visible,
            private,
        } => {
            map.insert(entity.clone(), node);
            for item in visible.iter().chain(private) {
                collect_package_declarations(item, map);
            }
        }
        NodeKind::SubprogramBody {
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
        }
        | NodeKind::Block {
            declarations,
            statements,
        } => {
            for item in declarations.iter().chain(statements) {
                collect_package_declarations(item, map);
            }
        }
        NodeKind::ProtectedBody { bodies, .. } => {
            for body in bodies {
                collect_package_declarations(body, map);
            }
        }
        NodeKind::If {
            branches,
            else_body,
        } => {
            for statement in branches.iter().flat_map(|b| &b.body).chain(else_body) {
                collect_package_declarations(statement, map);
            }
        }
        NodeKind::Case { alternatives, .. } => {
            for statement in alternatives.iter().flat_map(|a| &a.body) {
                collect_package_declarations(statement, map);
            }
        }
        NodeKind::Loop { body, .. } => {
            for statement in body {
                collect_package_declarations(statement, map);
            }
        }
        _ => {}
    }
}

impl<'a> Marker<'a> {
    /// A package is in the subset when everything it declares, apart from
    /// what is excluded on purpose, is.
    pub(crate) fn mark_package(
        &self,
        state: &mut MarkingState,
        entity: &'a Entity,
        info: &'a PackageInfo,
    ) -> Result<()> {
        if let Some(NodeKind::PackageDeclaration {
            visible, private, ..
        }) = self.package_declarations.get(&entity.name).map(|n| &n.kind)
        {
            for item in visible.iter().chain(private) {
                self.mark_node(state, item)?;
            }
        }
        if let Some(condition) = &info.initial_condition {
            self.mark_expr(state, condition)?;
        }
        Ok(())
    }

    /// Mark the body of `entity` in a frame of its own. `walk` visits the
    /// contents of the body.
    pub(crate) fn mark_body<F>(
        &self,
        state: &mut MarkingState,
        entity: &EntityId,
        mode: Option<SubsetMode>,
        walk: F,
    ) -> Result<()>
    where
        F: FnOnce(&Self, &mut MarkingState) -> Result<()>,
    {
        let spec = self.program.entity(entity)?;
        self.mark_entity(state, entity)?;
        if !state.in_subset.contains(entity) {
            if let Some(cause) = state.root_causes.get(entity).cloned() {
                state.body_root_causes.insert(entity.clone(), cause);
            }
            debug!("{entity}: body skipped, spec not in subset");
            return Ok(());
        }

        let (mode, mode_anchor) = match mode {
            Some(mode) => (Some(mode), Some(entity.clone())),
            None => self.entity_mode(entity)?,
        };
        if mode == Some(SubsetMode::Off) {
            debug!("{entity}: body mode off, not analyzed");
            return Ok(());
        }

        let frame = Frame::Body(entity.clone());
        let _guard = ScopeGuard::enter(
            &self.scope,
            ScopeContext {
                subprogram: matches!(spec.kind, EntityKind::Subprogram(_))
                    .then(|| entity.clone()),
                ..ScopeContext::for_frame(frame.clone(), mode, mode_anchor)
            },
        );
        if mode == Some(SubsetMode::On) {
            state.reporting_frames.insert(frame);
        }

        walk(self, state)?;

        if !self.is_violated() && state.in_subset.contains(entity) {
            state.body_in_subset.insert(entity.clone());
            debug!("{entity}: body in subset");
        } else {
            let cause = self
                .scope
                .borrow()
                .root_cause
                .clone()
                .unwrap_or_else(|| Anchor::entity(entity, spec.loc));
            state.body_root_causes.insert(entity.clone(), cause);
            debug!("{entity}: body not in subset");
        }
        Ok(())
    }
}
