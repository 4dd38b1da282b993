// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostics::{Anchor, ViolationKind};
use crate::error::Result;
use crate::marking::state::MarkingState;
use crate::program::{AccessKind, ComponentInfo, Entity, EntityId, Node, ObjectInfo, ParameterInfo};

use super::Marker;

impl<'a> Marker<'a> {
    pub(crate) fn mark_object(
        &self,
        state: &mut MarkingState,
        entity: &'a Entity,
        info: &'a ObjectInfo,
    ) -> Result<()> {
        let at = self.entity_anchor(entity);
        let type_ok = self.require(state, &info.ty, &at)?;

        if let Some(init) = &info.init {
            self.mark_expr(state, init)?;
            if type_ok {
                self.check_initialization(&info.ty, init, info.constant)?;
            }
        }

        let volatile = info.volatile || (type_ok && self.is_volatile_type(&info.ty)?);
        if volatile && !self.program.is_library_level(&entity.name)? {
            self.violation(at, ViolationKind::VolatileNotLibraryLevel);
        }

        if info.relaxed_init && type_ok {
            self.record_relaxed_init(state, &info.ty, true)?;
        }
        Ok(())
    }

    pub(crate) fn mark_parameter(
        &self,
        state: &mut MarkingState,
        entity: &'a Entity,
        info: &'a ParameterInfo,
    ) -> Result<()> {
        let at = self.entity_anchor(entity);
        let type_ok = self.require(state, &info.ty, &at)?;
        if let Some(default) = &info.default {
            self.mark_expr(state, default)?;
        }
        if info.relaxed_init && type_ok {
            self.record_relaxed_init(state, &info.ty, true)?;
        }
        Ok(())
    }

    /// Record components and discriminants.
    pub(crate) fn mark_component(
        &self,
        state: &mut MarkingState,
        entity: &'a Entity,
        info: &'a ComponentInfo,
    ) -> Result<()> {
        let at = self.entity_anchor(entity);
        let type_ok = self.require(state, &info.ty, &at)?;
        if type_ok && self.is_anonymous_access(&info.ty)? {
            self.violation(at.clone(), ViolationKind::AnonymousAccessComponent);
        }

        if let Some(default) = &info.default {
            self.mark_expr(state, default)?;
            // Each object gets its own copy of the default.
            if type_ok && self.is_deep(&info.ty)? && self.is_name(default)? {
                self.violation(Anchor::node(default), ViolationKind::DuplicatedOwningValue);
            }
        }

        if info.relaxed_init && type_ok {
            self.record_relaxed_init(state, &info.ty, true)?;
        }
        Ok(())
    }

    /// Ownership rules for a value stored into an object of type `ty`.
    pub(crate) fn check_initialization(
        &self,
        ty: &EntityId,
        value: &Node,
        to_constant: bool,
    ) -> Result<()> {
        if !self.is_deep(ty)? && !self.is_anonymous_access(ty)? {
            return Ok(());
        }
        match self.access_view(ty)? {
            Some(view) if view.anonymous && view.kind != AccessKind::Subprogram => {
                let is_observe = view.kind == AccessKind::Constant;
                self.check_source_of_borrow_or_observe(value, is_observe)?;
                self.check_compatible_access_types(ty, value)?;
            }
            _ => {
                self.check_source_of_move(value, to_constant)?;
            }
        }
        Ok(())
    }
}
