// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use log::trace;
use num_bigint::BigInt;
use num_traits::{One, Pow};

use crate::diagnostics::{Anchor, UnsupportedFeature, ViolationKind};
use crate::error::Result;
use crate::program::{AccessKind, Entity, EntityId, SubsetMode, TypeDef, TypeInfo};

use super::queries::signed_bits;
use super::Marker;
use crate::marking::state::MarkingState;

impl<'a> Marker<'a> {
    pub(crate) fn mark_type(
        &self,
        state: &mut MarkingState,
        entity: &'a Entity,
        info: &'a TypeInfo,
    ) -> Result<()> {
        let id = &entity.name;
        let at = self.entity_anchor(entity);

        match &info.def {
            TypeDef::Signed { low, high } => {
                let bits = signed_bits(low).max(signed_bits(high));
                if bits > u64::from(self.options.max_integer_bits) {
                    self.unsupported(at.clone(), UnsupportedFeature::IntegerRange);
                }
            }
            TypeDef::Modular { modulus } => {
                let ceiling: BigInt = Pow::pow(BigInt::from(2), self.options.max_modulus_bits);
                if *modulus > ceiling || *modulus < BigInt::one() {
                    self.unsupported(at.clone(), UnsupportedFeature::ModulusTooLarge);
                }
            }
            TypeDef::Floating { digits } => {
                if !self.options.supported_float_digits.contains(digits) {
                    self.unsupported(
                        at.clone(),
                        UnsupportedFeature::FloatDigits { digits: *digits },
                    );
                }
            }
            TypeDef::OrdinaryFixed { small } => {
                if !small.is_integer_or_reciprocal() {
                    self.unsupported(at.clone(), UnsupportedFeature::FixedPointSmall);
                }
            }
            TypeDef::DecimalFixed { .. } => {
                self.unsupported(at.clone(), UnsupportedFeature::DecimalFixedPoint);
            }
            TypeDef::Enumeration { .. } => {}
            TypeDef::Array { indices, component } => {
                if indices.len() > self.options.max_array_dimensions {
                    self.unsupported(
                        at.clone(),
                        UnsupportedFeature::ArrayDimensions {
                            dimensions: indices.len(),
                        },
                    );
                }
                for index in indices {
                    self.require(state, index, &at)?;
                }
                if self.require(state, component, &at)? && self.is_anonymous_access(component)? {
                    self.violation(at.clone(), ViolationKind::AnonymousAccessComponent);
                }
            }
            TypeDef::Record {
                discriminants,
                components,
                parent,
                interfaces,
                ..
            } => {
                if let Some(parent) = parent {
                    self.require(state, parent, &at)?;
                }
                for interface in interfaces {
                    self.require(state, interface, &at)?;
                }
                for part in discriminants.iter().chain(components) {
                    self.require(state, part, &at)?;
                }
                if let Some(parent) = parent {
                    self.check_extension_components(parent, components, &at)?;
                }
            }
            TypeDef::Interface { parents } => {
                for parent in parents {
                    self.require(state, parent, &at)?;
                }
            }
            TypeDef::Access {
                designated,
                kind,
                storage_pool,
                storage_size,
                ..
            } => {
                if *storage_pool || *storage_size {
                    self.violation(at.clone(), ViolationKind::AccessStorageClause);
                }
                // Only designated types can be incomplete.
                if *kind != AccessKind::Subprogram
                    && self.is_incomplete(designated)?
                    && !state.visited.contains(designated)
                {
                    if state.queues.push_incomplete_access(id) {
                        trace!("queued incomplete access {id}");
                    }
                } else {
                    self.require(state, designated, &at)?;
                }
            }
            TypeDef::Private {
                full_view,
                discriminants,
                ..
            } => {
                for discriminant in discriminants {
                    self.require(state, discriminant, &at)?;
                }
                if let Some(full) = full_view {
                    if self.entity_mode(full)?.0 == Some(SubsetMode::Off) {
                        state.full_view_hidden.insert(id.clone());
                        self.mark_entity(state, full)?;
                    } else {
                        self.require(state, full, &at)?;
                    }
                }
            }
            TypeDef::Incomplete { full_view } => match full_view {
                Some(full) => {
                    self.require(state, full, &at)?;
                }
                None => self.unsupported(at.clone(), UnsupportedFeature::MissingCompletion),
            },
            TypeDef::Subtype { parent, constraint } | TypeDef::Derived { parent, constraint } => {
                // The parent's verdict bounds this one.
                self.require(state, parent, &at)?;
                for expr in constraint {
                    self.mark_expr(state, expr)?;
                }
            }
            TypeDef::ClassWide { root, constrained } => {
                self.require(state, root, &at)?;
                if *constrained {
                    self.unsupported(at.clone(), UnsupportedFeature::ConstrainedClassWide);
                }
            }
            TypeDef::Task { discriminants, .. } => {
                for discriminant in discriminants {
                    self.require(state, discriminant, &at)?;
                }
            }
            TypeDef::Protected {
                discriminants,
                components,
                ..
            } => {
                for part in discriminants.iter().chain(components) {
                    self.require(state, part, &at)?;
                }
            }
        }

        if info.invariant.is_some() || info.default_initial_condition.is_some() {
            let anchor = self.scope.borrow().mode_anchor.clone();
            if state.queues.push_type_aspects(id, anchor.as_ref()) {
                trace!("queued aspects of {id}");
            }
        }

        if info.relaxed_init {
            if info.invariant.is_some() {
                self.unsupported(at, UnsupportedFeature::RelaxedInitWithInvariant);
            } else {
                self.record_relaxed_init(state, id, true)?;
            }
        }
        Ok(())
    }

    fn is_incomplete(&self, ty: &EntityId) -> Result<bool> {
        Ok(matches!(
            self.program.type_info(ty)?.def,
            TypeDef::Incomplete { .. }
        ))
    }

    /// A type extension may only add owning components to an owning parent.
    fn check_extension_components(
        &self,
        parent: &EntityId,
        components: &[EntityId],
        at: &Anchor,
    ) -> Result<()> {
        if self.is_deep(parent)? {
            return Ok(());
        }
        for component in components {
            if let Some(ty) = self.program.declared_type(component)? {
                if self.is_deep(ty)? {
                    self.violation(
                        at.clone(),
                        ViolationKind::OwningComponentInExtension {
                            component: component.clone(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Record relaxed initialization on `ty`, and as inherited on its parts
    /// and ancestors.
    pub(crate) fn record_relaxed_init(
        &self,
        state: &mut MarkingState,
        ty: &EntityId,
        own: bool,
    ) -> Result<()> {
        let (rep, _) = self.representative(ty)?;
        let mut work = alloc::vec![(rep.clone(), own)];
        while let Some((current, own)) = work.pop() {
            if !state.record_relaxed_init(&current, own) {
                continue;
            }
            let (_, info) = self.representative(&current)?;
            let mut inherit = |part_ty: &EntityId| -> Result<()> {
                let (part_rep, _) = self.representative(part_ty)?;
                work.push((part_rep.clone(), false));
                Ok(())
            };
            match &info.def {
                TypeDef::Array { component, .. } => inherit(component)?,
                TypeDef::Record {
                    discriminants,
                    components,
                    parent,
                    ..
                } => {
                    if let Some(parent) = parent {
                        inherit(parent)?;
                    }
                    for part in discriminants.iter().chain(components) {
                        if let Some(part_ty) = self.program.declared_type(part)? {
                            inherit(part_ty)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
