// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostics::{Anchor, UnsupportedFeature, ViolationKind};
use crate::error::Result;
use crate::marking::state::MarkingState;
use crate::program::{AccessKind, Entity, EntityKind, ParameterMode, SubprogramInfo};

use super::Marker;

impl<'a> Marker<'a> {
    pub(crate) fn mark_subprogram(
        &self,
        state: &mut MarkingState,
        entity: &'a Entity,
        info: &'a SubprogramInfo,
    ) -> Result<()> {
        let at = self.entity_anchor(entity);

        if info.is_function() && !info.volatile_function {
            self.check_function_effects(entity, info)?;
        }

        if let Some(scope) = &entity.scope {
            if self.is_concurrent_type(scope)? {
                self.require(state, scope, &at)?;
            }
        }

        for param in &info.params {
            self.require(state, param, &at)?;
        }
        let result_ok = match &info.result {
            Some(result) => self.require(state, result, &at)?,
            None => false,
        };

        if info.is_function() && !info.volatile_function {
            self.check_function_profile(state, entity, info)?;
        }
        if result_ok {
            self.check_access_result(entity, info)?;
        }

        if info.dispatching {
            if let Some(pre) = &info.pre {
                self.violation(
                    Anchor::node(pre),
                    ViolationKind::SpecificPreconditionOnDispatching,
                );
            }
            if info.overridden.len() > 1 {
                self.unsupported(at.clone(), UnsupportedFeature::MultipleInheritance);
            }
        }
        for overridden in &info.overridden {
            self.require(state, overridden, &at)?;
        }

        for contract in [&info.pre, &info.post, &info.class_wide_pre, &info.class_wide_post]
            .into_iter()
            .flatten()
        {
            self.mark_expr(state, contract)?;
        }
        for case in &info.contract_cases {
            if let Some(guard) = &case.guard {
                self.mark_expr(state, guard)?;
            }
            self.mark_expr(state, &case.consequence)?;
        }
        Ok(())
    }

    /// Functions of the subset have no side effects: writes to global state
    /// are attributed to the global-effects facet.
    fn check_function_effects(&self, entity: &Entity, info: &SubprogramInfo) -> Result<()> {
        let facet = Anchor::GlobalEffects {
            subprogram: entity.name.clone(),
            loc: if info.effects.loc.is_known() {
                info.effects.loc
            } else {
                entity.loc
            },
        };
        if !info.effects.writes.is_empty() {
            self.violation(facet.clone(), ViolationKind::FunctionWithSideEffects);
        }
        for read in &info.effects.reads {
            let volatile = match &self.program.entity(read)?.kind {
                EntityKind::Object(object) => {
                    object.volatile || self.is_volatile_type(&object.ty)?
                }
                _ => false,
            };
            if volatile {
                self.violation(
                    facet.clone(),
                    ViolationKind::VolatileInFunction {
                        entity: read.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    fn check_function_profile(
        &self,
        state: &MarkingState,
        entity: &Entity,
        info: &SubprogramInfo,
    ) -> Result<()> {
        for param in &info.params {
            let param_entity = self.program.entity(param)?;
            let EntityKind::Parameter(param_info) = &param_entity.kind else {
                continue;
            };
            let at = self.entity_anchor(param_entity);
            if param_info.mode != ParameterMode::In {
                self.violation(
                    at.clone(),
                    ViolationKind::FunctionWithOutParameter {
                        parameter: param.clone(),
                    },
                );
            }
            if state.in_subset.contains(&param_info.ty) && self.is_volatile_type(&param_info.ty)? {
                self.violation(
                    at,
                    ViolationKind::VolatileInFunction {
                        entity: param.clone(),
                    },
                );
            }
        }
        if let Some(result) = &info.result {
            if state.in_subset.contains(result) && self.is_volatile_type(result)? {
                self.violation(
                    self.entity_anchor(entity),
                    ViolationKind::VolatileInFunction {
                        entity: result.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Anonymous access results are reserved to traversal functions; a
    /// borrowing traversal needs an access-to-variable first parameter.
    fn check_access_result(&self, entity: &Entity, info: &SubprogramInfo) -> Result<()> {
        let Some(result) = &info.result else {
            return Ok(());
        };
        let Some(result_view) = self.access_view(result)? else {
            return Ok(());
        };
        if !result_view.anonymous || result_view.kind == AccessKind::Subprogram {
            return Ok(());
        }

        let at = self.entity_anchor(entity);
        if !self.is_traversal_function(info)? {
            self.violation(at, ViolationKind::AnonymousAccessResult);
            return Ok(());
        }
        if result_view.kind == AccessKind::Variable {
            let first_kind = match self.first_parameter_type(info)? {
                Some(first) => self.access_view(first)?.map(|view| view.kind),
                None => None,
            };
            if first_kind != Some(AccessKind::Variable) {
                self.violation(at, ViolationKind::TraversalFirstParameter);
            }
        }
        Ok(())
    }
}
