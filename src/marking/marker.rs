// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The recursive marker.
//!
//! `Marker` takes `&self` everywhere and keeps its scoped context in a
//! `RefCell`, while the run state is threaded through as
//! `&mut MarkingState`. Rules for the different kinds of entities and nodes
//! live in the submodules, each extending `Marker` with its own `impl`
//! block.

use alloc::{collections::BTreeMap, format, vec::Vec};
use core::cell::RefCell;

use log::{debug, info, trace};

use crate::diagnostics::{
    Anchor, DiagnosticSink, UnsupportedFeature, ViolationKind, WarningKind,
};
use crate::error::{MarkingError, Result};
use crate::program::{
    Entity, EntityId, EntityKind, Node, NodeKind, Program, SubsetMode, TypeDef, TypeInfo,
};

use super::options::MarkingOptions;
use super::queues::Deferred;
use super::scope::{ScopeContext, ScopeGuard};
use super::state::{Frame, MarkingState};

mod expressions;
mod fixed_point;
mod objects;
mod ownership;
mod packages;
mod queries;
mod statements;
mod subprograms;
mod types;

pub use ownership::PathRoot;

pub struct Marker<'a> {
    program: &'a Program,
    options: &'a MarkingOptions,
    sink: RefCell<&'a mut dyn DiagnosticSink>,
    scope: RefCell<ScopeContext>,
    /// Package entity to its declaration node.
    package_declarations: BTreeMap<EntityId, &'a Node>,
    /// Full view to partial view, over the whole program.
    partial_of: BTreeMap<EntityId, EntityId>,
}

impl<'a> Marker<'a> {
    pub fn new(
        program: &'a Program,
        options: &'a MarkingOptions,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        let mut package_declarations = BTreeMap::new();
        for unit in program.units() {
            packages::collect_package_declarations(unit, &mut package_declarations);
        }

        let partial_of = program
            .entities()
            .filter_map(|entity| match &entity.kind {
                EntityKind::Type(TypeInfo {
                    def:
                        TypeDef::Private {
                            full_view: Some(full),
                            ..
                        },
                    ..
                }) => Some((full.clone(), entity.name.clone())),
                _ => None,
            })
            .collect();

        Marker {
            program,
            options,
            sink: RefCell::new(sink),
            scope: RefCell::new(ScopeContext::default()),
            package_declarations,
            partial_of,
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    /// Mark every compilation unit, draining the deferred queues after each
    /// one.
    pub fn mark_program(&self, state: &mut MarkingState) -> Result<()> {
        for unit in self.program.units() {
            self.mark_unit(state, unit)?;
            self.drain(state)?;
        }
        state.ordered.finish();

        info!(
            "marked {} entities: {} in subset, {} bodies in subset",
            state.visited.len(),
            state.in_subset.len(),
            state.body_in_subset.len()
        );
        Ok(())
    }

    pub fn mark_unit(&self, state: &mut MarkingState, unit: &Node) -> Result<()> {
        match &unit.kind {
            NodeKind::CompilationUnit { context, unit } => {
                for item in context {
                    self.mark_context_item(state, item)?;
                }
                self.mark_node(state, unit)
            }
            _ => self.mark_node(state, unit),
        }
    }

    /// Context items are marked in a fresh context: whatever they find never
    /// reaches the importing unit.
    fn mark_context_item(&self, state: &mut MarkingState, item: &Node) -> Result<()> {
        let _guard = ScopeGuard::reset(&self.scope);
        match &item.kind {
            NodeKind::WithClause { unit } => self.mark_entity(state, unit),
            NodeKind::UseClause {} => Ok(()),
            NodeKind::Pragma { name, args } => self.mark_pragma(state, item, name, args),
            _ => Err(MarkingError::invariant(format!(
                "node {} is not a context item",
                item.id
            ))),
        }
    }

    /// Decide whether `id` is in the subset. Marking an entity twice is a
    /// no-op.
    pub fn mark_entity(&self, state: &mut MarkingState, id: &EntityId) -> Result<()> {
        if state.visited.contains(id) {
            return Ok(());
        }
        let entity = self.program.entity(id)?;
        state.visited.insert(id.clone());

        let (mode, mode_anchor) = self.entity_mode(id)?;
        let frame = Frame::Entity(id.clone());
        let _guard = ScopeGuard::enter(
            &self.scope,
            ScopeContext::for_frame(frame.clone(), mode, mode_anchor),
        );

        if mode == Some(SubsetMode::Off) {
            debug!("{id}: mode off, not analyzed");
            return Ok(());
        }
        if mode == Some(SubsetMode::On) {
            state.reporting_frames.insert(frame);
        }

        // Provisional membership lets recursive declarations see each other.
        state.in_subset.insert(id.clone());

        match &entity.kind {
            EntityKind::Type(info) => self.mark_type(state, entity, info)?,
            EntityKind::Object(info) => self.mark_object(state, entity, info)?,
            EntityKind::Parameter(info) => self.mark_parameter(state, entity, info)?,
            EntityKind::Component(info) | EntityKind::Discriminant(info) => {
                self.mark_component(state, entity, info)?
            }
            EntityKind::Subprogram(info) => self.mark_subprogram(state, entity, info)?,
            EntityKind::Package(info) => self.mark_package(state, entity, info)?,
            EntityKind::Number { value } => {
                if let Some(value) = value {
                    self.mark_expr(state, value)?;
                }
            }
            EntityKind::AbstractState {} | EntityKind::Exception {} => {}
        }

        if self.is_violated() || !state.in_subset.contains(id) {
            self.reject(state, entity);
        } else {
            self.accept(state, entity)?;
        }
        Ok(())
    }

    fn accept(&self, state: &mut MarkingState, entity: &Entity) -> Result<()> {
        let id = &entity.name;
        let published = !matches!(
            entity.kind,
            EntityKind::AbstractState {}
                | EntityKind::Parameter(_)
                | EntityKind::Component(_)
                | EntityKind::Discriminant(_)
        );
        if published {
            let prerequisite = self.prerequisite(entity)?;
            state.ordered.publish(id, prerequisite.as_ref());
        }

        match &entity.kind {
            EntityKind::Type(info) => {
                if let Some(predicate) = &info.predicate_function {
                    self.require(state, predicate, &self.entity_anchor(entity))?;
                    if self.is_violated() {
                        self.reject(state, entity);
                        return Ok(());
                    }
                }
                if info.is_tagged() {
                    for primitive in &info.primitives {
                        self.defer_entity(state, primitive);
                    }
                }
                match &info.def {
                    TypeDef::Task { entries, .. } => {
                        for entry in entries {
                            self.defer_entity(state, entry);
                        }
                    }
                    TypeDef::Protected { operations, .. } => {
                        for operation in operations {
                            self.defer_entity(state, operation);
                        }
                    }
                    _ => {}
                }
            }
            EntityKind::Subprogram(info) => {
                for companion in &info.companions {
                    self.defer_entity(state, companion);
                }
            }
            _ => {}
        }

        debug!("{id}: in subset");
        Ok(())
    }

    fn defer_entity(&self, state: &mut MarkingState, id: &EntityId) {
        if state.queues.push_entity(id) {
            trace!("queued {id}");
        }
    }

    /// Entity that must be published before `entity`.
    fn prerequisite(&self, entity: &Entity) -> Result<Option<EntityId>> {
        Ok(match &entity.kind {
            EntityKind::Type(_) => self.partial_of.get(&entity.name).cloned(),
            EntityKind::Subprogram(_) => match &entity.scope {
                Some(scope) if self.is_concurrent_type(scope)? => Some(scope.clone()),
                _ => None,
            },
            _ => None,
        })
    }

    fn reject(&self, state: &mut MarkingState, entity: &Entity) {
        let id = &entity.name;
        let cause = self
            .scope
            .borrow()
            .root_cause
            .clone()
            .unwrap_or_else(|| self.entity_anchor(entity));

        state.in_subset.remove(id);
        state.body_in_subset.remove(id);
        state.ordered.remove(id);
        if let Some(loop_node) = state.loop_entities.get(id) {
            debug!("{id}: not in subset, declared in loop {loop_node}");
        } else {
            debug!("{id}: not in subset");
        }
        state.root_causes.insert(id.clone(), cause.clone());
        self.retract_dependents(state, id, &cause);
    }

    /// Withdraw every frame that consulted `excluded` while it was
    /// provisionally accepted, transitively.
    fn retract_dependents(&self, state: &mut MarkingState, excluded: &EntityId, cause: &Anchor) {
        let mut work = Vec::from([excluded.clone()]);
        while let Some(current) = work.pop() {
            let Some(frames) = state.dependents.remove(&current) else {
                continue;
            };
            for frame in frames {
                if self.retract_frame(state, &frame, &current, cause) {
                    if let Frame::Entity(id) = frame {
                        work.push(id);
                    }
                }
            }
        }
    }

    fn retract_frame(
        &self,
        state: &mut MarkingState,
        frame: &Frame,
        excluded: &EntityId,
        cause: &Anchor,
    ) -> bool {
        let (id, retracted) = match frame {
            Frame::Entity(id) => {
                let retracted = state.in_subset.remove(id);
                if retracted {
                    state.body_in_subset.remove(id);
                    state.ordered.remove(id);
                    state.root_causes.insert(id.clone(), cause.clone());
                }
                (id, retracted)
            }
            Frame::Body(id) => {
                let retracted = state.body_in_subset.remove(id);
                if retracted {
                    state.body_root_causes.insert(id.clone(), cause.clone());
                }
                (id, retracted)
            }
        };
        if !retracted {
            return false;
        }

        debug!("{frame:?}: retracted, depends on {excluded}");
        if state.reporting_frames.contains(frame) {
            let loc = self.program.get(id).map(|e| e.loc).unwrap_or_default();
            self.sink.borrow_mut().report_violation(
                &Anchor::entity(id, loc),
                ViolationKind::DependsOnExcluded {
                    entity: excluded.clone(),
                },
                Some(cause),
            );
        }
        true
    }

    /// Mark `id` and make the current frame depend on its verdict.
    pub(crate) fn require(
        &self,
        state: &mut MarkingState,
        id: &EntityId,
        at: &Anchor,
    ) -> Result<bool> {
        self.mark_entity(state, id)?;
        if state.in_subset.contains(id) {
            let frame = self.scope.borrow().frame.clone();
            if let Some(frame) = frame {
                state.record_dependency(id, &frame);
            }
            Ok(true)
        } else {
            self.violation_from(
                state,
                at.clone(),
                ViolationKind::EntityNotInSubset { entity: id.clone() },
                id,
            );
            Ok(false)
        }
    }

    /// Like [`Marker::require`] for entities declared in the current
    /// region: entities excluded on purpose (mode off) do not count.
    pub(crate) fn require_declared(
        &self,
        state: &mut MarkingState,
        id: &EntityId,
        at: &Anchor,
    ) -> Result<()> {
        self.mark_entity(state, id)?;
        if self.scope.borrow().frame.is_none() {
            return Ok(());
        }
        if state.in_subset.contains(id) || self.entity_mode(id)?.0 != Some(SubsetMode::Off) {
            self.require(state, id, at)?;
        }
        Ok(())
    }

    /// Effective mode of an entity and the entity carrying the annotation.
    pub(crate) fn entity_mode(
        &self,
        id: &EntityId,
    ) -> Result<(Option<SubsetMode>, Option<EntityId>)> {
        let limit = self.program.entity_count();
        let mut current = Some(id.clone());
        let mut depth = 0;
        while let Some(name) = current {
            let entity = self.program.entity(&name)?;
            if let Some(mode) = entity.mode {
                return Ok((Some(mode), Some(name)));
            }
            depth += 1;
            if depth > limit {
                return Err(MarkingError::invariant(format!(
                    "scope chain of `{id}` is cyclic"
                )));
            }
            current = entity.scope.clone();
        }
        Ok((self.options.default_mode, None))
    }

    /// Serve the deferred queues until all of them are empty.
    pub fn drain(&self, state: &mut MarkingState) -> Result<()> {
        while let Some(item) = state.queues.pop() {
            trace!("draining {item:?}");
            match item {
                Deferred::Entity(id) => self.mark_entity(state, &id)?,
                Deferred::TypeAspects { ty, anchor } => {
                    self.mark_type_aspects(state, &ty, anchor.as_ref())?
                }
                Deferred::IncompleteAccess(access) => {
                    self.resolve_incomplete_access(state, &access)?
                }
            }
        }
        Ok(())
    }

    /// Invariant and default initial condition of `ty`. Failures are
    /// recorded but never demote the type.
    fn mark_type_aspects(
        &self,
        state: &mut MarkingState,
        ty: &EntityId,
        anchor: Option<&EntityId>,
    ) -> Result<()> {
        let entity = self.program.entity(ty)?;
        let info = self.program.type_info(ty)?;

        let (mode, attribution) = match anchor {
            Some(anchor) => {
                let loc = self.program.entity(anchor)?.loc;
                (self.entity_mode(anchor)?.0, Anchor::entity(anchor, loc))
            }
            // Without an explicit anchor the violation is reported whatever
            // the mode.
            None => (Some(SubsetMode::On), self.entity_anchor(entity)),
        };
        if mode == Some(SubsetMode::Off) {
            return Ok(());
        }

        let _guard = ScopeGuard::enter(
            &self.scope,
            ScopeContext {
                mode,
                mode_anchor: anchor.cloned(),
                attribution: Some(attribution),
                ..Default::default()
            },
        );
        for expr in [&info.invariant, &info.default_initial_condition]
            .into_iter()
            .flatten()
        {
            self.mark_expr(state, expr)?;
        }

        if self.is_violated() {
            debug!("{ty}: deferred aspects rejected");
            state.rejected_aspects.insert(ty.clone());
        }
        Ok(())
    }

    fn resolve_incomplete_access(&self, state: &mut MarkingState, access: &EntityId) -> Result<()> {
        let designated = match &self.program.type_info(access)?.def {
            TypeDef::Access { designated, .. } => designated,
            _ => {
                return Err(MarkingError::invariant(format!(
                    "`{access}` was queued as an access type"
                )))
            }
        };
        if !state.in_subset.contains(access) {
            return Ok(());
        }

        self.mark_entity(state, designated)?;
        if state.in_subset.contains(designated) {
            trace!("{designated} completed through {access}");
            state
                .incomplete_views
                .insert(designated.clone(), access.clone());
            return Ok(());
        }

        let cause = match state.root_causes.get(designated) {
            Some(cause) => cause.clone(),
            None => {
                let loc = self.program.entity(designated)?.loc;
                Anchor::entity(designated, loc)
            }
        };
        let frame = Frame::Entity(access.clone());
        if self.retract_frame(state, &frame, designated, &cause) {
            self.retract_dependents(state, access, &cause);
        }
        Ok(())
    }

    pub(crate) fn is_violated(&self) -> bool {
        self.scope.borrow().violated
    }

    pub(crate) fn entity_anchor(&self, entity: &Entity) -> Anchor {
        Anchor::entity(&entity.name, entity.loc)
    }

    /// Flag the current frame. Returns whether the frame reports and the
    /// root cause to attach.
    fn flag(&self, at: &Anchor, cause: Option<&Anchor>) -> (bool, Option<Anchor>) {
        let mut scope = self.scope.borrow_mut();
        scope.violated = true;
        if scope.root_cause.is_none() {
            scope.root_cause = Some(cause.unwrap_or(at).clone());
        }
        (
            scope.reports(),
            scope.attribution.clone().or_else(|| cause.cloned()),
        )
    }

    pub(crate) fn violation(&self, at: Anchor, kind: ViolationKind) {
        let (reports, root_cause) = self.flag(&at, None);
        if reports {
            self.sink
                .borrow_mut()
                .report_violation(&at, kind, root_cause.as_ref());
        }
    }

    /// Violation caused by the exclusion of another entity, whose root
    /// cause is inherited.
    pub(crate) fn violation_from(
        &self,
        state: &MarkingState,
        at: Anchor,
        kind: ViolationKind,
        excluded: &EntityId,
    ) {
        let cause = state.root_causes.get(excluded).cloned();
        let (reports, root_cause) = self.flag(&at, cause.as_ref());
        if reports {
            self.sink
                .borrow_mut()
                .report_violation(&at, kind, root_cause.as_ref());
        }
    }

    pub(crate) fn unsupported(&self, at: Anchor, feature: UnsupportedFeature) {
        let (reports, _) = self.flag(&at, None);
        if reports {
            self.sink.borrow_mut().report_unsupported(&at, feature);
        }
    }

    pub(crate) fn warning(&self, at: Anchor, warning: WarningKind) {
        if self.scope.borrow().mode != Some(SubsetMode::Off) {
            self.sink.borrow_mut().report_warning(&at, warning);
        }
    }
}
