// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Subset marking.
//!
//! A run visits the compilation units of a [`Program`] in order. Each entity
//! reached, whether declared or referenced, is marked once: it joins the
//! subset provisionally, its declaration is checked against the rules of its
//! kind, and it is either accepted or rejected. A rejection withdraws every
//! frame that relied on the entity while it was provisionally accepted, so
//! the final verdict does not depend on visiting order.
//!
//! Invariants, default initial conditions and the completions of incomplete
//! types designated by access types are processed from deferred queues,
//! drained after every unit.

mod attributes;
mod marker;
mod options;
mod ordering;
mod pragmas;
mod queues;
mod result;
mod scope;
mod state;

pub use attributes::{attribute_category, AttributeCategory};
pub use marker::{Marker, PathRoot};
pub use options::MarkingOptions;
pub use ordering::EntityList;
pub use pragmas::{classify_pragma, PragmaClass};
pub use queues::{Deferred, DeferredQueues};
pub use result::MarkingResult;
pub use state::{Frame, MarkingState};

pub use crate::program::SubsetMode;

use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::program::Program;

/// Mark a whole program, reporting diagnostics to `sink`.
///
/// An `Err` means the program violates the front-end contract; no verdict
/// is produced in that case.
pub fn mark_program(
    program: &Program,
    options: &MarkingOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<MarkingResult> {
    let marker = Marker::new(program, options, sink);
    let mut state = MarkingState::new();
    marker.mark_program(&mut state)?;
    Ok(MarkingResult::from_state(state))
}
