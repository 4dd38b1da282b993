// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]
#![no_std]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

#[cfg(feature = "arc")]
use alloc::sync::Arc as Rc;
#[cfg(not(feature = "arc"))]
use alloc::rc::Rc;

pub mod diagnostics;
mod error;
mod location;
pub mod marking;
pub mod program;

pub use diagnostics::{
    Anchor, Diagnostic, DiagnosticKind, DiagnosticSink, Diagnostics, UnsupportedFeature,
    ViolationKind, WarningKind,
};
pub use error::{MarkingError, Result};
pub use location::Location;
pub use marking::{mark_program, Marker, MarkingOptions, MarkingResult, MarkingState, SubsetMode};
pub use program::{Entity, EntityId, EntityKind, Node, NodeId, NodeKind, Program};

#[cfg(test)]
mod tests;
