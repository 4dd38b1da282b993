// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::string::String;

use crate::program::EntityId;

/// Fatal failures of a marking run.
///
/// These never describe a property of the analyzed program: they signal that
/// the program handed over by the front end breaks its contract (or that the
/// engine reached a state it asserts impossible). The run is aborted and no
/// partial verdict is published.
#[derive(Debug, thiserror::Error)]
pub enum MarkingError {
    /// A node or facet references an entity the program does not declare.
    #[error("reference to undeclared entity `{0}`")]
    UnknownEntity(EntityId),

    /// A shape of node or entity reached a code path it cannot reach by
    /// construction.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// The serialized program or options could not be decoded.
    #[error("failed to load {what}: {message}")]
    Load { what: &'static str, message: String },
}

impl MarkingError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        MarkingError::Invariant(message.into())
    }
}

pub type Result<T> = core::result::Result<T, MarkingError>;
