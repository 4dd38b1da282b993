// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cell::RefCell;

use crate::diagnostics::Anchor;
use crate::program::{EntityId, NodeId, SubsetMode};

use super::state::Frame;

/// Ambient context of the frame being marked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ScopeContext {
    pub violated: bool,
    /// First violation site of the frame, or the root cause inherited from
    /// the excluded entity that made it fail.
    pub root_cause: Option<Anchor>,
    /// Effective mode; `None` is auto.
    pub mode: Option<SubsetMode>,
    /// Entity carrying the explicit mode annotation in effect.
    pub mode_anchor: Option<EntityId>,
    /// Reported as the root cause of every violation of the frame.
    pub attribution: Option<Anchor>,
    pub frame: Option<Frame>,
    /// Subprogram whose body is being marked.
    pub subprogram: Option<EntityId>,
    pub loop_node: Option<NodeId>,
}

impl ScopeContext {
    pub fn for_frame(frame: Frame, mode: Option<SubsetMode>, mode_anchor: Option<EntityId>) -> Self {
        ScopeContext {
            mode,
            mode_anchor,
            frame: Some(frame),
            ..Default::default()
        }
    }

    pub fn reports(&self) -> bool {
        self.mode == Some(SubsetMode::On)
    }
}

enum Saved {
    Context(ScopeContext),
    Loop(Option<NodeId>),
}

/// Restores the saved part of the context when dropped, on every exit path.
pub(crate) struct ScopeGuard<'a> {
    cell: &'a RefCell<ScopeContext>,
    saved: Option<Saved>,
}

impl<'a> ScopeGuard<'a> {
    /// Replace the whole context.
    pub fn enter(cell: &'a RefCell<ScopeContext>, next: ScopeContext) -> Self {
        let saved = cell.replace(next);
        ScopeGuard {
            cell,
            saved: Some(Saved::Context(saved)),
        }
    }

    /// Start from an empty context.
    pub fn reset(cell: &'a RefCell<ScopeContext>) -> Self {
        Self::enter(cell, ScopeContext::default())
    }

    /// Only the enclosing loop changes; violations keep flowing to the
    /// current frame.
    pub fn enter_loop(cell: &'a RefCell<ScopeContext>, loop_node: NodeId) -> Self {
        let saved = cell.borrow_mut().loop_node.replace(loop_node);
        ScopeGuard {
            cell,
            saved: Some(Saved::Loop(saved)),
        }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        match self.saved.take() {
            Some(Saved::Context(context)) => {
                self.cell.replace(context);
            }
            Some(Saved::Loop(loop_node)) => {
                self.cell.borrow_mut().loop_node = loop_node;
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_restore_on_drop() {
        let cell = RefCell::new(ScopeContext::default());
        cell.borrow_mut().violated = true;
        {
            let _frame = ScopeGuard::enter(
                &cell,
                ScopeContext::for_frame(
                    Frame::Entity(EntityId::new("T")),
                    Some(SubsetMode::On),
                    None,
                ),
            );
            assert!(!cell.borrow().violated);
            assert!(cell.borrow().reports());
            {
                let _loop = ScopeGuard::enter_loop(&cell, NodeId(4));
                cell.borrow_mut().violated = true;
            }
            // The loop guard keeps the violation of its frame.
            assert!(cell.borrow().violated);
            assert_eq!(cell.borrow().loop_node, None);
        }
        assert!(cell.borrow().violated);
        assert_eq!(cell.borrow().frame, None);
    }

    #[test]
    fn guards_restore_on_early_return() {
        fn fails(cell: &RefCell<ScopeContext>) -> Result<(), ()> {
            let _guard = ScopeGuard::reset(cell);
            cell.borrow_mut().violated = true;
            Err(())
        }

        let cell = RefCell::new(ScopeContext::default());
        assert!(fails(&cell).is_err());
        assert!(!cell.borrow().violated);
    }
}
