//! Error types for the Anchorage layout engine.

use thiserror::Error;

use crate::types::{LayoutId, TargetId};

/// Errors raised by tree and scene operations.
///
/// These signal misuse of the API (unknown ids, cycles). Misconfigured
/// operators are reported through [`ValidationError`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Unknown layout target {0}")]
    UnknownTarget(TargetId),

    #[error("Unknown layout operator {0}")]
    UnknownLayout(LayoutId),

    #[error("Setting parent of {child} to {parent} would create a cycle")]
    HierarchyCycle { child: TargetId, parent: TargetId },

    #[error("Layout did not settle after {passes} passes")]
    Unstable { passes: usize },
}

/// Reasons a layout operator is not allowed to run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Operator has no target")]
    NoTarget,

    #[error("Target {0} has been disposed")]
    TargetDisposed(TargetId),

    #[error("Target {0} has no parent to fit against")]
    MissingParent(TargetId),

    #[error("Operation flags overlap with operator {other} on the same target")]
    Conflict { other: LayoutId },

    #[error("Operation flags overlap with children-scoped operator {other} on the parent")]
    ParentConflict { other: LayoutId },

    #[error("Children-scoped flags overlap with operator {other} on child {child}")]
    ChildConflict { other: LayoutId, child: TargetId },

    #[error("Operator must run after {other} but has a lower priority")]
    OutOfOrder { other: LayoutId },
}
