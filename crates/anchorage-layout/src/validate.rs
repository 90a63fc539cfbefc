//! Conflict validation for layout operators.
//!
//! Operators may be attached freely; these rules decide whether one is
//! allowed to run. An operator is valid only when:
//!
//! 1. it has a target and that target is alive,
//! 2. its own preconditions hold,
//! 3. no other operator on the same target claims overlapping flags,
//! 4. no operator on the parent claims `CHILDREN_*` bits matching its `SELF_*`
//!    bits, and no operator on a child claims `SELF_*` bits matching its
//!    `CHILDREN_*` bits,
//! 5. if it must run last, no other operator on the target sorts after it.
//!
//! Rule 3 ignores priority entirely, so two overlapping operators can never
//! both validate, whatever their order.

use anchorage_core::{LayoutId, ValidationError};
use indexmap::IndexMap;

use crate::layout::Layout;
use crate::tree::LayoutTree;

/// Registry of operators, as stored by the scene.
pub type LayoutMap = IndexMap<LayoutId, Box<dyn Layout>>;

/// Check every rule for operator `id`, returning the first violation.
pub fn check(tree: &LayoutTree, layouts: &LayoutMap, id: LayoutId) -> Result<(), ValidationError> {
    let layout = layouts.get(&id).ok_or(ValidationError::NoTarget)?;
    let target = layout.target().ok_or(ValidationError::NoTarget)?;
    let node = tree.get(target).ok_or(ValidationError::TargetDisposed(target))?;

    layout.preconditions(tree, target)?;

    let flags = layout.target_flags();
    let siblings = node
        .layouts()
        .iter()
        .filter(|other| **other != id)
        .filter_map(|other| layouts.get(other).map(|op| (*other, op)));
    for (other, op) in siblings.clone() {
        if op.target_flags().intersects(flags) {
            return Err(ValidationError::Conflict { other });
        }
    }

    let as_children = flags.as_children();
    if !as_children.is_empty() {
        if let Some(parent) = node.parent().and_then(|p| tree.get(p)) {
            for other in parent.layouts() {
                let Some(op) = layouts.get(other) else { continue };
                if op.target_flags().intersects(as_children) {
                    return Err(ValidationError::ParentConflict { other: *other });
                }
            }
        }
    }

    let as_self = flags.as_self();
    if !as_self.is_empty() {
        for child in node.children() {
            let Some(child_node) = tree.get(*child) else { continue };
            for other in child_node.layouts() {
                let Some(op) = layouts.get(other) else { continue };
                if op.target_flags().intersects(as_self) {
                    return Err(ValidationError::ChildConflict { other: *other, child: *child });
                }
            }
        }
    }

    if layout.runs_last() {
        for (other, op) in siblings {
            if op.priority() > layout.priority() {
                return Err(ValidationError::OutOfOrder { other });
            }
        }
    }

    Ok(())
}
