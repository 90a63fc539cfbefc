//! Anchor-following layout.

use std::any::Any;

use anchorage_core::LayoutOffset;
use tracing::trace;

use crate::layout::{Layout, LayoutChange, LayoutState, OperationTargetFlags};
use crate::tree::LayoutTree;

/// Derives its target's size and offset from the anchors and the parent's size.
///
/// Sorts last by default and refuses to validate if any other operator on the
/// same target would run after it.
#[derive(Debug)]
pub struct ParentFollowLayout {
    state: LayoutState,
    margin: LayoutOffset,
}

impl Default for ParentFollowLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl ParentFollowLayout {
    pub const TARGET_FLAGS: OperationTargetFlags = OperationTargetFlags::SELF_ALL;
    pub const DEFAULT_PRIORITY: i32 = i32::MAX;

    pub fn new() -> Self {
        Self {
            state: LayoutState::new(Self::DEFAULT_PRIORITY),
            margin: LayoutOffset::zero(),
        }
    }

    pub fn with_margin(mut self, margin: LayoutOffset) -> Self {
        self.set_margin(margin);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.state.set_priority(priority);
        self
    }

    pub fn margin(&self) -> LayoutOffset {
        self.margin
    }

    pub fn set_margin(&mut self, margin: LayoutOffset) {
        if !self.margin.approx_eq(&margin) {
            self.margin = margin;
            self.state.mark_changed(LayoutChange::Config("margin"));
        }
    }
}

impl Layout for ParentFollowLayout {
    fn kind(&self) -> &'static str {
        "parent_follow"
    }

    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn target_flags(&self) -> OperationTargetFlags {
        Self::TARGET_FLAGS
    }

    fn runs_last(&self) -> bool {
        true
    }

    fn update(&mut self, tree: &mut LayoutTree) {
        let Some(target) = self.state.target() else {
            return;
        };
        match tree.follow_parent_with(target, self.margin) {
            Ok(changed) => trace!(target_id = %target, changed, "followed parent"),
            Err(err) => trace!(target_id = %target, %err, "follow skipped"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Snapshot;
    use anchorage_core::Vec3;

    #[test]
    fn test_defaults() {
        let follow = ParentFollowLayout::default();
        assert_eq!(follow.priority(), i32::MAX);
        assert!(follow.runs_last());
        assert_eq!(follow.target_flags(), OperationTargetFlags::SELF_ALL);
    }

    #[test]
    fn test_margin_change_marks_dirty_once() {
        let mut follow = ParentFollowLayout::new();
        follow.state.commit(Snapshot::capture(&LayoutTree::new(), None));
        follow.set_margin(LayoutOffset::zero());
        assert!(!follow.state.is_marked());
        follow.set_margin(LayoutOffset::pixel(1.0, 0.0, 0.0, 0.0));
        assert!(follow.state.is_marked());
    }

    #[test]
    fn test_update_follows_parent() {
        let mut tree = LayoutTree::new();
        let parent = tree.create();
        let target = tree.create();
        tree.set_local_size(parent, Vec3::new(40.0, 20.0, 0.0)).unwrap();
        tree.set_parent(target, Some(parent)).unwrap();

        let mut follow = ParentFollowLayout::new();
        follow.state.set_target(Some(target));
        follow.update(&mut tree);
        assert_eq!(tree.get(target).unwrap().local_size(), Vec3::new(40.0, 20.0, 0.0));
    }
}
