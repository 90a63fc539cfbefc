//! Layout operators.
//!
//! An operator binds to at most one [`LayoutTarget`](crate::LayoutTarget),
//! declares which geometry it writes through [`OperationTargetFlags`], and
//! tracks whether its inputs moved since its last update.
//!
//! # Dirty tracking
//!
//! Configuration setters raise an explicit dirty bit. Geometry dependencies
//! are tracked by [`Snapshot`]: the values an operator read are recorded when
//! an update completes, and `do_changed` compares them against the live tree. The tracked set is:
//!
//! - the target's identity and whether it is still alive
//! - the target's local size, offset and anchors
//! - the target's parent identity and hierarchy version
//! - the parent's local size
//! - anything the operator adds through [`Layout::track`]

use std::any::Any;
use std::fmt;

use anchorage_core::{approx_eq, vec_approx_eq, TargetId, ValidationError, Vec3};
use bitflags::bitflags;
use smallvec::SmallVec;

use crate::listener::{ListenerId, Listeners};
use crate::tree::LayoutTree;

bitflags! {
    /// Geometry an operator is permitted to write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OperationTargetFlags: u8 {
        /// Local size of the bound target.
        const SELF_LOCAL_SIZE     = 0b0001;
        /// Offset of the bound target.
        const SELF_OFFSET         = 0b0010;
        /// Local size of the bound target's children.
        const CHILDREN_LOCAL_SIZE = 0b0100;
        /// Offset of the bound target's children.
        const CHILDREN_OFFSET     = 0b1000;
    }
}

impl OperationTargetFlags {
    pub const SELF_ALL: Self = Self::SELF_LOCAL_SIZE.union(Self::SELF_OFFSET);
    pub const CHILDREN_ALL: Self = Self::CHILDREN_LOCAL_SIZE.union(Self::CHILDREN_OFFSET);

    pub fn self_scope(self) -> Self {
        self & Self::SELF_ALL
    }

    pub fn children_scope(self) -> Self {
        self & Self::CHILDREN_ALL
    }

    /// The self bits, seen from the parent: `SELF_*` becomes `CHILDREN_*`.
    pub fn as_children(self) -> Self {
        Self::from_bits_truncate(self.self_scope().bits() << 2)
    }

    /// The children bits, seen from a child: `CHILDREN_*` becomes `SELF_*`.
    pub fn as_self(self) -> Self {
        Self::from_bits_truncate(self.children_scope().bits() >> 2)
    }
}

/// What changed on an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutChange {
    Target {
        new: Option<TargetId>,
        previous: Option<TargetId>,
    },
    /// A configuration field, by name
    Config(&'static str),
    Priority,
}

/// Values an operator depended on at the end of its last update.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    target: Option<TargetId>,
    alive: bool,
    local_size: Vec3,
    offset: Vec3,
    anchor_min: Vec3,
    anchor_max: Vec3,
    parent: Option<TargetId>,
    hierarchy_version: u64,
    parent_size: Option<Vec3>,
    extra: SmallVec<[f32; 4]>,
}

impl Snapshot {
    /// Read the tracked values of `target` from the tree.
    pub fn capture(tree: &LayoutTree, target: Option<TargetId>) -> Self {
        let node = target.and_then(|id| tree.get(id));
        let parent = node.and_then(|n| n.parent());
        Self {
            target,
            alive: node.is_some(),
            local_size: node.map(|n| n.local_size()).unwrap_or_default(),
            offset: node.map(|n| n.offset()).unwrap_or_default(),
            anchor_min: node.map(|n| n.anchor_min()).unwrap_or_default(),
            anchor_max: node.map(|n| n.anchor_max()).unwrap_or_default(),
            parent,
            hierarchy_version: node.map(|n| n.hierarchy_version()).unwrap_or_default(),
            parent_size: parent.and_then(|p| tree.get(p)).map(|p| p.local_size()),
            extra: SmallVec::new(),
        }
    }

    /// Equality under the fixed numeric precision.
    pub fn approx_eq(&self, other: &Snapshot) -> bool {
        let parent_size_eq = match (self.parent_size, other.parent_size) {
            (Some(a), Some(b)) => vec_approx_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.target == other.target
            && self.alive == other.alive
            && self.parent == other.parent
            && self.hierarchy_version == other.hierarchy_version
            && parent_size_eq
            && vec_approx_eq(self.local_size, other.local_size)
            && vec_approx_eq(self.offset, other.offset)
            && vec_approx_eq(self.anchor_min, other.anchor_min)
            && vec_approx_eq(self.anchor_max, other.anchor_max)
            && self.extra.len() == other.extra.len()
            && self.extra.iter().zip(&other.extra).all(|(a, b)| approx_eq(*a, *b))
    }
}

/// State shared by every operator kind.
#[derive(Debug)]
pub struct LayoutState {
    target: Option<TargetId>,
    priority: i32,
    dirty: bool,
    committed: Option<Snapshot>,
    on_changed: Listeners<LayoutChange>,
    on_disposed: Listeners<Option<TargetId>>,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl LayoutState {
    /// Unbound state with the given priority. New operators start dirty.
    pub fn new(priority: i32) -> Self {
        Self {
            target: None,
            priority,
            dirty: true,
            committed: None,
            on_changed: Listeners::new(),
            on_disposed: Listeners::new(),
        }
    }

    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Change the execution priority. Does not dirty the operator.
    pub fn set_priority(&mut self, priority: i32) {
        if self.priority != priority {
            self.priority = priority;
            self.on_changed.notify(&LayoutChange::Priority);
        }
    }

    /// Raise the dirty bit and notify listeners.
    pub fn mark_changed(&mut self, change: LayoutChange) {
        self.dirty = true;
        self.on_changed.notify(&change);
    }

    /// Whether the explicit dirty bit is set. Geometry changes are not included.
    pub fn is_marked(&self) -> bool {
        self.dirty
    }

    pub fn on_changed(&mut self, callback: impl FnMut(&LayoutChange) + 'static) -> ListenerId {
        self.on_changed.subscribe(callback)
    }

    /// Subscribe to disposal. The callback receives the target bound at that time.
    pub fn on_disposed(&mut self, callback: impl FnMut(&Option<TargetId>) + 'static) -> ListenerId {
        self.on_disposed.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, listener: ListenerId) -> bool {
        self.on_changed.unsubscribe(listener) || self.on_disposed.unsubscribe(listener)
    }

    pub(crate) fn set_target(&mut self, target: Option<TargetId>) -> Option<TargetId> {
        std::mem::replace(&mut self.target, target)
    }

    pub(crate) fn commit(&mut self, snapshot: Snapshot) {
        self.committed = Some(snapshot);
        self.dirty = false;
    }

    /// Unbind without touching the target, fire disposal once and drop all listeners.
    pub(crate) fn dispose(&mut self) {
        let target = self.target.take();
        self.on_disposed.notify(&target);
        self.on_disposed.clear();
        self.on_changed.clear();
    }
}

/// A layout operator.
///
/// Implementors hold a [`LayoutState`] and expose it through
/// [`state`](Layout::state) / [`state_mut`](Layout::state_mut); the rest of
/// the contract has defaults suited to a plain self-scoped operator.
pub trait Layout: Any + fmt::Debug {
    /// Short name used in logs.
    fn kind(&self) -> &'static str;

    fn state(&self) -> &LayoutState;

    fn state_mut(&mut self) -> &mut LayoutState;

    fn target_flags(&self) -> OperationTargetFlags;

    fn target(&self) -> Option<TargetId> {
        self.state().target()
    }

    fn priority(&self) -> i32 {
        self.state().priority()
    }

    /// Operators returning true must not sort before any other operator on their target.
    fn runs_last(&self) -> bool {
        false
    }

    /// Structural requirements beyond having a live target.
    fn preconditions(&self, _tree: &LayoutTree, _target: TargetId) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Called after the bound target changed, with the tree in its current state.
    fn on_target_changed(&mut self, _tree: &LayoutTree, _new: Option<TargetId>, _previous: Option<TargetId>) {}

    /// Extra dependencies to record in the snapshot.
    fn track(&self, _tree: &LayoutTree, _out: &mut SmallVec<[f32; 4]>) {}

    /// Write geometry. Called through `update_layout`, which also commits the snapshot.
    fn update(&mut self, tree: &mut LayoutTree);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Layout {
    /// Snapshot of everything this operator depends on, read from `tree`.
    pub fn snapshot(&self, tree: &LayoutTree) -> Snapshot {
        let mut snapshot = Snapshot::capture(tree, self.target());
        self.track(tree, &mut snapshot.extra);
        snapshot
    }

    /// True when configuration or any tracked geometry moved since the last update.
    pub fn do_changed(&self, tree: &LayoutTree) -> bool {
        let state = self.state();
        if state.dirty {
            return true;
        }
        match &state.committed {
            Some(committed) => !committed.approx_eq(&self.snapshot(tree)),
            None => true,
        }
    }

    /// Run the operator and commit a fresh snapshot, clearing the dirty state.
    pub fn update_layout(&mut self, tree: &mut LayoutTree) {
        self.update(tree);
        let snapshot = self.snapshot(tree);
        self.state_mut().commit(snapshot);
    }

    pub fn downcast_ref<T: Layout>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Layout>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_scopes() {
        let flags = OperationTargetFlags::SELF_LOCAL_SIZE | OperationTargetFlags::CHILDREN_OFFSET;
        assert_eq!(flags.self_scope(), OperationTargetFlags::SELF_LOCAL_SIZE);
        assert_eq!(flags.children_scope(), OperationTargetFlags::CHILDREN_OFFSET);
        assert_eq!(flags.as_children(), OperationTargetFlags::CHILDREN_LOCAL_SIZE);
        assert_eq!(flags.as_self(), OperationTargetFlags::SELF_OFFSET);
        assert_eq!(OperationTargetFlags::SELF_ALL.as_children(), OperationTargetFlags::CHILDREN_ALL);
    }

    #[test]
    fn test_snapshot_of_missing_target() {
        let tree = LayoutTree::new();
        let unbound = Snapshot::capture(&tree, None);
        let dangling = Snapshot::capture(&tree, Some(TargetId(3)));
        assert!(!unbound.alive);
        assert!(!unbound.approx_eq(&dangling));
        assert!(unbound.approx_eq(&unbound.clone()));
    }

    #[test]
    fn test_snapshot_tracks_parent_size() {
        let mut tree = LayoutTree::new();
        let parent = tree.create();
        let child = tree.create();
        tree.set_parent(child, Some(parent)).unwrap();

        let before = Snapshot::capture(&tree, Some(child));
        tree.set_local_size(parent, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(!before.approx_eq(&Snapshot::capture(&tree, Some(child))));
    }

    #[test]
    fn test_state_priority_does_not_dirty() {
        let mut state = LayoutState::new(0);
        state.commit(Snapshot::capture(&LayoutTree::new(), None));
        state.set_priority(5);
        assert_eq!(state.priority(), 5);
        assert!(!state.is_marked());
        state.mark_changed(LayoutChange::Config("test"));
        assert!(state.is_marked());
    }
}
