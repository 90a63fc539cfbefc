//! Layout target tree.
//!
//! Targets live in an arena keyed by [`TargetId`]. Parents and children are
//! stored as ids, so the single-parent invariant is enforced here at the
//! mutation site. Ids are never reused: once a target is disposed its id
//! simply stops resolving.

use std::collections::HashMap;

use anchorage_core::{
    non_negative, vec_approx_eq, LayoutError, LayoutId, LayoutOffset, TargetId, Vec3,
};
use smallvec::SmallVec;
use tracing::debug;

use crate::listener::{ListenerId, Listeners};

/// Which part of a target changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetChange {
    LocalSize,
    Offset,
    Anchor,
    /// The target's own parent link
    Parent,
    /// A child was attached or detached
    Children,
    AutoUpdate,
}

/// Payload of a target change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetChanged {
    pub target: TargetId,
    pub change: TargetChange,
}

/// A node in the layout tree.
#[derive(Debug)]
pub struct LayoutTarget {
    id: TargetId,
    name: Option<String>,
    local_size: Vec3,
    offset: Vec3,
    anchor_min: Vec3,
    anchor_max: Vec3,
    parent: Option<TargetId>,
    children: Vec<TargetId>,
    layouts: SmallVec<[LayoutId; 2]>,
    is_auto_update: bool,
    hierarchy_version: u64,
    on_changed: Listeners<TargetChanged>,
    on_disposed: Listeners<TargetId>,
}

impl LayoutTarget {
    fn new(id: TargetId) -> Self {
        Self {
            id,
            name: None,
            local_size: Vec3::ZERO,
            offset: Vec3::ZERO,
            anchor_min: Vec3::ZERO,
            anchor_max: Vec3::ONE,
            parent: None,
            children: Vec::new(),
            layouts: SmallVec::new(),
            is_auto_update: false,
            hierarchy_version: 0,
            on_changed: Listeners::new(),
            on_disposed: Listeners::new(),
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn local_size(&self) -> Vec3 {
        self.local_size
    }

    /// Translation of the pivot relative to the parent's center.
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn anchor_min(&self) -> Vec3 {
        self.anchor_min
    }

    pub fn anchor_max(&self) -> Vec3 {
        self.anchor_max
    }

    /// Component-wise `anchor_max - anchor_min`.
    pub fn anchor_span(&self) -> Vec3 {
        self.anchor_max - self.anchor_min
    }

    /// Center of the anchor span relative to the parent's center, in parent fractions.
    pub fn anchor_center(&self) -> Vec3 {
        (self.anchor_min + self.anchor_max) * 0.5 - Vec3::splat(0.5)
    }

    pub fn parent(&self) -> Option<TargetId> {
        self.parent
    }

    pub fn children(&self) -> &[TargetId] {
        &self.children
    }

    /// Operators bound to this target, in attachment order.
    pub fn layouts(&self) -> &[LayoutId] {
        &self.layouts
    }

    pub fn is_auto_update(&self) -> bool {
        self.is_auto_update
    }

    /// Bumped whenever the parent link of this target or of any ancestor changes.
    pub fn hierarchy_version(&self) -> u64 {
        self.hierarchy_version
    }
}

/// Arena of layout targets.
#[derive(Debug, Default)]
pub struct LayoutTree {
    nodes: HashMap<TargetId, LayoutTarget>,
    /// Parentless targets, in creation/detach order
    roots: Vec<TargetId>,
    next_id: u64,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a standalone target with default geometry.
    pub fn create(&mut self) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, LayoutTarget::new(id));
        self.roots.push(id);
        id
    }

    /// Create a standalone target with a debug name.
    pub fn create_named(&mut self, name: impl Into<String>) -> TargetId {
        let id = self.create();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = Some(name.into());
        }
        id
    }

    pub fn get(&self, id: TargetId) -> Option<&LayoutTarget> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: TargetId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[TargetId] {
        &self.roots
    }

    pub fn parent(&self, id: TargetId) -> Option<TargetId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: TargetId) -> &[TargetId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Walk from the parent of `id` up to its root.
    pub fn ancestors(&self, id: TargetId) -> impl Iterator<Item = TargetId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// All descendants of `id` in depth-first pre-order, excluding `id`.
    pub fn descendants(&self, id: TargetId) -> Vec<TargetId> {
        let mut out = Vec::new();
        let mut stack: Vec<TargetId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    fn node_mut(&mut self, id: TargetId) -> Result<&mut LayoutTarget, LayoutError> {
        self.nodes.get_mut(&id).ok_or(LayoutError::UnknownTarget(id))
    }

    fn notify(&mut self, id: TargetId, change: TargetChange) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.on_changed.notify(&TargetChanged { target: id, change });
        }
    }

    /// Subscribe to geometry and hierarchy changes of a target.
    pub fn on_changed(
        &mut self,
        id: TargetId,
        callback: impl FnMut(&TargetChanged) + 'static,
    ) -> Result<ListenerId, LayoutError> {
        Ok(self.node_mut(id)?.on_changed.subscribe(callback))
    }

    /// Subscribe to the disposal of a target. Fires at most once.
    pub fn on_disposed(
        &mut self,
        id: TargetId,
        callback: impl FnMut(&TargetId) + 'static,
    ) -> Result<ListenerId, LayoutError> {
        Ok(self.node_mut(id)?.on_disposed.subscribe(callback))
    }

    /// Remove a listener from either list of a target.
    pub fn unsubscribe(&mut self, id: TargetId, listener: ListenerId) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => node.on_changed.unsubscribe(listener) || node.on_disposed.unsubscribe(listener),
            None => false,
        }
    }

    /// Reassign the parent of `id`.
    ///
    /// Returns `Ok(false)` without notifying when `parent` is already the
    /// current parent.
    pub fn set_parent(&mut self, id: TargetId, parent: Option<TargetId>) -> Result<bool, LayoutError> {
        let previous = self.node_mut(id)?.parent;
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(LayoutError::UnknownTarget(p));
            }
            if p == id || self.ancestors(p).any(|ancestor| ancestor == id) {
                return Err(LayoutError::HierarchyCycle { child: id, parent: p });
            }
        }
        if previous == parent {
            return Ok(false);
        }

        self.unlink(id, previous);
        match parent {
            Some(p) => {
                if let Some(node) = self.nodes.get_mut(&p) {
                    node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.node_mut(id)?.parent = parent;
        self.bump_hierarchy(id);

        debug!(target_id = %id, ?previous, ?parent, "reparented layout target");

        self.notify(id, TargetChange::Parent);
        if let Some(p) = previous {
            self.notify(p, TargetChange::Children);
        }
        if let Some(p) = parent {
            self.notify(p, TargetChange::Children);
        }
        Ok(true)
    }

    /// Remove `id` from the child list of `parent`, or from the roots.
    fn unlink(&mut self, id: TargetId, parent: Option<TargetId>) {
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(node) => node.children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }
    }

    fn bump_hierarchy(&mut self, id: TargetId) {
        let mut affected = self.descendants(id);
        affected.push(id);
        for target in affected {
            if let Some(node) = self.nodes.get_mut(&target) {
                node.hierarchy_version += 1;
            }
        }
    }

    /// Set size and offset together, notifying for each field that moved.
    pub fn update_local_size(&mut self, id: TargetId, size: Vec3, offset: Vec3) -> Result<bool, LayoutError> {
        let size_changed = self.set_local_size(id, size)?;
        let offset_changed = self.set_offset(id, offset)?;
        Ok(size_changed || offset_changed)
    }

    pub fn set_local_size(&mut self, id: TargetId, size: Vec3) -> Result<bool, LayoutError> {
        let node = self.node_mut(id)?;
        if vec_approx_eq(node.local_size, size) {
            return Ok(false);
        }
        node.local_size = size;
        self.notify(id, TargetChange::LocalSize);
        Ok(true)
    }

    pub fn set_offset(&mut self, id: TargetId, offset: Vec3) -> Result<bool, LayoutError> {
        let node = self.node_mut(id)?;
        if vec_approx_eq(node.offset, offset) {
            return Ok(false);
        }
        node.offset = offset;
        self.notify(id, TargetChange::Offset);
        Ok(true)
    }

    /// Set the anchors. Components are clamped to `[0, 1]` and ordered so that `min <= max`.
    pub fn set_anchor(&mut self, id: TargetId, min: Vec3, max: Vec3) -> Result<bool, LayoutError> {
        let min = min.clamp(Vec3::ZERO, Vec3::ONE);
        let max = max.clamp(Vec3::ZERO, Vec3::ONE);
        let (min, max) = (min.min(max), max.max(min));

        let node = self.node_mut(id)?;
        if vec_approx_eq(node.anchor_min, min) && vec_approx_eq(node.anchor_max, max) {
            return Ok(false);
        }
        node.anchor_min = min;
        node.anchor_max = max;
        self.notify(id, TargetChange::Anchor);
        Ok(true)
    }

    pub fn set_auto_update(&mut self, id: TargetId, auto_update: bool) -> Result<bool, LayoutError> {
        let node = self.node_mut(id)?;
        if node.is_auto_update == auto_update {
            return Ok(false);
        }
        node.is_auto_update = auto_update;
        self.notify(id, TargetChange::AutoUpdate);
        Ok(true)
    }

    /// Derive size and offset from the anchors and the parent's size.
    ///
    /// Does nothing and returns `Ok(false)` when the target has no parent.
    pub fn follow_parent(&mut self, id: TargetId) -> Result<bool, LayoutError> {
        self.follow_parent_with(id, LayoutOffset::zero())
    }

    /// Like [`follow_parent`](Self::follow_parent), inset by `margin`.
    ///
    /// Ratio margins are resolved against the anchored area.
    pub fn follow_parent_with(&mut self, id: TargetId, margin: LayoutOffset) -> Result<bool, LayoutError> {
        let node = self.get(id).ok_or(LayoutError::UnknownTarget(id))?;
        let Some(parent_size) = node.parent.and_then(|p| self.get(p)).map(|p| p.local_size) else {
            return Ok(false);
        };

        let anchored = parent_size * node.anchor_span();
        let margin = margin.resolve(anchored);
        let mut size = anchored;
        size.x -= margin.horizontal();
        size.y -= margin.vertical();

        let mut offset = parent_size * node.anchor_center();
        let (dx, dy) = margin.centering();
        offset.x += dx;
        offset.y += dy;

        self.update_local_size(id, non_negative(size), offset)
    }

    pub(crate) fn attach_layout(&mut self, id: TargetId, layout: LayoutId) -> Result<(), LayoutError> {
        let node = self.node_mut(id)?;
        if !node.layouts.contains(&layout) {
            node.layouts.push(layout);
        }
        Ok(())
    }

    pub(crate) fn detach_layout(&mut self, id: TargetId, layout: LayoutId) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                let before = node.layouts.len();
                node.layouts.retain(|bound| *bound != layout);
                node.layouts.len() != before
            }
            None => false,
        }
    }

    /// Dispose a single target.
    ///
    /// The target is detached from its parent, its children become roots,
    /// its operator list is cleared and the disposal listeners fire once.
    /// Returns the operators that were bound to it. Unknown ids are ignored.
    pub(crate) fn dispose(&mut self, id: TargetId) -> Vec<LayoutId> {
        if !self.contains(id) {
            return Vec::new();
        }
        // Cannot fail: the node exists and `None` never cycles.
        let _ = self.set_parent(id, None);

        let children = self
            .nodes
            .get_mut(&id)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for child in &children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
            }
            self.roots.push(*child);
            self.bump_hierarchy(*child);
            self.notify(*child, TargetChange::Parent);
        }

        self.roots.retain(|root| *root != id);
        let Some(mut node) = self.nodes.remove(&id) else {
            return Vec::new();
        };
        debug!(target_id = %id, children = children.len(), layouts = node.layouts.len(), "disposed layout target");

        node.on_disposed.notify(&id);
        node.on_disposed.clear();
        node.on_changed.clear();
        node.layouts.into_vec()
    }

    /// Dispose `id` and its whole subtree, deepest targets first.
    pub(crate) fn remove(&mut self, id: TargetId) -> Vec<LayoutId> {
        let mut order = self.descendants(id);
        order.reverse();
        order.push(id);

        let mut layouts = Vec::new();
        for target in order {
            layouts.extend(self.dispose(target));
        }
        layouts
    }
}
