//! Operator registry and layout pass driver.

use std::fmt;

use anchorage_core::{LayoutError, LayoutId, TargetId, ValidationError};
use tracing::{debug, debug_span, trace, warn};

use crate::layout::{Layout, LayoutChange};
use crate::tree::LayoutTree;
use crate::validate::{self, LayoutMap};

/// Options for a layout pass.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassOptions {
    /// Skip operators whose inputs have not moved since their last update
    pub only_dirty: bool,
    /// Emit a warning for every operator that fails validation
    pub log_invalid: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            only_dirty: false,
            log_invalid: true,
        }
    }
}

/// Outcome of a layout pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Operators that ran, in execution order
    pub updated: Vec<LayoutId>,
    /// Operators that failed validation
    pub skipped: Vec<(LayoutId, ValidationError)>,
    /// Operators skipped because nothing changed (with `only_dirty`)
    pub clean: Vec<LayoutId>,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let updated: Vec<String> = self.updated.iter().map(ToString::to_string).collect();
        writeln!(f, "updated: [{}]", updated.join(", "))?;
        for (id, reason) in &self.skipped {
            writeln!(f, "skipped {id}: {reason}")?;
        }
        write!(f, "clean: {}", self.clean.len())
    }
}

/// A layout tree together with the operators bound to it.
#[derive(Debug, Default)]
pub struct LayoutScene {
    tree: LayoutTree,
    layouts: LayoutMap,
    next_layout_id: u64,
}

impl LayoutScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    /// Mutable access for geometry and hierarchy edits.
    pub fn tree_mut(&mut self) -> &mut LayoutTree {
        &mut self.tree
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Register an unbound operator.
    pub fn insert(&mut self, layout: impl Layout) -> LayoutId {
        self.insert_boxed(Box::new(layout))
    }

    pub fn insert_boxed(&mut self, layout: Box<dyn Layout>) -> LayoutId {
        let id = LayoutId(self.next_layout_id);
        self.next_layout_id += 1;
        self.layouts.insert(id, layout);
        id
    }

    /// Register an operator and bind it to `target`.
    pub fn add_layout(&mut self, target: TargetId, layout: impl Layout) -> Result<LayoutId, LayoutError> {
        if !self.tree.contains(target) {
            return Err(LayoutError::UnknownTarget(target));
        }
        let id = self.insert(layout);
        self.set_layout_target(id, Some(target))?;
        Ok(id)
    }

    pub fn layout_dyn(&self, id: LayoutId) -> Option<&(dyn Layout + 'static)> {
        self.layouts.get(&id).map(|layout| layout.as_ref())
    }

    pub fn layout_dyn_mut(&mut self, id: LayoutId) -> Option<&mut (dyn Layout + 'static)> {
        match self.layouts.get_mut(&id) {
            Some(layout) => Some(layout.as_mut()),
            None => None,
        }
    }

    /// Typed access to an operator.
    pub fn layout<T: Layout>(&self, id: LayoutId) -> Option<&T> {
        self.layout_dyn(id)?.downcast_ref::<T>()
    }

    pub fn layout_mut<T: Layout>(&mut self, id: LayoutId) -> Option<&mut T> {
        self.layout_dyn_mut(id)?.downcast_mut::<T>()
    }

    /// Bind an operator to a target, or unbind it with `None`.
    ///
    /// Returns `Ok(false)` when the operator is already bound to `target`.
    pub fn set_layout_target(&mut self, id: LayoutId, target: Option<TargetId>) -> Result<bool, LayoutError> {
        if !self.layouts.contains_key(&id) {
            return Err(LayoutError::UnknownLayout(id));
        }
        if let Some(t) = target {
            if !self.tree.contains(t) {
                return Err(LayoutError::UnknownTarget(t));
            }
        }
        Ok(self.retarget(id, target))
    }

    fn retarget(&mut self, id: LayoutId, target: Option<TargetId>) -> bool {
        let Some(layout) = self.layouts.get_mut(&id) else {
            return false;
        };
        let previous = layout.target();
        if previous == target {
            return false;
        }

        if let Some(p) = previous {
            self.tree.detach_layout(p, id);
        }
        if let Some(t) = target {
            // Checked by the caller.
            let _ = self.tree.attach_layout(t, id);
        }

        layout.state_mut().set_target(target);
        layout.on_target_changed(&self.tree, target, previous);
        layout
            .state_mut()
            .mark_changed(LayoutChange::Target { new: target, previous });
        trace!(layout = %id, kind = layout.kind(), ?previous, ?target, "retargeted layout");
        true
    }

    /// Unbind and unregister an operator, handing it back to the caller.
    pub fn remove_layout(&mut self, id: LayoutId) -> Option<Box<dyn Layout>> {
        self.retarget(id, None);
        self.layouts.shift_remove(&id)
    }

    /// Unregister an operator and dispose it.
    ///
    /// The operator is detached from its target's list without touching the
    /// target's geometry, then fires its disposal listeners once.
    pub fn dispose_layout(&mut self, id: LayoutId) -> bool {
        let Some(mut layout) = self.layouts.shift_remove(&id) else {
            return false;
        };
        if let Some(target) = layout.target() {
            self.tree.detach_layout(target, id);
        }
        layout.state_mut().dispose();
        debug!(layout = %id, kind = layout.kind(), "disposed layout");
        true
    }

    /// Dispose a single target; every operator bound to it loses its target.
    pub fn dispose_target(&mut self, id: TargetId) {
        for layout in self.tree.dispose(id) {
            self.retarget(layout, None);
        }
    }

    /// Dispose a target and its whole subtree.
    pub fn remove_target(&mut self, id: TargetId) {
        for layout in self.tree.remove(id) {
            self.retarget(layout, None);
        }
    }

    /// Check the conflict rules for an operator. Unregistered ids have no target.
    pub fn check(&self, id: LayoutId) -> Result<(), ValidationError> {
        validate::check(&self.tree, &self.layouts, id)
    }

    pub fn validate(&self, id: LayoutId) -> bool {
        self.check(id).is_ok()
    }

    pub fn do_changed(&self, id: LayoutId) -> Result<bool, LayoutError> {
        let layout = self.layouts.get(&id).ok_or(LayoutError::UnknownLayout(id))?;
        Ok(layout.do_changed(&self.tree))
    }

    /// Run one operator, regardless of validity.
    pub fn update_layout(&mut self, id: LayoutId) -> Result<(), LayoutError> {
        let layout = self.layouts.get_mut(&id).ok_or(LayoutError::UnknownLayout(id))?;
        layout.update_layout(&mut self.tree);
        Ok(())
    }

    /// Every operator by ascending priority, ties in registration order.
    pub fn ordered_layouts(&self) -> Vec<LayoutId> {
        let mut ids: Vec<LayoutId> = self.layouts.keys().copied().collect();
        ids.sort_by_key(|id| self.layouts[id].priority());
        ids
    }

    /// Validate and update every bound operator once, in priority order.
    pub fn run_pass(&mut self, options: &PassOptions) -> PassReport {
        let _span = debug_span!("layout_pass", layouts = self.layouts.len()).entered();
        let mut report = PassReport::default();

        for id in self.ordered_layouts() {
            let Some(layout) = self.layouts.get(&id) else { continue };
            if layout.target().is_none() {
                continue;
            }
            if let Err(reason) = self.check(id) {
                if options.log_invalid {
                    warn!(layout = %id, kind = layout.kind(), %reason, "skipping invalid layout");
                }
                report.skipped.push((id, reason));
                continue;
            }
            if options.only_dirty && !layout.do_changed(&self.tree) {
                report.clean.push(id);
                continue;
            }
            if let Some(layout) = self.layouts.get_mut(&id) {
                layout.update_layout(&mut self.tree);
                report.updated.push(id);
            }
        }

        debug!(
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            clean = report.clean.len(),
            "layout pass complete"
        );
        report
    }

    /// True when any valid, bound operator still has moved inputs.
    pub fn has_pending_changes(&self) -> bool {
        self.layouts.iter().any(|(id, layout)| {
            layout.target().is_some() && self.validate(*id) && layout.do_changed(&self.tree)
        })
    }

    /// Repeat passes until no valid operator is dirty.
    ///
    /// Needed when an operator sorts before one that resizes its parent.
    pub fn run_until_stable(&mut self, options: &PassOptions, max_passes: usize) -> Result<PassReport, LayoutError> {
        for pass in 0..max_passes {
            let report = self.run_pass(options);
            if !self.has_pending_changes() {
                debug!(passes = pass + 1, "layout settled");
                return Ok(report);
            }
        }
        Err(LayoutError::Unstable { passes: max_passes })
    }
}
