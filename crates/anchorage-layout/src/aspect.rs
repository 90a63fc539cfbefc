//! Aspect-ratio constrained size fitting.

use std::any::Any;

use anchorage_core::{
    approx_eq, non_negative, LayoutOffset, TargetId, ValidationError, Vec3, NUMBER_PRECISION,
};
use tracing::trace;

use crate::layout::{Layout, LayoutChange, LayoutState, OperationTargetFlags};
use crate::tree::LayoutTree;

/// How the available area is chosen and which axis leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AspectMode {
    /// Fit inside the parent's full size, width leading
    #[default]
    ParentFit,
    /// Fit inside the parent's size scaled by the anchor span, width leading
    AnchorFit,
    /// Like `ParentFit`, but use `fixed_length` as the width when it fits
    FixedWidth,
    /// Height leading, using `fixed_length` as the height when it fits
    FixedHeight,
}

/// Fit a box of the given aspect inside `base`, after removing `padding`.
///
/// `aspect_ratio` is height over width for the width-leading modes and width
/// over height for [`AspectMode::FixedHeight`]. The depth of `current_size`
/// and of `current_offset` are carried through. Returns `(size, offset)`.
pub fn fit(
    base: Vec3,
    current_size: Vec3,
    current_offset: Vec3,
    padding: &LayoutOffset,
    aspect_ratio: f32,
    fixed_length: f32,
    mode: AspectMode,
) -> (Vec3, Vec3) {
    let padding = padding.resolve(base);
    let mut size = base;
    size.x -= padding.horizontal();
    size.y -= padding.vertical();
    let mut size = non_negative(size);

    let (dx, dy) = padding.centering();
    let offset = Vec3::new(dx, dy, current_offset.z);

    let ratio = aspect_ratio.max(NUMBER_PRECISION);
    match mode {
        AspectMode::ParentFit | AspectMode::AnchorFit | AspectMode::FixedWidth => {
            let height = size.x * ratio;
            if size.y < height {
                size.x = size.y / ratio;
            } else {
                size.y = height;
            }
            if mode == AspectMode::FixedWidth && fixed_length <= size.x && fixed_length * ratio <= size.y {
                size.x = fixed_length;
                size.y = fixed_length * ratio;
            }
        }
        AspectMode::FixedHeight => {
            let width = size.y * ratio;
            if size.x < width {
                size.y = size.x / ratio;
            } else {
                size.x = width;
            }
            if fixed_length <= size.y && fixed_length * ratio <= size.x {
                size.x = fixed_length * ratio;
                size.y = fixed_length;
            }
        }
    }

    size.z = current_size.z;
    (non_negative(size), offset)
}

/// Sizes its target to a fixed aspect ratio inside the parent.
#[derive(Debug)]
pub struct AspectSizeFitter {
    state: LayoutState,
    aspect_ratio: f32,
    fixed_length: f32,
    mode: AspectMode,
    padding: LayoutOffset,
}

impl Default for AspectSizeFitter {
    fn default() -> Self {
        Self::new(AspectMode::default())
    }
}

impl AspectSizeFitter {
    pub const TARGET_FLAGS: OperationTargetFlags = OperationTargetFlags::SELF_ALL;

    pub fn new(mode: AspectMode) -> Self {
        Self {
            state: LayoutState::new(0),
            aspect_ratio: 1.0,
            fixed_length: 0.0,
            mode,
            padding: LayoutOffset::zero(),
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.set_aspect_ratio(aspect_ratio);
        self
    }

    pub fn with_fixed_length(mut self, fixed_length: f32) -> Self {
        self.set_fixed_length(fixed_length);
        self
    }

    pub fn with_padding(mut self, padding: LayoutOffset) -> Self {
        self.set_padding(padding);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.state.set_priority(priority);
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn fixed_length(&self) -> f32 {
        self.fixed_length
    }

    pub fn mode(&self) -> AspectMode {
        self.mode
    }

    pub fn padding(&self) -> LayoutOffset {
        self.padding
    }

    /// Values below `NUMBER_PRECISION` are clamped up to it.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        let aspect_ratio = aspect_ratio.max(NUMBER_PRECISION);
        if !approx_eq(self.aspect_ratio, aspect_ratio) {
            self.aspect_ratio = aspect_ratio;
            self.state.mark_changed(LayoutChange::Config("aspect_ratio"));
        }
    }

    /// Negative values are clamped to zero.
    pub fn set_fixed_length(&mut self, fixed_length: f32) {
        let fixed_length = fixed_length.max(0.0);
        if !approx_eq(self.fixed_length, fixed_length) {
            self.fixed_length = fixed_length;
            self.state.mark_changed(LayoutChange::Config("fixed_length"));
        }
    }

    pub fn set_mode(&mut self, mode: AspectMode) {
        if self.mode != mode {
            self.mode = mode;
            self.state.mark_changed(LayoutChange::Config("mode"));
        }
    }

    pub fn set_padding(&mut self, padding: LayoutOffset) {
        if !self.padding.approx_eq(&padding) {
            self.padding = padding;
            self.state.mark_changed(LayoutChange::Config("padding"));
        }
    }

    /// Compute the geometry this fitter would write, without writing it.
    pub fn compute(&self, tree: &LayoutTree) -> Option<(Vec3, Vec3)> {
        let node = tree.get(self.state.target()?)?;
        let Some(parent) = node.parent().and_then(|p| tree.get(p)) else {
            return Some((Vec3::ZERO, Vec3::new(0.0, 0.0, node.offset().z)));
        };

        let base = match self.mode {
            AspectMode::AnchorFit => parent.local_size() * node.anchor_span(),
            AspectMode::ParentFit | AspectMode::FixedWidth | AspectMode::FixedHeight => parent.local_size(),
        };
        let (size, mut offset) = fit(
            base,
            node.local_size(),
            node.offset(),
            &self.padding,
            self.aspect_ratio,
            self.fixed_length,
            self.mode,
        );
        if self.mode == AspectMode::AnchorFit {
            let shift = parent.local_size() * node.anchor_center();
            offset.x += shift.x;
            offset.y += shift.y;
        }
        Some((size, offset))
    }
}

impl Layout for AspectSizeFitter {
    fn kind(&self) -> &'static str {
        "aspect_size_fitter"
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

    fn preconditions(&self, tree: &LayoutTree, target: TargetId) -> Result<(), ValidationError> {
        match tree.parent(target) {
            Some(_) => Ok(()),
            None => Err(ValidationError::MissingParent(target)),
        }
    }

    fn update(&mut self, tree: &mut LayoutTree) {
        let Some(target) = self.state.target() else {
            return;
        };
        let Some((size, offset)) = self.compute(tree) else {
            return;
        };
        trace!(target_id = %target, ?size, ?offset, mode = ?self.mode, "fitting aspect");
        // The target was resolved by `compute`, so the write cannot miss.
        let _ = tree.update_local_size(target, size, offset);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
