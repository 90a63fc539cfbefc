//! Core value types for the layout engine.

use std::fmt;

use glam::Vec3;

use crate::precision::approx_eq;

/// Identifier of a layout target inside a tree. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Identifier of a layout operator inside a scene. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutId(pub u64);

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Unit of the margins in a [`LayoutOffset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OffsetUnit {
    /// Margins are absolute lengths
    #[default]
    Pixel,
    /// Margins are fractions of the base size (width for left/right, height for top/bottom)
    Ratio,
}

/// Four margins with a unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutOffset {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub unit: OffsetUnit,
}

impl LayoutOffset {
    pub const fn new(left: f32, right: f32, top: f32, bottom: f32, unit: OffsetUnit) -> Self {
        Self { left, right, top, bottom, unit }
    }

    /// Zero pixel margins.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, OffsetUnit::Pixel)
    }

    pub const fn pixel(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self::new(left, right, top, bottom, OffsetUnit::Pixel)
    }

    pub const fn ratio(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self::new(left, right, top, bottom, OffsetUnit::Ratio)
    }

    /// Same margin on all four sides.
    pub const fn uniform(value: f32, unit: OffsetUnit) -> Self {
        Self::new(value, value, value, value, unit)
    }

    /// Total horizontal margin.
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Total vertical margin.
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    /// Convert to pixel margins against a base size.
    ///
    /// Ratio margins scale with `base.x` (left/right) and `base.y` (top/bottom).
    pub fn resolve(&self, base: Vec3) -> LayoutOffset {
        match self.unit {
            OffsetUnit::Pixel => *self,
            OffsetUnit::Ratio => LayoutOffset::pixel(
                self.left * base.x,
                self.right * base.x,
                self.top * base.y,
                self.bottom * base.y,
            ),
        }
    }

    /// Shift that centers the inner box between the margins, as `(x, y)`.
    ///
    /// Positive y points up, so a larger bottom margin moves the box up.
    pub fn centering(&self) -> (f32, f32) {
        (0.5 * (self.left - self.right), 0.5 * (self.bottom - self.top))
    }

    /// Equality under the fixed numeric precision.
    pub fn approx_eq(&self, other: &LayoutOffset) -> bool {
        self.unit == other.unit
            && approx_eq(self.left, other.left)
            && approx_eq(self.right, other.right)
            && approx_eq(self.top, other.top)
            && approx_eq(self.bottom, other.bottom)
    }
}
