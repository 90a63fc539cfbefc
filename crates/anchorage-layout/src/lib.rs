//! Anchor-driven layout for Anchorage scenes.
//!
//! This crate keeps a tree of geometry-bearing targets and runs pluggable
//! layout operators over it.
//!
//! # Architecture
//!
//! 1. **Tree**: [`LayoutTree`] stores [`LayoutTarget`]s in an arena with
//!    parent/child links and change notifications
//! 2. **Operators**: types implementing [`Layout`], such as
//!    [`AspectSizeFitter`] and [`ParentFollowLayout`], each writing the
//!    geometry declared by its [`OperationTargetFlags`]
//! 3. **Validation**: operators whose flags collide are rejected before they run
//! 4. **Passes**: [`LayoutScene::run_pass`] validates and updates operators by
//!    ascending priority
//!
//! # Example
//!
//! ```
//! use anchorage_layout::{AspectMode, AspectSizeFitter, LayoutScene, PassOptions};
//! use anchorage_core::Vec3;
//!
//! let mut scene = LayoutScene::new();
//! let parent = scene.tree_mut().create();
//! let child = scene.tree_mut().create();
//! scene.tree_mut().set_local_size(parent, Vec3::new(100.0, 100.0, 0.0)).unwrap();
//! scene.tree_mut().set_parent(child, Some(parent)).unwrap();
//!
//! let fitter = AspectSizeFitter::new(AspectMode::ParentFit).with_aspect_ratio(0.5);
//! scene.add_layout(child, fitter).unwrap();
//! scene.run_pass(&PassOptions::default());
//!
//! assert_eq!(scene.tree().get(child).unwrap().local_size(), Vec3::new(100.0, 50.0, 0.0));
//! ```

mod aspect;
mod follow;
mod layout;
mod listener;
mod scene;
mod tree;
mod validate;

pub use aspect::{fit, AspectMode, AspectSizeFitter};
pub use follow::ParentFollowLayout;
pub use layout::{Layout, LayoutChange, LayoutState, OperationTargetFlags, Snapshot};
pub use listener::{ListenerId, Listeners};
pub use scene::{LayoutScene, PassOptions, PassReport};
pub use tree::{LayoutTarget, LayoutTree, TargetChange, TargetChanged};
pub use validate::{check, LayoutMap};
