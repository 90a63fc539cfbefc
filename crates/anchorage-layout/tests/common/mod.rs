#![allow(dead_code)]

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use anchorage_core::{TargetId, Vec3};
use anchorage_layout::{Layout, LayoutScene, LayoutState, LayoutTree, OperationTargetFlags};
use smallvec::SmallVec;

pub type TargetLog = Rc<RefCell<Vec<(Option<TargetId>, Option<TargetId>)>>>;

/// A user-defined operator with arbitrary flags.
///
/// With `SELF_OFFSET` it pins its target's offset; with `CHILDREN_OFFSET` it
/// spaces the children 10 units apart along x.
#[derive(Debug)]
pub struct ProbeLayout {
    state: LayoutState,
    flags: OperationTargetFlags,
    pub retargets: TargetLog,
}

impl ProbeLayout {
    pub fn new(flags: OperationTargetFlags, priority: i32) -> Self {
        Self {
            state: LayoutState::new(priority),
            flags,
            retargets: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl Layout for ProbeLayout {
    fn kind(&self) -> &'static str {
        "probe"
    }

    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn target_flags(&self) -> OperationTargetFlags {
        self.flags
    }

    fn on_target_changed(&mut self, _tree: &LayoutTree, new: Option<TargetId>, previous: Option<TargetId>) {
        self.retargets.borrow_mut().push((new, previous));
    }

    fn track(&self, tree: &LayoutTree, out: &mut SmallVec<[f32; 4]>) {
        if let Some(target) = self.target() {
            out.push(tree.children(target).len() as f32);
        }
    }

    fn update(&mut self, tree: &mut LayoutTree) {
        let Some(target) = self.target() else { return };
        if self.flags.contains(OperationTargetFlags::SELF_OFFSET) {
            tree.set_offset(target, Vec3::new(1.0, 2.0, 0.0)).unwrap();
        }
        if self.flags.contains(OperationTargetFlags::CHILDREN_OFFSET) {
            let children = tree.children(target).to_vec();
            for (index, child) in children.into_iter().enumerate() {
                tree.set_offset(child, Vec3::new(index as f32 * 10.0, 0.0, 0.0)).unwrap();
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A parent of the given size with one full-stretch child.
pub fn parent_and_child(scene: &mut LayoutScene, size: Vec3) -> (TargetId, TargetId) {
    let tree = scene.tree_mut();
    let parent = tree.create_named("parent");
    let child = tree.create_named("child");
    tree.set_local_size(parent, size).unwrap();
    tree.set_parent(child, Some(parent)).unwrap();
    (parent, child)
}
