//! Whole-scene snapshots backing the undo/redo stacks
//!
//! A snapshot records scene membership pointer-for-pointer at one instant.
//! It stays shallow (aliasing the live nodes) except for nodes explicitly
//! captured before a mutation, which are replaced in place by independent
//! deep copies. The diff that consumes a snapshot lives on the scene
//! itself, which owns both stacks.

use std::rc::Rc;

use super::node::{deep_copy, NodeHandle, SceneNode};

/// Default bound on each stack's depth; the oldest snapshot is dropped
/// when a push would exceed it.
pub const DEFAULT_UNDO_STACK_SIZE: usize = 100;

/// An ordered collection of node handles representing scene membership at
/// a point in time.
pub(crate) struct SceneSnapshot {
    nodes: Vec<NodeHandle>,
}

impl SceneSnapshot {
    /// Captures the current membership pointer-for-pointer. Cheap: no
    /// node data is copied.
    pub(crate) fn capture(nodes: &[NodeHandle]) -> Self {
        SceneSnapshot {
            nodes: nodes.to_vec(),
        }
    }

    /// Replaces the slot aliasing `target` with an independent deep copy,
    /// freezing the node's pre-mutation state inside this snapshot. A
    /// target that is not a member is ignored.
    pub(crate) fn replace_with_copy(&mut self, target: &NodeHandle) {
        if let Some(slot) = self.nodes.iter_mut().find(|n| Rc::ptr_eq(n, target)) {
            *slot = deep_copy(target);
        }
    }

    /// Membership entries in order, paired with their IDs at diff time.
    pub(crate) fn entries(&self) -> Vec<(String, NodeHandle)> {
        self.nodes
            .iter()
            .map(|n| (n.borrow().core().id().to_string(), n.clone()))
            .collect()
    }
}

/// The two snapshot stacks, most recent on top.
pub(crate) struct UndoStacks {
    pub(crate) undo_stack: Vec<SceneSnapshot>,
    pub(crate) redo_stack: Vec<SceneSnapshot>,
    limit: usize,
}

impl Default for UndoStacks {
    fn default() -> Self {
        UndoStacks {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: DEFAULT_UNDO_STACK_SIZE,
        }
    }
}

impl UndoStacks {
    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        Self::trim(&mut self.undo_stack, self.limit);
        Self::trim(&mut self.redo_stack, self.limit);
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn push_undo(&mut self, snapshot: SceneSnapshot) {
        self.undo_stack.push(snapshot);
        Self::trim(&mut self.undo_stack, self.limit);
    }

    pub(crate) fn push_redo(&mut self, snapshot: SceneSnapshot) {
        self.redo_stack.push(snapshot);
        Self::trim(&mut self.redo_stack, self.limit);
    }

    fn trim(stack: &mut Vec<SceneSnapshot>, limit: usize) {
        while stack.len() > limit {
            stack.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::nodes::VolumeNode;

    fn volume(id: &str) -> NodeHandle {
        let node = VolumeNode::new_handle();
        node.borrow_mut().core_mut().set_id(id);
        node
    }

    #[test]
    fn test_capture_aliases_live_nodes() {
        let nodes = vec![volume("Volume1"), volume("Volume2")];
        let snapshot = SceneSnapshot::capture(&nodes);
        let entries = snapshot.entries();
        assert_eq!(entries.len(), 2);
        assert!(Rc::ptr_eq(&entries[0].1, &nodes[0]));
        assert!(Rc::ptr_eq(&entries[1].1, &nodes[1]));
    }

    #[test]
    fn test_replace_with_copy_freezes_state() {
        let nodes = vec![volume("Volume1")];
        let mut snapshot = SceneSnapshot::capture(&nodes);
        snapshot.replace_with_copy(&nodes[0]);

        nodes[0].borrow_mut().core_mut().set_name("after");

        let entries = snapshot.entries();
        assert!(!Rc::ptr_eq(&entries[0].1, &nodes[0]));
        assert_eq!(entries[0].1.borrow().core().name(), "");
    }

    #[test]
    fn test_stack_limit_drops_oldest() {
        let mut stacks = UndoStacks::default();
        stacks.set_limit(2);
        for i in 0..4 {
            stacks.push_undo(SceneSnapshot::capture(&[volume(&format!("Volume{}", i))]));
        }
        assert_eq!(stacks.undo_stack.len(), 2);
        // oldest dropped: the remaining bottom entry is Volume2
        assert_eq!(stacks.undo_stack[0].entries()[0].0, "Volume2");
    }
}
