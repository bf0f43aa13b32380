//! Synchronous observer hub for scene mutations
//!
//! External collaborators (display logic, tree views) subscribe here and
//! are notified within the call stack of the triggering mutation; there is
//! no event queue or buffering, preserving re-entrant update semantics.

use super::node::{NodeHandle, SceneNode};

/// A mutation notification carrying the affected node handle.
pub enum SceneEvent {
    /// A node was appended to the scene membership.
    NodeAdded(NodeHandle),
    /// A node was removed; its dangling references have not been swept yet
    /// when this fires (the sweep runs right after delivery).
    NodeRemoved(NodeHandle),
    /// A node's field values changed, either through an explicit
    /// notification or an undo/redo in-place restore.
    NodeModified(NodeHandle),
    /// The whole membership was released.
    SceneCleared,
}

impl SceneEvent {
    fn node_id(&self) -> Option<String> {
        match self {
            SceneEvent::NodeAdded(n)
            | SceneEvent::NodeRemoved(n)
            | SceneEvent::NodeModified(n) => Some(n.borrow().core().id().to_string()),
            SceneEvent::SceneCleared => None,
        }
    }
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type Callback = Box<dyn FnMut(&SceneEvent)>;

#[derive(Default)]
pub(crate) struct ObserverHub {
    next_id: u64,
    scene_observers: Vec<(ObserverId, Callback)>,
    node_observers: Vec<(ObserverId, String, Callback)>,
}

impl ObserverHub {
    fn fresh_id(&mut self) -> ObserverId {
        self.next_id += 1;
        ObserverId(self.next_id)
    }

    pub(crate) fn observe(&mut self, callback: Callback) -> ObserverId {
        let id = self.fresh_id();
        self.scene_observers.push((id, callback));
        id
    }

    pub(crate) fn observe_node(&mut self, node_id: &str, callback: Callback) -> ObserverId {
        let id = self.fresh_id();
        self.node_observers.push((id, node_id.to_string(), callback));
        id
    }

    pub(crate) fn unobserve(&mut self, id: ObserverId) {
        self.scene_observers.retain(|(oid, _)| *oid != id);
        self.node_observers.retain(|(oid, _, _)| *oid != id);
    }

    pub(crate) fn dispatch(&mut self, event: &SceneEvent) {
        for (_, callback) in self.scene_observers.iter_mut() {
            callback(event);
        }
        if let Some(id) = event.node_id() {
            for (_, watched, callback) in self.node_observers.iter_mut() {
                if *watched == id {
                    callback(event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::nodes::VolumeNode;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_scene_observers_see_every_event() {
        let mut hub = ObserverHub::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        hub.observe(Box::new(move |event| {
            sink.borrow_mut().push(match event {
                SceneEvent::NodeAdded(_) => "added",
                SceneEvent::NodeRemoved(_) => "removed",
                SceneEvent::NodeModified(_) => "modified",
                SceneEvent::SceneCleared => "cleared",
            });
        }));

        let node = VolumeNode::new_handle();
        node.borrow_mut().core_mut().set_id("Volume1");
        hub.dispatch(&SceneEvent::NodeAdded(node.clone()));
        hub.dispatch(&SceneEvent::SceneCleared);
        assert_eq!(*seen.borrow(), vec!["added", "cleared"]);
    }

    #[test]
    fn test_node_observers_filter_by_id() {
        let mut hub = ObserverHub::default();
        let hits = Rc::new(RefCell::new(0));
        let sink = hits.clone();
        let id = hub.observe_node("Volume1", Box::new(move |_| *sink.borrow_mut() += 1));

        let watched = VolumeNode::new_handle();
        watched.borrow_mut().core_mut().set_id("Volume1");
        let other = VolumeNode::new_handle();
        other.borrow_mut().core_mut().set_id("Volume2");

        hub.dispatch(&SceneEvent::NodeModified(watched.clone()));
        hub.dispatch(&SceneEvent::NodeModified(other));
        assert_eq!(*hits.borrow(), 1);

        hub.unobserve(id);
        hub.dispatch(&SceneEvent::NodeModified(watched));
        assert_eq!(*hits.borrow(), 1);
    }
}
