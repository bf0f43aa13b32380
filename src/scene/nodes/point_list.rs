//! Point list and point nodes - the compound pair in the built-in set
//!
//! A list and its points are separate scene members; in the document the
//! points appear nested beneath their list, and the parser's two-hook
//! handshake is what reconstructs the membership. There is no separate
//! edge encoding: nesting in the file *is* the relationship, which is why
//! the list's point IDs are not serialized as an attribute.

use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::node::{LiveIds, NodeCore, NodeHandle, SceneNode};

use super::{join_floats, parse_bool, parse_floats};

/// An ordered list of point nodes, held by ID.
#[derive(Debug)]
pub struct PointListNode {
    core: NodeCore,
    point_ids: Vec<String>,
    locked: bool,
}

impl Default for PointListNode {
    fn default() -> Self {
        let mut core = NodeCore::new();
        // points render nested beneath the list
        core.set_indent_delta(1);
        PointListNode {
            core,
            point_ids: Vec::new(),
            locked: false,
        }
    }
}

impl PointListNode {
    pub const CLASS_NAME: &'static str = "PointListNode";
    pub const TAG_NAME: &'static str = "PointList";

    pub fn new_handle() -> NodeHandle {
        Rc::new(RefCell::new(PointListNode::default()))
    }

    /// IDs of the member points, in list order.
    pub fn point_ids(&self) -> &[String] {
        &self.point_ids
    }

    pub fn add_point_id(&mut self, id: impl Into<String>) {
        self.point_ids.push(id.into());
    }

    pub fn remove_point_id(&mut self, id: &str) {
        self.point_ids.retain(|p| p != id);
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }
}

impl SceneNode for PointListNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn tag_name(&self) -> &'static str {
        Self::TAG_NAME
    }

    fn create_instance(&self) -> NodeHandle {
        Self::new_handle()
    }

    fn write_attributes(&self, atts: &mut Vec<(String, String)>) {
        atts.push(("locked".into(), self.locked.to_string()));
    }

    fn read_attributes(&mut self, atts: &[(String, String)]) {
        for (key, value) in atts {
            if self.core.read_core_attribute(key, value) {
                continue;
            }
            if key == "locked" {
                if let Some(v) = parse_bool(value) {
                    self.locked = v;
                }
            }
        }
    }

    fn copy_from(&mut self, source: &dyn SceneNode) {
        // point membership is encoded by nesting, not attributes, so the
        // generic attribute round trip would drop it
        self.core = source.core().clone();
        if let Some(src) = source.as_any().downcast_ref::<PointListNode>() {
            self.point_ids = src.point_ids.clone();
            self.locked = src.locked;
        }
    }

    fn update_references(&mut self, live: &LiveIds) {
        self.point_ids.retain(|id| live.contains(id));
    }

    fn update_reference_id(&mut self, old_id: &str, new_id: &str) {
        for id in &mut self.point_ids {
            if id == old_id {
                *id = new_id.to_string();
            }
        }
    }

    fn update_scene(&mut self, live: &LiveIds) {
        // forward references are legal during the streaming parse; prune
        // whatever never materialized
        self.point_ids.retain(|id| live.contains(id));
    }

    fn process_child(&mut self, child: &mut dyn SceneNode) {
        if child.class_name() == PointNode::CLASS_NAME {
            let id = child.core().id();
            if !id.is_empty() && !self.point_ids.iter().any(|p| p == id) {
                self.point_ids.push(id.to_string());
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// A single labeled position, a member of at most one list.
#[derive(Debug, Default)]
pub struct PointNode {
    core: NodeCore,
    position: [f64; 3],
    list_node_id: Option<String>,
    selected: bool,
}

impl PointNode {
    pub const CLASS_NAME: &'static str = "PointNode";
    pub const TAG_NAME: &'static str = "Point";

    pub fn new_handle() -> NodeHandle {
        Rc::new(RefCell::new(PointNode::default()))
    }

    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    pub fn set_position(&mut self, position: [f64; 3]) {
        self.position = position;
    }

    /// The owning list, if this point was parsed beneath one or attached
    /// at runtime. Not serialized: the nesting encodes it.
    pub fn list_node_id(&self) -> Option<&str> {
        self.list_node_id.as_deref()
    }

    pub fn set_list_node_id(&mut self, id: Option<String>) {
        self.list_node_id = id;
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl SceneNode for PointNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn tag_name(&self) -> &'static str {
        Self::TAG_NAME
    }

    fn create_instance(&self) -> NodeHandle {
        Self::new_handle()
    }

    fn write_attributes(&self, atts: &mut Vec<(String, String)>) {
        atts.push(("position".into(), join_floats(&self.position)));
        atts.push(("selected".into(), self.selected.to_string()));
    }

    fn read_attributes(&mut self, atts: &[(String, String)]) {
        for (key, value) in atts {
            if self.core.read_core_attribute(key, value) {
                continue;
            }
            match key.as_str() {
                "position" => {
                    if let Some(v) = parse_floats::<3>(value) {
                        self.position = v;
                    }
                }
                "selected" => {
                    if let Some(v) = parse_bool(value) {
                        self.selected = v;
                    }
                }
                _ => {}
            }
        }
    }

    fn copy_from(&mut self, source: &dyn SceneNode) {
        self.core = source.core().clone();
        if let Some(src) = source.as_any().downcast_ref::<PointNode>() {
            self.position = src.position;
            self.list_node_id = src.list_node_id.clone();
            self.selected = src.selected;
        }
    }

    fn update_references(&mut self, live: &LiveIds) {
        if let Some(id) = &self.list_node_id {
            if !live.contains(id) {
                self.list_node_id = None;
            }
        }
    }

    fn update_reference_id(&mut self, old_id: &str, new_id: &str) {
        if self.list_node_id.as_deref() == Some(old_id) {
            self.list_node_id = Some(new_id.to_string());
        }
    }

    fn process_parent(&mut self, parent: &mut dyn SceneNode) {
        if parent.class_name() == PointListNode::CLASS_NAME {
            let id = parent.core().id();
            if !id.is_empty() {
                self.list_node_id = Some(id.to_string());
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_wire_list_and_point_both_ways() {
        let list = PointListNode::new_handle();
        list.borrow_mut().core_mut().set_id("PointListNode1");
        let point = PointNode::new_handle();
        point.borrow_mut().core_mut().set_id("PointNode1");

        list.borrow_mut().process_child(&mut *point.borrow_mut());
        point.borrow_mut().process_parent(&mut *list.borrow_mut());

        let l = list.borrow();
        let pl = l.as_any().downcast_ref::<PointListNode>().unwrap();
        assert_eq!(pl.point_ids(), ["PointNode1"]);
        let p = point.borrow();
        let pn = p.as_any().downcast_ref::<PointNode>().unwrap();
        assert_eq!(pn.list_node_id(), Some("PointListNode1"));
    }

    #[test]
    fn test_hooks_ignore_unrelated_classes() {
        let list = PointListNode::new_handle();
        list.borrow_mut().core_mut().set_id("PointListNode1");
        let volume = crate::scene::nodes::VolumeNode::new_handle();
        volume.borrow_mut().core_mut().set_id("VolumeNode1");

        list.borrow_mut().process_child(&mut *volume.borrow_mut());
        let l = list.borrow();
        let pl = l.as_any().downcast_ref::<PointListNode>().unwrap();
        assert!(pl.point_ids().is_empty());
    }

    #[test]
    fn test_list_opens_a_nesting_level() {
        let list = PointListNode::default();
        assert_eq!(list.core().indent_delta(), 1);
    }
}
