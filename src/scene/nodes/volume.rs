//! Volume node - an image volume placed in the scene
//!
//! Carries the geometric placement (spacing, origin) and ID references to
//! its display, storage, and transform collaborators. References are weak:
//! a dangling ID reads as "not present".

use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::node::{LiveIds, NodeCore, NodeHandle, SceneNode};

use super::{join_floats, parse_floats};

/// An image volume. The voxel payload itself lives behind the storage
/// node; the scene only tracks placement and wiring.
#[derive(Debug, Default)]
pub struct VolumeNode {
    core: NodeCore,
    display_node_id: Option<String>,
    storage_node_id: Option<String>,
    transform_node_id: Option<String>,
    spacing: [f64; 3],
    origin: [f64; 3],
}

impl VolumeNode {
    pub const CLASS_NAME: &'static str = "VolumeNode";
    pub const TAG_NAME: &'static str = "Volume";

    pub fn new_handle() -> NodeHandle {
        Rc::new(RefCell::new(VolumeNode {
            spacing: [1.0, 1.0, 1.0],
            ..Default::default()
        }))
    }

    pub fn display_node_id(&self) -> Option<&str> {
        self.display_node_id.as_deref()
    }

    pub fn set_display_node_id(&mut self, id: Option<String>) {
        self.display_node_id = id;
    }

    pub fn storage_node_id(&self) -> Option<&str> {
        self.storage_node_id.as_deref()
    }

    pub fn set_storage_node_id(&mut self, id: Option<String>) {
        self.storage_node_id = id;
    }

    pub fn transform_node_id(&self) -> Option<&str> {
        self.transform_node_id.as_deref()
    }

    pub fn set_transform_node_id(&mut self, id: Option<String>) {
        self.transform_node_id = id;
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn set_spacing(&mut self, spacing: [f64; 3]) {
        self.spacing = spacing;
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn set_origin(&mut self, origin: [f64; 3]) {
        self.origin = origin;
    }
}

fn sweep(slot: &mut Option<String>, live: &LiveIds) {
    if let Some(id) = slot {
        if !live.contains(id) {
            *slot = None;
        }
    }
}

fn remap(slot: &mut Option<String>, old_id: &str, new_id: &str) {
    if slot.as_deref() == Some(old_id) {
        *slot = Some(new_id.to_string());
    }
}

impl SceneNode for VolumeNode {
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
        atts.push(("spacing".into(), join_floats(&self.spacing)));
        atts.push(("origin".into(), join_floats(&self.origin)));
        if let Some(id) = &self.display_node_id {
            atts.push(("displayNodeRef".into(), id.clone()));
        }
        if let Some(id) = &self.storage_node_id {
            atts.push(("storageNodeRef".into(), id.clone()));
        }
        if let Some(id) = &self.transform_node_id {
            atts.push(("transformNodeRef".into(), id.clone()));
        }
    }

    fn read_attributes(&mut self, atts: &[(String, String)]) {
        for (key, value) in atts {
            if self.core.read_core_attribute(key, value) {
                continue;
            }
            match key.as_str() {
                "spacing" => {
                    if let Some(v) = parse_floats::<3>(value) {
                        self.spacing = v;
                    }
                }
                "origin" => {
                    if let Some(v) = parse_floats::<3>(value) {
                        self.origin = v;
                    }
                }
                "displayNodeRef" => self.display_node_id = Some(value.clone()),
                "storageNodeRef" => self.storage_node_id = Some(value.clone()),
                "transformNodeRef" => self.transform_node_id = Some(value.clone()),
                _ => {}
            }
        }
    }

    fn update_references(&mut self, live: &LiveIds) {
        sweep(&mut self.display_node_id, live);
        sweep(&mut self.storage_node_id, live);
        sweep(&mut self.transform_node_id, live);
    }

    fn update_reference_id(&mut self, old_id: &str, new_id: &str) {
        remap(&mut self.display_node_id, old_id, new_id);
        remap(&mut self.storage_node_id, old_id, new_id);
        remap(&mut self.transform_node_id, old_id, new_id);
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
    fn test_attribute_round_trip() {
        let node = VolumeNode::new_handle();
        {
            let mut n = node.borrow_mut();
            let v = n.as_any_mut().downcast_mut::<VolumeNode>().unwrap();
            v.set_spacing([0.5, 0.5, 2.0]);
            v.set_origin([-10.0, 0.0, 4.25]);
            v.set_display_node_id(Some("VolumeDisplayNode1".into()));
        }

        let mut atts = Vec::new();
        node.borrow().write_attributes(&mut atts);

        let restored = VolumeNode::new_handle();
        restored.borrow_mut().read_attributes(&atts);
        let r = restored.borrow();
        let v = r.as_any().downcast_ref::<VolumeNode>().unwrap();
        assert_eq!(v.spacing(), [0.5, 0.5, 2.0]);
        assert_eq!(v.origin(), [-10.0, 0.0, 4.25]);
        assert_eq!(v.display_node_id(), Some("VolumeDisplayNode1"));
        assert_eq!(v.storage_node_id(), None);
    }

    #[test]
    fn test_bad_tuple_keeps_previous_value() {
        let node = VolumeNode::new_handle();
        node.borrow_mut()
            .read_attributes(&[("spacing".into(), "1 2 oops".into())]);
        let n = node.borrow();
        let v = n.as_any().downcast_ref::<VolumeNode>().unwrap();
        assert_eq!(v.spacing(), [1.0, 1.0, 1.0]);
    }
}
