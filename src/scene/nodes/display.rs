//! Volume display node - presentation settings for a volume
//!
//! The actual display math is the GUI layer's business; the scene only
//! round-trips the settings and the color table reference.

use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::node::{LiveIds, NodeCore, NodeHandle, SceneNode};

use super::parse_bool;

#[derive(Debug)]
pub struct VolumeDisplayNode {
    core: NodeCore,
    color_node_id: Option<String>,
    window: f64,
    level: f64,
    visible: bool,
}

impl Default for VolumeDisplayNode {
    fn default() -> Self {
        VolumeDisplayNode {
            core: NodeCore::new(),
            color_node_id: None,
            window: 256.0,
            level: 128.0,
            visible: true,
        }
    }
}

impl VolumeDisplayNode {
    pub const CLASS_NAME: &'static str = "VolumeDisplayNode";
    pub const TAG_NAME: &'static str = "VolumeDisplay";

    pub fn new_handle() -> NodeHandle {
        Rc::new(RefCell::new(VolumeDisplayNode::default()))
    }

    pub fn color_node_id(&self) -> Option<&str> {
        self.color_node_id.as_deref()
    }

    pub fn set_color_node_id(&mut self, id: Option<String>) {
        self.color_node_id = id;
    }

    pub fn window(&self) -> f64 {
        self.window
    }

    pub fn set_window(&mut self, window: f64) {
        self.window = window;
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn set_level(&mut self, level: f64) {
        self.level = level;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

impl SceneNode for VolumeDisplayNode {
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
        atts.push(("window".into(), self.window.to_string()));
        atts.push(("level".into(), self.level.to_string()));
        atts.push(("visible".into(), self.visible.to_string()));
        if let Some(id) = &self.color_node_id {
            atts.push(("colorNodeRef".into(), id.clone()));
        }
    }

    fn read_attributes(&mut self, atts: &[(String, String)]) {
        for (key, value) in atts {
            if self.core.read_core_attribute(key, value) {
                continue;
            }
            match key.as_str() {
                "window" => {
                    if let Ok(v) = value.parse() {
                        self.window = v;
                    }
                }
                "level" => {
                    if let Ok(v) = value.parse() {
                        self.level = v;
                    }
                }
                "visible" => {
                    if let Some(v) = parse_bool(value) {
                        self.visible = v;
                    }
                }
                "colorNodeRef" => self.color_node_id = Some(value.clone()),
                _ => {}
            }
        }
    }

    fn update_references(&mut self, live: &LiveIds) {
        if let Some(id) = &self.color_node_id {
            if !live.contains(id) {
                self.color_node_id = None;
            }
        }
    }

    fn update_reference_id(&mut self, old_id: &str, new_id: &str) {
        if self.color_node_id.as_deref() == Some(old_id) {
            self.color_node_id = Some(new_id.to_string());
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
    fn test_defaults_and_round_trip() {
        let node = VolumeDisplayNode::new_handle();
        {
            let mut n = node.borrow_mut();
            let d = n.as_any_mut().downcast_mut::<VolumeDisplayNode>().unwrap();
            assert_eq!(d.window(), 256.0);
            d.set_window(150.5);
            d.set_level(40.0);
            d.set_visible(false);
            d.set_color_node_id(Some("ColorTableNode1".into()));
        }

        let mut atts = Vec::new();
        node.borrow().write_attributes(&mut atts);
        let restored = VolumeDisplayNode::new_handle();
        restored.borrow_mut().read_attributes(&atts);
        let r = restored.borrow();
        let d = r.as_any().downcast_ref::<VolumeDisplayNode>().unwrap();
        assert_eq!(d.window(), 150.5);
        assert_eq!(d.level(), 40.0);
        assert!(!d.visible());
        assert_eq!(d.color_node_id(), Some("ColorTableNode1"));
    }
}
