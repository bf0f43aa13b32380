//! Color table node - a named lookup table referenced by display nodes

use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::node::{NodeCore, NodeHandle, SceneNode};

#[derive(Debug)]
pub struct ColorTableNode {
    core: NodeCore,
    table_type: String,
    number_of_colors: u32,
}

impl Default for ColorTableNode {
    fn default() -> Self {
        ColorTableNode {
            core: NodeCore::new(),
            table_type: "Grey".to_string(),
            number_of_colors: 256,
        }
    }
}

impl ColorTableNode {
    pub const CLASS_NAME: &'static str = "ColorTableNode";
    pub const TAG_NAME: &'static str = "ColorTable";

    pub fn new_handle() -> NodeHandle {
        Rc::new(RefCell::new(ColorTableNode::default()))
    }

    pub fn table_type(&self) -> &str {
        &self.table_type
    }

    pub fn set_table_type(&mut self, table_type: impl Into<String>) {
        self.table_type = table_type.into();
    }

    pub fn number_of_colors(&self) -> u32 {
        self.number_of_colors
    }

    pub fn set_number_of_colors(&mut self, count: u32) {
        self.number_of_colors = count;
    }
}

impl SceneNode for ColorTableNode {
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
        atts.push(("type".into(), self.table_type.clone()));
        atts.push(("numColors".into(), self.number_of_colors.to_string()));
    }

    fn read_attributes(&mut self, atts: &[(String, String)]) {
        for (key, value) in atts {
            if self.core.read_core_attribute(key, value) {
                continue;
            }
            match key.as_str() {
                "type" => self.table_type = value.clone(),
                "numColors" => {
                    if let Ok(v) = value.parse() {
                        self.number_of_colors = v;
                    }
                }
                _ => {}
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
