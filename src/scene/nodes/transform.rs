//! Transform node - a 4x4 matrix applied to nodes that reference it

use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::node::{NodeCore, NodeHandle, SceneNode};

use super::{join_floats, parse_floats};

const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

#[derive(Debug)]
pub struct TransformNode {
    core: NodeCore,
    matrix: [f64; 16],
}

impl Default for TransformNode {
    fn default() -> Self {
        TransformNode {
            core: NodeCore::new(),
            matrix: IDENTITY,
        }
    }
}

impl TransformNode {
    pub const CLASS_NAME: &'static str = "TransformNode";
    pub const TAG_NAME: &'static str = "Transform";

    pub fn new_handle() -> NodeHandle {
        Rc::new(RefCell::new(TransformNode::default()))
    }

    /// Row-major 4x4 matrix.
    pub fn matrix(&self) -> [f64; 16] {
        self.matrix
    }

    pub fn set_matrix(&mut self, matrix: [f64; 16]) {
        self.matrix = matrix;
    }
}

impl SceneNode for TransformNode {
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
        atts.push(("matrix".into(), join_floats(&self.matrix)));
    }

    fn read_attributes(&mut self, atts: &[(String, String)]) {
        for (key, value) in atts {
            if self.core.read_core_attribute(key, value) {
                continue;
            }
            if key == "matrix" {
                if let Some(m) = parse_floats::<16>(value) {
                    self.matrix = m;
                }
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
    fn test_matrix_round_trip() {
        let mut node = TransformNode::default();
        let mut m = IDENTITY;
        m[3] = 12.5; // x translation
        node.set_matrix(m);

        let mut atts = Vec::new();
        node.write_attributes(&mut atts);
        let mut restored = TransformNode::default();
        restored.read_attributes(&atts);
        assert_eq!(restored.matrix(), m);
    }
}
