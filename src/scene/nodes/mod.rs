//! Built-in node kinds
//!
//! One file per kind, each pairing the typed fields with its attribute
//! micro-grammar (space-separated numeric tuples and the like). These are
//! the per-type contracts layered on top of the core serializer.

pub mod color_table;
pub mod display;
pub mod point_list;
pub mod storage;
pub mod transform;
pub mod volume;

pub use color_table::ColorTableNode;
pub use display::VolumeDisplayNode;
pub use point_list::{PointListNode, PointNode};
pub use storage::VolumeStorageNode;
pub use transform::TransformNode;
pub use volume::VolumeNode;

use super::registry::NodeRegistry;

/// Registers a prototype of every built-in node kind.
pub fn register_default_nodes(registry: &mut NodeRegistry) {
    registry.register_node_class(VolumeNode::new_handle());
    registry.register_node_class(VolumeDisplayNode::new_handle());
    registry.register_node_class(VolumeStorageNode::new_handle());
    registry.register_node_class(ColorTableNode::new_handle());
    registry.register_node_class(TransformNode::new_handle());
    registry.register_node_class(PointListNode::new_handle());
    registry.register_node_class(PointNode::new_handle());
}

/// Encodes a float slice as the space-separated tuple grammar.
pub(crate) fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a space-separated tuple of exactly `N` floats; `None` on any
/// mismatch, letting callers keep their previous value.
pub(crate) fn parse_floats<const N: usize>(value: &str) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    let mut count = 0;
    for part in value.split_whitespace() {
        if count == N {
            return None;
        }
        out[count] = part.parse().ok()?;
        count += 1;
    }
    (count == N).then_some(out)
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scene::node::{NodeCore, NodeHandle, SceneNode};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_float_tuple_round_trip() {
        let encoded = join_floats(&[1.5, -2.0, 0.25]);
        assert_eq!(encoded, "1.5 -2 0.25");
        assert_eq!(parse_floats::<3>(&encoded), Some([1.5, -2.0, 0.25]));
        assert_eq!(parse_floats::<3>("1 2"), None);
        assert_eq!(parse_floats::<3>("1 2 3 4"), None);
        assert_eq!(parse_floats::<3>("1 x 3"), None);
    }

    #[test]
    fn test_parse_bool_accepts_both_grammars() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    // Minimal node kinds sharing one tag, for registry-collision tests.
    macro_rules! colliding_node {
        ($ty:ident, $class:literal) => {
            #[derive(Default)]
            pub(crate) struct $ty {
                core: NodeCore,
            }

            impl SceneNode for $ty {
                fn core(&self) -> &NodeCore {
                    &self.core
                }
                fn core_mut(&mut self) -> &mut NodeCore {
                    &mut self.core
                }
                fn class_name(&self) -> &'static str {
                    $class
                }
                fn tag_name(&self) -> &'static str {
                    "Collide"
                }
                fn create_instance(&self) -> NodeHandle {
                    Rc::new(RefCell::new($ty::default()))
                }
                fn write_attributes(&self, _atts: &mut Vec<(String, String)>) {}
                fn read_attributes(&mut self, atts: &[(String, String)]) {
                    for (k, v) in atts {
                        self.core.read_core_attribute(k, v);
                    }
                }
                fn as_any(&self) -> &dyn std::any::Any {
                    self
                }
                fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                    self
                }
            }
        };
    }

    colliding_node!(CollideNodeA, "CollideNodeA");
    colliding_node!(CollideNodeB, "CollideNodeB");

    pub(crate) fn colliding_tag_node_a() -> NodeHandle {
        Rc::new(RefCell::new(CollideNodeA::default()))
    }

    pub(crate) fn colliding_tag_node_b() -> NodeHandle {
        Rc::new(RefCell::new(CollideNodeB::default()))
    }
}
