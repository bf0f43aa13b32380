//! Node core data and the polymorphic scene node contract

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

/// Shared handle to a polymorphic scene node.
///
/// The scene is the single logical owner of every live node; undo/redo
/// snapshots hold extra strong handles while they alias live nodes and
/// exclusive handles to their private deep copies. Cross-references between
/// nodes are always ID strings, never handles.
pub type NodeHandle = Rc<RefCell<dyn SceneNode>>;

static NEXT_SCENE_TAG: AtomicU64 = AtomicU64::new(1);

/// Identity of a scene store, used for the node-side back reference.
///
/// A node attached to a scene carries that scene's tag; it is cleared on
/// removal. This expresses "attached to exactly one store" without handing
/// nodes an owning pointer back into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTag(u64);

impl SceneTag {
    pub(crate) fn next() -> Self {
        SceneTag(NEXT_SCENE_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

/// Common record shared by every node kind: identity, display name,
/// generic string attributes, and serialization bookkeeping.
#[derive(Debug, Clone)]
pub struct NodeCore {
    id: String,
    name: String,
    attributes: IndexMap<String, String>,
    scene: Option<SceneTag>,
    indent_delta: i32,
    save_with_scene: bool,
}

impl Default for NodeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCore {
    /// Creates an empty core. ID and name are assigned by the scene at
    /// add time when left empty.
    pub fn new() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            attributes: IndexMap::new(),
            scene: None,
            indent_delta: 0,
            save_with_scene: true,
        }
    }

    /// The scene-unique identifier, empty until assigned.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets the ID. The scene treats an assigned ID as immutable; this is
    /// only called at add time or by the deserializer.
    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// The display name. Not required to be unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Generic extensible metadata, ordered by insertion.
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Sets a generic attribute, replacing any previous value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Looks up a generic attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|v| v.as_str())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// The tag of the owning scene, `None` while detached.
    pub fn scene(&self) -> Option<SceneTag> {
        self.scene
    }

    pub(crate) fn set_scene(&mut self, tag: Option<SceneTag>) {
        self.scene = tag;
    }

    /// Signed indentation adjustment applied by the serializer: negative
    /// closes a visual nesting level before this element, positive opens
    /// one for subsequent elements.
    pub fn indent_delta(&self) -> i32 {
        self.indent_delta
    }

    pub fn set_indent_delta(&mut self, delta: i32) {
        self.indent_delta = delta;
    }

    /// Whether the serializer includes this node when committing.
    pub fn save_with_scene(&self) -> bool {
        self.save_with_scene
    }

    pub fn set_save_with_scene(&mut self, save: bool) {
        self.save_with_scene = save;
    }

    /// Emits the core attributes (`id`, `name`, packed generic
    /// `attributes`) ahead of the node's typed fields.
    pub(crate) fn write_core_attributes(&self, atts: &mut Vec<(String, String)>) {
        if !self.id.is_empty() {
            atts.push(("id".into(), self.id.clone()));
        }
        if !self.name.is_empty() {
            atts.push(("name".into(), self.name.clone()));
        }
        if !self.attributes.is_empty() {
            let packed = self
                .attributes
                .iter()
                .map(|(k, v)| format!("{}:{}", k, v))
                .collect::<Vec<_>>()
                .join(";");
            atts.push(("attributes".into(), packed));
        }
    }

    /// Consumes a core attribute read from XML. Returns `true` when the
    /// key belonged to the core.
    pub(crate) fn read_core_attribute(&mut self, key: &str, value: &str) -> bool {
        match key {
            "id" => {
                self.id = value.to_string();
                true
            }
            "name" => {
                self.name = value.to_string();
                true
            }
            "attributes" => {
                for entry in value.split(';').filter(|e| !e.is_empty()) {
                    if let Some((k, v)) = entry.split_once(':') {
                        self.attributes.insert(k.to_string(), v.to_string());
                    }
                }
                true
            }
            _ => false,
        }
    }
}

/// The set of IDs live in a scene at one instant, handed to reference
/// sweeps so nodes can clear slots that point at removed nodes without
/// re-entering the store.
#[derive(Debug, Default)]
pub struct LiveIds {
    ids: HashSet<String>,
}

impl LiveIds {
    pub(crate) fn from_nodes<'a>(nodes: impl Iterator<Item = &'a NodeHandle>) -> Self {
        let ids = nodes.map(|n| n.borrow().core().id().to_string()).collect();
        LiveIds { ids }
    }

    /// Whether a node with this ID is currently live.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

/// Polymorphic contract implemented by every node kind.
///
/// Concrete types provide identity strings, a virtual constructor, and the
/// XML attribute hooks; the relationship hooks default to no-ops so node
/// kinds without compound structure implement only what they use.
pub trait SceneNode {
    /// Common record access.
    fn core(&self) -> &NodeCore;
    fn core_mut(&mut self) -> &mut NodeCore;

    /// Internal class name, the base for generated IDs.
    fn class_name(&self) -> &'static str;

    /// XML element tag, distinct from the class name.
    fn tag_name(&self) -> &'static str;

    /// Virtual constructor: a fresh, detached instance of the same
    /// concrete type with default field values.
    fn create_instance(&self) -> NodeHandle;

    /// Emits the node's typed fields as XML attribute pairs. Core
    /// attributes are emitted separately by the serializer.
    fn write_attributes(&self, atts: &mut Vec<(String, String)>);

    /// Parses XML attribute pairs into typed fields. Implementations must
    /// route core keys through [`NodeCore::read_core_attribute`] and
    /// ignore keys they do not recognize.
    fn read_attributes(&mut self, atts: &[(String, String)]);

    /// Copies every field value from `source` onto `self` in place,
    /// leaving `self`'s object identity untouched. The default routes the
    /// typed fields through the attribute hooks, which round-trip
    /// losslessly for the field grammars used here.
    fn copy_from(&mut self, source: &dyn SceneNode) {
        *self.core_mut() = source.core().clone();
        let mut atts = Vec::new();
        source.write_attributes(&mut atts);
        self.read_attributes(&atts);
    }

    /// Clears any reference slot naming an ID that is no longer live.
    /// Called by the scene after every removal; dangling references are a
    /// transient, self-healing condition, never an error.
    fn update_references(&mut self, _live: &LiveIds) {}

    /// Rewrites reference slots holding `old_id` to `new_id`. Used when an
    /// import assigns fresh IDs to colliding nodes.
    fn update_reference_id(&mut self, _old_id: &str, _new_id: &str) {}

    /// Post-load fixup, called once per node after a whole-scene load so
    /// forward references can be resolved.
    fn update_scene(&mut self, _live: &LiveIds) {}

    /// Parent-side hook of the deserializer's relationship handshake:
    /// `self` is the currently open element and `child` was just parsed
    /// nested beneath it.
    fn process_child(&mut self, _child: &mut dyn SceneNode) {}

    /// Child-side hook of the relationship handshake.
    fn process_parent(&mut self, _parent: &mut dyn SceneNode) {}

    /// Concrete-type access for callers that need typed fields.
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Creates an independent deep copy of a node: a fresh instance of the
/// same concrete type carrying the same field values, core included.
pub fn deep_copy(node: &NodeHandle) -> NodeHandle {
    let source = node.borrow();
    let copy = source.create_instance();
    copy.borrow_mut().copy_from(&*source);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::nodes::VolumeNode;

    #[test]
    fn test_core_attribute_round_trip() {
        let mut core = NodeCore::new();
        core.set_id("Volume1");
        core.set_name("head scan");
        core.set_attribute("patient", "anonymous");
        core.set_attribute("series", "3");

        let mut atts = Vec::new();
        core.write_core_attributes(&mut atts);

        let mut restored = NodeCore::new();
        for (k, v) in &atts {
            assert!(restored.read_core_attribute(k, v));
        }
        assert_eq!(restored.id(), "Volume1");
        assert_eq!(restored.name(), "head scan");
        assert_eq!(restored.attribute("patient"), Some("anonymous"));
        assert_eq!(restored.attribute("series"), Some("3"));
        // insertion order survives the packed encoding
        let keys: Vec<_> = restored.attributes().keys().cloned().collect();
        assert_eq!(keys, vec!["patient".to_string(), "series".to_string()]);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let node = VolumeNode::new_handle();
        {
            let mut n = node.borrow_mut();
            n.core_mut().set_id("Volume7");
            n.core_mut().set_name("original");
        }
        let copy = deep_copy(&node);
        assert!(!Rc::ptr_eq(&node, &copy));
        assert_eq!(copy.borrow().core().id(), "Volume7");

        node.borrow_mut().core_mut().set_name("mutated");
        assert_eq!(copy.borrow().core().name(), "original");
    }
}
