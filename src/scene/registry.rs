//! Node class registry - type-erased factories keyed by class name and tag

use std::sync::Mutex;

use log::{debug, warn};
use once_cell::sync::Lazy;

use super::node::{NodeHandle, SceneNode};

/// Factory function registered by external crates for node kinds the
/// scene-local registry does not know.
pub type GlobalNodeFactory = fn() -> NodeHandle;

/// Process-wide fallback factory table, consulted only when a scene-local
/// lookup misses. Plain function pointers keep the global `Sync`.
static GLOBAL_FACTORIES: Lazy<Mutex<Vec<(String, String, GlobalNodeFactory)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Registers a node factory process-wide under `class_name` and `tag`.
/// First registration wins on lookup, matching the scene-local policy.
pub fn register_global_node_factory(class_name: &str, tag: &str, factory: GlobalNodeFactory) {
    let mut table = GLOBAL_FACTORIES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    table.push((class_name.to_string(), tag.to_string(), factory));
    debug!("registered global node factory: {} <{}>", class_name, tag);
}

fn global_create_by_class(class_name: &str) -> Option<NodeHandle> {
    let table = GLOBAL_FACTORIES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    table
        .iter()
        .find(|(c, _, _)| c == class_name)
        .map(|(_, _, f)| f())
}

struct RegistryEntry {
    prototype: NodeHandle,
    class_name: &'static str,
    tag_name: &'static str,
}

/// Scene-local registry pairing prototype node instances with their class
/// and tag names.
///
/// Lookups scan in registration order and return the first match, so a
/// duplicate registration is recorded but can never shadow an earlier one.
#[derive(Default)]
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a prototype instance. The prototype is only ever used for
    /// its class/tag strings and its virtual constructor.
    pub fn register_node_class(&mut self, prototype: NodeHandle) {
        let (class_name, tag_name) = {
            let proto = prototype.borrow();
            (proto.class_name(), proto.tag_name())
        };
        if self.entries.iter().any(|e| e.class_name == class_name) {
            warn!(
                "duplicate node class registration for {}; first registration wins",
                class_name
            );
        }
        self.entries.push(RegistryEntry {
            prototype,
            class_name,
            tag_name,
        });
    }

    /// Creates a fresh instance of the named class, trying the local
    /// registry first and the process-wide factory table second. `None`
    /// when the class is entirely unknown.
    pub fn create_node_by_class(&self, class_name: &str) -> Option<NodeHandle> {
        if let Some(entry) = self.entries.iter().find(|e| e.class_name == class_name) {
            return Some(entry.prototype.borrow().create_instance());
        }
        if let Some(node) = global_create_by_class(class_name) {
            debug!("created {} through the global factory table", class_name);
            return Some(node);
        }
        None
    }

    /// Resolves an XML tag to its class name; first registration wins.
    pub fn class_name_by_tag(&self, tag: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|e| e.tag_name == tag)
            .map(|e| e.class_name)
    }

    /// Resolves a class name to its XML tag; first registration wins.
    pub fn tag_by_class_name(&self, class_name: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|e| e.class_name == class_name)
            .map(|e| e.tag_name)
    }

    /// Number of recorded registrations, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
