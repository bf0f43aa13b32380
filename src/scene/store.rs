//! The scene store - single source of truth for node membership
//!
//! Owns the ordered node collection, the class registry, the ID allocator,
//! the undo/redo stacks, and the observer hub. All mutation of the graph
//! goes through here; external collaborators only construct and mutate
//! nodes via this API and listen for notifications.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, error, info, warn};

use super::error::{ErrorCode, SceneError};
use super::events::{ObserverHub, ObserverId, SceneEvent};
use super::ids::IdAllocator;
use super::node::{LiveIds, NodeHandle, SceneNode, SceneTag};
use super::parser;
use super::registry::NodeRegistry;
use super::undo::{SceneSnapshot, UndoStacks};
use super::xml;

/// The scene store. One per editing session.
///
/// The store is the sole strong owner of live nodes; undo/redo snapshots
/// hold additional strong handles while they alias live nodes. Single
/// threaded, cooperative: membership must not be mutated while iterating
/// over query results.
pub struct Scene {
    tag: SceneTag,
    nodes: Vec<NodeHandle>,
    registry: NodeRegistry,
    ids: IdAllocator,
    stacks: UndoStacks,
    undo_enabled: bool,
    in_undo: bool,
    observers: ObserverHub,
    url: Option<PathBuf>,
    root_directory: PathBuf,
    version: String,
    modified: bool,
    error_code: Option<ErrorCode>,
    /// Old ID -> new ID remaps recorded while adding nodes whose incoming
    /// IDs collided with live ones; consumed by the import fixup.
    referenced_id_changes: HashMap<String, String>,
}

impl Scene {
    /// Creates an empty scene with the built-in node classes registered.
    /// Undo recording starts disabled; call
    /// [`set_undo_enabled`](Self::set_undo_enabled) to turn it on.
    pub fn new() -> Self {
        let mut registry = NodeRegistry::new();
        super::nodes::register_default_nodes(&mut registry);
        Scene {
            tag: SceneTag::next(),
            nodes: Vec::new(),
            registry,
            ids: IdAllocator::new(),
            stacks: UndoStacks::default(),
            undo_enabled: false,
            in_undo: false,
            observers: ObserverHub::default(),
            url: None,
            root_directory: PathBuf::from("."),
            version: env!("CARGO_PKG_VERSION").to_string(),
            modified: false,
            error_code: None,
            referenced_id_changes: HashMap::new(),
        }
    }

    /// Identity tag carried by attached nodes as their back reference.
    pub fn tag(&self) -> SceneTag {
        self.tag
    }

    // ---- registry ----------------------------------------------------

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Registers a prototype for a node class; see
    /// [`NodeRegistry::register_node_class`].
    pub fn register_node_class(&mut self, prototype: NodeHandle) {
        self.registry.register_node_class(prototype);
    }

    /// Creates a detached instance of the named class, or `None` when the
    /// class is unknown to both the scene and the global factory table.
    pub fn create_node_by_class(&self, class_name: &str) -> Option<NodeHandle> {
        self.registry.create_node_by_class(class_name)
    }

    // ---- membership --------------------------------------------------

    /// Adds a node to the scene.
    ///
    /// Assigns an ID when the node has none; when the incoming ID collides
    /// with a live node (the import path) a fresh ID is assigned and the
    /// old one recorded for the reference-remap fixup. An empty name gets
    /// a per-class default. Fires `NodeAdded` synchronously.
    pub fn add_node(&mut self, node: NodeHandle) -> NodeHandle {
        if self.contains(&node) {
            warn!(
                "add_node: {} already in scene, ignoring",
                node.borrow().core().id()
            );
            return node;
        }

        let old_id = node.borrow().core().id().to_string();
        let collides = !old_id.is_empty() && self.node_by_id(&old_id).is_some();
        if old_id.is_empty() || collides {
            let class_name = node.borrow().class_name();
            let new_id = self.ids.unique_id_by_class(class_name);
            debug!("add_node: assigned {} to new {} node", new_id, class_name);
            if !old_id.is_empty() && old_id != new_id {
                self.referenced_id_changes.insert(old_id, new_id.clone());
            }
            node.borrow_mut().core_mut().set_id(new_id);
        } else {
            // an externally chosen ID joins the issued history so the
            // allocator never produces it
            self.ids.reserve_id(&old_id);
        }

        if node.borrow().core().name().is_empty() {
            let base = node.borrow().tag_name();
            let name = self.unique_name_by_base(base);
            node.borrow_mut().core_mut().set_name(name);
        }

        node.borrow_mut().core_mut().set_scene(Some(self.tag));
        self.nodes.push(node.clone());
        self.observers.dispatch(&SceneEvent::NodeAdded(node.clone()));
        self.modified = true;
        node
    }

    /// Removes a node from the scene, then sweeps every remaining node's
    /// reference slots so nothing keeps pointing at the removed ID. Fires
    /// `NodeRemoved` synchronously, before the sweep. Removing a node that
    /// is not a member is a logged no-op.
    pub fn remove_node(&mut self, node: &NodeHandle) {
        let Some(pos) = self.nodes.iter().position(|n| Rc::ptr_eq(n, node)) else {
            warn!("remove_node: node not in scene, ignoring");
            return;
        };
        // the local binding keeps the node alive through notification
        let removed = self.nodes.remove(pos);
        removed.borrow_mut().core_mut().set_scene(None);
        self.observers
            .dispatch(&SceneEvent::NodeRemoved(removed.clone()));

        let live = LiveIds::from_nodes(self.nodes.iter());
        for n in &self.nodes {
            n.borrow_mut().update_references(&live);
        }
        self.modified = true;
    }

    /// Whether this exact node instance is a member.
    pub fn contains(&self, node: &NodeHandle) -> bool {
        self.nodes.iter().any(|n| Rc::ptr_eq(n, node))
    }

    /// Releases every node and both undo stacks. The issued-ID history
    /// survives: a cleared scene still never reissues an old ID.
    pub fn clear(&mut self) {
        for n in &self.nodes {
            n.borrow_mut().core_mut().set_scene(None);
        }
        self.nodes.clear();
        self.clear_undo_stack();
        self.clear_redo_stack();
        self.observers.dispatch(&SceneEvent::SceneCleared);
        self.modified = true;
    }

    // ---- queries -----------------------------------------------------

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All members in order, as a fresh collection.
    pub fn nodes(&self) -> Vec<NodeHandle> {
        self.nodes.clone()
    }

    /// Linear scan by ID; `None` when absent.
    pub fn node_by_id(&self, id: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find(|n| n.borrow().core().id() == id)
            .cloned()
    }

    /// Scan by class and ID together.
    pub fn node_by_class_by_id(&self, class_name: &str, id: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find(|n| {
                let n = n.borrow();
                n.class_name() == class_name && n.core().id() == id
            })
            .cloned()
    }

    /// All members of a class, in membership order, as a fresh collection.
    pub fn nodes_by_class(&self, class_name: &str) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .filter(|n| n.borrow().class_name() == class_name)
            .cloned()
            .collect()
    }

    /// The `index`-th member of a class, by membership order.
    pub fn nth_node_by_class(&self, class_name: &str, index: usize) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .filter(|n| n.borrow().class_name() == class_name)
            .nth(index)
            .cloned()
    }

    pub fn number_of_nodes_by_class(&self, class_name: &str) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.borrow().class_name() == class_name)
            .count()
    }

    /// All members with this display name (names are not unique).
    pub fn nodes_by_name(&self, name: &str) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .filter(|n| n.borrow().core().name() == name)
            .cloned()
            .collect()
    }

    pub fn nodes_by_class_by_name(&self, class_name: &str, name: &str) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .filter(|n| {
                let n = n.borrow();
                n.class_name() == class_name && n.core().name() == name
            })
            .cloned()
            .collect()
    }

    // ---- identity ----------------------------------------------------

    /// Fresh scene-unique ID for a class; never reissued for the life of
    /// the scene, even after the owning node is removed.
    pub fn unique_id_by_class(&mut self, class_name: &str) -> String {
        self.ids.unique_id_by_class(class_name)
    }

    /// Marks an externally chosen ID as taken.
    pub fn reserve_id(&mut self, id: &str) {
        self.ids.reserve_id(id);
    }

    /// Fresh display name from `base`, avoiding names currently in use.
    pub fn unique_name_by_base(&mut self, base: &str) -> String {
        let live: HashSet<String> = self
            .nodes
            .iter()
            .map(|n| n.borrow().core().name().to_string())
            .collect();
        self.ids.unique_name_by_base(base, |c| live.contains(c))
    }

    // ---- load / save -------------------------------------------------

    /// URL of the last connect/commit, if any.
    pub fn url(&self) -> Option<&Path> {
        self.url.as_deref()
    }

    pub fn set_url(&mut self, url: impl Into<PathBuf>) {
        let url = url.into();
        if let Some(parent) = url.parent() {
            if !parent.as_os_str().is_empty() {
                self.root_directory = parent.to_path_buf();
            }
        }
        self.url = Some(url);
    }

    /// Directory against which nodes resolve relative storage paths.
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Replaces the scene contents with the document at `url`.
    ///
    /// On a read failure the in-memory scene is left untouched. Undo
    /// recording is suspended for the duration of the load, and every node
    /// gets an [`update_scene`](super::node::SceneNode::update_scene) pass
    /// once the whole document is in, so forward references resolve.
    pub fn connect(&mut self, url: &Path) -> Result<(), SceneError> {
        let text = match fs::read_to_string(url) {
            Ok(text) => text,
            Err(source) => {
                let err = SceneError::CannotOpenFile {
                    path: url.to_path_buf(),
                    source,
                };
                error!("connect: {}", err);
                self.error_code = Some(err.code());
                return Err(err);
            }
        };
        self.set_url(url);
        info!("connect: loading {}", url.display());
        self.connect_from_string(&text)
    }

    /// In-memory variant of [`connect`](Self::connect).
    pub fn connect_from_string(&mut self, text: &str) -> Result<(), SceneError> {
        let undo_was_enabled = self.undo_enabled;
        self.undo_enabled = false;
        self.clear();
        self.referenced_id_changes.clear();

        let parsed = parser::parse_scene_xml(text, self, None);
        if let Err(err) = parsed {
            error!("connect: {}", err);
            self.error_code = Some(err.code());
            self.undo_enabled = undo_was_enabled;
            return Err(err);
        }

        let live = LiveIds::from_nodes(self.nodes.iter());
        for n in &self.nodes {
            n.borrow_mut().update_scene(&live);
        }

        self.undo_enabled = undo_was_enabled;
        self.modified = false;
        self.error_code = None;
        Ok(())
    }

    /// Merges the document at `url` into the current scene without
    /// clearing it. Imported nodes whose IDs collide with live ones are
    /// reassigned, and references among the imported subset are rewritten
    /// to the fresh IDs.
    pub fn import(&mut self, url: &Path) -> Result<(), SceneError> {
        let text = match fs::read_to_string(url) {
            Ok(text) => text,
            Err(source) => {
                let err = SceneError::CannotOpenFile {
                    path: url.to_path_buf(),
                    source,
                };
                error!("import: {}", err);
                self.error_code = Some(err.code());
                return Err(err);
            }
        };
        info!("import: merging {}", url.display());
        self.import_from_string(&text)
    }

    /// In-memory variant of [`import`](Self::import).
    pub fn import_from_string(&mut self, text: &str) -> Result<(), SceneError> {
        let undo_was_enabled = self.undo_enabled;
        self.undo_enabled = false;
        self.referenced_id_changes.clear();

        let mut scratch: Vec<NodeHandle> = Vec::new();
        let parsed = parser::parse_scene_xml(text, self, Some(&mut scratch));
        if let Err(err) = parsed {
            error!("import: {}", err);
            self.error_code = Some(err.code());
            self.undo_enabled = undo_was_enabled;
            return Err(err);
        }

        for node in &scratch {
            self.add_node(node.clone());
        }

        if !self.referenced_id_changes.is_empty() {
            let changes: Vec<(String, String)> =
                self.referenced_id_changes.drain().collect();
            for node in &scratch {
                let mut n = node.borrow_mut();
                for (old_id, new_id) in &changes {
                    n.update_reference_id(old_id, new_id);
                }
            }
        }

        let live = LiveIds::from_nodes(self.nodes.iter());
        for node in &scratch {
            node.borrow_mut().update_scene(&live);
        }

        self.undo_enabled = undo_was_enabled;
        self.modified = true;
        self.error_code = None;
        Ok(())
    }

    /// Serializes the scene to `url`, or to the scene's own URL when
    /// `None`. The write is not atomic: a failure partway can leave a
    /// partial file behind.
    pub fn commit(&mut self, url: Option<&Path>) -> Result<(), SceneError> {
        let target = match url {
            Some(p) => p.to_path_buf(),
            None => match &self.url {
                Some(u) => u.clone(),
                None => {
                    let err = SceneError::NoUrl;
                    error!("commit: {}", err);
                    self.error_code = Some(err.code());
                    return Err(err);
                }
            },
        };

        let text = self.commit_to_string();
        let mut file = match File::create(&target) {
            Ok(f) => f,
            Err(source) => {
                let err = SceneError::CannotOpenFile {
                    path: target,
                    source,
                };
                error!("commit: {}", err);
                self.error_code = Some(err.code());
                return Err(err);
            }
        };
        if let Err(source) = file.write_all(text.as_bytes()) {
            let err = SceneError::Write {
                path: target,
                source,
            };
            error!("commit: {}", err);
            self.error_code = Some(err.code());
            return Err(err);
        }

        info!(
            "commit: wrote {} nodes to {}",
            self.nodes.len(),
            target.display()
        );
        self.set_url(target);
        self.error_code = None;
        self.modified = false;
        Ok(())
    }

    /// Serializes the scene to a string without touching the filesystem.
    pub fn commit_to_string(&self) -> String {
        xml::write_scene_xml(&self.nodes, &self.version)
    }

    /// Whether the scene changed since the last successful commit or load.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Coarse code of the last failed load/save, cleared on success.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error_code
    }

    // ---- undo / redo -------------------------------------------------

    pub fn set_undo_enabled(&mut self, enabled: bool) {
        self.undo_enabled = enabled;
    }

    pub fn undo_enabled(&self) -> bool {
        self.undo_enabled
    }

    /// Caps both stacks; the oldest snapshot is dropped on overflow.
    pub fn set_undo_stack_size(&mut self, size: usize) {
        self.stacks.set_limit(size);
    }

    pub fn undo_stack_size(&self) -> usize {
        self.stacks.limit()
    }

    pub fn number_of_undo_levels(&self) -> usize {
        self.stacks.undo_stack.len()
    }

    pub fn number_of_redo_levels(&self) -> usize {
        self.stacks.redo_stack.len()
    }

    /// Records the current scene state ahead of a mutation.
    ///
    /// Pushes a pointer-for-pointer snapshot of the membership, then
    /// replaces the slots of the named nodes with deep copies, freezing
    /// exactly the state about to change. Any fresh edit invalidates the
    /// forward history, so the redo stack is cleared first. No-op while
    /// undo recording is off or an undo/redo is in flight.
    pub fn save_state_for_undo(&mut self, nodes: &[NodeHandle]) {
        if !self.undo_enabled || self.in_undo {
            return;
        }
        self.clear_redo_stack();
        let mut snapshot = SceneSnapshot::capture(&self.nodes);
        for node in nodes {
            snapshot.replace_with_copy(node);
        }
        self.stacks.push_undo(snapshot);
    }

    /// Records the current state with every node deep-copied - the
    /// catch-all used when the caller cannot name what is about to change.
    pub fn save_state_for_undo_all(&mut self) {
        if !self.undo_enabled || self.in_undo {
            return;
        }
        let all = self.nodes.clone();
        self.save_state_for_undo(&all);
    }

    /// Steps the scene back to the top snapshot of the undo stack.
    ///
    /// The current state moves onto the redo stack. The diff is keyed by
    /// node ID: a node only in the snapshot was deleted since (re-add it),
    /// a node with a differing pointer was mutated (restore its field
    /// values in place, preserving the live object's identity), a node
    /// only in the live membership was created since (remove it). Silent
    /// no-op on an empty stack.
    pub fn undo(&mut self) {
        if !self.undo_enabled || self.stacks.undo_stack.is_empty() {
            return;
        }
        self.in_undo = true;
        self.stacks.push_redo(SceneSnapshot::capture(&self.nodes));
        if let Some(snapshot) = self.stacks.undo_stack.pop() {
            self.restore_snapshot(snapshot, CounterpartStack::Redo);
        }
        self.in_undo = false;
    }

    /// Exact mirror of [`undo`](Self::undo), consuming the redo stack.
    pub fn redo(&mut self) {
        if !self.undo_enabled || self.stacks.redo_stack.is_empty() {
            return;
        }
        self.in_undo = true;
        self.stacks.push_undo(SceneSnapshot::capture(&self.nodes));
        if let Some(snapshot) = self.stacks.redo_stack.pop() {
            self.restore_snapshot(snapshot, CounterpartStack::Undo);
        }
        self.in_undo = false;
    }

    pub fn clear_undo_stack(&mut self) {
        self.stacks.undo_stack.clear();
    }

    pub fn clear_redo_stack(&mut self) {
        self.stacks.redo_stack.clear();
    }

    fn restore_snapshot(&mut self, snapshot: SceneSnapshot, counterpart: CounterpartStack) {
        let snapshot_entries = snapshot.entries();
        let current_entries: Vec<(String, NodeHandle)> = self
            .nodes
            .iter()
            .map(|n| (n.borrow().core().id().to_string(), n.clone()))
            .collect();

        // deleted since the snapshot: re-add; mutated since: restore in
        // place, preserving the current state for the counterpart stack
        let mut add_back: Vec<NodeHandle> = Vec::new();
        for (id, snapshot_node) in &snapshot_entries {
            match current_entries.iter().find(|(cid, _)| cid == id) {
                None => add_back.push(snapshot_node.clone()),
                Some((_, live)) => {
                    if !Rc::ptr_eq(live, snapshot_node) {
                        let top = match counterpart {
                            CounterpartStack::Redo => self.stacks.redo_stack.last_mut(),
                            CounterpartStack::Undo => self.stacks.undo_stack.last_mut(),
                        };
                        if let Some(top) = top {
                            top.replace_with_copy(live);
                        }
                        live.borrow_mut().copy_from(&*snapshot_node.borrow());
                        self.observers
                            .dispatch(&SceneEvent::NodeModified(live.clone()));
                    }
                }
            }
        }

        // created since the snapshot: remove
        let remove: Vec<NodeHandle> = current_entries
            .iter()
            .filter(|(id, _)| !snapshot_entries.iter().any(|(sid, _)| sid == id))
            .map(|(_, n)| n.clone())
            .collect();

        for node in add_back {
            self.add_node(node);
        }
        for node in remove {
            // may already be gone as a side effect of an earlier removal
            if self.contains(&node) {
                self.remove_node(&node);
            }
        }
        self.modified = true;
    }

    // ---- observers ---------------------------------------------------

    /// Subscribes to every scene mutation. Delivery is synchronous,
    /// within the call stack of the mutation.
    pub fn observe(&mut self, callback: impl FnMut(&SceneEvent) + 'static) -> ObserverId {
        self.observers.observe(Box::new(callback))
    }

    /// Subscribes to mutations of the node with the given ID.
    pub fn observe_node(
        &mut self,
        node_id: &str,
        callback: impl FnMut(&SceneEvent) + 'static,
    ) -> ObserverId {
        self.observers.observe_node(node_id, Box::new(callback))
    }

    pub fn unobserve(&mut self, id: ObserverId) {
        self.observers.unobserve(id);
    }

    /// Announces that a node's fields were mutated through its handle.
    /// Fires `NodeModified` synchronously and marks the scene modified.
    pub fn notify_node_modified(&mut self, node: &NodeHandle) {
        self.observers
            .dispatch(&SceneEvent::NodeModified(node.clone()));
        self.modified = true;
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum CounterpartStack {
    Undo,
    Redo,
}
