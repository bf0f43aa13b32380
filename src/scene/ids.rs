//! Unique node ID allocation and default name generation

use std::collections::{HashMap, HashSet};

/// Allocates scene-unique node IDs of the form `<ClassName><N>`.
///
/// Issued IDs are remembered for the life of the allocator and never
/// handed out again, even after the owning node is removed. This keeps
/// node references stable across undo/redo and serialization round trips.
#[derive(Debug, Default)]
pub struct IdAllocator {
    /// Every ID ever issued or reserved on this scene.
    issued: HashSet<String>,
    /// Next candidate index per class, one past the last chosen value.
    next_index: HashMap<String, u64>,
    /// Last index chosen per name base.
    name_index: HashMap<String, u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces a fresh ID for `class_name`, guaranteed distinct from
    /// every ID ever issued or reserved on this allocator.
    pub fn unique_id_by_class(&mut self, class_name: &str) -> String {
        let counter = self.next_index.entry(class_name.to_string()).or_insert(1);
        let mut index = *counter;
        let id = loop {
            let candidate = format!("{}{}", class_name, index);
            if !self.issued.contains(&candidate) {
                break candidate;
            }
            index += 1;
        };
        *counter = index + 1;
        self.issued.insert(id.clone());
        id
    }

    /// Marks an externally chosen ID as taken so it is never produced by
    /// [`unique_id_by_class`](Self::unique_id_by_class).
    pub fn reserve_id(&mut self, id: &str) {
        if !id.is_empty() {
            self.issued.insert(id.to_string());
        }
    }

    /// Whether an ID has ever been issued or reserved here.
    pub fn is_issued(&self, id: &str) -> bool {
        self.issued.contains(id)
    }

    /// Produces a display name from `base`: `base` itself first, then
    /// `base_1`, `base_2`… Unlike IDs, names only avoid *currently used*
    /// names, so removing a node frees its name for reuse.
    pub fn unique_name_by_base<F>(&mut self, base: &str, in_use: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        let last = self.name_index.get(base).copied().unwrap_or(0);
        let mut index = last;
        let name = loop {
            let candidate = if index == 0 {
                base.to_string()
            } else {
                format!("{}_{}", base, index)
            };
            if !in_use(&candidate) {
                break candidate;
            }
            index += 1;
        };
        self.name_index.insert(base.to_string(), index);
        name
    }
}
