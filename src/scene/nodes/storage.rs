//! Volume storage node - where a volume's payload lives on disk

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::scene::node::{NodeCore, NodeHandle, SceneNode};

/// Records the file behind a volume. The path may be relative; it is
/// resolved against the scene's root directory at access time.
#[derive(Debug, Default)]
pub struct VolumeStorageNode {
    core: NodeCore,
    file_name: String,
}

impl VolumeStorageNode {
    pub const CLASS_NAME: &'static str = "VolumeStorageNode";
    pub const TAG_NAME: &'static str = "VolumeStorage";

    pub fn new_handle() -> NodeHandle {
        Rc::new(RefCell::new(VolumeStorageNode::default()))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    /// The stored path resolved against `root` when relative.
    pub fn full_path(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.file_name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

impl SceneNode for VolumeStorageNode {
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
        if !self.file_name.is_empty() {
            atts.push(("fileName".into(), self.file_name.clone()));
        }
    }

    fn read_attributes(&mut self, atts: &[(String, String)]) {
        for (key, value) in atts {
            if self.core.read_core_attribute(key, value) {
                continue;
            }
            if key == "fileName" {
                self.file_name = value.clone();
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
