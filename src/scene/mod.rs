//! Scene graph system - node store, registry, persistence, undo/redo

// Core scene modules
pub mod error;
pub mod events;
pub mod ids;
pub mod node;
pub mod parser;
pub mod registry;
pub mod store;
pub mod undo;
pub mod xml;

// Built-in node kinds
pub mod nodes;

// Re-export core types
pub use error::{ErrorCode, SceneError};
pub use events::{ObserverId, SceneEvent};
pub use ids::IdAllocator;
pub use node::{deep_copy, LiveIds, NodeCore, NodeHandle, SceneNode, SceneTag};
pub use registry::{register_global_node_factory, GlobalNodeFactory, NodeRegistry};
pub use store::Scene;
pub use undo::DEFAULT_UNDO_STACK_SIZE;
