//! Arena document model consumed by the serialization engine.
//!
//! The tree is built once and read many times: nodes are appended, never
//! removed. Rendering facts (frames, visibility, selectability) are plain flags
//! the host's layout sets on nodes; this crate never computes them.

pub mod document;
mod flat_tree;
pub mod range;
pub mod traverse;
pub mod types;

pub use document::{Children, Document, TreeError};
pub use range::{Boundary, Range, Selection, TreeKind};
pub use types::{ElementData, Node, NodeData, NodeFlags, NodeId, NodeType, ShadowRootKind};
