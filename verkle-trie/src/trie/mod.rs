//! The in-memory Verkle tree: node model, mutation and commitment
//! computation.

mod node;

pub use node::{InternalNode, LeafNode, Node};
