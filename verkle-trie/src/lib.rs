#![doc = include_str!("../README.md")]

pub mod config;
pub mod constants;
pub mod errors;
pub mod proof;
pub mod trie;
pub mod types;

pub use config::{config, Config};
pub use errors::VerkleError;
pub use proof::{
    make_multiproof, tree_from_proof, verify_verkle_proof, verify_with_root, Proof, StateDiff,
    VerkleProof,
};
pub use trie::Node;
pub use types::{Key, Stem, Value};
