//! Proof generation, serialization, and stateless verification.

pub mod elements;
pub mod prover;
pub mod serialize;
pub mod stateless;
pub mod verifier;
mod walk;

pub use elements::ProofElements;
pub use prover::{make_multiproof, Proof};
pub use serialize::{
    IpaProofWire, StateDiff, StemStateDiff, SuffixStateDiff, VerkleProof,
};
pub use stateless::tree_from_proof;
pub use verifier::{verify_verkle_proof, verify_with_root};
