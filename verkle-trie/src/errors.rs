//! Error type for tree and proof operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerkleError {
    /// A proof was requested for zero keys; the opening primitive rejects
    /// empty inputs.
    #[error("proof requested for an empty key set")]
    EmptyKeySet,

    /// The proof bytes do not describe a well-formed proof: counts do not
    /// line up, a reconstruction ran out of commitments or proof-of-absence
    /// stems, or a wire field has the wrong shape.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// A 32-byte blob is not a valid group or field element.
    #[error("invalid {0} encoding")]
    InvalidEncoding(&'static str),

    /// Proof construction failed, e.g. the tree violated an internal
    /// invariant during the walk.
    #[error("prove failed: {0}")]
    ProveFailed(String),
}
