//! A prime-order group built on the Bandersnatch curve.
//!
//! Bandersnatch has a cofactor of 4; this crate quotients the curve by its
//! 2-torsion so that callers see a group of prime order, with a canonical
//! 32-byte serialization. All commitment arithmetic in the workspace goes
//! through [`Element`].

mod element;
mod trait_impls;

pub use element::{multi_scalar_mul, try_reduce_to_element, Element, Fr};

/// Arkworks traits needed by downstream crates, re-exported so they do not
/// have to depend on specific `ark-*` versions themselves.
pub mod trait_defs {
    pub use ark_ff::{batch_inversion, Field, One, PrimeField, Zero};
    pub use ark_serialize::{
        CanonicalDeserialize, CanonicalSerialize, Compress, SerializationError, Valid, Validate,
    };
}

pub use ark_ff::{batch_inversion, Field, One, PrimeField, Zero};
pub use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
