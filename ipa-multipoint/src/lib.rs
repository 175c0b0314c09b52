//! Pedersen vector commitments over banderwagon, an inner product argument
//! in the style of BCMS20, and the multipoint opening scheme built on top
//! of it.

pub mod crs;
pub mod ipa;
pub mod lagrange_basis;
pub mod math_utils;
pub mod multiproof;
pub mod transcript;

// TODO: replace with a dedicated error enum once the callers need to
// distinguish failure causes.
pub(crate) type IOResult<T> = std::io::Result<T>;
pub(crate) type IOError = std::io::Error;
pub(crate) type IOErrorKind = std::io::ErrorKind;
