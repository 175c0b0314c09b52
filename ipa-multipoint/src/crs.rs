//! Common Reference String (CRS) for the Pedersen commitment scheme.
//!
//! The CRS consists of `n` value-binding generators `G` and one extra
//! generator `Q` used by the inner product argument. The points are derived
//! deterministically from a seed with a hash-to-curve construction, so every
//! party can reproduce and audit the setup.

use crate::{ipa::slow_vartime_multiscalar_mul, lagrange_basis::LagrangeBasis};
use banderwagon::{try_reduce_to_element, Element};

/// The seed shared by Verkle implementations for the 256-wide trie domain.
pub const VERKLE_SEED: &[u8] = b"eth_verkle_oct_2021";

#[allow(non_snake_case)]
#[derive(Debug, Clone)]
pub struct CRS {
    /// Capacity of the CRS (i.e., the maximum size of a vector that can be
    /// committed to using this CRS)
    pub n: usize,
    /// An array of `n` value-binding generators.
    pub G: Vec<Element>,
    /// Blinding generator.
    pub Q: Element,
}

impl Default for CRS {
    fn default() -> Self {
        CRS::new(256, VERKLE_SEED)
    }
}

impl CRS {
    /// Creates a new CRS with capacity `n` from a deterministic seed.
    #[allow(non_snake_case)]
    pub fn new(n: usize, seed: &'static [u8]) -> CRS {
        // Generate n+1 points: n for G and 1 for Q
        let all_points = generate_random_elements(n + 1, seed);
        let (G, q_slice) = all_points.split_at(n);
        let G = G.to_vec();
        let Q = q_slice[0];

        CRS::assert_dedup(&all_points);

        CRS { n, G, Q }
    }

    /// Returns the maximum number of elements that can be committed to.
    pub fn max_number_of_elements(&self) -> usize {
        self.n
    }

    /// Asserts that none of the generated points are duplicates. Duplicate
    /// generators would break the binding property of the commitments.
    fn assert_dedup(points: &[Element]) {
        use std::collections::HashSet;
        let mut map = HashSet::new();
        for point in points {
            let value_is_new = map.insert(point.to_bytes());
            assert!(value_is_new, "crs has duplicated points")
        }
    }

    /// Commits to a polynomial in Lagrange basis form: the multiscalar
    /// multiplication of the evaluations with the generators.
    pub fn commit_lagrange_poly(&self, polynomial: &LagrangeBasis) -> Element {
        slow_vartime_multiscalar_mul(polynomial.values().iter(), self.G.iter())
    }
}

impl std::ops::Index<usize> for CRS {
    type Output = Element;

    fn index(&self, index: usize) -> &Self::Output {
        &self.G[index]
    }
}

/// Derives curve points by hashing `seed || index` with SHA-256 and lifting
/// the digest to a group element, incrementing the index until enough valid
/// points were found. Deterministic, and no party knows discrete log
/// relations between the outputs.
fn generate_random_elements(num_required_points: usize, seed: &'static [u8]) -> Vec<Element> {
    use sha2::{Digest, Sha256};

    let hash_to_x = |index: u64| -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(index.to_be_bytes());
        hasher.finalize().to_vec()
    };

    (0u64..)
        .map(hash_to_x)
        .filter_map(|hash_bytes| try_reduce_to_element(&hash_bytes))
        .take(num_required_points)
        .collect()
}
