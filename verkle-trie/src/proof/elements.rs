//! Accumulator for the openings collected along queried paths.

use crate::errors::VerkleError;
use banderwagon::{Element, Fr};
use ipa_multipoint::lagrange_basis::LagrangeBasis;
use ipa_multipoint::multiproof::{ProverQuery, VerifierQuery};
use std::collections::BTreeMap;

/// Parallel lists of `(commitment, opening point, evaluation, polynomial)`
/// quadruples, plus one commitment per distinct tree path.
///
/// The quadruple order is significant: the opening primitive assumes index
/// alignment, and the verifier reproduces the exact same order when it
/// re-derives the lists from a reconstructed tree. A `(path, z)` pair may
/// occur more than once (two keys can open the same node, even at the same
/// position); a path maps to exactly one commitment.
#[derive(Debug, Clone, Default)]
pub struct ProofElements {
    pub cis: Vec<Element>,
    pub zis: Vec<u8>,
    pub yis: Vec<Fr>,
    /// Opened polynomials, index-aligned with `cis`. Left empty when the
    /// walk runs over a partial tree, which knows evaluations but not
    /// whole polynomials.
    pub fis: Vec<LagrangeBasis>,
    /// Deduplicated `path -> commitment` map. `BTreeMap` keeps the paths
    /// in lexicographic order, which is the canonical commitment order of
    /// the proof.
    pub by_path: BTreeMap<Vec<u8>, Element>,
}

impl ProofElements {
    pub(crate) fn push(
        &mut self,
        commitment: Element,
        z: u8,
        y: Fr,
        poly: Option<LagrangeBasis>,
    ) {
        self.cis.push(commitment);
        self.zis.push(z);
        self.yis.push(y);
        if let Some(poly) = poly {
            self.fis.push(poly);
        }
    }

    /// Concatenates `other`'s quadruples onto `self` and merges the path
    /// map, keeping the existing commitment for already-seen paths.
    pub fn merge(&mut self, other: ProofElements) {
        self.cis.extend(other.cis);
        self.zis.extend(other.zis);
        self.yis.extend(other.yis);
        self.fis.extend(other.fis);

        for (path, commitment) in other.by_path {
            self.by_path.entry(path).or_insert(commitment);
        }
    }

    /// The queries handed to the opening primitive, in insertion order.
    /// Fails if any polynomial is missing, i.e. the elements were gathered
    /// from a partial tree.
    pub fn prover_queries(&self) -> Result<Vec<ProverQuery>, VerkleError> {
        if self.fis.len() != self.cis.len() {
            return Err(VerkleError::ProveFailed(
                "opened polynomials are unavailable on a partial tree".to_string(),
            ));
        }

        Ok(self
            .cis
            .iter()
            .zip(self.zis.iter())
            .zip(self.yis.iter())
            .zip(self.fis.iter())
            .map(|(((commitment, z), y), poly)| ProverQuery {
                commitment: *commitment,
                poly: poly.clone(),
                point: *z as usize,
                result: *y,
            })
            .collect())
    }

    /// The verifier-side view of the same openings; polynomials are not
    /// needed for checking.
    pub fn verifier_queries(&self) -> Vec<VerifierQuery> {
        self.cis
            .iter()
            .zip(self.zis.iter())
            .zip(self.yis.iter())
            .map(|((commitment, z), y)| VerifierQuery {
                commitment: *commitment,
                point: Fr::from(*z as u128),
                result: *y,
            })
            .collect()
    }

    /// All commitments except the root's, sorted by path. The root is
    /// excluded because the verifier already holds it.
    pub fn sorted_non_root_commitments(&self) -> Vec<Element> {
        self.by_path
            .iter()
            .filter(|(path, _)| !path.is_empty())
            .map(|(_, commitment)| *commitment)
            .collect()
    }
}
