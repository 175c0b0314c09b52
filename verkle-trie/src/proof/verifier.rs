//! Proof verification.

use crate::config::Config;
use crate::errors::VerkleError;
use crate::proof::prover::Proof;
use crate::proof::stateless::tree_from_proof;
use crate::proof::walk::collect_proof_items;
use banderwagon::{Element, Fr};
use ipa_multipoint::{multiproof::VerifierQuery, transcript::Transcript};

/// Checks the aggregated opening against caller-derived `(C, z, y)` lists.
///
/// The lists must be index-aligned with each other and ordered exactly as
/// during proof construction; that alignment is the caller's
/// responsibility. Returns a verdict, never an error.
pub fn verify_verkle_proof(
    proof: &Proof,
    commitments: &[Element],
    z_indices: &[u8],
    ys: &[Fr],
    cfg: &Config,
) -> bool {
    if commitments.len() != z_indices.len() || commitments.len() != ys.len() {
        return false;
    }

    let queries: Vec<VerifierQuery> = commitments
        .iter()
        .zip(z_indices.iter())
        .zip(ys.iter())
        .map(|((commitment, z), y)| VerifierQuery {
            commitment: *commitment,
            point: Fr::from(*z as u128),
            result: *y,
        })
        .collect();

    let mut transcript = Transcript::new(cfg.transcript_label);
    proof
        .multipoint
        .check(&cfg.crs, &cfg.precomputed_weights, &queries, &mut transcript)
}

/// Full stateless verification: rebuilds the partial tree from the proof
/// and the trusted root commitment, re-derives every opening from it, and
/// checks the multipoint argument.
///
/// Structural defects in the proof surface as errors; a cryptographic
/// mismatch surfaces as `Ok(false)`.
pub fn verify_with_root(
    proof: &Proof,
    root_commitment: Element,
    cfg: &Config,
) -> Result<bool, VerkleError> {
    let tree = tree_from_proof(proof, root_commitment)?;

    let (pe, ext_status, poa_stems) = collect_proof_items(&tree, &proof.keys, false)?;

    // The rebuilt tree must tell the same story as the proof; otherwise
    // the openings below would be checked against the wrong statement.
    if ext_status != proof.ext_status {
        return Err(VerkleError::MalformedProof(
            "extension statuses diverge from the reconstructed tree".to_string(),
        ));
    }
    if poa_stems != proof.poa_stems {
        return Err(VerkleError::MalformedProof(
            "proof-of-absence stems diverge from the reconstructed tree".to_string(),
        ));
    }

    Ok(verify_verkle_proof(proof, &pe.cis, &pe.zis, &pe.yis, cfg))
}
