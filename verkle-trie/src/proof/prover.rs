//! Proof construction: one multipoint opening covering every queried key.

use crate::config::Config;
use crate::errors::VerkleError;
use crate::proof::walk::collect_proof_items;
use crate::trie::Node;
use crate::types::{Key, Stem, Value};
use banderwagon::{Element, Fr};
use ipa_multipoint::{
    multiproof::{MultiPoint, MultiPointProof},
    transcript::Transcript,
};
use rayon::prelude::*;

/// A complete, self-contained proof for a set of keys against one tree.
///
/// Built in one pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// The aggregated multipoint opening.
    pub multipoint: MultiPointProof,
    /// One status byte per distinct queried stem, in sorted stem order.
    pub ext_status: Vec<u8>,
    /// Every commitment touched by the walk except the root's, sorted
    /// ascending by tree path.
    pub commitments: Vec<Element>,
    /// For each ABSENT_OTHER status, the resident stem proving the queried
    /// stem absent, in status order.
    pub poa_stems: Vec<Stem>,
    /// The queried keys, sorted and deduplicated.
    pub keys: Vec<Key>,
    /// The observed value per key; `None` marks an absent key.
    pub values: Vec<Option<Value>>,
}

/// Builds a proof for `keys` against `root`, which is committed on entry
/// if it was not already.
///
/// Also returns the `(C, z, y)` opening lists, so a caller holding the
/// tree can verify immediately without reconstructing anything.
pub fn make_multiproof(
    root: &mut Node,
    keys: &[Key],
    cfg: &Config,
) -> Result<(Proof, Vec<Element>, Vec<u8>, Vec<Fr>), VerkleError> {
    if keys.is_empty() {
        return Err(VerkleError::EmptyKeySet);
    }

    let mut keys = keys.to_vec();
    // Sorting makes the output canonical and groups keys sharing a stem;
    // skip the sort when the caller already complied.
    let needs_sorting = keys.windows(2).any(|window| window[0] > window[1]);
    if needs_sorting {
        keys.par_sort_unstable();
    }
    keys.dedup();

    root.commit(cfg);

    let (pe, ext_status, poa_stems) = collect_proof_items(root, &keys, true)?;

    let values: Vec<Option<Value>> = keys.iter().map(|key| root.get(key)).collect();
    let commitments = pe.sorted_non_root_commitments();

    let mut transcript = Transcript::new(cfg.transcript_label);
    let queries = pe.prover_queries()?;
    let multipoint = MultiPoint::open(
        cfg.crs.clone(),
        &cfg.precomputed_weights,
        &mut transcript,
        queries,
    );

    let proof = Proof {
        multipoint,
        ext_status,
        commitments,
        poa_stems,
        keys,
        values,
    };

    Ok((proof, pe.cis, pe.zis, pe.yis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config;
    use crate::constants::{
        split_ext_status, EXT_STATUS_ABSENT_EMPTY, EXT_STATUS_ABSENT_OTHER, EXT_STATUS_PRESENT,
    };
    use crate::types::key_from_parts;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn empty_key_set_is_rejected() {
        let cfg = config();
        let mut root = Node::new();
        root.insert([0u8; 32], [1; 32]);

        let result = make_multiproof(&mut root, &[], cfg);
        assert!(matches!(result, Err(VerkleError::EmptyKeySet)));
    }

    #[test]
    fn single_present_key() {
        let cfg = config();

        let key = [0u8; 32];
        let value = [1u8; 32];
        let mut root = Node::new();
        root.insert(key, value);

        let (proof, _, _, _) = make_multiproof(&mut root, &[key], cfg).unwrap();

        assert_eq!(proof.keys, vec![key]);
        assert_eq!(proof.values, vec![Some(value)]);
        assert_eq!(proof.ext_status.len(), 1);
        assert_eq!(
            split_ext_status(proof.ext_status[0]),
            (1, EXT_STATUS_PRESENT)
        );
        assert!(proof.poa_stems.is_empty());
        // Extension commitment plus its C1 group; the root is excluded.
        assert_eq!(proof.commitments.len(), 2);
    }

    #[test]
    fn absence_in_an_empty_slot() {
        let cfg = config();

        let mut root = Node::new();
        root.insert(key_from_parts(&[0u8; 31], 0), [1; 32]);

        let query = key_from_parts(&[0xffu8; 31], 0);
        let (proof, _, _, _) = make_multiproof(&mut root, &[query], cfg).unwrap();

        assert_eq!(proof.ext_status, vec![0b0000_1_010]);
        assert!(proof.poa_stems.is_empty());
        assert_eq!(proof.values, vec![None]);
        assert!(proof.commitments.is_empty());
    }

    #[test]
    fn absence_behind_a_foreign_stem_at_depth_two() {
        let cfg = config();

        // Two stems diverging at their second byte force the extensions
        // down to depth 2; the queried stem shares that prefix but hits
        // the resident extension of stem_a.
        let mut stem_a = [0u8; 31];
        stem_a[0] = 0x01;
        stem_a[1] = 0x02;
        stem_a[2] = 0xaa;
        let mut stem_b = [0u8; 31];
        stem_b[0] = 0x01;
        stem_b[1] = 0x03;

        let mut root = Node::new();
        root.insert(key_from_parts(&stem_a, 0), [1; 32]);
        root.insert(key_from_parts(&stem_b, 0), [2; 32]);

        let mut queried = stem_a;
        queried[2] = 0x00;
        let (proof, _, _, _) =
            make_multiproof(&mut root, &[key_from_parts(&queried, 0)], cfg).unwrap();

        assert_eq!(proof.ext_status.len(), 1);
        assert_eq!(
            split_ext_status(proof.ext_status[0]),
            (2, EXT_STATUS_ABSENT_OTHER)
        );
        assert_eq!(proof.poa_stems, vec![stem_a]);
        assert_eq!(proof.values, vec![None]);
    }

    #[test]
    fn shared_stem_emits_one_status() {
        let cfg = config();

        let stem = [9u8; 31];
        let k1 = key_from_parts(&stem, 0);
        let k2 = key_from_parts(&stem, 0x80);

        let mut root = Node::new();
        root.insert(k1, [1; 32]);
        root.insert(k2, [2; 32]);

        let (proof, _, _, _) = make_multiproof(&mut root, &[k2, k1], cfg).unwrap();

        assert_eq!(proof.keys, vec![k1, k2]);
        assert_eq!(proof.ext_status.len(), 1);
        // Extension, C1 and C2 commitments.
        assert_eq!(proof.commitments.len(), 3);
    }

    #[test]
    fn present_and_absent_statuses_mix() {
        let cfg = config();
        let mut rng = StdRng::seed_from_u64(42);

        let mut root = Node::new();
        let mut present = Vec::new();
        for _ in 0..20 {
            let key: Key = rng.gen();
            root.insert(key, rng.gen());
            present.push(key);
        }

        let mut queries = present.clone();
        queries.push([0x55u8; 32]);

        let (proof, _, _, _) = make_multiproof(&mut root, &queries, cfg).unwrap();

        let mut statuses: Vec<u8> = proof
            .ext_status
            .iter()
            .map(|status| split_ext_status(*status).1)
            .collect();
        statuses.sort_unstable();
        statuses.dedup();
        assert!(statuses.iter().all(|s| [
            EXT_STATUS_ABSENT_OTHER,
            EXT_STATUS_PRESENT,
            EXT_STATUS_ABSENT_EMPTY
        ]
        .contains(s)));

        // Every present key reports its value.
        for (key, value) in proof.keys.iter().zip(proof.values.iter()) {
            assert_eq!(root.get(key), *value);
        }
    }
}
