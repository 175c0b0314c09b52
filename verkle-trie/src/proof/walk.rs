//! The per-key path walk: descends the tree along a key's stem, collecting
//! every opening the multipoint argument needs and classifying how the
//! lookup terminated.

use crate::constants::{
    make_ext_status, EXT_STATUS_ABSENT_EMPTY, EXT_STATUS_ABSENT_OTHER, EXT_STATUS_PRESENT,
    SUFFIX_SPLIT,
};
use crate::errors::VerkleError;
use crate::proof::elements::ProofElements;
use crate::trie::{LeafNode, Node};
use crate::types::{
    stem_of, stem_to_field, suffix_low_index, suffix_of, value_to_field_halves, Key, Stem,
};
use banderwagon::One;
use banderwagon::Fr;

/// Runs the walk for a whole sorted key list: merged openings, one status
/// byte per distinct stem, and the proof-of-absence stems in status order.
///
/// Keys sharing a stem classify identically, so only the first key of each
/// stem contributes a status.
pub(crate) fn collect_proof_items(
    root: &Node,
    sorted_keys: &[Key],
    collect_polys: bool,
) -> Result<(ProofElements, Vec<u8>, Vec<Stem>), VerkleError> {
    let mut pe = ProofElements::default();
    let mut ext_status = Vec::new();
    let mut poa_stems = Vec::new();

    let mut previous_stem: Option<Stem> = None;
    for key in sorted_keys {
        let (elements, status, alt) = walk(root, key, collect_polys)?;
        pe.merge(elements);

        let stem = stem_of(key);
        if previous_stem != Some(stem) {
            ext_status.push(status);
            if let Some(alt) = alt {
                poa_stems.push(alt);
            }
            previous_stem = Some(stem);
        }
    }

    Ok((pe, ext_status, poa_stems))
}

/// Walks `root` along `key` and returns the collected openings, the
/// extension status byte, and the resident stem when the lookup ended on
/// an extension for a different stem.
///
/// With `collect_polys` set, the opened polynomials are gathered for the
/// prover; the verifier walks reconstructed partial trees, which only know
/// commitments and queried values, and leaves them out.
pub(crate) fn walk(
    root: &Node,
    key: &Key,
    collect_polys: bool,
) -> Result<(ProofElements, u8, Option<Stem>), VerkleError> {
    let stem = stem_of(key);
    let mut pe = ProofElements::default();

    let mut node = root;
    let mut depth = 0usize;

    loop {
        match node {
            Node::Internal(internal) => {
                let commitment = internal.commitment.ok_or_else(|| {
                    VerkleError::ProveFailed("tree must be committed before proving".to_string())
                })?;
                pe.by_path.insert(stem[..depth].to_vec(), commitment);

                let z = stem[depth];
                let child = &internal.children[z as usize];
                pe.push(
                    commitment,
                    z,
                    child.field_value(),
                    collect_polys.then(|| internal.poly()),
                );

                if let Node::Empty = child {
                    // The lookup dead-ends in an empty slot one level down.
                    let status = make_ext_status(depth + 1, EXT_STATUS_ABSENT_EMPTY);
                    return Ok((pe, status, None));
                }

                node = child;
                depth += 1;
            }
            Node::Leaf(leaf) => return leaf_openings(leaf, key, depth, pe, collect_polys),
            Node::Empty => {
                return Err(VerkleError::ProveFailed(
                    "walk entered an empty root".to_string(),
                ))
            }
        }
    }
}

/// Openings contributed by the extension level. `depth` is the number of
/// stem bytes addressing the leaf.
fn leaf_openings(
    leaf: &LeafNode,
    key: &Key,
    depth: usize,
    mut pe: ProofElements,
    collect_polys: bool,
) -> Result<(ProofElements, u8, Option<Stem>), VerkleError> {
    let commitment = leaf.commitment.ok_or_else(|| {
        VerkleError::ProveFailed("tree must be committed before proving".to_string())
    })?;

    let stem = stem_of(key);
    let path = key[..depth].to_vec();
    pe.by_path.insert(path.clone(), commitment);

    if leaf.stem != stem {
        // Proof of absence: the slot is taken by an extension committing
        // to a different stem. Opening the marker and the stem slot shows
        // exactly that.
        let ext_poly = collect_polys.then(|| leaf.extension_poly());
        pe.push(commitment, 0, Fr::one(), ext_poly.clone());
        pe.push(commitment, 1, stem_to_field(&leaf.stem), ext_poly);

        let status = make_ext_status(depth, EXT_STATUS_ABSENT_OTHER);
        return Ok((pe, status, Some(leaf.stem)));
    }

    // The stem is present. Open the extension at the stem slot and at the
    // pointer to whichever value group covers the queried suffix, then open
    // that group at the two positions encoding the value.
    let suffix = suffix_of(key);
    let half = suffix as usize / SUFFIX_SPLIT;
    let group_z = 2 + half as u8;

    let group_commitment = leaf.sub_commitment(half).ok_or_else(|| {
        VerkleError::ProveFailed("value group commitment is missing".to_string())
    })?;

    let ext_poly = collect_polys.then(|| leaf.extension_poly());
    pe.push(commitment, 1, stem_to_field(&stem), ext_poly.clone());
    pe.push(
        commitment,
        group_z,
        group_commitment.map_to_scalar_field(),
        ext_poly,
    );
    let mut group_path = path;
    group_path.push(group_z);
    pe.by_path.insert(group_path, group_commitment);

    let suffix_poly = collect_polys.then(|| leaf.suffix_poly(half));
    let low_z = suffix_low_index(suffix) as u8;
    let (lo, hi) = value_to_field_halves(leaf.values[suffix as usize].as_ref());
    pe.push(group_commitment, low_z, lo, suffix_poly.clone());
    pe.push(group_commitment, low_z + 1, hi, suffix_poly);

    let status = make_ext_status(depth, EXT_STATUS_PRESENT);
    Ok((pe, status, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config;
    use crate::constants::split_ext_status;
    use crate::types::key_from_parts;

    #[test]
    fn present_key_under_the_root() {
        let cfg = config();

        let mut root = Node::new();
        let key = key_from_parts(&[7u8; 31], 3);
        root.insert(key, [1; 32]);
        root.commit(cfg);

        let (pe, status, alt) = walk(&root, &key, true).unwrap();

        assert_eq!(split_ext_status(status), (1, EXT_STATUS_PRESENT));
        assert!(alt.is_none());
        // Root opening, two extension openings, two value-group openings.
        assert_eq!(pe.cis.len(), 5);
        assert_eq!(pe.zis, vec![7, 1, 2, 6, 7]);
        // Root, extension, and C1 paths.
        assert_eq!(pe.by_path.len(), 3);
        assert!(pe.by_path.contains_key(&vec![]));
        assert!(pe.by_path.contains_key(&vec![7u8]));
        assert!(pe.by_path.contains_key(&vec![7u8, 2]));
    }

    #[test]
    fn high_suffix_opens_the_second_value_group() {
        let cfg = config();

        let mut root = Node::new();
        let key = key_from_parts(&[7u8; 31], 200);
        root.insert(key, [1; 32]);
        root.commit(cfg);

        let (pe, status, _) = walk(&root, &key, true).unwrap();

        assert_eq!(split_ext_status(status), (1, EXT_STATUS_PRESENT));
        // suffix 200: group pointer z = 3, low index = 2 * (200 - 128).
        assert_eq!(pe.zis, vec![7, 1, 3, 144, 145]);
        assert!(pe.by_path.contains_key(&vec![7u8, 3]));
    }

    #[test]
    fn empty_slot_reports_absent_empty() {
        let cfg = config();

        let mut root = Node::new();
        root.insert(key_from_parts(&[0u8; 31], 0), [1; 32]);
        root.commit(cfg);

        let query = key_from_parts(&[0xffu8; 31], 0);
        let (pe, status, alt) = walk(&root, &query, true).unwrap();

        assert_eq!(split_ext_status(status), (1, EXT_STATUS_ABSENT_EMPTY));
        assert!(alt.is_none());
        // Only the root was opened, at the empty child with y = 0.
        assert_eq!(pe.cis.len(), 1);
        assert_eq!(pe.by_path.len(), 1);
        assert_eq!(pe.yis[0], Fr::from(0u64));
    }

    #[test]
    fn foreign_stem_reports_absent_other() {
        let cfg = config();

        let mut resident = [0u8; 31];
        resident[0] = 1;

        let mut root = Node::new();
        root.insert(key_from_parts(&resident, 0), [1; 32]);
        root.commit(cfg);

        let mut queried = resident;
        queried[30] = 0xaa;
        let (pe, status, alt) = walk(&root, &key_from_parts(&queried, 0), true).unwrap();

        assert_eq!(split_ext_status(status), (1, EXT_STATUS_ABSENT_OTHER));
        assert_eq!(alt, Some(resident));
        // Root opening plus the marker and stem openings of the resident
        // extension.
        assert_eq!(pe.cis.len(), 3);
        assert_eq!(pe.zis, vec![1, 0, 1]);
        assert_eq!(pe.yis[1], Fr::one());
        assert_eq!(pe.yis[2], stem_to_field(&resident));
    }
}
