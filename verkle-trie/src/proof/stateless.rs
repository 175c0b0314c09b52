//! Stateless tree reconstruction.
//!
//! A verifier holds nothing but the root commitment. From a proof it
//! rebuilds exactly the partial tree the walk touched: internal nodes and
//! extensions carry the proof's commitments, leaves carry the queried
//! values. The rebuilt tree then answers the queried keys and re-derives
//! every opened `(commitment, point, evaluation)` triple for the final
//! check.

use crate::constants::{
    split_ext_status, EXT_STATUS_ABSENT_EMPTY, EXT_STATUS_ABSENT_OTHER, EXT_STATUS_PRESENT,
    STEM_LENGTH, SUFFIX_SPLIT,
};
use crate::errors::VerkleError;
use crate::proof::prover::Proof;
use crate::trie::{LeafNode, Node};
use crate::types::{stem_of, suffix_of, Stem, Value};
use banderwagon::Element;
use std::collections::BTreeMap;

/// How one terminal path materialises during reconstruction.
#[derive(Debug, Clone)]
enum StemInfo {
    /// The path ends in an empty slot; nothing to materialise.
    AbsentEmpty,
    /// The path holds an extension for a foreign stem; only its
    /// commitment and stem are known.
    AbsentOther { stem: Stem },
    /// The extension for the queried stem, with the queried values and
    /// flags for which value groups the proof committed to.
    Present {
        stem: Stem,
        values: Vec<(u8, Option<Value>)>,
        has_c1: bool,
        has_c2: bool,
    },
}

/// Rebuilds the partial tree for `proof` under the trusted root
/// commitment.
///
/// Fails with [`VerkleError::MalformedProof`] whenever the proof's counts
/// do not line up: statuses vs. distinct stems, proof-of-absence stems, or
/// the path-sorted commitment list.
pub fn tree_from_proof(proof: &Proof, root_commitment: Element) -> Result<Node, VerkleError> {
    if proof.keys.is_empty() {
        return Err(VerkleError::EmptyKeySet);
    }
    if proof.keys.len() != proof.values.len() {
        return Err(VerkleError::MalformedProof(
            "keys and values differ in length".to_string(),
        ));
    }
    if proof.keys.windows(2).any(|window| window[0] >= window[1]) {
        return Err(VerkleError::MalformedProof(
            "keys are not sorted and distinct".to_string(),
        ));
    }

    // Distinct stems in key order; keys are sorted, so consecutive
    // deduplication is exact.
    let mut stems: Vec<Stem> = Vec::new();
    for key in &proof.keys {
        let stem = stem_of(key);
        if stems.last() != Some(&stem) {
            stems.push(stem);
        }
    }

    if stems.len() != proof.ext_status.len() {
        return Err(VerkleError::MalformedProof(format!(
            "{} extension statuses for {} distinct stems",
            proof.ext_status.len(),
            stems.len()
        )));
    }

    // Classify each stem; stems sharing a terminal path collapse into one
    // entry (a present extension wins over a proof of absence for the
    // same slot).
    let mut info: BTreeMap<Vec<u8>, StemInfo> = BTreeMap::new();
    let mut poa_stems = proof.poa_stems.iter();

    for (stem, &status) in stems.iter().zip(proof.ext_status.iter()) {
        let (depth, classification) = split_ext_status(status);
        if depth == 0 || depth > STEM_LENGTH {
            return Err(VerkleError::MalformedProof(format!(
                "extension status depth {depth} out of range"
            )));
        }

        let path = stem[..depth].to_vec();
        match classification {
            EXT_STATUS_ABSENT_EMPTY => {
                info.entry(path).or_insert(StemInfo::AbsentEmpty);
            }
            EXT_STATUS_ABSENT_OTHER => {
                let resident = poa_stems.next().ok_or_else(|| {
                    VerkleError::MalformedProof("ran out of proof-of-absence stems".to_string())
                })?;
                info.entry(path)
                    .or_insert(StemInfo::AbsentOther { stem: *resident });
            }
            EXT_STATUS_PRESENT => {
                let mut values = Vec::new();
                let mut has_c1 = false;
                let mut has_c2 = false;
                for (key, value) in proof.keys.iter().zip(proof.values.iter()) {
                    if stem_of(key) == *stem {
                        let suffix = suffix_of(key);
                        values.push((suffix, *value));
                        has_c1 |= (suffix as usize) < SUFFIX_SPLIT;
                        has_c2 |= (suffix as usize) >= SUFFIX_SPLIT;
                    }
                }
                info.insert(
                    path,
                    StemInfo::Present {
                        stem: *stem,
                        values,
                        has_c1,
                        has_c2,
                    },
                );
            }
            other => {
                return Err(VerkleError::MalformedProof(format!(
                    "unknown extension status {other}"
                )));
            }
        }
    }

    if poa_stems.next().is_some() {
        return Err(VerkleError::MalformedProof(
            "unused proof-of-absence stems".to_string(),
        ));
    }

    // Materialise the paths in lexicographic order, consuming commitments
    // in lockstep with the proof's path-sorted commitment list.
    let mut root = Node::new_stateless_with_commitment(root_commitment);
    let mut cursor = 0usize;
    for (path, stem_info) in &info {
        insert_stem(&mut root, path, stem_info, &proof.commitments, &mut cursor)?;
    }

    if cursor != proof.commitments.len() {
        return Err(VerkleError::MalformedProof(format!(
            "{} of {} commitments consumed during reconstruction",
            cursor,
            proof.commitments.len()
        )));
    }

    Ok(root)
}

fn next_commitment(
    commitments: &[Element],
    cursor: &mut usize,
) -> Result<Element, VerkleError> {
    let commitment = commitments.get(*cursor).copied().ok_or_else(|| {
        VerkleError::MalformedProof("ran out of commitments during reconstruction".to_string())
    })?;
    *cursor += 1;
    Ok(commitment)
}

/// Installs one terminal path: materialises the internal nodes above it,
/// then the leaf or extension described by `info`.
fn insert_stem(
    root: &mut Node,
    path: &[u8],
    info: &StemInfo,
    commitments: &[Element],
    cursor: &mut usize,
) -> Result<(), VerkleError> {
    let mut node = root;
    for &path_byte in &path[..path.len() - 1] {
        let internal = match node {
            Node::Internal(internal) => internal,
            _ => {
                return Err(VerkleError::MalformedProof(
                    "a path crosses a non-internal node".to_string(),
                ))
            }
        };

        let child = &mut internal.children[path_byte as usize];
        if let Node::Empty = child {
            let commitment = next_commitment(commitments, cursor)?;
            *child = Node::new_stateless_with_commitment(commitment);
        }
        node = child;
    }

    let internal = match node {
        Node::Internal(internal) => internal,
        _ => {
            return Err(VerkleError::MalformedProof(
                "a path crosses a non-internal node".to_string(),
            ))
        }
    };
    let slot = &mut internal.children[path[path.len() - 1] as usize];
    if !matches!(slot, Node::Empty) {
        return Err(VerkleError::MalformedProof(
            "two terminal paths share a slot".to_string(),
        ));
    }

    match info {
        StemInfo::AbsentEmpty => {
            // The whole point: this slot stays empty.
        }
        StemInfo::AbsentOther { stem } => {
            let commitment = next_commitment(commitments, cursor)?;
            *slot = Node::Leaf(Box::new(LeafNode::new_stateless(
                *stem, commitment, None, None,
            )));
        }
        StemInfo::Present {
            stem,
            values,
            has_c1,
            has_c2,
        } => {
            let commitment = next_commitment(commitments, cursor)?;
            let c1 = if *has_c1 {
                Some(next_commitment(commitments, cursor)?)
            } else {
                None
            };
            let c2 = if *has_c2 {
                Some(next_commitment(commitments, cursor)?)
            } else {
                None
            };

            let mut leaf = LeafNode::new_stateless(*stem, commitment, c1, c2);
            for (suffix, value) in values {
                if let Some(value) = value {
                    leaf.values[*suffix as usize] = Some(*value);
                }
            }
            *slot = Node::Leaf(Box::new(leaf));
        }
    }

    Ok(())
}
