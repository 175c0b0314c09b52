//! The wire format.
//!
//! A proof travels as two containers: [`VerkleProof`], holding the
//! cryptographic material (absence stems, extension statuses, path-sorted
//! commitments and the multipoint opening), and [`StateDiff`], holding the
//! queried keys and values grouped per stem. The JSON encoding of every
//! fixed-size byte field is lowercase hex without a `0x` prefix, with
//! exact length validation.
//!
//! The legacy length-prefixed binary layout is kept for compatibility:
//! `u32 LE |poa| || stems || u32 LE |ext| || ext bytes ||
//!  u32 LE |C| || 32·|C| bytes || D || L[0..8] || R[0..8] || a`.
//! It predates the per-stem grouping and carries no keys or values.

use crate::constants::{IPA_PROOF_DEPTH, POINT_BYTES, SCALAR_BYTES, STEM_LENGTH};
use crate::errors::VerkleError;
use crate::proof::prover::Proof;
use crate::types::{key_from_parts, stem_of, suffix_of, Key, Stem, Value};
use banderwagon::{trait_defs::*, Element, Fr};
use ipa_multipoint::{ipa::IPAProof, multiproof::MultiPointProof};
use serde::{Deserialize, Serialize};

/// The cryptographic half of a serialized proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerkleProof {
    #[serde(with = "hex_vec")]
    pub other_stems: Vec<[u8; STEM_LENGTH]>,
    #[serde(with = "hex_bytes_vec")]
    pub depth_extension_present: Vec<u8>,
    #[serde(with = "hex_vec")]
    pub commitments_by_path: Vec<[u8; POINT_BYTES]>,
    #[serde(with = "hex_fixed")]
    pub d: [u8; POINT_BYTES],
    pub ipa_proof: IpaProofWire,
}

/// The fixed eight-round IPA transcript inside a [`VerkleProof`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpaProofWire {
    #[serde(with = "hex_rounds")]
    pub cl: [[u8; POINT_BYTES]; IPA_PROOF_DEPTH],
    #[serde(with = "hex_rounds")]
    pub cr: [[u8; POINT_BYTES]; IPA_PROOF_DEPTH],
    #[serde(with = "hex_fixed")]
    pub final_evaluation: [u8; SCALAR_BYTES],
}

/// One queried suffix of a stem; an omitted value marks absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuffixStateDiff {
    pub suffix: u8,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_opt")]
    pub current_value: Option<[u8; 32]>,
}

/// All queried suffixes of one stem, in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StemStateDiff {
    #[serde(with = "hex_fixed")]
    pub stem: [u8; STEM_LENGTH],
    pub suffix_diffs: Vec<SuffixStateDiff>,
}

/// The queried key/value half of a serialized proof, grouped by stem.
pub type StateDiff = Vec<StemStateDiff>;

impl Proof {
    /// Converts the in-memory proof into its two wire containers.
    pub fn to_wire(&self) -> Result<(VerkleProof, StateDiff), VerkleError> {
        let ipa = &self.multipoint.open_proof;
        if ipa.L_vec.len() != IPA_PROOF_DEPTH || ipa.R_vec.len() != IPA_PROOF_DEPTH {
            return Err(VerkleError::MalformedProof(format!(
                "ipa proof has {} rounds instead of {IPA_PROOF_DEPTH}",
                ipa.L_vec.len()
            )));
        }

        let verkle_proof = VerkleProof {
            other_stems: self.poa_stems.clone(),
            depth_extension_present: self.ext_status.clone(),
            commitments_by_path: self.commitments.iter().map(Element::to_bytes).collect(),
            d: self.multipoint.g_x_comm.to_bytes(),
            ipa_proof: IpaProofWire {
                cl: point_rounds(&ipa.L_vec)?,
                cr: point_rounds(&ipa.R_vec)?,
                final_evaluation: fr_to_bytes(&ipa.a),
            },
        };

        Ok((verkle_proof, state_diff_from_keys(&self.keys, &self.values)))
    }

    /// Rebuilds the in-memory proof from its wire containers.
    ///
    /// Commitment decoding is *trusted* (no subgroup check): the decoded
    /// points feed straight into a multipoint verification, which fails on
    /// anything inconsistent.
    pub fn from_wire(proof: &VerkleProof, diff: &StateDiff) -> Result<Proof, VerkleError> {
        let commitments = proof
            .commitments_by_path
            .iter()
            .map(|bytes| decode_point_trusted(bytes))
            .collect::<Result<Vec<_>, _>>()?;

        let (keys, values) = keys_from_state_diff(diff)?;

        Ok(Proof {
            multipoint: multipoint_from_wire(&proof.d, &proof.ipa_proof)?,
            ext_status: proof.depth_extension_present.clone(),
            commitments,
            poa_stems: proof.other_stems.clone(),
            keys,
            values,
        })
    }

    /// Serializes into the legacy binary layout.
    pub fn write_legacy(&self) -> Result<Vec<u8>, VerkleError> {
        let ipa = &self.multipoint.open_proof;
        if ipa.L_vec.len() != IPA_PROOF_DEPTH || ipa.R_vec.len() != IPA_PROOF_DEPTH {
            return Err(VerkleError::MalformedProof(format!(
                "ipa proof has {} rounds instead of {IPA_PROOF_DEPTH}",
                ipa.L_vec.len()
            )));
        }

        let mut bytes = Vec::new();

        bytes.extend((self.poa_stems.len() as u32).to_le_bytes());
        for stem in &self.poa_stems {
            bytes.extend_from_slice(stem);
        }

        bytes.extend((self.ext_status.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.ext_status);

        bytes.extend((self.commitments.len() as u32).to_le_bytes());
        for commitment in &self.commitments {
            bytes.extend(commitment.to_bytes());
        }

        bytes.extend(self.multipoint.g_x_comm.to_bytes());
        for left in &ipa.L_vec {
            bytes.extend(left.to_bytes());
        }
        for right in &ipa.R_vec {
            bytes.extend(right.to_bytes());
        }
        bytes.extend(fr_to_bytes(&ipa.a));

        Ok(bytes)
    }

    /// Deserializes the legacy binary layout. The legacy format carries no
    /// keys or values, so the resulting proof cannot drive a stateless
    /// reconstruction on its own.
    pub fn read_legacy(bytes: &[u8]) -> Result<Proof, VerkleError> {
        let mut reader = ByteReader::new(bytes);

        let num_poa_stems = reader.read_u32()? as usize;
        let mut poa_stems = Vec::with_capacity(num_poa_stems);
        for _ in 0..num_poa_stems {
            poa_stems.push(reader.read_array::<STEM_LENGTH>()?);
        }

        let num_ext_status = reader.read_u32()? as usize;
        let ext_status = reader.read_slice(num_ext_status)?.to_vec();

        let num_commitments = reader.read_u32()? as usize;
        let mut commitments = Vec::with_capacity(num_commitments);
        for _ in 0..num_commitments {
            commitments.push(decode_point_trusted(&reader.read_array::<POINT_BYTES>()?)?);
        }

        let d = reader.read_array::<POINT_BYTES>()?;
        let mut rounds = [[0u8; POINT_BYTES]; IPA_PROOF_DEPTH];
        for round in rounds.iter_mut() {
            *round = reader.read_array::<POINT_BYTES>()?;
        }
        let cl = rounds;
        for round in rounds.iter_mut() {
            *round = reader.read_array::<POINT_BYTES>()?;
        }
        let cr = rounds;
        let final_evaluation = reader.read_array::<SCALAR_BYTES>()?;
        reader.finish()?;

        let ipa_proof = IpaProofWire {
            cl,
            cr,
            final_evaluation,
        };

        Ok(Proof {
            multipoint: multipoint_from_wire(&d, &ipa_proof)?,
            ext_status,
            commitments,
            poa_stems,
            keys: Vec::new(),
            values: Vec::new(),
        })
    }
}

/// Groups sorted keys into per-stem diffs: a new group starts whenever the
/// stem changes; suffixes follow key order.
pub fn state_diff_from_keys(keys: &[Key], values: &[Option<Value>]) -> StateDiff {
    let mut diff: StateDiff = Vec::new();

    for (key, value) in keys.iter().zip(values.iter()) {
        let stem = stem_of(key);
        if diff.last().map(|group| group.stem) != Some(stem) {
            diff.push(StemStateDiff {
                stem,
                suffix_diffs: Vec::new(),
            });
        }
        diff.last_mut()
            .expect("a group was just pushed")
            .suffix_diffs
            .push(SuffixStateDiff {
                suffix: suffix_of(key),
                current_value: *value,
            });
    }

    diff
}

/// Expands a state diff back into parallel key and value lists, validating
/// the canonical ordering: stems strictly ascending, suffixes strictly
/// ascending within each stem.
pub fn keys_from_state_diff(
    diff: &StateDiff,
) -> Result<(Vec<Key>, Vec<Option<Value>>), VerkleError> {
    let mut keys = Vec::new();
    let mut values = Vec::new();

    let mut previous_stem: Option<Stem> = None;
    for group in diff {
        if previous_stem.is_some_and(|previous| previous >= group.stem) {
            return Err(VerkleError::MalformedProof(
                "state diff stems are not sorted and distinct".to_string(),
            ));
        }
        previous_stem = Some(group.stem);

        let mut previous_suffix: Option<u8> = None;
        for suffix_diff in &group.suffix_diffs {
            if previous_suffix.is_some_and(|previous| previous >= suffix_diff.suffix) {
                return Err(VerkleError::MalformedProof(
                    "state diff suffixes are not sorted and distinct".to_string(),
                ));
            }
            previous_suffix = Some(suffix_diff.suffix);

            keys.push(key_from_parts(&group.stem, suffix_diff.suffix));
            values.push(suffix_diff.current_value);
        }
    }

    Ok((keys, values))
}

fn multipoint_from_wire(
    d: &[u8; POINT_BYTES],
    ipa: &IpaProofWire,
) -> Result<MultiPointProof, VerkleError> {
    let decode_rounds = |rounds: &[[u8; POINT_BYTES]; IPA_PROOF_DEPTH]| {
        rounds
            .iter()
            .map(|bytes| decode_point_trusted(bytes))
            .collect::<Result<Vec<_>, _>>()
    };

    Ok(MultiPointProof {
        g_x_comm: decode_point_trusted(d)?,
        open_proof: IPAProof {
            L_vec: decode_rounds(&ipa.cl)?,
            R_vec: decode_rounds(&ipa.cr)?,
            a: fr_from_bytes(&ipa.final_evaluation)?,
        },
    })
}

fn decode_point_trusted(bytes: &[u8; POINT_BYTES]) -> Result<Element, VerkleError> {
    Element::from_bytes_unchecked(bytes).ok_or(VerkleError::InvalidEncoding("point"))
}

fn fr_to_bytes(scalar: &Fr) -> [u8; SCALAR_BYTES] {
    let mut bytes = [0u8; SCALAR_BYTES];
    scalar
        .serialize_compressed(&mut bytes[..])
        .expect("a scalar always fits 32 bytes");
    bytes
}

fn fr_from_bytes(bytes: &[u8; SCALAR_BYTES]) -> Result<Fr, VerkleError> {
    Fr::deserialize_compressed(&bytes[..]).map_err(|_| VerkleError::InvalidEncoding("scalar"))
}

fn point_rounds(
    points: &[Element],
) -> Result<[[u8; POINT_BYTES]; IPA_PROOF_DEPTH], VerkleError> {
    let encoded: Vec<[u8; POINT_BYTES]> = points.iter().map(Element::to_bytes).collect();
    encoded.try_into().map_err(|_| {
        VerkleError::MalformedProof(format!("expected {IPA_PROOF_DEPTH} ipa rounds"))
    })
}

struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes }
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], VerkleError> {
        if self.bytes.len() < len {
            return Err(VerkleError::MalformedProof(
                "unexpected end of proof bytes".to_string(),
            ));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], VerkleError> {
        let slice = self.read_slice(N)?;
        Ok(slice.try_into().expect("slice length was just checked"))
    }

    fn read_u32(&mut self) -> Result<u32, VerkleError> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    fn finish(self) -> Result<(), VerkleError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(VerkleError::MalformedProof(format!(
                "{} trailing bytes after the proof",
                self.bytes.len()
            )))
        }
    }
}

fn decode_fixed<const N: usize>(hex_str: &str) -> Result<[u8; N], String> {
    if hex_str.len() != 2 * N {
        return Err(format!(
            "expected {} hex characters, got {}",
            2 * N,
            hex_str.len()
        ));
    }
    let bytes = hex::decode(hex_str).map_err(|err| err.to_string())?;
    bytes.try_into().map_err(|_| "length mismatch".to_string())
}

mod hex_fixed {
    use super::decode_fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        decode_fixed(&hex_str).map_err(serde::de::Error::custom)
    }
}

mod hex_vec {
    use super::decode_fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        items: &Vec<[u8; N]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(items.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<Vec<[u8; N]>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|hex_str| decode_fixed(hex_str).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// `Vec<u8>` rendered as one hex string, one byte per two characters.
mod hex_bytes_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        hex::decode(&hex_str).map_err(serde::de::Error::custom)
    }
}

mod hex_opt {
    use super::decode_fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        value: &Option<[u8; N]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<Option<[u8; N]>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        value
            .map(|hex_str| decode_fixed(&hex_str).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod hex_rounds {
    use super::decode_fixed;
    use crate::constants::IPA_PROOF_DEPTH;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        rounds: &[[u8; 32]; IPA_PROOF_DEPTH],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(rounds.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[[u8; 32]; IPA_PROOF_DEPTH], D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        let rounds = strings
            .iter()
            .map(|hex_str| decode_fixed(hex_str).map_err(serde::de::Error::custom))
            .collect::<Result<Vec<[u8; 32]>, D::Error>>()?;
        rounds.try_into().map_err(|_| {
            serde::de::Error::custom(format!("expected exactly {IPA_PROOF_DEPTH} ipa rounds"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config;
    use crate::proof::prover::make_multiproof;
    use crate::proof::verifier::verify_with_root;
    use crate::trie::Node;
    use crate::types::key_from_parts;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn sample_proof() -> (Proof, Element) {
        let cfg = config();
        let mut rng = StdRng::seed_from_u64(42);

        let mut root = Node::new();
        let mut keys = Vec::new();
        for _ in 0..8 {
            let key: Key = rng.gen();
            root.insert(key, rng.gen());
            keys.push(key);
        }
        keys.push([0x11u8; 32]); // absent
        let root_commitment = root.commit(cfg);

        let (proof, _, _, _) = make_multiproof(&mut root, &keys, cfg).unwrap();
        (proof, root_commitment)
    }

    #[test]
    fn wire_roundtrip() {
        let (proof, _) = sample_proof();

        let (verkle_proof, state_diff) = proof.to_wire().unwrap();
        let restored = Proof::from_wire(&verkle_proof, &state_diff).unwrap();

        assert_eq!(restored, proof);
    }

    #[test]
    fn json_roundtrip() {
        let (proof, _) = sample_proof();
        let (verkle_proof, state_diff) = proof.to_wire().unwrap();

        let proof_json = serde_json::to_string(&verkle_proof).unwrap();
        let diff_json = serde_json::to_string(&state_diff).unwrap();

        assert_eq!(
            serde_json::from_str::<VerkleProof>(&proof_json).unwrap(),
            verkle_proof
        );
        assert_eq!(
            serde_json::from_str::<StateDiff>(&diff_json).unwrap(),
            state_diff
        );

        // Fixed-size fields render as bare lowercase hex.
        assert!(proof_json.contains(&format!("\"d\":\"{}\"", hex::encode(verkle_proof.d))));
        assert!(!proof_json.contains("0x"));
    }

    #[test]
    fn json_length_validation() {
        let (proof, _) = sample_proof();
        let (verkle_proof, _) = proof.to_wire().unwrap();

        let json = serde_json::to_string(&verkle_proof).unwrap();
        let truncated_d = json.replace(
            &hex::encode(verkle_proof.d),
            &hex::encode(&verkle_proof.d[1..]),
        );
        assert!(serde_json::from_str::<VerkleProof>(&truncated_d).is_err());
    }

    #[test]
    fn legacy_binary_roundtrip() {
        let (proof, _) = sample_proof();

        let bytes = proof.write_legacy().unwrap();
        let restored = Proof::read_legacy(&bytes).unwrap();

        assert_eq!(restored.multipoint, proof.multipoint);
        assert_eq!(restored.ext_status, proof.ext_status);
        assert_eq!(restored.commitments, proof.commitments);
        assert_eq!(restored.poa_stems, proof.poa_stems);
        // The legacy layout does not carry keys and values.
        assert!(restored.keys.is_empty());
    }

    #[test]
    fn legacy_binary_rejects_truncation_and_trailing_bytes() {
        let (proof, _) = sample_proof();
        let bytes = proof.write_legacy().unwrap();

        assert!(matches!(
            Proof::read_legacy(&bytes[..bytes.len() - 1]),
            Err(VerkleError::MalformedProof(_))
        ));

        let mut extended = bytes;
        extended.push(0);
        assert!(matches!(
            Proof::read_legacy(&extended),
            Err(VerkleError::MalformedProof(_))
        ));
    }

    #[test]
    fn one_stem_groups_all_its_suffixes() {
        let cfg = config();

        let stem = [9u8; 31];
        let k1 = key_from_parts(&stem, 0x00);
        let k2 = key_from_parts(&stem, 0x80);

        let mut root = Node::new();
        root.insert(k1, [1; 32]);
        root.insert(k2, [2; 32]);

        let (proof, _, _, _) = make_multiproof(&mut root, &[k1, k2], cfg).unwrap();
        let (_, state_diff) = proof.to_wire().unwrap();

        assert_eq!(state_diff.len(), 1);
        assert_eq!(state_diff[0].stem, stem);
        assert_eq!(
            state_diff[0]
                .suffix_diffs
                .iter()
                .map(|diff| diff.suffix)
                .collect::<Vec<_>>(),
            vec![0x00, 0x80]
        );
        assert_eq!(state_diff[0].suffix_diffs[0].current_value, Some([1; 32]));
        assert_eq!(state_diff[0].suffix_diffs[1].current_value, Some([2; 32]));
    }

    #[test]
    fn unsorted_state_diff_is_rejected() {
        let group = |stem: Stem| StemStateDiff {
            stem,
            suffix_diffs: vec![SuffixStateDiff {
                suffix: 0,
                current_value: None,
            }],
        };

        let diff = vec![group([2u8; 31]), group([1u8; 31])];
        assert!(matches!(
            keys_from_state_diff(&diff),
            Err(VerkleError::MalformedProof(_))
        ));

        let duplicate_suffixes = vec![StemStateDiff {
            stem: [1u8; 31],
            suffix_diffs: vec![
                SuffixStateDiff {
                    suffix: 5,
                    current_value: None,
                },
                SuffixStateDiff {
                    suffix: 5,
                    current_value: None,
                },
            ],
        }];
        assert!(matches!(
            keys_from_state_diff(&duplicate_suffixes),
            Err(VerkleError::MalformedProof(_))
        ));
    }

    #[test]
    fn deserialized_proof_still_verifies() {
        let (proof, root_commitment) = sample_proof();
        let cfg = config();

        let (verkle_proof, state_diff) = proof.to_wire().unwrap();
        let restored = Proof::from_wire(&verkle_proof, &state_diff).unwrap();

        assert!(verify_with_root(&restored, root_commitment, cfg).unwrap());
    }

    #[test]
    fn tampered_wire_fields_fail_verification() {
        let (proof, root_commitment) = sample_proof();
        let cfg = config();

        let (verkle_proof, state_diff) = proof.to_wire().unwrap();

        // Flip one bit in D, in an IPA round, and in the final scalar.
        let mut cases = Vec::new();

        let mut tampered = verkle_proof.clone();
        tampered.d[5] ^= 0x40;
        cases.push(tampered);

        let mut tampered = verkle_proof.clone();
        tampered.ipa_proof.cl[3][7] ^= 0x40;
        cases.push(tampered);

        let mut tampered = verkle_proof.clone();
        tampered.ipa_proof.cr[7][0] ^= 0x04;
        cases.push(tampered);

        let mut tampered = verkle_proof.clone();
        tampered.ipa_proof.final_evaluation[2] ^= 0x01;
        cases.push(tampered);

        for tampered in cases {
            // Bit flips can make the point fail to decode at all; both
            // outcomes are rejections.
            match Proof::from_wire(&tampered, &state_diff) {
                Ok(restored) => {
                    assert!(!verify_with_root(&restored, root_commitment, cfg).unwrap())
                }
                Err(
                    VerkleError::InvalidEncoding(_) | VerkleError::MalformedProof(_),
                ) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }
}
