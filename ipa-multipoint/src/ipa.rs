//! Inner product argument in the style of BCMS20.
//!
//! The prover convinces the verifier that a Pedersen-committed vector `a`
//! satisfies `<a, b> = y` for a public vector `b`, using `log2(n)` rounds of
//! halving. With `n = 256` the proof is exactly 8 rounds.

#![allow(non_snake_case)]

use crate::crs::CRS;
use crate::math_utils::inner_product;
use crate::transcript::Transcript;
use crate::{IOError, IOErrorKind, IOResult};
use banderwagon::{multi_scalar_mul, trait_defs::*, Element, Fr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IPAProof {
    pub L_vec: Vec<Element>,
    pub R_vec: Vec<Element>,
    pub a: Fr,
}

impl IPAProof {
    pub fn serialized_size(&self) -> usize {
        (self.L_vec.len() * 2 + 1) * 32
    }

    /// Wire layout: `L[0..rounds] || R[0..rounds] || a`, points in their
    /// canonical 32-byte form, the scalar little-endian.
    pub fn to_bytes(&self) -> IOResult<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.serialized_size());
        for L in &self.L_vec {
            bytes.extend(L.to_bytes());
        }
        for R in &self.R_vec {
            bytes.extend(R.to_bytes());
        }
        self.a
            .serialize_compressed(&mut bytes)
            .map_err(|_| IOError::from(IOErrorKind::InvalidData))?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8], poly_degree: usize) -> IOResult<IPAProof> {
        let num_rounds = log2_pow2(poly_degree).ok_or(IOError::from(IOErrorKind::InvalidData))?;
        if bytes.len() != (num_rounds * 2 + 1) * 32 {
            return Err(IOError::from(IOErrorKind::InvalidData));
        }

        let decode_point = |chunk: &[u8]| {
            Element::from_bytes(chunk).ok_or(IOError::from(IOErrorKind::InvalidData))
        };

        let mut chunks = bytes.chunks_exact(32);
        let L_vec: Vec<Element> = (&mut chunks)
            .take(num_rounds)
            .map(decode_point)
            .collect::<IOResult<_>>()?;
        let R_vec: Vec<Element> = (&mut chunks)
            .take(num_rounds)
            .map(decode_point)
            .collect::<IOResult<_>>()?;
        let a_bytes = chunks.next().expect("length was checked above");
        let a = Fr::deserialize_compressed(a_bytes)
            .map_err(|_| IOError::from(IOErrorKind::InvalidData))?;

        Ok(IPAProof { L_vec, R_vec, a })
    }

    /// Verifies the argument with a single multiscalar multiplication for
    /// the folded generator, instead of folding the CRS round by round.
    pub fn verify_multiexp(
        &self,
        transcript: &mut Transcript,
        crs: &CRS,
        b_vec: Vec<Fr>,
        a_comm: Element,
        input_point: Fr,
        output_point: Fr,
    ) -> bool {
        transcript.domain_sep(b"ipa");

        let num_rounds = self.L_vec.len();
        if self.R_vec.len() != num_rounds || crs.n != (1 << num_rounds) || b_vec.len() != crs.n {
            return false;
        }

        transcript.append_point(b"C", &a_comm);
        transcript.append_scalar(b"input point", &input_point);
        transcript.append_scalar(b"output point", &output_point);
        let w = transcript.challenge_scalar(b"w");
        let q = crs.Q * w;

        let mut challenges = Vec::with_capacity(num_rounds);
        for (L, R) in self.L_vec.iter().zip(self.R_vec.iter()) {
            transcript.append_point(b"L", L);
            transcript.append_point(b"R", R);
            challenges.push(transcript.challenge_scalar(b"x"));
        }
        let mut challenges_inv = challenges.clone();
        batch_inversion(&mut challenges_inv);

        // P' = P + sum_j (x_j L_j + x_j^-1 R_j)
        let mut commitment = a_comm + q * output_point;
        for ((L, R), (x, x_inv)) in self
            .L_vec
            .iter()
            .zip(self.R_vec.iter())
            .zip(challenges.iter().zip(challenges_inv.iter()))
        {
            commitment += *L * *x + *R * *x_inv;
        }

        // The folded generator and b-vector have the closed form
        // <s, G> and <s, b>, with s_i the product of the inverse
        // challenges selected by the bits of i.
        let s = fold_coefficients(&challenges_inv, crs.n);
        let b_0 = inner_product(&b_vec, &s);
        let G_0 = multi_scalar_mul(&crs.G, &s);

        commitment == G_0 * self.a + q * (self.a * b_0)
    }
}

/// `s_i = prod_{j : bit_j(i) = 1} x_j^-1`, where `bit_0` is the most
/// significant bit of the index. Mirrors the halving order of the prover.
fn fold_coefficients(challenges_inv: &[Fr], n: usize) -> Vec<Fr> {
    let num_rounds = challenges_inv.len();
    let mut s = vec![Fr::one(); n];
    for (j, x_inv) in challenges_inv.iter().enumerate() {
        let bit = 1usize << (num_rounds - 1 - j);
        for (i, s_i) in s.iter_mut().enumerate() {
            if i & bit != 0 {
                *s_i *= x_inv;
            }
        }
    }
    s
}

/// Creates an IPA for `<a, b> = y`, where `a` is committed under the CRS
/// generators and `b` is public (for openings, the Lagrange coefficients of
/// the evaluation point).
pub fn create(
    transcript: &mut Transcript,
    crs: CRS,
    mut a: Vec<Fr>,
    a_comm: Element,
    mut b: Vec<Fr>,
    input_point: Fr,
) -> IPAProof {
    transcript.domain_sep(b"ipa");

    let mut G = crs.G;
    assert!(a.len().is_power_of_two());
    assert_eq!(a.len(), b.len());
    assert_eq!(a.len(), G.len());

    let output_point = inner_product(&a, &b);

    transcript.append_point(b"C", &a_comm);
    transcript.append_scalar(b"input point", &input_point);
    transcript.append_scalar(b"output point", &output_point);
    let w = transcript.challenge_scalar(b"w");
    let q = crs.Q * w;

    let num_rounds = log2_pow2(a.len()).expect("length is a power of two");
    let mut L_vec = Vec::with_capacity(num_rounds);
    let mut R_vec = Vec::with_capacity(num_rounds);

    while a.len() > 1 {
        let half = a.len() / 2;
        let (a_L, a_R) = a.split_at(half);
        let (b_L, b_R) = b.split_at(half);
        let (G_L, G_R) = G.split_at(half);

        let z_L = inner_product(a_R, b_L);
        let z_R = inner_product(a_L, b_R);

        let C_L = slow_vartime_multiscalar_mul(
            a_R.iter().chain(std::iter::once(&z_L)),
            G_L.iter().chain(std::iter::once(&q)),
        );
        let C_R = slow_vartime_multiscalar_mul(
            a_L.iter().chain(std::iter::once(&z_R)),
            G_R.iter().chain(std::iter::once(&q)),
        );

        transcript.append_point(b"L", &C_L);
        transcript.append_point(b"R", &C_R);
        L_vec.push(C_L);
        R_vec.push(C_R);

        let x = transcript.challenge_scalar(b"x");
        let x_inv = x.inverse().expect("challenge is never zero");

        a = fold_scalars(a_L, a_R, &x);
        b = fold_scalars(b_L, b_R, &x_inv);
        G = fold_points(G_L, G_R, &x_inv);
    }

    IPAProof {
        L_vec,
        R_vec,
        a: a[0],
    }
}

fn fold_scalars(left: &[Fr], right: &[Fr], x: &Fr) -> Vec<Fr> {
    left.iter()
        .zip(right.iter())
        .map(|(l, r)| *l + *x * *r)
        .collect()
}

fn fold_points(left: &[Element], right: &[Element], x: &Fr) -> Vec<Element> {
    left.iter()
        .zip(right.iter())
        .map(|(l, r)| *l + *r * *x)
        .collect()
}

pub fn slow_vartime_multiscalar_mul<'a>(
    scalars: impl Iterator<Item = &'a Fr>,
    points: impl Iterator<Item = &'a Element>,
) -> Element {
    let scalars: Vec<Fr> = scalars.copied().collect();
    let points: Vec<Element> = points.copied().collect();
    multi_scalar_mul(&points, &scalars)
}

fn log2_pow2(n: usize) -> Option<usize> {
    if n.is_power_of_two() {
        Some(n.trailing_zeros() as usize)
    } else {
        None
    }
}
