//! Multipoint opening: many polynomial commitments, each opened at a point
//! of the domain, aggregated into a single IPA.

#![allow(non_snake_case)]

use crate::crs::CRS;
use crate::ipa::{self, IPAProof};
use crate::lagrange_basis::{LagrangeBasis, PrecomputedWeights};
use crate::math_utils::powers_of;
use crate::transcript::Transcript;

use banderwagon::{multi_scalar_mul, trait_defs::*, Element, Fr};
use std::collections::BTreeMap;

pub struct MultiPoint;

#[derive(Clone, Debug)]
pub struct ProverQuery {
    pub commitment: Element,
    pub poly: LagrangeBasis,
    // Given a function f, we use z to denote the input point and y the
    // output, ie f(z) = y.
    pub point: usize,
    pub result: Fr,
}

impl From<ProverQuery> for VerifierQuery {
    fn from(pq: ProverQuery) -> Self {
        VerifierQuery {
            commitment: pq.commitment,
            point: Fr::from(pq.point as u128),
            result: pq.result,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VerifierQuery {
    pub commitment: Element,
    pub point: Fr,
    pub result: Fr,
}

/// Groups the queries evaluated at the same point, keeping the challenge
/// power assigned to each. The map is ordered so the aggregation below is
/// deterministic.
fn group_prover_queries<'a>(
    prover_queries: &'a [ProverQuery],
    challenges: &'a [Fr],
) -> BTreeMap<usize, Vec<(&'a ProverQuery, &'a Fr)>> {
    let mut res: BTreeMap<usize, Vec<_>> = BTreeMap::new();

    prover_queries
        .iter()
        .zip(challenges.iter())
        .for_each(|(query, challenge)| {
            res.entry(query.point).or_default().push((query, challenge));
        });

    res
}

impl MultiPoint {
    pub fn open(
        crs: CRS,
        precomp: &PrecomputedWeights,
        transcript: &mut Transcript,
        queries: Vec<ProverQuery>,
    ) -> MultiPointProof {
        transcript.domain_sep(b"multiproof");

        // 1. Compute `r`
        //
        // Add points and evaluations
        record_query_transcript(transcript, &queries);

        let r = transcript.challenge_scalar(b"r");
        let powers_of_r = powers_of(r, queries.len());

        let grouped_queries = group_prover_queries(&queries, &powers_of_r);

        // aggregate all of the queries evaluated at the same point
        let aggregated_queries: Vec<(usize, LagrangeBasis)> = grouped_queries
            .into_iter()
            .map(|(point, queries_challenges)| {
                let aggregated_polynomial = queries_challenges
                    .into_iter()
                    .map(|(query, challenge)| query.poly.clone() * *challenge)
                    .reduce(|acc, poly| acc + poly)
                    .expect("group is never empty");

                (point, aggregated_polynomial)
            })
            .collect();

        // Compute g(X)
        let g_x: LagrangeBasis = aggregated_queries
            .iter()
            .map(|(point, agg_f_x)| agg_f_x.divide_by_linear_vanishing(precomp, *point))
            .fold(LagrangeBasis::zero(), |a, b| a + b);

        let g_x_comm = crs.commit_lagrange_poly(&g_x);

        transcript.append_point(b"D", &g_x_comm);

        // 2. Compute g_1(t)
        let t = transcript.challenge_scalar(b"t");

        let mut g1_den: Vec<_> = aggregated_queries
            .iter()
            .map(|(z_i, _)| t - Fr::from(*z_i as u128))
            .collect();
        batch_inversion(&mut g1_den);

        let g1_x = aggregated_queries
            .into_iter()
            .zip(g1_den)
            .map(|((_, agg_f_x), den_inv)| agg_f_x * den_inv)
            .fold(LagrangeBasis::zero(), |a, b| a + b);

        let g1_comm = crs.commit_lagrange_poly(&g1_x);

        transcript.append_point(b"E", &g1_comm);

        // 3. Compute g_1(X) - g(X)
        // This is the polynomial we create an opening for.
        let g_3_x = &g1_x - &g_x;
        let g_3_x_comm = g1_comm - g_x_comm;

        // 4. Compute the IPA for g_3
        let g_3_ipa = open_point_outside_of_domain(crs, precomp, transcript, g_3_x, g_3_x_comm, t);

        MultiPointProof {
            open_proof: g_3_ipa,
            g_x_comm,
        }
    }
}

/// Abstracts over prover and verifier queries, whose point field types
/// differ, so both sides record the transcript identically.
trait QueryData {
    fn commitment(&self) -> &Element;
    fn point_as_fr(&self) -> Fr;
    fn result(&self) -> &Fr;
}

impl QueryData for ProverQuery {
    fn commitment(&self) -> &Element {
        &self.commitment
    }
    fn point_as_fr(&self) -> Fr {
        Fr::from(self.point as u128)
    }
    fn result(&self) -> &Fr {
        &self.result
    }
}

impl QueryData for VerifierQuery {
    fn commitment(&self) -> &Element {
        &self.commitment
    }
    fn point_as_fr(&self) -> Fr {
        self.point
    }
    fn result(&self) -> &Fr {
        &self.result
    }
}

fn record_query_transcript<T: QueryData>(transcript: &mut Transcript, queries: &[T]) {
    for query in queries {
        transcript.append_point(b"C", query.commitment());
        transcript.append_scalar(b"z", &query.point_as_fr());
        transcript.append_scalar(b"y", query.result());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPointProof {
    /// IPA for `g_1(X) - g(X)` at the evaluation challenge.
    pub open_proof: IPAProof,
    /// Commitment to the aggregated quotient polynomial, `D` on the wire.
    pub g_x_comm: Element,
}

impl MultiPointProof {
    pub fn from_bytes(bytes: &[u8], poly_degree: usize) -> crate::IOResult<MultiPointProof> {
        use crate::{IOError, IOErrorKind};

        if bytes.len() < 32 {
            return Err(IOError::from(IOErrorKind::InvalidData));
        }
        let g_x_comm_bytes = &bytes[0..32];
        let ipa_bytes = &bytes[32..];

        let g_x_comm = Element::from_bytes(g_x_comm_bytes)
            .ok_or(IOError::from(IOErrorKind::InvalidData))?;
        let open_proof = IPAProof::from_bytes(ipa_bytes, poly_degree)?;

        Ok(MultiPointProof {
            open_proof,
            g_x_comm,
        })
    }

    pub fn to_bytes(&self) -> crate::IOResult<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.open_proof.serialized_size() + 32);
        bytes.extend(self.g_x_comm.to_bytes());
        bytes.extend(self.open_proof.to_bytes()?);
        Ok(bytes)
    }

    pub fn check(
        &self,
        crs: &CRS,
        precomp: &PrecomputedWeights,
        queries: &[VerifierQuery],
        transcript: &mut Transcript,
    ) -> bool {
        transcript.domain_sep(b"multiproof");

        // 1. Compute `r`
        //
        // Add points and evaluations
        record_query_transcript(transcript, queries);

        let r = transcript.challenge_scalar(b"r");
        let powers_of_r = powers_of(r, queries.len());

        // 2. Compute `t`
        transcript.append_point(b"D", &self.g_x_comm);
        let t = transcript.challenge_scalar(b"t");

        // 3. Compute g_2(t) = sum r^i * y_i / (t - z_i)
        let mut g2_den: Vec<_> = queries.iter().map(|query| t - query.point).collect();
        batch_inversion(&mut g2_den);

        let helper_scalars: Vec<_> = powers_of_r
            .into_iter()
            .zip(g2_den)
            .map(|(r_i, den_inv)| den_inv * r_i)
            .collect();

        let g2_t: Fr = helper_scalars
            .iter()
            .zip(queries.iter())
            .map(|(r_i_den_inv, query)| *r_i_den_inv * query.result)
            .sum();

        // 4. Compute [g_1(X)] = E
        let comms: Vec<_> = queries.iter().map(|query| query.commitment).collect();
        let g1_comm = multi_scalar_mul(&comms, &helper_scalars);

        transcript.append_point(b"E", &g1_comm);

        // E - D
        let g3_comm = g1_comm - self.g_x_comm;

        // Check IPA
        let b = LagrangeBasis::evaluate_lagrange_coefficients(precomp, crs.n, t);

        self.open_proof
            .verify_multiexp(transcript, crs, b, g3_comm, t, g2_t)
    }
}

// TODO: check that the point is actually not in the domain
pub(crate) fn open_point_outside_of_domain(
    crs: CRS,
    precomp: &PrecomputedWeights,
    transcript: &mut Transcript,
    polynomial: LagrangeBasis,
    commitment: Element,
    z_i: Fr,
) -> IPAProof {
    let a = polynomial.values().to_vec();

    let b = LagrangeBasis::evaluate_lagrange_coefficients(precomp, crs.n, z_i);

    ipa::create(transcript, crs, a, commitment, b, z_i)
}
