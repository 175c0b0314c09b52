//! Polynomials in evaluation (Lagrange) form over the domain `0..n`.

use banderwagon::{trait_defs::*, Fr};
use std::ops::{Add, Mul, Sub};

/// A polynomial represented by its evaluations over `0..n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LagrangeBasis {
    /// `values[i] = f(i)`
    values: Vec<Fr>,
}

impl LagrangeBasis {
    pub fn new(values: Vec<Fr>) -> LagrangeBasis {
        LagrangeBasis { values }
    }

    pub fn zero() -> LagrangeBasis {
        LagrangeBasis { values: Vec::new() }
    }

    pub fn values(&self) -> &[Fr] {
        &self.values
    }

    pub fn domain_size(&self) -> usize {
        self.values.len()
    }

    /// Evaluates the polynomial at a point of the domain, which is just an
    /// index operation on the evaluation form.
    pub fn evaluate_in_domain(&self, index: usize) -> Fr {
        self.values[index]
    }

    /// Computes the quotient `q(X) = (f(X) - f(index)) / (X - index)` in
    /// evaluation form.
    ///
    /// On the domain points `i != index` the quotient is a plain division;
    /// the removable singularity at `index` is filled in with the
    /// barycentric identity
    /// `q(index) = -sum_{i != index} A'(index)/A'(i) * q(i)`.
    pub fn divide_by_linear_vanishing(
        &self,
        precomp: &PrecomputedWeights,
        index: usize,
    ) -> LagrangeBasis {
        let domain_size = self.values.len();
        let y = self.values[index];

        let mut quotient = vec![Fr::zero(); domain_size];
        for i in 0..domain_size {
            if i == index {
                continue;
            }

            let signed_delta = i as isize - index as isize;
            let den_inv =
                precomp.inverted_domain_element(signed_delta.unsigned_abs(), signed_delta < 0);

            let q_i = (self.values[i] - y) * den_inv;
            quotient[i] = q_i;

            quotient[index] -= precomp.ratio_of_weights(index, i) * q_i;
        }

        LagrangeBasis::new(quotient)
    }

    /// Evaluates all Lagrange coefficients `b_i = A(z) / (A'(i) * (z - i))`
    /// at `z`, so that `f(z) = <f, b>` for any `f` in evaluation form.
    ///
    /// `z` must lie outside the domain; in-domain evaluation is an index
    /// operation and never goes through this path.
    pub fn evaluate_lagrange_coefficients(
        precomp: &PrecomputedWeights,
        domain_size: usize,
        point: Fr,
    ) -> Vec<Fr> {
        let mut denominators: Vec<Fr> = (0..domain_size)
            .map(|i| point - Fr::from(i as u128))
            .collect();

        // A(z) = prod_i (z - i)
        let a_z: Fr = denominators.iter().product();
        debug_assert!(!a_z.is_zero(), "evaluation point lies in the domain");

        batch_inversion(&mut denominators);

        denominators
            .into_iter()
            .enumerate()
            .map(|(i, den_inv)| a_z * precomp.inverse_barycentric_weight(i) * den_inv)
            .collect()
    }
}

impl Add<LagrangeBasis> for LagrangeBasis {
    type Output = LagrangeBasis;

    fn add(self, rhs: LagrangeBasis) -> Self::Output {
        if self.values.is_empty() {
            return rhs;
        }
        if rhs.values.is_empty() {
            return self;
        }

        let values = self
            .values
            .into_iter()
            .zip(rhs.values)
            .map(|(a, b)| a + b)
            .collect();
        LagrangeBasis::new(values)
    }
}

impl Sub<&LagrangeBasis> for &LagrangeBasis {
    type Output = LagrangeBasis;

    fn sub(self, rhs: &LagrangeBasis) -> Self::Output {
        let values = self
            .values
            .iter()
            .zip(rhs.values.iter())
            .map(|(a, b)| *a - *b)
            .collect();
        LagrangeBasis::new(values)
    }
}

impl Mul<Fr> for LagrangeBasis {
    type Output = LagrangeBasis;

    fn mul(mut self, rhs: Fr) -> Self::Output {
        for value in &mut self.values {
            *value *= rhs;
        }
        self
    }
}

/// Precomputed barycentric weights for the domain `0..n`.
///
/// `A(X) = prod_i (X - i)` is the vanishing polynomial of the domain and
/// `A'(i) = prod_{j != i} (i - j)` its derivative at the domain points.
#[derive(Clone, Debug)]
pub struct PrecomputedWeights {
    /// `barycentric_weights[i] = A'(i)`, `barycentric_weights[n + i] = 1 / A'(i)`
    barycentric_weights: Vec<Fr>,
    /// `inverted_domain[i - 1] = 1 / i`, `inverted_domain[(n - 1) + (i - 1)] = -1 / i`
    inverted_domain: Vec<Fr>,
    domain_size: usize,
}

impl PrecomputedWeights {
    pub fn new(domain_size: usize) -> PrecomputedWeights {
        let mut weights = Vec::with_capacity(domain_size);
        for i in 0..domain_size as i128 {
            let mut weight = Fr::one();
            for j in 0..domain_size as i128 {
                if j != i {
                    weight *= fr_from_i128(i - j);
                }
            }
            weights.push(weight);
        }

        let mut inverse_weights = weights.clone();
        batch_inversion(&mut inverse_weights);

        let mut barycentric_weights = weights;
        barycentric_weights.extend(inverse_weights);

        let mut inverted_domain: Vec<Fr> = (1..domain_size as u128).map(Fr::from).collect();
        batch_inversion(&mut inverted_domain);
        let negated: Vec<Fr> = inverted_domain.iter().map(|d| -*d).collect();
        inverted_domain.extend(negated);

        PrecomputedWeights {
            barycentric_weights,
            inverted_domain,
            domain_size,
        }
    }

    pub fn domain_size(&self) -> usize {
        self.domain_size
    }

    /// `A'(numerator) / A'(denominator)`
    fn ratio_of_weights(&self, numerator: usize, denominator: usize) -> Fr {
        self.barycentric_weights[numerator]
            * self.barycentric_weights[self.domain_size + denominator]
    }

    fn inverse_barycentric_weight(&self, i: usize) -> Fr {
        self.barycentric_weights[self.domain_size + i]
    }

    /// `1 / element` or `-1 / element`; `element` is in `1..n`.
    fn inverted_domain_element(&self, element: usize, is_negative: bool) -> Fr {
        let mut index = element - 1;
        if is_negative {
            index += self.domain_size - 1;
        }
        self.inverted_domain[index]
    }
}

fn fr_from_i128(value: i128) -> Fr {
    if value < 0 {
        -Fr::from((-value) as u128)
    } else {
        Fr::from(value as u128)
    }
}
