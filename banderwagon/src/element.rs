use ark_ec::{PrimeGroup, ScalarMul, VariableBaseMSM};
use ark_ed_on_bls12_381_bandersnatch::{BandersnatchConfig, EdwardsAffine, EdwardsProjective, Fq};
use ark_ff::{batch_inversion, Field, One, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use ark_ec::twisted_edwards::TECurveConfig;

pub use ark_ed_on_bls12_381_bandersnatch::Fr;

/// A point on the Bandersnatch curve, identified with its image in the
/// prime-order quotient group.
#[derive(Debug, Clone, Copy, Eq)]
pub struct Element(pub EdwardsProjective);

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        let x1 = self.0.x;
        let y1 = self.0.y;

        let x2 = other.0.x;
        let y2 = other.0.y;

        // (0, 0) is not a valid affine point; it can only appear if the
        // coordinates were assigned directly, bypassing the API. Reject it
        // instead of letting it compare equal to everything.
        if x1.is_zero() & y1.is_zero() {
            return false;
        }
        if x2.is_zero() & y2.is_zero() {
            return false;
        }

        // Equality in the quotient group: x1/y1 == x2/y2.
        (x1 * y2) == (x2 * y1)
    }
}

impl Element {
    /// Canonical 32-byte serialization: the x co-ordinate of the
    /// representative with positive y, in big-endian.
    pub fn to_bytes(&self) -> [u8; 32] {
        // We assume that internally this point is "correct".
        let affine = EdwardsAffine::from(self.0);
        let x = if is_positive(affine.y) {
            affine.x
        } else {
            -affine.x
        };
        let mut bytes = [0u8; 32];
        x.serialize_compressed(&mut bytes[..])
            .expect("serialization failed");

        // reverse bytes to big endian, for interoperability
        bytes.reverse();

        bytes
    }

    /// Deserializes a canonical 32-byte encoding, checking that the point is
    /// in the prime subgroup. Returns `None` for invalid encodings.
    pub fn from_bytes(bytes: &[u8]) -> Option<Element> {
        let element = Element::from_bytes_unchecked(bytes)?;

        // Check if the point is in the correct subgroup.
        //
        // Check legendre - checks whether 1 - ax^2 is a QR
        if !element.subgroup_check() {
            return None;
        }

        Some(element)
    }

    /// Deserializes a 32-byte encoding without the subgroup check.
    ///
    /// Only for *trusted* inputs whose group membership is established by a
    /// later cryptographic check, e.g. proof commitments that feed straight
    /// into a multipoint verification.
    pub fn from_bytes_unchecked(bytes: &[u8]) -> Option<Element> {
        // Switch from big endian to little endian, as arkworks uses little endian.
        let mut bytes = bytes.to_vec();
        bytes.reverse();

        let x: Fq = Fq::deserialize_compressed(&bytes[..]).ok()?;

        let return_positive_y = true;
        let point = Self::get_point_from_x(x, return_positive_y)?;

        Some(Element(EdwardsProjective::new_unchecked(
            point.x,
            point.y,
            point.x * point.y,
            Fq::one(),
        )))
    }

    pub const fn compressed_serialized_size() -> usize {
        32
    }

    pub fn prime_subgroup_generator() -> Element {
        Element(EdwardsProjective::generator())
    }

    fn get_point_from_x(x: Fq, choose_largest: bool) -> Option<EdwardsAffine> {
        let dx_squared_minus_one = BandersnatchConfig::COEFF_D * x.square() - Fq::one();
        let ax_squared_minus_one = BandersnatchConfig::COEFF_A * x.square() - Fq::one();
        let y_squared = ax_squared_minus_one / dx_squared_minus_one;

        let y = y_squared.sqrt()?;

        let is_largest = is_positive(y);

        let y = if is_largest && choose_largest { y } else { -y };

        Some(EdwardsAffine::new_unchecked(x, y))
    }

    fn map_to_field(&self) -> Fq {
        self.0.x / self.0.y
    }

    /// Maps the element to the scalar field. This is a 2-to-1 map on the
    /// curve, but the two preimages are identified in the quotient group.
    pub fn map_to_scalar_field(&self) -> Fr {
        let base_field = self.map_to_field();

        let mut bytes = [0u8; 32];
        base_field
            .serialize_compressed(&mut bytes[..])
            .expect("could not serialize point into a 32 byte array");
        Fr::from_le_bytes_mod_order(&bytes)
    }

    /// Batched [`Element::map_to_scalar_field`] using a single inversion.
    pub fn batch_map_to_scalar_field(elements: &[Element]) -> Vec<Fr> {
        let mut x_div_y = Vec::with_capacity(elements.len());
        for element in elements {
            x_div_y.push(element.0.y);
        }
        batch_inversion(&mut x_div_y);

        for i in 0..elements.len() {
            x_div_y[i] *= elements[i].0.x;
        }

        let mut scalars = Vec::with_capacity(elements.len());
        for element in x_div_y {
            let mut bytes = [0u8; 32];
            element
                .serialize_compressed(&mut bytes[..])
                .expect("could not serialize point into a 32 byte array");
            scalars.push(Fr::from_le_bytes_mod_order(&bytes));
        }

        scalars
    }

    pub fn zero() -> Element {
        Element(EdwardsProjective::zero())
    }

    pub fn is_zero(&self) -> bool {
        *self == Element::zero()
    }

    pub(crate) fn subgroup_check(&self) -> bool {
        legendre_check_point(&self.0.x)
    }
}

// The lexicographically largest value is defined to be the positive value.
fn is_positive(coordinate: Fq) -> bool {
    coordinate > -coordinate
}

fn legendre_check_point(x: &Fq) -> bool {
    let res = Fq::one() - (BandersnatchConfig::COEFF_A * x.square());
    res.legendre().is_qr()
}

/// Interprets `bytes` as a big-endian integer, reduces it into the base
/// field, and tries to lift the result to a group element. Used by
/// hash-to-curve style generation of CRS points.
pub fn try_reduce_to_element(bytes: &[u8]) -> Option<Element> {
    // The draft specification defines the bytes as a big-endian integer.
    let x = Fq::from_be_bytes_mod_order(bytes);

    let point = Element::get_point_from_x(x, true)?;

    let element = Element(EdwardsProjective::new_unchecked(
        point.x,
        point.y,
        point.x * point.y,
        Fq::one(),
    ));

    if !element.subgroup_check() {
        return None;
    }

    Some(element)
}

pub fn multi_scalar_mul(bases: &[Element], scalars: &[Fr]) -> Element {
    let bases_inner: Vec<_> = bases.iter().map(|element| element.0).collect();

    // XXX: Converting all of these to affine hurts performance
    let bases = EdwardsProjective::batch_convert_to_mul_base(&bases_inner);

    let result = EdwardsProjective::msm(&bases, scalars)
        .expect("number of bases should equal number of scalars");

    Element(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_serialize::CanonicalSerialize;

    #[test]
    fn consistent_group_to_field() {
        // In python this is called commitment_to_field
        // print(commitment_to_field(Point(generator=True)).to_bytes(32, "little").hex())
        let expected = "d1e7de2aaea9603d5bc6c208d319596376556ecd8336671ba7670c2139772d14";

        let generator = Element::prime_subgroup_generator();
        let mut bytes = [0u8; 32];
        generator
            .map_to_scalar_field()
            .serialize_compressed(&mut bytes[..])
            .unwrap();
        assert_eq!(hex::encode(bytes), expected);
    }

    #[test]
    fn fixed_serialization_vectors() {
        let expected_bit_string = [
            "4a2c7486fd924882bf02c6908de395122843e3e05264d7991e18e7985dad51e9",
            "43aa74ef706605705989e8fd38df46873b7eae5921fbed115ac9d937399ce4d5",
            "5e5f550494159f38aa54d2ed7f11a7e93e4968617990445cc93ac8e59808c126",
            "0e7e3748db7c5c999a7bcd93d71d671f1f40090423792266f94cb27ca43fce5c",
            "14ddaa48820cb6523b9ae5fe9fe257cbbd1f3d598a28e670a40da5d1159d864a",
            "6989d1c82b2d05c74b62fb0fbdf8843adae62ff720d370e209a7b84e14548a7d",
            "26b8df6fa414bf348a3dc780ea53b70303ce49f3369212dec6fbe4b349b832bf",
            "37e46072db18f038f2cc7d3d5b5d1374c0eb86ca46f869d6a95fc2fb092c0d35",
        ];

        let mut point = Element::prime_subgroup_generator();
        for expected in expected_bit_string {
            assert_eq!(hex::encode(point.to_bytes()), expected);
            point = Element(point.0 + point.0);
        }
    }

    #[test]
    fn ser_der_roundtrip() {
        use ark_ff::AdditiveGroup;

        let point = EdwardsProjective::generator();

        // Two torsion point, *not* the point at infinity: {0, -1, 0, 1}
        let two_torsion = EdwardsProjective::new_unchecked(
            Fq::zero(),
            -Fq::one(),
            Fq::zero(),
            Fq::one(),
        );
        assert!(two_torsion.double().is_zero());

        let element1 = Element(point);
        let bytes1 = element1.to_bytes();

        // The torsion coset collapses to the same canonical encoding.
        let element2 = Element(point + two_torsion);
        let bytes2 = element2.to_bytes();

        assert_eq!(bytes1, bytes2);

        let got = Element::from_bytes(&bytes1).expect("points are in the valid subgroup");

        assert!(got == element1);
        assert!(got == element2);
    }

    #[test]
    fn batch_map_matches_serial_map() {
        let mut points = Vec::new();
        for i in 0..10u64 {
            points.push(Element::prime_subgroup_generator() * Fr::from(i));
        }

        let got = Element::batch_map_to_scalar_field(&points);

        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.map_to_scalar_field(), got[i]);
        }
    }

    #[test]
    fn unchecked_decoding_skips_subgroup_check() {
        let gen = Element::prime_subgroup_generator();
        let bytes = gen.to_bytes();

        let trusted = Element::from_bytes_unchecked(&bytes).unwrap();
        assert_eq!(trusted, gen);

        // Garbage that is not even a base field element still fails.
        assert!(Element::from_bytes_unchecked(&[0xff; 32]).is_none());
    }
}
