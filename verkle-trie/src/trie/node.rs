//! Tree nodes.
//!
//! A node is one of a closed set of variants: an empty slot, an internal
//! node with 256 children, or a leaf. A leaf is the extension node for one
//! stem: it stores up to 256 values, grouped under two sub-commitments
//! `C1` (suffixes below 128) and `C2` (the rest).
//!
//! The same variants also represent *partial* trees rebuilt from a proof:
//! there the commitments are attached from the outside and the values are
//! only the queried ones. Commitment recomputation never runs on such
//! nodes, because their cached commitment is already set.

use crate::config::Config;
use crate::constants::{NODE_WIDTH, SUFFIX_SPLIT};
use crate::types::{stem_of, stem_to_field, suffix_of, value_to_field_halves, Key, Stem, Value};
use banderwagon::{Element, Fr, One, Zero};
use ipa_multipoint::lagrange_basis::LagrangeBasis;

#[derive(Debug, Clone, Default)]
pub enum Node {
    #[default]
    Empty,
    Internal(Box<InternalNode>),
    Leaf(Box<LeafNode>),
}

#[derive(Debug, Clone)]
pub struct InternalNode {
    pub(crate) children: Vec<Node>,
    pub(crate) commitment: Option<Element>,
}

#[derive(Debug, Clone)]
pub struct LeafNode {
    pub(crate) stem: Stem,
    pub(crate) values: Box<[Option<Value>; NODE_WIDTH]>,
    pub(crate) commitment: Option<Element>,
    pub(crate) c1: Option<Element>,
    pub(crate) c2: Option<Element>,
}

impl Node {
    /// A fresh, fully materialised (and empty) tree root.
    pub fn new() -> Node {
        Node::Internal(Box::new(InternalNode::new()))
    }

    /// A partial-tree internal node carrying an externally supplied
    /// commitment; used when rebuilding a tree from a proof.
    pub fn new_stateless_with_commitment(commitment: Element) -> Node {
        Node::Internal(Box::new(InternalNode {
            children: new_children(),
            commitment: Some(commitment),
        }))
    }

    /// Inserts a 32-byte value under a 32-byte key, splitting a resident
    /// leaf if its stem collides with the key's on the current path.
    pub fn insert(&mut self, key: Key, value: Value) {
        self.insert_at_depth(key, value, 0)
    }

    fn insert_at_depth(&mut self, key: Key, value: Value, depth: usize) {
        let stem = stem_of(&key);
        match self {
            Node::Empty => {
                let mut leaf = LeafNode::new(stem);
                leaf.set_value(suffix_of(&key), value);
                *self = Node::Leaf(Box::new(leaf));
            }
            Node::Leaf(leaf) if leaf.stem == stem => {
                leaf.set_value(suffix_of(&key), value);
            }
            Node::Leaf(_) => {
                // Another stem occupies this slot: push it one level down
                // and retry. Its own commitment does not depend on its
                // position, so the cached value stays valid.
                let resident = std::mem::take(self);
                let resident_stem = match &resident {
                    Node::Leaf(leaf) => leaf.stem,
                    _ => unreachable!(),
                };

                let mut internal = InternalNode::new();
                internal.children[resident_stem[depth] as usize] = resident;
                *self = Node::Internal(Box::new(internal));

                self.insert_at_depth(key, value, depth);
            }
            Node::Internal(internal) => {
                internal.commitment = None;
                internal.children[stem[depth] as usize].insert_at_depth(key, value, depth + 1);
            }
        }
    }

    /// Looks up a key. Returns `None` for absent values, including values
    /// outside the view of a partial tree.
    pub fn get(&self, key: &Key) -> Option<Value> {
        let stem = stem_of(key);
        let mut node = self;
        let mut depth = 0;
        loop {
            match node {
                Node::Empty => return None,
                Node::Leaf(leaf) => {
                    if leaf.stem == stem {
                        return leaf.values[suffix_of(key) as usize];
                    }
                    return None;
                }
                Node::Internal(internal) => {
                    // Internal nodes never sit below the last stem byte.
                    let stem_byte = *stem.get(depth)?;
                    node = &internal.children[stem_byte as usize];
                    depth += 1;
                }
            }
        }
    }

    /// Materialises every missing commitment bottom-up and returns this
    /// node's commitment. The identity element stands for an empty slot.
    pub fn commit(&mut self, cfg: &Config) -> Element {
        match self {
            Node::Empty => Element::zero(),
            Node::Leaf(leaf) => leaf.commit(cfg),
            Node::Internal(internal) => {
                if let Some(commitment) = internal.commitment {
                    return commitment;
                }

                let mut fields = Vec::with_capacity(NODE_WIDTH);
                for child in internal.children.iter_mut() {
                    child.commit(cfg);
                    fields.push(child.field_value());
                }

                let commitment = cfg.crs.commit_lagrange_poly(&LagrangeBasis::new(fields));
                internal.commitment = Some(commitment);
                commitment
            }
        }
    }

    /// The commitment cached on this node, if it has been computed or
    /// attached.
    pub fn commitment(&self) -> Option<Element> {
        match self {
            Node::Empty => Some(Element::zero()),
            Node::Leaf(leaf) => leaf.commitment,
            Node::Internal(internal) => internal.commitment,
        }
    }

    /// This node's evaluation inside its parent's polynomial: zero for an
    /// empty slot, otherwise the committed point mapped to the scalar
    /// field. Requires the commitment to be present.
    pub(crate) fn field_value(&self) -> Fr {
        match self {
            Node::Empty => Fr::zero(),
            _ => self
                .commitment()
                .expect("commitment must be computed before use")
                .map_to_scalar_field(),
        }
    }
}

fn new_children() -> Vec<Node> {
    let mut children = Vec::with_capacity(NODE_WIDTH);
    children.resize_with(NODE_WIDTH, || Node::Empty);
    children
}

impl InternalNode {
    fn new() -> InternalNode {
        InternalNode {
            children: new_children(),
            commitment: None,
        }
    }

    /// The polynomial this node's commitment commits to: one field value
    /// per child. Only meaningful on a fully materialised, committed tree.
    pub(crate) fn poly(&self) -> LagrangeBasis {
        LagrangeBasis::new(self.children.iter().map(Node::field_value).collect())
    }
}

impl LeafNode {
    pub(crate) fn new(stem: Stem) -> LeafNode {
        LeafNode {
            stem,
            values: Box::new([None; NODE_WIDTH]),
            commitment: None,
            c1: None,
            c2: None,
        }
    }

    /// A partial-tree leaf: commitments attached from a proof, values
    /// restricted to the queried ones.
    pub(crate) fn new_stateless(
        stem: Stem,
        commitment: Element,
        c1: Option<Element>,
        c2: Option<Element>,
    ) -> LeafNode {
        LeafNode {
            stem,
            values: Box::new([None; NODE_WIDTH]),
            commitment: Some(commitment),
            c1,
            c2,
        }
    }

    pub fn stem(&self) -> &Stem {
        &self.stem
    }

    pub(crate) fn set_value(&mut self, suffix: u8, value: Value) {
        self.values[suffix as usize] = Some(value);
        self.commitment = None;
        // Only the sub-commitment covering this suffix goes stale.
        if (suffix as usize) < SUFFIX_SPLIT {
            self.c1 = None;
        } else {
            self.c2 = None;
        }
    }

    fn commit(&mut self, cfg: &Config) -> Element {
        if let Some(commitment) = self.commitment {
            return commitment;
        }

        if self.c1.is_none() {
            let poly = self.suffix_poly(0);
            self.c1 = Some(cfg.crs.commit_lagrange_poly(&poly));
        }
        if self.c2.is_none() {
            let poly = self.suffix_poly(1);
            self.c2 = Some(cfg.crs.commit_lagrange_poly(&poly));
        }

        let commitment = cfg.crs.commit_lagrange_poly(&self.extension_poly());
        self.commitment = Some(commitment);
        commitment
    }

    /// The polynomial behind `C1` (`half == 0`) or `C2` (`half == 1`):
    /// the interleaved low/high field halves of 128 value slots.
    pub(crate) fn suffix_poly(&self, half: usize) -> LagrangeBasis {
        let start = half * SUFFIX_SPLIT;
        let mut values = vec![Fr::zero(); NODE_WIDTH];
        for t in 0..SUFFIX_SPLIT {
            let (lo, hi) = value_to_field_halves(self.values[start + t].as_ref());
            values[2 * t] = lo;
            values[2 * t + 1] = hi;
        }
        LagrangeBasis::new(values)
    }

    /// The polynomial behind the extension commitment:
    /// `[1, le(stem), field(C1), field(C2), 0, …]`.
    pub(crate) fn extension_poly(&self) -> LagrangeBasis {
        let mut values = vec![Fr::zero(); NODE_WIDTH];
        values[0] = Fr::one();
        values[1] = stem_to_field(&self.stem);
        values[2] = self.sub_commitment_field(0);
        values[3] = self.sub_commitment_field(1);
        LagrangeBasis::new(values)
    }

    /// `field(C1)` or `field(C2)`. Requires the sub-commitment to exist.
    pub(crate) fn sub_commitment_field(&self, half: usize) -> Fr {
        let sub = if half == 0 { &self.c1 } else { &self.c2 };
        sub.expect("sub-commitment must be computed before use")
            .map_to_scalar_field()
    }

    pub(crate) fn sub_commitment(&self, half: usize) -> Option<Element> {
        if half == 0 {
            self.c1
        } else {
            self.c2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config;
    use crate::types::key_from_parts;

    fn key(stem_fill: u8, suffix: u8) -> Key {
        key_from_parts(&[stem_fill; 31], suffix)
    }

    #[test]
    fn insert_then_get() {
        let mut root = Node::new();
        root.insert(key(1, 0), [10; 32]);
        root.insert(key(1, 255), [11; 32]);
        root.insert(key(2, 7), [12; 32]);

        assert_eq!(root.get(&key(1, 0)), Some([10; 32]));
        assert_eq!(root.get(&key(1, 255)), Some([11; 32]));
        assert_eq!(root.get(&key(2, 7)), Some([12; 32]));
        assert_eq!(root.get(&key(1, 1)), None);
        assert_eq!(root.get(&key(3, 0)), None);
    }

    #[test]
    fn overwriting_a_value_changes_the_commitment() {
        let cfg = config();

        let mut root = Node::new();
        root.insert(key(1, 0), [10; 32]);
        let before = root.commit(cfg);

        root.insert(key(1, 0), [99; 32]);
        let after = root.commit(cfg);

        assert_ne!(before, after);
    }

    #[test]
    fn commitment_is_independent_of_insertion_order() {
        let cfg = config();

        let mut a = Node::new();
        a.insert(key(1, 0), [10; 32]);
        a.insert(key(2, 1), [11; 32]);
        a.insert(key(3, 2), [12; 32]);

        let mut b = Node::new();
        b.insert(key(3, 2), [12; 32]);
        b.insert(key(1, 0), [10; 32]);
        b.insert(key(2, 1), [11; 32]);

        assert_eq!(a.commit(cfg), b.commit(cfg));
    }

    #[test]
    fn colliding_stems_split_into_an_internal_node() {
        let mut root = Node::new();

        // Two stems sharing their first two bytes.
        let mut stem_a = [0u8; 31];
        stem_a[0] = 1;
        stem_a[1] = 2;
        stem_a[2] = 3;
        let mut stem_b = stem_a;
        stem_b[2] = 4;

        root.insert(key_from_parts(&stem_a, 0), [1; 32]);
        root.insert(key_from_parts(&stem_b, 0), [2; 32]);

        assert_eq!(root.get(&key_from_parts(&stem_a, 0)), Some([1; 32]));
        assert_eq!(root.get(&key_from_parts(&stem_b, 0)), Some([2; 32]));

        // The leaves now sit below two levels of internal nodes, split on
        // the first differing stem byte.
        let mut node = &root;
        for depth in 0..2 {
            match node {
                Node::Internal(internal) => {
                    node = &internal.children[stem_a[depth] as usize];
                }
                other => panic!("expected an internal node, got {other:?}"),
            }
        }
        match node {
            Node::Internal(internal) => {
                assert!(matches!(internal.children[3], Node::Leaf(_)));
                assert!(matches!(internal.children[4], Node::Leaf(_)));
            }
            other => panic!("expected an internal node, got {other:?}"),
        }
    }

    #[test]
    fn empty_subtree_field_value_is_zero() {
        assert_eq!(Node::Empty.field_value(), Fr::zero());
        assert_eq!(Element::zero().map_to_scalar_field(), Fr::zero());
    }
}
