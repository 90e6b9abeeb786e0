//! Taproot tweaking and the Merkelized Alternative Script Tree.
//!
//! The output key commits to an internal key and an optional script tree
//! root: Q = P + H_tag("TapTweak", x(P) ‖ root)·G, with P normalized to an
//! even y first.

use crate::hashes::tag_hash;
use crate::keys::{PriKey, PubKey};
use crate::transaction::compact_size_encode;
use k256::ProjectivePoint;
use k256::Scalar;

/// Tapscript leaf version.
pub const LEAF_VERSION: u8 = 0xc0;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("tweak produced an invalid key")]
    InvalidTweak,
}

/// t = int(H_tag("TapTweak", x(P) ‖ root)) mod n.
pub fn tweak_scalar(internal: &PubKey, root: Option<[u8; 32]>) -> Scalar {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(&internal.x());
    if let Some(root) = root {
        data.extend_from_slice(&root);
    }
    crate::ecdsa::scalar_reduce(&tag_hash("TapTweak", &data))
}

/// The output key Q = even_y(P) + t·G.
pub fn output_key(internal: &PubKey, root: Option<[u8; 32]>) -> Result<PubKey, Error> {
    let t = tweak_scalar(internal, root);
    let point = internal.even_y().point() + ProjectivePoint::GENERATOR * t;
    PubKey::from_point(point).map_err(|_| Error::InvalidTweak)
}

/// The key-path signing scalar even_y(d) + t. Schnorr signing normalizes
/// the sum again for the parity of Q.
pub fn output_prikey(prikey: &PriKey, root: Option<[u8; 32]>) -> Result<PriKey, Error> {
    let pubkey = prikey.pubkey();
    let d = if pubkey.y_is_odd() {
        -prikey.scalar()
    } else {
        prikey.scalar()
    };
    let t = tweak_scalar(&pubkey, root);
    PriKey::from_scalar(d + t).map_err(|_| Error::InvalidTweak)
}

/// A tapscript leaf; the hash commits to the leaf version and the
/// length-prefixed script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    script: Vec<u8>,
    hash: [u8; 32],
}

impl Leaf {
    pub fn new(script: Vec<u8>) -> Leaf {
        let mut data = Vec::with_capacity(script.len() + 4);
        data.push(LEAF_VERSION);
        data.extend(compact_size_encode(script.len() as u64));
        data.extend_from_slice(&script);
        Leaf {
            hash: tag_hash("TapLeaf", &data),
            script,
        }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }
}

/// An inner tree node. Child hashes are sorted before hashing, which is
/// what makes merkle proofs canonical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    left: Box<Tree>,
    right: Box<Tree>,
    hash: [u8; 32],
}

impl Node {
    pub fn new(left: impl Into<Tree>, right: impl Into<Tree>) -> Node {
        let left = left.into();
        let right = right.into();
        let mut data = Vec::with_capacity(64);
        let (lo, hi) = if left.hash() <= right.hash() {
            (left.hash(), right.hash())
        } else {
            (right.hash(), left.hash())
        };
        data.extend_from_slice(&lo);
        data.extend_from_slice(&hi);
        Node {
            hash: tag_hash("TapBranch", &data),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn left(&self) -> &Tree {
        &self.left
    }

    pub fn right(&self) -> &Tree {
        &self.right
    }

    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tree {
    Leaf(Leaf),
    Node(Node),
}

impl Tree {
    pub fn hash(&self) -> [u8; 32] {
        match self {
            Tree::Leaf(leaf) => leaf.hash(),
            Tree::Node(node) => node.hash(),
        }
    }
}

impl From<Leaf> for Tree {
    fn from(leaf: Leaf) -> Tree {
        Tree::Leaf(leaf)
    }
}

impl From<Node> for Tree {
    fn from(node: Node) -> Tree {
        Tree::Node(node)
    }
}

/// Fold a leaf hash up through its sibling hashes to the tree root.
pub fn merkle_root(leaf: &Leaf, path: &[[u8; 32]]) -> [u8; 32] {
    let mut node = leaf.hash();
    for sibling in path {
        let mut data = Vec::with_capacity(64);
        if node <= *sibling {
            data.extend_from_slice(&node);
            data.extend_from_slice(sibling);
        } else {
            data.extend_from_slice(sibling);
            data.extend_from_slice(&node);
        }
        node = tag_hash("TapBranch", &data);
    }
    node
}

/// The control block of a script-path spend:
/// `(leaf_version | parity(Q)) ‖ x(P) ‖ sibling hashes from leaf to root`.
pub fn control_block(
    internal: &PubKey,
    leaf: &Leaf,
    path: &[[u8; 32]],
) -> Result<Vec<u8>, Error> {
    let root = merkle_root(leaf, path);
    let output = output_key(internal, Some(root))?;
    let mut out = Vec::with_capacity(33 + 32 * path.len());
    out.push(LEAF_VERSION | u8::from(output.y_is_odd()));
    out.extend_from_slice(&internal.x());
    for sibling in path {
        out.extend_from_slice(sibling);
    }
    Ok(out)
}
