//! The certificate hash tree.
//!
//! A Merkle-style structure proving that the value found at a path is
//! covered by the certificate's root hash. Nodes are immutable once parsed;
//! a tree lives for one verification attempt and is discarded after the
//! caller extracts the leaves it needs.

use ciborium::value::Value as Cbor;
use sha2::{Digest, Sha256};

use canlink_core::Sha256Hash;

use crate::error::CertError;

/// A tree edge label: raw bytes, compared exactly.
pub type Label = Vec<u8>;

// Node discriminants in the on-wire array encoding.
const TAG_EMPTY: i128 = 0;
const TAG_FORK: i128 = 1;
const TAG_LABELED: i128 = 2;
const TAG_LEAF: i128 = 3;
const TAG_PRUNED: i128 = 4;

/// A node of the certificate hash tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashTree {
    Empty,
    Fork(Box<HashTree>, Box<HashTree>),
    Labeled(Label, Box<HashTree>),
    Leaf(Vec<u8>),
    Pruned(Sha256Hash),
}

/// Outcome of a value lookup.
///
/// The three states are deliberate: a pruned subtree on the search path
/// yields `Unknown`, never `Absent`. Treating pruned-away evidence as a
/// definitive negative would let a partial certificate masquerade as proof
/// of absence; callers must re-poll (or distrust) on `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The path ends at a leaf with these bytes.
    Found(&'a [u8]),
    /// The certificate proves no value exists at the path.
    Absent,
    /// The certificate has pruned the evidence either way.
    Unknown,
}

/// Outcome of a subtree lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtreeLookup<'a> {
    Found(&'a HashTree),
    Absent,
    Unknown,
}

enum LabelSearch<'a> {
    Found(&'a HashTree),
    Absent,
    Unknown,
}

impl HashTree {
    /// Parse a node from its generic tagged-array encoding.
    ///
    /// The discriminant is the first array element; each variant has a
    /// fixed arity and a violation is a parse error.
    pub fn from_cbor(value: &Cbor) -> Result<Self, CertError> {
        let items = match value {
            Cbor::Array(items) => items,
            other => {
                return Err(CertError::UnexpectedShape(format!(
                    "hash tree node must be an array, found {}",
                    cbor_kind(other)
                )))
            }
        };
        let tag = match items.first() {
            Some(Cbor::Integer(tag)) => i128::from(*tag),
            _ => {
                return Err(CertError::UnexpectedShape(
                    "hash tree node missing integer tag".to_string(),
                ))
            }
        };
        match tag {
            TAG_EMPTY => {
                expect_arity(0, items.len(), 1)?;
                Ok(HashTree::Empty)
            }
            TAG_FORK => {
                expect_arity(1, items.len(), 3)?;
                Ok(HashTree::Fork(
                    Box::new(HashTree::from_cbor(&items[1])?),
                    Box::new(HashTree::from_cbor(&items[2])?),
                ))
            }
            TAG_LABELED => {
                expect_arity(2, items.len(), 3)?;
                let label = expect_bytes(&items[1])?;
                Ok(HashTree::Labeled(
                    label.to_vec(),
                    Box::new(HashTree::from_cbor(&items[2])?),
                ))
            }
            TAG_LEAF => {
                expect_arity(3, items.len(), 2)?;
                Ok(HashTree::Leaf(expect_bytes(&items[1])?.to_vec()))
            }
            TAG_PRUNED => {
                expect_arity(4, items.len(), 2)?;
                let bytes = expect_bytes(&items[1])?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| CertError::InvalidPrunedHash)?;
                Ok(HashTree::Pruned(Sha256Hash::from_bytes(arr)))
            }
            other => Err(CertError::InvalidNodeTag(other)),
        }
    }

    /// Look up the node at a path. An empty path returns the node itself.
    pub fn lookup_subtree<'a>(&'a self, path: &[&[u8]]) -> SubtreeLookup<'a> {
        let Some((head, rest)) = path.split_first() else {
            return SubtreeLookup::Found(self);
        };
        match self.search_label(head) {
            LabelSearch::Found(child) => child.lookup_subtree(rest),
            LabelSearch::Absent => SubtreeLookup::Absent,
            LabelSearch::Unknown => SubtreeLookup::Unknown,
        }
    }

    /// Look up the leaf value at a path.
    ///
    /// Returns `Found` only if the final node is a leaf; a path ending at a
    /// non-leaf node carries no value and reports `Absent`.
    pub fn lookup_path<'a>(&'a self, path: &[&[u8]]) -> Lookup<'a> {
        match self.lookup_subtree(path) {
            SubtreeLookup::Found(HashTree::Leaf(bytes)) => Lookup::Found(bytes),
            SubtreeLookup::Found(HashTree::Pruned(_)) => Lookup::Unknown,
            SubtreeLookup::Found(_) => Lookup::Absent,
            SubtreeLookup::Absent => Lookup::Absent,
            SubtreeLookup::Unknown => Lookup::Unknown,
        }
    }

    /// Search the fork-flattened children of this node for a label.
    fn search_label<'a>(&'a self, label: &[u8]) -> LabelSearch<'a> {
        match self {
            HashTree::Labeled(own, child) if own.as_slice() == label => LabelSearch::Found(child),
            HashTree::Labeled(_, _) | HashTree::Leaf(_) | HashTree::Empty => LabelSearch::Absent,
            HashTree::Pruned(_) => LabelSearch::Unknown,
            HashTree::Fork(left, right) => match left.search_label(label) {
                LabelSearch::Found(child) => LabelSearch::Found(child),
                LabelSearch::Absent => right.search_label(label),
                LabelSearch::Unknown => match right.search_label(label) {
                    LabelSearch::Found(child) => LabelSearch::Found(child),
                    // The left side was pruned; absence cannot be proven.
                    LabelSearch::Absent | LabelSearch::Unknown => LabelSearch::Unknown,
                },
            },
        }
    }

    /// Recompute the root hash of this (possibly pruned) tree.
    ///
    /// Each node kind hashes under its own domain separator, so a leaf can
    /// never collide with a fork of the same bytes.
    pub fn digest(&self) -> Sha256Hash {
        match self {
            HashTree::Empty => domain_hash(b"ic-hashtree-empty", &[]),
            HashTree::Fork(left, right) => {
                let mut data = Vec::with_capacity(64);
                data.extend_from_slice(left.digest().as_bytes());
                data.extend_from_slice(right.digest().as_bytes());
                domain_hash(b"ic-hashtree-fork", &data)
            }
            HashTree::Labeled(label, child) => {
                let mut data = Vec::with_capacity(label.len() + 32);
                data.extend_from_slice(label);
                data.extend_from_slice(child.digest().as_bytes());
                domain_hash(b"ic-hashtree-labeled", &data)
            }
            HashTree::Leaf(bytes) => domain_hash(b"ic-hashtree-leaf", bytes),
            HashTree::Pruned(hash) => *hash,
        }
    }
}

fn expect_arity(tag: u8, actual: usize, expected: usize) -> Result<(), CertError> {
    if actual != expected {
        return Err(CertError::WrongArity {
            tag,
            expected,
            actual,
        });
    }
    Ok(())
}

fn expect_bytes(value: &Cbor) -> Result<&[u8], CertError> {
    match value {
        Cbor::Bytes(bytes) => Ok(bytes),
        other => Err(CertError::UnexpectedShape(format!(
            "expected byte string, found {}",
            cbor_kind(other)
        ))),
    }
}

pub(crate) fn cbor_kind(value: &Cbor) -> &'static str {
    match value {
        Cbor::Integer(_) => "integer",
        Cbor::Bytes(_) => "bytes",
        Cbor::Text(_) => "text",
        Cbor::Array(_) => "array",
        Cbor::Map(_) => "map",
        Cbor::Bool(_) => "bool",
        Cbor::Null => "null",
        Cbor::Float(_) => "float",
        Cbor::Tag(_, _) => "tag",
        _ => "unknown",
    }
}

/// Hash `data` under a one-byte-length-prefixed domain separator.
fn domain_hash(domain: &[u8], data: &[u8]) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update([domain.len() as u8]);
    hasher.update(domain);
    hasher.update(data);
    Sha256Hash(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(label: &[u8], child: HashTree) -> HashTree {
        HashTree::Labeled(label.to_vec(), Box::new(child))
    }

    fn fork(left: HashTree, right: HashTree) -> HashTree {
        HashTree::Fork(Box::new(left), Box::new(right))
    }

    fn two_leaf_tree() -> HashTree {
        fork(
            labeled(b"a", HashTree::Leaf(b"X".to_vec())),
            labeled(b"b", HashTree::Leaf(b"Y".to_vec())),
        )
    }

    #[test]
    fn test_lookup_found_and_absent() {
        let tree = two_leaf_tree();
        assert_eq!(tree.lookup_path(&[b"a"]), Lookup::Found(b"X"));
        assert_eq!(tree.lookup_path(&[b"b"]), Lookup::Found(b"Y"));
        assert_eq!(tree.lookup_path(&[b"c"]), Lookup::Absent);
    }

    #[test]
    fn test_empty_path_returns_root() {
        let tree = two_leaf_tree();
        assert_eq!(tree.lookup_subtree(&[]), SubtreeLookup::Found(&tree));
    }

    #[test]
    fn test_path_through_leaf_is_absent() {
        let tree = two_leaf_tree();
        assert_eq!(tree.lookup_path(&[b"a", b"deeper"]), Lookup::Absent);
    }

    #[test]
    fn test_pruned_sibling_is_unknown_not_absent() {
        let tree = fork(
            HashTree::Pruned(Sha256Hash::from_bytes([0x11; 32])),
            labeled(b"b", HashTree::Leaf(b"Y".to_vec())),
        );
        // "b" survives the pruning.
        assert_eq!(tree.lookup_path(&[b"b"]), Lookup::Found(b"Y"));
        // "a" may or may not exist under the pruned side.
        assert_eq!(tree.lookup_path(&[b"a"]), Lookup::Unknown);
    }

    #[test]
    fn test_fully_visible_tree_proves_absence() {
        let tree = two_leaf_tree();
        assert_eq!(tree.lookup_path(&[b"zz"]), Lookup::Absent);
    }

    #[test]
    fn test_nested_path() {
        let tree = labeled(
            b"request_status",
            labeled(b"\x01\x02", labeled(b"status", HashTree::Leaf(b"replied".to_vec()))),
        );
        assert_eq!(
            tree.lookup_path(&[b"request_status", b"\x01\x02", b"status"]),
            Lookup::Found(b"replied")
        );
        assert_eq!(
            tree.lookup_path(&[b"request_status", b"\x09\x09", b"status"]),
            Lookup::Absent
        );
    }

    #[test]
    fn test_cbor_roundtrip_shapes() {
        // fork(labeled("a", leaf "X"), pruned(h))
        let node = Cbor::Array(vec![
            Cbor::Integer(1.into()),
            Cbor::Array(vec![
                Cbor::Integer(2.into()),
                Cbor::Bytes(b"a".to_vec()),
                Cbor::Array(vec![Cbor::Integer(3.into()), Cbor::Bytes(b"X".to_vec())]),
            ]),
            Cbor::Array(vec![
                Cbor::Integer(4.into()),
                Cbor::Bytes(vec![0x22; 32]),
            ]),
        ]);
        let tree = HashTree::from_cbor(&node).unwrap();
        assert_eq!(
            tree,
            fork(
                labeled(b"a", HashTree::Leaf(b"X".to_vec())),
                HashTree::Pruned(Sha256Hash::from_bytes([0x22; 32])),
            )
        );
    }

    #[test]
    fn test_cbor_wrong_arity() {
        // fork with a single child
        let node = Cbor::Array(vec![
            Cbor::Integer(1.into()),
            Cbor::Array(vec![Cbor::Integer(0.into())]),
        ]);
        assert_eq!(
            HashTree::from_cbor(&node).unwrap_err(),
            CertError::WrongArity {
                tag: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_cbor_unknown_tag() {
        let node = Cbor::Array(vec![Cbor::Integer(9.into())]);
        assert_eq!(
            HashTree::from_cbor(&node).unwrap_err(),
            CertError::InvalidNodeTag(9)
        );
    }

    #[test]
    fn test_cbor_bad_pruned_hash() {
        let node = Cbor::Array(vec![Cbor::Integer(4.into()), Cbor::Bytes(vec![0; 31])]);
        assert_eq!(
            HashTree::from_cbor(&node).unwrap_err(),
            CertError::InvalidPrunedHash
        );
    }

    #[test]
    fn test_digest_ignores_pruning() {
        // Replacing a subtree by its pruned hash must not change the root.
        let full = two_leaf_tree();
        let HashTree::Fork(left, right) = &full else {
            panic!("expected fork");
        };
        let pruned = fork(HashTree::Pruned(left.digest()), (**right).clone());
        assert_eq!(full.digest(), pruned.digest());
    }

    #[test]
    fn test_digest_known_empty() {
        // sha256 of the length-prefixed domain alone
        assert_eq!(
            HashTree::Empty.digest(),
            Sha256Hash::hash(b"\x11ic-hashtree-empty")
        );
    }
}
