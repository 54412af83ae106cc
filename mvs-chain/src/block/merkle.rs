//! The transaction Merkle tree.
//!
//! Transaction hashes fold into a root via `transaction_hashes.iter().
//! cloned().collect()` into a `merkle::Root`. Bitcoin's last-element-
//! duplication rule for odd counts lives here rather than at the call
//! site.

use std::{io, iter::FromIterator};

use crate::{
    serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError},
    transaction,
};

/// The root of a block's transaction Merkle tree.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Root(pub [u8; 32]);

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.debug_tuple("merkle::Root")
            .field(&hex::encode(&reversed))
            .finish()
    }
}

fn combine(left: [u8; 32], right: [u8; 32]) -> [u8; 32] {
    let mut writer = sha256d::Writer::default();
    io::Write::write_all(&mut writer, &left).expect("writing to a Writer is infallible");
    io::Write::write_all(&mut writer, &right).expect("writing to a Writer is infallible");
    writer.finish()
}

impl FromIterator<transaction::Hash> for Root {
    /// Compute the Merkle root of an ordered sequence of transaction
    /// hashes, duplicating the last element at each level when the current
    /// level has an odd number of nodes (Bitcoin's well-known malleability
    /// quirk, CVE-2012-2459, which the block validator separately guards
    /// against by also rejecting duplicate transaction hashes).
    fn from_iter<T: IntoIterator<Item = transaction::Hash>>(iter: T) -> Self {
        let mut level: Vec<[u8; 32]> = iter.into_iter().map(|hash| hash.0).collect();

        if level.is_empty() {
            return Root([0; 32]);
        }

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                level.push(*level.last().unwrap());
            }
            level = level
                .chunks_exact(2)
                .map(|pair| combine(pair[0], pair[1]))
                .collect();
        }

        Root(level[0])
    }
}

impl BitcoinSerialize for Root {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Root {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Root(<[u8; 32]>::bitcoin_deserialize(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> transaction::Hash {
        transaction::Hash([byte; 32])
    }

    #[test]
    fn single_transaction_root_is_its_own_hash() {
        let root: Root = vec![hash(1)].into_iter().collect();
        assert_eq!(root.0, [1; 32]);
    }

    #[test]
    fn odd_count_duplicates_last_hash() {
        let with_dup: Root = vec![hash(1), hash(2), hash(3)].into_iter().collect();
        let manually: Root = vec![hash(1), hash(2), hash(3), hash(3)].into_iter().collect();
        assert_eq!(with_dup.0, manually.0);
    }

    #[test]
    fn order_matters() {
        let a: Root = vec![hash(1), hash(2)].into_iter().collect();
        let b: Root = vec![hash(2), hash(1)].into_iter().collect();
        assert_ne!(a.0, b.0);
    }
}
