//! Glue between the consensus-critical wire codec (`BitcoinSerialize`/
//! `BitcoinDeserialize`, in `mvs_chain::serialization`) and `sled`'s
//! `IVec` byte-slice keys/values.
//!
//! Table *values* reuse the wire codec directly (`BitcoinSerialize`/
//! `BitcoinDeserialize`) since they only ever need to round-trip. Table
//! *keys* need a distinct, comparison-friendly encoding so `sled::Tree`'s
//! ordered iteration (used by `Store::tip`'s "last entry of
//! `blocks_index`" scan) comes back height- or hash-ordered; `SledKey`
//! covers that, kept separate so `block::Height`'s big-endian sled key
//! doesn't have to match its little-endian wire form.

use std::convert::TryInto;

use mvs_chain::{block, transaction, transparent};

use crate::BoxError;

/// A type usable as a `sled::Tree` key.
pub trait SledKey {
    fn as_sled_key(&self) -> sled::IVec;
}

/// The inverse of [`SledKey`], for tables iterated by key (`Store::tip`,
/// `Store::block_locator`).
pub trait FromSledKey: Sized {
    fn from_sled_key(bytes: &[u8]) -> Result<Self, BoxError>;
}

/// Convenience methods for fetching or storing a consensus-codec value
/// under a `SledKey`.
pub trait FromSledTree {
    fn zs_get<K, V>(&self, key: &K) -> Result<Option<V>, BoxError>
    where
        K: SledKey,
        V: mvs_chain::BitcoinDeserialize;

    fn zs_insert<K, V>(&self, key: &K, value: &V) -> Result<(), BoxError>
    where
        K: SledKey,
        V: mvs_chain::BitcoinSerialize;
}

impl FromSledTree for sled::Tree {
    fn zs_get<K, V>(&self, key: &K) -> Result<Option<V>, BoxError>
    where
        K: SledKey,
        V: mvs_chain::BitcoinDeserialize,
    {
        match self.get(key.as_sled_key())? {
            Some(bytes) => Ok(Some(V::bitcoin_deserialize(&*bytes)?)),
            None => Ok(None),
        }
    }

    fn zs_insert<K, V>(&self, key: &K, value: &V) -> Result<(), BoxError>
    where
        K: SledKey,
        V: mvs_chain::BitcoinSerialize,
    {
        let bytes = value.bitcoin_serialize_to_vec()?;
        self.insert(key.as_sled_key(), bytes)?;
        Ok(())
    }
}

impl SledKey for block::Height {
    fn as_sled_key(&self) -> sled::IVec {
        sled::IVec::from(&self.0.to_be_bytes()[..])
    }
}

impl FromSledKey for block::Height {
    fn from_sled_key(bytes: &[u8]) -> Result<Self, BoxError> {
        let array: [u8; 4] = bytes.try_into().map_err(|_| "malformed height key")?;
        Ok(block::Height(u32::from_be_bytes(array)))
    }
}

impl SledKey for block::Hash {
    fn as_sled_key(&self) -> sled::IVec {
        sled::IVec::from(&self.0[..])
    }
}

impl FromSledKey for block::Hash {
    fn from_sled_key(bytes: &[u8]) -> Result<Self, BoxError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| "malformed block hash key")?;
        Ok(block::Hash::from_bytes_exact(array))
    }
}

impl SledKey for transaction::Hash {
    fn as_sled_key(&self) -> sled::IVec {
        sled::IVec::from(&self.0[..])
    }
}

impl SledKey for transparent::OutPoint {
    fn as_sled_key(&self) -> sled::IVec {
        let mut bytes = Vec::with_capacity(36);
        bytes.extend_from_slice(&self.hash.0);
        bytes.extend_from_slice(&self.index.to_be_bytes());
        sled::IVec::from(bytes)
    }
}

impl SledKey for str {
    fn as_sled_key(&self) -> sled::IVec {
        sled::IVec::from(self.as_bytes())
    }
}

impl SledKey for String {
    fn as_sled_key(&self) -> sled::IVec {
        sled::IVec::from(self.as_bytes())
    }
}

impl SledKey for [u8] {
    fn as_sled_key(&self) -> sled::IVec {
        sled::IVec::from(self)
    }
}
