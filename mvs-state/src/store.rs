//! `Store`: the `sled`-backed table set, and the write-guard/seqlock
//! discipline readers and the single writer use to stay consistent
//! during a push or pop.

use std::{
    fs, io,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use mvs_chain::{
    attachment::{asset, cert, did, mit, Body},
    block::{self, Block},
    parameters::{Network, GENESIS_PREVIOUS_BLOCK_HASH},
    transaction::{self, Transaction},
    transparent, BitcoinDeserialize, BitcoinSerialize, SerializationError,
};
use mvs_script::templates::ScriptPattern;
use parking_lot::Mutex;
use tracing::trace;

use crate::sled_format::{FromSledTree, SledKey};
use crate::{BoxError, Config, HashOrHeight};

const SCHEMA_VERSION: &str = "1";

/// A transaction plus the position it was confirmed at, the unit stored
/// in the `transactions` table (`hash -> {height, index, serialized
/// tx}`).
#[derive(Clone, Debug, PartialEq)]
struct StoredTransaction {
    height: block::Height,
    index: u32,
    transaction: Arc<Transaction>,
}

impl BitcoinSerialize for StoredTransaction {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.height.bitcoin_serialize(&mut target)?;
        self.index.bitcoin_serialize(&mut target)?;
        self.transaction.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for StoredTransaction {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(StoredTransaction {
            height: block::Height::bitcoin_deserialize(&mut reader)?,
            index: u32::bitcoin_deserialize(&mut reader)?,
            transaction: Arc::<Transaction>::bitcoin_deserialize(&mut reader)?,
        })
    }
}

/// A history row: one movement of value past an address, stored in the
/// `history` table keyed under `address_hash || height || index`
/// so a range scan over the prefix returns an address's rows in
/// confirmation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryRow {
    pub point: transparent::OutPoint,
    pub height: block::Height,
    pub value: u64,
    pub is_output: bool,
}

impl BitcoinSerialize for HistoryRow {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.point.bitcoin_serialize(&mut target)?;
        self.height.bitcoin_serialize(&mut target)?;
        self.value.bitcoin_serialize(&mut target)?;
        (self.is_output as u8).bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for HistoryRow {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(HistoryRow {
            point: transparent::OutPoint::bitcoin_deserialize(&mut reader)?,
            height: block::Height::bitcoin_deserialize(&mut reader)?,
            value: u64::bitcoin_deserialize(&mut reader)?,
            is_output: u8::bitcoin_deserialize(&mut reader)? != 0,
        })
    }
}

fn history_key(address_hash: &[u8; 20], height: block::Height, index: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + 4 + 4);
    key.extend_from_slice(address_hash);
    key.extend_from_slice(&height.0.to_be_bytes());
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// A key into the `did_history`/`mit_history` tables: `symbol || 0x00 ||
/// height || index`. The zero separator is safe because a registered
/// symbol only ever contains `[A-Z.][A-Z0-9.]*` bytes, never a NUL, so
/// `scan_prefix(symbol_history_prefix(symbol))` can't spuriously also
/// return rows for a longer symbol that merely starts with the same
/// bytes (the fixed 20-byte `history_key` prefix above has no such risk
/// since every address hash is the same width; a symbol string isn't).
fn symbol_history_key(symbol: &str, height: block::Height, index: u32) -> Vec<u8> {
    let mut key = symbol_history_prefix(symbol);
    key.extend_from_slice(&height.0.to_be_bytes());
    key.extend_from_slice(&index.to_be_bytes());
    key
}

fn symbol_history_prefix(symbol: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(symbol.len() + 1);
    key.extend_from_slice(symbol.as_bytes());
    key.push(0);
    key
}

/// Scans a `did_history`/`mit_history` tree's rows for `symbol`, in key
/// (and therefore confirmation) order.
fn scan_symbol_history<V: BitcoinDeserialize>(tree: &sled::Tree, symbol: &str) -> Result<Vec<V>, BoxError> {
    let prefix = symbol_history_prefix(symbol);
    let mut rows = Vec::new();
    for entry in tree.scan_prefix(prefix) {
        let (_, value) = entry?;
        rows.push(V::bitcoin_deserialize(&*value)?);
    }
    Ok(rows)
}

/// The attachment record `index_attachment` is about to overwrite for a
/// cert/DID/MIT transfer, recorded under the transferring output's
/// outpoint in the `previous_attachment` table so `unindex_attachment`
/// can restore it on pop instead of erasing the registration a reorg
/// should leave intact below the popped block.
#[derive(Clone, Debug, PartialEq)]
enum PreviousAttachment {
    Cert(cert::AssetCert),
    Did(did::Did),
    Mit(mit::AssetMit),
}

impl BitcoinSerialize for PreviousAttachment {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        match self {
            PreviousAttachment::Cert(cert) => {
                0u8.bitcoin_serialize(&mut target)?;
                cert.bitcoin_serialize(&mut target)
            }
            PreviousAttachment::Did(did) => {
                1u8.bitcoin_serialize(&mut target)?;
                did.bitcoin_serialize(&mut target)
            }
            PreviousAttachment::Mit(mit) => {
                2u8.bitcoin_serialize(&mut target)?;
                mit.bitcoin_serialize(&mut target)
            }
        }
    }
}

impl BitcoinDeserialize for PreviousAttachment {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(match u8::bitcoin_deserialize(&mut reader)? {
            0 => PreviousAttachment::Cert(cert::AssetCert::bitcoin_deserialize(&mut reader)?),
            1 => PreviousAttachment::Did(did::Did::bitcoin_deserialize(&mut reader)?),
            2 => PreviousAttachment::Mit(mit::AssetMit::bitcoin_deserialize(&mut reader)?),
            _ => return Err(SerializationError::Parse("unrecognized previous-attachment tag")),
        })
    }
}

/// The single-writer handle: a mutex serializing pushes/pops, plus a
/// sequence counter bumped to odd on
/// entry and even on exit of every write, so a [`Reader`] can tell
/// whether it raced a write.
pub struct WriteGuard {
    lock: Mutex<()>,
    sequence: AtomicU64,
}

impl Default for WriteGuard {
    fn default() -> Self {
        WriteGuard {
            lock: Mutex::new(()),
            sequence: AtomicU64::new(0),
        }
    }
}

impl WriteGuard {
    /// Runs `write` exclusively, marking the sequence counter odd for its
    /// duration so concurrent readers retry rather than observe a
    /// half-applied push/pop.
    fn with_write<T>(&self, write: impl FnOnce() -> T) -> T {
        let _held = self.lock.lock();
        self.sequence.fetch_add(1, Ordering::AcqRel);
        let result = write();
        self.sequence.fetch_add(1, Ordering::AcqRel);
        result
    }
}

/// Snapshots the write-guard's sequence counter, runs a read, and retries
/// if the counter changed (or was caught mid-write) -- a seqlock so that
/// readers see either the pre-write or post-write state, deliberately
/// not a blocking `RwLock` since this only needs monotonic-counter
/// semantics.
pub struct Reader<'a> {
    guard: &'a WriteGuard,
}

impl<'a> Reader<'a> {
    pub fn new(guard: &'a WriteGuard) -> Self {
        Reader { guard }
    }

    pub fn read<T>(&self, mut f: impl FnMut() -> T) -> T {
        loop {
            let before = self.guard.sequence.load(Ordering::Acquire);
            if before % 2 == 1 {
                continue;
            }
            let result = f();
            let after = self.guard.sequence.load(Ordering::Acquire);
            if before == after {
                return result;
            }
        }
    }
}

/// The full table set this store keeps, each a `sled::Tree`.
pub struct Store {
    config: Config,
    network: Network,
    db: sled::Db,

    blocks: sled::Tree,
    blocks_index: sled::Tree,
    transactions: sled::Tree,
    spends: sled::Tree,
    history: sled::Tree,
    stealth_rows: sled::Tree,
    accounts: sled::Tree,
    account_assets: sled::Tree,
    account_addresses: sled::Tree,
    account_dids: sled::Tree,
    account_mits: sled::Tree,
    assets: sled::Tree,
    certs: sled::Tree,
    witness_certs: sled::Tree,
    dids: sled::Tree,
    mits: sled::Tree,
    did_history: sled::Tree,
    mit_history: sled::Tree,
    previous_attachment: sled::Tree,
    witness_profiles: sled::Tree,
    metadata: sled::Tree,

    write_guard: WriteGuard,
    _process_lock: fs::File,
}

impl Store {
    /// Opens (creating if absent) the store for `network` at `config`'s
    /// configured path, migrating its schema additively.
    pub fn open(config: Config, network: Network) -> Result<Store, BoxError> {
        let network_dir = config.network_dir(network);
        if !config.ephemeral {
            fs::create_dir_all(&network_dir)?;
        }
        let process_lock = acquire_process_lock(&network_dir, config.ephemeral)?;

        let db = config.sled_config(network).open()?;

        let store = Store {
            blocks: db.open_tree(b"blocks")?,
            blocks_index: db.open_tree(b"blocks_index")?,
            transactions: db.open_tree(b"transactions")?,
            spends: db.open_tree(b"spends")?,
            history: db.open_tree(b"history")?,
            stealth_rows: db.open_tree(b"stealth_rows")?,
            accounts: db.open_tree(b"accounts")?,
            account_assets: db.open_tree(b"account_assets")?,
            account_addresses: db.open_tree(b"account_addresses")?,
            account_dids: db.open_tree(b"account_dids")?,
            account_mits: db.open_tree(b"account_mits")?,
            assets: db.open_tree(b"assets")?,
            certs: db.open_tree(b"certs")?,
            witness_certs: db.open_tree(b"witness_certs")?,
            dids: db.open_tree(b"dids")?,
            mits: db.open_tree(b"mits")?,
            did_history: db.open_tree(b"did_history")?,
            mit_history: db.open_tree(b"mit_history")?,
            previous_attachment: db.open_tree(b"previous_attachment")?,
            witness_profiles: db.open_tree(b"witness_profiles")?,
            metadata: db.open_tree(b"metadata")?,
            db,
            config,
            network,
            write_guard: WriteGuard::default(),
            _process_lock: process_lock,
        };
        store.migrate_schema()?;
        Ok(store)
    }

    fn migrate_schema(&self) -> Result<(), BoxError> {
        match self.metadata.get(b"schema_version")? {
            Some(version) if version == SCHEMA_VERSION.as_bytes() => {}
            Some(version) => {
                return Err(format!(
                    "store schema version {:?} is newer than this binary's {}; refusing to open",
                    String::from_utf8_lossy(&version),
                    SCHEMA_VERSION
                )
                .into());
            }
            None => {
                self.metadata
                    .insert(b"schema_version", SCHEMA_VERSION.as_bytes())?;
            }
        }
        Ok(())
    }

    pub fn reader(&self) -> Reader<'_> {
        Reader::new(&self.write_guard)
    }

    /// The height and hash of the current tip, or `None` for an empty
    /// store.
    pub fn tip(&self) -> Result<Option<(block::Height, block::Hash)>, BoxError> {
        self.reader().read(|| {
            match self.blocks_index.iter().rev().next().transpose()? {
                Some((height_bytes, hash_bytes)) => {
                    let height = block::Height::bitcoin_deserialize(&*height_bytes)?;
                    let hash = block::Hash::bitcoin_deserialize(&*hash_bytes)?;
                    Ok(Some((height, hash)))
                }
                None => Ok(None),
            }
        })
    }

    pub fn tip_hash(&self) -> Result<block::Hash, BoxError> {
        Ok(self
            .tip()?
            .map(|(_, hash)| hash)
            .unwrap_or(GENESIS_PREVIOUS_BLOCK_HASH))
    }

    pub fn block(&self, query: impl Into<HashOrHeight>) -> Result<Option<Arc<Block>>, BoxError> {
        self.reader().read(|| {
            let height = match query.into() {
                HashOrHeight::Height(height) => Some(height),
                HashOrHeight::Hash(hash) => self
                    .blocks_index_height_for(hash)?,
            };
            let height = match height {
                Some(height) => height,
                None => return Ok(None),
            };
            match self.blocks.zs_get::<_, Block>(&height)? {
                Some(block) => Ok(Some(Arc::new(block))),
                None => Ok(None),
            }
        })
    }

    /// The height a known block hash was connected at, if any.
    pub fn height_for_hash(&self, hash: block::Hash) -> Result<Option<block::Height>, BoxError> {
        self.reader().read(|| self.blocks_index_height_for(hash))
    }

    fn blocks_index_height_for(&self, hash: block::Hash) -> Result<Option<block::Height>, BoxError> {
        // `blocks_index` is keyed by height; a hash lookup needs a reverse
        // scan. Reorgs are rare and blocks aren't looked up by hash on any
        // hot path, so an O(n) scan (rather than a second hash->height
        // tree) is the simpler choice here.
        for entry in self.blocks_index.iter() {
            let (height_bytes, hash_bytes) = entry?;
            if &*hash_bytes == &hash.0[..] {
                return Ok(Some(block::Height::bitcoin_deserialize(&*height_bytes)?));
            }
        }
        Ok(None)
    }

    pub fn transaction(&self, hash: transaction::Hash) -> Result<Option<Arc<Transaction>>, BoxError> {
        self.reader()
            .read(|| match self.transactions.zs_get::<_, StoredTransaction>(&hash)? {
                Some(stored) => Ok(Some(stored.transaction)),
                None => Ok(None),
            })
    }

    /// Whether `outpoint` is unspent: present as a created output and
    /// absent from `spends`.
    pub fn utxo(
        &self,
        outpoint: &transparent::OutPoint,
    ) -> Result<Option<transparent::Output>, BoxError> {
        self.reader().read(|| {
            if self.spends.contains_key(outpoint.as_sled_key())? {
                return Ok(None);
            }
            let stored = match self
                .transactions
                .zs_get::<_, StoredTransaction>(&outpoint.hash)?
            {
                Some(stored) => stored,
                None => return Ok(None),
            };
            Ok(stored
                .transaction
                .outputs
                .get(outpoint.index as usize)
                .cloned())
        })
    }

    /// The detail record of the asset issued under `symbol`, if any.
    pub fn asset(&self, symbol: &str) -> Result<Option<asset::AssetDetail>, BoxError> {
        let key = symbol.to_string();
        self.reader()
            .read(|| Ok(self.assets.zs_get::<_, asset::AssetDetail>(&key)?))
    }

    /// The certificate of `cert_type` issued for `symbol`, if any.
    pub fn cert(
        &self,
        symbol: &str,
        cert_type: cert::CertType,
    ) -> Result<Option<cert::AssetCert>, BoxError> {
        let key = format!("{}:{}", symbol, cert_type as u8);
        self.reader()
            .read(|| Ok(self.certs.zs_get::<_, cert::AssetCert>(&key)?))
    }

    /// The MIT record registered under `symbol`, if any.
    pub fn mit(&self, symbol: &str) -> Result<Option<mit::AssetMit>, BoxError> {
        let key = symbol.to_string();
        self.reader()
            .read(|| Ok(self.mits.zs_get::<_, mit::AssetMit>(&key)?))
    }

    /// The DID record registered under `symbol`, if any.
    pub fn did(&self, symbol: &str) -> Result<Option<did::Did>, BoxError> {
        let key = symbol.to_string();
        self.reader().read(|| Ok(self.dids.zs_get::<_, did::Did>(&key)?))
    }

    /// Every `Did` output registered or transferred for `symbol`, oldest
    /// first.
    pub fn did_history(&self, symbol: &str) -> Result<Vec<did::Did>, BoxError> {
        self.reader().read(|| scan_symbol_history(&self.did_history, symbol))
    }

    /// The addresses `symbol`'s DID has resolved to over its history,
    /// oldest first -- the issuing address, then each transfer's
    /// recipient in order.
    pub fn did_history_addresses(&self, symbol: &str) -> Result<Vec<String>, BoxError> {
        Ok(self
            .did_history(symbol)?
            .into_iter()
            .map(|did| did.address.0)
            .collect())
    }

    /// Every `AssetMit` output registered or transferred for `symbol`,
    /// oldest first.
    pub fn mit_history(&self, symbol: &str) -> Result<Vec<mit::AssetMit>, BoxError> {
        self.reader().read(|| scan_symbol_history(&self.mit_history, symbol))
    }

    /// Commits `block` as the new tip. The caller is responsible for
    /// ensuring `block`'s `previous_block_hash` matches the current tip
    /// and that the block has already passed full consensus validation;
    /// this method only performs the mechanical index writes and their
    /// bookkeeping.
    pub fn push_block(&self, block: Arc<Block>) -> Result<block::Height, BoxError> {
        self.write_guard.with_write(|| self.push_block_inner(block))
    }

    fn push_block_inner(&self, block: Arc<Block>) -> Result<block::Height, BoxError> {
        let height = block.coinbase_height().expect("consensus-valid blocks carry a height");
        let hash = block.hash();
        trace!(?height, %hash, "pushing block");

        self.blocks_index.zs_insert(&height, &hash)?;
        self.blocks.zs_insert(&height, &*block)?;

        for (index, transaction) in block.transactions.iter().enumerate() {
            let transaction_hash = transaction.hash();
            let stored = StoredTransaction {
                height,
                index: index as u32,
                transaction: transaction.clone(),
            };
            self.transactions.zs_insert(&transaction_hash, &stored)?;

            for input in &transaction.inputs {
                if let transparent::Input::PrevOut { outpoint, .. } = input {
                    self.spends.zs_insert(
                        outpoint,
                        &transparent::OutPoint {
                            hash: transaction_hash,
                            index: index as u32,
                        },
                    )?;
                }
            }

            for (output_index, output) in transaction.outputs.iter().enumerate() {
                let outpoint = transparent::OutPoint {
                    hash: transaction_hash,
                    index: output_index as u32,
                };
                self.record_history(&outpoint, output, height)?;
                self.index_attachment(&outpoint, output, height)?;
            }
        }

        Ok(height)
    }

    fn record_history(
        &self,
        outpoint: &transparent::OutPoint,
        output: &transparent::Output,
        height: block::Height,
    ) -> Result<(), BoxError> {
        let hash160 = match ScriptPattern::recognize(&output.lock_script) {
            ScriptPattern::Pkh { hash160 }
            | ScriptPattern::PkhWithLockHeight { hash160, .. }
            | ScriptPattern::PkhWithSequenceLock { hash160, .. }
            | ScriptPattern::PkhWithAttenuation { hash160, .. }
            | ScriptPattern::Sh { hash160 } => hash160,
            ScriptPattern::Other => return Ok(()),
        };
        let row = HistoryRow {
            point: *outpoint,
            height,
            value: output.value.value(),
            is_output: true,
        };
        let key = history_key(&hash160, height, outpoint.index);
        self.history.zs_insert(key.as_slice(), &row)?;
        Ok(())
    }

    fn index_attachment(
        &self,
        outpoint: &transparent::OutPoint,
        output: &transparent::Output,
        height: block::Height,
    ) -> Result<(), BoxError> {
        match &output.attachment.body {
            Body::AssetDetail(detail) => {
                self.assets.zs_insert(&detail.symbol.0, detail)?;
            }
            Body::AssetCert(cert) => {
                let key = format!("{}:{}", cert.symbol.0, cert.cert_type as u8);
                if let Some(previous) = self.certs.zs_get::<_, cert::AssetCert>(&key)? {
                    self.previous_attachment
                        .zs_insert(outpoint, &PreviousAttachment::Cert(previous))?;
                }
                self.certs.zs_insert(&key, cert)?;
            }
            Body::AssetMit(mit) => {
                if let Some(previous) = self.mits.zs_get::<_, mit::AssetMit>(&mit.symbol.0)? {
                    self.previous_attachment
                        .zs_insert(outpoint, &PreviousAttachment::Mit(previous))?;
                }
                self.mits.zs_insert(&mit.symbol.0, mit)?;
                self.account_mits
                    .zs_insert(&format!("{}:{}", mit.address.0, mit.symbol.0), outpoint)?;
                let key = symbol_history_key(&mit.symbol.0, height, outpoint.index);
                self.mit_history.zs_insert(key.as_slice(), mit)?;
            }
            Body::Did(did) => {
                let previous = self.dids.zs_get::<_, did::Did>(&did.symbol.0)?;
                if let Some(previous) = &previous {
                    self.previous_attachment
                        .zs_insert(outpoint, &PreviousAttachment::Did(previous.clone()))?;
                    if previous.address.0 != did.address.0 {
                        self.account_dids.remove(previous.address.0.as_bytes())?;
                    }
                }
                self.dids.zs_insert(&did.symbol.0, did)?;
                self.account_dids
                    .zs_insert(&did.address.0, &did.symbol.0)?;
                let key = symbol_history_key(&did.symbol.0, height, outpoint.index);
                self.did_history.zs_insert(key.as_slice(), did)?;
            }
            Body::Etp | Body::EtpAward | Body::Message(_) | Body::AssetTransfer(_) => {}
        }
        Ok(())
    }

    /// Reverts the current tip, undoing exactly the sub-writes
    /// `push_block` performed for it, in reverse order -- that symmetry
    /// is the correctness proof for reorgs.
    pub fn pop_block(&self) -> Result<Arc<Block>, BoxError> {
        self.write_guard.with_write(|| self.pop_block_inner())
    }

    fn pop_block_inner(&self) -> Result<Arc<Block>, BoxError> {
        let (height, hash) = self
            .tip_unguarded()?
            .ok_or("cannot pop from an empty store")?;
        let block = self
            .blocks
            .zs_get::<_, Block>(&height)?
            .ok_or("tip height missing from blocks table")?;
        trace!(?height, %hash, "popping block");

        for (index, transaction) in block.transactions.iter().enumerate() {
            let transaction_hash = transaction.hash();

            for (output_index, output) in transaction.outputs.iter().enumerate() {
                let outpoint = transparent::OutPoint {
                    hash: transaction_hash,
                    index: output_index as u32,
                };
                self.unindex_attachment(&outpoint, output, height)?;
                self.unrecord_history(&outpoint, output, height)?;
            }

            for input in &transaction.inputs {
                if let transparent::Input::PrevOut { outpoint, .. } = input {
                    self.spends.remove(outpoint.as_sled_key())?;
                }
            }

            self.transactions.remove(transaction_hash.as_sled_key())?;
            let _ = index;
        }

        self.blocks.remove(height.as_sled_key())?;
        self.blocks_index.remove(height.as_sled_key())?;

        Ok(Arc::new(block))
    }

    fn tip_unguarded(&self) -> Result<Option<(block::Height, block::Hash)>, BoxError> {
        match self.blocks_index.iter().rev().next().transpose()? {
            Some((height_bytes, hash_bytes)) => Ok(Some((
                block::Height::bitcoin_deserialize(&*height_bytes)?,
                block::Hash::bitcoin_deserialize(&*hash_bytes)?,
            ))),
            None => Ok(None),
        }
    }

    fn unrecord_history(
        &self,
        outpoint: &transparent::OutPoint,
        output: &transparent::Output,
        height: block::Height,
    ) -> Result<(), BoxError> {
        let hash160 = match ScriptPattern::recognize(&output.lock_script) {
            ScriptPattern::Pkh { hash160 }
            | ScriptPattern::PkhWithLockHeight { hash160, .. }
            | ScriptPattern::PkhWithSequenceLock { hash160, .. }
            | ScriptPattern::PkhWithAttenuation { hash160, .. }
            | ScriptPattern::Sh { hash160 } => hash160,
            ScriptPattern::Other => return Ok(()),
        };
        let key = history_key(&hash160, height, outpoint.index);
        self.history.remove(key)?;
        Ok(())
    }

    /// Undoes `index_attachment` for a popped output: a fresh
    /// registration's record is deleted outright, but a transfer's prior
    /// record (saved by `index_attachment` under this outpoint) is
    /// restored rather than erased, so popping only the transfer block
    /// leaves the registration below the fork intact.
    fn unindex_attachment(
        &self,
        outpoint: &transparent::OutPoint,
        output: &transparent::Output,
        height: block::Height,
    ) -> Result<(), BoxError> {
        match &output.attachment.body {
            Body::AssetDetail(detail) => {
                self.assets.remove(detail.symbol.0.as_bytes())?;
            }
            Body::AssetCert(cert) => {
                let key = format!("{}:{}", cert.symbol.0, cert.cert_type as u8);
                match self.previous_attachment.zs_get::<_, PreviousAttachment>(outpoint)? {
                    Some(PreviousAttachment::Cert(previous)) => {
                        self.certs.zs_insert(&key, &previous)?;
                    }
                    _ => {
                        self.certs.remove(key.as_bytes())?;
                    }
                }
                self.previous_attachment.remove(outpoint.as_sled_key())?;
            }
            Body::AssetMit(mit) => {
                let mit_key = symbol_history_key(&mit.symbol.0, height, outpoint.index);
                self.mit_history.remove(mit_key)?;
                self.account_mits
                    .remove(format!("{}:{}", mit.address.0, mit.symbol.0).as_bytes())?;
                match self.previous_attachment.zs_get::<_, PreviousAttachment>(outpoint)? {
                    Some(PreviousAttachment::Mit(previous)) => {
                        self.mits.zs_insert(&previous.symbol.0, &previous)?;
                    }
                    _ => {
                        self.mits.remove(mit.symbol.0.as_bytes())?;
                    }
                }
                self.previous_attachment.remove(outpoint.as_sled_key())?;
            }
            Body::Did(did) => {
                let did_key = symbol_history_key(&did.symbol.0, height, outpoint.index);
                self.did_history.remove(did_key)?;
                self.account_dids.remove(did.address.0.as_bytes())?;
                match self.previous_attachment.zs_get::<_, PreviousAttachment>(outpoint)? {
                    Some(PreviousAttachment::Did(previous)) => {
                        self.dids.zs_insert(&previous.symbol.0, &previous)?;
                        self.account_dids
                            .zs_insert(&previous.address.0, &previous.symbol.0)?;
                    }
                    _ => {
                        self.dids.remove(did.symbol.0.as_bytes())?;
                    }
                }
                self.previous_attachment.remove(outpoint.as_sled_key())?;
            }
            Body::Etp | Body::EtpAward | Body::Message(_) | Body::AssetTransfer(_) => {}
        }
        Ok(())
    }
}

/// An advisory lock file preventing a second process from opening the same
/// network's store concurrently. `ephemeral` stores
/// (tests, `sled`'s in-memory mode) use a PID-qualified path under the
/// system temp directory instead of the network directory, since they may
/// not have one.
fn acquire_process_lock(network_dir: &std::path::Path, ephemeral: bool) -> Result<fs::File, BoxError> {
    let lock_path: PathBuf = if ephemeral {
        std::env::temp_dir().join(format!("mvs-state-{}.lock", std::process::id()))
    } else {
        network_dir.join(".lock")
    };
    Ok(fs::OpenOptions::new()
        .write(true)
        .create(true)
        .open(&lock_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvs_chain::parameters::{genesis_block, Network};

    fn ephemeral_store() -> Store {
        mvs_test::init();
        let config = Config {
            ephemeral: true,
            ..Config::default()
        };
        Store::open(config, Network::Mainnet).expect("ephemeral store opens")
    }

    #[test]
    fn empty_store_has_no_tip() {
        let store = ephemeral_store();
        assert_eq!(store.tip().unwrap(), None);
        assert_eq!(store.tip_hash().unwrap(), GENESIS_PREVIOUS_BLOCK_HASH);
    }

    #[test]
    fn push_block_becomes_the_tip() {
        let store = ephemeral_store();
        let genesis = Arc::new(genesis_block(Network::Mainnet));
        let hash = genesis.hash();

        let height = store.push_block(genesis.clone()).unwrap();
        assert_eq!(height, block::Height(0));
        assert_eq!(store.tip().unwrap(), Some((height, hash)));

        let fetched = store.block(HashOrHeight::Height(height)).unwrap().unwrap();
        assert_eq!(fetched.hash(), hash);

        let coinbase_hash = genesis.transactions[0].hash();
        assert!(store.transaction(coinbase_hash).unwrap().is_some());
    }

    #[test]
    fn pop_block_is_the_exact_inverse_of_push_block() {
        let store = ephemeral_store();
        let genesis = Arc::new(genesis_block(Network::Mainnet));

        store.push_block(genesis.clone()).unwrap();
        let popped = store.pop_block().unwrap();

        assert_eq!(popped.hash(), genesis.hash());
        assert_eq!(store.tip().unwrap(), None);
        assert!(store
            .transaction(genesis.transactions[0].hash())
            .unwrap()
            .is_none());
    }
}
