//! The on-disk store: a `sled`-backed set of tables plus the
//! single-writer/seqlock-reader discipline that makes reorgs
//! (pop-then-push) safe to observe concurrently.
//!
//! Kept on `sled` rather than reimplemented as a from-scratch slab/bucket
//! file format -- see `DESIGN.md` -- generalized to the full table set
//! this store needs, with plain synchronous read methods rather than
//! `async`/`tokio`-flavored ones (the queueing/notify machinery that
//! would justify async moves to `mvs-organizer` in this repository).

mod config;
mod sled_format;
mod store;

pub use config::Config;
pub use store::{Reader, Store, WriteGuard};

use mvs_chain::block;

/// A type-erased error, for a crate boundary that doesn't want to commit
/// callers to one concrete error enum.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Many lookups (`Store::block`, in particular) are equally happy given
/// either a height or a hash.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HashOrHeight {
    Hash(block::Hash),
    Height(block::Height),
}

impl From<block::Hash> for HashOrHeight {
    fn from(hash: block::Hash) -> Self {
        HashOrHeight::Hash(hash)
    }
}

impl From<block::Height> for HashOrHeight {
    fn from(height: block::Height) -> Self {
        HashOrHeight::Height(height)
    }
}
