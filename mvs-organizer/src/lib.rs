//! Block and transaction ingestion: accepts candidate blocks and
//! transactions from the network (or any other source) and decides what
//! to do with them -- connect, queue as an orphan, reorganize, or reject
//! -- based on the [`mvs_consensus`] validation rules.

pub mod error;
pub mod mempool;
pub mod notify;
pub mod organizer;
pub mod orphan;

pub use error::OrganizerError;
pub use mempool::Mempool;
pub use organizer::{ConsensusContext, Organizer, ReorgEvent, SubmitOutcome};
pub use orphan::OrphanPool;
