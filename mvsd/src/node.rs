//! Wires the store, the organizer, and the wire protocol together and
//! drives them from accepted peer connections until told to shut down.
//!
//! The connection-serving shape here is grounded on `mvs-network`'s own
//! `Codec`/`Message` surface plus the block-acceptance algorithm
//! `mvs_organizer::Organizer::submit_block` already implements; this module
//! is the thinnest possible glue between a `TcpStream` and that algorithm,
//! not a peer-set or reconnection policy.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use mvs_chain::block;
use mvs_network::{Codec, InventoryHash, Message};
use mvs_organizer::Organizer;
use mvs_state::HashOrHeight;

use crate::config::NodeConfig;

/// Maximum number of headers/hashes served per `getheaders`/`getblocks`
/// response, matching Bitcoin's own `MAX_HEADERS_RESULTS`/`500` caps.
const MAX_HEADERS_PER_REPLY: usize = 2000;
const MAX_BLOCKS_PER_REPLY: usize = 500;

/// Opens the store, builds the organizer, and serves peers until a Ctrl+C
/// (or, on Unix, SIGTERM) is observed.
pub async fn run(config: NodeConfig) -> color_eyre::Result<()> {
    let store = mvs_state::Store::open(config.state.clone(), config.network)?;
    let tip = store.tip()?;
    info!(?tip, network = ?config.network, "opened store");

    let organizer = Arc::new(Mutex::new(Organizer::new(store, config.network)));

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "listening for peers");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;
                let organizer = organizer.clone();
                let network = config.network;
                tokio::spawn(async move {
                    if let Err(error) = serve_peer(stream, peer_addr, organizer, network).await {
                        warn!(%peer_addr, %error, "connection ended with an error");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal, stopping");
                return Ok(());
            }
        }
    }
}

/// Frames `stream` with the wire [`Codec`] and dispatches every decoded
/// [`Message`] until the peer disconnects or sends something malformed.
async fn serve_peer(
    stream: TcpStream,
    peer_addr: SocketAddr,
    organizer: Arc<Mutex<Organizer>>,
    network: mvs_chain::parameters::Network,
) -> color_eyre::Result<()> {
    debug!(%peer_addr, "accepted connection");
    let codec = Codec::builder().for_network(network).finish();
    let mut framed = Framed::new(stream, codec);

    while let Some(message) = framed.next().await {
        let message = message?;
        if let Some(reply) = handle_message(message, &organizer).await? {
            framed.send(reply).await?;
        }
    }

    debug!(%peer_addr, "connection closed");
    Ok(())
}

/// Applies one decoded message to the organizer, returning a reply to send
/// back to the peer, if any.
async fn handle_message(
    message: Message,
    organizer: &Arc<Mutex<Organizer>>,
) -> color_eyre::Result<Option<Message>> {
    match message {
        Message::Tx(tx) => {
            let mut organizer = organizer.lock().await;
            match organizer.submit_transaction(tx) {
                Ok(()) => debug!("accepted transaction into mempool"),
                Err(error) => debug!(%error, "rejected transaction"),
            }
            Ok(None)
        }
        Message::Block(candidate) => {
            let mut organizer = organizer.lock().await;
            let ctx = consensus_context_for(&candidate.header);
            match organizer.submit_block(candidate, ctx) {
                Ok(outcome) => debug!(?outcome, "processed block"),
                Err(error) => debug!(%error, "rejected block"),
            }
            Ok(None)
        }
        Message::GetHeaders(request) => {
            let organizer = organizer.lock().await;
            let headers = collect_headers(
                organizer.store(),
                &request.block_header_hashes,
                request.stop_hash,
            )?;
            Ok(Some(Message::Headers(headers)))
        }
        Message::GetBlocks(request) => {
            let organizer = organizer.lock().await;
            let hashes = collect_block_hashes(
                organizer.store(),
                &request.block_header_hashes,
                request.stop_hash,
            )?;
            Ok(Some(Message::Inv(hashes)))
        }
        Message::GetData(wanted) => {
            // Only the first item is answered per message; a peer asking for
            // more sends another `getdata`. Keeps this handler a direct
            // request/response instead of a multi-message burst.
            let organizer = organizer.lock().await;
            Ok(reply_to_getdata(organizer.store(), wanted.first())?)
        }
        Message::Mempool => {
            let organizer = organizer.lock().await;
            let hashes = organizer
                .mempool()
                .transactions()
                .map(|tx| InventoryHash::Tx(tx.hash()))
                .collect();
            Ok(Some(Message::Inv(hashes)))
        }
        Message::WitnessAnnounce(_) | Message::DidAnnounce(_) => {
            // Gossiped ahead of confirmation; this node has nowhere yet to
            // file a candidacy/DID announcement independent of a block
            // containing it, so these are observed but not acted on.
            Ok(None)
        }
        Message::Inv(_)
        | Message::NotFound(_)
        | Message::Headers(_)
        | Message::Reject { .. }
        | Message::FilterLoad { .. }
        | Message::MerkleBlock(_) => Ok(None),
    }
}

/// Picks the consensus context to validate a network-delivered block
/// under, based on its header version.
///
/// Only the proof-of-work path can be supplied automatically here: the
/// proof-of-stake and delegated proof-of-stake contexts need enumeration
/// indexes (controlled outputs, recently-used stakes, the epoch's witness
/// candidates) that `mvs-state` doesn't build yet, as
/// `mvs_organizer::organizer::ConsensusContext`'s own doc comment already
/// notes. A stake/witness block submitted over the wire is rejected with
/// `OrganizerError::MissingStakeContext`/`MissingWitnessContext` until
/// those indexes exist.
fn consensus_context_for(header: &block::Header) -> mvs_organizer::organizer::ConsensusContext {
    use mvs_organizer::organizer::ConsensusContext;
    match block::Version::from_header_version(header.version) {
        Some(block::Version::ProofOfStake) => ConsensusContext::ProofOfStake {
            stake_output_height: block::Height(0),
            controlled_outputs: Vec::new(),
            recently_used_stakes: Default::default(),
        },
        Some(block::Version::DelegatedProofOfStake) => ConsensusContext::DelegatedProofOfStake {
            epoch_start: chrono::Utc::now(),
            candidates: Vec::new(),
        },
        _ => ConsensusContext::ProofOfWork,
    }
}

/// Finds the first locator hash already known to `store` (falling back to
/// genesis), then walks forward collecting headers up to `stop_hash` or
/// [`MAX_HEADERS_PER_REPLY`], whichever comes first.
fn collect_headers(
    store: &mvs_state::Store,
    locator_hashes: &[block::Hash],
    stop_hash: Option<block::Hash>,
) -> color_eyre::Result<Vec<block::CountedHeader>> {
    let mut height = fork_height(store, locator_hashes)?;
    let mut headers = Vec::new();

    while headers.len() < MAX_HEADERS_PER_REPLY {
        height = match height.next() {
            Some(height) => height,
            None => break,
        };
        let block = match store.block(HashOrHeight::Height(height))? {
            Some(block) => block,
            None => break,
        };
        headers.push(block::CountedHeader {
            header: block.header,
            transaction_count: 0,
        });
        if Some(block::Hash::from(&block.header)) == stop_hash {
            break;
        }
    }

    Ok(headers)
}

/// Same fork-finding walk as [`collect_headers`], but collects block
/// hashes for an `inv` reply instead of full headers.
fn collect_block_hashes(
    store: &mvs_state::Store,
    locator_hashes: &[block::Hash],
    stop_hash: Option<block::Hash>,
) -> color_eyre::Result<Vec<InventoryHash>> {
    let mut height = fork_height(store, locator_hashes)?;
    let mut hashes = Vec::new();

    while hashes.len() < MAX_BLOCKS_PER_REPLY {
        height = match height.next() {
            Some(height) => height,
            None => break,
        };
        let block = match store.block(HashOrHeight::Height(height))? {
            Some(block) => block,
            None => break,
        };
        let hash = block::Hash::from(&block.header);
        hashes.push(InventoryHash::Block(hash));
        if Some(hash) == stop_hash {
            break;
        }
    }

    Ok(hashes)
}

/// The height to start walking forward from: the first locator hash (in
/// the order given, newest-first) that `store` recognizes, or genesis if
/// none are known.
fn fork_height(
    store: &mvs_state::Store,
    locator_hashes: &[block::Hash],
) -> color_eyre::Result<block::Height> {
    for &hash in locator_hashes {
        if let Some(height) = store.height_for_hash(hash)? {
            return Ok(height);
        }
    }
    Ok(block::Height(0))
}

/// Answers a single `getdata` entry with the object it names, if known.
fn reply_to_getdata(
    store: &mvs_state::Store,
    wanted: Option<&InventoryHash>,
) -> color_eyre::Result<Option<Message>> {
    match wanted {
        Some(InventoryHash::Block(hash)) | Some(InventoryHash::FilteredBlock(hash)) => {
            Ok(store.block(HashOrHeight::Hash(*hash))?.map(Message::Block))
        }
        Some(InventoryHash::Tx(hash)) => Ok(store.transaction(*hash)?.map(Message::Tx)),
        Some(InventoryHash::Error) | None => Ok(None),
    }
}
