//! Protocol-wide constants for the wire format.

/// Current wire protocol version, written into `getheaders`/`getblocks`
/// payloads. There is no version negotiation handshake in this crate's
/// scope, so this is just a fixed value peers are expected to agree on
/// out of band.
pub const CURRENT_VERSION: u32 = 70_001;

/// Maximum size of a protocol message body, matching Bitcoin's own limit.
pub const MAX_PROTOCOL_MESSAGE_LEN: usize = 2 * 1024 * 1024;

/// Maximum size of a `filterload` bloom filter, per BIP37.
pub const MAX_FILTER_LENGTH: usize = 36_000;

/// Maximum number of hash functions a `filterload` bloom filter may request.
pub const MAX_FILTER_HASH_FUNCTIONS: u32 = 50;
