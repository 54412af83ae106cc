/// Message types and codec exposed to peers, as opposed to internal
/// service-layer types.
pub mod external;
