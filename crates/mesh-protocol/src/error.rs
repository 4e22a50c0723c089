/// Protocol-level errors for the mesh core.
///
/// Decode and routing failures are handled inside the core and never
/// escape to collaborators; only registry exhaustion and a shut-down
/// runtime are worth surfacing to the caller.
#[derive(Debug, thiserror::Error)]
pub enum MeshProtocolError {
    #[error("packet truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    #[error("payload too large: {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("destination buffer too small: need {needed} bytes, capacity is {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    #[error("pending-response registry full (capacity {capacity})")]
    RegistryFull { capacity: usize },

    #[error("node runtime shut down")]
    ChannelClosed,
}
