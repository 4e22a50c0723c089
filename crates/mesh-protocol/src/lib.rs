//! Mesh protocol layer for battery-powered sensor nodes.
//!
//! Implements the packet codec, flood routing, at-most-once
//! processing, reliable delivery, and the node bootstrap exchange for
//! a hub-and-sensors mesh with no routing tables: every relayed packet
//! is re-broadcast to all peers under a decrementing hop budget.
//!
//! Wire format: a 6-byte header (source, dest, ttl, idempotency key,
//! type, data length) plus up to 14 payload bytes. Multi-byte payload
//! values are little-endian.

pub mod config;
pub mod dedup;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod packet;
pub mod registry;
pub mod router;
pub mod runtime;
pub mod sensor;
pub mod store;
pub mod types;

pub use config::{BootState, NodeConfig, FIRMWARE_VERSION};
pub use dedup::DedupSet;
pub use error::MeshProtocolError;
pub use handlers::{DispatchTable, PacketHandler};
pub use identity::{BootstrapState, NodeIdentity};
pub use packet::Packet;
pub use registry::{PendingRegistry, DEFAULT_PENDING_CAPACITY};
pub use router::{decide, RoutingDecision};
pub use runtime::{
    Effect, NodeChannels, NodeCommand, NodeCore, NodeEvent, NodeHandle, NodeRuntime, NodeState,
    RuntimeConfig, Transport,
};
pub use sensor::{SensorChannel, SensorKind, SensorReader};
pub use store::{MemoryStore, Persistence};
pub use types::{
    HwAddr, PacketType, HEADER_LEN, HUB_NODE_ID, HW_ADDR_LEN, MAX_DATA_LEN, MAX_WIRE_LEN,
    PROVISIONAL_NODE_ID, STD_TTL,
};
