use crate::types::{HwAddr, PROVISIONAL_NODE_ID};

/// Progress of acquiring a hub-assigned node id.
///
/// `Assigned` is terminal for the session; only a reboot returns a
/// node to `Provisional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    /// Initial state: the node answers to the reserved provisional id.
    Provisional,
    /// The connected announcement is registered and awaiting its ack.
    AwaitingAssignment,
    /// The hub has assigned a permanent id.
    Assigned,
}

/// This node's identity: its (possibly provisional) logical id, its
/// radio hardware address, and the counter that supplies idempotency
/// keys for every packet it originates.
pub struct NodeIdentity {
    node_id: u8,
    hw_addr: HwAddr,
    key_counter: u8,
    bootstrap: BootstrapState,
}

impl NodeIdentity {
    pub fn new(hw_addr: HwAddr) -> Self {
        Self {
            node_id: PROVISIONAL_NODE_ID,
            hw_addr,
            key_counter: 0,
            bootstrap: BootstrapState::Provisional,
        }
    }

    pub fn node_id(&self) -> u8 {
        self.node_id
    }

    pub fn hw_addr(&self) -> HwAddr {
        self.hw_addr
    }

    pub fn bootstrap(&self) -> BootstrapState {
        self.bootstrap
    }

    /// Draw the key for the next originated packet. Wraps at 256.
    pub fn next_idempotency_key(&mut self) -> u8 {
        let key = self.key_counter;
        self.key_counter = self.key_counter.wrapping_add(1);
        key
    }

    /// Start the provisioning exchange. Returns `true` only the first
    /// time per session — repeated link-available signals must not
    /// re-announce.
    pub fn begin_provisioning(&mut self) -> bool {
        if self.bootstrap == BootstrapState::Provisional {
            self.bootstrap = BootstrapState::AwaitingAssignment;
            true
        } else {
            false
        }
    }

    /// Record the id assigned by the hub.
    pub fn assign(&mut self, node_id: u8) {
        self.node_id = node_id;
        self.bootstrap = BootstrapState::Assigned;
    }
}
