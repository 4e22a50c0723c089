use crate::error::MeshProtocolError;
use crate::identity::NodeIdentity;
use crate::packet::Packet;
use crate::types::PacketType;

/// Default number of packets that may await acknowledgement at once.
/// A hard memory constraint on the embedded target; configurable here
/// but deliberately small.
pub const DEFAULT_PENDING_CAPACITY: usize = 2;

/// Bounded pool of outbound packets awaiting acknowledgement.
///
/// Each entry is an owned copy of the packet as originated; the sender
/// keeps no alias after registration. Entries are keyed by *request
/// packet type*, not idempotency key — the key is rewritten on every
/// resend, because every node that already processed the original
/// flood would silently drop a resend carrying the stale key.
pub struct PendingRegistry {
    entries: Vec<Packet>,
    capacity: usize,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PENDING_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Take ownership of a packet until it is acknowledged.
    ///
    /// Capacity exhaustion is surfaced, not evicted — the caller
    /// decides whether a dropped registration is fatal.
    pub fn register(&mut self, packet: Packet) -> Result<(), MeshProtocolError> {
        if self.entries.len() >= self.capacity {
            return Err(MeshProtocolError::RegistryFull {
                capacity: self.capacity,
            });
        }
        self.entries.push(packet);
        Ok(())
    }

    /// Rewrite every entry's idempotency key and return the copies to
    /// re-broadcast, one per entry.
    pub fn resend_sweep(&mut self, identity: &mut NodeIdentity) -> Vec<Packet> {
        self.entries
            .iter_mut()
            .map(|pending| {
                pending.idempotency_key = identity.next_idempotency_key();
                pending.clone()
            })
            .collect()
    }

    /// Remove the pending request that `response_type` acknowledges.
    ///
    /// Returns `false` for a stray or duplicate acknowledgement — a
    /// silent no-op by design.
    pub fn acknowledge(&mut self, response_type: PacketType) -> bool {
        let Some(request_type) = response_type.request_for_response() else {
            return false;
        };
        match self
            .entries
            .iter()
            .position(|p| p.packet_type == request_type)
        {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PendingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
