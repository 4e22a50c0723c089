/// Per-packet routing decision for the flood protocol.
///
/// Pure logic — no I/O, no transport, and never mutates the packet.
/// The caller acts on the returned decision: a forwarded packet has
/// its TTL decremented by the forwarder before re-broadcast.
use crate::dedup::DedupSet;
use crate::packet::Packet;
use crate::types::{HwAddr, PacketType, HW_ADDR_LEN};

/// What this node does with an inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Mark the idempotency key and run the registered handler.
    Process,
    /// Decrement the TTL and re-broadcast to all peers.
    Forward,
    /// Drop silently — duplicate, exhausted, or not ours to relay.
    Terminate,
}

/// Decide how this node handles `packet`.
pub fn decide(
    packet: &Packet,
    node_id: u8,
    hw_addr: HwAddr,
    dedup: &DedupSet,
) -> RoutingDecision {
    if packet.dest == node_id {
        if packet.packet_type == PacketType::NODE_CONNECTED_RESP {
            // A connected response is addressed by the hardware address
            // embedded in its payload, not by logical id: the target
            // had no assigned id when it made the request this response
            // completes, and every provisional node shares the same id.
            if packet.data.len() >= HW_ADDR_LEN && packet.data[..HW_ADDR_LEN] == hw_addr.0 {
                return RoutingDecision::Process;
            }
            return RoutingDecision::Forward;
        }
        if dedup.is_processed(packet.idempotency_key) {
            return RoutingDecision::Terminate;
        }
        return RoutingDecision::Process;
    }

    if packet.packet_type == PacketType::GO_TO_SLEEP {
        // Runs its handler on every node it passes through; the handler
        // itself forwards the command before tearing down connections.
        return RoutingDecision::Process;
    }

    if packet.ttl == 0 {
        return RoutingDecision::Terminate;
    }

    RoutingDecision::Forward
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HUB_NODE_ID, STD_TTL};

    const MY_ID: u8 = 3;
    const MY_ADDR: HwAddr = HwAddr([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);

    fn packet(dest: u8, ttl: u8, key: u8, packet_type: PacketType) -> Packet {
        Packet {
            source: 9,
            dest,
            ttl,
            idempotency_key: key,
            packet_type,
            data: Vec::new(),
        }
    }

    #[test]
    fn request_for_us_is_processed_then_deduplicated() {
        let mut dedup = DedupSet::new();
        let req = packet(MY_ID, 4, 77, PacketType::REQ_BATTERY_PCT);

        assert_eq!(
            decide(&req, MY_ID, MY_ADDR, &dedup),
            RoutingDecision::Process
        );

        // The caller marks before dispatch; an identical re-delivery
        // afterwards terminates.
        dedup.mark_processed(77);
        assert_eq!(
            decide(&req, MY_ID, MY_ADDR, &dedup),
            RoutingDecision::Terminate
        );
    }

    #[test]
    fn ttl_zero_for_someone_else_terminates() {
        let dedup = DedupSet::new();
        let p = packet(5, 0, 1, PacketType::REQ_MOISTURE_PCT);
        assert_eq!(decide(&p, MY_ID, MY_ADDR, &dedup), RoutingDecision::Terminate);
    }

    #[test]
    fn live_packet_for_someone_else_forwards() {
        let dedup = DedupSet::new();
        let p = packet(5, 3, 1, PacketType::REQ_MOISTURE_PCT);
        assert_eq!(decide(&p, MY_ID, MY_ADDR, &dedup), RoutingDecision::Forward);
    }

    #[test]
    fn go_to_sleep_processed_regardless_of_dest_and_ttl() {
        let dedup = DedupSet::new();
        for (dest, ttl) in [(5u8, 0u8), (5, 3), (200, 0)] {
            let p = packet(dest, ttl, 1, PacketType::GO_TO_SLEEP);
            assert_eq!(
                decide(&p, MY_ID, MY_ADDR, &dedup),
                RoutingDecision::Process,
                "dest={dest} ttl={ttl}"
            );
        }
    }

    #[test]
    fn connected_resp_with_our_address_is_processed() {
        let dedup = DedupSet::new();
        let mut p = packet(1, STD_TTL, 1, PacketType::NODE_CONNECTED_RESP);
        p.data = MY_ADDR.0.to_vec();
        p.data.push(7); // assigned id
        assert_eq!(decide(&p, 1, MY_ADDR, &dedup), RoutingDecision::Process);
    }

    #[test]
    fn connected_resp_for_another_address_is_forwarded() {
        // During the bootstrap window every provisional node shares the
        // same logical id, so dest matches — only the embedded address
        // disambiguates.
        let dedup = DedupSet::new();
        let mut p = packet(1, STD_TTL, 1, PacketType::NODE_CONNECTED_RESP);
        p.data = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 7];
        assert_eq!(decide(&p, 1, MY_ADDR, &dedup), RoutingDecision::Forward);
    }

    #[test]
    fn connected_resp_with_short_payload_is_forwarded() {
        let dedup = DedupSet::new();
        let mut p = packet(1, STD_TTL, 1, PacketType::NODE_CONNECTED_RESP);
        p.data = vec![0x10, 0x20];
        assert_eq!(decide(&p, 1, MY_ADDR, &dedup), RoutingDecision::Forward);
    }

    #[test]
    fn connected_resp_bypasses_dedup_when_addressed_to_us() {
        let mut dedup = DedupSet::new();
        dedup.mark_processed(42);
        let mut p = packet(1, STD_TTL, 42, PacketType::NODE_CONNECTED_RESP);
        p.data = MY_ADDR.0.to_vec();
        p.data.push(7);
        assert_eq!(decide(&p, 1, MY_ADDR, &dedup), RoutingDecision::Process);
    }

    #[test]
    fn duplicate_for_hub_bound_traffic_not_checked_when_relaying() {
        // Dedup only applies to packets addressed to us; relayed
        // traffic is bounded by TTL alone.
        let mut dedup = DedupSet::new();
        dedup.mark_processed(9);
        let p = packet(HUB_NODE_ID, 2, 9, PacketType::RESP_BATTERY_PCT);
        assert_eq!(decide(&p, MY_ID, MY_ADDR, &dedup), RoutingDecision::Forward);
    }
}
