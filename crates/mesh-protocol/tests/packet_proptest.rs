use mesh_protocol::{
    MeshProtocolError, Packet, PacketType, HEADER_LEN, MAX_DATA_LEN, MAX_WIRE_LEN,
};
use proptest::prelude::*;

proptest! {
    /// Any in-bounds packet should survive a wire roundtrip.
    #[test]
    fn roundtrip_packet(
        source in any::<u8>(),
        dest in any::<u8>(),
        ttl in any::<u8>(),
        idempotency_key in any::<u8>(),
        raw_type in any::<u8>(),
        data in prop::collection::vec(any::<u8>(), 0..=MAX_DATA_LEN),
    ) {
        let packet = Packet {
            source,
            dest,
            ttl,
            idempotency_key,
            packet_type: PacketType(raw_type),
            data,
        };

        let bytes = packet.to_bytes().expect("encode");
        prop_assert!(bytes.len() <= MAX_WIRE_LEN);
        prop_assert_eq!(bytes.len(), packet.wire_len());

        let decoded = Packet::decode(&bytes).expect("decode");
        prop_assert_eq!(&packet, &decoded);
    }

    /// Transport padding after the declared payload never changes the
    /// decoded packet.
    #[test]
    fn padding_is_ignored(
        data in prop::collection::vec(any::<u8>(), 0..=MAX_DATA_LEN),
        padding in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let packet = Packet {
            source: 3,
            dest: 0,
            ttl: 5,
            idempotency_key: 77,
            packet_type: PacketType::RESP_MOISTURE_PCT,
            data,
        };

        let mut bytes = packet.to_bytes().expect("encode");
        bytes.extend(padding);

        let decoded = Packet::decode(&bytes).expect("decode");
        prop_assert_eq!(&packet, &decoded);
    }

    /// Oversized payloads are rejected on both sides of the codec.
    #[test]
    fn oversized_payload_rejected(
        extra in 1..=100usize,
    ) {
        let packet = Packet {
            source: 1,
            dest: 2,
            ttl: 3,
            idempotency_key: 4,
            packet_type: PacketType::NOOP,
            data: vec![0; MAX_DATA_LEN + extra],
        };
        let rejected = matches!(
            packet.to_bytes(),
            Err(MeshProtocolError::PayloadTooLarge { .. })
        );
        prop_assert!(rejected);
    }

    /// Every buffer shorter than the header fails to decode.
    #[test]
    fn short_header_rejected(
        bytes in prop::collection::vec(any::<u8>(), 0..HEADER_LEN),
    ) {
        let rejected = matches!(
            Packet::decode(&bytes),
            Err(MeshProtocolError::Truncated { .. })
        );
        prop_assert!(rejected);
    }

    /// A declared data length past the end of the buffer fails to
    /// decode rather than reading garbage.
    #[test]
    fn truncated_payload_rejected(
        declared in 1..=MAX_DATA_LEN as u8,
        present in 0..MAX_DATA_LEN as u8,
    ) {
        prop_assume!(present < declared);
        let mut bytes = vec![1, 2, 3, 4, 5, declared];
        bytes.extend(vec![0u8; present as usize]);
        let rejected = matches!(
            Packet::decode(&bytes),
            Err(MeshProtocolError::Truncated { .. })
        );
        prop_assert!(rejected);
    }
}
