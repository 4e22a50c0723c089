use bytes::{Buf, BufMut};

use crate::error::MeshProtocolError;
use crate::types::{PacketType, HEADER_LEN, MAX_DATA_LEN};

/// A mesh data packet — the unit of communication in the sensor mesh.
///
/// Wire layout is six single-byte fields in fixed order (source, dest,
/// ttl, idempotency key, type, data length) followed by `data_length`
/// payload bytes. All fields are single bytes, so there are no
/// endianness concerns at this layer; multi-byte payload values are
/// little-endian by convention of the target hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Originating node id. 0 is the hub, 1 is provisional.
    pub source: u8,
    /// Intended recipient, or a value interpreted specially per type.
    pub dest: u8,
    /// Remaining hop budget. Decremented by the forwarder, not here.
    pub ttl: u8,
    /// Per-origin sequence value used to recognize re-floods.
    pub idempotency_key: u8,
    /// Selects payload semantics and the processing handler.
    pub packet_type: PacketType,
    /// 0..=14 payload bytes.
    pub data: Vec<u8>,
}

impl Packet {
    /// Encoded size: fixed header plus payload.
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.data.len()
    }

    /// Serialize into `buf`, returning the number of bytes written.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, MeshProtocolError> {
        if self.data.len() > MAX_DATA_LEN {
            return Err(MeshProtocolError::PayloadTooLarge {
                len: self.data.len(),
                max: MAX_DATA_LEN,
            });
        }
        let needed = self.wire_len();
        if buf.len() < needed {
            return Err(MeshProtocolError::BufferTooSmall {
                needed,
                capacity: buf.len(),
            });
        }

        let mut cursor = &mut buf[..needed];
        cursor.put_u8(self.source);
        cursor.put_u8(self.dest);
        cursor.put_u8(self.ttl);
        cursor.put_u8(self.idempotency_key);
        cursor.put_u8(self.packet_type.0);
        cursor.put_u8(self.data.len() as u8);
        cursor.put_slice(&self.data);

        Ok(needed)
    }

    /// Serialize to a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MeshProtocolError> {
        let mut out = vec![0u8; self.wire_len()];
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Deserialize from raw bytes received off the radio.
    ///
    /// Trailing bytes beyond the declared data length are ignored — the
    /// transport may pad a write up to the MTU.
    pub fn decode(bytes: &[u8]) -> Result<Packet, MeshProtocolError> {
        let got = bytes.len();
        if got < HEADER_LEN {
            return Err(MeshProtocolError::Truncated {
                needed: HEADER_LEN,
                got,
            });
        }

        let mut cursor = bytes;
        let source = cursor.get_u8();
        let dest = cursor.get_u8();
        let ttl = cursor.get_u8();
        let idempotency_key = cursor.get_u8();
        let packet_type = PacketType(cursor.get_u8());
        let data_length = cursor.get_u8() as usize;

        if data_length > MAX_DATA_LEN {
            return Err(MeshProtocolError::PayloadTooLarge {
                len: data_length,
                max: MAX_DATA_LEN,
            });
        }
        if cursor.remaining() < data_length {
            return Err(MeshProtocolError::Truncated {
                needed: HEADER_LEN + data_length,
                got,
            });
        }

        Ok(Packet {
            source,
            dest,
            ttl,
            idempotency_key,
            packet_type,
            data: cursor[..data_length].to_vec(),
        })
    }

    /// Whether two packets describe the same logical event.
    ///
    /// Only origin and idempotency key participate — a re-flood of the
    /// same event may arrive with a different ttl or even payload.
    pub fn same_event(&self, other: &Packet) -> bool {
        self.source == other.source && self.idempotency_key == other.idempotency_key
    }
}
