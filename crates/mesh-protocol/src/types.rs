use std::fmt;

/// Logical id of the hub — the single data sink every sensor reports to.
pub const HUB_NODE_ID: u8 = 0;

/// Id a node uses before the hub has assigned it a permanent one.
pub const PROVISIONAL_NODE_ID: u8 = 1;

/// Hop budget given to freshly originated packets.
pub const STD_TTL: u8 = 5;

/// Fixed header: source, dest, ttl, idempotency key, type, data length.
pub const HEADER_LEN: usize = 6;

/// Maximum payload bytes per packet (radio MTU minus the header).
pub const MAX_DATA_LEN: usize = 14;

/// Largest wire size a packet can occupy — one radio write.
pub const MAX_WIRE_LEN: usize = HEADER_LEN + MAX_DATA_LEN;

/// Bytes in a radio hardware address.
pub const HW_ADDR_LEN: usize = 6;

/// Packet type tag — selects the semantics of the payload and the
/// handler that runs when the packet is processed locally.
///
/// The set is open on the wire (any `u8` decodes), so this is a
/// newtype over the raw tag rather than a closed enum; unknown types
/// are routed normally and dropped at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(pub u8);

impl PacketType {
    /// Deliberate no-op; never dispatched, never warned about.
    pub const NOOP: PacketType = PacketType(0);

    // Control types
    pub const NODE_CONNECTED: PacketType = PacketType(1);
    pub const NODE_CONNECTED_RESP: PacketType = PacketType(2);
    pub const OTA_UPDATE_AVAILABLE: PacketType = PacketType(3);
    pub const OTA_UPDATE_AVAILABLE_RESP: PacketType = PacketType(4);
    pub const GO_TO_SLEEP: PacketType = PacketType(5);

    // Data request/response types
    pub const REQ_BATTERY_PCT: PacketType = PacketType(10);
    pub const RESP_BATTERY_PCT: PacketType = PacketType(11);
    pub const REQ_BATTERY_VOLTAGE: PacketType = PacketType(12);
    pub const RESP_BATTERY_VOLTAGE: PacketType = PacketType(13);
    pub const REQ_MOISTURE_PCT: PacketType = PacketType(14);
    pub const RESP_MOISTURE_PCT: PacketType = PacketType(15);
    pub const REQ_MOISTURE_VOLTAGE: PacketType = PacketType(16);
    pub const RESP_MOISTURE_VOLTAGE: PacketType = PacketType(17);

    // Configuration update/ack types
    pub const UPDATE_SENSOR_HV: PacketType = PacketType(30);
    pub const ACK_SENSOR_HV: PacketType = PacketType(31);
    pub const UPDATE_SENSOR_LV: PacketType = PacketType(32);
    pub const ACK_SENSOR_LV: PacketType = PacketType(33);
    pub const UPDATE_BATTERY_HV: PacketType = PacketType(34);
    pub const ACK_BATTERY_HV: PacketType = PacketType(35);
    pub const UPDATE_BATTERY_LV: PacketType = PacketType(36);
    pub const ACK_BATTERY_LV: PacketType = PacketType(37);
    pub const UPDATE_SLEEP_DURATION: PacketType = PacketType(38);
    pub const ACK_SLEEP_DURATION: PacketType = PacketType(39);

    pub fn is_noop(self) -> bool {
        self.0 == 0
    }

    /// The request type a pending entry was registered under, given the
    /// response type that acknowledges it.
    ///
    /// The mapping is static and 1:1; the reliable-delivery registry is
    /// keyed by request type because the idempotency key is rewritten
    /// on every resend.
    pub fn request_for_response(self) -> Option<PacketType> {
        match self {
            PacketType::NODE_CONNECTED_RESP => Some(PacketType::NODE_CONNECTED),
            PacketType::OTA_UPDATE_AVAILABLE_RESP => Some(PacketType::OTA_UPDATE_AVAILABLE),
            PacketType::ACK_SENSOR_HV => Some(PacketType::UPDATE_SENSOR_HV),
            PacketType::ACK_SENSOR_LV => Some(PacketType::UPDATE_SENSOR_LV),
            PacketType::ACK_BATTERY_HV => Some(PacketType::UPDATE_BATTERY_HV),
            PacketType::ACK_BATTERY_LV => Some(PacketType::UPDATE_BATTERY_LV),
            PacketType::ACK_SLEEP_DURATION => Some(PacketType::UPDATE_SLEEP_DURATION),
            _ => None,
        }
    }

    /// The ack type a node replies with after applying a config update.
    pub fn ack_for_update(self) -> Option<PacketType> {
        match self {
            PacketType::UPDATE_SENSOR_HV => Some(PacketType::ACK_SENSOR_HV),
            PacketType::UPDATE_SENSOR_LV => Some(PacketType::ACK_SENSOR_LV),
            PacketType::UPDATE_BATTERY_HV => Some(PacketType::ACK_BATTERY_HV),
            PacketType::UPDATE_BATTERY_LV => Some(PacketType::ACK_BATTERY_LV),
            PacketType::UPDATE_SLEEP_DURATION => Some(PacketType::ACK_SLEEP_DURATION),
            _ => None,
        }
    }
}

impl From<u8> for PacketType {
    fn from(raw: u8) -> Self {
        PacketType(raw)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Radio hardware address of a node — the identity a node has before
/// the hub assigns it a logical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HwAddr(pub [u8; HW_ADDR_LEN]);

impl HwAddr {
    pub fn as_bytes(&self) -> &[u8; HW_ADDR_LEN] {
        &self.0
    }

    /// Colon-free rendering safe for use as a flash store value.
    pub fn to_store_string(self) -> String {
        self.to_string().replace(':', "-")
    }
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
