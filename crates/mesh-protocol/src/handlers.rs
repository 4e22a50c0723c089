use std::collections::HashMap;

use tracing::warn;

use crate::config::{BootState, FIRMWARE_VERSION, BOOT_STATE_KEY, NODE_ADDRESS_KEY};
use crate::packet::Packet;
use crate::runtime::{Effect, NodeCore, NodeEvent};
use crate::sensor::SensorKind;
use crate::types::{PacketType, HUB_NODE_ID, HW_ADDR_LEN};

/// Processing logic for one packet type.
///
/// A handler runs only after the router decided the packet is for this
/// node and the dedup set admitted it. It mutates node state through
/// [`NodeCore`] and expresses everything outward-facing as effects.
pub trait PacketHandler: Send {
    fn handle(&mut self, packet: &Packet, core: &mut NodeCore) -> Vec<Effect>;
}

/// Maps packet types to their registered handlers.
pub struct DispatchTable {
    handlers: HashMap<PacketType, Box<dyn PacketHandler>>,
}

impl DispatchTable {
    /// An empty table. Useful for embedders that want full control
    /// over which types a node reacts to.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The standard sensor-node table: data requests, config updates,
    /// OTA offers, id assignment, and the sleep command.
    pub fn with_builtin_handlers() -> Self {
        let mut table = Self::new();

        for request in [
            PacketType::REQ_BATTERY_PCT,
            PacketType::REQ_BATTERY_VOLTAGE,
            PacketType::REQ_MOISTURE_PCT,
            PacketType::REQ_MOISTURE_VOLTAGE,
        ] {
            table.register(request, Box::new(SensorRequestHandler));
        }

        for update in [
            PacketType::UPDATE_SENSOR_HV,
            PacketType::UPDATE_SENSOR_LV,
            PacketType::UPDATE_BATTERY_HV,
            PacketType::UPDATE_BATTERY_LV,
            PacketType::UPDATE_SLEEP_DURATION,
        ] {
            table.register(update, Box::new(ConfigUpdateHandler));
        }

        table.register(PacketType::OTA_UPDATE_AVAILABLE, Box::new(OtaAvailableHandler));
        table.register(PacketType::NODE_CONNECTED_RESP, Box::new(ConnectedRespHandler));
        table.register(PacketType::GO_TO_SLEEP, Box::new(GoToSleepHandler));

        table
    }

    /// Register (or replace) the handler for a packet type.
    pub fn register(&mut self, packet_type: PacketType, handler: Box<dyn PacketHandler>) {
        self.handlers.insert(packet_type, handler);
    }

    /// Run the handler registered for the packet's type.
    ///
    /// An unregistered type is logged and dropped; the deliberate
    /// no-op type stays silent.
    pub fn dispatch(&mut self, packet: &Packet, core: &mut NodeCore) -> Vec<Effect> {
        match self.handlers.get_mut(&packet.packet_type) {
            Some(handler) => handler.handle(packet, core),
            None => {
                if !packet.packet_type.is_noop() {
                    warn!(
                        "no handler for packet type {} from node {}",
                        packet.packet_type, packet.source
                    );
                }
                Vec::new()
            }
        }
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::with_builtin_handlers()
    }
}

/// Little-endian u32 payload, the convention for every numeric value
/// on the wire.
fn read_u32_le(data: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

// ── Sensor data requests ────────────────────────────────────────────

/// Answers battery/moisture requests with the current reading,
/// converted to percent where the request asks for one.
///
/// Responses always go to the hub, regardless of the request's
/// source field. Data only ever flows node to hub.
pub struct SensorRequestHandler;

impl PacketHandler for SensorRequestHandler {
    fn handle(&mut self, packet: &Packet, core: &mut NodeCore) -> Vec<Effect> {
        let Some((kind, response_type)) = SensorKind::for_request(packet.packet_type) else {
            return Vec::new();
        };
        let value = kind.measure(core.sensor.as_mut(), &core.config);
        core.originate(
            response_type,
            HUB_NODE_ID,
            value.to_le_bytes().to_vec(),
            false,
        )
    }
}

// ── Configuration updates ───────────────────────────────────────────

/// Applies a calibration or sleep-duration update, persists it, and
/// acknowledges to the hub.
pub struct ConfigUpdateHandler;

impl PacketHandler for ConfigUpdateHandler {
    fn handle(&mut self, packet: &Packet, core: &mut NodeCore) -> Vec<Effect> {
        let Some(value) = read_u32_le(&packet.data) else {
            warn!(
                "config update {} with short payload ({} bytes)",
                packet.packet_type,
                packet.data.len()
            );
            return Vec::new();
        };
        let Some(store_key) = core.config.apply(packet.packet_type, value) else {
            return Vec::new();
        };
        core.store.set_u32(store_key, value);

        match packet.packet_type.ack_for_update() {
            Some(ack_type) => core.originate_empty(ack_type, HUB_NODE_ID),
            None => Vec::new(),
        }
    }
}

// ── OTA offers ──────────────────────────────────────────────────────

/// Compares an advertised firmware version against the running build.
///
/// A newer version is accepted: the install intent is persisted so it
/// survives the restart, and the response carries 0 to signal
/// acceptance. Otherwise the response carries the running version.
pub struct OtaAvailableHandler;

impl PacketHandler for OtaAvailableHandler {
    fn handle(&mut self, packet: &Packet, core: &mut NodeCore) -> Vec<Effect> {
        let Some(advertised) = read_u32_le(&packet.data) else {
            warn!("OTA offer with short payload ({} bytes)", packet.data.len());
            return Vec::new();
        };

        if advertised <= FIRMWARE_VERSION {
            return core.originate(
                PacketType::OTA_UPDATE_AVAILABLE_RESP,
                HUB_NODE_ID,
                FIRMWARE_VERSION.to_le_bytes().to_vec(),
                false,
            );
        }

        core.store
            .set_u32(BOOT_STATE_KEY, BootState::InstallOtaUpdate.as_u32());
        let addr = core.identity.hw_addr().to_store_string();
        core.store.set_str(NODE_ADDRESS_KEY, &addr);
        core.ota_pending = true;

        let mut effects = core.originate(
            PacketType::OTA_UPDATE_AVAILABLE_RESP,
            HUB_NODE_ID,
            0u32.to_le_bytes().to_vec(),
            false,
        );
        effects.push(Effect::BeginOtaUpdate);
        effects
    }
}

// ── Id assignment ───────────────────────────────────────────────────

/// Completes bootstrap: records the hub-assigned id and clears the
/// pending connected announcement.
pub struct ConnectedRespHandler;

impl PacketHandler for ConnectedRespHandler {
    fn handle(&mut self, packet: &Packet, core: &mut NodeCore) -> Vec<Effect> {
        // Payload: the target's hardware address, then the assigned id.
        // The router already matched the address against ours.
        let Some(&assigned_id) = packet.data.get(HW_ADDR_LEN) else {
            warn!(
                "connected response without assigned id ({} bytes)",
                packet.data.len()
            );
            return Vec::new();
        };

        core.identity.assign(assigned_id);
        let mut effects = core.acknowledge(PacketType::NODE_CONNECTED_RESP);
        effects.push(Effect::Emit(NodeEvent::IdAssigned {
            node_id: assigned_id,
        }));
        effects
    }
}

// ── Sleep command ───────────────────────────────────────────────────

/// Propagates the sleep command, then powers this node down.
///
/// The command is relayed verbatim (original source, key, and ttl) so
/// the whole mesh converges on the same flood, and broadcast twice —
/// peers start dropping connections as soon as they process it, and a
/// single send can race that teardown.
pub struct GoToSleepHandler;

impl PacketHandler for GoToSleepHandler {
    fn handle(&mut self, packet: &Packet, core: &mut NodeCore) -> Vec<Effect> {
        let mut effects = vec![
            Effect::Broadcast(packet.clone()),
            Effect::Broadcast(packet.clone()),
            Effect::DisconnectAllPeers,
        ];
        if core.ota_pending {
            effects.push(Effect::Restart);
        } else {
            effects.push(Effect::EnterDeepSleep(core.config.sleep_duration));
        }
        effects
    }
}
