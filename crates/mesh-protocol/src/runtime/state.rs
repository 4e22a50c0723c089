use tracing::{debug, warn};

use crate::config::NodeConfig;
use crate::dedup::DedupSet;
use crate::handlers::DispatchTable;
use crate::identity::{BootstrapState, NodeIdentity};
use crate::packet::Packet;
use crate::registry::PendingRegistry;
use crate::router::{decide, RoutingDecision};
use crate::sensor::SensorReader;
use crate::store::Persistence;
use crate::types::{HwAddr, PacketType, HUB_NODE_ID, STD_TTL};

use super::effect::Effect;
use super::NodeEvent;

/// Mutable node state shared with packet handlers.
///
/// Split out of [`NodeState`] so a handler can borrow all of it
/// mutably while the dispatch table that invoked the handler stays
/// borrowed separately.
pub struct NodeCore {
    pub(crate) identity: NodeIdentity,
    pub(crate) dedup: DedupSet,
    pub(crate) registry: PendingRegistry,
    pub(crate) config: NodeConfig,
    pub(crate) sensor: Box<dyn SensorReader>,
    pub(crate) store: Box<dyn Persistence>,
    /// An OTA update was accepted this session; restart instead of
    /// sleeping when the shutdown command arrives.
    pub(crate) ota_pending: bool,
}

impl NodeCore {
    pub fn new(hw_addr: HwAddr, sensor: Box<dyn SensorReader>, store: Box<dyn Persistence>) -> Self {
        let config = NodeConfig::load(store.as_ref());
        Self {
            identity: NodeIdentity::new(hw_addr),
            dedup: DedupSet::new(),
            registry: PendingRegistry::new(),
            config,
            sensor,
            store,
            ota_pending: false,
        }
    }

    /// Originate a packet from this node.
    ///
    /// Draws a fresh idempotency key and the standard hop budget. With
    /// `await_ack` the packet is also registered for resend; if the
    /// registry is full the origination is dropped entirely — sending
    /// without tracking would defeat the delivery guarantee.
    pub fn originate(
        &mut self,
        packet_type: PacketType,
        dest: u8,
        data: Vec<u8>,
        await_ack: bool,
    ) -> Vec<Effect> {
        let packet = Packet {
            source: self.identity.node_id(),
            dest,
            ttl: STD_TTL,
            idempotency_key: self.identity.next_idempotency_key(),
            packet_type,
            data,
        };

        let mut effects = Vec::new();
        if await_ack {
            if let Err(e) = self.registry.register(packet.clone()) {
                warn!("dropping origination of {packet_type}: {e}");
                effects.push(Effect::Emit(NodeEvent::RegistryFull { packet_type }));
                return effects;
            }
            effects.push(Effect::StartResendTimer);
        }
        effects.push(Effect::Broadcast(packet));
        effects
    }

    /// Originate an acknowledgement carrying no meaningful payload.
    /// The single zero byte keeps the frame non-empty on transports
    /// that treat zero-length writes as errors.
    pub fn originate_empty(&mut self, packet_type: PacketType, dest: u8) -> Vec<Effect> {
        self.originate(packet_type, dest, vec![0], false)
    }

    /// Clear the pending entry `response_type` acknowledges, stopping
    /// the resend timer once nothing is left awaiting delivery.
    pub fn acknowledge(&mut self, response_type: PacketType) -> Vec<Effect> {
        if self.registry.acknowledge(response_type) && self.registry.is_empty() {
            return vec![Effect::StopResendTimer];
        }
        Vec::new()
    }
}

/// Complete node state — pure logic, zero async, zero radio.
///
/// Every handle_* / tick_* method returns `Vec<Effect>`. No method
/// touches the transport or the channels; the event loop does that.
pub struct NodeState {
    core: NodeCore,
    dispatch: DispatchTable,
}

impl NodeState {
    pub fn new(hw_addr: HwAddr, sensor: Box<dyn SensorReader>, store: Box<dyn Persistence>) -> Self {
        Self {
            core: NodeCore::new(hw_addr, sensor, store),
            dispatch: DispatchTable::with_builtin_handlers(),
        }
    }

    /// Build with a custom handler table instead of the builtins.
    pub fn with_dispatch(
        hw_addr: HwAddr,
        sensor: Box<dyn SensorReader>,
        store: Box<dyn Persistence>,
        dispatch: DispatchTable,
    ) -> Self {
        Self {
            core: NodeCore::new(hw_addr, sensor, store),
            dispatch,
        }
    }

    // ── Inbound packets ──────────────────────────────────────────────

    /// A raw frame arrived off the radio.
    ///
    /// Malformed frames are logged and dropped; a flood network
    /// delivers duplicates anyway, so one bad frame is never fatal.
    pub fn handle_packet_bytes(&mut self, bytes: &[u8]) -> Vec<Effect> {
        match Packet::decode(bytes) {
            Ok(packet) => self.handle_packet(packet),
            Err(e) => {
                debug!("bad frame: {e}");
                Vec::new()
            }
        }
    }

    /// Route one decoded packet.
    pub fn handle_packet(&mut self, mut packet: Packet) -> Vec<Effect> {
        let decision = decide(
            &packet,
            self.core.identity.node_id(),
            self.core.identity.hw_addr(),
            &self.core.dedup,
        );
        match decision {
            RoutingDecision::Process => {
                self.core.dedup.mark_processed(packet.idempotency_key);
                self.dispatch.dispatch(&packet, &mut self.core)
            }
            RoutingDecision::Forward => {
                packet.ttl = packet.ttl.saturating_sub(1);
                vec![Effect::Broadcast(packet)]
            }
            RoutingDecision::Terminate => Vec::new(),
        }
    }

    // ── Link events ──────────────────────────────────────────────────

    /// The link layer reports connectivity. The first signal per
    /// session announces this node to the hub; later signals are
    /// ignored so reconnects never re-enter provisioning.
    pub fn handle_link_available(&mut self) -> Vec<Effect> {
        if !self.core.identity.begin_provisioning() {
            return Vec::new();
        }
        let hw_addr = self.core.identity.hw_addr();
        self.core.originate(
            PacketType::NODE_CONNECTED,
            HUB_NODE_ID,
            hw_addr.as_bytes().to_vec(),
            true,
        )
    }

    // ── Origination (embedder command) ───────────────────────────────

    pub fn handle_originate(
        &mut self,
        packet_type: PacketType,
        dest: u8,
        data: Vec<u8>,
        await_ack: bool,
    ) -> Vec<Effect> {
        self.core.originate(packet_type, dest, data, await_ack)
    }

    // ── Tick: resend sweep ───────────────────────────────────────────

    /// Re-broadcast every unacknowledged packet under a fresh
    /// idempotency key. A resend under the original key would be
    /// dropped as a duplicate by every node that already relayed the
    /// first flood.
    pub fn tick_resend(&mut self) -> Vec<Effect> {
        if self.core.registry.is_empty() {
            return vec![Effect::StopResendTimer];
        }
        self.core
            .registry
            .resend_sweep(&mut self.core.identity)
            .into_iter()
            .map(Effect::Broadcast)
            .collect()
    }

    // ── Introspection ────────────────────────────────────────────────

    pub fn node_id(&self) -> u8 {
        self.core.identity.node_id()
    }

    pub fn bootstrap(&self) -> BootstrapState {
        self.core.identity.bootstrap()
    }

    pub fn pending_count(&self) -> usize {
        self.core.registry.len()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.core.config
    }
}
