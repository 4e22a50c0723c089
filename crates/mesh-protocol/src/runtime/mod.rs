/// Node runtime — integrates the protocol modules into a live event loop.
///
/// The runtime owns all node state (identity, dedup set, pending
/// registry, config, handler table) and a [`Transport`]. It exposes a
/// channel-based API so the embedding layer (firmware glue, simulator)
/// never touches raw routing or handler internals: it feeds in received
/// frames and link events, and receives hardware requests back out.
mod effect;
mod r#loop;
pub mod state;
mod transport;

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::MeshProtocolError;
use crate::sensor::SensorReader;
use crate::store::Persistence;
use crate::types::{HwAddr, PacketType};

pub use effect::Effect;
pub use state::{NodeCore, NodeState};
pub use transport::Transport;

#[cfg(test)]
pub(crate) use transport::mock::MockTransport;

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for the node runtime.
pub struct RuntimeConfig {
    /// Cadence at which unacknowledged packets are re-broadcast.
    pub resend_cadence: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            resend_cadence: Duration::from_secs(10),
        }
    }
}

// ── Commands (embedder → runtime) ─────────────────────────────────────

/// Commands the embedding layer sends to the runtime event loop.
pub enum NodeCommand {
    /// A raw frame arrived off the radio.
    PacketReceived(Vec<u8>),
    /// The link layer reports at least one peer is reachable.
    LinkAvailable,
    /// Originate a packet from this node.
    Originate {
        packet_type: PacketType,
        dest: u8,
        data: Vec<u8>,
        await_ack: bool,
    },
    /// Graceful shutdown.
    Shutdown,
}

// ── Events (runtime → embedder) ───────────────────────────────────────

/// Hardware requests and notifications the embedding layer acts on.
/// The runtime never touches power, the updater, or the link layer
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// The hub assigned this node its permanent id.
    IdAssigned { node_id: u8 },
    /// An origination was dropped because the pending registry is full.
    RegistryFull { packet_type: PacketType },
    /// Tear down all peer connections.
    DisconnectAllPeers,
    /// Power down for the given duration.
    EnterDeepSleep(Duration),
    /// Hand off to the OTA updater.
    BeginOtaUpdate,
    /// Reboot now.
    Restart,
}

// ── NodeHandle (embedder-facing API) ──────────────────────────────────

/// Handle to communicate with a running node runtime.
///
/// Cheap to clone. All methods are non-blocking channel sends.
#[derive(Clone)]
pub struct NodeHandle {
    cmd_tx: mpsc::Sender<NodeCommand>,
}

impl NodeHandle {
    /// Feed a raw received frame into the node.
    pub async fn packet_received(&self, bytes: Vec<u8>) {
        let _ = self.cmd_tx.send(NodeCommand::PacketReceived(bytes)).await;
    }

    /// Signal that the link layer has connectivity. The first signal
    /// per session triggers the connected announcement.
    pub async fn link_available(&self) {
        let _ = self.cmd_tx.send(NodeCommand::LinkAvailable).await;
    }

    /// Originate a packet from this node.
    pub async fn originate(
        &self,
        packet_type: PacketType,
        dest: u8,
        data: Vec<u8>,
        await_ack: bool,
    ) -> Result<(), MeshProtocolError> {
        self.cmd_tx
            .send(NodeCommand::Originate {
                packet_type,
                dest,
                data,
                await_ack,
            })
            .await
            .map_err(|_| MeshProtocolError::ChannelClosed)
    }

    /// Graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(NodeCommand::Shutdown).await;
    }
}

// ── NodeChannels ──────────────────────────────────────────────────────

/// Channels returned to the embedding layer when the runtime starts.
pub struct NodeChannels {
    /// Handle to send commands to the runtime.
    pub handle: NodeHandle,
    /// Receive hardware requests and notifications.
    pub events: mpsc::Receiver<NodeEvent>,
}

// ── NodeRuntime ───────────────────────────────────────────────────────

/// The node runtime — spawn it and communicate via channels.
pub struct NodeRuntime;

impl NodeRuntime {
    /// Create and start the node runtime.
    ///
    /// Takes ownership of the transport and the hardware collaborators.
    /// Returns channels for the embedding layer. Spawns the event loop
    /// as a tokio task.
    pub fn spawn<T>(
        transport: T,
        hw_addr: HwAddr,
        sensor: Box<dyn SensorReader>,
        store: Box<dyn Persistence>,
        config: RuntimeConfig,
    ) -> NodeChannels
    where
        T: Transport + Sync + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<NodeCommand>(64);
        let (event_tx, event_rx) = mpsc::channel::<NodeEvent>(64);

        let state = NodeState::new(hw_addr, sensor, store);

        tokio::spawn(r#loop::node_loop(transport, state, config, cmd_rx, event_tx));

        NodeChannels {
            handle: NodeHandle { cmd_tx },
            events: event_rx,
        }
    }
}
