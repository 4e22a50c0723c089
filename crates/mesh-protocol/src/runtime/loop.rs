/// The node runtime event loop.
///
/// A single async task that owns all mutable node state and
/// multiplexes over embedder commands and the resend timer. All
/// decisions come back from [`NodeState`] as effects; this loop only
/// executes them.
use tokio::sync::mpsc;
use tokio::time::{interval, Interval};
use tracing::{debug, warn};

use super::effect::Effect;
use super::state::NodeState;
use super::transport::Transport;
use super::{NodeCommand, NodeEvent, RuntimeConfig};

pub(super) async fn node_loop<T: Transport + Sync>(
    transport: T,
    mut state: NodeState,
    config: RuntimeConfig,
    mut cmd_rx: mpsc::Receiver<NodeCommand>,
    event_tx: mpsc::Sender<NodeEvent>,
) {
    // Armed only while the pending registry is non-empty.
    let mut resend_timer: Option<Interval> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let effects = match cmd {
                    NodeCommand::PacketReceived(bytes) => state.handle_packet_bytes(&bytes),
                    NodeCommand::LinkAvailable => state.handle_link_available(),
                    NodeCommand::Originate { packet_type, dest, data, await_ack } => {
                        state.handle_originate(packet_type, dest, data, await_ack)
                    }
                    NodeCommand::Shutdown => break,
                };
                execute_effects(effects, &transport, &event_tx, &mut resend_timer, &config).await;
            }

            _ = resend_tick(&mut resend_timer) => {
                let effects = state.tick_resend();
                execute_effects(effects, &transport, &event_tx, &mut resend_timer, &config).await;
            }
        }
    }

    debug!("node loop exiting");
}

/// Await the next resend tick, or forever while the timer is disarmed.
async fn resend_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn execute_effects<T: Transport + Sync>(
    effects: Vec<Effect>,
    transport: &T,
    event_tx: &mpsc::Sender<NodeEvent>,
    resend_timer: &mut Option<Interval>,
    config: &RuntimeConfig,
) {
    for effect in effects {
        match effect {
            Effect::Broadcast(packet) => match packet.to_bytes() {
                Ok(bytes) => {
                    if let Err(e) = transport.broadcast(&bytes).await {
                        // Transient by nature in a flood network; the
                        // resend sweep covers tracked packets.
                        warn!("broadcast of {} failed: {e}", packet.packet_type);
                    }
                }
                Err(e) => warn!("unencodable packet {}: {e}", packet.packet_type),
            },
            Effect::StartResendTimer => {
                if resend_timer.is_none() {
                    let mut t = interval(config.resend_cadence);
                    // Consume the immediate first tick; resends start
                    // one full cadence after registration.
                    t.tick().await;
                    *resend_timer = Some(t);
                }
            }
            Effect::StopResendTimer => {
                *resend_timer = None;
            }
            Effect::DisconnectAllPeers => {
                let _ = event_tx.send(NodeEvent::DisconnectAllPeers).await;
            }
            Effect::EnterDeepSleep(duration) => {
                let _ = event_tx.send(NodeEvent::EnterDeepSleep(duration)).await;
            }
            Effect::BeginOtaUpdate => {
                let _ = event_tx.send(NodeEvent::BeginOtaUpdate).await;
            }
            Effect::Restart => {
                let _ = event_tx.send(NodeEvent::Restart).await;
            }
            Effect::Emit(event) => {
                let _ = event_tx.send(event).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::packet::Packet;
    use crate::runtime::{MockTransport, NodeChannels, NodeRuntime, RuntimeConfig};
    use crate::sensor::testing::FixedSensor;
    use crate::store::MemoryStore;
    use crate::types::{HwAddr, PacketType, HUB_NODE_ID, PROVISIONAL_NODE_ID, STD_TTL};

    use super::NodeEvent;

    const ADDR: HwAddr = HwAddr([0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5]);

    fn spawn_node(transport: MockTransport) -> NodeChannels {
        NodeRuntime::spawn(
            transport,
            ADDR,
            Box::new(FixedSensor {
                battery_mv: 1900,
                moisture_mv: 2100,
            }),
            Box::new(MemoryStore::new()),
            RuntimeConfig {
                resend_cadence: Duration::from_secs(10),
            },
        )
    }

    async fn settle() {
        // Paused-clock runtimes run all ready tasks on sleep.
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn link_available_broadcasts_announce() {
        let transport = MockTransport::new();
        let channels = spawn_node(transport.clone());

        channels.handle.link_available().await;
        settle().await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let announce = Packet::decode(&sent[0]).expect("decode");
        assert_eq!(announce.packet_type, PacketType::NODE_CONNECTED);
        assert_eq!(announce.source, PROVISIONAL_NODE_ID);
        assert_eq!(announce.data, ADDR.0.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn unacked_announce_is_resent_with_fresh_key() {
        let transport = MockTransport::new();
        let channels = spawn_node(transport.clone());

        channels.handle.link_available().await;
        settle().await;
        let first_key = Packet::decode(&transport.sent()[0])
            .expect("decode")
            .idempotency_key;
        transport.clear_sent();

        // Two cadences with no acknowledgement: two resends.
        tokio::time::sleep(Duration::from_secs(25)).await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        let keys: Vec<u8> = sent
            .iter()
            .map(|b| Packet::decode(b).expect("decode").idempotency_key)
            .collect();
        assert!(!keys.contains(&first_key));
        assert_ne!(keys[0], keys[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn assignment_stops_resends_and_emits_event() {
        let transport = MockTransport::new();
        let mut channels = spawn_node(transport.clone());

        channels.handle.link_available().await;
        settle().await;
        transport.clear_sent();

        let mut data = ADDR.0.to_vec();
        data.push(7);
        let resp = Packet {
            source: HUB_NODE_ID,
            dest: PROVISIONAL_NODE_ID,
            ttl: STD_TTL,
            idempotency_key: 0,
            packet_type: PacketType::NODE_CONNECTED_RESP,
            data,
        };
        channels
            .handle
            .packet_received(resp.to_bytes().expect("encode"))
            .await;
        settle().await;

        assert_eq!(
            channels.events.recv().await,
            Some(NodeEvent::IdAssigned { node_id: 7 })
        );

        // No further resends once acknowledged.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_command_surfaces_hardware_events() {
        let transport = MockTransport::new();
        let mut channels = spawn_node(transport.clone());

        let cmd = Packet {
            source: HUB_NODE_ID,
            dest: 200,
            ttl: 2,
            idempotency_key: 9,
            packet_type: PacketType::GO_TO_SLEEP,
            data: Vec::new(),
        };
        channels
            .handle
            .packet_received(cmd.to_bytes().expect("encode"))
            .await;
        settle().await;

        // Relayed twice before teardown.
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(
            channels.events.recv().await,
            Some(NodeEvent::DisconnectAllPeers)
        );
        assert!(matches!(
            channels.events.recv().await,
            Some(NodeEvent::EnterDeepSleep(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn broadcast_failure_does_not_kill_the_loop() {
        let transport = MockTransport::new();
        transport.set_fail_sends(true);
        let channels = spawn_node(transport.clone());

        channels.handle.link_available().await;
        settle().await;
        assert!(transport.sent().is_empty());

        // The loop is still alive and sends once the radio recovers.
        transport.set_fail_sends(false);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(transport.sent().len(), 1);
    }
}
