//! Simulated hub-and-sensors mesh.
//!
//! Spawns N node runtimes over a shared lossy broadcast "radio" plus a
//! scripted hub, then drives a full duty cycle: bootstrap, data
//! requests, a config update, and the go-to-sleep command.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use mesh_protocol::{
    HwAddr, MemoryStore, NodeChannels, NodeEvent, NodeRuntime, Packet, PacketType, RuntimeConfig,
    SensorChannel, SensorReader, Transport, HUB_NODE_ID, HW_ADDR_LEN, PROVISIONAL_NODE_ID, STD_TTL,
};
use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing::{debug, info};

/// Sender tag the hub uses on the shared radio channel.
const HUB_TAG: u8 = u8::MAX;

/// First id the hub hands out.
const FIRST_ASSIGNED_ID: u8 = 5;

#[derive(Parser)]
#[command(name = "mesh-sim", about = "Simulated flood-mesh duty cycle")]
struct Cli {
    /// Number of sensor nodes.
    #[arg(short, long, default_value = "3")]
    nodes: usize,

    /// Probability that any single broadcast is lost.
    #[arg(long, default_value = "0.0")]
    loss: f64,

    /// Resend cadence in seconds for unacknowledged packets.
    #[arg(long, default_value = "2")]
    resend_secs: u64,

    /// Per-phase timeout in seconds.
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

// ── Radio ───────────────────────────────────────────────────────────

/// Shared-medium radio: every broadcast reaches every other station,
/// except when the loss dice say otherwise.
#[derive(Clone)]
struct SimRadio {
    tag: u8,
    tx: broadcast::Sender<(u8, Vec<u8>)>,
    loss: f64,
}

#[async_trait::async_trait]
impl Transport for SimRadio {
    async fn broadcast(&self, data: &[u8]) -> Result<(), String> {
        if self.loss > 0.0 && rand::rng().random_bool(self.loss) {
            debug!("radio: frame from {} lost", self.tag);
            return Ok(());
        }
        // Send errors only mean no receivers are left.
        let _ = self.tx.send((self.tag, data.to_vec()));
        Ok(())
    }
}

// ── Sensors ─────────────────────────────────────────────────────────

struct SimSensor {
    battery_mv: u32,
    moisture_mv: u32,
}

impl SensorReader for SimSensor {
    fn read_value(&mut self, channel: SensorChannel) -> u32 {
        // A little jitter so repeated runs look like a real ADC.
        let noise = rand::rng().random_range(0..8u32);
        match channel {
            SensorChannel::Battery => self.battery_mv + noise,
            SensorChannel::Moisture => self.moisture_mv + noise,
        }
    }
}

fn node_addr(i: usize) -> HwAddr {
    HwAddr([0x02, 0x00, 0x5E, 0x10, 0x00, i as u8])
}

// ── Hub ─────────────────────────────────────────────────────────────

/// The scripted hub: assigns ids, queries every node, pushes one
/// config update, then puts the mesh to sleep.
struct Hub {
    radio: SimRadio,
    rx: broadcast::Receiver<(u8, Vec<u8>)>,
    key_counter: u8,
    /// Hardware address → assigned id.
    assigned: HashMap<[u8; HW_ADDR_LEN], u8>,
}

impl Hub {
    fn new(radio: SimRadio, rx: broadcast::Receiver<(u8, Vec<u8>)>) -> Self {
        Self {
            radio,
            rx,
            key_counter: 0,
            assigned: HashMap::new(),
        }
    }

    async fn send(&mut self, packet_type: PacketType, dest: u8, data: Vec<u8>) -> anyhow::Result<()> {
        let key = self.key_counter;
        self.key_counter = self.key_counter.wrapping_add(1);
        let packet = Packet {
            source: HUB_NODE_ID,
            dest,
            ttl: STD_TTL,
            idempotency_key: key,
            packet_type,
            data,
        };
        let bytes = packet.to_bytes().context("encode hub packet")?;
        self.radio
            .broadcast(&bytes)
            .await
            .map_err(|e| anyhow::anyhow!("hub broadcast: {e}"))?;
        Ok(())
    }

    /// Next packet addressed to the hub. Relayed duplicates are left
    /// in — every caller filters by type and source, and a duplicate
    /// that slips through only repeats an idempotent hub action.
    async fn recv(&mut self) -> anyhow::Result<Packet> {
        loop {
            let (from, bytes) = match self.rx.recv().await {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("hub: lagged {n} frames");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => bail!("radio channel closed"),
            };
            if from == HUB_TAG {
                continue;
            }
            let Ok(packet) = Packet::decode(&bytes) else {
                continue;
            };
            if packet.dest == HUB_NODE_ID {
                return Ok(packet);
            }
        }
    }

    /// Answer connected announcements until every expected node has an id.
    async fn assign_ids(&mut self, expected: usize) -> anyhow::Result<()> {
        while self.assigned.len() < expected {
            let packet = self.recv().await?;
            if packet.packet_type != PacketType::NODE_CONNECTED {
                continue;
            }
            let Ok(addr) = <[u8; HW_ADDR_LEN]>::try_from(packet.data.as_slice()) else {
                continue;
            };
            let next_id = FIRST_ASSIGNED_ID + self.assigned.len() as u8;
            let id = *self.assigned.entry(addr).or_insert(next_id);
            info!("hub: {} -> id {id}", HwAddr(addr));

            let mut data = addr.to_vec();
            data.push(id);
            self.send(PacketType::NODE_CONNECTED_RESP, PROVISIONAL_NODE_ID, data)
                .await?;
        }
        Ok(())
    }

    /// Query one node and wait for the matching response.
    async fn query(&mut self, request: PacketType, response: PacketType, id: u8) -> anyhow::Result<u32> {
        self.send(request, id, Vec::new()).await?;
        loop {
            let packet = self.recv().await?;
            if packet.packet_type == response && packet.source == id {
                let bytes: [u8; 4] = packet
                    .data
                    .as_slice()
                    .try_into()
                    .context("short response payload")?;
                return Ok(u32::from_le_bytes(bytes));
            }
        }
    }

    /// Push a config update and wait for its acknowledgement.
    async fn update(&mut self, update: PacketType, id: u8, value: u32) -> anyhow::Result<()> {
        let ack = update.ack_for_update().context("not a config update")?;
        self.send(update, id, value.to_le_bytes().to_vec()).await?;
        loop {
            let packet = self.recv().await?;
            if packet.packet_type == ack && packet.source == id {
                return Ok(());
            }
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.nodes == 0 || cli.nodes > 200 {
        bail!("--nodes must be between 1 and 200");
    }
    if !(0.0..=1.0).contains(&cli.loss) {
        bail!("--loss must be a probability between 0.0 and 1.0");
    }
    let phase_timeout = Duration::from_secs(cli.timeout_secs);

    let (radio_tx, _) = broadcast::channel::<(u8, Vec<u8>)>(4096);

    // Collects node events from every runtime, tagged by node index.
    let (node_event_tx, mut node_events) = mpsc::channel::<(usize, NodeEvent)>(256);

    let mut handles = Vec::new();
    for i in 0..cli.nodes {
        let radio = SimRadio {
            tag: i as u8,
            tx: radio_tx.clone(),
            loss: cli.loss,
        };
        let mut radio_rx = radio_tx.subscribe();

        let NodeChannels { handle, mut events } = NodeRuntime::spawn(
            radio.clone(),
            node_addr(i),
            Box::new(SimSensor {
                battery_mv: 1600 + 40 * i as u32,
                moisture_mv: 1900 + 25 * i as u32,
            }),
            Box::new(MemoryStore::new()),
            RuntimeConfig {
                resend_cadence: Duration::from_secs(cli.resend_secs),
            },
        );

        // Pump: shared radio → this node, skipping its own frames.
        let pump_handle = handle.clone();
        tokio::spawn(async move {
            loop {
                match radio_rx.recv().await {
                    Ok((from, bytes)) if from != i as u8 => {
                        pump_handle.packet_received(bytes).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // Surface node events to the coordinator.
        let event_tx = node_event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if event_tx.send((i, event)).await.is_err() {
                    break;
                }
            }
        });

        handles.push(handle);
    }
    drop(node_event_tx);

    let hub_radio = SimRadio {
        tag: HUB_TAG,
        tx: radio_tx.clone(),
        loss: cli.loss,
    };
    let mut hub = Hub::new(hub_radio, radio_tx.subscribe());

    // ── Phase 1: bootstrap ──────────────────────────────────────────
    for handle in &handles {
        handle.link_available().await;
    }
    timeout(phase_timeout, hub.assign_ids(cli.nodes))
        .await
        .context("bootstrap timed out")??;
    info!("all {} nodes assigned", cli.nodes);

    let ids: Vec<u8> = hub.assigned.values().copied().collect();

    // ── Phase 2: data round ─────────────────────────────────────────
    for &id in &ids {
        let battery = timeout(
            phase_timeout,
            hub.query(PacketType::REQ_BATTERY_PCT, PacketType::RESP_BATTERY_PCT, id),
        )
        .await
        .context("battery query timed out")??;
        let moisture = timeout(
            phase_timeout,
            hub.query(PacketType::REQ_MOISTURE_PCT, PacketType::RESP_MOISTURE_PCT, id),
        )
        .await
        .context("moisture query timed out")??;
        println!("node {id}: battery {battery}%, moisture {moisture}%");
    }

    // ── Phase 3: config update ──────────────────────────────────────
    let first = ids[0];
    timeout(
        phase_timeout,
        hub.update(PacketType::UPDATE_SLEEP_DURATION, first, 300),
    )
    .await
    .context("config update timed out")??;
    info!("node {first}: sleep duration updated and acknowledged");

    // ── Phase 4: sleep ──────────────────────────────────────────────
    hub.send(PacketType::GO_TO_SLEEP, u8::MAX, Vec::new()).await?;

    let mut asleep = 0;
    while asleep < cli.nodes {
        let (i, event) = timeout(phase_timeout, node_events.recv())
            .await
            .context("sleep phase timed out")?
            .context("all runtimes gone")?;
        match event {
            NodeEvent::EnterDeepSleep(duration) => {
                info!("node index {i}: deep sleep for {duration:?}");
                asleep += 1;
            }
            NodeEvent::Restart => {
                info!("node index {i}: restarting into updater");
                asleep += 1;
            }
            other => debug!("node index {i}: {other:?}"),
        }
    }

    println!("mesh cycle complete: {} nodes slept", cli.nodes);
    Ok(())
}
