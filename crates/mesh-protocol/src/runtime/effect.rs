use std::time::Duration;

use crate::packet::Packet;

use super::NodeEvent;

/// Intention produced by the pure node logic.
///
/// Every handle_* / tick_* method returns `Vec<Effect>`; the event loop
/// then executes the effects against the transport, the timers, and the
/// event channel. Keeping the logic effect-based means all routing and
/// handler behavior is testable without a radio.
#[derive(Debug)]
pub enum Effect {
    /// Re-broadcast a packet to every connected peer.
    Broadcast(Packet),

    /// Arm the resend timer. Idempotent — a second start while armed
    /// does not reset the cadence.
    StartResendTimer,

    /// Disarm the resend timer; nothing is awaiting acknowledgement.
    StopResendTimer,

    /// Tear down all peer connections before sleep or restart.
    DisconnectAllPeers,

    /// Power down for the configured duration.
    EnterDeepSleep(Duration),

    /// Persisted boot state says install: hand off to the updater.
    BeginOtaUpdate,

    /// Reboot immediately (after an update was staged).
    Restart,

    /// Surface an event to the embedding application.
    Emit(NodeEvent),
}
