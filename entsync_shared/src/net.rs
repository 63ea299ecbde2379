//! Network message intents.
//!
//! Goals:
//! - Describe what the entity sync layer sends and receives, not how bytes
//!   travel. The transport is someone else's problem.
//! - Every outgoing message carries a reliability class and a priority.
//! - Keep serialization explicit and versionable.

use anyhow::Context;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{control::ControlState, math::Vec3};

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Network player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

/// Network vehicle id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u16);

/// Seat index. Seat 0 is the driver, passengers start at 1.
pub type SeatId = u8;

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    Unreliable,
    UnreliableSequenced,
    Reliable,
    ReliableOrdered,
}

/// Send priority requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Weapon aim data, mirrored between peers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AimSyncData {
    pub aim_target: Vec3,
    pub shot_source: Vec3,
    pub shot_target: Vec3,
    pub look_at: Vec3,
}

/// On-foot state of one player for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnFootSync {
    pub player: PlayerId,
    pub position: Vec3,
    pub heading: f32,
    pub move_speed: Vec3,
    pub health: u32,
    pub armour: u32,
    pub weapon: u32,
    pub control: ControlState,
}

/// In-vehicle state of one player for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InVehicleSync {
    pub player: PlayerId,
    pub vehicle: VehicleId,
    pub seat: SeatId,
    pub health: u32,
    pub armour: u32,
    pub control: ControlState,
}

/// Message envelope for everything the entity layer exchanges with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMsg {
    // ─── Vehicle entry/exit ───
    /// Local player asks for a seat; the host relays it for remote players.
    VehicleEntryRequest {
        player: PlayerId,
        vehicle: VehicleId,
        seat: SeatId,
    },
    /// Host answer to a local entry request.
    VehicleEntryReply {
        player: PlayerId,
        vehicle: VehicleId,
        seat: SeatId,
        granted: bool,
    },
    VehicleEntryComplete {
        player: PlayerId,
        vehicle: VehicleId,
        seat: SeatId,
    },
    VehicleEntryCancelled {
        player: PlayerId,
        vehicle: VehicleId,
        seat: SeatId,
    },
    VehicleExitRequest {
        player: PlayerId,
        vehicle: VehicleId,
    },
    /// Host answer to a local exit request.
    VehicleExitReply {
        player: PlayerId,
        vehicle: VehicleId,
        granted: bool,
    },
    VehicleExitComplete {
        player: PlayerId,
        vehicle: VehicleId,
    },
    /// Ejected without an exit task (crash, destruction).
    VehicleExitForceful {
        player: PlayerId,
        vehicle: VehicleId,
    },
    VehicleDeath {
        vehicle: VehicleId,
    },

    // ─── Per-tick state ───
    OnFootSync(OnFootSync),
    InVehicleSync(InVehicleSync),
    AimSync {
        player: PlayerId,
        aim: AimSyncData,
    },

    // ─── Player table ───
    PlayerJoin {
        player: PlayerId,
        name: String,
        colour: u32,
    },
    PlayerQuit {
        player: PlayerId,
    },
    PlayerStreamIn {
        player: PlayerId,
        position: Vec3,
        health: u32,
    },
    PlayerStreamOut {
        player: PlayerId,
    },
}

impl SyncMsg {
    /// The player a message is about, if any.
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            SyncMsg::VehicleEntryRequest { player, .. }
            | SyncMsg::VehicleEntryReply { player, .. }
            | SyncMsg::VehicleEntryComplete { player, .. }
            | SyncMsg::VehicleEntryCancelled { player, .. }
            | SyncMsg::VehicleExitRequest { player, .. }
            | SyncMsg::VehicleExitReply { player, .. }
            | SyncMsg::VehicleExitComplete { player, .. }
            | SyncMsg::VehicleExitForceful { player, .. }
            | SyncMsg::AimSync { player, .. }
            | SyncMsg::PlayerJoin { player, .. }
            | SyncMsg::PlayerQuit { player }
            | SyncMsg::PlayerStreamIn { player, .. }
            | SyncMsg::PlayerStreamOut { player } => Some(*player),
            SyncMsg::OnFootSync(s) => Some(s.player),
            SyncMsg::InVehicleSync(s) => Some(s.player),
            SyncMsg::VehicleDeath { .. } => None,
        }
    }
}

/// An outgoing message together with its delivery class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingRpc {
    pub msg: SyncMsg,
    pub priority: Priority,
    pub reliability: Reliability,
}

/// Anything that can hand messages to the transport.
pub trait RpcSink {
    fn send(&mut self, msg: SyncMsg, priority: Priority, reliability: Reliability);
}

/// Collects outgoing messages until the transport drains them.
#[derive(Debug, Default)]
pub struct RpcOutbox {
    queue: Vec<OutgoingRpc>,
}

impl RpcOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued messages.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued messages in send order.
    pub fn pending(&self) -> &[OutgoingRpc] {
        &self.queue
    }

    /// Takes every queued message.
    pub fn drain(&mut self) -> Vec<OutgoingRpc> {
        std::mem::take(&mut self.queue)
    }
}

impl RpcSink for RpcOutbox {
    fn send(&mut self, msg: SyncMsg, priority: Priority, reliability: Reliability) {
        debug!(?msg, ?priority, ?reliability, "Queue rpc");
        self.queue.push(OutgoingRpc {
            msg,
            priority,
            reliability,
        });
    }
}

/// Convenience codec helpers.
pub fn encode_to_bytes(rpc: &OutgoingRpc) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(rpc).context("serialize")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<OutgoingRpc> {
    serde_json::from_slice(b).context("deserialize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_preserves_send_order() {
        let mut outbox = RpcOutbox::new();
        outbox.send(
            SyncMsg::VehicleExitRequest {
                player: PlayerId(1),
                vehicle: VehicleId(7),
            },
            Priority::High,
            Reliability::Reliable,
        );
        outbox.send(
            SyncMsg::VehicleDeath {
                vehicle: VehicleId(7),
            },
            Priority::High,
            Reliability::UnreliableSequenced,
        );

        assert_eq!(outbox.len(), 2);
        let drained = outbox.drain();
        assert!(outbox.is_empty());
        assert!(matches!(drained[0].msg, SyncMsg::VehicleExitRequest { .. }));
        assert_eq!(drained[1].reliability, Reliability::UnreliableSequenced);
    }

    #[test]
    fn rpc_survives_codec() {
        let rpc = OutgoingRpc {
            msg: SyncMsg::VehicleEntryRequest {
                player: PlayerId(3),
                vehicle: VehicleId(12),
                seat: 2,
            },
            priority: Priority::High,
            reliability: Reliability::Reliable,
        };
        let bytes = encode_to_bytes(&rpc).unwrap();
        assert_eq!(decode_from_bytes(&bytes).unwrap(), rpc);
    }

    #[test]
    fn message_player_lookup() {
        let msg = SyncMsg::VehicleDeath {
            vehicle: VehicleId(1),
        };
        assert_eq!(msg.player(), None);

        let msg = SyncMsg::PlayerQuit {
            player: PlayerId(9),
        };
        assert_eq!(msg.player(), Some(PlayerId(9)));
    }
}
