//! Player manager.
//!
//! Owns the local player and every known remote player, and routes
//! incoming messages to the right entity.

use std::collections::BTreeMap;

use entsync_shared::net::{PlayerId, SyncMsg};
use tracing::{debug, info, warn};

use crate::{context::SyncContext, player::PlayerEntity, vehicle::ExitVehicleMode};

#[derive(Debug)]
pub struct PlayerManager {
    local: PlayerEntity,
    remotes: BTreeMap<PlayerId, PlayerEntity>,
}

impl PlayerManager {
    pub fn new(local: PlayerEntity) -> Self {
        Self {
            local,
            remotes: BTreeMap::new(),
        }
    }

    pub fn local(&self) -> &PlayerEntity {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut PlayerEntity {
        &mut self.local
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerEntity> {
        if id == self.local.id() {
            Some(&self.local)
        } else {
            self.remotes.get(&id)
        }
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerEntity> {
        if id == self.local.id() {
            Some(&mut self.local)
        } else {
            self.remotes.get_mut(&id)
        }
    }

    pub fn remote_mut(&mut self, id: PlayerId) -> Option<&mut PlayerEntity> {
        self.remotes.get_mut(&id)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &PlayerEntity> {
        self.remotes.values()
    }

    /// Remote players, local excluded.
    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    /// Registers a remote player. Returns false if the id is taken.
    pub fn add_remote(&mut self, ctx: &mut SyncContext<'_>, id: PlayerId, name: &str, colour: u32) -> bool {
        if id == self.local.id() || self.remotes.contains_key(&id) {
            return false;
        }
        let mut player = PlayerEntity::new_remote(id);
        player.set_name(ctx, name);
        player.set_colour(ctx, colour);
        self.remotes.insert(id, player);
        info!(player = ?id, name, "Player joined");
        true
    }

    pub fn remove_remote(&mut self, ctx: &mut SyncContext<'_>, id: PlayerId) -> bool {
        let Some(mut player) = self.remotes.remove(&id) else {
            return false;
        };
        player.destroy(ctx);
        info!(player = ?id, "Player quit");
        true
    }

    /// Pulses the local player first, then remotes in id order.
    pub fn pulse(&mut self, ctx: &mut SyncContext<'_>) {
        self.local.pulse(ctx);
        for player in self.remotes.values_mut() {
            player.pulse(ctx);
        }
    }

    pub fn local_sync(&self, ctx: &SyncContext<'_>) -> Option<SyncMsg> {
        self.local.build_sync(ctx)
    }

    /// Applies one message from the host.
    pub fn handle_message(&mut self, ctx: &mut SyncContext<'_>, msg: SyncMsg) {
        let local_id = self.local.id();
        match msg {
            SyncMsg::VehicleEntryReply {
                player,
                vehicle,
                seat,
                granted,
            } if player == local_id => self.local.on_entry_reply(ctx, vehicle, seat, granted),
            SyncMsg::VehicleExitReply {
                player,
                vehicle,
                granted,
            } if player == local_id => self.local.on_exit_reply(ctx, vehicle, granted),
            SyncMsg::PlayerJoin { player, name, colour } => {
                if !self.add_remote(ctx, player, &name, colour) {
                    debug!(player = ?player, "Duplicate PlayerJoin");
                }
            }
            SyncMsg::PlayerQuit { player } => {
                self.remove_remote(ctx, player);
            }
            SyncMsg::VehicleDeath { vehicle } => {
                debug!(vehicle = ?vehicle, "VehicleDeath relayed");
            }
            other => self.handle_remote_message(ctx, other),
        }
    }

    fn handle_remote_message(&mut self, ctx: &mut SyncContext<'_>, msg: SyncMsg) {
        let Some(id) = msg.player() else {
            return;
        };
        let Some(player) = self.remotes.get_mut(&id) else {
            if id != self.local.id() {
                warn!(player = ?id, "Message for unknown player");
            }
            return;
        };

        match msg {
            SyncMsg::VehicleEntryRequest { vehicle, seat, .. } => {
                player.enter_vehicle(ctx, vehicle, seat);
            }
            SyncMsg::VehicleEntryComplete { vehicle, seat, .. } => {
                let mid_entry = player.transition().entering;
                if !mid_entry && (player.vehicle_id() != Some(vehicle) || player.vehicle_seat() != seat) {
                    player.put_in_vehicle(ctx, vehicle, seat);
                }
            }
            SyncMsg::VehicleEntryCancelled { .. } => {
                if player.is_in_vehicle() && !player.internal_is_in_vehicle(ctx) {
                    player.remove_from_vehicle(ctx);
                }
                player.reset_vehicle_enter_exit(ctx);
            }
            SyncMsg::VehicleExitRequest { vehicle, .. } => {
                if player.vehicle_id() == Some(vehicle) {
                    player.exit_vehicle(ctx, ExitVehicleMode::Normal);
                }
            }
            SyncMsg::VehicleExitComplete { vehicle, .. } | SyncMsg::VehicleExitForceful { vehicle, .. } => {
                if player.vehicle_id() == Some(vehicle) && !player.transition().exiting {
                    player.remove_from_vehicle(ctx);
                }
            }
            SyncMsg::OnFootSync(sync) => player.apply_on_foot_sync(ctx, &sync),
            SyncMsg::InVehicleSync(sync) => player.apply_in_vehicle_sync(ctx, &sync),
            SyncMsg::AimSync { aim, .. } => player.set_aim_sync(ctx, aim),
            SyncMsg::PlayerStreamIn { position, health, .. } => {
                player.set_stream_cache(position, health);
                player.stream_in(ctx);
            }
            SyncMsg::PlayerStreamOut { .. } => player.stream_out(ctx),
            other => debug!(msg = ?other, "Ignored message"),
        }
    }
}
