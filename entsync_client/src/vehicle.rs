//! Vehicle entry and exit.
//!
//! Getting in or out of a vehicle is an animation the engine plays over many
//! pulses. This module drives it for every player:
//!
//! - local player on a network vehicle: ask the host first, animate after
//!   the grant, report completion or cancellation
//! - local player on a non-network vehicle: claim the seat and animate
//! - remote players: mirror what the host relays, retrying an interrupted
//!   entry until it succeeds or the host cancels it
//!
//! The engine may also eject a ped on its own (car flipped, ped knocked
//! out). That shows up as an association with no occupancy and is reported
//! as a forceful exit.

use entsync_shared::{
    config::ExitTaskParams,
    control::Buttons,
    math::Vec3,
    net::{Priority, Reliability, SeatId, SyncMsg, VehicleId},
};
use tracing::{debug, info, warn};

use crate::{
    backend::{NativeVehicleHandle, PedHandle, PedTask, TaskPriority},
    context::SyncContext,
    player::PlayerEntity,
};

/// In-flight entry/exit flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleTransition {
    pub entering: bool,
    pub exiting: bool,
    /// Waiting for the host to answer an entry or exit request.
    pub requesting: bool,
    pub pending_vehicle: Option<VehicleId>,
    pub pending_seat: SeatId,
}

impl VehicleTransition {
    pub fn is_active(&self) -> bool {
        self.entering || self.exiting || self.requesting
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Where a player is in the entry/exit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleSyncState {
    OnFoot,
    EnteringLocal,
    EnteringNetworkPending,
    InVehicle(SeatId),
    ExitingLocal,
    ExitingNetworkPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitVehicleMode {
    Normal,
    /// Thrown out by another ped.
    Jacked,
}

/// Exit animation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAnimation {
    ClimbOut,
    Jacked,
    DiveOutTruck,
    DiveOut,
}

impl ExitAnimation {
    /// A vehicle moving faster than the dive threshold on either horizontal
    /// axis makes the ped dive, if the model has a dive animation.
    pub fn choose(mode: ExitVehicleMode, model_id: u32, speed: Vec3, params: &ExitTaskParams) -> Self {
        if mode == ExitVehicleMode::Jacked {
            return ExitAnimation::Jacked;
        }

        let fast = speed.x.abs() > params.dive_speed || speed.y.abs() > params.dive_speed;
        if !fast {
            ExitAnimation::ClimbOut
        } else if params.truck_models.contains(&model_id) {
            ExitAnimation::DiveOutTruck
        } else if !params.no_dive_models.contains(&model_id) && model_id < params.dive_model_limit {
            ExitAnimation::DiveOut
        } else {
            ExitAnimation::ClimbOut
        }
    }

    /// Engine exit mode flags for this animation.
    pub fn task_mode(self, params: &ExitTaskParams) -> u32 {
        match self {
            ExitAnimation::ClimbOut => params.climb_out_mode,
            ExitAnimation::Jacked => params.jacked_mode,
            ExitAnimation::DiveOutTruck => params.dive_out_truck_mode,
            ExitAnimation::DiveOut => params.dive_out_mode,
        }
    }
}

impl PlayerEntity {
    // ─── Queries ───

    /// Holds a seat according to the sync layer.
    pub fn is_in_vehicle(&self) -> bool {
        self.vehicle.is_some()
    }

    pub fn vehicle_id(&self) -> Option<VehicleId> {
        self.vehicle
    }

    pub fn vehicle_seat(&self) -> SeatId {
        self.seat
    }

    pub fn is_a_passenger(&self) -> bool {
        self.vehicle.is_some() && self.seat > 0
    }

    pub fn transition(&self) -> &VehicleTransition {
        &self.transition
    }

    pub fn has_vehicle_enter_exit(&self) -> bool {
        self.transition.is_active()
    }

    pub fn vehicle_state(&self) -> VehicleSyncState {
        let t = &self.transition;
        if t.requesting {
            if self.vehicle.is_some() {
                VehicleSyncState::ExitingNetworkPending
            } else {
                VehicleSyncState::EnteringNetworkPending
            }
        } else if t.entering {
            VehicleSyncState::EnteringLocal
        } else if t.exiting {
            VehicleSyncState::ExitingLocal
        } else if self.vehicle.is_some() {
            VehicleSyncState::InVehicle(self.seat)
        } else {
            VehicleSyncState::OnFoot
        }
    }

    /// Whether the engine has the ped seated.
    pub fn internal_is_in_vehicle(&self, ctx: &SyncContext<'_>) -> bool {
        self.internal_vehicle_handle(ctx).is_some()
    }

    /// Vehicle the engine has the ped seated in, if the registry knows it.
    pub fn internal_vehicle(&self, ctx: &SyncContext<'_>) -> Option<VehicleId> {
        self.internal_vehicle_handle(ctx)
            .and_then(|handle| ctx.vehicles.resolve_handle(handle))
    }

    fn internal_vehicle_handle(&self, ctx: &SyncContext<'_>) -> Option<NativeVehicleHandle> {
        self.spawned_ped().and_then(|ped| ctx.backend.ped_vehicle(ped))
    }

    fn primary_task(&self, ctx: &SyncContext<'_>) -> Option<PedTask> {
        self.spawned_ped()
            .and_then(|ped| ctx.backend.task(ped, TaskPriority::Primary))
    }

    pub fn is_getting_in_to_a_vehicle(&self, ctx: &SyncContext<'_>) -> bool {
        self.primary_task(ctx).is_some_and(|t| t.is_get_in_vehicle())
    }

    pub fn is_getting_out_of_a_vehicle(&self, ctx: &SyncContext<'_>) -> bool {
        self.primary_task(ctx).is_some_and(|t| t.is_exit_vehicle())
    }

    pub fn is_jacking_a_vehicle(&self, ctx: &SyncContext<'_>) -> bool {
        self.primary_task(ctx) == Some(PedTask::DragOutPed)
    }

    pub fn is_getting_jacked(&self, ctx: &SyncContext<'_>) -> bool {
        self.primary_task(ctx) == Some(PedTask::BeDraggedOut)
    }

    pub fn clear_vehicle_entry_task(&mut self, ctx: &mut SyncContext<'_>) -> bool {
        self.clear_primary_task_if(ctx, PedTask::is_get_in_vehicle)
    }

    pub fn clear_vehicle_exit_task(&mut self, ctx: &mut SyncContext<'_>) -> bool {
        self.clear_primary_task_if(ctx, PedTask::is_exit_vehicle)
    }

    fn clear_primary_task_if(&mut self, ctx: &mut SyncContext<'_>, pred: fn(&PedTask) -> bool) -> bool {
        let Some(ped) = self.spawned_ped() else {
            return false;
        };
        match ctx.backend.task(ped, TaskPriority::Primary) {
            Some(task) if pred(&task) => {
                ctx.backend.remove_task(ped, TaskPriority::Primary);
                true
            }
            _ => false,
        }
    }

    /// Nearest streamed-in vehicle within reach and the seat to take in it.
    pub fn closest_vehicle(&self, ctx: &SyncContext<'_>, passenger: bool) -> Option<(VehicleId, SeatId)> {
        let position = self.position(ctx);
        let mut best = None;
        let mut best_distance = ctx.config.closest_vehicle_distance;

        for vehicle in ctx.vehicles.streamed_in() {
            let Some(handle) = vehicle.handle else {
                continue;
            };
            let distance = ctx.backend.vehicle_position(handle).distance(position);
            if distance < best_distance {
                best_distance = distance;
                best = Some(vehicle);
            }
        }

        let vehicle = best?;
        let seat = if passenger {
            vehicle.free_passenger_seat()?
        } else {
            0
        };
        Some((vehicle.id, seat))
    }

    // ─── Seat bookkeeping ───

    fn claim_seat(&mut self, ctx: &mut SyncContext<'_>, vehicle_id: VehicleId, seat: SeatId) {
        self.vehicle = Some(vehicle_id);
        self.seat = seat;
        if let Some(vehicle) = ctx.vehicles.get_mut(vehicle_id) {
            vehicle.set_occupant(seat, Some(self.id));
            if let Some(handle) = vehicle.handle {
                ctx.backend.set_vehicle_damageable(handle, true);
            }
        }
    }

    /// Drops the seat this player holds, if any.
    pub(crate) fn release_seat(&mut self, ctx: &mut SyncContext<'_>) -> Option<(VehicleId, SeatId)> {
        let vehicle_id = self.vehicle.take()?;
        let seat = std::mem::take(&mut self.seat);
        if let Some(vehicle) = ctx.vehicles.get_mut(vehicle_id) {
            vehicle.vacate(seat, self.id);
            if let Some(handle) = vehicle.handle {
                ctx.backend.set_vehicle_damageable(handle, false);
            }
        }
        Some((vehicle_id, seat))
    }

    fn is_network_vehicle(ctx: &SyncContext<'_>, vehicle_id: VehicleId) -> bool {
        ctx.vehicles.get(vehicle_id).is_some_and(|v| v.is_network)
    }

    /// Requests and cancellations come from the local player only.
    fn notify(&self, ctx: &mut SyncContext<'_>, msg: SyncMsg) {
        if self.is_local {
            Self::broadcast(ctx, msg);
        }
    }

    /// Occupancy outcomes are reported for every player.
    fn broadcast(ctx: &mut SyncContext<'_>, msg: SyncMsg) {
        ctx.rpc.send(msg, Priority::High, Reliability::Reliable);
    }

    fn issue_entry_task(&self, ctx: &mut SyncContext<'_>, ped: PedHandle, handle: NativeVehicleHandle, seat: SeatId) {
        let params = &ctx.config.enter_task;
        let task = PedTask::GetInVehicle {
            vehicle: handle,
            door: params.door_for_seat(seat),
            timer: params.timer,
            flags: params.flags_for_seat(seat),
            blend: params.blend,
        };
        ctx.backend.set_task(ped, TaskPriority::Primary, task);
    }

    // ─── Commands ───

    /// Starts walking into `seat` of a vehicle. Returns false when refused.
    pub fn enter_vehicle(&mut self, ctx: &mut SyncContext<'_>, vehicle_id: VehicleId, seat: SeatId) -> bool {
        let Some(ped) = self.spawned_ped() else {
            return false;
        };
        if self.is_in_vehicle() {
            debug!(player = ?self.id, "EnterVehicle ignored, already seated");
            return false;
        }
        if self.transition.is_active() {
            warn!(player = ?self.id, "EnterVehicle refused, entry/exit already in progress");
            return false;
        }

        let Some(vehicle) = ctx.vehicles.get(vehicle_id) else {
            warn!(player = ?self.id, vehicle = ?vehicle_id, "EnterVehicle on unknown vehicle");
            return false;
        };
        let Some(handle) = vehicle.handle else {
            debug!(player = ?self.id, vehicle = ?vehicle_id, "EnterVehicle on streamed-out vehicle");
            return false;
        };
        if vehicle.door_lock_state != 0 {
            info!(player = ?self.id, vehicle = ?vehicle_id, "EnterVehicle refused, doors locked");
            return false;
        }
        if seat > vehicle.max_passengers() {
            warn!(player = ?self.id, vehicle = ?vehicle_id, seat, "EnterVehicle on invalid seat");
            return false;
        }
        let is_network = vehicle.is_network;
        if !is_network && vehicle.occupant(seat).is_some_and(|p| p != self.id) {
            info!(player = ?self.id, vehicle = ?vehicle_id, seat, "EnterVehicle refused, seat taken");
            return false;
        }

        self.issue_entry_task(ctx, ped, handle, seat);
        self.transition.pending_vehicle = Some(vehicle_id);
        self.transition.pending_seat = seat;

        if is_network && self.is_local {
            self.transition.requesting = true;
            ctx.rpc.send(
                SyncMsg::VehicleEntryRequest {
                    player: self.id,
                    vehicle: vehicle_id,
                    seat,
                },
                Priority::High,
                Reliability::Reliable,
            );
            info!(player = ?self.id, vehicle = ?vehicle_id, seat, "VehicleEntryRequest");
        } else {
            self.transition.entering = true;
            if !is_network {
                self.claim_seat(ctx, vehicle_id, seat);
            }
            info!(player = ?self.id, vehicle = ?vehicle_id, seat, "VehicleEntry");
        }

        self.reset_interpolation();
        true
    }

    /// Leaves the current vehicle. While entering this aborts the entry.
    pub fn exit_vehicle(&mut self, ctx: &mut SyncContext<'_>, mode: ExitVehicleMode) -> bool {
        if self.spawned_ped().is_none() {
            return false;
        }

        if self.transition.entering {
            self.abort_entry(ctx);
            return true;
        }
        let Some(vehicle_id) = self.vehicle else {
            return false;
        };
        if self.transition.is_active() {
            warn!(player = ?self.id, "ExitVehicle refused, entry/exit already in progress");
            return false;
        }

        if self.is_local && mode == ExitVehicleMode::Normal && Self::is_network_vehicle(ctx, vehicle_id) {
            self.transition.requesting = true;
            ctx.rpc.send(
                SyncMsg::VehicleExitRequest {
                    player: self.id,
                    vehicle: vehicle_id,
                },
                Priority::High,
                Reliability::Reliable,
            );
            info!(player = ?self.id, vehicle = ?vehicle_id, "VehicleExitRequest");
            return true;
        }

        self.begin_exit(ctx, mode)
    }

    /// Plays the exit animation for the held seat.
    fn begin_exit(&mut self, ctx: &mut SyncContext<'_>, mode: ExitVehicleMode) -> bool {
        let (Some(ped), Some(vehicle_id)) = (self.spawned_ped(), self.vehicle) else {
            return false;
        };
        let Some(vehicle) = ctx.vehicles.get(vehicle_id) else {
            self.finish_exit(ctx);
            return true;
        };
        let model_id = vehicle.model_id;
        let Some(handle) = vehicle.handle else {
            self.finish_exit(ctx);
            return true;
        };

        let params = &ctx.config.exit_task;
        let animation = ExitAnimation::choose(mode, model_id, ctx.backend.vehicle_move_speed(handle), params);
        let task = PedTask::ExitVehicle {
            vehicle: handle,
            mode: animation.task_mode(params),
        };
        ctx.backend.set_task(ped, TaskPriority::Primary, task);
        self.transition.exiting = true;
        info!(player = ?self.id, vehicle = ?vehicle_id, ?animation, "VehicleExit");

        if self.is_local
            && (ctx.backend.vehicle_health(handle) < 0 || ctx.backend.vehicle_petrol_tank_health(handle) < 0.0)
        {
            debug!(player = ?self.id, vehicle = ?vehicle_id, "Leaving wrecked vehicle, watching for death");
            self.vehicle_death_check = Some(vehicle_id);
            self.process_vehicle_death_check(ctx);
        }

        self.reset_interpolation();
        true
    }

    fn abort_entry(&mut self, ctx: &mut SyncContext<'_>) {
        let vehicle_id = self.transition.pending_vehicle.or(self.vehicle);
        let seat = self.transition.pending_seat;
        self.clear_vehicle_entry_task(ctx);
        self.release_seat(ctx);
        self.transition.reset();

        if let Some(vehicle_id) = vehicle_id {
            if Self::is_network_vehicle(ctx, vehicle_id) {
                self.notify(
                    ctx,
                    SyncMsg::VehicleEntryCancelled {
                        player: self.id,
                        vehicle: vehicle_id,
                        seat,
                    },
                );
            }
        }
        info!(player = ?self.id, vehicle = ?vehicle_id, "VehicleEntry aborted");
    }

    /// Seats the ped instantly.
    pub fn put_in_vehicle(&mut self, ctx: &mut SyncContext<'_>, vehicle_id: VehicleId, seat: SeatId) {
        let Some(ped) = self.spawned_ped() else {
            return;
        };
        let Some(vehicle) = ctx.vehicles.get(vehicle_id) else {
            warn!(player = ?self.id, vehicle = ?vehicle_id, "PutInVehicle on unknown vehicle");
            return;
        };
        let Some(handle) = vehicle.handle else {
            debug!(player = ?self.id, vehicle = ?vehicle_id, "PutInVehicle on streamed-out vehicle");
            return;
        };
        let is_network = vehicle.is_network;

        if self.is_in_vehicle() {
            self.remove_from_vehicle(ctx);
        }
        self.reset_vehicle_enter_exit(ctx);

        if ctx.backend.ped_vehicle(ped).is_none() {
            let door = ctx.config.enter_task.warp_door_for_seat(seat);
            ctx.backend.put_ped_in_vehicle(ped, handle, door);
        }
        self.claim_seat(ctx, vehicle_id, seat);
        self.reset_interpolation();

        if is_network {
            Self::broadcast(
                ctx,
                SyncMsg::VehicleEntryComplete {
                    player: self.id,
                    vehicle: vehicle_id,
                    seat,
                },
            );
        }
        info!(player = ?self.id, vehicle = ?vehicle_id, seat, "PutInVehicle");
    }

    /// Pulls the ped out instantly.
    pub fn remove_from_vehicle(&mut self, ctx: &mut SyncContext<'_>) {
        let Some(ped) = self.spawned_ped() else {
            return;
        };
        let Some(vehicle_id) = self.vehicle else {
            return;
        };

        let handle = ctx.vehicles.get(vehicle_id).and_then(|v| v.handle);
        if let Some(handle) = handle {
            if ctx.backend.ped_vehicle(ped).is_some() {
                ctx.backend.remove_ped_from_vehicle(ped, handle);
            }
        }
        self.release_seat(ctx);
        self.reset_vehicle_enter_exit(ctx);
        info!(player = ?self.id, vehicle = ?vehicle_id, "RemoveFromVehicle");
    }

    /// Forgets any in-flight entry or exit and clears its animation.
    pub fn reset_vehicle_enter_exit(&mut self, ctx: &mut SyncContext<'_>) {
        self.transition.reset();
        self.clear_vehicle_entry_task(ctx);
        self.clear_vehicle_exit_task(ctx);
    }

    // ─── Host replies ───

    pub fn on_entry_reply(&mut self, ctx: &mut SyncContext<'_>, vehicle_id: VehicleId, seat: SeatId, granted: bool) {
        if !self.transition.requesting
            || self.is_in_vehicle()
            || self.transition.pending_vehicle != Some(vehicle_id)
        {
            debug!(player = ?self.id, vehicle = ?vehicle_id, "Stale VehicleEntryReply");
            return;
        }
        self.transition.requesting = false;

        if granted {
            self.transition.entering = true;
            self.transition.pending_seat = seat;
            info!(player = ?self.id, vehicle = ?vehicle_id, seat, "VehicleEntry granted");
            self.process_vehicle_entry_exit(ctx);
        } else {
            info!(player = ?self.id, vehicle = ?vehicle_id, "VehicleEntry denied");
            if let (Some(ped), Some(handle)) = (self.spawned_ped(), self.internal_vehicle_handle(ctx)) {
                ctx.backend.remove_ped_from_vehicle(ped, handle);
            }
            self.reset_vehicle_enter_exit(ctx);
        }
    }

    pub fn on_exit_reply(&mut self, ctx: &mut SyncContext<'_>, vehicle_id: VehicleId, granted: bool) {
        if !self.transition.requesting || self.vehicle != Some(vehicle_id) {
            debug!(player = ?self.id, vehicle = ?vehicle_id, "Stale VehicleExitReply");
            return;
        }
        self.transition.requesting = false;

        if granted {
            self.begin_exit(ctx, ExitVehicleMode::Normal);
        } else {
            info!(player = ?self.id, vehicle = ?vehicle_id, "VehicleExit denied");
        }
    }

    // ─── Per-pulse ───

    /// Reconciles the transition flags with what the engine is doing.
    pub fn process_vehicle_entry_exit(&mut self, ctx: &mut SyncContext<'_>) {
        if self.spawned_ped().is_none() {
            return;
        }

        let occupied = self.internal_is_in_vehicle(ctx);
        let getting_in = self.is_getting_in_to_a_vehicle(ctx);

        if occupied {
            if self.transition.entering && !getting_in {
                self.complete_entry(ctx);
            }
            return;
        }

        let entry_pending =
            self.transition.entering || (self.transition.requesting && self.vehicle.is_none());
        if entry_pending {
            if !getting_in {
                self.entry_interrupted(ctx);
            }
        } else if getting_in {
            self.clear_vehicle_entry_task(ctx);
            info!(player = ?self.id, "Stray VehicleEntry task removed");
        }

        if self.transition.exiting {
            if !self.is_getting_out_of_a_vehicle(ctx) {
                self.finish_exit(ctx);
            }
            return;
        }

        if self.is_getting_out_of_a_vehicle(ctx) {
            self.clear_vehicle_exit_task(ctx);
            info!(player = ?self.id, "Stray VehicleExit task removed");
        }

        if self.vehicle.is_some() && !self.transition.entering {
            self.forceful_exit(ctx);
        }
    }

    fn complete_entry(&mut self, ctx: &mut SyncContext<'_>) {
        let vehicle_id = self
            .transition
            .pending_vehicle
            .or(self.vehicle)
            .or_else(|| self.internal_vehicle(ctx));
        let seat = self.transition.pending_seat;
        self.transition.reset();

        let Some(vehicle_id) = vehicle_id else {
            warn!(player = ?self.id, "Seated in a vehicle the registry does not know");
            return;
        };

        self.claim_seat(ctx, vehicle_id, seat);
        if Self::is_network_vehicle(ctx, vehicle_id) {
            Self::broadcast(
                ctx,
                SyncMsg::VehicleEntryComplete {
                    player: self.id,
                    vehicle: vehicle_id,
                    seat,
                },
            );
        }
        info!(player = ?self.id, vehicle = ?vehicle_id, seat, "VehicleEntryComplete");
    }

    /// The get-in animation ended without the ped ending up seated.
    fn entry_interrupted(&mut self, ctx: &mut SyncContext<'_>) {
        let vehicle_id = self.transition.pending_vehicle.or(self.vehicle);
        let seat = self.transition.pending_seat;

        if !self.is_local {
            let retry = vehicle_id
                .and_then(|id| ctx.vehicles.get(id))
                .and_then(|v| v.handle)
                .zip(self.spawned_ped());
            if let Some((handle, ped)) = retry {
                self.issue_entry_task(ctx, ped, handle, seat);
                info!(player = ?self.id, vehicle = ?vehicle_id, seat, "VehicleEntry restarted");
                return;
            }
        }

        if let Some(vehicle_id) = vehicle_id {
            if let Some(handle) = ctx.vehicles.get(vehicle_id).and_then(|v| v.handle) {
                ctx.backend.set_vehicle_damageable(handle, false);
            }
            if Self::is_network_vehicle(ctx, vehicle_id) {
                self.notify(
                    ctx,
                    SyncMsg::VehicleEntryCancelled {
                        player: self.id,
                        vehicle: vehicle_id,
                        seat,
                    },
                );
            }
        }
        self.release_seat(ctx);
        self.transition.reset();
        info!(player = ?self.id, vehicle = ?vehicle_id, seat, "VehicleEntryCancelled");
    }

    fn finish_exit(&mut self, ctx: &mut SyncContext<'_>) {
        self.transition.reset();
        if let Some((vehicle_id, seat)) = self.release_seat(ctx) {
            if Self::is_network_vehicle(ctx, vehicle_id) {
                Self::broadcast(
                    ctx,
                    SyncMsg::VehicleExitComplete {
                        player: self.id,
                        vehicle: vehicle_id,
                    },
                );
            }
            info!(player = ?self.id, vehicle = ?vehicle_id, seat, "VehicleExitComplete");
        }
    }

    /// The engine took the ped out without an exit animation.
    fn forceful_exit(&mut self, ctx: &mut SyncContext<'_>) {
        self.transition.reset();
        if let Some((vehicle_id, seat)) = self.release_seat(ctx) {
            if Self::is_network_vehicle(ctx, vehicle_id) {
                Self::broadcast(
                    ctx,
                    SyncMsg::VehicleExitForceful {
                        player: self.id,
                        vehicle: vehicle_id,
                    },
                );
            }
            info!(player = ?self.id, vehicle = ?vehicle_id, seat, "VehicleForcefulExit");
        }
    }

    /// Turns enter/exit key edges into commands. Local player only.
    pub fn check_vehicle_entry_exit_key(&mut self, ctx: &mut SyncContext<'_>) {
        if !self.is_local || self.spawned_ped().is_none() {
            return;
        }
        if !ctx.backend.input_enabled() || ctx.controls_disabled {
            return;
        }

        if self.controls.just_pressed(Buttons::ENTER_EXIT_VEHICLE) {
            if self.is_in_vehicle() && !self.transition.is_active() {
                info!(player = ?self.id, "HandleVehicleExitKey");
                self.exit_vehicle(ctx, ExitVehicleMode::Normal);
            }
            return;
        }

        let enter_released = self.controls.just_released(Buttons::ENTER_EXIT_VEHICLE);
        let horn_released = self.controls.just_released(Buttons::HORN);
        if !enter_released && !horn_released {
            return;
        }
        if self.transition.requesting {
            debug!(player = ?self.id, "Already requesting a vehicle entry/exit");
            return;
        }
        if self.is_in_vehicle() || self.transition.entering {
            return;
        }

        if let Some((vehicle_id, seat)) = self.closest_vehicle(ctx, horn_released) {
            info!(player = ?self.id, vehicle = ?vehicle_id, seat, "HandleVehicleEntryKey");
            self.enter_vehicle(ctx, vehicle_id, seat);
        }
    }

    /// Reports the vehicle we bailed out of once the engine marks it dead.
    pub fn process_vehicle_death_check(&mut self, ctx: &mut SyncContext<'_>) {
        let Some(vehicle_id) = self.vehicle_death_check else {
            return;
        };
        let Some(vehicle) = ctx.vehicles.get(vehicle_id) else {
            self.vehicle_death_check = None;
            return;
        };
        if vehicle.driver().is_some_and(|driver| driver != self.id) {
            debug!(player = ?self.id, vehicle = ?vehicle_id, "Vehicle taken over, death check dropped");
            self.vehicle_death_check = None;
            return;
        }
        let Some(handle) = vehicle.handle else {
            self.vehicle_death_check = None;
            return;
        };

        if ctx.backend.is_vehicle_dead(handle) {
            ctx.rpc.send(
                SyncMsg::VehicleDeath { vehicle: vehicle_id },
                Priority::High,
                Reliability::UnreliableSequenced,
            );
            info!(player = ?self.id, vehicle = ?vehicle_id, "VehicleDeath");
            self.vehicle_death_check = None;
        }
    }

    pub fn is_watching_vehicle_death(&self) -> bool {
        self.vehicle_death_check.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entsync_shared::config::SyncConfig;

    #[test]
    fn exit_animation_by_speed_and_model() {
        let params = SyncConfig::default().exit_task;
        let slow = Vec3::new(1.0, -2.0, 0.0);
        let fast = Vec3::new(0.0, -12.0, 0.0);

        assert_eq!(ExitAnimation::choose(ExitVehicleMode::Normal, 20, slow, &params), ExitAnimation::ClimbOut);
        assert_eq!(ExitAnimation::choose(ExitVehicleMode::Normal, 20, fast, &params), ExitAnimation::DiveOut);
        assert_eq!(ExitAnimation::choose(ExitVehicleMode::Normal, 4, fast, &params), ExitAnimation::DiveOutTruck);
        assert_eq!(ExitAnimation::choose(ExitVehicleMode::Normal, 12, fast, &params), ExitAnimation::ClimbOut);
        assert_eq!(ExitAnimation::choose(ExitVehicleMode::Normal, 200, fast, &params), ExitAnimation::ClimbOut);
        assert_eq!(ExitAnimation::choose(ExitVehicleMode::Jacked, 20, slow, &params), ExitAnimation::Jacked);
    }

    #[test]
    fn task_modes_come_from_config() {
        let params = SyncConfig::default().exit_task;
        assert_eq!(ExitAnimation::ClimbOut.task_mode(&params), 0xF);
        assert_eq!(ExitAnimation::Jacked.task_mode(&params), 0x9C4);
        assert_eq!(ExitAnimation::DiveOutTruck.task_mode(&params), 0x40B);
        assert_eq!(ExitAnimation::DiveOut.task_mode(&params), 0x100E);
    }

    #[test]
    fn transition_activity() {
        let mut t = VehicleTransition::default();
        assert!(!t.is_active());
        t.requesting = true;
        t.pending_vehicle = Some(VehicleId(3));
        assert!(t.is_active());
        t.reset();
        assert_eq!(t, VehicleTransition::default());
    }
}
