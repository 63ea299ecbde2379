//! Player entities.
//!
//! A `PlayerEntity` is the client's view of one network player. The local
//! player wraps the ped the game already created; remote players allocate a
//! ped of their own when streamed in and tear it down when streamed out.
//!
//! Every operation is safe on a despawned entity: reads return defaults and
//! writes are dropped (a few are remembered and applied on the next spawn).

use std::fmt;

use entsync_shared::{
    control::ControlState,
    math::Vec3,
    net::{AimSyncData, InVehicleSync, OnFootSync, PlayerId, SeatId, SyncMsg, VehicleId},
};
use tracing::{debug, info, warn};

use crate::{
    attributes::{should_snap_display, LockableAttribute},
    backend::{ModelIndex, PedBackend, PedHandle, PedTask, PlayerSlot, TaskPriority, DEFAULT_PLAYER_MODEL},
    context::SyncContext,
    input::ControlStateTracker,
    interp::{InterpStep, PositionInterpolation},
    vehicle::VehicleTransition,
};

/// Number of clothing components on a player ped.
pub const CLOTHES_PARTS: usize = 11;

/// Weapon inventory slots preserved across a model change.
const WEAPON_SLOTS: std::ops::Range<u32> = 1..12;

/// Speed below which a synced heading is applied directly.
const SYNC_HEADING_SPEED: f32 = 2.5;

/// Why a remote ped could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateError {
    LocalPlayer,
    AlreadySpawned,
    NoFreeSlot,
    AllocationFailed,
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateError::LocalPlayer => write!(f, "the local player is never created"),
            CreateError::AlreadySpawned => write!(f, "player is already spawned"),
            CreateError::NoFreeSlot => write!(f, "no free player slot"),
            CreateError::AllocationFailed => write!(f, "ped allocation failed"),
        }
    }
}

impl std::error::Error for CreateError {}

/// One networked player.
#[derive(Debug)]
pub struct PlayerEntity {
    pub(crate) id: PlayerId,
    pub(crate) is_local: bool,
    pub(crate) spawned: bool,
    pub(crate) slot: Option<PlayerSlot>,
    pub(crate) ped: Option<PedHandle>,
    model: ModelIndex,
    name: String,
    colour: u32,

    pub(crate) health: LockableAttribute,
    pub(crate) armour: LockableAttribute,
    pub(crate) controls: ControlStateTracker,
    pub(crate) interp: PositionInterpolation,

    /// Vehicle this player holds a seat in.
    pub(crate) vehicle: Option<VehicleId>,
    pub(crate) seat: SeatId,
    pub(crate) transition: VehicleTransition,
    /// Vehicle left in a near-destroyed state, polled until confirmed dead.
    pub(crate) vehicle_death_check: Option<VehicleId>,

    clothes: [u8; CLOTHES_PARTS],
    use_custom_clothes_on_spawn: bool,
    aim: AimSyncData,

    /// Kept across stream-out so stream-in can restore them.
    cached_position: Vec3,
    cached_health: u32,
}

impl PlayerEntity {
    fn blank(id: PlayerId, is_local: bool) -> Self {
        Self {
            id,
            is_local,
            spawned: false,
            slot: None,
            ped: None,
            model: DEFAULT_PLAYER_MODEL,
            name: String::new(),
            colour: 0xFFFF_FFFF,
            health: LockableAttribute::new(),
            armour: LockableAttribute::new(),
            controls: ControlStateTracker::new(),
            interp: PositionInterpolation::new(),
            vehicle: None,
            seat: 0,
            transition: VehicleTransition::default(),
            vehicle_death_check: None,
            clothes: [0; CLOTHES_PARTS],
            use_custom_clothes_on_spawn: false,
            aim: AimSyncData::default(),
            cached_position: Vec3::ZERO,
            cached_health: 0,
        }
    }

    /// Wraps the ped the game created for the local player.
    pub fn new_local(id: PlayerId, backend: &dyn PedBackend) -> Self {
        let mut player = Self::blank(id, true);
        player.ped = backend.local_player_ped();
        player.slot = Some(0);
        player.spawned = player.ped.is_some();
        if !player.spawned {
            warn!(player = ?id, "Local player ped missing");
        }
        player
    }

    /// A remote player; it has no ped until streamed in.
    pub fn new_remote(id: PlayerId) -> Self {
        Self::blank(id, false)
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    pub fn ped(&self) -> Option<PedHandle> {
        self.ped
    }

    pub fn slot(&self) -> Option<PlayerSlot> {
        self.slot
    }

    pub fn model(&self) -> ModelIndex {
        self.model
    }

    /// The ped, but only while spawned.
    pub(crate) fn spawned_ped(&self) -> Option<PedHandle> {
        self.ped.filter(|_| self.spawned)
    }

    // ─── Lifecycle ───

    /// Allocates the backing ped for a remote player.
    pub fn create(&mut self, ctx: &mut SyncContext<'_>) -> Result<(), CreateError> {
        if self.is_local {
            return Err(CreateError::LocalPlayer);
        }
        if self.spawned {
            return Err(CreateError::AlreadySpawned);
        }

        let Some(slot) = ctx.backend.find_free_player_slot() else {
            warn!(player = ?self.id, "No free player slot");
            return Err(CreateError::NoFreeSlot);
        };
        self.slot = Some(slot);

        let Some(ped) = ctx.backend.create_ped(slot, self.model) else {
            warn!(player = ?self.id, slot, "Ped allocation failed");
            self.destroy(ctx);
            return Err(CreateError::AllocationFailed);
        };

        ctx.backend.set_collision_flag(ped, true);
        ctx.backend.bind_player_slot(slot, Some(ped));
        self.ped = Some(ped);
        ctx.backend.add_to_world(ped);
        self.spawned = true;

        if !self.name.is_empty() {
            ctx.backend.set_player_name(slot, &self.name);
        }
        ctx.backend.set_player_colour(slot, self.colour);

        let (spawn_health, interior) = (ctx.config.spawn_health, ctx.local_interior);
        self.set_health(ctx, spawn_health);
        self.set_interior(ctx, interior);
        self.use_custom_clothes_on_spawn = true;
        self.reset_interpolation();

        info!(player = ?self.id, slot, ped = ?ped, "Player created");
        Ok(())
    }

    /// Tears down the backing ped. Safe to call repeatedly and on partially
    /// created players.
    pub fn destroy(&mut self, ctx: &mut SyncContext<'_>) {
        if self.is_local {
            debug!(player = ?self.id, "Refusing to destroy the local player");
            return;
        }

        self.reset_vehicle_enter_exit(ctx);
        self.release_seat(ctx);
        self.vehicle_death_check = None;
        self.interp.disarm();

        if let Some(ped) = self.ped.take() {
            if self.spawned {
                ctx.backend.shutdown_intelligence(ped);
                ctx.backend.set_collision_flag(ped, false);
                ctx.backend.remove_from_world(ped);
                ctx.backend.destroy_ped(ped);
            }
        }

        if let Some(slot) = self.slot.take() {
            ctx.backend.bind_player_slot(slot, None);
        }

        if self.spawned {
            info!(player = ?self.id, "Player destroyed");
        }
        self.spawned = false;
    }

    /// Remembers where to put the ped on the next stream-in.
    pub fn set_stream_cache(&mut self, position: Vec3, health: u32) {
        self.cached_position = position;
        self.cached_health = health;
    }

    pub fn stream_in(&mut self, ctx: &mut SyncContext<'_>) -> bool {
        debug!(player = ?self.id, "StreamIn");
        match self.create(ctx) {
            Ok(()) => {
                self.set_position(ctx, self.cached_position, true);
                self.set_health(ctx, self.cached_health);
                true
            }
            Err(e) => {
                debug!(player = ?self.id, error = %e, "StreamIn skipped");
                false
            }
        }
    }

    pub fn stream_out(&mut self, ctx: &mut SyncContext<'_>) {
        debug!(player = ?self.id, "StreamOut");
        if !self.spawned || self.is_local {
            return;
        }
        self.cached_position = self.position(ctx);
        self.cached_health = self.health(ctx);
        self.destroy(ctx);
    }

    // ─── Identity ───

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, ctx: &mut SyncContext<'_>, name: &str) {
        self.name = name.to_string();
        if let Some(slot) = self.slot.filter(|_| self.spawned) {
            ctx.backend.set_player_name(slot, name);
        }
    }

    pub fn colour(&self) -> u32 {
        self.colour
    }

    pub fn set_colour(&mut self, ctx: &mut SyncContext<'_>, colour: u32) {
        if let Some(slot) = self.slot.filter(|_| self.spawned) {
            ctx.backend.set_player_colour(slot, colour);
        }
        self.colour = colour;
    }

    // ─── Spatial ───

    /// World position; while seated this is the vehicle's position.
    pub fn position(&self, ctx: &SyncContext<'_>) -> Vec3 {
        let Some(ped) = self.spawned_ped() else {
            return Vec3::ZERO;
        };
        let vehicle_handle = self
            .vehicle
            .and_then(|id| ctx.vehicles.get(id))
            .and_then(|v| v.handle);
        match vehicle_handle {
            Some(handle) => ctx.backend.vehicle_position(handle),
            None => ctx.backend.position(ped),
        }
    }

    /// Places an on-foot ped. Ignored while seated or mid entry/exit.
    pub fn set_position(&mut self, ctx: &mut SyncContext<'_>, position: Vec3, reset_interpolation: bool) {
        if let Some(ped) = self.spawned_ped() {
            if ctx.backend.ped_vehicle(ped).is_none() && !self.has_vehicle_enter_exit() {
                ctx.backend.remove_from_world(ped);
                ctx.backend.set_position(ped, position);
                if !self.is_local && ctx.backend.interior(ped) != ctx.local_interior {
                    ctx.backend.set_interior(ped, ctx.local_interior);
                }
                ctx.backend.add_to_world(ped);
            }
        }

        if reset_interpolation {
            self.remove_target_position();
        }
    }

    /// Moves the ped, pulling it out of any vehicle first.
    pub fn teleport(&mut self, ctx: &mut SyncContext<'_>, position: Vec3, reset_interpolation: bool) {
        if let Some(ped) = self.spawned_ped() {
            if self.is_in_vehicle() {
                ctx.backend.warp_from_vehicle(ped, position);
            } else {
                ctx.backend.set_coordinates_no_offset(ped, position);
            }
        }

        if reset_interpolation {
            self.remove_target_position();
        }
    }

    pub fn current_heading(&self, ctx: &SyncContext<'_>) -> f32 {
        self.spawned_ped()
            .map_or(0.0, |ped| ctx.backend.current_heading(ped))
    }

    pub fn set_current_heading(&mut self, ctx: &mut SyncContext<'_>, heading: f32) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.set_current_heading(ped, heading);
            ctx.backend.set_desired_heading(ped, heading);
        }
    }

    pub fn desired_heading(&self, ctx: &SyncContext<'_>) -> f32 {
        self.spawned_ped()
            .map_or(0.0, |ped| ctx.backend.desired_heading(ped))
    }

    pub fn set_desired_heading(&mut self, ctx: &mut SyncContext<'_>, heading: f32) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.set_desired_heading(ped, heading);
        }
    }

    /// Applies a heading received from the network.
    ///
    /// A ped sprinting at speed only turns a tenth of the way per update, so
    /// its run animation does not pop.
    pub fn set_current_sync_heading(&mut self, ctx: &mut SyncContext<'_>, heading: f32) {
        let Some(ped) = self.spawned_ped() else {
            return;
        };
        let current = ctx.backend.current_heading(ped);
        if current == heading {
            return;
        }

        let speed = ctx.backend.move_speed(ped).length();
        ctx.backend.set_desired_heading(ped, heading);
        if speed < SYNC_HEADING_SPEED || !self.controls.current().is_sprinting() {
            ctx.backend.set_current_heading(ped, heading);
        } else {
            ctx.backend
                .set_current_heading(ped, current + (heading - current) / 10.0);
        }
    }

    pub fn move_speed(&self, ctx: &SyncContext<'_>) -> Vec3 {
        self.spawned_ped()
            .map_or(Vec3::ZERO, |ped| ctx.backend.move_speed(ped))
    }

    pub fn set_move_speed(&mut self, ctx: &mut SyncContext<'_>, speed: Vec3) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.set_move_speed(ped, speed);
        }
    }

    pub fn is_moving(&self, ctx: &SyncContext<'_>) -> bool {
        let speed = self.move_speed(ctx);
        !(speed.x == 0.0 && speed.y == 0.0 && (-0.00002..=0.00002).contains(&speed.z))
    }

    pub fn stop_moving(&mut self, ctx: &mut SyncContext<'_>) {
        self.set_move_speed(ctx, Vec3::ZERO);
    }

    pub fn interior(&self, ctx: &SyncContext<'_>) -> u32 {
        self.spawned_ped().map_or(0, |ped| ctx.backend.interior(ped))
    }

    pub fn set_interior(&mut self, ctx: &mut SyncContext<'_>, interior: u32) {
        if let Some(ped) = self.spawned_ped() {
            if ctx.backend.interior(ped) != interior {
                ctx.backend.set_interior(ped, interior);
            }
        }
    }

    // ─── Health / armour ───

    /// Writes health to the engine, then drops any lock.
    pub fn set_health(&mut self, ctx: &mut SyncContext<'_>, health: u32) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.set_health(ped, health);
        }
        self.health.unlock();
    }

    pub fn lock_health(&mut self, ctx: &mut SyncContext<'_>, health: u32) {
        self.set_health(ctx, health);
        self.health.lock(health);
    }

    pub fn health(&self, ctx: &SyncContext<'_>) -> u32 {
        let native = self.spawned_ped().map_or(0, |ped| ctx.backend.health(ped));
        self.health.resolve(native)
    }

    pub fn is_health_locked(&self) -> bool {
        self.health.is_locked()
    }

    /// Writes armour to the engine, then drops any lock.
    pub fn set_armour(&mut self, ctx: &mut SyncContext<'_>, armour: u32) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.set_armour(ped, armour);
        }
        self.armour.unlock();
    }

    pub fn lock_armour(&mut self, ctx: &mut SyncContext<'_>, armour: u32) {
        self.set_armour(ctx, armour);
        self.armour.lock(armour);
    }

    pub fn armour(&self, ctx: &SyncContext<'_>) -> u32 {
        let native = self.spawned_ped().map_or(0, |ped| ctx.backend.armour(ped));
        self.armour.resolve(native)
    }

    pub fn is_armour_locked(&self) -> bool {
        self.armour.is_locked()
    }

    /// Pushes locked values back into the engine where it drifted.
    fn apply_attribute_locks(&mut self, ctx: &mut SyncContext<'_>, ped: PedHandle) {
        if let Some(health) = self.health.drift_correction(ctx.backend.health(ped)) {
            debug!(player = ?self.id, health, "Health lock reapplied");
            ctx.backend.set_health(ped, health);
        }
        if let Some(armour) = self.armour.drift_correction(ctx.backend.armour(ped)) {
            debug!(player = ?self.id, armour, "Armour lock reapplied");
            ctx.backend.set_armour(ped, armour);
        }
    }

    // ─── Money ───

    pub fn give_money(&mut self, ctx: &mut SyncContext<'_>, amount: i64) {
        let Some(slot) = self.slot.filter(|_| self.spawned) else {
            return;
        };
        let score = ctx.backend.score(slot).saturating_add(amount);
        ctx.backend.set_score(slot, score);
        if should_snap_display(amount, ctx.config.money_snap_threshold) {
            ctx.backend.set_display_score(slot, score);
        }
    }

    pub fn set_money(&mut self, ctx: &mut SyncContext<'_>, amount: i64) {
        let Some(slot) = self.slot.filter(|_| self.spawned) else {
            return;
        };
        ctx.backend.set_score(slot, amount);
        let diff = amount.saturating_sub(ctx.backend.display_score(slot));
        if should_snap_display(diff, ctx.config.money_snap_threshold) {
            ctx.backend.set_display_score(slot, amount);
        }
    }

    pub fn reset_money(&mut self, ctx: &mut SyncContext<'_>) {
        if let Some(slot) = self.slot.filter(|_| self.spawned) {
            ctx.backend.set_score(slot, 0);
            ctx.backend.set_display_score(slot, 0);
        }
    }

    pub fn money(&self, ctx: &SyncContext<'_>) -> i64 {
        self.slot
            .filter(|_| self.spawned)
            .map_or(0, |slot| ctx.backend.score(slot))
    }

    // ─── Weapons ───

    pub fn give_weapon(&mut self, ctx: &mut SyncContext<'_>, weapon: u32, ammo: u32) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.give_weapon(ped, weapon, ammo);
        }
    }

    pub fn remove_weapon(&mut self, ctx: &mut SyncContext<'_>, weapon: u32) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.remove_weapon(ped, weapon);
        }
    }

    pub fn remove_all_weapons(&mut self, ctx: &mut SyncContext<'_>) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.remove_all_weapons(ped);
        }
    }

    pub fn current_weapon(&self, ctx: &SyncContext<'_>) -> u32 {
        self.spawned_ped()
            .map_or(0, |ped| ctx.backend.current_weapon(ped))
    }

    pub fn set_current_weapon(&mut self, ctx: &mut SyncContext<'_>, weapon: u32) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.set_current_weapon(ped, weapon);
        }
    }

    pub fn ammo(&self, ctx: &SyncContext<'_>, weapon: u32) -> u32 {
        self.spawned_ped()
            .map_or(0, |ped| ctx.backend.ammo(ped, weapon))
    }

    /// Sets total ammo. When only a clip's worth is left of the held weapon,
    /// lowering it goes through the clip instead.
    pub fn set_ammo(&mut self, ctx: &mut SyncContext<'_>, weapon: u32, ammo: u32) {
        let Some(ped) = self.spawned_ped() else {
            return;
        };
        let total = ctx.backend.ammo(ped, weapon);
        if weapon == ctx.backend.current_weapon(ped)
            && total == ctx.backend.ammo_in_clip(ped, weapon)
            && ammo < total
        {
            self.set_ammo_in_clip(ctx, ammo);
        } else {
            ctx.backend.set_ammo(ped, weapon, ammo);
        }
    }

    pub fn ammo_in_clip(&self, ctx: &SyncContext<'_>, weapon: u32) -> u32 {
        self.spawned_ped()
            .map_or(0, |ped| ctx.backend.ammo_in_clip(ped, weapon))
    }

    /// Sets the held weapon's clip, clamped to the clip size.
    pub fn set_ammo_in_clip(&mut self, ctx: &mut SyncContext<'_>, ammo: u32) {
        let Some(ped) = self.spawned_ped() else {
            return;
        };
        let weapon = ctx.backend.current_weapon(ped);
        let ammo = ammo.min(ctx.backend.max_ammo_in_clip(ped, weapon));
        ctx.backend.set_ammo_in_clip(ped, weapon, ammo);
    }

    pub fn max_ammo_in_clip(&self, ctx: &SyncContext<'_>, weapon: u32) -> u32 {
        self.spawned_ped()
            .map_or(0, |ped| ctx.backend.max_ammo_in_clip(ped, weapon))
    }

    // ─── Model / clothes ───

    /// Switches the ped model, carrying health, armour, heading, interior and
    /// weapons over to the new ped.
    pub fn set_model(&mut self, ctx: &mut SyncContext<'_>, model_hash: u32) {
        let Some(model) = ctx.backend.model_index(model_hash) else {
            debug!(player = ?self.id, model_hash, "Unknown model hash");
            return;
        };
        if model == self.model {
            return;
        }
        if !ctx.backend.is_ped_model(model) {
            warn!(player = ?self.id, model_hash, "SetModel failed (invalid model)");
            return;
        }
        self.model = model;

        let (Some(ped), Some(slot)) = (self.spawned_ped(), self.slot) else {
            return;
        };

        let health = ctx.backend.health(ped);
        let armour = ctx.backend.armour(ped);
        let heading = ctx.backend.current_heading(ped);
        let interior = ctx.backend.interior(ped);
        let current_weapon = ctx.backend.current_weapon(ped);
        let clip = ctx.backend.ammo_in_clip(ped, current_weapon);
        let weapons: Vec<(u32, u32)> = WEAPON_SLOTS
            .filter_map(|s| ctx.backend.weapon_in_slot(ped, s))
            .collect();

        let Some(new_ped) = ctx.backend.change_player_model(slot, model) else {
            warn!(player = ?self.id, model, "Model change returned no ped");
            return;
        };
        self.ped = Some(new_ped);

        ctx.backend.set_health(new_ped, health);
        ctx.backend.set_armour(new_ped, armour);
        ctx.backend.set_current_heading(new_ped, heading);
        ctx.backend.set_desired_heading(new_ped, heading);
        ctx.backend.set_interior(new_ped, interior);
        for (weapon, ammo) in weapons {
            ctx.backend.give_weapon(new_ped, weapon, ammo);
        }
        ctx.backend.set_current_weapon(new_ped, current_weapon);
        self.set_ammo_in_clip(ctx, clip);

        if self.use_custom_clothes_on_spawn {
            let clothes = self.clothes;
            for (part, index) in clothes.iter().enumerate() {
                self.set_clothes(ctx, part as u8, *index);
            }
            self.use_custom_clothes_on_spawn = false;
        } else {
            ctx.backend.set_default_component_variation(new_ped);
            self.clothes = [0; CLOTHES_PARTS];
        }

        info!(player = ?self.id, model, "Model changed");
    }

    /// Picks the `index`-th drawable/texture combination for a body part,
    /// falling back to the default variation when out of range.
    pub fn set_clothes(&mut self, ctx: &mut SyncContext<'_>, part: u8, index: u8) {
        if usize::from(part) >= CLOTHES_PARTS {
            return;
        }
        let Some(ped) = self.spawned_ped() else {
            self.clothes[usize::from(part)] = index;
            return;
        };

        let mut n = 0u32;
        for drawable in 0..ctx.backend.drawable_variations(ped, part) {
            for texture in 0..ctx.backend.texture_variations(ped, part, drawable) {
                if n == u32::from(index) {
                    ctx.backend.set_component_variation(ped, part, drawable, texture);
                    self.clothes[usize::from(part)] = index;
                    return;
                }
                n += 1;
            }
        }

        ctx.backend.set_component_variation(ped, part, 0, 0);
        self.clothes[usize::from(part)] = 0;
    }

    pub fn clothes(&self, part: u8) -> u8 {
        self.clothes.get(usize::from(part)).copied().unwrap_or(0)
    }

    // ─── Controls / aim ───

    /// Records a new control snapshot and feeds remote peds' pads.
    pub fn set_control_state(&mut self, ctx: &mut SyncContext<'_>, state: ControlState) {
        if let Some(ped) = self.spawned_ped() {
            if !self.is_local {
                ctx.backend
                    .set_pad_state(ped, self.controls.current(), state);
            }
        }
        self.controls.push(state);
    }

    pub fn control_state(&self) -> ControlState {
        self.controls.current()
    }

    pub fn previous_control_state(&self) -> ControlState {
        self.controls.previous()
    }

    pub fn set_aim_sync(&mut self, ctx: &mut SyncContext<'_>, aim: AimSyncData) {
        if let Some(ped) = self.spawned_ped() {
            ctx.backend.set_aim_sync(ped, &aim);
        }
        self.aim = aim;
    }

    pub fn aim_sync(&self, ctx: &SyncContext<'_>) -> AimSyncData {
        self.spawned_ped()
            .and_then(|ped| ctx.backend.aim_sync(ped))
            .unwrap_or(self.aim)
    }

    // ─── Death ───

    /// Kills the player. Without `instantly` the die animation plays.
    pub fn kill(&mut self, ctx: &mut SyncContext<'_>, instantly: bool) {
        let Some(ped) = self.spawned_ped() else {
            return;
        };
        if self.is_dead(ctx) {
            return;
        }

        if !instantly {
            let p = &ctx.config.death_task;
            let task = PedTask::Die {
                weapon: p.weapon,
                body_part: p.body_part,
                anim_group: p.anim_group,
                anim_id: p.anim_id,
                blend_delta: p.blend_delta,
                anim_speed: p.anim_speed,
                flags: p.flags,
            };
            ctx.backend
                .set_task(ped, TaskPriority::EventResponseNonTemp, task);
        }

        self.set_health(ctx, 0);
        self.set_armour(ctx, 0);
        self.set_control_state(ctx, ControlState::default());
        self.reset_vehicle_enter_exit(ctx);
        self.reset_interpolation();
        info!(player = ?self.id, instantly, "Player killed");
    }

    pub fn is_dying(&self, ctx: &SyncContext<'_>) -> bool {
        self.spawned_ped()
            .and_then(|ped| ctx.backend.task(ped, TaskPriority::EventResponseNonTemp))
            .is_some_and(|task| matches!(task, PedTask::Die { .. }))
    }

    pub fn is_dead(&self, ctx: &SyncContext<'_>) -> bool {
        self.spawned_ped()
            .and_then(|ped| ctx.backend.task(ped, TaskPriority::EventResponseNonTemp))
            .is_some_and(|task| task.is_dying())
    }

    pub fn clear_die_task(&mut self, ctx: &mut SyncContext<'_>) -> bool {
        if !self.is_dead(ctx) {
            return false;
        }
        if let Some(ped) = self.spawned_ped() {
            ctx.backend
                .remove_task(ped, TaskPriority::EventResponseNonTemp);
        }
        true
    }

    // ─── Interpolation ───

    /// Starts blending toward a position received from the network.
    /// The local player is never interpolated, so this does nothing for it.
    pub fn set_target_position(&mut self, ctx: &mut SyncContext<'_>, target: Vec3, delay_ms: u64) {
        if self.is_local || self.spawned_ped().is_none() {
            return;
        }

        self.update_target_position(ctx);

        let current = self.position(ctx);
        if current.distance(target) > ctx.config.snap_distance {
            debug!(player = ?self.id, ?target, "Target too far, snapping");
            self.interp.disarm();
            self.set_position(ctx, target, false);
            return;
        }

        self.interp.arm(current, target, ctx.now_ms(), delay_ms);
    }

    /// Applies this pulse's share of the pending correction.
    pub fn update_target_position(&mut self, ctx: &mut SyncContext<'_>) {
        if !self.interp.is_armed() {
            return;
        }
        let current = self.position(ctx);
        let step = self
            .interp
            .step(current, ctx.now_ms(), ctx.config.snap_distance);
        if let Some(step) = step {
            if let InterpStep::Snap(target) = step {
                debug!(player = ?self.id, ?target, "Interpolation aborted, snapping");
            }
            self.set_position(ctx, step.position(), false);
        }
    }

    pub fn has_target_position(&self) -> bool {
        self.interp.is_armed()
    }

    pub fn interpolation(&self) -> &PositionInterpolation {
        &self.interp
    }

    pub fn remove_target_position(&mut self) {
        self.interp.disarm();
    }

    pub fn reset_interpolation(&mut self) {
        self.remove_target_position();
    }

    // ─── Per-tick ───

    /// Advances this player by one simulation tick.
    pub fn pulse(&mut self, ctx: &mut SyncContext<'_>) {
        let Some(ped) = self.spawned_ped() else {
            return;
        };

        if self.is_local {
            let state = ctx.backend.local_pad_state();
            self.controls.push(state);
        }

        self.apply_attribute_locks(ctx, ped);
        self.process_vehicle_entry_exit(ctx);

        if self.is_local {
            self.check_vehicle_entry_exit_key(ctx);
            self.process_vehicle_death_check(ctx);
        } else if !self.is_in_vehicle() {
            self.update_target_position(ctx);
        }
    }

    /// This tick's state for peers.
    pub fn build_sync(&self, ctx: &SyncContext<'_>) -> Option<SyncMsg> {
        let ped = self.spawned_ped()?;
        let health = self.health(ctx);
        let armour = self.armour(ctx);
        let control = self.controls.current();

        if let (Some(vehicle), false) = (self.vehicle, self.has_vehicle_enter_exit()) {
            return Some(SyncMsg::InVehicleSync(InVehicleSync {
                player: self.id,
                vehicle,
                seat: self.seat,
                health,
                armour,
                control,
            }));
        }

        Some(SyncMsg::OnFootSync(OnFootSync {
            player: self.id,
            position: self.position(ctx),
            heading: ctx.backend.current_heading(ped),
            move_speed: ctx.backend.move_speed(ped),
            health,
            armour,
            weapon: ctx.backend.current_weapon(ped),
            control,
        }))
    }

    /// Applies a remote player's on-foot state.
    pub fn apply_on_foot_sync(&mut self, ctx: &mut SyncContext<'_>, sync: &OnFootSync) {
        if self.spawned_ped().is_none() {
            return;
        }

        if self.is_in_vehicle() && !self.has_vehicle_enter_exit() {
            debug!(player = ?self.id, "On-foot sync while seated, removing from vehicle");
            self.remove_from_vehicle(ctx);
        }

        let delay_ms = ctx.config.interp_delay_ms;
        self.set_target_position(ctx, sync.position, delay_ms);
        self.set_current_sync_heading(ctx, sync.heading);
        self.set_move_speed(ctx, sync.move_speed);
        self.set_control_state(ctx, sync.control);
        self.apply_synced_attributes(ctx, sync.health, sync.armour);

        if self.current_weapon(ctx) != sync.weapon {
            self.set_current_weapon(ctx, sync.weapon);
        }
    }

    /// Applies a remote player's in-vehicle state.
    pub fn apply_in_vehicle_sync(&mut self, ctx: &mut SyncContext<'_>, sync: &InVehicleSync) {
        if self.spawned_ped().is_none() {
            return;
        }

        if !self.has_vehicle_enter_exit()
            && (self.vehicle != Some(sync.vehicle) || self.seat != sync.seat)
        {
            debug!(player = ?self.id, vehicle = ?sync.vehicle, seat = sync.seat, "Seat mismatch, warping");
            self.put_in_vehicle(ctx, sync.vehicle, sync.seat);
        }

        self.set_control_state(ctx, sync.control);
        self.apply_synced_attributes(ctx, sync.health, sync.armour);
    }

    /// Synced values never override a lock.
    fn apply_synced_attributes(&mut self, ctx: &mut SyncContext<'_>, health: u32, armour: u32) {
        if !self.health.is_locked() && self.health(ctx) != health {
            self.set_health(ctx, health);
        }
        if !self.armour.is_locked() && self.armour(ctx) != armour {
            self.set_armour(ctx, armour);
        }
    }
}
