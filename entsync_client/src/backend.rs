//! Game engine abstraction.
//!
//! The sync layer never owns native objects. Everything it needs from the
//! running game goes through these traits: allocating a ped for a player
//! slot, queueing animation tasks in priority slots, reading and writing the
//! ped's physical state, and querying vehicles.
//!
//! Calls with a handle the engine no longer knows about must be harmless:
//! getters return defaults and setters do nothing.

use entsync_shared::{control::ControlState, math::Vec3, net::AimSyncData};

/// Native ped handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PedHandle(pub u32);

/// Native vehicle handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeVehicleHandle(pub u32);

/// Index into the engine's player info table.
pub type PlayerSlot = u8;

/// Engine model index.
pub type ModelIndex = u32;

/// Model hash of the default player model.
pub const DEFAULT_PLAYER_MODEL: ModelIndex = 0;

/// Task slots a ped runs concurrently; one task per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPriority {
    PhysicalResponse,
    EventResponseTemp,
    EventResponseNonTemp,
    Primary,
    Default,
}

/// Tasks the sync layer issues or inspects.
#[derive(Debug, Clone, PartialEq)]
pub enum PedTask {
    GetInVehicle {
        vehicle: NativeVehicleHandle,
        door: i32,
        timer: i32,
        flags: u32,
        blend: f32,
    },
    ExitVehicle {
        vehicle: NativeVehicleHandle,
        mode: u32,
    },
    /// Pulling another ped out of a vehicle.
    DragOutPed,
    /// Being pulled out of a vehicle.
    BeDraggedOut,
    Die {
        weapon: u32,
        body_part: u32,
        anim_group: u32,
        anim_id: u32,
        blend_delta: f32,
        anim_speed: f32,
        flags: u32,
    },
    Dead,
    /// Anything the sync layer does not care about, by engine type id.
    Other(u32),
}

impl PedTask {
    pub fn is_get_in_vehicle(&self) -> bool {
        matches!(self, PedTask::GetInVehicle { .. })
    }

    pub fn is_exit_vehicle(&self) -> bool {
        matches!(self, PedTask::ExitVehicle { .. })
    }

    pub fn is_dying(&self) -> bool {
        matches!(self, PedTask::Die { .. } | PedTask::Dead)
    }
}

/// Ped, player table and pad access.
pub trait PedBackend {
    // ─── Player table / lifecycle ───
    /// The ped the game created for the local player.
    fn local_player_ped(&self) -> Option<PedHandle>;
    fn find_free_player_slot(&self) -> Option<PlayerSlot>;
    /// Allocates and constructs a player ped for `slot`, including its
    /// intelligence. `None` when the ped pool is exhausted.
    fn create_ped(&mut self, slot: PlayerSlot, model: ModelIndex) -> Option<PedHandle>;
    fn shutdown_intelligence(&mut self, ped: PedHandle);
    /// Engine-internal "is network player" collision bit.
    fn set_collision_flag(&mut self, ped: PedHandle, enabled: bool);
    fn bind_player_slot(&mut self, slot: PlayerSlot, ped: Option<PedHandle>);
    fn add_to_world(&mut self, ped: PedHandle);
    fn remove_from_world(&mut self, ped: PedHandle);
    fn destroy_ped(&mut self, ped: PedHandle);

    // ─── Spatial ───
    fn position(&self, ped: PedHandle) -> Vec3;
    fn set_position(&mut self, ped: PedHandle, position: Vec3);
    /// Moves an on-foot ped without ground offset.
    fn set_coordinates_no_offset(&mut self, ped: PedHandle, position: Vec3);
    /// Pulls the ped out of its vehicle and places it at `position`.
    fn warp_from_vehicle(&mut self, ped: PedHandle, position: Vec3);
    fn current_heading(&self, ped: PedHandle) -> f32;
    fn set_current_heading(&mut self, ped: PedHandle, heading: f32);
    fn desired_heading(&self, ped: PedHandle) -> f32;
    fn set_desired_heading(&mut self, ped: PedHandle, heading: f32);
    fn move_speed(&self, ped: PedHandle) -> Vec3;
    fn set_move_speed(&mut self, ped: PedHandle, speed: Vec3);
    fn interior(&self, ped: PedHandle) -> u32;
    fn set_interior(&mut self, ped: PedHandle, interior: u32);

    // ─── Attributes ───
    fn health(&self, ped: PedHandle) -> u32;
    fn set_health(&mut self, ped: PedHandle, health: u32);
    fn armour(&self, ped: PedHandle) -> u32;
    fn set_armour(&mut self, ped: PedHandle, armour: u32);

    // ─── Weapons ───
    fn give_weapon(&mut self, ped: PedHandle, weapon: u32, ammo: u32);
    fn remove_weapon(&mut self, ped: PedHandle, weapon: u32);
    fn remove_all_weapons(&mut self, ped: PedHandle);
    fn current_weapon(&self, ped: PedHandle) -> u32;
    fn set_current_weapon(&mut self, ped: PedHandle, weapon: u32);
    fn ammo(&self, ped: PedHandle, weapon: u32) -> u32;
    fn set_ammo(&mut self, ped: PedHandle, weapon: u32, ammo: u32);
    fn ammo_in_clip(&self, ped: PedHandle, weapon: u32) -> u32;
    fn set_ammo_in_clip(&mut self, ped: PedHandle, weapon: u32, ammo: u32);
    fn max_ammo_in_clip(&self, ped: PedHandle, weapon: u32) -> u32;
    /// `(weapon, ammo)` held in an inventory slot.
    fn weapon_in_slot(&self, ped: PedHandle, slot: u32) -> Option<(u32, u32)>;

    // ─── Model / clothes ───
    fn model_index(&self, model_hash: u32) -> Option<ModelIndex>;
    fn is_ped_model(&self, model: ModelIndex) -> bool;
    /// Swaps the slot's ped model. The engine may hand back a new ped.
    fn change_player_model(&mut self, slot: PlayerSlot, model: ModelIndex) -> Option<PedHandle>;
    fn drawable_variations(&self, ped: PedHandle, part: u8) -> u32;
    fn texture_variations(&self, ped: PedHandle, part: u8, drawable: u32) -> u32;
    fn set_component_variation(&mut self, ped: PedHandle, part: u8, drawable: u32, texture: u32);
    fn set_default_component_variation(&mut self, ped: PedHandle);

    // ─── Tasks ───
    fn task(&self, ped: PedHandle, priority: TaskPriority) -> Option<PedTask>;
    fn set_task(&mut self, ped: PedHandle, priority: TaskPriority, task: PedTask);
    fn remove_task(&mut self, ped: PedHandle, priority: TaskPriority);

    // ─── Vehicle occupancy ───
    /// The vehicle the engine currently has the ped seated in.
    fn ped_vehicle(&self, ped: PedHandle) -> Option<NativeVehicleHandle>;
    /// Seats the ped immediately, no animation.
    fn put_ped_in_vehicle(&mut self, ped: PedHandle, vehicle: NativeVehicleHandle, door: i32);
    /// Unseats the ped immediately, no animation.
    fn remove_ped_from_vehicle(&mut self, ped: PedHandle, vehicle: NativeVehicleHandle);

    // ─── Pads ───
    fn input_enabled(&self) -> bool;
    fn local_pad_state(&self) -> ControlState;
    fn set_pad_state(&mut self, ped: PedHandle, previous: ControlState, current: ControlState);

    // ─── Player info ───
    fn score(&self, slot: PlayerSlot) -> i64;
    fn set_score(&mut self, slot: PlayerSlot, score: i64);
    fn display_score(&self, slot: PlayerSlot) -> i64;
    fn set_display_score(&mut self, slot: PlayerSlot, score: i64);
    fn set_player_colour(&mut self, slot: PlayerSlot, colour: u32);
    fn set_player_name(&mut self, slot: PlayerSlot, name: &str);
    fn set_aim_sync(&mut self, ped: PedHandle, aim: &AimSyncData);
    fn aim_sync(&self, ped: PedHandle) -> Option<AimSyncData>;
}

/// Vehicle queries the sync layer needs.
pub trait VehicleBackend {
    fn vehicle_position(&self, vehicle: NativeVehicleHandle) -> Vec3;
    fn vehicle_move_speed(&self, vehicle: NativeVehicleHandle) -> Vec3;
    fn vehicle_health(&self, vehicle: NativeVehicleHandle) -> i32;
    fn vehicle_petrol_tank_health(&self, vehicle: NativeVehicleHandle) -> f32;
    fn is_vehicle_dead(&self, vehicle: NativeVehicleHandle) -> bool;
    fn set_vehicle_damageable(&mut self, vehicle: NativeVehicleHandle, damageable: bool);
}

/// Full engine surface.
pub trait GameBackend: PedBackend + VehicleBackend {}

impl<T: PedBackend + VehicleBackend> GameBackend for T {}
