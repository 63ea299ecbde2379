//! Headless game backend.
//!
//! An in-memory stand-in for the engine, for tests and the demo binary.
//! Peds and vehicles are plain structs; tasks run for a fixed number of
//! `step()` calls and then apply their outcome (get-in seats the ped, exit
//! unseats it). Tests can also finish or interrupt a task directly.

use std::collections::HashMap;

use entsync_shared::{control::ControlState, math::Vec3, net::AimSyncData};
use tracing::trace;

use crate::backend::{
    ModelIndex, NativeVehicleHandle, PedBackend, PedHandle, PedTask, PlayerSlot, TaskPriority, VehicleBackend,
    DEFAULT_PLAYER_MODEL,
};

/// Player table size, slot 0 included.
pub const MAX_PLAYER_SLOTS: usize = 32;

const DRAWABLES_PER_PART: u32 = 2;
const TEXTURES_PER_DRAWABLE: u32 = 3;
const CLIP_SIZE: u32 = 30;

#[derive(Debug, Clone)]
pub struct HeadlessTask {
    pub task: PedTask,
    pub remaining_steps: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessWeapon {
    pub slot: u32,
    pub ammo: u32,
    pub clip: u32,
}

#[derive(Debug, Clone)]
pub struct HeadlessPed {
    pub model: ModelIndex,
    pub position: Vec3,
    pub current_heading: f32,
    pub desired_heading: f32,
    pub move_speed: Vec3,
    pub interior: u32,
    pub health: u32,
    pub armour: u32,
    pub in_world: bool,
    pub collision: bool,
    pub vehicle: Option<NativeVehicleHandle>,
    pub tasks: HashMap<TaskPriority, HeadlessTask>,
    pub weapons: HashMap<u32, HeadlessWeapon>,
    pub current_weapon: u32,
    pub components: [(u32, u32); 11],
    pub pad: (ControlState, ControlState),
    pub aim: Option<AimSyncData>,
}

impl HeadlessPed {
    fn new(model: ModelIndex) -> Self {
        Self {
            model,
            position: Vec3::ZERO,
            current_heading: 0.0,
            desired_heading: 0.0,
            move_speed: Vec3::ZERO,
            interior: 0,
            health: 200,
            armour: 0,
            in_world: false,
            collision: false,
            vehicle: None,
            tasks: HashMap::new(),
            weapons: HashMap::new(),
            current_weapon: 0,
            components: [(0, 0); 11],
            pad: (ControlState::default(), ControlState::default()),
            aim: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeadlessVehicle {
    pub position: Vec3,
    pub move_speed: Vec3,
    pub health: i32,
    pub petrol_tank_health: f32,
    pub dead: bool,
    pub damageable: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct PlayerInfo {
    ped: Option<PedHandle>,
    score: i64,
    display_score: i64,
    colour: u32,
}

/// Engine lifecycle calls in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCall {
    Created(PedHandle),
    CollisionEnabled(PedHandle),
    CollisionDisabled(PedHandle),
    SlotBound(PlayerSlot),
    SlotReleased(PlayerSlot),
    AddedToWorld(PedHandle),
    RemovedFromWorld(PedHandle),
    IntelligenceShutdown(PedHandle),
    Destroyed(PedHandle),
}

#[derive(Debug)]
pub struct HeadlessBackend {
    peds: HashMap<PedHandle, HeadlessPed>,
    vehicles: HashMap<NativeVehicleHandle, HeadlessVehicle>,
    players: [PlayerInfo; MAX_PLAYER_SLOTS],
    names: HashMap<PlayerSlot, String>,
    models: HashMap<u32, (ModelIndex, bool)>,
    local_ped: PedHandle,
    next_handle: u32,
    /// Upper bound on live peds, local included.
    pub ped_capacity: usize,
    /// Steps a queued task runs before applying its outcome.
    pub task_steps: u32,
    pub input_enabled: bool,
    pub local_pad: ControlState,
    pub journal: Vec<LifecycleCall>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        let local_ped = PedHandle(1);
        let mut local = HeadlessPed::new(DEFAULT_PLAYER_MODEL);
        local.in_world = true;
        local.collision = true;

        let mut players = [PlayerInfo::default(); MAX_PLAYER_SLOTS];
        players[0].ped = Some(local_ped);

        let mut models = HashMap::new();
        models.insert(0, (DEFAULT_PLAYER_MODEL, true));

        Self {
            peds: HashMap::from([(local_ped, local)]),
            vehicles: HashMap::new(),
            players,
            names: HashMap::new(),
            models,
            local_ped,
            next_handle: 2,
            ped_capacity: 64,
            task_steps: 3,
            input_enabled: true,
            local_pad: ControlState::default(),
            journal: Vec::new(),
        }
    }

    fn alloc_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Makes `hash` resolve to `index`.
    pub fn register_model(&mut self, hash: u32, index: ModelIndex, is_ped: bool) {
        self.models.insert(hash, (index, is_ped));
    }

    pub fn spawn_vehicle(&mut self, position: Vec3) -> NativeVehicleHandle {
        let handle = NativeVehicleHandle(self.alloc_handle());
        self.vehicles.insert(
            handle,
            HeadlessVehicle {
                position,
                move_speed: Vec3::ZERO,
                health: 1000,
                petrol_tank_health: 1000.0,
                dead: false,
                damageable: false,
            },
        );
        handle
    }

    pub fn ped(&self, ped: PedHandle) -> Option<&HeadlessPed> {
        self.peds.get(&ped)
    }

    pub fn ped_mut(&mut self, ped: PedHandle) -> Option<&mut HeadlessPed> {
        self.peds.get_mut(&ped)
    }

    pub fn ped_count(&self) -> usize {
        self.peds.len()
    }

    pub fn vehicle(&self, vehicle: NativeVehicleHandle) -> Option<&HeadlessVehicle> {
        self.vehicles.get(&vehicle)
    }

    pub fn vehicle_mut(&mut self, vehicle: NativeVehicleHandle) -> Option<&mut HeadlessVehicle> {
        self.vehicles.get_mut(&vehicle)
    }

    pub fn slot_ped(&self, slot: PlayerSlot) -> Option<PedHandle> {
        self.players.get(usize::from(slot)).and_then(|p| p.ped)
    }

    pub fn player_name(&self, slot: PlayerSlot) -> Option<&str> {
        self.names.get(&slot).map(String::as_str)
    }

    pub fn player_colour(&self, slot: PlayerSlot) -> Option<u32> {
        self.players.get(usize::from(slot)).map(|p| p.colour)
    }

    /// Advances every running task by one step.
    pub fn step(&mut self) {
        let mut finished = Vec::new();
        for (handle, ped) in &mut self.peds {
            for (priority, slot) in &mut ped.tasks {
                slot.remaining_steps = slot.remaining_steps.saturating_sub(1);
                if slot.remaining_steps == 0 {
                    finished.push((*handle, *priority));
                }
            }
        }
        for (ped, priority) in finished {
            self.complete_task(ped, priority);
        }
    }

    /// Finishes a task now, applying its outcome.
    pub fn complete_task(&mut self, ped: PedHandle, priority: TaskPriority) {
        let Some(p) = self.peds.get_mut(&ped) else {
            return;
        };
        let Some(task) = p.tasks.get(&priority).map(|t| t.task.clone()) else {
            return;
        };
        match task {
            PedTask::GetInVehicle { vehicle, .. } => {
                p.vehicle = Some(vehicle);
                p.tasks.remove(&priority);
            }
            PedTask::ExitVehicle { .. } => {
                p.vehicle = None;
                p.tasks.remove(&priority);
            }
            PedTask::Die { .. } => {
                p.tasks.insert(
                    priority,
                    HeadlessTask {
                        task: PedTask::Dead,
                        remaining_steps: u32::MAX,
                    },
                );
            }
            PedTask::Dead => {}
            _ => {
                p.tasks.remove(&priority);
            }
        }
    }

    /// Drops a task without applying its outcome.
    pub fn interrupt_task(&mut self, ped: PedHandle, priority: TaskPriority) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.tasks.remove(&priority);
        }
    }

    /// Takes the ped out of its vehicle without an animation.
    pub fn eject(&mut self, ped: PedHandle) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.vehicle = None;
        }
    }

    pub fn damage_ped(&mut self, ped: PedHandle, amount: u32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.health = p.health.saturating_sub(amount);
        }
    }
}

impl PedBackend for HeadlessBackend {
    fn local_player_ped(&self) -> Option<PedHandle> {
        Some(self.local_ped).filter(|h| self.peds.contains_key(h))
    }

    fn find_free_player_slot(&self) -> Option<PlayerSlot> {
        self.players
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, p)| p.ped.is_none())
            .map(|(i, _)| i as PlayerSlot)
    }

    fn create_ped(&mut self, _slot: PlayerSlot, model: ModelIndex) -> Option<PedHandle> {
        if self.peds.len() >= self.ped_capacity {
            return None;
        }
        let handle = PedHandle(self.alloc_handle());
        self.peds.insert(handle, HeadlessPed::new(model));
        self.journal.push(LifecycleCall::Created(handle));
        trace!(ped = ?handle, "Headless ped created");
        Some(handle)
    }

    fn shutdown_intelligence(&mut self, ped: PedHandle) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.tasks.clear();
            self.journal.push(LifecycleCall::IntelligenceShutdown(ped));
        }
    }

    fn set_collision_flag(&mut self, ped: PedHandle, enabled: bool) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.collision = enabled;
            self.journal.push(if enabled {
                LifecycleCall::CollisionEnabled(ped)
            } else {
                LifecycleCall::CollisionDisabled(ped)
            });
        }
    }

    fn bind_player_slot(&mut self, slot: PlayerSlot, ped: Option<PedHandle>) {
        if let Some(info) = self.players.get_mut(usize::from(slot)) {
            info.ped = ped;
            self.journal.push(match ped {
                Some(_) => LifecycleCall::SlotBound(slot),
                None => LifecycleCall::SlotReleased(slot),
            });
        }
    }

    fn add_to_world(&mut self, ped: PedHandle) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.in_world = true;
            self.journal.push(LifecycleCall::AddedToWorld(ped));
        }
    }

    fn remove_from_world(&mut self, ped: PedHandle) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.in_world = false;
            self.journal.push(LifecycleCall::RemovedFromWorld(ped));
        }
    }

    fn destroy_ped(&mut self, ped: PedHandle) {
        if self.peds.remove(&ped).is_some() {
            self.journal.push(LifecycleCall::Destroyed(ped));
        }
    }

    fn position(&self, ped: PedHandle) -> Vec3 {
        self.peds.get(&ped).map_or(Vec3::ZERO, |p| p.position)
    }

    fn set_position(&mut self, ped: PedHandle, position: Vec3) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.position = position;
        }
    }

    fn set_coordinates_no_offset(&mut self, ped: PedHandle, position: Vec3) {
        self.set_position(ped, position);
    }

    fn warp_from_vehicle(&mut self, ped: PedHandle, position: Vec3) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.vehicle = None;
            p.position = position;
        }
    }

    fn current_heading(&self, ped: PedHandle) -> f32 {
        self.peds.get(&ped).map_or(0.0, |p| p.current_heading)
    }

    fn set_current_heading(&mut self, ped: PedHandle, heading: f32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.current_heading = heading;
        }
    }

    fn desired_heading(&self, ped: PedHandle) -> f32 {
        self.peds.get(&ped).map_or(0.0, |p| p.desired_heading)
    }

    fn set_desired_heading(&mut self, ped: PedHandle, heading: f32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.desired_heading = heading;
        }
    }

    fn move_speed(&self, ped: PedHandle) -> Vec3 {
        self.peds.get(&ped).map_or(Vec3::ZERO, |p| p.move_speed)
    }

    fn set_move_speed(&mut self, ped: PedHandle, speed: Vec3) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.move_speed = speed;
        }
    }

    fn interior(&self, ped: PedHandle) -> u32 {
        self.peds.get(&ped).map_or(0, |p| p.interior)
    }

    fn set_interior(&mut self, ped: PedHandle, interior: u32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.interior = interior;
        }
    }

    fn health(&self, ped: PedHandle) -> u32 {
        self.peds.get(&ped).map_or(0, |p| p.health)
    }

    fn set_health(&mut self, ped: PedHandle, health: u32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.health = health;
        }
    }

    fn armour(&self, ped: PedHandle) -> u32 {
        self.peds.get(&ped).map_or(0, |p| p.armour)
    }

    fn set_armour(&mut self, ped: PedHandle, armour: u32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.armour = armour;
        }
    }

    fn give_weapon(&mut self, ped: PedHandle, weapon: u32, ammo: u32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            let slot = weapon_slot(weapon);
            p.weapons.retain(|_, w| w.slot != slot);
            p.weapons.insert(
                weapon,
                HeadlessWeapon {
                    slot,
                    ammo,
                    clip: ammo.min(CLIP_SIZE),
                },
            );
        }
    }

    fn remove_weapon(&mut self, ped: PedHandle, weapon: u32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.weapons.remove(&weapon);
            if p.current_weapon == weapon {
                p.current_weapon = 0;
            }
        }
    }

    fn remove_all_weapons(&mut self, ped: PedHandle) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.weapons.clear();
            p.current_weapon = 0;
        }
    }

    fn current_weapon(&self, ped: PedHandle) -> u32 {
        self.peds.get(&ped).map_or(0, |p| p.current_weapon)
    }

    fn set_current_weapon(&mut self, ped: PedHandle, weapon: u32) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.current_weapon = weapon;
        }
    }

    fn ammo(&self, ped: PedHandle, weapon: u32) -> u32 {
        self.peds
            .get(&ped)
            .and_then(|p| p.weapons.get(&weapon))
            .map_or(0, |w| w.ammo)
    }

    fn set_ammo(&mut self, ped: PedHandle, weapon: u32, ammo: u32) {
        if let Some(w) = self.peds.get_mut(&ped).and_then(|p| p.weapons.get_mut(&weapon)) {
            w.ammo = ammo;
            w.clip = w.clip.min(ammo);
        }
    }

    fn ammo_in_clip(&self, ped: PedHandle, weapon: u32) -> u32 {
        self.peds
            .get(&ped)
            .and_then(|p| p.weapons.get(&weapon))
            .map_or(0, |w| w.clip)
    }

    fn set_ammo_in_clip(&mut self, ped: PedHandle, weapon: u32, ammo: u32) {
        if let Some(w) = self.peds.get_mut(&ped).and_then(|p| p.weapons.get_mut(&weapon)) {
            let spent = w.clip.saturating_sub(ammo);
            w.clip = ammo;
            w.ammo = w.ammo.saturating_sub(spent).max(ammo);
        }
    }

    fn max_ammo_in_clip(&self, _ped: PedHandle, _weapon: u32) -> u32 {
        CLIP_SIZE
    }

    fn weapon_in_slot(&self, ped: PedHandle, slot: u32) -> Option<(u32, u32)> {
        self.peds.get(&ped).and_then(|p| {
            p.weapons
                .iter()
                .find(|(_, w)| w.slot == slot)
                .map(|(id, w)| (*id, w.ammo))
        })
    }

    fn model_index(&self, model_hash: u32) -> Option<ModelIndex> {
        self.models.get(&model_hash).map(|(index, _)| *index)
    }

    fn is_ped_model(&self, model: ModelIndex) -> bool {
        self.models
            .values()
            .any(|(index, is_ped)| *index == model && *is_ped)
    }

    /// Swaps the slot's ped for a fresh one; like the engine, state is lost.
    fn change_player_model(&mut self, slot: PlayerSlot, model: ModelIndex) -> Option<PedHandle> {
        let old = self.slot_ped(slot)?;
        let old_ped = self.peds.remove(&old)?;
        let handle = PedHandle(self.alloc_handle());

        let mut ped = HeadlessPed::new(model);
        ped.position = old_ped.position;
        ped.in_world = old_ped.in_world;
        ped.collision = old_ped.collision;
        ped.vehicle = old_ped.vehicle;
        self.peds.insert(handle, ped);

        if old == self.local_ped {
            self.local_ped = handle;
        }
        if let Some(info) = self.players.get_mut(usize::from(slot)) {
            info.ped = Some(handle);
        }
        Some(handle)
    }

    fn drawable_variations(&self, _ped: PedHandle, _part: u8) -> u32 {
        DRAWABLES_PER_PART
    }

    fn texture_variations(&self, _ped: PedHandle, _part: u8, _drawable: u32) -> u32 {
        TEXTURES_PER_DRAWABLE
    }

    fn set_component_variation(&mut self, ped: PedHandle, part: u8, drawable: u32, texture: u32) {
        if let Some(c) = self
            .peds
            .get_mut(&ped)
            .and_then(|p| p.components.get_mut(usize::from(part)))
        {
            *c = (drawable, texture);
        }
    }

    fn set_default_component_variation(&mut self, ped: PedHandle) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.components = [(0, 0); 11];
        }
    }

    fn task(&self, ped: PedHandle, priority: TaskPriority) -> Option<PedTask> {
        self.peds
            .get(&ped)
            .and_then(|p| p.tasks.get(&priority))
            .map(|t| t.task.clone())
    }

    fn set_task(&mut self, ped: PedHandle, priority: TaskPriority, task: PedTask) {
        let remaining_steps = self.task_steps.max(1);
        if let Some(p) = self.peds.get_mut(&ped) {
            p.tasks.insert(priority, HeadlessTask { task, remaining_steps });
        }
    }

    fn remove_task(&mut self, ped: PedHandle, priority: TaskPriority) {
        self.interrupt_task(ped, priority);
    }

    fn ped_vehicle(&self, ped: PedHandle) -> Option<NativeVehicleHandle> {
        self.peds.get(&ped).and_then(|p| p.vehicle)
    }

    fn put_ped_in_vehicle(&mut self, ped: PedHandle, vehicle: NativeVehicleHandle, _door: i32) {
        if !self.vehicles.contains_key(&vehicle) {
            return;
        }
        if let Some(p) = self.peds.get_mut(&ped) {
            p.vehicle = Some(vehicle);
        }
    }

    fn remove_ped_from_vehicle(&mut self, ped: PedHandle, vehicle: NativeVehicleHandle) {
        if let Some(p) = self.peds.get_mut(&ped) {
            if p.vehicle == Some(vehicle) {
                p.vehicle = None;
            }
        }
    }

    fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    fn local_pad_state(&self) -> ControlState {
        self.local_pad
    }

    fn set_pad_state(&mut self, ped: PedHandle, previous: ControlState, current: ControlState) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.pad = (previous, current);
        }
    }

    fn score(&self, slot: PlayerSlot) -> i64 {
        self.players.get(usize::from(slot)).map_or(0, |p| p.score)
    }

    fn set_score(&mut self, slot: PlayerSlot, score: i64) {
        if let Some(p) = self.players.get_mut(usize::from(slot)) {
            p.score = score;
        }
    }

    fn display_score(&self, slot: PlayerSlot) -> i64 {
        self.players
            .get(usize::from(slot))
            .map_or(0, |p| p.display_score)
    }

    fn set_display_score(&mut self, slot: PlayerSlot, score: i64) {
        if let Some(p) = self.players.get_mut(usize::from(slot)) {
            p.display_score = score;
        }
    }

    fn set_player_colour(&mut self, slot: PlayerSlot, colour: u32) {
        if let Some(p) = self.players.get_mut(usize::from(slot)) {
            p.colour = colour;
        }
    }

    fn set_player_name(&mut self, slot: PlayerSlot, name: &str) {
        self.names.insert(slot, name.to_string());
    }

    fn set_aim_sync(&mut self, ped: PedHandle, aim: &AimSyncData) {
        if let Some(p) = self.peds.get_mut(&ped) {
            p.aim = Some(*aim);
        }
    }

    fn aim_sync(&self, ped: PedHandle) -> Option<AimSyncData> {
        self.peds.get(&ped).and_then(|p| p.aim)
    }
}

impl VehicleBackend for HeadlessBackend {
    fn vehicle_position(&self, vehicle: NativeVehicleHandle) -> Vec3 {
        self.vehicles.get(&vehicle).map_or(Vec3::ZERO, |v| v.position)
    }

    fn vehicle_move_speed(&self, vehicle: NativeVehicleHandle) -> Vec3 {
        self.vehicles
            .get(&vehicle)
            .map_or(Vec3::ZERO, |v| v.move_speed)
    }

    fn vehicle_health(&self, vehicle: NativeVehicleHandle) -> i32 {
        self.vehicles.get(&vehicle).map_or(0, |v| v.health)
    }

    fn vehicle_petrol_tank_health(&self, vehicle: NativeVehicleHandle) -> f32 {
        self.vehicles
            .get(&vehicle)
            .map_or(0.0, |v| v.petrol_tank_health)
    }

    fn is_vehicle_dead(&self, vehicle: NativeVehicleHandle) -> bool {
        self.vehicles.get(&vehicle).is_some_and(|v| v.dead)
    }

    fn set_vehicle_damageable(&mut self, vehicle: NativeVehicleHandle, damageable: bool) {
        if let Some(v) = self.vehicles.get_mut(&vehicle) {
            v.damageable = damageable;
        }
    }
}

/// Inventory slot a weapon occupies.
fn weapon_slot(weapon: u32) -> u32 {
    match weapon {
        0 => 0,
        1..=3 => 1,
        4..=6 => 2,
        7..=9 => 3,
        10..=11 => 4,
        12..=13 => 5,
        14..=15 => 6,
        16..=18 => 7,
        _ => 8 + weapon % 4,
    }
}
