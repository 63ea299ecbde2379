//! Vehicle registry.
//!
//! Vehicles own the authoritative occupant table; players only remember the
//! id and seat they think they hold. The registry resolves ids to records and
//! native handles back to ids.

use std::collections::BTreeMap;

use entsync_shared::net::{PlayerId, SeatId, VehicleId};
use tracing::debug;

use crate::backend::NativeVehicleHandle;

/// Client view of one network-known vehicle.
#[derive(Debug, Clone)]
pub struct NetworkVehicle {
    pub id: VehicleId,
    /// Native vehicle while streamed in.
    pub handle: Option<NativeVehicleHandle>,
    /// Occupancy is authoritative on the host and must be round-tripped.
    pub is_network: bool,
    /// Vehicle model class.
    pub model_id: u32,
    /// 0 = unlocked.
    pub door_lock_state: u8,
    /// Seat 0 is the driver; the rest are passenger seats.
    occupants: Vec<Option<PlayerId>>,
}

impl NetworkVehicle {
    pub fn new(id: VehicleId, model_id: u32, max_passengers: u8, is_network: bool) -> Self {
        Self {
            id,
            handle: None,
            is_network,
            model_id,
            door_lock_state: 0,
            occupants: vec![None; usize::from(max_passengers) + 1],
        }
    }

    pub fn is_streamed_in(&self) -> bool {
        self.handle.is_some()
    }

    pub fn max_passengers(&self) -> u8 {
        (self.occupants.len() - 1) as u8
    }

    pub fn occupant(&self, seat: SeatId) -> Option<PlayerId> {
        self.occupants.get(usize::from(seat)).copied().flatten()
    }

    pub fn driver(&self) -> Option<PlayerId> {
        self.occupant(0)
    }

    /// Writes a seat. Out of range seats are ignored.
    pub fn set_occupant(&mut self, seat: SeatId, player: Option<PlayerId>) {
        match self.occupants.get_mut(usize::from(seat)) {
            Some(slot) => *slot = player,
            None => debug!(vehicle = ?self.id, seat, "Seat out of range"),
        }
    }

    /// Clears `seat` only if `player` holds it.
    pub fn vacate(&mut self, seat: SeatId, player: PlayerId) {
        if self.occupant(seat) == Some(player) {
            self.set_occupant(seat, None);
        }
    }

    /// First free passenger seat, counted from 1.
    pub fn free_passenger_seat(&self) -> Option<SeatId> {
        (1..=self.max_passengers()).find(|seat| self.occupant(*seat).is_none())
    }

    pub fn occupied_seats(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }
}

/// Every vehicle the client knows about.
#[derive(Debug, Default)]
pub struct VehicleRegistry {
    vehicles: BTreeMap<VehicleId, NetworkVehicle>,
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, vehicle: NetworkVehicle) {
        self.vehicles.insert(vehicle.id, vehicle);
    }

    pub fn remove(&mut self, id: VehicleId) -> Option<NetworkVehicle> {
        self.vehicles.remove(&id)
    }

    pub fn get(&self, id: VehicleId) -> Option<&NetworkVehicle> {
        self.vehicles.get(&id)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut NetworkVehicle> {
        self.vehicles.get_mut(&id)
    }

    /// Resolves a native handle to the vehicle id that owns it.
    pub fn resolve_handle(&self, handle: NativeVehicleHandle) -> Option<VehicleId> {
        self.vehicles
            .values()
            .find(|v| v.handle == Some(handle))
            .map(|v| v.id)
    }

    /// Streamed-in vehicles in id order.
    pub fn streamed_in(&self) -> impl Iterator<Item = &NetworkVehicle> {
        self.vehicles.values().filter(|v| v.is_streamed_in())
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}
