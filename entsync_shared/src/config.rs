//! Configuration system.
//!
//! Loads sync configuration from JSON strings (file IO left to app).
//!
//! The animation task parameters below were recovered from the game by trial
//! and error, so they live here rather than as constants in the state machine.

use serde::{Deserialize, Serialize};

/// Root configuration for the entity sync layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Simulation pulses per second.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Window over which a remote position correction is absorbed.
    #[serde(default = "default_interp_delay_ms")]
    pub interp_delay_ms: u64,
    /// Corrections larger than this snap instead of blending.
    #[serde(default = "default_snap_distance")]
    pub snap_distance: f32,
    /// Search radius for the enter-vehicle key.
    #[serde(default = "default_closest_vehicle_distance")]
    pub closest_vehicle_distance: f32,
    /// Health given to a freshly created remote ped.
    #[serde(default = "default_spawn_health")]
    pub spawn_health: u32,
    /// Money deltas beyond this update the displayed value at once.
    #[serde(default = "default_money_snap_threshold")]
    pub money_snap_threshold: i64,
    #[serde(default)]
    pub enter_task: EnterTaskParams,
    #[serde(default)]
    pub exit_task: ExitTaskParams,
    #[serde(default)]
    pub death_task: DeathTaskParams,
}

fn default_tick_hz() -> u32 {
    30
}

fn default_interp_delay_ms() -> u64 {
    100
}

fn default_snap_distance() -> f32 {
    5.0
}

fn default_closest_vehicle_distance() -> f32 {
    6.0
}

fn default_spawn_health() -> u32 {
    200
}

fn default_money_snap_threshold() -> i64 {
    1_000_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            interp_delay_ms: default_interp_delay_ms(),
            snap_distance: default_snap_distance(),
            closest_vehicle_distance: default_closest_vehicle_distance(),
            spawn_health: default_spawn_health(),
            money_snap_threshold: default_money_snap_threshold(),
            enter_task: EnterTaskParams::default(),
            exit_task: ExitTaskParams::default(),
            death_task: DeathTaskParams::default(),
        }
    }
}

impl SyncConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Milliseconds per pulse.
    pub fn tick_ms(&self) -> u64 {
        1000 / u64::from(self.tick_hz.max(1))
    }
}

/// Parameters of the get-in-vehicle animation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterTaskParams {
    /// Door argument when entering the driver seat.
    pub driver_door: i32,
    /// Door argument for passenger seats 1, 2, 3...
    pub passenger_doors: Vec<i32>,
    /// Door argument for seats past `passenger_doors`.
    pub fallback_door: i32,
    /// Extra task flags for passenger entries.
    pub passenger_flags: u32,
    pub timer: i32,
    pub blend: f32,
    /// Door argument for the instant warp task, indexed by seat.
    pub warp_doors: Vec<i32>,
    pub warp_fallback_door: i32,
}

impl Default for EnterTaskParams {
    fn default() -> Self {
        Self {
            driver_door: -7,
            passenger_doors: vec![2, 1, 3],
            fallback_door: -4,
            passenger_flags: 0x20_0000,
            timer: 27,
            blend: -2.0,
            warp_doors: vec![0, 2, 1, 3],
            warp_fallback_door: -2,
        }
    }
}

impl EnterTaskParams {
    pub fn door_for_seat(&self, seat: u8) -> i32 {
        if seat == 0 {
            return self.driver_door;
        }
        self.passenger_doors
            .get(usize::from(seat) - 1)
            .copied()
            .unwrap_or(self.fallback_door)
    }

    pub fn flags_for_seat(&self, seat: u8) -> u32 {
        if seat > 0 {
            self.passenger_flags
        } else {
            0
        }
    }

    pub fn warp_door_for_seat(&self, seat: u8) -> i32 {
        self.warp_doors
            .get(usize::from(seat))
            .copied()
            .unwrap_or(self.warp_fallback_door)
    }
}

/// Parameters of the exit-vehicle animation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitTaskParams {
    /// Planar speed (either axis) above which occupants dive out.
    pub dive_speed: f32,
    pub climb_out_mode: u32,
    pub jacked_mode: u32,
    pub dive_out_truck_mode: u32,
    pub dive_out_mode: u32,
    /// Vehicle model classes that use the truck dive.
    pub truck_models: Vec<u32>,
    /// Vehicle model classes that never dive.
    pub no_dive_models: Vec<u32>,
    /// Model classes at or above this never dive.
    pub dive_model_limit: u32,
}

impl Default for ExitTaskParams {
    fn default() -> Self {
        Self {
            dive_speed: 10.0,
            climb_out_mode: 0xF,
            jacked_mode: 0x9C4,
            dive_out_truck_mode: 0x40B,
            dive_out_mode: 0x100E,
            truck_models: vec![
                2, 4, 5, 7, 8, 10, 11, 31, 32, 49, 50, 51, 52, 53, 55, 56, 60, 66, 73, 85, 86, 94,
                104,
            ],
            no_dive_models: vec![12],
            dive_model_limit: 166,
        }
    }
}

/// Parameters of the complex die task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathTaskParams {
    pub weapon: u32,
    pub body_part: u32,
    pub anim_group: u32,
    pub anim_id: u32,
    pub blend_delta: f32,
    pub anim_speed: f32,
    pub flags: u32,
}

impl Default for DeathTaskParams {
    fn default() -> Self {
        Self {
            weapon: 0,
            body_part: 0,
            anim_group: 44,
            anim_id: 190,
            blend_delta: 4.0,
            anim_speed: 0.0,
            flags: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let cfg = SyncConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, SyncConfig::default());
        assert_eq!(cfg.snap_distance, 5.0);
        assert_eq!(cfg.spawn_health, 200);
    }

    #[test]
    fn partial_override() {
        let cfg = SyncConfig::from_json_str(
            r#"{ "interp_delay_ms": 250, "exit_task": { "dive_speed": 12.5 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.interp_delay_ms, 250);
        assert_eq!(cfg.exit_task.dive_speed, 12.5);
        assert_eq!(cfg.exit_task.jacked_mode, 0x9C4);
    }

    #[test]
    fn enter_task_door_mapping() {
        let params = EnterTaskParams::default();
        assert_eq!(params.door_for_seat(0), -7);
        assert_eq!(params.door_for_seat(1), 2);
        assert_eq!(params.door_for_seat(3), 3);
        assert_eq!(params.door_for_seat(4), -4);
        assert_eq!(params.flags_for_seat(0), 0);
        assert_eq!(params.flags_for_seat(2), 0x20_0000);
        assert_eq!(params.warp_door_for_seat(1), 2);
        assert_eq!(params.warp_door_for_seat(9), -2);
    }

    #[test]
    fn tick_ms_from_rate() {
        let cfg = SyncConfig {
            tick_hz: 50,
            ..SyncConfig::default()
        };
        assert_eq!(cfg.tick_ms(), 20);
    }
}
