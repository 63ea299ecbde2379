//! `entsync_client`
//!
//! Client-side player entity sync:
//! - Player lifecycle (create, destroy, stream in/out)
//! - Error-compensating position interpolation for remote players
//! - Control state tracking with press/release edges
//! - Vehicle entry/exit state machine with host round-trips
//! - Host-pinned health and armour
//! - Headless engine backend and a loopback demo driver

pub mod attributes;
pub mod backend;
pub mod client;
pub mod context;
pub mod demo;
pub mod headless;
pub mod input;
pub mod interp;
pub mod manager;
pub mod player;
pub mod registry;
pub mod vehicle;

pub use client::ClientSession;
pub use context::SyncContext;
pub use player::{CreateError, PlayerEntity};
pub use vehicle::{ExitVehicleMode, VehicleSyncState};
