//! Per-call context.
//!
//! Everything an entity needs from outside itself is borrowed into a
//! `SyncContext` for the duration of one pulse or one message delivery.

use entsync_shared::{config::SyncConfig, net::RpcSink, time::Clock};

use crate::{backend::GameBackend, registry::VehicleRegistry};

pub struct SyncContext<'a> {
    pub backend: &'a mut dyn GameBackend,
    pub vehicles: &'a mut VehicleRegistry,
    pub rpc: &'a mut dyn RpcSink,
    pub clock: &'a dyn Clock,
    pub config: &'a SyncConfig,
    /// Interior of the local player; remote peds are kept in it.
    pub local_interior: u32,
    /// Script lock on the local player's controls.
    pub controls_disabled: bool,
}

impl SyncContext<'_> {
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
