//! Client session.
//!
//! The session owns everything the sync layer runs against:
//! - The game backend and the vehicle registry
//! - The outgoing message queue
//! - The clock and configuration
//! - The player manager
//!
//! Each `pulse()` advances all players by one tick and queues the local
//! player's sync message. Host messages go in through `deliver()`.

use anyhow::Context;
use entsync_shared::{
    config::SyncConfig,
    net::{OutgoingRpc, PlayerId, Priority, Reliability, RpcOutbox, RpcSink, SyncMsg},
    time::Clock,
};
use tracing::{debug, info};

use crate::{
    backend::GameBackend,
    context::SyncContext,
    manager::PlayerManager,
    player::PlayerEntity,
    registry::VehicleRegistry,
};

pub struct ClientSession<B: GameBackend, C: Clock> {
    pub config: SyncConfig,
    backend: B,
    clock: C,
    vehicles: VehicleRegistry,
    outbox: RpcOutbox,
    players: PlayerManager,
    controls_disabled: bool,
    tick: u32,
}

impl<B: GameBackend, C: Clock> ClientSession<B, C> {
    /// Wraps the local player found in `backend`.
    pub fn new(config: SyncConfig, backend: B, clock: C, local_id: PlayerId) -> anyhow::Result<Self> {
        let local = PlayerEntity::new_local(local_id, &backend);
        local.ped().context("backend has no local player ped")?;

        info!(player = ?local_id, tick_hz = config.tick_hz, "Session started");

        Ok(Self {
            config,
            backend,
            clock,
            vehicles: VehicleRegistry::new(),
            outbox: RpcOutbox::new(),
            players: PlayerManager::new(local),
            controls_disabled: false,
            tick: 0,
        })
    }

    /// Runs `f` with the players and a context borrowed from this session.
    pub fn with_context<R>(&mut self, f: impl FnOnce(&mut PlayerManager, &mut SyncContext<'_>) -> R) -> R {
        let local_interior = self
            .players
            .local()
            .ped()
            .map_or(0, |ped| self.backend.interior(ped));

        let mut ctx = SyncContext {
            backend: &mut self.backend,
            vehicles: &mut self.vehicles,
            rpc: &mut self.outbox,
            clock: &self.clock,
            config: &self.config,
            local_interior,
            controls_disabled: self.controls_disabled,
        };
        f(&mut self.players, &mut ctx)
    }

    /// Advances one tick.
    pub fn pulse(&mut self) {
        self.with_context(|players, ctx| {
            players.pulse(ctx);
            if let Some(sync) = players.local_sync(ctx) {
                ctx.rpc
                    .send(sync, Priority::Medium, Reliability::UnreliableSequenced);
            }
        });
        self.tick += 1;
    }

    /// Applies one message from the host.
    pub fn deliver(&mut self, msg: SyncMsg) {
        debug!(tick = self.tick, msg = ?msg, "Deliver");
        self.with_context(|players, ctx| players.handle_message(ctx, msg));
    }

    pub fn drain_outbox(&mut self) -> Vec<OutgoingRpc> {
        self.outbox.drain()
    }

    pub fn outbox(&self) -> &RpcOutbox {
        &self.outbox
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn vehicles(&self) -> &VehicleRegistry {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> &mut VehicleRegistry {
        &mut self.vehicles
    }

    pub fn players(&self) -> &PlayerManager {
        &self.players
    }

    pub fn local_player(&self) -> &PlayerEntity {
        self.players.local()
    }

    pub fn set_controls_disabled(&mut self, disabled: bool) {
        self.controls_disabled = disabled;
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// One-line summaries for logging.
    pub fn status(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push(format!("Tick: {}", self.tick));
        let local = self.players.local();
        out.push(format!(
            "Local: {:?} state={:?}",
            local.id(),
            local.vehicle_state()
        ));
        out.push(format!("Remote players: {}", self.players.len()));
        for player in self.players.remotes() {
            out.push(format!(
                "  {:?} spawned={} state={:?}",
                player.id(),
                player.is_spawned(),
                player.vehicle_state()
            ));
        }
        out.push(format!("Vehicles: {}", self.vehicles.len()));
        out.push(format!("Outbox: {}", self.outbox.len()));
        out
    }
}
