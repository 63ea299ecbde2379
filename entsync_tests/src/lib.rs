//! Scenario fixtures shared by the integration tests.
//!
//! A `TestSession` runs the sync layer against the headless backend and a
//! manual clock, so tests control time and animation completion exactly.

use entsync_client::{
    backend::{NativeVehicleHandle, PedHandle, TaskPriority},
    headless::HeadlessBackend,
    registry::NetworkVehicle,
    ClientSession,
};
use entsync_shared::{
    config::SyncConfig,
    control::{Buttons, ControlState},
    math::Vec3,
    net::{OutgoingRpc, PlayerId, SyncMsg, VehicleId},
    time::ManualClock,
};

pub type TestSession = ClientSession<HeadlessBackend, ManualClock>;

pub const LOCAL: PlayerId = PlayerId(0);
pub const REMOTE: PlayerId = PlayerId(1);
pub const NETWORK_CAR: VehicleId = VehicleId(10);
pub const LOCAL_CAR: VehicleId = VehicleId(11);

/// Milliseconds per pulse at the default tick rate.
pub const TICK_MS: u64 = 33;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

pub fn session() -> anyhow::Result<TestSession> {
    session_with(SyncConfig::default())
}

pub fn session_with(config: SyncConfig) -> anyhow::Result<TestSession> {
    init_tracing();
    ClientSession::new(config, HeadlessBackend::new(), ManualClock::new(1_000), LOCAL)
}

/// Registers a streamed-in vehicle with three passenger seats.
pub fn add_vehicle(session: &mut TestSession, id: VehicleId, position: Vec3, is_network: bool) -> NativeVehicleHandle {
    let handle = session.backend_mut().spawn_vehicle(position);
    let mut vehicle = NetworkVehicle::new(id, 20, 3, is_network);
    vehicle.handle = Some(handle);
    session.vehicles_mut().insert(vehicle);
    handle
}

/// Joins and streams in a remote player, returning its ped.
pub fn spawn_remote(session: &mut TestSession, id: PlayerId, position: Vec3) -> anyhow::Result<PedHandle> {
    session.deliver(SyncMsg::PlayerJoin {
        player: id,
        name: format!("remote-{}", id.0),
        colour: 0xFFFF_FFFF,
    });
    session.deliver(SyncMsg::PlayerStreamIn {
        player: id,
        position,
        health: 200,
    });
    session
        .players()
        .get(id)
        .and_then(|p| p.ped())
        .ok_or_else(|| anyhow::anyhow!("remote {id:?} did not spawn"))
}

pub fn local_ped(session: &TestSession) -> anyhow::Result<PedHandle> {
    session
        .local_player()
        .ped()
        .ok_or_else(|| anyhow::anyhow!("no local ped"))
}

/// Advances the clock by one tick and pulses.
pub fn pulse(session: &mut TestSession) {
    session.clock().advance(TICK_MS);
    session.pulse();
}

/// Holds `buttons` on the local pad for one pulse.
pub fn pulse_with(session: &mut TestSession, buttons: Buttons) {
    session.backend_mut().local_pad = ControlState::with_buttons(buttons);
    pulse(session);
}

/// Finishes the ped's current primary task.
pub fn finish_primary(session: &mut TestSession, ped: PedHandle) {
    session
        .backend_mut()
        .complete_task(ped, TaskPriority::Primary);
}

/// Drops the ped's current primary task without its outcome.
pub fn interrupt_primary(session: &mut TestSession, ped: PedHandle) {
    session
        .backend_mut()
        .interrupt_task(ped, TaskPriority::Primary);
}

/// Drained outgoing messages minus the per-tick sync packets.
pub fn events(session: &mut TestSession) -> Vec<OutgoingRpc> {
    session
        .drain_outbox()
        .into_iter()
        .filter(|rpc| !matches!(rpc.msg, SyncMsg::OnFootSync(_) | SyncMsg::InVehicleSync(_)))
        .collect()
}
