//! Demo driver.
//!
//! Runs a session against the headless backend with a loopback host that
//! grants every request and walks remote players around. The local player
//! follows a short input script: walk up to a car, get in, get out.

use std::time::Duration;

use anyhow::Context;
use entsync_shared::{
    config::SyncConfig,
    control::{Buttons, ControlState},
    math::Vec3,
    net::{encode_to_bytes, OnFootSync, OutgoingRpc, PlayerId, SyncMsg, VehicleId},
    time::MonotonicClock,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::{client::ClientSession, headless::HeadlessBackend, registry::NetworkVehicle};

pub const LOCAL_PLAYER: PlayerId = PlayerId(0);
pub const DEMO_VEHICLE: VehicleId = VehicleId(1);

#[derive(Debug, Clone, Copy)]
pub struct DemoOptions {
    pub ticks: u32,
    pub remotes: u16,
    pub seed: u64,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            ticks: 300,
            remotes: 3,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DemoReport {
    pub ticks: u32,
    pub messages_sent: usize,
    pub bytes_sent: usize,
    pub entries_completed: usize,
    pub exits_completed: usize,
    pub remotes_spawned: usize,
}

/// Stands in for the host: answers requests and relays remote movement.
pub struct LoopbackHost {
    rng: StdRng,
    remotes: Vec<(PlayerId, Vec3)>,
}

impl LoopbackHost {
    pub fn new(seed: u64, remotes: u16) -> Self {
        let remotes = (1..=remotes)
            .map(|i| (PlayerId(i), Vec3::new(10.0 + f32::from(i) * 3.0, 10.0, 0.0)))
            .collect();
        Self {
            rng: StdRng::seed_from_u64(seed),
            remotes,
        }
    }

    /// Join and stream-in for every remote player.
    pub fn join_messages(&self) -> Vec<SyncMsg> {
        self.remotes
            .iter()
            .flat_map(|(id, position)| {
                [
                    SyncMsg::PlayerJoin {
                        player: *id,
                        name: format!("peer-{}", id.0),
                        colour: 0x3366_CCFF,
                    },
                    SyncMsg::PlayerStreamIn {
                        player: *id,
                        position: *position,
                        health: 200,
                    },
                ]
            })
            .collect()
    }

    /// The host's answer to a client request, if it needs one.
    pub fn answer(&mut self, rpc: &OutgoingRpc) -> Option<SyncMsg> {
        match rpc.msg {
            SyncMsg::VehicleEntryRequest { player, vehicle, seat } => Some(SyncMsg::VehicleEntryReply {
                player,
                vehicle,
                seat,
                granted: true,
            }),
            SyncMsg::VehicleExitRequest { player, vehicle } => Some(SyncMsg::VehicleExitReply {
                player,
                vehicle,
                granted: true,
            }),
            _ => None,
        }
    }

    /// One on-foot update per remote, each nudged by a little noise.
    pub fn remote_syncs(&mut self) -> Vec<SyncMsg> {
        let mut out = Vec::with_capacity(self.remotes.len());
        for (id, position) in &mut self.remotes {
            let step = Vec3::new(self.rng.gen_range(-0.5..0.5), self.rng.gen_range(-0.5..0.5), 0.0);
            *position += step;
            out.push(SyncMsg::OnFootSync(OnFootSync {
                player: *id,
                position: *position,
                heading: step.y.atan2(step.x),
                move_speed: step,
                health: 200,
                armour: 0,
                weapon: 0,
                control: ControlState::default(),
            }));
        }
        out
    }
}

/// Local input for a tick: tap enter/exit to get in, then again halfway.
fn scripted_pad(tick: u32, ticks: u32) -> ControlState {
    let exit_tick = ticks / 2;
    if tick == 2 || tick == exit_tick {
        ControlState::with_buttons(Buttons::ENTER_EXIT_VEHICLE)
    } else {
        ControlState::default()
    }
}

pub async fn run(config: SyncConfig, opts: DemoOptions) -> anyhow::Result<DemoReport> {
    let mut backend = HeadlessBackend::new();
    let car = backend.spawn_vehicle(Vec3::new(2.0, 0.0, 0.0));

    let tick = Duration::from_millis(config.tick_ms());
    let mut session = ClientSession::new(config, backend, MonotonicClock::new(), LOCAL_PLAYER)
        .context("start session")?;

    let mut vehicle = NetworkVehicle::new(DEMO_VEHICLE, 20, 3, true);
    vehicle.handle = Some(car);
    session.vehicles_mut().insert(vehicle);

    let mut host = LoopbackHost::new(opts.seed, opts.remotes);
    for msg in host.join_messages() {
        session.deliver(msg);
    }

    let mut report = DemoReport::default();
    let mut interval = tokio::time::interval(tick);

    for t in 0..opts.ticks {
        interval.tick().await;

        session.backend_mut().local_pad = scripted_pad(t, opts.ticks);
        session.backend_mut().step();
        session.pulse();

        for rpc in session.drain_outbox() {
            let bytes = encode_to_bytes(&rpc).context("encode rpc")?;
            report.messages_sent += 1;
            report.bytes_sent += bytes.len();

            match rpc.msg {
                SyncMsg::VehicleEntryComplete { .. } => report.entries_completed += 1,
                SyncMsg::VehicleExitComplete { .. } => report.exits_completed += 1,
                _ => {}
            }

            if let Some(reply) = host.answer(&rpc) {
                debug!(tick = t, reply = ?reply, "Host reply");
                session.deliver(reply);
            }
        }

        if t % 3 == 0 {
            for msg in host.remote_syncs() {
                session.deliver(msg);
            }
        }

        if t % 64 == 0 {
            info!(
                tick = t,
                state = ?session.local_player().vehicle_state(),
                sent = report.messages_sent,
                "Demo tick"
            );
        }
        report.ticks += 1;
    }

    for line in session.status() {
        debug!("{line}");
    }

    report.remotes_spawned = session
        .players()
        .remotes()
        .filter(|p| p.is_spawned())
        .count();

    info!(
        ticks = report.ticks,
        messages = report.messages_sent,
        bytes = report.bytes_sent,
        entries = report.entries_completed,
        exits = report.exits_completed,
        "Demo finished"
    );
    Ok(report)
}
