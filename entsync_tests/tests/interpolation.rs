//! Remote player position smoothing.

use entsync_shared::{
    config::SyncConfig,
    control::ControlState,
    math::Vec3,
    net::{InVehicleSync, OnFootSync, PlayerId, SyncMsg},
};
use entsync_tests::{add_vehicle, events, local_ped, pulse, session, session_with, spawn_remote, NETWORK_CAR, REMOTE};

fn on_foot(player: PlayerId, position: Vec3) -> SyncMsg {
    SyncMsg::OnFootSync(OnFootSync {
        player,
        position,
        heading: 0.0,
        move_speed: Vec3::ZERO,
        health: 200,
        armour: 0,
        weapon: 0,
        control: ControlState::default(),
    })
}

fn remote_position(session: &entsync_tests::TestSession, ped: entsync_client::backend::PedHandle) -> Vec3 {
    session.backend().ped(ped).map_or(Vec3::ZERO, |p| p.position)
}

#[test]
fn remote_converges_on_synced_position() -> anyhow::Result<()> {
    let mut session = session()?;
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    let target = Vec3::new(2.0, -1.0, 0.5);
    session.deliver(on_foot(REMOTE, target));
    assert!(session.players().get(REMOTE).unwrap().has_target_position());

    for _ in 0..10 {
        pulse(&mut session);
    }

    assert!(remote_position(&session, ped).distance(target) < 1e-3);
    assert!(!session.players().get(REMOTE).unwrap().has_target_position());
    Ok(())
}

#[test]
fn position_moves_gradually_inside_the_window() -> anyhow::Result<()> {
    let mut session = session()?;
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    session.deliver(on_foot(REMOTE, Vec3::new(3.0, 0.0, 0.0)));
    pulse(&mut session);

    let x = remote_position(&session, ped).x;
    assert!(x > 0.0 && x < 3.0, "x = {x}");
    Ok(())
}

#[test]
fn far_target_snaps_immediately() -> anyhow::Result<()> {
    let mut session = session()?;
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    let target = Vec3::new(100.0, 0.0, 0.0);
    session.deliver(on_foot(REMOTE, target));

    assert_eq!(remote_position(&session, ped), target);
    assert!(!session.players().get(REMOTE).unwrap().has_target_position());
    Ok(())
}

#[test]
fn drift_past_threshold_snaps_mid_window() -> anyhow::Result<()> {
    let mut session = session()?;
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    let target = Vec3::new(3.0, 0.0, 0.0);
    session.deliver(on_foot(REMOTE, target));

    // Local physics flings the ped away before the next pulse.
    session.backend_mut().ped_mut(ped).unwrap().position = Vec3::new(20.0, 0.0, 0.0);
    pulse(&mut session);

    assert_eq!(remote_position(&session, ped), target);
    assert!(!session.players().get(REMOTE).unwrap().has_target_position());
    Ok(())
}

#[test]
fn zero_delay_lands_on_first_pulse() -> anyhow::Result<()> {
    let mut session = session_with(SyncConfig {
        interp_delay_ms: 0,
        ..SyncConfig::default()
    })?;
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    let target = Vec3::new(1.0, 1.0, 0.0);
    session.deliver(on_foot(REMOTE, target));
    pulse(&mut session);

    assert!(remote_position(&session, ped).distance(target) < 1e-5);
    Ok(())
}

#[test]
fn local_player_never_interpolates() -> anyhow::Result<()> {
    let mut session = session()?;
    let ped = local_ped(&session)?;

    session.with_context(|players, ctx| {
        players
            .local_mut()
            .set_target_position(ctx, Vec3::new(2.0, 0.0, 0.0), 100);
    });
    for _ in 0..10 {
        pulse(&mut session);
    }

    assert_eq!(remote_position(&session, ped), Vec3::ZERO);
    assert!(!session.local_player().has_target_position());
    Ok(())
}

#[test]
fn new_target_mid_window_keeps_progress_made_so_far() -> anyhow::Result<()> {
    let mut session = session()?;
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    session.deliver(on_foot(REMOTE, Vec3::new(4.0, 0.0, 0.0)));
    session.clock().advance(SyncConfig::default().interp_delay_ms / 2);

    let second = Vec3::new(4.0, 2.0, 0.0);
    session.deliver(on_foot(REMOTE, second));

    let midway = remote_position(&session, ped);
    assert!(midway.distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-3, "midway = {midway:?}");

    let remote = session.players().get(REMOTE).unwrap();
    assert!(remote.has_target_position());
    assert_eq!(remote.interpolation().target(), second);
    assert!(remote.interpolation().error().distance(second - midway) < 1e-5);

    for _ in 0..10 {
        pulse(&mut session);
    }
    assert!(remote_position(&session, ped).distance(second) < 1e-3);
    Ok(())
}

#[test]
fn seated_remote_follows_the_vehicle() -> anyhow::Result<()> {
    let mut session = session()?;
    let car_position = Vec3::new(4.0, 4.0, 0.0);
    add_vehicle(&mut session, NETWORK_CAR, car_position, true);
    spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    session.deliver(on_foot(REMOTE, Vec3::new(1.0, 0.0, 0.0)));
    session.deliver(SyncMsg::InVehicleSync(InVehicleSync {
        player: REMOTE,
        vehicle: NETWORK_CAR,
        seat: 0,
        health: 200,
        armour: 0,
        control: ControlState::default(),
    }));
    pulse(&mut session);

    let (position, armed) = session.with_context(|players, ctx| {
        let remote = players.get(REMOTE).unwrap();
        (remote.position(ctx), remote.has_target_position())
    });
    assert_eq!(position, car_position);
    assert!(!armed);
    let sent = events(&mut session);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].msg,
        SyncMsg::VehicleEntryComplete {
            player: REMOTE,
            vehicle: NETWORK_CAR,
            seat: 0,
        }
    );
    Ok(())
}
