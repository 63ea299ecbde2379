//! Vehicle entry and exit scenarios.

use entsync_client::{
    backend::{PedBackend, PedTask, TaskPriority},
    ExitVehicleMode, VehicleSyncState,
};
use entsync_shared::{
    control::Buttons,
    math::Vec3,
    net::{Priority, Reliability, SyncMsg},
};
use entsync_tests::{
    add_vehicle, events, finish_primary, interrupt_primary, local_ped, pulse, pulse_with, session, spawn_remote,
    TestSession, LOCAL, LOCAL_CAR, NETWORK_CAR, REMOTE,
};

fn local_state(session: &TestSession) -> VehicleSyncState {
    session.local_player().vehicle_state()
}

fn occupied_seats(session: &TestSession, id: entsync_shared::net::VehicleId) -> usize {
    session.vehicles().get(id).map_or(0, |v| v.occupied_seats())
}

#[test]
fn local_enters_non_network_vehicle_directly() -> anyhow::Result<()> {
    let mut session = session()?;
    let car = add_vehicle(&mut session, LOCAL_CAR, Vec3::new(2.0, 0.0, 0.0), false);
    let ped = local_ped(&session)?;

    let started = session.with_context(|p, ctx| p.local_mut().enter_vehicle(ctx, LOCAL_CAR, 0));
    assert!(started);
    assert!(session.local_player().is_in_vehicle());
    assert_eq!(session.vehicles().get(LOCAL_CAR).unwrap().driver(), Some(LOCAL));
    assert_eq!(local_state(&session), VehicleSyncState::EnteringLocal);
    assert!(events(&mut session).is_empty());

    finish_primary(&mut session, ped);
    pulse(&mut session);

    assert_eq!(local_state(&session), VehicleSyncState::InVehicle(0));
    assert!(session.backend().vehicle(car).unwrap().damageable);
    assert!(events(&mut session).is_empty());
    Ok(())
}

#[test]
fn second_entry_while_entering_is_ignored() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, LOCAL_CAR, Vec3::new(2.0, 0.0, 0.0), false);
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(-2.0, 0.0, 0.0), true);

    assert!(session.with_context(|p, ctx| p.local_mut().enter_vehicle(ctx, LOCAL_CAR, 0)));
    assert!(!session.with_context(|p, ctx| p.local_mut().enter_vehicle(ctx, LOCAL_CAR, 1)));
    assert!(!session.with_context(|p, ctx| p.local_mut().enter_vehicle(ctx, NETWORK_CAR, 0)));

    assert_eq!(occupied_seats(&session, LOCAL_CAR), 1);
    assert_eq!(occupied_seats(&session, NETWORK_CAR), 0);

    let t = *session.local_player().transition();
    assert!(t.entering && !t.exiting && !t.requesting);
    Ok(())
}

#[test]
fn local_enters_network_vehicle_after_grant() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = local_ped(&session)?;

    assert!(session.with_context(|p, ctx| p.local_mut().enter_vehicle(ctx, NETWORK_CAR, 0)));
    assert_eq!(local_state(&session), VehicleSyncState::EnteringNetworkPending);
    assert!(!session.local_player().is_in_vehicle());
    assert_eq!(occupied_seats(&session, NETWORK_CAR), 0);

    let sent = events(&mut session);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].msg,
        SyncMsg::VehicleEntryRequest {
            player: LOCAL,
            vehicle: NETWORK_CAR,
            seat: 0,
        }
    );
    assert_eq!(sent[0].reliability, Reliability::Reliable);
    assert_eq!(sent[0].priority, Priority::High);

    // Still waiting: nothing new goes out.
    pulse(&mut session);
    pulse(&mut session);
    assert!(events(&mut session).is_empty());
    assert_eq!(local_state(&session), VehicleSyncState::EnteringNetworkPending);

    session.deliver(SyncMsg::VehicleEntryReply {
        player: LOCAL,
        vehicle: NETWORK_CAR,
        seat: 0,
        granted: true,
    });
    assert_eq!(local_state(&session), VehicleSyncState::EnteringLocal);

    finish_primary(&mut session, ped);
    pulse(&mut session);

    assert_eq!(local_state(&session), VehicleSyncState::InVehicle(0));
    assert_eq!(session.vehicles().get(NETWORK_CAR).unwrap().driver(), Some(LOCAL));
    assert_eq!(session.local_player().transition().pending_vehicle, None);
    let sent = events(&mut session);
    assert_eq!(
        sent.iter().map(|r| r.msg.clone()).collect::<Vec<_>>(),
        vec![SyncMsg::VehicleEntryComplete {
            player: LOCAL,
            vehicle: NETWORK_CAR,
            seat: 0,
        }]
    );
    Ok(())
}

#[test]
fn denied_entry_returns_to_foot() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = local_ped(&session)?;

    session.with_context(|p, ctx| p.local_mut().enter_vehicle(ctx, NETWORK_CAR, 0));
    session.deliver(SyncMsg::VehicleEntryReply {
        player: LOCAL,
        vehicle: NETWORK_CAR,
        seat: 0,
        granted: false,
    });

    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);
    assert_eq!(session.backend().task(ped, TaskPriority::Primary), None);
    assert_eq!(occupied_seats(&session, NETWORK_CAR), 0);
    Ok(())
}

#[test]
fn interrupted_local_entry_is_cancelled() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = local_ped(&session)?;

    session.with_context(|p, ctx| p.local_mut().enter_vehicle(ctx, NETWORK_CAR, 2));
    session.deliver(SyncMsg::VehicleEntryReply {
        player: LOCAL,
        vehicle: NETWORK_CAR,
        seat: 2,
        granted: true,
    });
    events(&mut session);

    interrupt_primary(&mut session, ped);
    pulse(&mut session);

    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);
    let sent = events(&mut session);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].msg,
        SyncMsg::VehicleEntryCancelled {
            player: LOCAL,
            vehicle: NETWORK_CAR,
            seat: 2,
        }
    );
    Ok(())
}

#[test]
fn interrupted_remote_entry_is_retried() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    session.deliver(SyncMsg::VehicleEntryRequest {
        player: REMOTE,
        vehicle: NETWORK_CAR,
        seat: 1,
    });
    let first = session.backend().task(ped, TaskPriority::Primary);
    assert!(matches!(first, Some(PedTask::GetInVehicle { door: 2, .. })));

    interrupt_primary(&mut session, ped);
    pulse(&mut session);

    assert_eq!(session.backend().task(ped, TaskPriority::Primary), first);
    let remote = session.players().get(REMOTE).unwrap();
    assert_eq!(remote.vehicle_state(), VehicleSyncState::EnteringLocal);
    assert!(events(&mut session).is_empty());

    finish_primary(&mut session, ped);
    pulse(&mut session);

    let remote = session.players().get(REMOTE).unwrap();
    assert_eq!(remote.vehicle_state(), VehicleSyncState::InVehicle(1));
    assert_eq!(session.vehicles().get(NETWORK_CAR).unwrap().occupant(1), Some(REMOTE));
    let sent = events(&mut session);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].msg,
        SyncMsg::VehicleEntryComplete {
            player: REMOTE,
            vehicle: NETWORK_CAR,
            seat: 1,
        }
    );
    Ok(())
}

#[test]
fn host_cancellation_stops_remote_retry() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;

    session.deliver(SyncMsg::VehicleEntryRequest {
        player: REMOTE,
        vehicle: NETWORK_CAR,
        seat: 0,
    });
    session.deliver(SyncMsg::VehicleEntryCancelled {
        player: REMOTE,
        vehicle: NETWORK_CAR,
        seat: 0,
    });

    assert_eq!(session.backend().task(ped, TaskPriority::Primary), None);
    pulse(&mut session);
    assert_eq!(session.backend().task(ped, TaskPriority::Primary), None);
    assert_eq!(
        session.players().get(REMOTE).unwrap().vehicle_state(),
        VehicleSyncState::OnFoot
    );
    Ok(())
}

#[test]
fn local_exit_round_trips_through_host() -> anyhow::Result<()> {
    let mut session = session()?;
    let car = add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = local_ped(&session)?;

    session.with_context(|p, ctx| p.local_mut().put_in_vehicle(ctx, NETWORK_CAR, 0));
    events(&mut session);
    assert!(session.backend().vehicle(car).unwrap().damageable);

    pulse_with(&mut session, Buttons::ENTER_EXIT_VEHICLE);
    assert_eq!(local_state(&session), VehicleSyncState::ExitingNetworkPending);
    let sent = events(&mut session);
    assert_eq!(
        sent.iter().map(|r| r.msg.clone()).collect::<Vec<_>>(),
        vec![SyncMsg::VehicleExitRequest {
            player: LOCAL,
            vehicle: NETWORK_CAR,
        }]
    );

    session.deliver(SyncMsg::VehicleExitReply {
        player: LOCAL,
        vehicle: NETWORK_CAR,
        granted: true,
    });
    assert_eq!(local_state(&session), VehicleSyncState::ExitingLocal);
    let mode = session.backend().task(ped, TaskPriority::Primary);
    assert!(matches!(mode, Some(PedTask::ExitVehicle { mode: 0xF, .. })));

    pulse_with(&mut session, Buttons::empty());
    assert_eq!(local_state(&session), VehicleSyncState::ExitingLocal);

    finish_primary(&mut session, ped);
    pulse(&mut session);

    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);
    assert_eq!(occupied_seats(&session, NETWORK_CAR), 0);
    assert!(!session.backend().vehicle(car).unwrap().damageable);
    let sent = events(&mut session);
    assert_eq!(
        sent.iter().map(|r| r.msg.clone()).collect::<Vec<_>>(),
        vec![SyncMsg::VehicleExitComplete {
            player: LOCAL,
            vehicle: NETWORK_CAR,
        }]
    );
    Ok(())
}

#[test]
fn second_exit_request_is_rejected() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    session.with_context(|p, ctx| p.local_mut().put_in_vehicle(ctx, NETWORK_CAR, 0));
    events(&mut session);

    assert!(session.with_context(|p, ctx| p.local_mut().exit_vehicle(ctx, ExitVehicleMode::Normal)));
    assert!(!session.with_context(|p, ctx| p.local_mut().exit_vehicle(ctx, ExitVehicleMode::Normal)));
    assert_eq!(events(&mut session).len(), 1);
    Ok(())
}

#[test]
fn fast_exit_dives_out() -> anyhow::Result<()> {
    let mut session = session()?;
    let car = add_vehicle(&mut session, LOCAL_CAR, Vec3::new(2.0, 0.0, 0.0), false);
    let ped = local_ped(&session)?;
    session.with_context(|p, ctx| p.local_mut().put_in_vehicle(ctx, LOCAL_CAR, 0));

    session.backend_mut().vehicle_mut(car).unwrap().move_speed = Vec3::new(0.0, -15.0, 0.0);
    assert!(session.with_context(|p, ctx| p.local_mut().exit_vehicle(ctx, ExitVehicleMode::Normal)));

    let task = session.backend().task(ped, TaskPriority::Primary);
    assert!(matches!(task, Some(PedTask::ExitVehicle { mode: 0x100E, .. })));
    Ok(())
}

#[test]
fn jacked_exit_skips_the_host() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = local_ped(&session)?;
    session.with_context(|p, ctx| p.local_mut().put_in_vehicle(ctx, NETWORK_CAR, 0));
    events(&mut session);

    assert!(session.with_context(|p, ctx| p.local_mut().exit_vehicle(ctx, ExitVehicleMode::Jacked)));
    assert_eq!(local_state(&session), VehicleSyncState::ExitingLocal);
    let task = session.backend().task(ped, TaskPriority::Primary);
    assert!(matches!(task, Some(PedTask::ExitVehicle { mode: 0x9C4, .. })));
    assert!(events(&mut session).is_empty());
    Ok(())
}

#[test]
fn ejection_is_reported_as_forceful_exit() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = local_ped(&session)?;
    session.with_context(|p, ctx| p.local_mut().put_in_vehicle(ctx, NETWORK_CAR, 0));
    events(&mut session);

    session.backend_mut().eject(ped);
    pulse(&mut session);

    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);
    assert_eq!(occupied_seats(&session, NETWORK_CAR), 0);
    let sent = events(&mut session);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].msg,
        SyncMsg::VehicleExitForceful {
            player: LOCAL,
            vehicle: NETWORK_CAR,
        }
    );
    Ok(())
}

#[test]
fn remote_ejection_is_reported_too() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = spawn_remote(&mut session, REMOTE, Vec3::ZERO)?;
    session.with_context(|p, ctx| {
        if let Some(remote) = p.remote_mut(REMOTE) {
            remote.put_in_vehicle(ctx, NETWORK_CAR, 2);
        }
    });
    events(&mut session);

    session.backend_mut().eject(ped);
    pulse(&mut session);

    assert_eq!(
        session.players().get(REMOTE).unwrap().vehicle_state(),
        VehicleSyncState::OnFoot
    );
    assert_eq!(occupied_seats(&session, NETWORK_CAR), 0);
    let sent = events(&mut session);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].msg,
        SyncMsg::VehicleExitForceful {
            player: REMOTE,
            vehicle: NETWORK_CAR,
        }
    );
    assert_eq!(sent[0].reliability, Reliability::Reliable);
    Ok(())
}

#[test]
fn stray_entry_task_is_cleared() -> anyhow::Result<()> {
    let mut session = session()?;
    let car = add_vehicle(&mut session, LOCAL_CAR, Vec3::new(2.0, 0.0, 0.0), false);
    let ped = local_ped(&session)?;

    session.backend_mut().set_task(
        ped,
        TaskPriority::Primary,
        PedTask::GetInVehicle {
            vehicle: car,
            door: -7,
            timer: 27,
            flags: 0,
            blend: -2.0,
        },
    );
    pulse(&mut session);

    assert_eq!(session.backend().task(ped, TaskPriority::Primary), None);
    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);
    Ok(())
}

#[test]
fn exit_while_entering_aborts_the_entry() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, LOCAL_CAR, Vec3::new(2.0, 0.0, 0.0), false);
    let ped = local_ped(&session)?;

    session.with_context(|p, ctx| p.local_mut().enter_vehicle(ctx, LOCAL_CAR, 0));
    assert!(session.with_context(|p, ctx| p.local_mut().exit_vehicle(ctx, ExitVehicleMode::Normal)));

    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);
    assert_eq!(occupied_seats(&session, LOCAL_CAR), 0);
    assert_eq!(session.backend().task(ped, TaskPriority::Primary), None);
    Ok(())
}

#[test]
fn enter_key_release_picks_the_nearest_vehicle() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, LOCAL_CAR, Vec3::new(3.0, 0.0, 0.0), false);
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(5.5, 0.0, 0.0), true);

    pulse_with(&mut session, Buttons::ENTER_EXIT_VEHICLE);
    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);

    pulse_with(&mut session, Buttons::empty());
    assert_eq!(local_state(&session), VehicleSyncState::EnteringLocal);
    assert_eq!(session.local_player().vehicle_id(), Some(LOCAL_CAR));
    assert_eq!(session.local_player().vehicle_seat(), 0);
    Ok(())
}

#[test]
fn horn_release_takes_a_passenger_seat() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, NETWORK_CAR, Vec3::new(3.0, 0.0, 0.0), true);

    pulse_with(&mut session, Buttons::HORN);
    pulse_with(&mut session, Buttons::empty());

    let sent = events(&mut session);
    assert_eq!(
        sent.iter().map(|r| r.msg.clone()).collect::<Vec<_>>(),
        vec![SyncMsg::VehicleEntryRequest {
            player: LOCAL,
            vehicle: NETWORK_CAR,
            seat: 1,
        }]
    );
    Ok(())
}

#[test]
fn disabled_controls_ignore_the_enter_key() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, LOCAL_CAR, Vec3::new(3.0, 0.0, 0.0), false);
    session.set_controls_disabled(true);

    pulse_with(&mut session, Buttons::ENTER_EXIT_VEHICLE);
    pulse_with(&mut session, Buttons::empty());
    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);
    Ok(())
}

#[test]
fn vehicles_out_of_reach_are_ignored() -> anyhow::Result<()> {
    let mut session = session()?;
    add_vehicle(&mut session, LOCAL_CAR, Vec3::new(30.0, 0.0, 0.0), false);

    pulse_with(&mut session, Buttons::ENTER_EXIT_VEHICLE);
    pulse_with(&mut session, Buttons::empty());
    assert_eq!(local_state(&session), VehicleSyncState::OnFoot);
    Ok(())
}

#[test]
fn wrecked_vehicle_death_is_reported_once() -> anyhow::Result<()> {
    let mut session = session()?;
    let car = add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = local_ped(&session)?;
    session.with_context(|p, ctx| p.local_mut().put_in_vehicle(ctx, NETWORK_CAR, 0));
    session.backend_mut().vehicle_mut(car).unwrap().health = -100;

    session.with_context(|p, ctx| p.local_mut().exit_vehicle(ctx, ExitVehicleMode::Jacked));
    assert!(session.local_player().is_watching_vehicle_death());

    finish_primary(&mut session, ped);
    pulse(&mut session);
    events(&mut session);
    assert!(session.local_player().is_watching_vehicle_death());

    session.backend_mut().vehicle_mut(car).unwrap().dead = true;
    pulse(&mut session);
    pulse(&mut session);

    let deaths: Vec<_> = events(&mut session)
        .into_iter()
        .filter(|r| matches!(r.msg, SyncMsg::VehicleDeath { .. }))
        .collect();
    assert_eq!(deaths.len(), 1);
    assert_eq!(deaths[0].msg, SyncMsg::VehicleDeath { vehicle: NETWORK_CAR });
    assert_eq!(deaths[0].reliability, Reliability::UnreliableSequenced);
    assert!(!session.local_player().is_watching_vehicle_death());
    Ok(())
}

#[test]
fn death_check_drops_when_someone_else_drives() -> anyhow::Result<()> {
    let mut session = session()?;
    let car = add_vehicle(&mut session, NETWORK_CAR, Vec3::new(2.0, 0.0, 0.0), true);
    let ped = local_ped(&session)?;
    spawn_remote(&mut session, REMOTE, Vec3::new(1.0, 1.0, 0.0))?;
    session.with_context(|p, ctx| p.local_mut().put_in_vehicle(ctx, NETWORK_CAR, 0));
    session.backend_mut().vehicle_mut(car).unwrap().petrol_tank_health = -1.0;

    session.with_context(|p, ctx| p.local_mut().exit_vehicle(ctx, ExitVehicleMode::Jacked));
    finish_primary(&mut session, ped);
    pulse(&mut session);

    session.with_context(|p, ctx| {
        if let Some(remote) = p.remote_mut(REMOTE) {
            remote.put_in_vehicle(ctx, NETWORK_CAR, 0);
        }
    });
    session.backend_mut().vehicle_mut(car).unwrap().dead = true;
    pulse(&mut session);

    assert!(!session.local_player().is_watching_vehicle_death());
    assert!(events(&mut session)
        .iter()
        .all(|r| !matches!(r.msg, SyncMsg::VehicleDeath { .. })));
    Ok(())
}
