//! Integration tests for the remote command worker

mod common;

use common::{wait_until, Call, RecordingGateway};
use robot_companion::domain::types::{FaceMood, InteractionState, Person, PersonId};
use robot_companion::infra::{Config, Metrics};
use robot_companion::services::gateway::Motion;
use robot_companion::services::{create_remote_worker, Coordinator, RemoteCommand};
use std::sync::Arc;

fn setup(persons: Vec<Person>) -> (Arc<RecordingGateway>, Arc<Coordinator>, Arc<Metrics>) {
    let gateway = Arc::new(RecordingGateway::new(persons));
    let metrics = Arc::new(Metrics::new());
    let config = Config::default().with_poll_interval_ms(5);
    let coordinator = Arc::new(Coordinator::new(config, gateway.clone(), metrics.clone()));
    (gateway, coordinator, metrics)
}

#[tokio::test]
async fn test_worker_applies_parsed_commands() {
    let (gateway, coordinator, metrics) = setup(Vec::new());
    let (cmd_tx, worker) = create_remote_worker(coordinator.clone(), metrics.clone(), 16);
    let handle = tokio::spawn(worker.run());

    for payload in [
        "forward",
        "head_down",
        r#"{"event":"go_to","message":"lab"}"#,
        r#"{"event":"mood","message":"sad"}"#,
        "video_call",
        "places",
    ] {
        cmd_tx.send(RemoteCommand::parse(payload).unwrap()).await.unwrap();
    }
    drop(cmd_tx);
    handle.await.unwrap();

    assert_eq!(
        gateway.calls(),
        vec![
            Call::Motion(Motion::GoForward { speed: 0.3, distance_m: 1.0 }),
            Call::Motion(Motion::MoveHead { horizontal: 50, vertical: 10 }),
            Call::Navigate("lab".to_string()),
            Call::RequestPlaces,
        ]
    );
    assert_eq!(coordinator.mood(), FaceMood::Sad);
    assert_eq!(metrics.report().remote_commands, 6);
}

#[tokio::test]
async fn test_worker_speaks_in_background() {
    let (gateway, coordinator, metrics) = setup(Vec::new());
    let (cmd_tx, worker) = create_remote_worker(coordinator.clone(), metrics, 16);
    tokio::spawn(worker.run());

    cmd_tx.send(RemoteCommand::Speak("welcome".to_string())).await.unwrap();
    cmd_tx.send(RemoteCommand::Motion(robot_companion::domain::types::MotionCommand::Stop))
        .await
        .unwrap();

    assert!(wait_until(|| gateway.count(&Call::PlayText("welcome".to_string())) == 1).await);
    assert!(wait_until(|| gateway.count(&Call::Motion(Motion::StopMove)) == 1).await);
    assert!(wait_until(|| coordinator.interaction_state() == InteractionState::Idle).await);
}

#[tokio::test]
async fn test_worker_track_and_stop() {
    let (gateway, coordinator, metrics) = setup(vec![Person::new(4, true)]);
    let (cmd_tx, worker) = create_remote_worker(coordinator.clone(), metrics, 16);
    tokio::spawn(worker.run());

    cmd_tx.send(RemoteCommand::Track).await.unwrap();
    assert!(wait_until(|| gateway.count(&Call::StartFollow(PersonId(4))) > 0).await);
    assert!(coordinator.is_tracking());

    cmd_tx.send(RemoteCommand::StopTracking).await.unwrap();
    assert!(wait_until(|| !coordinator.is_tracking()).await);
    assert!(gateway.count(&Call::StopFollow) >= 1);
}
