mod common;

use std::{sync::Arc, time::Duration};

use quizroom_back::{
    error::ServiceError,
    services::{quiz_service, room_service},
    state::room::RoomStatus,
};
use serde_json::json;
use tokio::time::sleep;

use common::*;

#[tokio::test(start_paused = true)]
async fn joins_fill_the_room_and_reject_beyond_capacity() {
    let bridge = Arc::new(RecordingBridge::default());
    let state = state_with(FixedSource { correct_options: vec![0] }, bridge);
    let mut host = TestClient::connect();
    let room_id = create_room(&state, &mut host, 3, 1, "host");

    for (expected, id) in [(2, "p2"), (3, "p3")] {
        let mut client = TestClient::connect();
        client.send(&state, "joinRoom", join_payload(&room_id, id));
        assert_eq!(state.registry().snapshot(&room_id).unwrap().len(), expected);
    }

    let mut late = TestClient::connect();
    late.send(&state, "joinRoom", join_payload(&room_id, "p4"));
    let events = late.drain();
    assert_eq!(
        events,
        vec![json!({ "event": "roomError", "data": { "message": "Room is full" } })]
    );
    assert_eq!(state.registry().snapshot(&room_id).unwrap().len(), 3);
    assert_eq!(state.gateway().connection_count(&room_id), 3);
}

#[tokio::test(start_paused = true)]
async fn joining_an_unknown_room_reports_not_found() {
    let state = state_with(FailingSource, Arc::new(RecordingBridge::default()));
    let mut client = TestClient::connect();
    client.send(&state, "joinRoom", join_payload("NOPE42", "p1"));
    let events = client.drain();
    assert_eq!(events[0]["event"], json!("roomError"));
    assert_eq!(events[0]["data"]["message"], json!("Room not found"));
    assert!(state.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn update_players_snapshot_lists_participants_in_join_order() {
    let state = state_with(FailingSource, Arc::new(RecordingBridge::default()));
    let mut host = TestClient::connect();
    let room_id = create_room(&state, &mut host, 4, 2, "host");
    let mut guest = TestClient::connect();
    guest.send(&state, "joinRoom", join_payload(&room_id, "guest"));

    let events = host.drain();
    let snapshot = &find(&events, "updatePlayers").unwrap()["data"];
    assert_eq!(snapshot["id"], json!(room_id));
    assert_eq!(snapshot["status"], json!("WAITING"));
    assert_eq!(snapshot["hostId"], json!("host"));
    assert_eq!(snapshot["currentParticipants"], json!(2));
    assert_eq!(snapshot["maxParticipants"], json!(4));
    assert_eq!(
        snapshot["participants"],
        json!([
            { "id": "host", "username": "HOST" },
            { "id": "guest", "username": "GUEST" },
        ])
    );
}

#[tokio::test(start_paused = true)]
async fn rejoining_reattaches_the_connection() {
    let state = state_with(FailingSource, Arc::new(RecordingBridge::default()));
    let mut host = TestClient::connect();
    let room_id = create_room(&state, &mut host, 4, 1, "host");

    let mut second_tab = TestClient::connect();
    second_tab.send(&state, "joinRoom", join_payload(&room_id, "host"));
    let names = second_tab.drain_names();
    assert!(names.contains(&"roomId".to_string()));
    assert!(!names.contains(&"roomError".to_string()));
    assert_eq!(state.registry().snapshot(&room_id).unwrap().len(), 1);
    assert_eq!(state.gateway().connection_count(&room_id), 2);

    // Closing one tab keeps the participant seated.
    host.disconnect(&state);
    assert!(state.registry().snapshot(&room_id).unwrap().contains("host"));
    second_tab.disconnect(&state);
    assert!(!state.registry().contains(&room_id));
}

#[tokio::test(start_paused = true)]
async fn only_the_host_can_start_early() {
    let state = state_with(FixedSource { correct_options: vec![0] }, Arc::new(RecordingBridge::default()));
    let mut host = TestClient::connect();
    let room_id = create_room(&state, &mut host, 4, 1, "host");
    let mut guest = TestClient::connect();
    guest.send(&state, "joinRoom", join_payload(&room_id, "guest"));
    guest.drain();

    guest.send(&state, "startQuiz", json!({ "roomId": room_id, "participantId": "guest" }));
    let events = guest.drain();
    assert_eq!(events[0]["event"], json!("roomError"));
    assert_eq!(
        state.registry().snapshot(&room_id).unwrap().status,
        RoomStatus::Waiting
    );

    host.send(&state, "startQuiz", json!({ "roomId": room_id, "participantId": "host" }));
    assert!(guest.drain_names().contains(&"gameStart".to_string()));
    assert_eq!(
        state.registry().snapshot(&room_id).unwrap().status,
        RoomStatus::Active
    );

    // A second start is rejected.
    assert!(matches!(
        room_service::start_room(&state, &room_id, None),
        Err(ServiceError::InvalidState(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn late_joiner_receives_remaining_time_and_same_questions() {
    let state = state_with(
        FixedSource { correct_options: vec![1, 2, 3] },
        Arc::new(RecordingBridge::default()),
    );
    let mut host = TestClient::connect();
    let room_id = create_room(&state, &mut host, 4, 3, "host");
    room_service::start_room(&state, &room_id, None).unwrap();

    sleep(Duration::from_millis(3_000 + 10_400)).await;
    let host_events = host.drain();
    let shared_questions = find(&host_events, "quizStart").unwrap()["data"]["questions"].clone();

    let mut late = TestClient::connect();
    late.send(&state, "joinRoom", join_payload(&room_id, "late"));
    let events = late.drain();
    let resync = find(&events, "quizStart").expect("resync on join");
    assert_eq!(resync["data"]["questions"], shared_questions);
    assert_eq!(resync["data"]["currentQuestionIndex"], json!(0));
    assert_eq!(resync["data"]["timeLeft"], json!(20));

    sleep(Duration::from_secs(5)).await;
    late.drain();
    late.send(&state, "requestQuizQuestions", json!({ "roomId": room_id }));
    let events = late.drain();
    let resync = find(&events, "quizStart").expect("explicit resync");
    let time_left = resync["data"]["timeLeft"].as_u64().unwrap();
    assert_eq!(time_left, 15);
    assert_eq!(resync["data"]["questions"], shared_questions);
}

#[tokio::test(start_paused = true)]
async fn everyone_leaving_before_start_deletes_the_room() {
    let bridge = Arc::new(RecordingBridge::default());
    let state = state_with(FailingSource, bridge.clone());
    let mut host = TestClient::connect();
    let room_id = create_room(&state, &mut host, 3, 1, "host");
    let mut guest = TestClient::connect();
    guest.send(&state, "joinRoom", join_payload(&room_id, "guest"));

    guest.disconnect(&state);
    let events = host.drain();
    let last_players = all(&events, "updatePlayers").pop().unwrap().clone();
    assert_eq!(last_players["currentParticipants"], json!(1));

    host.disconnect(&state);
    assert!(!state.registry().contains(&room_id));
    assert_eq!(state.gateway().connection_count(&room_id), 0);
    assert!(room_service::room_snapshot(&state, &room_id).is_err());
    assert!(bridge.calls().contains(&BridgeCall::Forget(room_id.clone())));
}

#[tokio::test(start_paused = true)]
async fn room_deleted_mid_question_fires_no_more_timers() {
    let state = state_with(FixedSource { correct_options: vec![0, 0] }, Arc::new(RecordingBridge::default()));
    let mut alice = TestClient::connect();
    let mut bob = TestClient::connect();
    let room_id = create_room(&state, &mut alice, 2, 2, "alice");
    bob.send(&state, "joinRoom", join_payload(&room_id, "bob"));
    sleep(Duration::from_millis(4_200)).await;

    let mut observer = TestClient::connect();
    state
        .gateway()
        .join_group(&room_id, observer.session.connection(), "observer");

    alice.disconnect(&state);
    bob.disconnect(&state);
    assert!(!state.registry().contains(&room_id));
    observer.drain();

    sleep(Duration::from_secs(60)).await;
    assert!(observer.drain().is_empty());
    assert!(quiz_service::resync_event(&state, &room_id).is_err());
}

#[tokio::test(start_paused = true)]
async fn departure_reevaluates_the_fast_path() {
    let state = state_with(FixedSource { correct_options: vec![0, 0] }, Arc::new(RecordingBridge::default()));
    let mut alice = TestClient::connect();
    let mut bob = TestClient::connect();
    let room_id = create_room(&state, &mut alice, 3, 2, "alice");
    bob.send(&state, "joinRoom", join_payload(&room_id, "bob"));
    room_service::start_room(&state, &room_id, Some("alice")).unwrap();
    sleep(Duration::from_millis(3_100)).await;
    alice.drain();

    alice.send(&state, "submitAnswer", answer_payload(&room_id, 0, 0, "alice"));
    assert!(find(&alice.drain(), "questionResults").is_none());

    bob.disconnect(&state);
    let events = alice.drain();
    let results = find(&events, "questionResults").expect("settled once bob left");
    let rows = results["data"]["participantAnswers"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["participantId"], json!("alice"));
}

#[tokio::test(start_paused = true)]
async fn persistence_failures_never_block_the_quiz() {
    let bridge = Arc::new(RecordingBridge::failing());
    let state = state_with(FixedSource { correct_options: vec![0] }, bridge.clone());
    let mut solo = TestClient::connect();
    let room_id = create_room(&state, &mut solo, 1, 1, "solo");

    sleep(Duration::from_millis(3_100)).await;
    solo.send(&state, "submitAnswer", answer_payload(&room_id, 0, 0, "solo"));
    sleep(Duration::from_millis(5_100)).await;
    let events = solo.drain();
    assert!(find(&events, "quizResults").is_some());

    // Three attempts, one second apart.
    sleep(Duration::from_secs(3)).await;
    let attempts = bridge
        .calls()
        .into_iter()
        .filter(|call| matches!(call, BridgeCall::FinalResults(..)))
        .count();
    assert_eq!(attempts, 3);
    assert_eq!(bridge.calls().last(), Some(&BridgeCall::Forget(room_id)));
}

#[tokio::test(start_paused = true)]
async fn one_connection_cannot_seat_two_participants_in_a_room() {
    let state = state_with(FailingSource, Arc::new(RecordingBridge::default()));
    let mut host = TestClient::connect();
    let room_id = create_room(&state, &mut host, 4, 1, "host");
    let mut tab = TestClient::connect();
    tab.send(&state, "joinRoom", join_payload(&room_id, "p2"));
    tab.drain();

    tab.send(&state, "joinRoom", join_payload(&room_id, "p3"));
    let events = tab.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], json!("roomError"));
    let room = state.registry().snapshot(&room_id).unwrap();
    assert_eq!(room.len(), 2);
    assert!(!room.contains("p3"));
    assert_eq!(state.gateway().connection_count(&room_id), 2);

    // Rejoining as the bound participant is still a re-attach.
    tab.send(&state, "joinRoom", join_payload(&room_id, "p2"));
    assert!(!tab.drain_names().contains(&"roomError".to_string()));

    tab.disconnect(&state);
    host.disconnect(&state);
    assert!(!state.registry().contains(&room_id));
}
