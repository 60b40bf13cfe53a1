use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::services::session::SessionHandle;
use crate::state::test_helpers;

fn inbound(kind: MessageType, content: &str, target: Option<&str>) -> ChatMessage {
    ChatMessage {
        id: None,
        kind,
        sender: String::new(),
        target: target.map(Into::into),
        content: content.into(),
        timestamp: 0,
    }
}

fn connect(state: &AppState, user_id: &str) -> SessionHandle {
    let notice = ChatMessage::system(&state.ids, "superseded");
    state.sessions.register(user_id, notice)
}

fn drain_room(rx: &mut broadcast::Receiver<ChatMessage>) -> Vec<ChatMessage> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(msg) => out.push(msg),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return out,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

#[test]
fn chat_before_joining_a_room_pushes_an_error() {
    let state = test_helpers::test_app_state();
    let alice = connect(&state, "alice");

    let outcome = dispatch(&state, "alice", inbound(MessageType::Chat, "hi", None));
    assert!(matches!(outcome, RouterOutcome::None));

    let error = alice.outbound.try_recv().expect("error should be queued");
    assert_eq!(error.kind, MessageType::System);
    assert_eq!(error.content, "You must join a room first");
}

#[test]
fn join_room_confirms_and_registers_membership() {
    let state = test_helpers::test_app_state();
    let alice = connect(&state, "alice");

    let outcome = dispatch(&state, "alice", inbound(MessageType::JoinRoom, "general", None));
    match outcome {
        RouterOutcome::Joined { room_id, .. } => assert_eq!(room_id, "general"),
        RouterOutcome::None => panic!("expected a join outcome"),
    }

    assert_eq!(state.rooms.current_room("alice").as_deref(), Some("general"));
    let confirmation = alice.outbound.try_recv().expect("confirmation should be queued");
    assert_eq!(confirmation.kind, MessageType::System);
    assert_eq!(confirmation.content, "You joined room: general");
}

#[test]
fn chat_after_joining_broadcasts_a_stamped_frame() {
    let state = test_helpers::test_app_state();
    let _alice = connect(&state, "alice");

    let mut room_rx = match dispatch(&state, "alice", inbound(MessageType::JoinRoom, "general", None)) {
        RouterOutcome::Joined { receiver, .. } => receiver,
        RouterOutcome::None => panic!("expected a join outcome"),
    };
    drain_room(&mut room_rx);

    dispatch(&state, "alice", inbound(MessageType::Chat, "hello room", None));

    let frames = drain_room(&mut room_rx);
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.kind, MessageType::Chat);
    assert_eq!(frame.sender, "alice");
    assert_eq!(frame.content, "hello room");
    assert!(frame.id.is_some());
    assert!(frame.timestamp > 0);
}

#[test]
fn outbound_ids_are_monotonic_per_session() {
    let state = test_helpers::test_app_state();
    let alice = connect(&state, "alice");

    dispatch(&state, "alice", inbound(MessageType::JoinRoom, "general", None));
    dispatch(&state, "alice", inbound(MessageType::Private, "psst", Some("nobody")));

    let mut last = 0;
    while let Some(frame) = alice.outbound.try_recv() {
        let id = frame.id.expect("every outbound frame carries an id");
        assert!(id > last, "ids must be strictly increasing");
        last = id;
    }
    assert!(last > 0);
}

#[test]
fn private_to_unknown_target_reports_not_found() {
    let state = test_helpers::test_app_state();
    let alice = connect(&state, "alice");

    dispatch(&state, "alice", inbound(MessageType::Private, "psst", Some("carol")));

    let error = alice.outbound.try_recv().expect("error should be queued");
    assert_eq!(error.kind, MessageType::System);
    assert_eq!(error.content, "User carol not found");
}

#[test]
fn private_without_target_reports_not_found() {
    let state = test_helpers::test_app_state();
    let alice = connect(&state, "alice");

    dispatch(&state, "alice", inbound(MessageType::Private, "psst", None));

    let error = alice.outbound.try_recv().expect("error should be queued");
    assert_eq!(error.kind, MessageType::System);
    assert_eq!(error.content, "User null not found");
}

#[test]
fn private_delivers_to_target_and_confirms_to_sender() {
    let state = test_helpers::test_app_state();
    let alice = connect(&state, "alice");
    let bob = connect(&state, "bob");

    dispatch(&state, "alice", inbound(MessageType::Private, "psst", Some("bob")));

    let delivered = bob.outbound.try_recv().expect("bob should receive the message");
    assert_eq!(delivered.kind, MessageType::Private);
    assert_eq!(delivered.sender, "alice");
    assert_eq!(delivered.content, "psst");
    assert_eq!(delivered.target.as_deref(), Some("bob"));
    assert!(delivered.id.is_some());

    let confirmation = alice.outbound.try_recv().expect("alice should get a confirmation");
    assert_eq!(confirmation.kind, MessageType::System);
    assert_eq!(confirmation.content, "Private message sent to bob");
}

#[test]
fn server_only_types_from_clients_are_dropped_silently() {
    let state = test_helpers::test_app_state();
    let alice = connect(&state, "alice");

    dispatch(&state, "alice", inbound(MessageType::System, "fake", None));
    dispatch(&state, "alice", inbound(MessageType::Presence, "fake", None));

    assert!(alice.outbound.try_recv().is_none());
    assert_eq!(state.metrics.rejected_inbound_count(), 2);
}
