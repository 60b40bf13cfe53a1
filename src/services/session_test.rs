use std::time::Duration;

use super::*;
use crate::ids::IdGen;
use crate::message::MessageType;

fn table(capacity: usize) -> SessionTable {
    SessionTable::new(capacity, Arc::new(Metrics::new()))
}

fn chat(ids: &IdGen, content: &str) -> ChatMessage {
    ChatMessage::system(ids, content)
}

#[test]
fn push_to_absent_user_is_a_no_op() {
    let ids = IdGen::new();
    let sessions = table(4);
    assert!(!sessions.push_to_user("ghost", chat(&ids, "hello")));
}

#[test]
fn outbound_preserves_fifo_order() {
    let ids = IdGen::new();
    let sessions = table(8);
    let handle = sessions.register("alice", chat(&ids, "superseded"));

    sessions.push_to_user("alice", chat(&ids, "one"));
    sessions.push_to_user("alice", chat(&ids, "two"));
    sessions.push_to_user("alice", chat(&ids, "three"));

    assert_eq!(handle.outbound.len(), 3);
    assert_eq!(handle.outbound.try_recv().unwrap().content, "one");
    assert_eq!(handle.outbound.try_recv().unwrap().content, "two");
    assert_eq!(handle.outbound.try_recv().unwrap().content, "three");
    assert!(handle.outbound.try_recv().is_none());
}

#[test]
fn overflow_drops_the_oldest_frame_and_counts_it() {
    let ids = IdGen::new();
    let metrics = Arc::new(Metrics::new());
    let sessions = SessionTable::new(2, Arc::clone(&metrics));
    let handle = sessions.register("alice", chat(&ids, "superseded"));

    sessions.push_to_user("alice", chat(&ids, "one"));
    sessions.push_to_user("alice", chat(&ids, "two"));
    sessions.push_to_user("alice", chat(&ids, "three"));

    // Drop-oldest: the queue never grows past capacity.
    assert_eq!(metrics.session_drop_count(), 1);
    assert_eq!(handle.outbound.len(), 2);
    assert_eq!(handle.outbound.try_recv().unwrap().content, "two");
    assert_eq!(handle.outbound.try_recv().unwrap().content, "three");
    assert!(handle.outbound.try_recv().is_none());
    assert!(handle.outbound.is_empty());
}

#[tokio::test]
async fn recv_wakes_on_push() {
    let ids = IdGen::new();
    let sessions = table(4);
    let handle = sessions.register("alice", chat(&ids, "superseded"));
    let outbound = Arc::clone(&handle.outbound);

    let waiter = tokio::spawn(async move { outbound.recv().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    sessions.push_to_user("alice", chat(&ids, "wake up"));

    let received = tokio::time::timeout(Duration::from_millis(500), waiter)
        .await
        .expect("recv should wake")
        .unwrap();
    assert_eq!(received.content, "wake up");
}

#[tokio::test]
async fn duplicate_connect_supersedes_older_session() {
    let ids = IdGen::new();
    let sessions = table(4);
    let old = sessions.register("alice", chat(&ids, "unused"));
    let new = sessions.register("alice", chat(&ids, "signed in elsewhere"));

    // The older session got the notice and the evict signal.
    let notice = old.outbound.try_recv().expect("old session should get the notice");
    assert_eq!(notice.kind, MessageType::System);
    assert_eq!(notice.content, "signed in elsewhere");
    tokio::time::timeout(Duration::from_millis(500), old.evict.notified())
        .await
        .expect("evict should be signalled");

    // Delivery now reaches the new session only.
    sessions.push_to_user("alice", chat(&ids, "fresh"));
    assert!(old.outbound.try_recv().is_none());
    assert_eq!(new.outbound.try_recv().unwrap().content, "fresh");
    assert_eq!(sessions.connected_count(), 1);
}

#[test]
fn remove_is_guarded_by_connection_id() {
    let ids = IdGen::new();
    let sessions = table(4);
    let old = sessions.register("alice", chat(&ids, "unused"));
    let new = sessions.register("alice", chat(&ids, "unused"));

    // The superseded gateway's cleanup must not remove the live session.
    assert!(!sessions.remove("alice", old.connection_id));
    assert!(sessions.contains("alice"));

    assert!(sessions.remove("alice", new.connection_id));
    assert!(!sessions.contains("alice"));
}

#[test]
fn push_to_all_reaches_every_session() {
    let ids = IdGen::new();
    let sessions = table(4);
    let alice = sessions.register("alice", chat(&ids, "unused"));
    let bob = sessions.register("bob", chat(&ids, "unused"));

    sessions.push_to_all(&chat(&ids, "server shutting down"));

    assert_eq!(alice.outbound.try_recv().unwrap().content, "server shutting down");
    assert_eq!(bob.outbound.try_recv().unwrap().content, "server shutting down");
}
