//! Integration tests for pairs of synchronized sets.

use std::sync::Arc;
use syncset_core::{
    EventKind, NullTransport, QueuedTransport, SyncPayload, SyncSetError, SyncSetOptions,
    SyncedSet, Value, WriteOutcome,
};
use syncset_testkit::prelude::*;

/// Set A picks `b` and reduces over `a`; set B picks `a` and reduces over `b`.
fn crossed_pair() -> MirroredPair<Foo, Value, Value> {
    init_tracing();
    mirrored_pair(foo_options(["b"], "a"), foo_options(["a"], "b")).unwrap()
}

#[test]
fn crossed_pick_lists_end_to_end() {
    let pair = crossed_pair();
    let (a, b) = (&pair.left, &pair.right);

    let foo = a.insert(Foo::new()).unwrap();
    assert!(a.has(&foo));
    assert!(b.has(&foo));

    let remote = b.get(&foo.read().key()).unwrap();
    assert!(!remote.ptr_eq(&foo));
    assert_eq!(remote.read().a, 123);

    // A reduces over `a`, so the write travels; B picks `a`, so it lands.
    assert_eq!(a.set_field(&foo, "a", 456).unwrap(), WriteOutcome::Propagated);
    assert_eq!(remote.read().a, 456);

    // A ignores `b` in its projection: nothing is sent.
    assert_eq!(a.set_field(&foo, "b", true).unwrap(), WriteOutcome::Suppressed);
    assert!(!remote.read().b);
    a.set_field(&foo, "b", false).unwrap();

    // B reduces over `b` and A picks `b`.
    assert_eq!(b.set_field(&remote, "b", true).unwrap(), WriteOutcome::Propagated);
    assert!(foo.read().b);

    // B ignores `a` in its projection.
    assert_eq!(b.set_field(&remote, "a", 789).unwrap(), WriteOutcome::Suppressed);
    assert_eq!(foo.read().a, 456);

    let second = b.insert(Foo::new()).unwrap();
    assert!(a.has(&second));
    assert_eq!(a.len(), 2);

    a.delete(&second).unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);

    b.delete(&remote).unwrap();
    assert!(a.is_empty());
    assert!(b.is_empty());
    assert!(pair.is_settled());
}

#[test]
fn membership_is_mirrored_both_ways() {
    let pair = crossed_pair();

    let x = pair.left.insert(Foo::with_id("x")).unwrap();
    let y = pair.right.insert(Foo::with_id("y")).unwrap();
    pair.left.insert(Foo::with_id("z")).unwrap();
    pair.assert_membership_mirrored();
    assert_eq!(pair.left.len(), 3);

    pair.right.delete(&x).unwrap();
    pair.left.delete(&y).unwrap();
    pair.assert_membership_mirrored();
    assert_eq!(pair.right.ids(), vec![Value::from("z")]);
}

#[test]
fn remote_additions_are_not_echoed() {
    let pair = crossed_pair();
    pair.left.insert(Foo::new()).unwrap();
    pair.left.insert(Foo::new()).unwrap();

    let left = pair.left.stats();
    let right = pair.right.stats();
    assert_eq!(left.flushes_started, 2);
    assert_eq!(left.batches_received, 0);
    assert_eq!(right.flushes_started, 0);
    assert_eq!(right.batches_received, 2);
}

#[test]
fn ping_pong_settles_when_both_sides_project_the_same_field() {
    init_tracing();
    let pair = mirrored_pair(foo_options(["a"], "a"), foo_options(["a"], "a")).unwrap();
    let foo = pair.left.insert(Foo::with_id("pp")).unwrap();
    let remote = pair.right.get(&Value::from("pp")).unwrap();

    pair.left.set_field(&foo, "a", 1).unwrap();

    // The right side re-announces once; the left side sees no change.
    assert_eq!(remote.read().a, 1);
    assert_eq!(pair.right.stats().writes_propagated, 1);
    assert_eq!(pair.left.stats().writes_suppressed, 1);
    assert!(pair.is_settled());
}

#[test]
fn duplicate_add_is_rejected_on_both_paths() {
    let pair = crossed_pair();
    pair.left.insert(Foo::with_id("dup")).unwrap();

    let local = pair.left.insert(Foo::with_id("dup"));
    assert!(matches!(local, Err(SyncSetError::DuplicateIdentity { .. })));

    // The right side already holds "dup" from the mirror.
    let mirrored = pair.right.insert(Foo::with_id("dup"));
    assert!(matches!(mirrored, Err(SyncSetError::DuplicateIdentity { .. })));
    assert_eq!(pair.left.len(), 1);
}

#[test]
fn remote_delete_of_missing_identity_is_a_no_op() {
    let pair = crossed_pair();
    let foo = pair.left.insert(Foo::with_id("gone")).unwrap();
    pair.right.delete_by_id(&Value::from("gone"));

    pair.left.delete(&foo).unwrap();
    assert!(pair.right.is_empty());

    let second = pair.left.delete(&foo);
    assert!(matches!(second, Err(SyncSetError::IdentityNotFound { .. })));
}

#[test]
fn notifications_on_each_side() {
    let pair = crossed_pair();
    let left_log = EventLog::attach(&pair.left);
    let right_log = EventLog::attach(&pair.right);

    let foo = pair.left.insert(Foo::with_id("ev")).unwrap();
    pair.left.set_field(&foo, "a", 1).unwrap();
    pair.left.delete(&foo).unwrap();

    assert_eq!(
        left_log.kinds(),
        vec![EventKind::Add, EventKind::Update, EventKind::Delete]
    );
    // The remote update did not move B's projection, and remote deletes are
    // applied silently.
    assert_eq!(right_log.kinds(), vec![EventKind::Add]);
}

#[test]
fn writes_to_stale_handles_do_not_travel() {
    let pair = crossed_pair();
    let foo = pair.left.insert(Foo::with_id("stale")).unwrap();
    pair.left.delete(&foo).unwrap();
    let started = pair.left.stats().flushes_started;

    assert_eq!(pair.left.set_field(&foo, "a", 1).unwrap(), WriteOutcome::Untracked);
    assert_eq!(foo.read().a, 1);
    assert_eq!(pair.left.stats().flushes_started, started);
}

#[test]
fn deferred_acknowledgement() {
    init_tracing();
    let transport = Arc::new(QueuedTransport::<Foo>::new());
    let sender = SyncedSet::with_transport(foo_options(["b"], "a"), transport.clone()).unwrap();
    let receiver = SyncedSet::new(foo_options(["a"], "b")).unwrap();

    let foo = sender.insert(Foo::with_id("q")).unwrap();
    sender.set_field(&foo, "a", 7).unwrap();
    assert_eq!(sender.in_flight().len(), 2);
    assert!(sender.pending().is_empty());
    assert!(!sender.is_clean());
    assert!(receiver.is_empty());

    assert_eq!(transport.deliver_all(&receiver).unwrap(), 2);
    assert!(sender.is_clean());
    assert_eq!(receiver.get(&Value::from("q")).unwrap().read().a, 7);
}

#[test]
fn changes_survive_a_disconnect() {
    let pair = crossed_pair();
    pair.left.disconnect();

    let foo = pair.left.insert(Foo::with_id("offline")).unwrap();
    pair.left.set_field(&foo, "a", 5).unwrap();
    assert!(pair.right.is_empty());
    assert_eq!(pair.left.pending().total(), 2);

    pair.left
        .connect(Arc::new(syncset_core::LoopbackTransport::new(&pair.right)));
    pair.left.send().unwrap();

    let remote = pair.right.get(&Value::from("offline")).unwrap();
    assert_eq!(remote.read().a, 5);
    assert!(pair.is_settled());
}

#[test]
fn cbor_loopback_matches_direct_loopback() {
    init_tracing();
    let pair = mirrored_pair_over_cbor(foo_options(["b"], "a"), foo_options(["a"], "b")).unwrap();

    let foo = pair.left.insert(Foo::with_id("wire")).unwrap();
    pair.left.set_field(&foo, "a", 456).unwrap();
    let remote = pair.right.get(&Value::from("wire")).unwrap();
    assert_eq!(remote.read().a, 456);

    pair.right.set_field(&remote, "b", true).unwrap();
    assert!(foo.read().b);

    pair.right.delete(&remote).unwrap();
    assert!(pair.left.is_empty());
    assert!(pair.is_settled());
}

#[test]
fn payload_from_the_wire() {
    let set = SyncedSet::with_transport(foo_options(["a", "b"], "a"), Arc::new(NullTransport::new()))
        .unwrap();
    set.add(Foo::with_id("keep"), true).unwrap();
    set.add(Foo::with_id("drop"), true).unwrap();

    let mut changed = Foo::with_id("keep");
    changed.b = true;
    let payload = SyncPayload {
        added: vec![Foo::with_id("new")],
        updated: vec![changed],
        deleted: vec![Value::from("drop")],
    };
    let bytes = payload.encode().unwrap();
    set.receive(SyncPayload::decode(&bytes).unwrap()).unwrap();

    assert_eq!(set.ids(), vec![Value::from("keep"), Value::from("new")]);
    assert!(set.get(&Value::from("keep")).unwrap().read().b);
}

#[test]
fn task_schema_from_json() {
    init_tracing();
    let schema = r#"{ "id_key": "key", "pick": ["done", "priority"] }"#;
    let pair = mirrored_pair(task_options(schema).unwrap(), task_options(schema).unwrap()).unwrap();

    let task = pair.left.insert(Task::new(1, "write tests")).unwrap();
    let remote = pair.right.get(&Value::Integer(1)).unwrap();

    // Priority is outside the projection, so it only rides along later.
    assert_eq!(
        pair.left.set_field(&task, "priority", 5).unwrap(),
        WriteOutcome::Suppressed
    );
    assert_eq!(remote.read().priority, 0);

    // The title is projected but not picked: the write travels, the peer
    // takes the picked fields only.
    assert_eq!(
        pair.left.set_field(&task, "title", "write more tests").unwrap(),
        WriteOutcome::Propagated
    );
    assert_eq!(remote.read().priority, 5);
    assert_eq!(remote.read().title, "write tests");

    assert!(matches!(
        pair.left.set_field(&task, "key", 2),
        Err(SyncSetError::IdentityImmutable { .. })
    ));
}

#[test]
fn invalid_schema_is_rejected() {
    let options = task_options(r#"{ "id_key": "key", "pick": ["owner"] }"#).unwrap();
    assert!(matches!(
        SyncedSet::new(options),
        Err(SyncSetError::InvalidConfig(_))
    ));

    let options: SyncSetOptions<Task, (String, bool)> =
        task_options(r#"{ "id_key": "key", "pick": ["key"] }"#).unwrap();
    assert!(SyncedSet::new(options).is_err());
}
