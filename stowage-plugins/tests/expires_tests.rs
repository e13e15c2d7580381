use std::rc::Rc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use stowage_expiry::{drive, CheckInterval};
use stowage_plugins::{expires_plugin, ExpiresOptions};
use stowage_store::{MemoryBackend, Storage, StorageBackend, StorageOptions};
use stowage_types::{Clock, Key, ManualClock, SystemClock, Value};

fn v(json: &str) -> Value {
    Value::from(serde_json::from_str::<serde_json::Value>(json).unwrap())
}

struct Fixture {
    clock: Rc<ManualClock>,
    backend: Rc<MemoryBackend>,
    handle: stowage_plugins::ExpiresHandle,
    store: Storage,
}

fn fixture(interval: CheckInterval, multiplier: u64) -> Fixture {
    let clock = Rc::new(ManualClock::new(0));
    let backend = Rc::new(MemoryBackend::new());
    let (handle, plugin) = expires_plugin(ExpiresOptions {
        interval,
        multiplier,
        clock: clock.clone(),
    });
    let store = StorageOptions::new()
        .backend(Rc::clone(&backend))
        .clock(clock.clone())
        .plugin(plugin)
        .open();
    Fixture {
        clock,
        backend,
        handle,
        store,
    }
}

fn lazy_fixture() -> Fixture {
    fixture(CheckInterval::Lazy, 1_000)
}

// ── Lazy expiry ──────────────────────────────────────────────────────────

#[test]
fn annotated_write_carries_the_deadline() {
    let f = lazy_fixture();
    f.handle.with_expires(2, || f.store.set("token", "abc")).unwrap();

    assert_eq!(
        f.backend.get("token").as_deref(),
        Some(r#"{"__s_meta":{"expires":2000},"value":"abc"}"#)
    );
    // Reads see the inner value, not the envelope.
    assert_eq!(f.store.get("token").unwrap(), Value::from("abc"));
}

#[test]
fn an_expired_field_reads_as_undefined_and_loses_its_backing_entry() {
    let f = lazy_fixture();
    f.handle.with_expires(2, || f.store.set("token", "abc")).unwrap();

    f.clock.set(1_999);
    assert_eq!(f.store.get("token").unwrap(), Value::from("abc"));

    f.clock.set(2_000);
    assert_eq!(f.store.get("token").unwrap(), Value::Undefined);
    assert_eq!(f.backend.get("token"), None);
    assert!(f.handle.scheduler().is_empty());
}

#[test]
fn with_expires_at_takes_an_absolute_deadline() {
    let f = lazy_fixture();
    f.clock.set(400);
    f.handle
        .with_expires_at(500, || f.store.set("token", 1))
        .unwrap();

    f.clock.set(501);
    assert_eq!(f.store.get("token").unwrap(), Value::Undefined);
}

#[test]
fn default_multiplier_is_one_day() {
    let clock = Rc::new(ManualClock::new(0));
    let (handle, plugin) = expires_plugin(ExpiresOptions {
        clock: clock.clone(),
        ..ExpiresOptions::default()
    });
    let backend = Rc::new(MemoryBackend::new());
    let store = StorageOptions::new()
        .backend(Rc::clone(&backend))
        .clock(clock)
        .plugin(plugin)
        .open();

    handle.with_expires(1, || store.set("k", 1)).unwrap();
    assert_eq!(
        backend.get("k").as_deref(),
        Some(r#"{"__s_meta":{"expires":86400000},"value":1}"#)
    );
}

#[test]
fn nested_scopes_use_the_innermost_deadline() {
    let f = lazy_fixture();
    f.handle
        .with_expires_at(9_000, || {
            f.handle.with_expires_at(500, || f.store.set("inner", 1)).unwrap();
            f.store.set("outer", 2)
        })
        .unwrap();

    f.clock.set(501);
    assert_eq!(f.store.get("inner").unwrap(), Value::Undefined);
    assert_eq!(f.store.get("outer").unwrap(), Value::from(2));
}

// ── Supersession and cancellation ────────────────────────────────────────

#[test]
fn a_plain_overwrite_supersedes_the_deadline() {
    let f = lazy_fixture();
    f.handle.with_expires(1, || f.store.set("token", "old")).unwrap();
    f.store.set("token", "new").unwrap();

    assert!(f.handle.scheduler().is_empty());
    assert_eq!(f.backend.get("token").as_deref(), Some(r#""new""#));

    f.clock.set(10_000);
    assert_eq!(f.store.get("token").unwrap(), Value::from("new"));
}

#[test]
fn an_annotated_overwrite_replaces_the_deadline() {
    let f = lazy_fixture();
    f.handle.with_expires(1, || f.store.set("token", "a")).unwrap();
    f.handle.with_expires(60, || f.store.set("token", "b")).unwrap();

    f.clock.set(2_000);
    assert_eq!(f.store.get("token").unwrap(), Value::from("b"));
    f.clock.set(60_000);
    assert_eq!(f.store.get("token").unwrap(), Value::Undefined);
}

#[test]
fn explicit_deletion_cancels_tracking() {
    let f = lazy_fixture();
    f.handle.with_expires(1, || f.store.set("token", 1)).unwrap();

    assert!(f.store.delete("token").unwrap());
    assert!(f.handle.scheduler().is_empty());
    assert_eq!(f.backend.get("token"), None);
}

// ── Nested fields ────────────────────────────────────────────────────────

#[test]
fn a_nested_field_expires_without_touching_its_siblings() {
    let f = lazy_fixture();
    f.store.set("doc", v(r#"{"keep":true}"#)).unwrap();
    let doc = f.store.child("doc").unwrap().unwrap();

    f.handle
        .with_expires(1, || doc.set(&Key::from("token"), Value::from("abc")))
        .unwrap();

    f.clock.set(1_000);
    assert_eq!(doc.get(&Key::from("token")).unwrap(), Value::Undefined);
    assert_eq!(doc.get(&Key::from("keep")).unwrap(), Value::from(true));
    assert_eq!(f.backend.get("doc").as_deref(), Some(r#"{"keep":true}"#));
}

#[test]
fn a_field_inside_an_annotated_parent_is_reaped_on_access() {
    let f = lazy_fixture();
    f.handle.with_expires(100, || f.store.set("doc", v("{}"))).unwrap();
    let doc = f.store.child("doc").unwrap().unwrap();
    f.handle
        .with_expires(1, || doc.set(&Key::from("token"), Value::from("abc")))
        .unwrap();

    f.clock.set(1_000);
    assert_eq!(doc.get(&Key::from("token")).unwrap(), Value::Undefined);
    // The parent envelope survives with the expired field cut out of it.
    assert_eq!(
        f.backend.get("doc").as_deref(),
        Some(r#"{"__s_meta":{"expires":100000},"value":{}}"#)
    );
}

#[test]
fn reload_drops_entries_for_the_replaced_subtree() {
    let f = lazy_fixture();
    f.store.set("doc", v("{}")).unwrap();
    let doc = f.store.child("doc").unwrap().unwrap();
    f.handle
        .with_expires(1, || doc.set(&Key::from("token"), Value::from(1)))
        .unwrap();
    assert_eq!(f.handle.scheduler().len(), 1);

    f.store.reload("doc").unwrap();
    assert!(f.handle.scheduler().is_empty());
}

// ── Proactive mode ───────────────────────────────────────────────────────

#[test]
fn run_due_reaps_without_an_access() {
    let f = fixture(CheckInterval::Every(Duration::from_millis(100)), 1_000);
    f.handle.with_expires(1, || f.store.set("token", 1)).unwrap();

    f.clock.set(1_000);
    assert_eq!(f.handle.scheduler().run_due(), 1);
    assert_eq!(f.backend.get("token"), None);
}

#[test]
fn run_due_reaps_inside_an_annotated_parent() {
    let f = fixture(CheckInterval::Every(Duration::from_millis(100)), 1_000);
    f.handle.with_expires(100, || f.store.set("doc", v("{}"))).unwrap();
    let doc = f.store.child("doc").unwrap().unwrap();
    f.handle
        .with_expires(1, || doc.set(&Key::from("token"), Value::from(1)))
        .unwrap();

    f.clock.set(1_000);
    assert_eq!(f.handle.scheduler().run_due(), 1);
    assert_eq!(
        f.backend.get("doc").as_deref(),
        Some(r#"{"__s_meta":{"expires":100000},"value":{}}"#)
    );
}

#[test]
fn reading_a_cold_loaded_deadline_puts_it_under_the_timer() {
    let f = fixture(CheckInterval::Every(Duration::from_millis(100)), 1_000);
    f.backend
        .set("token", r#"{"__s_meta":{"expires":5000},"value":1}"#)
        .unwrap();

    assert_eq!(f.store.get("token").unwrap(), Value::from(1));
    assert_eq!(f.handle.scheduler().len(), 1);

    f.clock.set(5_000);
    assert_eq!(f.handle.scheduler().run_due(), 1);
    assert_eq!(f.backend.get("token"), None);
}

#[tokio::test]
async fn the_driver_reaps_through_the_store() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let backend = Rc::new(MemoryBackend::new());
            let (handle, plugin) = expires_plugin(ExpiresOptions {
                interval: CheckInterval::Every(Duration::from_millis(5)),
                ..ExpiresOptions::default()
            });
            let store = StorageOptions::new()
                .backend(Rc::clone(&backend))
                .plugin(plugin)
                .open();

            let deadline = SystemClock.now_millis() + 20;
            handle
                .with_expires_at(deadline, || store.set("token", 1))
                .unwrap();
            assert!(backend.get("token").is_some());

            tokio::task::spawn_local(drive(Rc::downgrade(handle.scheduler())));
            tokio::time::sleep(Duration::from_millis(100)).await;

            assert_eq!(backend.get("token"), None);
        })
        .await;
}
