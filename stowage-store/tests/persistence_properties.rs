use std::rc::Rc;

use proptest::prelude::*;
use stowage_store::{MemoryBackend, StorageOptions};
use stowage_types::Value;

/// JSON-representable values with plain field names, arbitrary shape and
/// nesting.
fn json_value() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        "[a-z0-9 ]{0,12}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6).prop_map(|m| {
                serde_json::Value::Object(m.into_iter().collect())
            }),
        ]
    })
}

proptest! {
    /// Whatever shape goes in comes back deep-equal after a write and a
    /// cold re-read from the backend.
    #[test]
    fn write_then_reload_round_trips(json in json_value()) {
        let value = Value::from(json);
        let backend = Rc::new(MemoryBackend::new());
        let store = StorageOptions::new().backend(Rc::clone(&backend)).open();

        store.set("subject", value.deep_clone()).unwrap();
        store.reload("subject").unwrap();

        prop_assert_eq!(store.get("subject").unwrap(), value);
    }

    /// A second store over the same backend reads what the first wrote.
    #[test]
    fn cold_start_sees_persisted_state(json in json_value()) {
        let value = Value::from(json);
        let backend = Rc::new(MemoryBackend::new());

        let writer = StorageOptions::new().backend(Rc::clone(&backend)).open();
        writer.set("subject", value.deep_clone()).unwrap();
        drop(writer);

        let reader = StorageOptions::new().backend(backend).open();
        prop_assert_eq!(reader.get("subject").unwrap(), value);
    }
}
