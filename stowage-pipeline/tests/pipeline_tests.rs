use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use stowage_pipeline::{OpContext, Pipeline, Plugin, PluginDef, RootAccess};
use stowage_types::{Clock, Key, Path, SystemClock, Value};

struct NoopRoot;

impl RootAccess for NoopRoot {
    fn read_raw(&self, _owner: &Path, _key: &Key) -> Value {
        Value::Undefined
    }
    fn delete_at(&self, _owner: &Path, _key: &Key) -> bool {
        false
    }
    fn mark_dirty(&self, _root_key: &str) {}
}

fn with_cx<R>(f: impl FnOnce(&OpContext<'_>) -> R) -> R {
    let path = Path::new();
    let root: Rc<dyn RootAccess> = Rc::new(NoopRoot);
    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let cx = OpContext::new(&path, &root, &clock);
    f(&cx)
}

/// Records which hooks ran, in order, tagged with the plugin's label.
struct Recorder {
    label: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    fn def(label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> PluginDef {
        PluginDef::spec(Recorder {
            label,
            log: Rc::clone(log),
        })
    }

    fn record(&self, stage: &str) {
        self.log.borrow_mut().push(format!("{}:{}", self.label, stage));
    }
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        self.label
    }
    fn writer(&self, _h: &Value, _k: &Key, value: Value) -> anyhow::Result<Value> {
        self.record("writer");
        Ok(value)
    }
    fn reader(&self, _h: &Value, _k: &Key, value: Value) -> anyhow::Result<Value> {
        self.record("reader");
        Ok(value)
    }
    fn getter(&self, _cx: &OpContext<'_>, _t: &Value, _k: &Key, value: Value) -> anyhow::Result<Value> {
        self.record("getter");
        Ok(value)
    }
    fn setter(&self, _cx: &OpContext<'_>, _t: &Value, _k: &Key, value: Value) -> anyhow::Result<Value> {
        self.record("setter");
        Ok(value)
    }
    fn before_parse(&self, _cx: &OpContext<'_>) -> anyhow::Result<()> {
        self.record("before_parse");
        Ok(())
    }
    fn before_stringify(&self, _cx: &OpContext<'_>) -> anyhow::Result<()> {
        self.record("before_stringify");
        Ok(())
    }
}

fn two_recorders() -> (Pipeline, Rc<RefCell<Vec<String>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let pipeline = Pipeline::build(&[Recorder::def("A", &log), Recorder::def("B", &log)]);
    (pipeline, log)
}

// ── Chain ordering ───────────────────────────────────────────────

#[test]
fn writer_runs_in_declaration_order() {
    let (pipeline, log) = two_recorders();
    let holder = Value::object();
    pipeline.write(&holder, &Key::from("k"), Value::from(1)).unwrap();
    assert_eq!(*log.borrow(), vec!["A:writer", "B:writer"]);
}

#[test]
fn reader_runs_in_reverse_order() {
    let (pipeline, log) = two_recorders();
    let holder = Value::object();
    pipeline.read(&holder, &Key::from("k"), Value::from(1)).unwrap();
    assert_eq!(*log.borrow(), vec!["B:reader", "A:reader"]);
}

#[test]
fn setter_runs_in_declaration_order() {
    let (pipeline, log) = two_recorders();
    with_cx(|cx| {
        let target = Value::object();
        pipeline.set(cx, &target, &Key::from("k"), Value::from(1)).unwrap();
    });
    assert_eq!(*log.borrow(), vec!["A:setter", "B:setter"]);
}

#[test]
fn getter_runs_in_reverse_order() {
    let (pipeline, log) = two_recorders();
    with_cx(|cx| {
        let target = Value::object();
        pipeline.get(cx, &target, &Key::from("k"), Value::from(1)).unwrap();
    });
    assert_eq!(*log.borrow(), vec!["B:getter", "A:getter"]);
}

#[test]
fn lifecycle_hooks_follow_their_chain_order() {
    let (pipeline, log) = two_recorders();
    with_cx(|cx| {
        pipeline.before_stringify(cx);
        pipeline.before_parse(cx);
    });
    assert_eq!(
        *log.borrow(),
        vec!["A:before_stringify", "B:before_stringify", "B:before_parse", "A:before_parse"]
    );
}

// ── Identity & composition ───────────────────────────────────────

#[test]
fn empty_pipeline_is_identity() {
    let pipeline = Pipeline::build(&[]);
    let holder = Value::object();
    let v = Value::object_from([("a", Value::from(1))]);

    assert_eq!(pipeline.write(&holder, &Key::from("k"), v.clone()).unwrap(), v);
    assert_eq!(pipeline.read(&holder, &Key::from("k"), v.clone()).unwrap(), v);
    with_cx(|cx| {
        assert_eq!(pipeline.get(cx, &holder, &Key::from("k"), v.clone()).unwrap(), v);
        assert_eq!(pipeline.set(cx, &holder, &Key::from("k"), v.clone()).unwrap(), v);
        assert_eq!(pipeline.delete_property(cx, &holder, &Key::from("k")), None);
    });
}

/// Suffix/unsuffix plugins: write-then-read over a non-transforming value
/// is the identity, because the chains run in mirrored order.
struct Suffix(&'static str);

impl Plugin for Suffix {
    fn writer(&self, _h: &Value, _k: &Key, value: Value) -> anyhow::Result<Value> {
        Ok(Value::from(format!("{}{}", value.as_str().unwrap_or(""), self.0)))
    }
    fn reader(&self, _h: &Value, _k: &Key, value: Value) -> anyhow::Result<Value> {
        let s = value.as_str().unwrap_or("");
        Ok(Value::from(s.strip_suffix(self.0).unwrap_or(s)))
    }
}

#[test]
fn write_then_read_is_identity() {
    let pipeline = Pipeline::build(&[PluginDef::spec(Suffix("-a")), PluginDef::spec(Suffix("-b"))]);
    let holder = Value::object();
    let key = Key::from("k");

    let written = pipeline.write(&holder, &key, Value::from("x")).unwrap();
    assert_eq!(written, Value::from("x-a-b"));

    let back = pipeline.read(&holder, &key, written).unwrap();
    assert_eq!(back, Value::from("x"));
}

// ── Deletion chain ───────────────────────────────────────────────

struct Deleter(Option<bool>, Rc<RefCell<Vec<&'static str>>>, &'static str);

impl Plugin for Deleter {
    fn delete_property(&self, _cx: &OpContext<'_>, _t: &Value, _k: &Key) -> Option<bool> {
        self.1.borrow_mut().push(self.2);
        self.0
    }
}

#[test]
fn delete_chain_stops_at_first_definite_bool() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let pipeline = Pipeline::build(&[
        PluginDef::spec(Deleter(None, Rc::clone(&seen), "first")),
        PluginDef::spec(Deleter(Some(false), Rc::clone(&seen), "second")),
        PluginDef::spec(Deleter(Some(true), Rc::clone(&seen), "third")),
    ]);

    let result = with_cx(|cx| pipeline.delete_property(cx, &Value::object(), &Key::from("k")));
    assert_eq!(result, Some(false));
    assert_eq!(*seen.borrow(), vec!["first", "second"]);
}

#[test]
fn delete_chain_defers_when_no_plugin_decides() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let pipeline = Pipeline::build(&[
        PluginDef::spec(Deleter(None, Rc::clone(&seen), "first")),
        PluginDef::spec(Deleter(None, Rc::clone(&seen), "second")),
    ]);

    let result = with_cx(|cx| pipeline.delete_property(cx, &Value::object(), &Key::from("k")));
    assert_eq!(result, None);
    assert_eq!(seen.borrow().len(), 2);
}

// ── Error behavior ───────────────────────────────────────────────

struct FailingWriter;

impl Plugin for FailingWriter {
    fn name(&self) -> &str {
        "failing"
    }
    fn writer(&self, _h: &Value, _k: &Key, _value: Value) -> anyhow::Result<Value> {
        anyhow::bail!("boom")
    }
}

#[test]
fn data_hook_errors_propagate() {
    let pipeline = Pipeline::build(&[PluginDef::spec(FailingWriter)]);
    let err = pipeline
        .write(&Value::object(), &Key::from("k"), Value::from(1))
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("failing"), "{message}");
    assert!(message.contains("writer"), "{message}");
}

struct FailingLifecycle {
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Plugin for FailingLifecycle {
    fn before_parse(&self, _cx: &OpContext<'_>) -> anyhow::Result<()> {
        self.log.borrow_mut().push("failing");
        anyhow::bail!("hook exploded")
    }
}

struct QuietLifecycle {
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Plugin for QuietLifecycle {
    fn before_parse(&self, _cx: &OpContext<'_>) -> anyhow::Result<()> {
        self.log.borrow_mut().push("quiet");
        Ok(())
    }
}

#[test]
fn lifecycle_hook_failure_does_not_stop_siblings() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let pipeline = Pipeline::build(&[
        PluginDef::spec(QuietLifecycle { log: Rc::clone(&log) }),
        PluginDef::spec(FailingLifecycle { log: Rc::clone(&log) }),
    ]);

    with_cx(|cx| pipeline.before_parse(cx));
    // Reverse order: the failing hook runs first, the quiet one still runs.
    assert_eq!(*log.borrow(), vec!["failing", "quiet"]);
}

// ── Factories ────────────────────────────────────────────────────

#[test]
fn factories_run_once_per_build() {
    let instantiations = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&instantiations);
    let def = PluginDef::factory(move || {
        *counter.borrow_mut() += 1;
        Rc::new(FailingWriter) as Rc<dyn Plugin>
    });

    let defs = vec![def];
    let _first = Pipeline::build(&defs);
    let _second = Pipeline::build(&defs);
    assert_eq!(*instantiations.borrow(), 2);
}
