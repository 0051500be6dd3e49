//! Integration tests for change propagation through ancestor chains

use deepwatch::{
    observe, observer, wrap, Change, ChangeKind, ChangeLog, Object, Observed, Value, WatchError,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn record_at(value: &Value, key: &str) -> Observed {
    value
        .as_observed()
        .unwrap()
        .as_record()
        .unwrap()
        .get(key)
        .unwrap()
        .into_observed()
        .unwrap()
}

fn three_levels() -> (Value, Observed, Observed) {
    let root = wrap(Object::record([(
        "a",
        Value::from(Object::record([(
            "b",
            Value::from(Object::record([("c", 1)])),
        )])),
    )]))
    .unwrap();
    let a = record_at(&root, "a");
    let b = record_at(&Value::from(a.clone()), "b");
    (root, a, b)
}

#[test]
fn test_bubbling_reports_relative_paths() {
    init_tracing();
    let (root, a, b) = three_levels();
    let root_log = ChangeLog::new();
    let a_log = ChangeLog::new();
    let b_log = ChangeLog::new();
    observe(&root, root_log.observer()).unwrap();
    a.observe(a_log.observer()).unwrap();
    b.observe(b_log.observer()).unwrap();

    b.as_record().unwrap().set("c", 2).unwrap();

    assert_eq!(b_log.lines(), vec!["change c old=1 new=2"]);
    assert_eq!(a_log.lines(), vec!["change b.c old=1 new=2"]);
    assert_eq!(root_log.lines(), vec!["change a.b.c old=1 new=2"]);

    let change = root_log.take().remove(0);
    assert_eq!(change.target, *root.as_observed().unwrap());
    assert_eq!(change.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

#[test]
fn test_innermost_first_then_registration_order() {
    let (root, a, b) = three_levels();
    let order = Arc::new(Mutex::new(Vec::new()));

    let push = |label: &'static str| {
        let order = Arc::clone(&order);
        observer(move |_: &Change| order.lock().push(label))
    };
    observe(&root, push("root")).unwrap();
    a.observe(push("a-first")).unwrap();
    a.observe(push("a-second")).unwrap();
    b.observe(push("b")).unwrap();

    b.as_record().unwrap().remove("c").unwrap();

    assert_eq!(*order.lock(), vec!["b", "a-first", "a-second", "root"]);
}

#[test]
fn test_delete_event_shape() {
    let (root, _, b) = three_levels();
    let log = ChangeLog::new();
    observe(&root, log.observer()).unwrap();

    b.as_record().unwrap().remove("c").unwrap();

    let change = log.take().remove(0);
    assert_eq!(change.kind, ChangeKind::Delete);
    assert!(change.is_delete());
    assert_eq!(change.path, "a.b.c");
    assert_eq!(change.value_old, Some(Value::from(1)));
    assert_eq!(change.value_new, None);
}

#[test]
fn test_new_children_bubble_under_their_slot() {
    let root = wrap(Object::record([("items", Object::sequence(Vec::<Value>::new()))])).unwrap();
    let log = ChangeLog::new();
    observe(&root, log.observer()).unwrap();

    // Stored values are live façades, so render each step as it happens
    let mut lines = Vec::new();
    let items = record_at(&root, "items");
    items.as_sequence().unwrap().push(Object::record([("done", false)])).unwrap();
    lines.extend(log.lines());
    log.take();

    let item = items.as_sequence().unwrap().get(0).unwrap();
    item.as_observed().unwrap().as_record().unwrap().set("done", true).unwrap();
    lines.extend(log.lines());

    insta::assert_snapshot!(lines.join("\n"), @r###"
    change items.0 new={"done":false}
    change items.0.done old=false new=true
    "###);
}

#[test]
fn test_aliased_value_reports_through_first_parent_only() {
    let root = wrap(Object::record([
        ("first", Value::from(Object::record([("shared", Object::record([("n", 1)]))]))),
        ("second", Value::from(Object::record(Vec::<(&str, Value)>::new()))),
    ]))
    .unwrap();
    let first = record_at(&root, "first");
    let second = record_at(&root, "second");
    let shared = record_at(&Value::from(first.clone()), "shared");

    let stored = second.as_record().unwrap().set("alias", shared.clone()).unwrap();
    assert!(stored.as_observed().unwrap().ptr_eq(&shared));
    assert_eq!(shared.name(), "shared");

    let root_log = ChangeLog::new();
    let second_log = ChangeLog::new();
    observe(&root, root_log.observer()).unwrap();
    second.observe(second_log.observer()).unwrap();

    shared.as_record().unwrap().set("n", 2).unwrap();

    assert_eq!(root_log.lines(), vec!["change first.shared.n old=1 new=2"]);
    assert!(second_log.is_empty());
}

#[test]
fn test_observers_may_mutate_reentrantly() {
    let root = wrap(Object::record([("count", 0)])).unwrap();
    let record = root.as_observed().unwrap().as_record().unwrap();
    let log = ChangeLog::new();

    let bump = {
        let record = record.clone();
        observer(move |change: &Change| {
            if change.path != "count" {
                return;
            }
            let count = record.get("count").and_then(|v| v.as_number()).unwrap_or(0.0);
            if count < 3.0 {
                record.set("count", count + 1.0).unwrap();
            } else {
                record.set("done", true).unwrap();
            }
        })
    };
    let subscription = record.observe(bump).unwrap();
    record.observe(log.observer()).unwrap();

    record.set("count", 1).unwrap();

    // Nested mutations propagate depth-first before the outer call resumes
    assert_eq!(
        log.lines(),
        vec![
            "change done new=true",
            "change count old=2 new=3",
            "change count old=1 new=2",
            "change count old=0 new=1",
        ]
    );
    assert_eq!(record.get("count"), Some(Value::from(3)));

    subscription.destroy().unwrap();
}

#[test]
fn test_runaway_reentrancy_is_cut_off() {
    init_tracing();
    let root = wrap(Object::record([("n", 0)])).unwrap();
    let record = root.as_observed().unwrap().as_record().unwrap();
    let errors = Arc::new(Mutex::new(Vec::new()));

    let runaway = {
        let record = record.clone();
        let errors = Arc::clone(&errors);
        observer(move |_: &Change| {
            let n = record.get("n").and_then(|v| v.as_number()).unwrap_or(0.0);
            if let Err(err) = record.set("n", n + 1.0) {
                errors.lock().push(err);
            }
        })
    };
    let subscription = record.observe(runaway).unwrap();

    record.set("n", 1).unwrap();

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], WatchError::DispatchDepth { limit: 64 }));
    assert_eq!(record.get("n"), Some(Value::from(64)));
    assert_eq!(deepwatch::registry::dispatch_depth(), 0);

    subscription.destroy().unwrap();
}
