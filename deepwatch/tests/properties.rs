//! Property tests over random JSON documents

use deepwatch::{observe, wrap, ChangeLog, Kind, Value};
use proptest::prelude::*;
use serde_json::Value as Json;

/// JSON trees without numbers, so snapshots compare exactly
fn json_tree() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::Bool),
        "[a-z]{0,4}".prop_map(Json::String),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Json::Array),
            prop::collection::btree_map("[a-z]{1,3}", inner, 0..4)
                .prop_map(|fields| Json::Object(fields.into_iter().collect())),
        ]
    })
}

#[derive(Debug, Clone)]
enum Step {
    Key(String),
    Index(usize),
}

/// Routes to every leaf slot of a JSON tree
fn leaf_routes(json: &Json, route: &mut Vec<Step>, out: &mut Vec<Vec<Step>>) {
    match json {
        Json::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                route.push(Step::Index(i));
                leaf_routes(item, route, out);
                route.pop();
            }
        }
        Json::Object(fields) => {
            for (key, value) in fields {
                route.push(Step::Key(key.clone()));
                leaf_routes(value, route, out);
                route.pop();
            }
        }
        _ => out.push(route.clone()),
    }
}

fn step_name(step: &Step) -> String {
    match step {
        Step::Key(key) => key.clone(),
        Step::Index(index) => index.to_string(),
    }
}

/// Overwrite the leaf at `route` through the façade that owns it
fn write_leaf(root: &Value, route: &[Step], new: Value) {
    let (last, parents) = route.split_last().unwrap();
    let mut current = root.clone();
    for step in parents {
        let observed = current.as_observed().unwrap();
        current = match step {
            Step::Key(key) => observed.as_record().unwrap().get(key).unwrap(),
            Step::Index(index) => observed.as_sequence().unwrap().get(*index).unwrap(),
        };
    }
    let owner = current.as_observed().unwrap();
    match last {
        Step::Key(key) => {
            owner.as_record().unwrap().set(key.clone(), new).unwrap();
        }
        Step::Index(index) => {
            owner.as_sequence().unwrap().set(*index, new).unwrap();
        }
    }
}

fn all_containers_wrapped(value: &Value) -> bool {
    match value {
        Value::Object(_) => false,
        Value::Observed(observed) => match observed.kind() {
            Kind::Record => observed
                .as_record()
                .unwrap()
                .entries()
                .iter()
                .all(|(_, v)| all_containers_wrapped(v)),
            Kind::Sequence => observed
                .as_sequence()
                .unwrap()
                .to_vec()
                .iter()
                .all(all_containers_wrapped),
            _ => true,
        },
        _ => true,
    }
}

proptest! {
    #[test]
    fn test_wrapping_covers_graph_and_preserves_content(json in json_tree()) {
        prop_assume!(json.is_object() || json.is_array());
        let root = wrap(Value::from(json.clone())).unwrap();

        prop_assert!(all_containers_wrapped(&root));
        prop_assert_eq!(root.to_json(), json);
    }

    #[test]
    fn test_root_sees_every_leaf_write_at_its_route(json in json_tree()) {
        prop_assume!(json.is_object() || json.is_array());
        let root = wrap(Value::from(json.clone())).unwrap();
        let log = ChangeLog::new();
        observe(&root, log.observer()).unwrap();

        let mut routes = Vec::new();
        leaf_routes(&json, &mut Vec::new(), &mut routes);
        routes.retain(|route| !route.is_empty());

        for route in &routes {
            write_leaf(&root, route, Value::from("written"));
            let changes = log.take();
            prop_assert_eq!(changes.len(), 1);
            let expected: Vec<String> = route.iter().map(step_name).collect();
            prop_assert_eq!(&changes[0].path, &expected.join("."));
            prop_assert_eq!(changes[0].value_new.clone(), Some(Value::from("written")));
        }
    }
}
