//! Integration tests: run the toy host vectors.
//!
//! Each fixture in tests/fixtures/ has:
//! - case.json: the toy host, optional overrides and the keys to classify
//! - expect.json: the expected classifications and set sizes
//!
//! These tests build a registry over the named toy host, apply overrides,
//! classify every queried key and compare the output to the expected result.

use serde_json::{Map, Value, json};
use std::path::PathBuf;
use tracegate_kernel::toy::{TOY_HOSTS, get_host};
use tracegate_kernel::{CallDecision, OverrideConfig, Registry, UsageError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_json(path: &PathBuf) -> Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

fn run_fixture(name: &str) {
    let dir = fixtures_dir().join(name);
    let case = read_json(&dir.join("case.json"));
    let expected = read_json(&dir.join("expect.json"));

    let host_name = case["host"].as_str().expect("missing host field");
    let host = get_host(host_name).unwrap_or_else(|| panic!("unknown host: {host_name}"));
    let registry = Registry::new(host.image.surface.clone(), &host.config);

    let overrides: OverrideConfig = match case.get("overrides") {
        Some(value) => serde_json::from_value(value.clone()).expect("invalid overrides"),
        None => OverrideConfig::default(),
    };
    registry
        .apply_overrides(&host.image, &overrides)
        .expect("overrides apply");

    let queries = case["queries"].as_array().expect("missing queries field");
    let classifications: Vec<Value> = queries
        .iter()
        .map(|key| {
            let key = key.as_str().expect("query keys are strings");
            let obj = host
                .image
                .object(key)
                .unwrap_or_else(|| panic!("unknown key in {name}: {key}"));
            serde_json::to_value(registry.classify(obj)).expect("failed to serialize")
        })
        .collect();

    let mut set_sizes = Map::new();
    for set in registry.sets() {
        set_sizes.insert(set.label().to_string(), json!(set.len()));
    }
    let result = json!({
        "classifications": classifications,
        "setSizes": set_sizes,
    });

    assert_eq!(
        result,
        expected,
        "\n\nFixture: {name}\n\nGot:\n{}\n\nExpected:\n{}\n",
        serde_json::to_string_pretty(&result).unwrap(),
        serde_json::to_string_pretty(&expected).unwrap(),
    );
}

#[test]
fn golden_mini_torch_defaults() {
    run_fixture("mini_torch_defaults");
}

#[test]
fn golden_mini_torch_forbid() {
    run_fixture("mini_torch_forbid");
}

#[test]
fn golden_policy_split_overrides() {
    run_fixture("policy_split_overrides");
}

#[test]
fn golden_cyclic_terminates() {
    run_fixture("cyclic_terminates");
}

#[test]
fn policy_split_round_trips_through_overrides() {
    let host = get_host("policy_split").expect("policy_split");
    let registry = Registry::new(host.image.surface.clone(), &host.config);
    let f = host.image.object("A.f").expect("A.f");
    let g = host.image.object("A.sub.g").expect("A.sub.g");
    let a = host.image.object("A").expect("A");

    assert!(registry.is_allowed(f));
    assert_eq!(registry.get_display_name(f, "?"), "A.f");
    assert_eq!(registry.get_display_name(a, "?"), "A");
    assert!(!registry.is_allowed(g));

    let err = registry.disallow_in_graph(g).expect_err("g is not allowed");
    assert_eq!(
        err,
        UsageError::NotAllowed {
            object: "A.sub.g".to_string()
        }
    );

    registry
        .disallow_in_graph_lenient(g)
        .expect("lenient disallow");
    assert!(registry.is_disallowed(g));
    assert!(!registry.is_allowed(g));

    registry.allow_in_graph(g).expect("allow");
    assert!(registry.is_allowed(g));
    assert!(!registry.is_disallowed(g));
    assert_eq!(registry.get_display_name(g, "fallback"), "fallback");

    registry.reset();
    assert!(!registry.is_allowed(g));
    assert!(registry.is_allowed(f));
}

#[test]
fn strict_disallow_on_sequence_is_all_or_nothing() {
    let host = get_host("policy_split").expect("policy_split");
    let registry = Registry::new(host.image.surface.clone(), &host.config);
    let f = host.image.object("A.f").expect("A.f");
    let g = host.image.object("A.sub.g").expect("A.sub.g");

    let before = registry.fingerprint();
    assert!(registry.disallow_in_graph(vec![f, g]).is_err());
    assert!(registry.is_allowed(f));
    assert_eq!(registry.fingerprint(), before);

    registry.disallow_in_graph([f]).expect("f is allowed");
    assert!(!registry.is_allowed(f));
    assert_ne!(registry.fingerprint(), before);
}

#[test]
fn forbidden_tag_overrides_the_allowed_decision() {
    let host = get_host("mini_torch").expect("mini_torch");
    let registry = Registry::new(host.image.surface.clone(), &host.config);
    let add = host.image.object("torch.add").expect("torch.add");

    assert_eq!(registry.classify(add).decision, CallDecision::Opaque);
    registry.forbid_in_graph(add).expect("forbid");
    assert!(registry.is_allowed(add));
    assert_eq!(registry.classify(add).decision, CallDecision::Forbidden);

    registry.reset();
    assert_eq!(registry.classify(add).decision, CallDecision::Forbidden);
}

#[test]
fn cyclic_host_allowed_names_snapshot() {
    let host = get_host("cyclic").expect("cyclic");
    let registry = Registry::new(host.image.surface.clone(), &host.config);
    let allowed = registry.set("allowed").expect("allowed set");
    let mut names: Vec<String> = allowed.snapshot().into_values().flatten().collect();
    names.sort();

    insta::assert_json_snapshot!(names, @r#"
    [
      "R",
      "R.loop",
      "R.loop.f"
    ]
    "#);
}

fn assert_allowed_and_disallowed_disjoint(registry: &Registry, host: &str, stage: &str) {
    let allowed = registry.set("allowed").expect("allowed set").snapshot();
    let disallowed = registry.set("disallowed").expect("disallowed set").snapshot();
    let overlap: Vec<_> = allowed.keys().filter(|id| disallowed.contains_key(id)).collect();
    assert!(
        overlap.is_empty(),
        "{host} ({stage}): identities in both sets: {overlap:?}"
    );
}

#[test]
fn allowed_and_disallowed_never_overlap() {
    for name in TOY_HOSTS {
        let host = get_host(name).expect("toy host");
        let registry = Registry::new(host.image.surface.clone(), &host.config);

        // Denials first, so discovery runs against an already collected set.
        registry.set("disallowed").expect("disallowed set").materialize();
        assert_allowed_and_disallowed_disjoint(&registry, name, "defaults");
        for key in host.image.keys() {
            let obj = host.image.object(key).expect("listed key");
            assert!(
                !(registry.is_allowed(obj) && registry.is_disallowed(obj)),
                "{name}: `{key}` is both allowed and disallowed"
            );
        }

        let callables: Vec<_> = host
            .image
            .keys()
            .filter_map(|key| host.image.object(key))
            .filter(|obj| obj.is_callable())
            .cloned()
            .collect();
        for (idx, obj) in callables.iter().enumerate() {
            if idx % 2 == 0 {
                registry.disallow_in_graph_lenient(obj).expect("callable");
            } else {
                registry.allow_in_graph(obj).expect("callable");
            }
        }
        assert_allowed_and_disallowed_disjoint(&registry, name, "overrides");

        registry.reset();
        assert_allowed_and_disallowed_disjoint(&registry, name, "reset");
    }
}
