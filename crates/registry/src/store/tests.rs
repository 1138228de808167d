use std::sync::Arc;
use std::sync::Barrier;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use super::RegistryStore;
use crate::collect::StaticCollector;
use crate::compose::{ComponentComposer, Composition};
use crate::error::RegistryError;
use crate::graph::ModuleGraph;
use crate::module::{Module, RawDefinition};

fn composition(value: i64) -> Composition<Value> {
	let modules = [Module::leaf("base"), Module::new("extra", ["base"])];
	let collector = StaticCollector::new()
		.with(RawDefinition::new("base", "Foo", json!({ "value": 1 })))
		.with(RawDefinition::new("base", "Bar", json!({ "bar": true })).sequence(1))
		.with(RawDefinition::new("extra", "Foo", json!({ "value": value })).inherits("Foo"));
	let order = ModuleGraph::new().order(&modules).unwrap();
	ComponentComposer::compose(order, &collector).unwrap()
}

#[test]
fn lookup_before_any_build_is_not_found() {
	let store = RegistryStore::<Value>::new();
	let err = store.get("K", "Foo").unwrap_err();
	assert_eq!(
		err,
		RegistryError::ComponentNotFound {
			key: "K".into(),
			name: "Foo".into(),
		}
	);
	assert!(err.is_recoverable());
	assert!(store.entries("K").is_empty());
	assert!(!store.contains("K"));
}

#[test]
fn rebuild_publishes_components() {
	let store = RegistryStore::new();
	let entry = store.rebuild("K", composition(2)).unwrap();
	assert_eq!(entry.key(), "K");
	assert_eq!(entry.generation(), 1);

	let foo = store.get("K", "Foo").unwrap();
	assert_eq!(foo.payload(), &json!({ "value": 2 }));
	assert!(matches!(store.get("K", "Missing"), Err(RegistryError::ComponentNotFound { .. })));

	let names: Vec<String> = store.entries("K").iter().map(|c| c.name().to_string()).collect();
	assert_eq!(names, ["Foo", "Bar"]);
	assert_eq!(entry.load_order().names().collect::<Vec<_>>(), ["base", "extra"]);
}

#[test]
fn rebuild_replaces_the_previous_entry() {
	let store = RegistryStore::new();
	store.rebuild("K", composition(2)).unwrap();
	let second = store.rebuild("K", composition(3)).unwrap();

	assert_eq!(second.generation(), 2);
	assert_eq!(store.get("K", "Foo").unwrap().payload(), &json!({ "value": 3 }));
	assert_eq!(store.snapshot("K").unwrap().generation(), 2);
}

#[test]
fn rebuilding_unchanged_inputs_is_idempotent() {
	let store = RegistryStore::new();
	let first = store.rebuild("K", composition(2)).unwrap();
	let second = store.rebuild("K", composition(2)).unwrap();

	assert!(first.same_content(&second));
	assert_ne!(first.generation(), second.generation());
	assert!(!first.same_content(&store.rebuild("K", composition(9)).unwrap()));
}

#[test]
fn readers_keep_their_snapshot_across_rebuild() {
	let store = RegistryStore::new();
	store.rebuild("K", composition(2)).unwrap();

	let pinned = store.snapshot("K").unwrap();
	let foo = store.get("K", "Foo").unwrap();
	store.rebuild("K", composition(3)).unwrap();

	assert_eq!(pinned.get("Foo").unwrap().payload(), &json!({ "value": 2 }));
	assert_eq!(foo.payload(), &json!({ "value": 2 }));
	assert_eq!(store.get("K", "Foo").unwrap().payload(), &json!({ "value": 3 }));
}

#[test]
fn rebuilding_one_key_leaves_others_alone() {
	let store = RegistryStore::new();
	store.rebuild("K1", composition(1)).unwrap();
	let k2 = store.rebuild("K2", composition(2)).unwrap();

	store.rebuild("K1", composition(10)).unwrap();
	assert!(store.clear("K1"));

	let current = store.snapshot("K2").unwrap();
	assert!(Arc::ptr_eq(&current, &k2));
	assert_eq!(store.get("K2", "Foo").unwrap().payload(), &json!({ "value": 2 }));
	assert_eq!(store.keys(), ["K2"]);
}

#[test]
fn clear_is_idempotent() {
	let store = RegistryStore::new();
	assert!(!store.clear("K"));
	store.rebuild("K", composition(2)).unwrap();
	assert!(store.clear("K"));
	assert!(!store.clear("K"));
	assert!(matches!(store.get("K", "Foo"), Err(RegistryError::ComponentNotFound { .. })));
}

#[test]
fn concurrent_claim_on_same_key_is_rejected() {
	let store = RegistryStore::<Value>::new();
	let guard = store.begin_build("K").unwrap();
	assert!(store.is_building("K"));

	let err = store.begin_build("K").err().unwrap();
	assert_eq!(err, RegistryError::BuildInProgress { key: "K".into() });
	assert!(err.is_recoverable());
	assert!(matches!(store.rebuild("K", composition(2)), Err(RegistryError::BuildInProgress { .. })));

	// Other keys are unaffected by the claim.
	store.rebuild("other", composition(2)).unwrap();

	guard.install(composition(4));
	assert!(!store.is_building("K"));
	assert_eq!(store.get("K", "Foo").unwrap().payload(), &json!({ "value": 4 }));
}

#[test]
fn abandoned_build_keeps_prior_entry() {
	let store = RegistryStore::new();
	let before = store.rebuild("K", composition(2)).unwrap();

	let guard = store.begin_build("K").unwrap();
	drop(guard);

	assert!(!store.is_building("K"));
	assert!(Arc::ptr_eq(&store.snapshot("K").unwrap(), &before));
	store.begin_build("K").unwrap();
}

#[test]
fn parallel_builds_of_distinct_keys_all_land() {
	let store = RegistryStore::new();
	let keys: Vec<String> = (0..8).map(|i| format!("tenant-{i}")).collect();
	let barrier = Barrier::new(keys.len());

	std::thread::scope(|scope| {
		for (i, key) in keys.iter().enumerate() {
			let store = &store;
			let barrier = &barrier;
			scope.spawn(move || {
				barrier.wait();
				store.rebuild(key, composition(i as i64)).unwrap();
			});
		}
	});

	assert_eq!(store.keys(), keys);
	for (i, key) in keys.iter().enumerate() {
		assert_eq!(store.get(key, "Foo").unwrap().payload(), &json!({ "value": i }));
	}
}

#[test]
fn racing_claims_on_one_key_admit_a_single_builder() {
	let store = RegistryStore::<Value>::new();
	let barrier = Barrier::new(8);

	let winners = std::thread::scope(|scope| {
		let handles: Vec<_> = (0..8)
			.map(|_| {
				scope.spawn(|| {
					barrier.wait();
					match store.begin_build("K") {
						Ok(guard) => {
							// Hold the claim until every contender has tried.
							barrier.wait();
							drop(guard);
							1
						}
						Err(RegistryError::BuildInProgress { .. }) => {
							barrier.wait();
							0
						}
						Err(other) => panic!("unexpected error: {other}"),
					}
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).sum::<usize>()
	});

	assert_eq!(winners, 1);
	assert!(!store.is_building("K"));
}
