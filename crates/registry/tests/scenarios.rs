#![allow(unused_crate_dependencies)]

//! End-to-end build scenarios through the public API.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use weave_registry::{ComponentBuilder, ComponentComposer, DefinitionCollector, Module, ModuleGraph, RawDefinition, RegistryError, RegistryStore, StaticCollector};

fn base_and_extra() -> (Vec<Module>, StaticCollector<Value>) {
	let modules = vec![Module::leaf("base"), Module::new("extra", ["base"])];
	let collector = StaticCollector::new()
		.with(RawDefinition::new("base", "Foo", json!({ "value": 1 })))
		.with(RawDefinition::new("extra", "Foo", json!({ "value": 2 })).inherits("Foo"));
	(modules, collector)
}

#[test]
fn extension_in_dependent_module_wins() {
	let (modules, collector) = base_and_extra();

	let order = ModuleGraph::new().order(&modules).unwrap();
	assert_eq!(order.names().collect::<Vec<_>>(), ["base", "extra"]);

	let composition = ComponentComposer::compose(order, &collector).unwrap();
	assert_eq!(composition.names().collect::<Vec<_>>(), ["Foo"]);
	assert_eq!(composition.get("Foo").unwrap().payload(), &json!({ "value": 2 }));
}

#[test]
fn orphan_extension_fails_composition() {
	let modules = [Module::leaf("orphan")];
	let collector = StaticCollector::new().with(RawDefinition::new("orphan", "Bar", json!({})).inherits("Missing"));

	let order = ModuleGraph::new().order(&modules).unwrap();
	let err = ComponentComposer::compose(order, &collector).unwrap_err();
	assert!(matches!(err, RegistryError::UnknownBaseComponent { .. }));
	assert!(!err.is_recoverable());
}

#[test]
fn lookup_follows_the_registry_lifecycle() {
	let store = RegistryStore::new();
	assert!(matches!(store.get("K", "Foo"), Err(RegistryError::ComponentNotFound { .. })));

	let (modules, collector) = base_and_extra();
	let order = ModuleGraph::new().order(&modules).unwrap();
	let composition = ComponentComposer::compose(order, &collector).unwrap();
	store.rebuild("K", composition).unwrap();

	let foo = store.get("K", "Foo").unwrap();
	assert_eq!(foo.name(), "Foo");
	assert_eq!(foo.payload(), &json!({ "value": 2 }));
}

#[test]
fn rebuilding_with_unchanged_inputs_is_stable() {
	let store = RegistryStore::new();
	let builder = ComponentBuilder::new(&store);
	let (modules, collector) = base_and_extra();

	builder.build("K", &modules, &collector).unwrap();
	let first = store.snapshot("K").unwrap();
	builder.build("K", &modules, &collector).unwrap();
	let second = store.snapshot("K").unwrap();

	assert!(first.same_content(&second));
	assert!(second.generation() > first.generation());
}

#[test]
fn tenants_are_isolated() {
	let store = RegistryStore::new();
	let builder = ComponentBuilder::new(&store);
	let (modules, collector) = base_and_extra();

	builder.build("tenant-a", &modules, &collector).unwrap();
	builder.build("tenant-b", &modules[..1], &collector).unwrap();
	let b_before = store.snapshot("tenant-b").unwrap();

	builder.build("tenant-a", &modules, &collector).unwrap();
	store.clear("tenant-a");

	let b_after = store.snapshot("tenant-b").unwrap();
	assert!(std::sync::Arc::ptr_eq(&b_before, &b_after));
	assert_eq!(store.get("tenant-b", "Foo").unwrap().payload(), &json!({ "value": 1 }));
	assert!(store.get("tenant-a", "Foo").is_err());
}

/// A collector backed by a closure, as a host would wire its own discovery mechanism.
struct FnCollector<F>(F);

impl<F> DefinitionCollector for FnCollector<F>
where
	F: Fn(&Module) -> Vec<RawDefinition<Value>>,
{
	type Payload = Value;

	fn definitions_for(&self, module: &Module) -> Vec<RawDefinition<Value>> {
		(self.0)(module)
	}
}

#[test]
fn collector_is_called_once_per_module_in_load_order() {
	let calls = std::sync::Mutex::new(Vec::new());
	let collector = FnCollector(|module: &Module| {
		calls.lock().unwrap().push(module.name().to_string());
		vec![RawDefinition::new(module.name(), "Log", json!({ "last": module.name() }))]
	});

	let modules = [
		Module::new("sale", ["account", "stock"]),
		Module::new("stock", ["base"]),
		Module::new("account", ["base"]),
		Module::leaf("base"),
	];
	let store = RegistryStore::new();
	ComponentBuilder::new(&store).build("K", &modules, &collector).unwrap();

	assert_eq!(*calls.lock().unwrap(), ["base", "account", "stock", "sale"]);
	assert_eq!(store.get("K", "Log").unwrap().payload(), &json!({ "last": "sale" }));
}
