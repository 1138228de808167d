//! End-to-end registry builds for one isolation key.

use tracing::{debug, warn};

use crate::collect::DefinitionCollector;
use crate::compose::{ComponentComposer, Composition, Override};
use crate::error::RegistryError;
use crate::graph::{LoadOrder, ModuleGraph};
use crate::module::Module;
use crate::payload::Payload;
use crate::store::RegistryStore;

/// Summary of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
	pub key: String,
	pub generation: u64,
	/// Participating modules in load order.
	pub load_order: Vec<String>,
	pub components: usize,
	pub overrides: Vec<Override>,
}

impl BuildReport {
	/// Iterates `(component, earlier module, later module)` for every override between
	/// modules with no dependency path between them. The later module won.
	pub fn unrelated_overrides(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
		self.overrides
			.iter()
			.flat_map(|o| o.unrelated.iter().map(move |(a, b)| (o.component.as_str(), a.as_str(), b.as_str())))
	}
}

/// Runs order, composition and publication for a key of a [`RegistryStore`].
pub struct ComponentBuilder<'a, P> {
	store: &'a RegistryStore<P>,
	graph: ModuleGraph,
}

impl<'a, P: Payload> ComponentBuilder<'a, P> {
	pub fn new(store: &'a RegistryStore<P>) -> Self {
		Self {
			store,
			graph: ModuleGraph::new(),
		}
	}

	/// Loads `name` as early as its dependencies allow. See [`ModuleGraph::with_anchor`].
	pub fn anchor(mut self, name: impl Into<String>) -> Self {
		self.graph = self.graph.with_anchor(name);
		self
	}

	/// Rebuilds the entry for `key` from `modules` and `collector`.
	///
	/// Only modules whose install state participates are ordered and composed. On any
	/// error the entry previously installed for `key` stays current.
	pub fn build<C>(&self, key: &str, modules: &[Module], collector: &C) -> Result<BuildReport, RegistryError>
	where
		C: DefinitionCollector<Payload = P> + ?Sized,
	{
		let guard = self.store.begin_build(key)?;

		let composition = match self.compose(modules, collector) {
			Ok(composition) => composition,
			Err(err) => {
				warn!(key, error = %err, "component build failed, previous entry kept");
				return Err(err);
			}
		};

		let overrides = composition.overrides();
		for o in &overrides {
			for (earlier, later) in &o.unrelated {
				warn!(
					key,
					component = %o.component,
					earlier = %earlier,
					later = %later,
					"unrelated modules extend the same component, later module wins"
				);
			}
		}

		let load_order = composition.order().names().map(str::to_string).collect();
		let entry = guard.install(composition);

		Ok(BuildReport {
			key: key.to_string(),
			generation: entry.generation(),
			load_order,
			components: entry.len(),
			overrides,
		})
	}

	/// Orders and composes without touching the store.
	pub fn compose<C>(&self, modules: &[Module], collector: &C) -> Result<Composition<P>, RegistryError>
	where
		C: DefinitionCollector<Payload = P> + ?Sized,
	{
		ComponentComposer::compose(self.order(modules)?, collector)
	}

	/// Orders the participating subset of `modules` with the configured anchor.
	pub fn order(&self, modules: &[Module]) -> Result<LoadOrder, RegistryError> {
		let mut participating = Vec::with_capacity(modules.len());
		for module in modules {
			if module.participates() {
				participating.push(module.clone());
			} else {
				debug!(module = module.name(), state = %module.state(), "module skipped");
			}
		}
		debug!(
			total = modules.len(),
			participating = participating.len(),
			"ordering participating modules"
		);

		self.graph.order(&participating)
	}
}
