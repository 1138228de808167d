//! Definition sources.
//!
//! Discovery and parsing of component definitions belong to the host; the composer only
//! sees what a [`DefinitionCollector`] hands it for each module.

use rustc_hash::FxHashMap;

use crate::module::{Module, RawDefinition};
use crate::payload::Payload;

/// Yields the raw definitions a module contributes.
///
/// Called once per participating module, in load order. Implementations must be
/// deterministic for a fixed module state: composition order follows the returned
/// sequence (after a stable sort on [`RawDefinition::sequence`]).
pub trait DefinitionCollector {
	type Payload: Payload;

	fn definitions_for(&self, module: &Module) -> Vec<RawDefinition<Self::Payload>>;
}

impl<C: DefinitionCollector + ?Sized> DefinitionCollector for &C {
	type Payload = C::Payload;

	fn definitions_for(&self, module: &Module) -> Vec<RawDefinition<Self::Payload>> {
		(**self).definitions_for(module)
	}
}

/// In-memory collector keyed by owning module.
#[derive(Debug, Clone)]
pub struct StaticCollector<P> {
	by_module: FxHashMap<String, Vec<RawDefinition<P>>>,
}

impl<P> Default for StaticCollector<P> {
	fn default() -> Self {
		Self {
			by_module: FxHashMap::default(),
		}
	}
}

impl<P: Payload> StaticCollector<P> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a definition under its owning module.
	pub fn register(&mut self, def: RawDefinition<P>) {
		self.by_module.entry(def.module.clone()).or_default().push(def);
	}

	/// Registers a definition, returning `self` for chaining.
	pub fn with(mut self, def: RawDefinition<P>) -> Self {
		self.register(def);
		self
	}

	/// Returns the number of registered definitions across all modules.
	pub fn len(&self) -> usize {
		self.by_module.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<P: Payload> Extend<RawDefinition<P>> for StaticCollector<P> {
	fn extend<I: IntoIterator<Item = RawDefinition<P>>>(&mut self, defs: I) {
		for def in defs {
			self.register(def);
		}
	}
}

impl<P: Payload> FromIterator<RawDefinition<P>> for StaticCollector<P> {
	fn from_iter<I: IntoIterator<Item = RawDefinition<P>>>(defs: I) -> Self {
		let mut collector = Self::new();
		collector.extend(defs);
		collector
	}
}

impl<P: Payload> DefinitionCollector for StaticCollector<P> {
	type Payload = P;

	fn definitions_for(&self, module: &Module) -> Vec<RawDefinition<P>> {
		self.by_module.get(module.name()).cloned().unwrap_or_default()
	}
}
