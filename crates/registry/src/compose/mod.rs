//! Multi-module component composition.
//!
//! # Role
//!
//! Folds the raw definitions of every module, in load order, into one
//! [`ComposedDefinition`] per component name.
//!
//! # Placement rules
//!
//! For each raw definition, modules in load order, definitions in `sequence` order:
//!
//! | `inherits` | component `name` exists | effect |
//! |------------|-------------------------|--------|
//! | none       | no                      | new component |
//! | none       | yes                     | appended to `name` |
//! | `name`     | yes                     | appended to `name` |
//! | `base`     | yes                     | appended to `name` (`base` must exist) |
//! | `base`     | no                      | new component `name`, seeded with `base`'s contributors so far |
//!
//! Any `inherits` naming a component with no prior contributor fails with
//! [`RegistryError::UnknownBaseComponent`].
//!
//! # Invariants
//!
//! - Contributors are kept in composition order: load order, then declaration order.
//!   - Enforced in: [`ComponentComposer::compose`].
//!   - Tested by: `compose::tests::same_module_merges_in_declaration_order`
//! - Contributors copied from a prototype are never reported as overrides.
//!   - Enforced in: [`Composition::overrides`] (looks at [`ComposedDefinition::own_contributors`]).
//!   - Tested by: `compose::tests::prototype_seed_is_not_an_override`
//! - The merged payload is the left-to-right fold of the contributors' payloads.
//!   - Enforced in: [`ComposedDefinition::push`].
//!   - Tested by: `compose::tests::dependent_overrides_dependency`

use indexmap::IndexMap;
use tracing::debug;

use crate::collect::DefinitionCollector;
use crate::error::RegistryError;
use crate::graph::LoadOrder;
use crate::module::RawDefinition;
use crate::payload::Payload;

/// Final definition of a component after all contributions are folded.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedDefinition<P> {
	name: String,
	contributors: Vec<RawDefinition<P>>,
	/// Leading contributors copied from a prototype.
	inherited: usize,
	payload: P,
}

impl<P: Payload> ComposedDefinition<P> {
	fn new(name: String, first: RawDefinition<P>) -> Self {
		Self {
			name,
			payload: first.payload.clone(),
			contributors: vec![first],
			inherited: 0,
		}
	}

	/// Seeds a new component from a snapshot of `base`.
	fn derive(name: String, base: &Self, def: RawDefinition<P>) -> Self {
		let mut derived = Self {
			name,
			contributors: base.contributors.clone(),
			inherited: base.contributors.len(),
			payload: base.payload.clone(),
		};
		derived.push(def);
		derived
	}

	/// Layers `def` on top of everything contributed so far.
	fn push(&mut self, def: RawDefinition<P>) {
		self.payload.layer(&def.payload);
		self.contributors.push(def);
	}
}

impl<P> ComposedDefinition<P> {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Contributing raw definitions in composition order.
	pub fn contributors(&self) -> &[RawDefinition<P>] {
		&self.contributors
	}

	/// Contributors added under this component's own name, after any prototype snapshot.
	pub fn own_contributors(&self) -> &[RawDefinition<P>] {
		&self.contributors[self.inherited..]
	}

	/// The merged payload.
	pub fn payload(&self) -> &P {
		&self.payload
	}

	/// Module that introduced the component (or its prototype).
	pub fn origin(&self) -> &str {
		self.contributors.first().map_or("", |def| def.module.as_str())
	}

	/// Distinct contributing modules, in composition order.
	pub fn modules(&self) -> Vec<&str> {
		distinct_modules(&self.contributors)
	}
}

fn distinct_modules<P>(defs: &[RawDefinition<P>]) -> Vec<&str> {
	let mut modules: Vec<&str> = Vec::with_capacity(defs.len());
	for def in defs {
		if !modules.contains(&def.module.as_str()) {
			modules.push(&def.module);
		}
	}
	modules
}

/// A component extended by more than one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
	pub component: String,
	/// Contributing modules in composition order; the last one wins conflicts.
	pub modules: Vec<String>,
	/// Contributing module pairs with no dependency path between them.
	pub unrelated: Vec<(String, String)>,
}

/// Result of composing every participating module.
#[derive(Debug, Clone)]
pub struct Composition<P> {
	order: LoadOrder,
	components: IndexMap<String, ComposedDefinition<P>>,
}

impl<P> Composition<P> {
	/// The load order the composition was folded in.
	pub fn order(&self) -> &LoadOrder {
		&self.order
	}

	pub fn get(&self, name: &str) -> Option<&ComposedDefinition<P>> {
		self.components.get(name)
	}

	/// Components in first-introduction order.
	pub fn components(&self) -> impl Iterator<Item = &ComposedDefinition<P>> + '_ {
		self.components.values()
	}

	pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
		self.components.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.components.len()
	}

	pub fn is_empty(&self) -> bool {
		self.components.is_empty()
	}

	/// Lists every component extended by more than one module.
	///
	/// Contributors a component copied from its prototype do not count as extensions.
	pub fn overrides(&self) -> Vec<Override> {
		self.components
			.values()
			.filter_map(|composed| {
				let modules = distinct_modules(composed.own_contributors());
				if modules.len() < 2 {
					return None;
				}

				let mut unrelated = Vec::new();
				for (i, a) in modules.iter().enumerate() {
					for b in &modules[i + 1..] {
						if !self.order.related(a, b) {
							unrelated.push((a.to_string(), b.to_string()));
						}
					}
				}

				Some(Override {
					component: composed.name.clone(),
					modules: modules.iter().map(|m| m.to_string()).collect(),
					unrelated,
				})
			})
			.collect()
	}

	pub(crate) fn into_parts(self) -> (LoadOrder, IndexMap<String, ComposedDefinition<P>>) {
		(self.order, self.components)
	}
}

/// Folds raw definitions into composed definitions.
pub struct ComponentComposer;

impl ComponentComposer {
	/// Composes every module of `order`, asking `collector` for each module's definitions.
	pub fn compose<C>(order: LoadOrder, collector: &C) -> Result<Composition<C::Payload>, RegistryError>
	where
		C: DefinitionCollector + ?Sized,
	{
		let mut components: IndexMap<String, ComposedDefinition<C::Payload>> = IndexMap::new();

		for module in order.modules() {
			let mut defs = collector.definitions_for(module);
			defs.sort_by_key(|def| def.sequence);
			debug!(module = module.name(), count = defs.len(), "composing module definitions");

			for def in defs {
				if def.module != module.name() {
					return Err(RegistryError::ForeignDefinition {
						component: def.name,
						declared: def.module,
						module: module.name().to_string(),
					});
				}
				place(&mut components, def)?;
			}
		}

		debug!(components = components.len(), modules = order.len(), "composition complete");
		Ok(Composition { order, components })
	}
}

fn place<P: Payload>(components: &mut IndexMap<String, ComposedDefinition<P>>, def: RawDefinition<P>) -> Result<(), RegistryError> {
	if let Some(base) = &def.inherits
		&& !components.contains_key(base)
	{
		return Err(RegistryError::UnknownBaseComponent {
			component: def.name.clone(),
			base: base.clone(),
			module: def.module.clone(),
		});
	}

	if let Some(existing) = components.get_mut(&def.name) {
		existing.push(def);
		return Ok(());
	}

	let name = def.name.clone();
	let composed = if def.is_prototype()
		&& let Some(base) = def.inherits.as_deref().and_then(|base| components.get(base))
	{
		ComposedDefinition::derive(name.clone(), base, def)
	} else {
		ComposedDefinition::new(name.clone(), def)
	};
	components.insert(name, composed);
	Ok(())
}
