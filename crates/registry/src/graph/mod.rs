//! Module dependency ordering.
//!
//! # Role
//!
//! Turns an unordered set of modules into a [`LoadOrder`] where every module appears after
//! all of its dependencies. Edges run from a dependency to its dependent.
//!
//! # Invariants
//!
//! - Must be deterministic for a given input set, whatever order the set is supplied in.
//!   - Enforced in: [`ModuleGraph::order`] (ready set ordered by `(anchor rank, name)`).
//!   - Tested by: `graph::tests::order_ignores_input_permutation`
//! - Must name only the modules on or between cycles when ordering fails.
//!   - Enforced in: `cycle_members`.
//!   - Tested by: `graph::tests::cycle_reports_participants_only`

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::RegistryError;
use crate::module::Module;

/// Orders modules so dependencies load before their dependents.
///
/// Ordering is a pure function of the input set and the configured anchor, so a single
/// graph can be shared and called concurrently.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
	anchor: Option<String>,
}

impl ModuleGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes `name` win every ordering tie it takes part in.
	///
	/// The anchor still loads after its own dependencies. An anchor that is not part of
	/// the ordered set has no effect.
	pub fn with_anchor(mut self, name: impl Into<String>) -> Self {
		self.anchor = Some(name.into());
		self
	}

	pub fn anchor(&self) -> Option<&str> {
		self.anchor.as_deref()
	}

	/// Computes the load order for `modules`.
	///
	/// Independent modules are ordered by name, after the anchor.
	pub fn order(&self, modules: &[Module]) -> Result<LoadOrder, RegistryError> {
		let n = modules.len();
		let mut index: FxHashMap<&str, usize> = FxHashMap::with_capacity_and_hasher(n, Default::default());
		for (i, module) in modules.iter().enumerate() {
			if index.insert(module.name(), i).is_some() {
				return Err(RegistryError::DuplicateModule {
					name: module.name().to_string(),
				});
			}
		}

		// Walk modules by name so the reported missing dependency does not depend on input order.
		let mut by_name: Vec<usize> = (0..n).collect();
		by_name.sort_unstable_by(|&a, &b| modules[a].name().cmp(modules[b].name()));

		let mut in_degree = vec![0usize; n];
		let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
		for &i in &by_name {
			for dep in modules[i].dependencies() {
				let Some(&d) = index.get(dep.as_str()) else {
					return Err(RegistryError::MissingDependency {
						module: modules[i].name().to_string(),
						dependency: dep.clone(),
					});
				};
				dependents[d].push(i);
				in_degree[i] += 1;
			}
		}

		let anchor = self.anchor.as_deref();
		let rank = |i: usize| (Some(modules[i].name()) != anchor, modules[i].name(), i);

		let mut ready: BTreeSet<(bool, &str, usize)> = (0..n).filter(|&i| in_degree[i] == 0).map(rank).collect();
		let mut placed = vec![false; n];
		let mut ordered = Vec::with_capacity(n);

		while let Some((_, _, i)) = ready.pop_first() {
			placed[i] = true;
			ordered.push(modules[i].clone());
			for &dependent in &dependents[i] {
				in_degree[dependent] -= 1;
				if in_degree[dependent] == 0 {
					ready.insert(rank(dependent));
				}
			}
		}

		if ordered.len() != n {
			return Err(RegistryError::CyclicDependency {
				modules: cycle_members(modules, &dependents, &placed),
			});
		}

		let order = LoadOrder::new(ordered);
		debug!(modules = ?order.names().collect::<Vec<_>>(), "module load order resolved");
		Ok(order)
	}
}

/// Strips unplaced modules that merely sit downstream of a cycle.
///
/// A module on a cycle always has an unplaced dependent (the next module around the cycle);
/// a module only blocked by a cycle eventually has none once its own dependents are stripped.
fn cycle_members(modules: &[Module], dependents: &[Vec<usize>], placed: &[bool]) -> Vec<String> {
	let mut remaining: Vec<bool> = placed.iter().map(|p| !p).collect();
	loop {
		let mut changed = false;
		for i in 0..remaining.len() {
			if remaining[i] && !dependents[i].iter().any(|&d| remaining[d]) {
				remaining[i] = false;
				changed = true;
			}
		}
		if !changed {
			break;
		}
	}

	let mut names: Vec<String> = remaining
		.iter()
		.enumerate()
		.filter(|&(_, &r)| r)
		.map(|(i, _)| modules[i].name().to_string())
		.collect();
	names.sort_unstable();
	names
}

/// Modules in load order, dependencies first.
#[derive(Debug, Clone, Default)]
pub struct LoadOrder {
	modules: Vec<Module>,
	positions: FxHashMap<String, usize>,
}

impl LoadOrder {
	fn new(modules: Vec<Module>) -> Self {
		let positions = modules.iter().enumerate().map(|(i, m)| (m.name().to_string(), i)).collect();
		Self { modules, positions }
	}

	pub fn modules(&self) -> &[Module] {
		&self.modules
	}

	pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
		self.modules.iter().map(Module::name)
	}

	/// Returns the load position of `name`.
	pub fn position(&self, name: &str) -> Option<usize> {
		self.positions.get(name).copied()
	}

	pub fn get(&self, name: &str) -> Option<&Module> {
		self.position(name).map(|i| &self.modules[i])
	}

	/// Returns true if `dependent` depends on `dependency`, directly or transitively.
	pub fn depends_on(&self, dependent: &str, dependency: &str) -> bool {
		let Some(start) = self.get(dependent) else {
			return false;
		};

		let mut seen: FxHashSet<&str> = FxHashSet::default();
		let mut stack: Vec<&str> = start.dependencies().iter().map(String::as_str).collect();
		while let Some(name) = stack.pop() {
			if name == dependency {
				return true;
			}
			if !seen.insert(name) {
				continue;
			}
			if let Some(module) = self.get(name) {
				stack.extend(module.dependencies().iter().map(String::as_str));
			}
		}
		false
	}

	/// Returns true if either module depends on the other.
	pub fn related(&self, a: &str, b: &str) -> bool {
		self.depends_on(a, b) || self.depends_on(b, a)
	}

	pub fn len(&self) -> usize {
		self.modules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.modules.is_empty()
	}
}
