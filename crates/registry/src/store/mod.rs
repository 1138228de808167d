//! Keyed registry of composed definitions with atomic publication.
//!
//! # Role
//!
//! Holds one [`RegistryEntry`] per isolation key. An entry is never mutated: a rebuild
//! composes a complete replacement and swaps it in.
//!
//! # Mental Model
//!
//! Per key the observable states are `absent` and `ready(vN)`. The build in between is
//! private to the builder holding the key's [`BuildGuard`]; the only visible transition
//! is the pointer swap in [`BuildGuard::install`].
//!
//! # Concurrency
//!
//! - **Reads:** Wait-free with respect to builds (atomic load of the key's current entry).
//!   The key map lock is only taken for writing when a key is seen for the first time.
//! - **Builds:** At most one per key. A second [`RegistryStore::begin_build`] for a key
//!   that is already claimed fails with [`RegistryError::BuildInProgress`]; requests are
//!   never queued. Builds of different keys are independent.
//!
//! # Invariants
//!
//! - Must never expose a partially composed entry.
//!   - Enforced in: [`BuildGuard::install`] (single `ArcSwapOption::store` of a finished entry).
//!   - Tested by: `store::tests::readers_keep_their_snapshot_across_rebuild`
//! - Must leave the prior entry untouched when a build is abandoned or fails.
//!   - Enforced in: [`BuildGuard`] drop (releases the claim without storing).
//!   - Tested by: `store::tests::abandoned_build_keeps_prior_entry`
//! - Must keep keys isolated from one another.
//!   - Enforced in: per-key [`Slot`].
//!   - Tested by: `store::tests::rebuilding_one_key_leaves_others_alone`

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::compose::{ComposedDefinition, Composition};
use crate::error::RegistryError;
use crate::graph::LoadOrder;
use crate::payload::Payload;

/// The published set of composed definitions for one isolation key.
#[derive(Debug)]
pub struct RegistryEntry<P> {
	key: String,
	generation: u64,
	order: LoadOrder,
	components: IndexMap<String, Arc<ComposedDefinition<P>>>,
}

impl<P> RegistryEntry<P> {
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Store-wide install counter; strictly increases with every install.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn load_order(&self) -> &LoadOrder {
		&self.order
	}

	pub fn get(&self, name: &str) -> Option<&Arc<ComposedDefinition<P>>> {
		self.components.get(name)
	}

	/// Components in first-introduction order.
	pub fn components(&self) -> impl Iterator<Item = &Arc<ComposedDefinition<P>>> + '_ {
		self.components.values()
	}

	pub fn len(&self) -> usize {
		self.components.len()
	}

	pub fn is_empty(&self) -> bool {
		self.components.is_empty()
	}

	/// Compares load order and components, ignoring key and generation.
	pub fn same_content(&self, other: &Self) -> bool
	where
		P: PartialEq,
	{
		self.order.names().eq(other.order.names()) && self.components == other.components
	}
}

/// Per-key state: the current entry and the build claim.
struct Slot<P> {
	current: ArcSwapOption<RegistryEntry<P>>,
	building: AtomicBool,
}

impl<P> Slot<P> {
	fn new() -> Self {
		Self {
			current: ArcSwapOption::empty(),
			building: AtomicBool::new(false),
		}
	}
}

/// Keyed store of registry entries.
pub struct RegistryStore<P> {
	slots: RwLock<FxHashMap<String, Arc<Slot<P>>>>,
	generation: AtomicU64,
}

impl<P> Default for RegistryStore<P> {
	fn default() -> Self {
		Self {
			slots: RwLock::new(FxHashMap::default()),
			generation: AtomicU64::new(0),
		}
	}
}

impl<P: Payload> RegistryStore<P> {
	pub fn new() -> Self {
		Self::default()
	}

	fn slot(&self, key: &str) -> Option<Arc<Slot<P>>> {
		self.slots.read().get(key).cloned()
	}

	fn slot_or_insert(&self, key: &str) -> Arc<Slot<P>> {
		if let Some(slot) = self.slot(key) {
			return slot;
		}
		self.slots.write().entry(key.to_string()).or_insert_with(|| Arc::new(Slot::new())).clone()
	}

	/// Claims `key` for a build.
	///
	/// The claim is released when the returned guard is dropped, whether or not it installed
	/// an entry.
	pub fn begin_build(&self, key: &str) -> Result<BuildGuard<'_, P>, RegistryError> {
		let slot = self.slot_or_insert(key);
		if slot.building.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
			debug!(key, "build rejected, key already claimed");
			return Err(RegistryError::BuildInProgress { key: key.to_string() });
		}
		debug!(key, "build claimed");
		Ok(BuildGuard {
			store: self,
			key: key.to_string(),
			slot,
		})
	}

	/// Installs `composition` as the entry for `key`, replacing any previous entry in a
	/// single visible step.
	pub fn rebuild(&self, key: &str, composition: Composition<P>) -> Result<Arc<RegistryEntry<P>>, RegistryError> {
		Ok(self.begin_build(key)?.install(composition))
	}

	/// Removes the entry for `key`. Returns false if there was none.
	pub fn clear(&self, key: &str) -> bool {
		let removed = self.slot(key).is_some_and(|slot| slot.current.swap(None).is_some());
		if removed {
			debug!(key, "registry entry cleared");
		}
		removed
	}

	/// Returns the current entry for `key`, pinned for as long as the caller holds it.
	pub fn snapshot(&self, key: &str) -> Option<Arc<RegistryEntry<P>>> {
		self.slot(key)?.current.load_full()
	}

	/// Looks up the composed definition `name` in the entry for `key`.
	pub fn get(&self, key: &str, name: &str) -> Result<Arc<ComposedDefinition<P>>, RegistryError> {
		self.snapshot(key)
			.and_then(|entry| entry.get(name).cloned())
			.ok_or_else(|| RegistryError::ComponentNotFound {
				key: key.to_string(),
				name: name.to_string(),
			})
	}

	/// Returns every composed definition registered for `key`, in first-introduction order.
	///
	/// Empty if `key` has no entry.
	pub fn entries(&self, key: &str) -> Vec<Arc<ComposedDefinition<P>>> {
		self.snapshot(key).map(|entry| entry.components().cloned().collect()).unwrap_or_default()
	}

	pub fn contains(&self, key: &str) -> bool {
		self.snapshot(key).is_some()
	}

	/// Keys that currently hold an entry, sorted.
	pub fn keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self
			.slots
			.read()
			.iter()
			.filter(|(_, slot)| slot.current.load().is_some())
			.map(|(key, _)| key.clone())
			.collect();
		keys.sort_unstable();
		keys
	}

	/// Returns true while a build holds `key`.
	pub fn is_building(&self, key: &str) -> bool {
		self.slot(key).is_some_and(|slot| slot.building.load(Ordering::Acquire))
	}
}

/// Exclusive claim on one key's build slot.
pub struct BuildGuard<'a, P> {
	store: &'a RegistryStore<P>,
	key: String,
	slot: Arc<Slot<P>>,
}

impl<P: Payload> BuildGuard<'_, P> {
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Publishes `composition` as the key's new entry and releases the claim.
	pub fn install(self, composition: Composition<P>) -> Arc<RegistryEntry<P>> {
		let generation = self.store.generation.fetch_add(1, Ordering::Relaxed) + 1;
		let (order, components) = composition.into_parts();
		let entry = Arc::new(RegistryEntry {
			key: self.key.clone(),
			generation,
			order,
			components: components.into_iter().map(|(name, composed)| (name, Arc::new(composed))).collect(),
		});

		self.slot.current.store(Some(Arc::clone(&entry)));
		info!(key = %self.key, generation, components = entry.len(), "registry entry installed");
		entry
	}
}

impl<P> Drop for BuildGuard<'_, P> {
	fn drop(&mut self) {
		self.slot.building.store(false, Ordering::Release);
	}
}

#[cfg(test)]
mod tests;
