//! Error taxonomy for ordering, composition and lookup.

/// Every failure surfaced by this crate.
///
/// Build errors (`CyclicDependency` through `ForeignDefinition`) are fatal to the build
/// that raised them; the previously installed entry for the key stays in place. Lookup and
/// contention errors are recoverable and meant for local handling by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	/// The module dependency graph contains at least one cycle.
	#[error("cyclic module dependency among: {}", modules.join(", "))]
	CyclicDependency {
		/// Modules on (or between) the cycles, sorted by name.
		modules: Vec<String>,
	},

	/// A module depends on a module that is not part of the build.
	#[error("module {module:?} depends on {dependency:?}, which is not available")]
	MissingDependency { module: String, dependency: String },

	/// Two modules in the same build share a name.
	#[error("duplicate module {name:?}")]
	DuplicateModule { name: String },

	/// A definition inherits from a component no earlier definition introduced.
	#[error("component {component:?} in module {module:?} inherits unknown component {base:?}")]
	UnknownBaseComponent {
		component: String,
		base: String,
		module: String,
	},

	/// A collector returned a definition owned by another module.
	#[error("component {component:?} declares owner {declared:?} but was collected for module {module:?}")]
	ForeignDefinition {
		component: String,
		declared: String,
		module: String,
	},

	/// The entry for `key` has no component called `name` (or `key` has no entry).
	#[error("component {name:?} is not registered for {key:?}")]
	ComponentNotFound { key: String, name: String },

	/// Another build currently holds `key`.
	#[error("a build is already in progress for {key:?}")]
	BuildInProgress { key: String },
}

impl RegistryError {
	/// Returns true for errors the caller is expected to handle locally.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::ComponentNotFound { .. } | Self::BuildInProgress { .. })
	}
}
