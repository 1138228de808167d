//! Module manifests.
//!
//! A manifest is a TOML document listing modules, their dependencies and install state,
//! and the component definitions each module contributes. A loaded [`Manifest`] is both
//! the module source and the [`DefinitionCollector`] of a build.
//!
//! ```toml
//! anchor = "base"
//!
//! [[modules]]
//! name = "base"
//!
//! [[modules.components]]
//! name = "Partner"
//! payload = { active = true }
//!
//! [[modules]]
//! name = "shop"
//! depends = ["base"]
//! state = "to-upgrade"
//!
//! [[modules.components]]
//! name = "Partner"
//! inherits = "Partner"
//! payload = { customer = true }
//! ```

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use weave_registry::{DefinitionCollector, InstallState, Module, RawDefinition};

/// Manifest loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse {origin}: {source}")]
	Parse {
		/// File path, or `<inline>` for in-memory sources.
		origin: String,
		#[source]
		source: toml::de::Error,
	},

	#[error("module {name:?} is declared more than once")]
	DuplicateModule { name: String },
}

/// A component definition contributed by a module.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
	pub name: String,
	#[serde(default)]
	pub inherits: Option<String>,
	/// Defaults to the declaration index within the module.
	#[serde(default)]
	pub sequence: Option<u32>,
	#[serde(default = "empty_payload")]
	pub payload: Value,
}

fn empty_payload() -> Value {
	Value::Object(Default::default())
}

/// A module record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
	pub name: String,
	#[serde(default)]
	pub depends: Vec<String>,
	#[serde(default)]
	pub state: InstallState,
	#[serde(default)]
	pub components: Vec<ComponentSpec>,
}

impl ModuleSpec {
	pub fn to_module(&self) -> Module {
		Module::new(self.name.clone(), self.depends.iter().cloned()).with_state(self.state)
	}

	fn definitions(&self) -> Vec<RawDefinition<Value>> {
		self.components
			.iter()
			.enumerate()
			.map(|(index, spec)| RawDefinition {
				name: spec.name.clone(),
				inherits: spec.inherits.clone(),
				module: self.name.clone(),
				payload: spec.payload.clone(),
				sequence: spec.sequence.unwrap_or_else(|| default_sequence(index)),
			})
			.collect()
	}
}

/// Declaration index as a sequence number, saturating at `u32::MAX`.
fn default_sequence(index: usize) -> u32 {
	u32::try_from(index).unwrap_or(u32::MAX)
}

/// A set of module records, from one or more TOML documents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
	#[serde(default)]
	anchor: Option<String>,
	#[serde(default)]
	modules: Vec<ModuleSpec>,
}

impl Manifest {
	/// Parses a manifest from TOML source.
	pub fn from_toml(src: &str) -> Result<Self, ManifestError> {
		Self::parse(src, "<inline>".to_string())
	}

	fn parse(src: &str, origin: String) -> Result<Self, ManifestError> {
		let manifest: Self = toml::from_str(src).map_err(|source| ManifestError::Parse { origin, source })?;
		manifest.check_unique()?;
		Ok(manifest)
	}

	fn check_unique(&self) -> Result<(), ManifestError> {
		let mut seen = FxHashSet::default();
		for module in &self.modules {
			if !seen.insert(module.name.as_str()) {
				return Err(ManifestError::DuplicateModule { name: module.name.clone() });
			}
		}
		Ok(())
	}

	/// Loads a single manifest file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
		let path = path.as_ref();
		let src = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let manifest = Self::parse(&src, path.display().to_string())?;
		debug!(path = %path.display(), modules = manifest.modules.len(), "manifest loaded");
		Ok(manifest)
	}

	/// Loads and merges every `*.toml` file in `dir`, in file name order.
	pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ManifestError> {
		let dir = dir.as_ref();
		let io_err = |source: std::io::Error| ManifestError::Io {
			path: dir.to_path_buf(),
			source,
		};

		let mut paths = Vec::new();
		for entry in std::fs::read_dir(dir).map_err(io_err)? {
			let path = entry.map_err(io_err)?.path();
			if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
				paths.push(path);
			}
		}
		paths.sort();

		let mut manifest = Self::default();
		for path in &paths {
			manifest.merge(Self::load(path)?)?;
		}
		debug!(dir = %dir.display(), files = paths.len(), modules = manifest.modules.len(), "manifest directory loaded");
		Ok(manifest)
	}

	/// Loads `path` as a directory of manifests or as a single manifest file.
	pub fn load_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
		let path = path.as_ref();
		if path.is_dir() { Self::load_dir(path) } else { Self::load(path) }
	}

	/// Appends the modules of `other`. An anchor set in `other` replaces this one.
	pub fn merge(&mut self, other: Manifest) -> Result<(), ManifestError> {
		for module in &other.modules {
			if self.module(&module.name).is_some() {
				return Err(ManifestError::DuplicateModule { name: module.name.clone() });
			}
		}
		if other.anchor.is_some() {
			self.anchor = other.anchor;
		}
		self.modules.extend(other.modules);
		Ok(())
	}

	pub fn anchor(&self) -> Option<&str> {
		self.anchor.as_deref()
	}

	pub fn module(&self, name: &str) -> Option<&ModuleSpec> {
		self.modules.iter().find(|m| m.name == name)
	}

	/// Module records in declaration order.
	pub fn module_specs(&self) -> &[ModuleSpec] {
		&self.modules
	}

	/// Modules as supplied to a build.
	pub fn modules(&self) -> Vec<Module> {
		self.modules.iter().map(ModuleSpec::to_module).collect()
	}
}

impl DefinitionCollector for Manifest {
	type Payload = Value;

	fn definitions_for(&self, module: &Module) -> Vec<RawDefinition<Value>> {
		self.module(module.name()).map(ModuleSpec::definitions).unwrap_or_default()
	}
}
