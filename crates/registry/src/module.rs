//! Module and raw definition records supplied by the module source.

use serde::{Deserialize, Serialize};

/// Installation state of a module as reported by the metadata store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallState {
	NotInstalled,
	#[default]
	Installed,
	ToUpgrade,
	ToUpdate,
}

impl InstallState {
	/// Returns true if modules in this state take part in a build.
	pub const fn participates(self) -> bool {
		!matches!(self, Self::NotInstalled)
	}
}

impl std::fmt::Display for InstallState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::NotInstalled => write!(f, "not-installed"),
			Self::Installed => write!(f, "installed"),
			Self::ToUpgrade => write!(f, "to-upgrade"),
			Self::ToUpdate => write!(f, "to-update"),
		}
	}
}

/// A deployable unit with declared dependencies on other modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module {
	name: String,
	/// Sorted, deduplicated.
	dependencies: Vec<String>,
	state: InstallState,
}

impl Module {
	/// Creates an installed module.
	pub fn new<I, S>(name: impl Into<String>, dependencies: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut dependencies: Vec<String> = dependencies.into_iter().map(Into::into).collect();
		dependencies.sort_unstable();
		dependencies.dedup();
		Self {
			name: name.into(),
			dependencies,
			state: InstallState::Installed,
		}
	}

	/// Creates an installed module without dependencies.
	pub fn leaf(name: impl Into<String>) -> Self {
		Self::new(name, std::iter::empty::<String>())
	}

	pub fn with_state(mut self, state: InstallState) -> Self {
		self.state = state;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn dependencies(&self) -> &[String] {
		&self.dependencies
	}

	pub fn state(&self) -> InstallState {
		self.state
	}

	pub fn participates(&self) -> bool {
		self.state.participates()
	}
}

/// One module's contribution toward a component's final definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDefinition<P> {
	pub name: String,
	/// Component this definition extends, if any.
	pub inherits: Option<String>,
	/// Owning module.
	pub module: String,
	pub payload: P,
	/// Declaration order within the owning module.
	pub sequence: u32,
}

impl<P> RawDefinition<P> {
	/// Creates a definition introducing (or directly extending) `name`.
	pub fn new(module: impl Into<String>, name: impl Into<String>, payload: P) -> Self {
		Self {
			name: name.into(),
			inherits: None,
			module: module.into(),
			payload,
			sequence: 0,
		}
	}

	/// Marks this definition as extending `base`.
	pub fn inherits(mut self, base: impl Into<String>) -> Self {
		self.inherits = Some(base.into());
		self
	}

	pub fn sequence(mut self, sequence: u32) -> Self {
		self.sequence = sequence;
		self
	}

	/// Returns true if this definition extends a component other than its own name.
	pub fn is_prototype(&self) -> bool {
		self.inherits.as_deref().is_some_and(|base| base != self.name)
	}
}
