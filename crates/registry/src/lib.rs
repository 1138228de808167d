//! Dependency-ordered component composition.
//!
//! Modules contribute partial component definitions. A build orders the participating
//! modules by their dependencies, folds every contribution to a component name into one
//! composed definition, and publishes the result into a [`RegistryStore`] under an
//! isolation key (a tenant, a database, ...).
//!
//! # Pipeline
//!
//! 1. [`ModuleGraph`] produces a deterministic [`LoadOrder`] (dependencies first).
//! 2. A [`DefinitionCollector`] yields each module's [`RawDefinition`]s, in load order.
//! 3. [`ComponentComposer`] folds them into a [`Composition`].
//! 4. [`RegistryStore`] swaps the composition in as the key's new [`RegistryEntry`].
//!
//! [`ComponentBuilder`] runs the whole pipeline for one key.
//!
//! # Precedence Contract
//!
//! For every component, contributions are layered in load order, then in declaration
//! order within a module. The later layer wins on direct conflicts, so a dependent
//! module overrides the modules it depends on. Modules with no dependency path between
//! them fall back to the load order tie-break (module name, anchor first).

pub mod build;
pub mod collect;
pub mod compose;
pub mod error;
pub mod graph;
pub mod module;
pub mod payload;
pub mod store;

pub use build::{BuildReport, ComponentBuilder};
pub use collect::{DefinitionCollector, StaticCollector};
pub use compose::{ComponentComposer, ComposedDefinition, Composition, Override};
pub use error::RegistryError;
pub use graph::{LoadOrder, ModuleGraph};
pub use module::{InstallState, Module, RawDefinition};
pub use payload::Payload;
pub use store::{BuildGuard, RegistryEntry, RegistryStore};
