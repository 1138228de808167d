use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "weave")]
#[command(about = "Compose component registries from module manifests")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Debug logging (overrides RUST_LOG)
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Isolation key the registry is built under
	#[arg(long, global = true, value_name = "KEY", default_value = "default")]
	pub key: String,

	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print the module load order, one module per line
	Order {
		/// Manifest file or directory of manifests
		path: PathBuf,
	},
	/// Build the registry and list each component with its contributing modules
	Build {
		/// Manifest file or directory of manifests
		path: PathBuf,
	},
	/// Build the registry and print one component's composed payload as JSON
	Show {
		/// Manifest file or directory of manifests
		path: PathBuf,
		/// Component name
		component: String,
	},
}

impl Command {
	pub fn path(&self) -> &Path {
		match self {
			Self::Order { path } | Self::Build { path } | Self::Show { path, .. } => path,
		}
	}
}
