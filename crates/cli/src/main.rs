//! Weave command line.
//!
//! Loads a manifest file or directory, then orders, builds or inspects the registry it
//! describes under one isolation key.

mod cli;

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use weave_manifest::Manifest;
use weave_registry::{ComponentBuilder, RegistryStore};

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	init_tracing(cli.verbose)?;

	let stdout = std::io::stdout();
	run(&cli, &mut stdout.lock())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
	};

	let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).finish();
	tracing::subscriber::set_global_default(subscriber).context("failed to install tracing subscriber")?;
	Ok(())
}

fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
	let path = cli.command.path();
	let manifest = Manifest::load_path(path).with_context(|| format!("failed to load manifest {}", path.display()))?;
	let modules = manifest.modules();

	let store = RegistryStore::new();
	let mut builder = ComponentBuilder::new(&store);
	if let Some(anchor) = manifest.anchor() {
		builder = builder.anchor(anchor);
	}

	match &cli.command {
		Command::Order { .. } => {
			for name in builder.order(&modules)?.names() {
				writeln!(out, "{name}")?;
			}
		}
		Command::Build { .. } => {
			let report = builder.build(&cli.key, &modules, &manifest)?;
			for component in store.entries(&cli.key) {
				writeln!(out, "{}: {}", component.name(), component.modules().join(", "))?;
			}
			for (component, earlier, later) in report.unrelated_overrides() {
				writeln!(out, "warning: {component} is extended by unrelated modules {earlier} and {later}; {later} wins")?;
			}
		}
		Command::Show { component, .. } => {
			builder.build(&cli.key, &modules, &manifest)?;
			let composed = store.get(&cli.key, component)?;
			writeln!(out, "{}", serde_json::to_string_pretty(composed.payload())?)?;
		}
	}
	Ok(())
}
