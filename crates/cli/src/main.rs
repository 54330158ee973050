//! `mapweave` command line driver.
//!
//! Loads `mapweave.toml` and its type catalog, runs the mapping compiler and writes every
//! generated file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use mapweave_compiler::{Compiler, config};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mapweave")]
#[command(about = "Generate Rust mapping code from a mapweave configuration")]
#[command(version)]
struct Cli {
	/// Configuration file
	#[arg(short, long, value_name = "PATH", default_value = "mapweave.toml", global = true)]
	config: PathBuf,

	/// Only log errors
	#[arg(short, long, global = true, conflicts_with = "verbose")]
	quiet: bool,

	/// Debug logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
	/// Generate every mapping unit and the registry bootstrap (default)
	Generate,
	/// Run the compiler without writing any file
	Check,
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose, cli.quiet);

	let write = cli.command.unwrap_or(Command::Generate) == Command::Generate;
	run(&cli.config, write)
}

fn run(path: &Path, write: bool) -> anyhow::Result<()> {
	let config = config::load(path)?;
	let Some(types) = &config.types else {
		bail!("{} names no type catalog; set `types = \"<path>\"`", path.display());
	};
	let catalog = config::load_catalog(types)?;
	let files = Compiler::new(&catalog)
		.generate(&config.generation)
		.with_context(|| format!("generating from {}", path.display()))?;

	if !write {
		info!(files = files.len(), "configuration is valid");
		return Ok(());
	}
	for file in &files {
		if let Some(parent) = file.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			fs::create_dir_all(parent)
				.with_context(|| format!("creating {}", parent.display()))?;
		}
		fs::write(&file.path, &file.contents)
			.with_context(|| format!("writing {}", file.path.display()))?;
		info!(path = %file.path.display(), module = %file.module, "wrote generated file");
	}
	Ok(())
}

fn setup_tracing(verbose: bool, quiet: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = std::env::var("MAPWEAVE_LOG")
		.ok()
		.map(EnvFilter::new)
		.or_else(|| EnvFilter::try_from_default_env().ok())
		.unwrap_or_else(|| {
			EnvFilter::new(match (quiet, verbose) {
				(true, _) => "error",
				(_, true) => "mapweave=debug,mapweave_compiler=debug",
				_ => "info",
			})
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(verbose)
		.with_writer(std::io::stderr)
		.init();
}
