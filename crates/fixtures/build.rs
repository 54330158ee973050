//! Runs the mapping compiler over `mapweave.toml` and writes the result to `OUT_DIR`.

use std::error::Error;
use std::path::PathBuf;
use std::{env, fs};

use mapweave_compiler::{Compiler, config};

fn main() -> Result<(), Box<dyn Error>> {
	let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
	let out_dir = PathBuf::from(env::var("OUT_DIR")?);

	let config_path = manifest_dir.join("mapweave.toml");
	println!("cargo:rerun-if-changed={}", config_path.display());
	let config = config::load(&config_path)?;

	let types = config
		.types
		.as_deref()
		.ok_or("mapweave.toml names no type catalog")?;
	println!("cargo:rerun-if-changed={}", types.display());
	let catalog = config::load_catalog(types)?;

	for file in Compiler::new(&catalog).generate(&config.generation)? {
		let name = file
			.path
			.file_name()
			.ok_or("generated file path has no file name")?;
		fs::write(out_dir.join(name), file.contents)?;
	}
	Ok(())
}
