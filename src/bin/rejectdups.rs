//! # rejectdups
//!
//! Checks a descriptor (a json file in the form of `{"nettests": [...]}`) for
//! inputs measured more than once by the same kind of test. Web connectivity
//! entries (in any version) must not share inputs, and neither may DNS-check
//! entries with the same `HTTP3Enabled` setting. Exits with a non-zero status
//! at the first duplicate found, or after reporting all of them with `--all`.

use std::{fs, io, path::PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use dnscheck_plan::{
	config::{Config, LogLevel, Partial},
	descriptor::Descriptor,
	util::{init_tracing, VERSION},
	validator::Validator,
};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Reject descriptors which measure the same input more than once
#[derive(Debug, Parser)]
#[command(name = "rejectdups", version = VERSION, about)]
struct Args {
	/// Descriptor json file
	file: PathBuf,
	/// Configuration file (toml, yaml, or json)
	#[arg(short, long)]
	config: Option<PathBuf>,
	/// Minimum log level (trace, debug, verbose, info, warn, error). Progress
	/// lines are logged at info, and hidden by warn and error.
	#[arg(long)]
	log_level: Option<LogLevel>,
	/// Report all duplicate inputs instead of stopping at the first one
	#[arg(long)]
	all: bool,
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let startup_subscriber = FmtSubscriber::builder()
		.with_level(true)
		.with_writer(io::stderr)
		.finish();
	let config = tracing::subscriber::with_default(startup_subscriber, || {
		Config::load(args.config.as_deref(), &Partial {
			log_level: args.log_level,
			..Default::default()
		})
	});

	let _tracing_guard = init_tracing(config.log_level)?;

	debug!(%config, "Configuration loaded");

	let descriptor = fs::read_to_string(&args.file)
		.with_context(|| format!("could not read descriptor {}", args.file.display()))?;
	let descriptor = Descriptor::from_json(&descriptor)
		.with_context(|| format!("invalid descriptor {}", args.file.display()))?;

	let validator = Validator::default();

	if args.all {
		let duplicates = validator.check_all(&descriptor);

		for duplicate in &duplicates {
			error!("{duplicate}");
		}

		if let Some(first) = duplicates.first() {
			bail!("{} duplicate inputs found, first: {first}", duplicates.len());
		}
	} else {
		validator.check(&descriptor)?;
	}

	info!(
		"No duplicate inputs in {} entries",
		descriptor.nettests.len()
	);

	Ok(())
}
