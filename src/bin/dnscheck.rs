//! # dnscheck
//!
//! Generates `dnscheck` entries for a descriptor from a list of DoH/DoT
//! endpoint URLs. The file given as the only positional argument contains one
//! endpoint URL per line, blank lines are ignored. The generated entries are
//! written to stdout as a json array (or, with `--descriptor`, as a complete
//! `{"nettests": [...]}` descriptor), while progress and errors are logged to
//! stderr.
//!
//! Hostnames of endpoints are resolved one after the other via DNS-over-HTTPS
//! to fill in the entries' `DefaultAddrs`. Any lookup failure aborts the whole
//! run, because an entry without the correct default addresses would produce
//! misleading measurements.

use std::{fs, io, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use dnscheck_plan::{
	config::{Config, LogLevel, Partial, QuicHosts},
	descriptor::{write_pretty, Descriptor},
	generator::{read_urls, Generator},
	resolver::DohClient,
	util::{init_tracing, VERSION},
};
use tokio::runtime::Builder;
use tracing::{debug, info};
use tracing_subscriber::FmtSubscriber;

/// Generate dnscheck descriptor entries from a list of DoH/DoT endpoint URLs
#[derive(Debug, Parser)]
#[command(name = "dnscheck", version = VERSION, about)]
struct Args {
	/// File containing one endpoint URL per line
	file: PathBuf,
	/// Configuration file (toml, yaml, or json)
	#[arg(short, long)]
	config: Option<PathBuf>,
	/// Minimum log level (trace, debug, verbose, info, warn, error). Progress
	/// lines are logged at info, and hidden by warn and error.
	#[arg(long)]
	log_level: Option<LogLevel>,
	/// DNS-over-HTTPS json API endpoint used to resolve hostnames
	#[arg(long)]
	resolver: Option<String>,
	/// Json list of hosts supporting DNS-over-HTTP3
	#[arg(long, value_parser = parse_quic_hosts)]
	quic_hosts: Option<QuicHosts>,
	/// Output a complete descriptor instead of just the list of entries
	#[arg(long)]
	descriptor: bool,
}

impl Args {
	/// Get the configuration set via command-line arguments
	fn partial(&self) -> Partial {
		Partial {
			log_level: self.log_level,
			resolver: self.resolver.clone(),
			quic_hosts: self.quic_hosts.clone(),
		}
	}
}

fn parse_quic_hosts(s: &str) -> Result<QuicHosts, serde_json::Error> {
	serde_json::from_str(s)
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Show configuration warnings before the configured subscriber is set up
	let startup_subscriber = FmtSubscriber::builder()
		.with_level(true)
		.with_writer(io::stderr)
		.finish();
	let config = tracing::subscriber::with_default(startup_subscriber, || {
		Config::load(args.config.as_deref(), &args.partial())
	});

	let _tracing_guard = init_tracing(config.log_level)?;

	debug!(%config, "Configuration loaded");

	let urls = fs::read_to_string(&args.file)
		.with_context(|| format!("could not read url list {}", args.file.display()))?;
	let urls = read_urls(&urls);

	info!("Generating entries for {} endpoints", urls.len());

	let rt = Builder::new_current_thread()
		.enable_all()
		.build()
		.context("async runtime initialization")?;

	let generator = Generator::new(DohClient::new(config.resolver)?, config.quic_hosts);
	let entries = rt.block_on(generator.generate_all(urls))?;

	let stdout = io::stdout().lock();
	if args.descriptor {
		write_pretty(stdout, &Descriptor::from(entries))?;
	} else {
		write_pretty(stdout, &entries)?;
	}

	Ok(())
}
