//! Miscellaneous statics and utilities used throughout dnscheck-plan.

use tracing::{subscriber::SetGlobalDefaultError, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::DynFilterFn, prelude::*, FmtSubscriber};

use crate::config::LogLevel;

/// A string representation of this crate's version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The `User-Agent` sent with DNS-over-HTTPS requests. Currently this is
/// `dnscheck-plan/[version]`.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Module path prefixes which count as this crate's own code for the
/// [`Verbose`][`LogLevel::Verbose`] log level
const OWN_MODULES: &[&str] = &["dnscheck_plan", "dnscheck", "rejectdups"];

/// Install the global tracing subscriber, writing logs of at least
/// `log_level` to stderr. Stdout is left free for the tools' json output. The
/// returned guard must be held for as long as logs should be written, dropping
/// it flushes all remaining logs.
///
/// # Errors
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing(log_level: LogLevel) -> Result<WorkerGuard, SetGlobalDefaultError> {
	let tracing_filter = DynFilterFn::new(move |metadata, _| {
		let level = metadata.level();
		if log_level == LogLevel::Verbose {
			level <= &Level::INFO
				|| (metadata.module_path().is_some_and(|module| {
					OWN_MODULES
						.iter()
						.any(|own| module == *own || module.starts_with(&format!("{own}::")))
				}) && level <= &Level::DEBUG)
		} else {
			level <= &Level::from(log_level)
		}
	});

	let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
	let tracing_subscriber = FmtSubscriber::builder()
		.with_level(true)
		.with_max_level(Level::TRACE)
		.with_writer(non_blocking)
		.finish()
		.with(tracing_filter);

	tracing::subscriber::set_global_default(tracing_subscriber)?;

	Ok(guard)
}
