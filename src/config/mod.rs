//! Configuration handling for the `dnscheck` and `rejectdups` tools
//!
//! Both tools currently accept the following configuration options:
//!
//! - `log_level` - Tracing log level. Possible values: `trace`, `debug`,
//!   `verbose`, `info`, `warn`, `error`. **Default `info`**. The progress
//!   lines written before each DoH lookup and each duplicate check are logged
//!   at `info`, so `warn` and `error` hide them.
//! - `resolver` - The DNS-over-HTTPS JSON API endpoint used to look up the
//!   default addresses of endpoint hostnames. Queried with the `name` and
//!   `type` query parameters. **Default `https://dns.google/resolve`**.
//! - `quic_hosts` - A list of hostnames and IP addresses known to support
//!   DNS-over-HTTP3. `https` endpoints on these hosts get an additional
//!   HTTP3-enabled entry. **Default the Google and Cloudflare public
//!   resolvers** (see [`QuicHosts`]).
//!
//! Options are read from built-in defaults, environment variables (with the
//! `DNSCHECK_PLAN_` prefix, e.g. `DNSCHECK_PLAN_LOG_LEVEL`), a configuration
//! file, and command-line arguments, in that order, with later sources
//! overwriting earlier ones.

mod partial;

use std::{
	collections::BTreeSet,
	fmt::{Display, Formatter, Result as FmtResult},
	path::Path,
};

use serde::{Deserialize, Serialize};
use strum::{Display as EnumDisplay, EnumString};
use tracing::{debug, instrument, warn, Level};

pub use self::partial::{IntoPartialError, Partial};

/// The default DNS-over-HTTPS JSON API endpoint
pub const DEFAULT_RESOLVER: &str = "https://dns.google/resolve";

/// Resolved configuration of the `dnscheck` and `rejectdups` tools. Built from
/// defaults, which are then updated from one or more [`Partial`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
	/// Minimum level of logs to be collected/displayed
	pub log_level: LogLevel,
	/// DNS-over-HTTPS JSON API endpoint
	pub resolver: String,
	/// Hosts for which HTTP3-enabled entries are generated
	pub quic_hosts: QuicHosts,
}

impl Config {
	/// Load the configuration. This starts with defaults for each option, then
	/// updates those from environment variables, then from the config `file`
	/// (if any), and finally from the partial configuration parsed from
	/// command-line arguments (`args`). If the config file can not be read or
	/// parsed, a warning is logged and the other sources are still used.
	///
	/// # IO
	/// This function performs synchronous file IO, and should therefore not be
	/// used inside of an asynchronous context.
	#[must_use]
	#[instrument(level = "debug", skip(args))]
	pub fn load(file: Option<&Path>, args: &Partial) -> Self {
		let mut config = Self::default();

		config.update_from_partial(&Partial::from_env_vars());

		if let Some(file) = file {
			match Partial::from_file(file) {
				Ok(partial) => config.update_from_partial(&partial),
				Err(err) => warn!("Could not read configuration from file: {err}"),
			}
		}

		config.update_from_partial(args);

		debug!(?config, "Configuration loaded");

		config
	}

	/// Update the config from a [`Partial`]. This overwrites all fields of this
	/// [`Config`] which are set in that partial config.
	pub fn update_from_partial(&mut self, partial: &Partial) {
		if let Some(log_level) = partial.log_level {
			self.log_level = log_level;
		}

		if let Some(ref resolver) = partial.resolver {
			self.resolver.clone_from(resolver);
		}

		if let Some(ref quic_hosts) = partial.quic_hosts {
			self.quic_hosts = quic_hosts.clone();
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			log_level: LogLevel::default(),
			resolver: DEFAULT_RESOLVER.to_string(),
			quic_hosts: QuicHosts::default(),
		}
	}
}

impl Display for Config {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		fmt.debug_struct("Config")
			.field("log_level", &self.log_level.to_string())
			.field("resolver", &self.resolver)
			.field("quic_hosts", &self.quic_hosts.to_string())
			.finish()
	}
}

/// The set of hosts (hostnames and IP address literals) known to support QUIC,
/// for which an additional HTTP3-enabled DNS-check entry is generated. This is
/// a static allow-list, not a probed capability, and can not be modified once
/// created. Hostnames are compared case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct QuicHosts(BTreeSet<String>);

impl QuicHosts {
	/// Hosts supporting QUIC by default, i.e. Google's and Cloudflare's public
	/// DNS resolvers
	pub const DEFAULT: &'static [&'static str] = &[
		"dns.google",
		"8.8.8.8",
		"cloudflare-dns.com",
		"1.1.1.1",
		"1.0.0.1",
		"family.cloudflare-dns.com",
		"1dot1dot1dot1.cloudflare-dns.com",
	];

	/// Check whether `host` is in this set
	#[must_use]
	pub fn contains(&self, host: &str) -> bool {
		self.0.contains(&host.to_ascii_lowercase())
	}

	/// Get the number of hosts in this set
	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Check whether this set is empty
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Default for QuicHosts {
	fn default() -> Self {
		Self::DEFAULT.iter().copied().collect()
	}
}

impl<S: AsRef<str>> FromIterator<S> for QuicHosts {
	fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
		Self(
			iter.into_iter()
				.map(|host| host.as_ref().to_ascii_lowercase())
				.collect(),
		)
	}
}

impl From<Vec<String>> for QuicHosts {
	fn from(hosts: Vec<String>) -> Self {
		hosts.into_iter().collect()
	}
}

impl From<QuicHosts> for Vec<String> {
	fn from(hosts: QuicHosts) -> Self {
		hosts.0.into_iter().collect()
	}
}

impl Display for QuicHosts {
	fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
		fmt.write_str(&self.0.iter().map(String::as_str).collect::<Vec<_>>().join(", "))
	}
}

/// The log level used. Can be converted to the [`tracing`] crate's
/// [`Level`]. Also includes a custom [`Verbose`][`LogLevel::Verbose`] between
/// debug and info.
#[derive(
	Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, EnumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogLevel {
	/// Lowest log level. Log everything, including very verbose debug/trace
	/// info, such as full DoH responses.
	Trace,
	/// Log most things, including more verbose debug info from dependencies.
	Debug,
	/// Logs more verbose information (`debug`-level or higher) from this crate,
	/// while only logging `info`-level or higher information from
	/// dependencies.
	Verbose,
	/// Recommended log level. Logs progress lines, warnings, and errors.
	#[default]
	Info,
	/// Log only warnings and errors. This hides the progress lines written
	/// before each lookup or check.
	Warn,
	/// Log only critical errors
	Error,
}

impl From<LogLevel> for Level {
	fn from(log_level: LogLevel) -> Self {
		match log_level {
			LogLevel::Trace => Level::TRACE,
			LogLevel::Debug => Level::DEBUG,
			LogLevel::Verbose | LogLevel::Info => Level::INFO,
			LogLevel::Warn => Level::WARN,
			LogLevel::Error => Level::ERROR,
		}
	}
}
