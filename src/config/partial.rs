//! Configuration as seen by the user

use std::{env, ffi::OsStr, fs, io::Error as IoError, path::Path, str::FromStr};

use basic_toml::Error as TomlError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::config::{LogLevel, QuicHosts};

/// The error returned by fallible conversions into a [`Partial`]
#[derive(Debug, Error)]
pub enum IntoPartialError {
	/// Failed to parse from toml
	#[error("failed to parse from toml")]
	Toml(#[from] TomlError),
	/// Failed to parse from yaml
	#[error("failed to parse from yaml")]
	Yaml(#[from] YamlError),
	/// Failed to parse from json
	#[error("failed to parse from json")]
	Json(#[from] JsonError),
	/// Failed to read config file
	#[error("failed to read config file")]
	Io(#[from] IoError),
	/// File extension unknown, could not determine format
	#[error("file extension unknown, could not determine format")]
	UnknownExtension,
}

/// Parse the provided environment variable, returning `Some(...)` if it is
/// present, has a value, and was successfully parsed, and `None` otherwise
fn parse_env_var<T: FromStr>(key: &'static str) -> Option<T> {
	env::var(key).map_or(None, |s| s.parse().ok())
}

/// Configuration from a single source. All fields are optional, which allows
/// incremental updates to the actual [`Config`][`crate::config::Config`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Partial {
	/// Minimum level of logs to be collected/displayed
	pub log_level: Option<LogLevel>,
	/// DNS-over-HTTPS JSON API endpoint
	pub resolver: Option<String>,
	/// Hosts for which HTTP3-enabled entries are generated
	pub quic_hosts: Option<QuicHosts>,
}

impl Partial {
	/// Parse a [`Partial`] from a [toml](https://toml.io/en/) string
	///
	/// # Errors
	/// Returns a `IntoPartialError::Toml` if deserialization fails.
	pub fn from_toml(toml: &str) -> Result<Self, IntoPartialError> {
		Ok(basic_toml::from_str(toml)?)
	}

	/// Parse a [`Partial`] from a [yaml](https://yaml.org/) string
	///
	/// # Errors
	/// Returns a `IntoPartialError::Yaml` if deserialization fails.
	pub fn from_yaml(yaml: &str) -> Result<Self, IntoPartialError> {
		Ok(serde_yaml::from_str(yaml)?)
	}

	/// Parse a [`Partial`] from a [json](https://json.org/) string
	///
	/// # Errors
	/// Returns a `IntoPartialError::Json` if deserialization fails.
	pub fn from_json(json: &str) -> Result<Self, IntoPartialError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Read and parse a configuration file into a [`Partial`]. The format of
	/// the file is determined from its extension:
	/// - `*.toml` files are parsed as [toml](https://toml.io/en/)
	/// - `*.yaml` and `*.yml` files are parsed as [yaml](https://yaml.org/)
	/// - `*.json` files are parsed as [json](https://json.org/)
	///
	/// # IO
	/// This function performs synchronous file IO, and should not be used in an
	/// asynchronous context.
	///
	/// # Errors
	/// Returns an error when reading of parsing the file fails.
	#[instrument(level = "debug", ret, err)]
	pub fn from_file(path: &Path) -> Result<Self, IntoPartialError> {
		let parse = match path.extension().map(OsStr::to_str) {
			Some(Some("toml")) => Self::from_toml,
			Some(Some("yaml" | "yml")) => Self::from_yaml,
			Some(Some("json")) => Self::from_json,
			_ => return Err(IntoPartialError::UnknownExtension),
		};

		parse(&fs::read_to_string(path)?)
	}

	/// Parse environment variables with the prefix `DNSCHECK_PLAN_` into a
	/// [`Partial`]. QUIC hosts are parsed from a json list of strings.
	#[must_use]
	#[instrument(level = "debug", ret)]
	pub fn from_env_vars() -> Self {
		let quic_hosts = env::var("DNSCHECK_PLAN_QUIC_HOSTS")
			.map_or(None, |s| {
				serde_json::from_str(&s)
					.map_err(|err| {
						warn!(
							%err,
							"Error parsing configuration from environment variable 'DNSCHECK_PLAN_QUIC_HOSTS'"
						);
					})
					.ok()
			})
			.flatten();

		Self {
			log_level: parse_env_var("DNSCHECK_PLAN_LOG_LEVEL"),
			resolver: parse_env_var("DNSCHECK_PLAN_RESOLVER"),
			quic_hosts,
		}
	}
}
