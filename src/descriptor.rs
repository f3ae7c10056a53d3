//! The descriptor data model shared by the entry generator and the duplicate
//! validator.
//!
//! A [`Descriptor`] is the plan for one measurement run, holding a list of
//! [`Entry`]s (called `nettests` in JSON). Each entry names the test kind it
//! runs, the inputs it measures, and a set of test-specific options. The JSON
//! field names match the ones used by OONI Run v2 descriptors:
//!
//! ```json
//! {"inputs": ["https://dns.google/dns-query"], "options": {"DefaultAddrs": "8.8.8.8", "HTTP3Enabled": false}, "test_name": "dnscheck"}
//! ```

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::{ser::PrettyFormatter, Map, Serializer, Value};

/// Test name of DNS-check entries
pub const DNSCHECK: &str = "dnscheck";

/// Test name of (unversioned) web connectivity entries
pub const WEB_CONNECTIVITY: &str = "web_connectivity";

/// Test name of web connectivity v0.5 entries. These share their inputs'
/// uniqueness domain with [`WEB_CONNECTIVITY`].
pub const WEB_CONNECTIVITY_V05: &str = "web_connectivity@v0.5";

/// Option key holding a DNS-check entry's space-separated fallback addresses
pub const DEFAULT_ADDRS: &str = "DefaultAddrs";

/// Option key holding whether a DNS-check entry uses HTTP3
pub const HTTP3_ENABLED: &str = "HTTP3Enabled";

/// An assembled descriptor. Only `nettests` is interpreted, any other
/// top-level keys (name, description, author, ...) are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
	/// All entries, in the order they were contributed
	pub nettests: Vec<Entry>,
}

impl Descriptor {
	/// Parse a descriptor from a json string
	///
	/// # Errors
	/// Returns an error if the string is not a valid descriptor.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}

impl From<Vec<Entry>> for Descriptor {
	fn from(nettests: Vec<Entry>) -> Self {
		Self { nettests }
	}
}

/// A single test entry of a [`Descriptor`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
	/// The inputs this entry measures. Generated entries always have exactly
	/// one input, but entries from other producers may have any number.
	#[serde(default)]
	pub inputs: Vec<String>,
	/// Test-specific options
	#[serde(default)]
	pub options: Options,
	/// The test kind, e.g. [`DNSCHECK`]
	pub test_name: String,
}

impl Entry {
	/// Create a new DNS-check entry for a single `input` URL
	#[must_use]
	pub fn dnscheck(input: impl Into<String>, default_addrs: &str, http3_enabled: bool) -> Self {
		Self {
			inputs: vec![input.into()],
			options: Options::dnscheck(default_addrs, http3_enabled),
			test_name: DNSCHECK.to_string(),
		}
	}

	/// Check whether this entry's `test_name` is one of `names`
	#[must_use]
	pub fn is_any_of(&self, names: &[&str]) -> bool {
		names.contains(&self.test_name.as_str())
	}
}

/// The options of an [`Entry`]. This is an open json object, because entries
/// of kinds other than DNS-check carry options unknown to this crate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(pub Map<String, Value>);

impl Options {
	/// Create the options of a DNS-check entry
	#[must_use]
	pub fn dnscheck(default_addrs: &str, http3_enabled: bool) -> Self {
		let mut map = Map::new();
		map.insert(
			DEFAULT_ADDRS.to_string(),
			Value::String(default_addrs.to_string()),
		);
		map.insert(HTTP3_ENABLED.to_string(), Value::Bool(http3_enabled));
		Self(map)
	}

	/// The `DefaultAddrs` option, if present and a string
	#[must_use]
	pub fn default_addrs(&self) -> Option<&str> {
		self.0.get(DEFAULT_ADDRS).and_then(Value::as_str)
	}

	/// The `HTTP3Enabled` option. An absent option, `null`, `0`, `""`, `[]`,
	/// and `{}` count as `false`, any other non-boolean value as `true`.
	#[must_use]
	pub fn http3_enabled(&self) -> bool {
		match self.0.get(HTTP3_ENABLED) {
			None | Some(Value::Null) => false,
			Some(Value::Bool(b)) => *b,
			Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
			Some(Value::String(s)) => !s.is_empty(),
			Some(Value::Array(a)) => !a.is_empty(),
			Some(Value::Object(o)) => !o.is_empty(),
		}
	}
}

/// Write `value` as json to `writer`, pretty-printed with an indentation of 4
/// spaces and followed by a newline
///
/// # Errors
/// Returns an error if serialization or writing fails.
pub fn write_pretty<W: Write, T: Serialize + ?Sized>(
	mut writer: W,
	value: &T,
) -> Result<(), serde_json::Error> {
	let mut serializer =
		Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
	value.serialize(&mut serializer)?;
	writer.write_all(b"\n").map_err(serde_json::Error::io)
}
