//! Detection of duplicate inputs in a descriptor.
//!
//! Within a descriptor, some test kinds must not measure the same input more
//! than once. Entries are grouped into partitions, and every input may appear
//! at most once per partition:
//!
//! - all [`WEB_CONNECTIVITY`] and [`WEB_CONNECTIVITY_V05`] entries form a
//!   single partition
//! - [`DNSCHECK`] entries form two partitions, one for entries with
//!   `HTTP3Enabled` set and one for all others, because measuring an endpoint
//!   via HTTP3 and via TCP/TLS are distinct measurements
//!
//! Entries of any other test kind are not checked. Inputs shared between
//! different partitions (e.g. the same URL in a web connectivity entry and a
//! DNS-check entry) are not duplicates either.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, info};

use crate::descriptor::{Descriptor, Entry, DNSCHECK, WEB_CONNECTIVITY, WEB_CONNECTIVITY_V05};

/// An input that appears more than once in the same partition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuplicateInput {
	/// Duplicate input of a web connectivity entry
	#[error("[web_connectivity] input {input} already present")]
	WebConnectivity {
		/// The duplicate input
		input: String,
	},
	/// Duplicate input of a DNS-check entry
	#[error("[dnscheck] input {input} already present for http3_enabled={http3_enabled}")]
	DnsCheck {
		/// The duplicate input
		input: String,
		/// The HTTP3 partition in which the input is duplicated
		http3_enabled: bool,
	},
}

impl DuplicateInput {
	/// Get the duplicate input
	#[must_use]
	pub fn input(&self) -> &str {
		match self {
			Self::WebConnectivity { input } | Self::DnsCheck { input, .. } => input,
		}
	}
}

/// The partition an entry's inputs are checked in
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PartitionKey {
	/// All web connectivity entries
	WebConnectivity,
	/// DNS-check entries with the given `HTTP3Enabled` option
	DnsCheck {
		/// The value of the entries' `HTTP3Enabled` option
		http3_enabled: bool,
	},
}

impl PartitionKey {
	/// Create the error for a duplicate `input` in this partition
	fn duplicate(self, input: &str) -> DuplicateInput {
		match self {
			Self::WebConnectivity => DuplicateInput::WebConnectivity {
				input: input.to_string(),
			},
			Self::DnsCheck { http3_enabled } => DuplicateInput::DnsCheck {
				input: input.to_string(),
				http3_enabled,
			},
		}
	}
}

/// A kind of test whose inputs must be unique
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rule {
	/// Web connectivity, in any version
	WebConnectivity,
	/// DNS-check, partitioned by HTTP3 usage
	DnsCheck,
}

impl Rule {
	/// All rules, in the order they are checked
	pub const ALL: &'static [Self] = &[Self::WebConnectivity, Self::DnsCheck];

	/// The test names this rule applies to
	#[must_use]
	pub const fn test_names(self) -> &'static [&'static str] {
		match self {
			Self::WebConnectivity => &[WEB_CONNECTIVITY, WEB_CONNECTIVITY_V05],
			Self::DnsCheck => &[DNSCHECK],
		}
	}

	/// Check whether this rule applies to `entry`
	#[must_use]
	pub fn applies_to(self, entry: &Entry) -> bool {
		entry.is_any_of(self.test_names())
	}

	/// Get the partition of `entry`, which this rule must apply to
	#[must_use]
	pub fn partition(self, entry: &Entry) -> PartitionKey {
		match self {
			Self::WebConnectivity => PartitionKey::WebConnectivity,
			Self::DnsCheck => PartitionKey::DnsCheck {
				http3_enabled: entry.options.http3_enabled(),
			},
		}
	}

	/// Log the progress line written before `input` is checked
	fn log_check(self, key: PartitionKey, input: &str) {
		match key {
			PartitionKey::WebConnectivity => info!("[web_connectivity] checking {input}..."),
			PartitionKey::DnsCheck { http3_enabled } => {
				info!("[dnscheck] checking {input} http3_enabled={http3_enabled}...");
			}
		}

		debug!(rule = ?self, ?key, "Checking input");
	}
}

/// Checker for duplicate inputs in descriptors
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
	rules: Vec<Rule>,
}

impl Validator {
	/// Create a new validator checking the given rules, in order
	#[must_use]
	pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
		Self {
			rules: rules.into_iter().collect(),
		}
	}

	/// Check `descriptor` for duplicate inputs, stopping at the first one. The
	/// rules are checked one after the other; within a rule, entries are checked
	/// in descriptor order, and inputs in entry order.
	///
	/// # Errors
	/// Returns the first duplicate input found.
	pub fn check(&self, descriptor: &Descriptor) -> Result<(), DuplicateInput> {
		self.walk(descriptor, true).into_iter().next().map_or(Ok(()), Err)
	}

	/// Check `descriptor` for duplicate inputs, returning all of them in the
	/// same order in which [`Validator::check`] would encounter them. An input
	/// appearing `n` times in a partition is reported `n - 1` times.
	#[must_use]
	pub fn check_all(&self, descriptor: &Descriptor) -> Vec<DuplicateInput> {
		self.walk(descriptor, false)
	}

	fn walk(&self, descriptor: &Descriptor, fail_fast: bool) -> Vec<DuplicateInput> {
		let mut seen: HashMap<PartitionKey, HashSet<&str>> = HashMap::new();
		let mut duplicates = Vec::new();

		for &rule in &self.rules {
			for entry in descriptor.nettests.iter().filter(|e| rule.applies_to(e)) {
				let key = rule.partition(entry);

				for input in &entry.inputs {
					rule.log_check(key, input);

					if !seen.entry(key).or_default().insert(input) {
						duplicates.push(key.duplicate(input));

						if fail_fast {
							return duplicates;
						}
					}
				}
			}
		}

		duplicates
	}
}

impl Default for Validator {
	fn default() -> Self {
		Self::new(Rule::ALL.iter().copied())
	}
}
