//! Resolution of endpoint hostnames to their default addresses.
//!
//! Hostnames are looked up using a DNS-over-HTTPS JSON API (like the one at
//! `https://dns.google/resolve`), once for `A` and once for `AAAA` records.
//! The resulting default address set is a space-separated list of all `A`
//! record addresses, followed by all `AAAA` record addresses, each in the
//! order returned by the resolver.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use strum::{Display as EnumDisplay, EnumString};
use thiserror::Error;
use tracing::{debug, info, instrument, trace};

use crate::util::USER_AGENT;

/// The error returned when a DNS-over-HTTPS lookup fails
#[derive(Debug, Error)]
pub enum ResolveError {
	/// The request could not be sent, or the server returned an error status
	#[error("DoH request failed")]
	Http(#[from] reqwest::Error),
	/// The response body is not a valid DoH json response
	#[error("invalid DoH response")]
	Json(#[from] serde_json::Error),
}

/// The DNS record types used for default address resolution
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, EnumDisplay)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
	/// IPv4 address record
	A,
	/// IPv6 address record
	AAAA,
}

impl RecordType {
	/// The numeric RR type code of this record type
	#[must_use]
	pub const fn code(self) -> u16 {
		match self {
			Self::A => 1,
			Self::AAAA => 28,
		}
	}
}

/// A single answer record of a DoH json response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
	/// The numeric RR type code
	#[serde(rename = "type")]
	pub record_type: u16,
	/// The record data, e.g. an IP address for `A` and `AAAA` records
	pub data: String,
}

impl Answer {
	/// Create a new answer
	#[must_use]
	pub fn new(record_type: u16, data: impl Into<String>) -> Self {
		Self {
			record_type,
			data: data.into(),
		}
	}
}

/// A DoH json response. Only the parts used here are parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohResponse {
	/// The DNS response code
	#[serde(rename = "Status", default)]
	pub status: Option<u32>,
	/// All answer records. Responses without answers (e.g. for NXDOMAIN) often
	/// lack this field completely, which is treated the same as an empty list.
	#[serde(rename = "Answer", default)]
	pub answer: Vec<Answer>,
}

/// A way to perform a single DNS lookup
#[async_trait]
pub trait Lookup: Send + Sync {
	/// Look up records of type `record_type` for `name`, returning all answer
	/// records from the response. The answers may include records of other
	/// types (e.g. `CNAME`s), which callers need to filter out themselves.
	///
	/// # Errors
	/// Returns an error if the lookup could not be completed.
	async fn lookup(
		&self,
		name: &str,
		record_type: RecordType,
	) -> Result<Vec<Answer>, ResolveError>;
}

/// A [`Lookup`] using a DNS-over-HTTPS json API
#[derive(Debug, Clone)]
pub struct DohClient {
	client: Client,
	endpoint: String,
}

impl DohClient {
	/// Create a new DoH client sending queries to `endpoint`, e.g.
	/// `https://dns.google/resolve`
	///
	/// # Errors
	/// Returns an error if the underlying http client could not be initialized.
	pub fn new(endpoint: impl Into<String>) -> Result<Self, ResolveError> {
		let client = Client::builder().user_agent(USER_AGENT).build()?;

		Ok(Self {
			client,
			endpoint: endpoint.into(),
		})
	}
}

#[async_trait]
impl Lookup for DohClient {
	#[instrument(level = "debug", skip(self), err)]
	async fn lookup(
		&self,
		name: &str,
		record_type: RecordType,
	) -> Result<Vec<Answer>, ResolveError> {
		let record_type_name = record_type.to_string();
		let request = self
			.client
			.get(&self.endpoint)
			.query(&[("name", name), ("type", record_type_name.as_str())])
			.build()?;

		info!("DNS: lookup {}...", request.url());

		let body = self
			.client
			.execute(request)
			.await?
			.error_for_status()?
			.bytes()
			.await?;

		let response: DohResponse = serde_json::from_slice(&body)?;
		trace!(?response, "DoH response received");

		if response.answer.is_empty() {
			debug!(
				name,
				%record_type,
				status = ?response.status,
				"DoH response has no answers"
			);
		}

		Ok(response.answer)
	}
}

/// Resolve the default address set of `hostname`, which must not be an IP
/// address literal. Returns the addresses from all matching `A` answers,
/// followed by the ones from all matching `AAAA` answers, separated by single
/// spaces, or an empty string if there are none. Lookups are performed one
/// after the other.
///
/// # Errors
/// Returns an error if any of the lookups fail. No partial result is returned
/// in that case.
#[instrument(level = "debug", skip(lookup), ret, err)]
pub async fn resolve_default_addrs(
	lookup: &impl Lookup,
	hostname: &str,
) -> Result<String, ResolveError> {
	let mut addrs = Vec::new();

	for record_type in [RecordType::A, RecordType::AAAA] {
		let answers = lookup.lookup(hostname, record_type).await?;

		addrs.extend(
			answers
				.into_iter()
				.filter(|answer| answer.record_type == record_type.code())
				.map(|answer| answer.data),
		);
	}

	Ok(addrs.join(" "))
}
