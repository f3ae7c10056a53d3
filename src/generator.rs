//! Generation of DNS-check descriptor entries from endpoint URLs.
//!
//! Every endpoint URL (e.g. `https://dns.google/dns-query` or
//! `tls://9.9.9.9:853`) results in one [`DNSCHECK`][`crate::descriptor::DNSCHECK`]
//! entry with `HTTP3Enabled` set to `false`. If the URL's scheme is `https` and
//! its host is one of the configured [`QuicHosts`], a second, otherwise
//! identical entry with `HTTP3Enabled` set to `true` follows it.
//!
//! Each entry's `DefaultAddrs` option holds the addresses the endpoint's
//! hostname resolves to (see [`resolve_default_addrs`]), so that the endpoint
//! can still be measured if the system resolver is censored. Endpoints whose
//! host is an IP address literal get an empty `DefaultAddrs` instead, without
//! any lookups.

use std::net::IpAddr;

use thiserror::Error;
use tracing::{debug, instrument};
use uriparse::{Authority, Host, Scheme};

use crate::{
	config::QuicHosts,
	descriptor::Entry,
	resolver::{resolve_default_addrs, Lookup, ResolveError},
};

/// The error returned when entries for an endpoint URL can not be generated
#[derive(Debug, Error)]
pub enum GenerateError {
	/// The URL's authority (host, port, and user info) could not be parsed
	#[error("\"{0}\" is not a valid url")]
	InvalidUrl(String),
	/// The URL has no (or an empty) host
	#[error("url \"{0}\" has no hostname")]
	MissingHost(String),
	/// The default addresses of the URL's hostname could not be resolved
	#[error("could not resolve default addresses of \"{hostname}\"")]
	Resolve {
		/// The hostname that was being resolved
		hostname: String,
		/// The underlying lookup error
		#[source]
		source: ResolveError,
	},
}

/// The parts of an endpoint URL relevant for entry generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
	/// The lowercase URL scheme, e.g. `https` or `tls`
	pub scheme: String,
	/// The lowercase hostname, or the IP address (without brackets for IPv6)
	pub hostname: String,
	/// Whether the host is an IP address literal
	pub is_ip_literal: bool,
}

impl Endpoint {
	/// Parse an endpoint URL. Only the scheme and the authority need to be
	/// valid, the rest of the URL (e.g. a `{?dns}` template in the path) is
	/// ignored.
	///
	/// # Errors
	/// Returns an error if the URL's authority is invalid or it doesn't have a
	/// host.
	pub fn parse(url: &str) -> Result<Self, GenerateError> {
		let (scheme, rest) = split_scheme(url);

		let scheme = scheme
			.map(|scheme| scheme.as_str().to_ascii_lowercase())
			.unwrap_or_default();

		let authority = rest
			.strip_prefix("//")
			.map(|rest| rest.find(['/', '?', '#']).map_or(rest, |end| &rest[..end]))
			.filter(|authority| !authority.is_empty())
			.ok_or_else(|| GenerateError::MissingHost(url.to_string()))?;

		let mut authority =
			Authority::try_from(authority).map_err(|_| GenerateError::InvalidUrl(url.to_string()))?;
		authority.normalize();

		let (hostname, is_ip_literal) = match authority.host() {
			Host::IPv4Address(addr) => (addr.to_string(), true),
			Host::IPv6Address(addr) => (addr.to_string(), true),
			Host::RegisteredName(name) if !name.as_str().is_empty() => {
				let name = name.as_str().to_ascii_lowercase();
				let is_ip = name.parse::<IpAddr>().is_ok();
				(name, is_ip)
			}
			_ => return Err(GenerateError::MissingHost(url.to_string())),
		};

		Ok(Self {
			scheme,
			hostname,
			is_ip_literal,
		})
	}
}

/// Split `url` into its scheme (if it has a valid one) and everything after
/// the scheme's `:`
fn split_scheme(url: &str) -> (Option<Scheme<'_>>, &str) {
	url.split_once(':')
		.and_then(|(scheme, rest)| Some((Scheme::try_from(scheme).ok()?, rest)))
		.map_or((None, url), |(scheme, rest)| (Some(scheme), rest))
}

/// Generator of DNS-check entries. Each call to [`Generator::generate`]
/// performs fresh lookups, nothing is cached between URLs.
#[derive(Debug)]
pub struct Generator<L> {
	lookup: L,
	quic_hosts: QuicHosts,
}

impl<L: Lookup> Generator<L> {
	/// Create a new generator resolving hostnames using `lookup`, and
	/// generating HTTP3-enabled entries for `https` endpoints on `quic_hosts`
	#[must_use]
	pub const fn new(lookup: L, quic_hosts: QuicHosts) -> Self {
		Self { lookup, quic_hosts }
	}

	/// Check whether an additional HTTP3-enabled entry is generated for
	/// `endpoint`
	#[must_use]
	pub fn supports_http3(&self, endpoint: &Endpoint) -> bool {
		endpoint.scheme == "https" && self.quic_hosts.contains(&endpoint.hostname)
	}

	/// Generate the entries for one endpoint URL. The returned list contains
	/// the plain entry first, followed by the HTTP3-enabled one if the endpoint
	/// supports it.
	///
	/// # Errors
	/// Returns an error if the URL can not be parsed or its default addresses
	/// can not be resolved.
	#[instrument(level = "debug", skip(self))]
	pub async fn generate(&self, url: &str) -> Result<Vec<Entry>, GenerateError> {
		let endpoint = Endpoint::parse(url)?;

		let default_addrs = if endpoint.is_ip_literal {
			String::new()
		} else {
			resolve_default_addrs(&self.lookup, &endpoint.hostname)
				.await
				.map_err(|source| GenerateError::Resolve {
					hostname: endpoint.hostname.clone(),
					source,
				})?
		};

		let mut entries = vec![Entry::dnscheck(url, &default_addrs, false)];

		if self.supports_http3(&endpoint) {
			entries.push(Entry::dnscheck(url, &default_addrs, true));
		}

		debug!(?endpoint, %default_addrs, entries = entries.len(), "Entries generated");

		Ok(entries)
	}

	/// Generate the entries for all `urls`, one after the other, in order
	///
	/// # Errors
	/// Returns the first error encountered. No entries are returned in that
	/// case, and the remaining URLs are not processed.
	pub async fn generate_all<I, S>(&self, urls: I) -> Result<Vec<Entry>, GenerateError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut entries = Vec::new();

		for url in urls {
			entries.extend(self.generate(url.as_ref()).await?);
		}

		Ok(entries)
	}
}

/// Split the contents of a URL list file into URLs. Every line is trimmed,
/// and empty lines are skipped.
#[must_use]
pub fn read_urls(text: &str) -> Vec<&str> {
	text.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.collect()
}
