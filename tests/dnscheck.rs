//! End to end tests of the `dnscheck` entry generator

mod util;

use dnscheck_plan::descriptor::{Descriptor, Entry};
use util::{run_dnscheck, start_doh_server, write_fixture, UNREACHABLE_RESOLVER};

const GOOGLE: &[(&str, &str, &str)] = &[
	(
		"dns.google",
		"A",
		r#"{"Status": 0, "Answer": [{"name": "dns.google.", "type": 1, "TTL": 300, "data": "8.8.8.8"}]}"#,
	),
	(
		"dns.google",
		"AAAA",
		r#"{"Status": 0, "Answer": [{"name": "dns.google.", "type": 28, "TTL": 300, "data": "2001:4860:4860::8888"}]}"#,
	),
	(
		"www.example.com",
		"A",
		r#"{"Status": 0, "Answer": [{"name": "www.example.com.", "type": 5, "TTL": 300, "data": "example.com."}, {"name": "example.com.", "type": 1, "TTL": 300, "data": "192.0.2.1"}]}"#,
	),
];

fn entries(stdout: &[u8]) -> Vec<Entry> {
	serde_json::from_slice(stdout).unwrap()
}

/// IP literals are not resolved, so an unreachable resolver doesn't matter
#[test]
fn ip_literals() {
	let urls = write_fixture(
		"dnscheck-ip_literals.txt",
		"https://1.1.1.1/dns-query\n\n  tls://9.9.9.9:853  \n",
	);

	let out = run_dnscheck([
		urls.to_str().unwrap(),
		"--resolver",
		UNREACHABLE_RESOLVER,
	]);

	assert!(out.status.success());
	assert_eq!(
		String::from_utf8(out.stdout).unwrap(),
		r#"[
    {
        "inputs": [
            "https://1.1.1.1/dns-query"
        ],
        "options": {
            "DefaultAddrs": "",
            "HTTP3Enabled": false
        },
        "test_name": "dnscheck"
    },
    {
        "inputs": [
            "https://1.1.1.1/dns-query"
        ],
        "options": {
            "DefaultAddrs": "",
            "HTTP3Enabled": true
        },
        "test_name": "dnscheck"
    },
    {
        "inputs": [
            "tls://9.9.9.9:853"
        ],
        "options": {
            "DefaultAddrs": "",
            "HTTP3Enabled": false
        },
        "test_name": "dnscheck"
    }
]
"#
	);
}

#[test]
fn resolves_hostnames() {
	let (resolver, _terminator) = start_doh_server(GOOGLE);
	let urls = write_fixture(
		"dnscheck-resolves_hostnames.txt",
		"https://dns.google/dns-query\ntls://www.example.com:853\n",
	);

	let out = run_dnscheck([urls.to_str().unwrap(), "--resolver", resolver.as_str()]);

	assert!(out.status.success());
	assert_eq!(entries(&out.stdout), vec![
		Entry::dnscheck(
			"https://dns.google/dns-query",
			"8.8.8.8 2001:4860:4860::8888",
			false
		),
		Entry::dnscheck(
			"https://dns.google/dns-query",
			"8.8.8.8 2001:4860:4860::8888",
			true
		),
		Entry::dnscheck("tls://www.example.com:853", "192.0.2.1", false),
	]);

	let stderr = String::from_utf8(out.stderr).unwrap();
	assert!(stderr.contains("DNS: lookup http://127.0.0.1:"));
	assert!(stderr.contains("/resolve?name=dns.google&type=A..."));
	assert!(stderr.contains("/resolve?name=dns.google&type=AAAA..."));
}

// Only the host of an endpoint matters, the rest of the url is copied as-is
#[test]
fn url_templates() {
	let (resolver, _terminator) = start_doh_server(GOOGLE);
	let urls = write_fixture(
		"dnscheck-url_templates.txt",
		"https://dns.google/dns-query{?dns}\nhttps://1.1.1.1/dns query\n",
	);

	let out = run_dnscheck([urls.to_str().unwrap(), "--resolver", resolver.as_str()]);

	assert!(out.status.success());
	assert_eq!(entries(&out.stdout), vec![
		Entry::dnscheck(
			"https://dns.google/dns-query{?dns}",
			"8.8.8.8 2001:4860:4860::8888",
			false
		),
		Entry::dnscheck(
			"https://dns.google/dns-query{?dns}",
			"8.8.8.8 2001:4860:4860::8888",
			true
		),
		Entry::dnscheck("https://1.1.1.1/dns query", "", false),
		Entry::dnscheck("https://1.1.1.1/dns query", "", true),
	]);
}

// Responses without an `Answer` field count as having no answers
#[test]
fn nxdomain() {
	let (resolver, _terminator) = start_doh_server(GOOGLE);
	let urls = write_fixture("dnscheck-nxdomain.txt", "https://nx.example.com/dns-query\n");

	let out = run_dnscheck([urls.to_str().unwrap(), "--resolver", resolver.as_str()]);

	assert!(out.status.success());
	assert_eq!(entries(&out.stdout), vec![Entry::dnscheck(
		"https://nx.example.com/dns-query",
		"",
		false
	)]);
}

#[test]
fn resolver_failure() {
	let urls = write_fixture(
		"dnscheck-resolver_failure.txt",
		"https://1.1.1.1/dns-query\nhttps://dns.google/dns-query\n",
	);

	let out = run_dnscheck([
		urls.to_str().unwrap(),
		"--resolver",
		UNREACHABLE_RESOLVER,
	]);

	assert!(!out.status.success());
	assert!(out.stdout.is_empty());
	assert_re!(
		r#"^Error: could not resolve default addresses of "dns.google"$"#,
		String::from_utf8(out.stderr).unwrap()
	);
}

#[test]
fn descriptor_output() {
	let urls = write_fixture("dnscheck-descriptor_output.txt", "tls://1.1.1.1:853\n");

	let out = run_dnscheck([
		urls.to_str().unwrap(),
		"--descriptor",
		"--resolver",
		UNREACHABLE_RESOLVER,
	]);

	assert!(out.status.success());
	assert_eq!(
		serde_json::from_slice::<Descriptor>(&out.stdout).unwrap(),
		Descriptor::from(vec![Entry::dnscheck("tls://1.1.1.1:853", "", false)])
	);
}

#[test]
fn quic_hosts_from_config() {
	let config = write_fixture(
		"dnscheck-quic_hosts_from_config.toml",
		"quic_hosts = [\"9.9.9.9\"]\n",
	);
	let urls = write_fixture(
		"dnscheck-quic_hosts_from_config.txt",
		"https://9.9.9.9/dns-query\nhttps://1.1.1.1/dns-query\n",
	);

	let out = run_dnscheck([
		urls.to_str().unwrap(),
		"--config",
		config.to_str().unwrap(),
		"--resolver",
		UNREACHABLE_RESOLVER,
	]);

	assert!(out.status.success());
	assert_eq!(
		entries(&out.stdout)
			.iter()
			.map(|e| (e.inputs[0].as_str(), e.options.http3_enabled()))
			.collect::<Vec<_>>(),
		vec![
			("https://9.9.9.9/dns-query", false),
			("https://9.9.9.9/dns-query", true),
			("https://1.1.1.1/dns-query", false),
		]
	);
}

#[test]
fn quic_hosts_from_args() {
	let urls = write_fixture("dnscheck-quic_hosts_from_args.txt", "https://1.1.1.1/dns-query\n");

	let out = run_dnscheck([
		urls.to_str().unwrap(),
		"--quic-hosts",
		"[]",
		"--resolver",
		UNREACHABLE_RESOLVER,
	]);

	assert!(out.status.success());
	assert_eq!(entries(&out.stdout).len(), 1);
}

#[test]
fn empty_file() {
	let urls = write_fixture("dnscheck-empty_file.txt", "\n\n");

	let out = run_dnscheck([urls.to_str().unwrap()]);

	assert!(out.status.success());
	assert_eq!(String::from_utf8(out.stdout).unwrap(), "[]\n");
}

#[test]
fn usage() {
	let out = run_dnscheck(Vec::<&str>::new());

	assert_eq!(out.status.code(), Some(2));
	assert!(out.stdout.is_empty());
	assert!(String::from_utf8(out.stderr).unwrap().contains("Usage"));

	let out = run_dnscheck(["a.txt", "b.txt"]);

	assert_eq!(out.status.code(), Some(2));
}

#[test]
fn missing_file() {
	let out = run_dnscheck(["/this/file/does/not/exist.txt"]);

	assert!(!out.status.success());
	assert!(String::from_utf8(out.stderr)
		.unwrap()
		.contains("could not read url list"));
}

#[test]
fn version() {
	let out = run_dnscheck(["--version"]);

	assert!(out.status.success());
	assert_eq!(
		String::from_utf8(out.stdout).unwrap(),
		format!("dnscheck {}\n", env!("CARGO_PKG_VERSION"))
	);
}
