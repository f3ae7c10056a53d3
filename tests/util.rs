//! Utilities for end-to-end tests of the `dnscheck` and `rejectdups` tools

use std::{
	ffi::OsStr,
	fs,
	path::PathBuf,
	process::{Command, Output},
	thread,
};

use tokio::{
	io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
	net::{TcpListener, TcpStream},
	runtime::Builder,
	sync::oneshot,
};

/// A DoH json API endpoint which refuses all connections
#[allow(dead_code)] // False positive, this is used in tests, just not *all* of them
pub const UNREACHABLE_RESOLVER: &str = "http://127.0.0.1:9/resolve";

/// Run a function automatically on drop. The provided function can only be
/// called once (either with `call()` or automatically on drop).
#[must_use]
#[allow(dead_code)] // False positive, this is used in tests, just not *all* of them
pub struct Terminator<F: FnOnce()>(Option<F>);

#[allow(dead_code)] // False positive, this is used in tests, just not *all* of them
impl<F: FnOnce()> Terminator<F> {
	pub fn new(f: F) -> Self {
		Self(Some(f))
	}

	pub fn call(&mut self) {
		if let Some(f) = self.0.take() {
			f()
		}
	}
}

impl<F: FnOnce()> Drop for Terminator<F> {
	fn drop(&mut self) {
		self.call();
	}
}

/// Write `contents` to a new file named `name` in the test temp directory,
/// returning its path
#[allow(dead_code)] // False positive, this function is used in tests, just not *all* of them
pub fn write_fixture(name: &str, contents: &str) -> PathBuf {
	let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
	fs::write(&path, contents).unwrap();
	path
}

/// Start a minimal DNS-over-HTTPS json API server (over plain HTTP) in the
/// background. `records` maps a `(name, type)` query to the json response
/// body, all other queries get an NXDOMAIN response without answers. Returns
/// the server's `/resolve` endpoint URL. To stop the server call or drop the
/// returned function. Panics on any error.
#[allow(dead_code)] // False positive, this function is used in tests, just not *all* of them
pub fn start_doh_server(
	records: &'static [(&'static str, &'static str, &'static str)],
) -> (String, Terminator<impl FnOnce()>) {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	listener.set_nonblocking(true).unwrap();
	let addr = listener.local_addr().unwrap();
	let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

	let server = thread::spawn(move || {
		let rt = Builder::new_current_thread().enable_all().build().unwrap();

		rt.block_on(async move {
			let listener = TcpListener::from_std(listener).unwrap();

			loop {
				tokio::select! {
					_ = &mut stop_rx => break,
					res = listener.accept() => {
						if let Ok((stream, _)) = res {
							tokio::spawn(respond(stream, records));
						}
					}
				}
			}
		});
	});

	let terminator = Terminator::new(move || {
		let _ = stop_tx.send(());
		server.join().expect("could not stop DoH server");
	});

	(format!("http://{addr}/resolve"), terminator)
}

/// Answer a single DoH json API request
#[allow(dead_code)] // False positive, this function is used in tests, just not *all* of them
async fn respond(stream: TcpStream, records: &'static [(&'static str, &'static str, &'static str)]) {
	let (reader, mut writer) = stream.into_split();
	let mut lines = BufReader::new(reader).lines();

	let Ok(Some(request_line)) = lines.next_line().await else {
		return;
	};

	while let Ok(Some(header)) = lines.next_line().await {
		if header.trim().is_empty() {
			break;
		}
	}

	let path = request_line.split_whitespace().nth(1).unwrap_or_default();
	let query = path.split_once('?').map_or("", |(_, query)| query);
	let param = |key: &str| {
		query
			.split('&')
			.filter_map(|pair| pair.split_once('='))
			.find(|(k, _)| *k == key)
			.map_or("", |(_, v)| v)
	};

	let body = records
		.iter()
		.find(|(name, rtype, _)| *name == param("name") && *rtype == param("type"))
		.map_or(r#"{"Status": 3}"#, |(_, _, body)| *body);

	let response = format!(
		"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: \
		 {}\r\nConnection: close\r\n\r\n{body}",
		body.len()
	);

	writer.write_all(response.as_bytes()).await.unwrap();
	writer.shutdown().await.unwrap();
}

/// Run the `dnscheck` tool with the provided arguments. No configuration from
/// environment variables will be used. Panics if the tool can not be run.
#[allow(dead_code)] // False positive, this function is used in tests, just not *all* of them
pub fn run_dnscheck(args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Output {
	run(env!("CARGO_BIN_EXE_dnscheck"), args)
}

/// Run the `rejectdups` tool with the provided arguments. No configuration
/// from environment variables will be used. Panics if the tool can not be run.
#[allow(dead_code)] // False positive, this function is used in tests, just not *all* of them
pub fn run_rejectdups(args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Output {
	run(env!("CARGO_BIN_EXE_rejectdups"), args)
}

fn run(bin: &str, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Output {
	let mut cmd = Command::new(bin);
	cmd.args(args)
		.env_remove("DNSCHECK_PLAN_LOG_LEVEL")
		.env_remove("DNSCHECK_PLAN_RESOLVER")
		.env_remove("DNSCHECK_PLAN_QUIC_HOSTS")
		.env_remove("HTTP_PROXY")
		.env_remove("http_proxy")
		.env_remove("HTTPS_PROXY")
		.env_remove("https_proxy")
		.env_remove("ALL_PROXY")
		.env_remove("all_proxy")
		.env("NO_COLOR", "1");

	cmd.output().unwrap()
}

#[macro_export]
macro_rules! assert_re {
	($re:literal, $m:expr) => {
		let re: &'static str = $re;
		let message_owned = $m;
		let message: &str = message_owned.as_ref();
		let regex = regex::RegexBuilder::new(re)
			.case_insensitive(false)
			.dot_matches_new_line(false)
			.ignore_whitespace(false)
			.multi_line(true)
			.octal(false)
			.unicode(true)
			.build()
			.unwrap();

		assert!(dbg!(regex).is_match(dbg!(message.trim())));
	};
}
