//! Shared fixtures for integration tests: client wiring against mock servers,
//! token cache seeding, and a small scripted server for response sequences
//! that header-based matchers cannot distinguish.

// Not every test file uses every fixture.
#![allow(dead_code)]

// std
use std::{
	env,
	net::SocketAddr,
	path::{Path, PathBuf},
	process,
	sync::{Arc, Mutex},
};
// crates.io
use fitbit_client::{
	FitbitClient,
	auth::{ScopeSet, TokenSet},
	config::{ClientConfig, Endpoints, FlowMode},
	url::Url,
};
use time::{Duration, OffsetDateTime};
use tokio::{
	io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
	net::TcpListener,
};

pub const CLIENT_ID: &str = "client-it";
pub const CLIENT_SECRET: &str = "secret-it";
pub const REDIRECT_URI: &str = "https://localhost:8080/callback";

/// Client configuration pointed at a mock server base URL, manual flow mode.
pub fn test_config(base: &Url) -> ClientConfig {
	let endpoints = Endpoints::rooted_at(base).expect("Mock endpoints fixture should build.");

	ClientConfig::new(CLIENT_ID, CLIENT_SECRET, REDIRECT_URI)
		.with_scope(ScopeSet::new(["activity", "sleep"]).expect("Test scope should be valid."))
		.with_flow_mode(FlowMode::Manual)
		.with_endpoints(endpoints)
}

/// Client wired to a mock server with the manual flow mode.
pub fn build_test_client(base: &Url) -> FitbitClient {
	FitbitClient::new(test_config(base)).expect("Test client fixture should build.")
}

/// Builds a token set that stays live for the given duration (negative for an
/// already-expired one).
pub fn test_token(access: &str, expires_in: Duration) -> TokenSet {
	let scope =
		ScopeSet::new(["activity", "sleep"]).expect("Test scope fixture should be valid.");

	TokenSet::builder(scope)
		.access_token(access)
		.refresh_token(format!("{access}-refresh"))
		.issued_at(OffsetDateTime::now_utc() - Duration::hours(1))
		.expires_at(OffsetDateTime::now_utc() + expires_in)
		.build()
		.expect("Test token fixture should build.")
}

/// A unique temp path for a token cache file.
pub fn temp_cache_path(tag: &str) -> PathBuf {
	let unique = format!(
		"fitbit_client_it_{tag}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	);

	env::temp_dir().join(unique)
}

/// Writes a token set to a cache file the client can load at startup.
pub fn seed_cache(path: &Path, token: &TokenSet) {
	let serialized =
		serde_json::to_string_pretty(token).expect("Token fixture should serialize.");

	std::fs::write(path, serialized).expect("Seeding the token cache should succeed.");
}

/// One canned response served by [`ScriptedServer`].
pub struct ScriptedResponse {
	pub status: u16,
	pub headers: Vec<(String, String)>,
	pub body: String,
}
impl ScriptedResponse {
	pub fn new(status: u16) -> Self {
		Self { status, headers: Vec::new(), body: String::new() }
	}

	pub fn header(mut self, name: &str, value: &str) -> Self {
		self.headers.push((name.to_owned(), value.to_owned()));

		self
	}

	pub fn json(mut self, body: &str) -> Self {
		self.headers.push(("Content-Type".into(), "application/json".into()));
		self.body = body.to_owned();

		self
	}
}

/// Minimal HTTP server that serves a fixed response sequence, one connection
/// per response, recording each request head + body.
pub struct ScriptedServer {
	addr: SocketAddr,
	requests: Arc<Mutex<Vec<String>>>,
}
impl ScriptedServer {
	pub async fn start(responses: Vec<ScriptedResponse>) -> Self {
		let listener =
			TcpListener::bind("127.0.0.1:0").await.expect("Scripted server should bind.");
		let addr = listener.local_addr().expect("Scripted server should expose its address.");
		let requests = Arc::new(Mutex::new(Vec::new()));
		let recorded = requests.clone();

		tokio::spawn(async move {
			for response in responses {
				let Ok((mut stream, _)) = listener.accept().await else { break };
				let Ok(request) = read_request(&mut stream).await else { break };

				recorded.lock().expect("Request log lock should not be poisoned.").push(request);

				let mut payload = format!(
					"HTTP/1.1 {} Scripted\r\nConnection: close\r\nContent-Length: {}\r\n",
					response.status,
					response.body.len(),
				);

				for (name, value) in &response.headers {
					payload.push_str(&format!("{name}: {value}\r\n"));
				}

				payload.push_str("\r\n");
				payload.push_str(&response.body);

				let _ = stream.write_all(payload.as_bytes()).await;
				let _ = stream.shutdown().await;
			}
		});

		Self { addr, requests }
	}

	pub fn base_url(&self) -> Url {
		Url::parse(&format!("http://{}", self.addr)).expect("Scripted base URL should parse.")
	}

	/// Request heads + bodies in arrival order.
	pub fn received(&self) -> Vec<String> {
		self.requests.lock().expect("Request log lock should not be poisoned.").clone()
	}
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> std::io::Result<String> {
	let mut reader = BufReader::new(stream);
	let mut head = String::new();
	let mut content_length = 0_usize;

	loop {
		let mut line = String::new();
		let read = reader.read_line(&mut line).await?;

		if read == 0 {
			break;
		}
		if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
			content_length = value.trim().parse().unwrap_or(0);
		}

		let done = line.trim().is_empty();

		head.push_str(&line);

		if done {
			break;
		}
	}

	if content_length > 0 {
		let mut body = vec![0_u8; content_length];

		reader.read_exact(&mut body).await?;
		head.push_str(&String::from_utf8_lossy(&body));
	}

	Ok(head)
}
