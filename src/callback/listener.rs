//! Transient local HTTPS listener that captures one authorization redirect.
//!
//! The listener is a scoped resource: binding, the generated certificate, and
//! the accepted socket all live inside [`CallbackListener::capture`], so every
//! exit path (success, timeout, error) tears the listener down and drops the
//! key material with it.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::{
	io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
	net::{TcpListener, TcpStream},
	time,
};
use tokio_rustls::{
	TlsAcceptor,
	rustls::{
		ServerConfig,
		pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer},
	},
	server::TlsStream,
};
// self
use crate::{
	_prelude::*,
	callback::CallbackResult,
	error::{ConfigError, OAuthError, TransportError},
};

const SUCCESS_PAGE: &str = "<html>\
<body>\
<h1>Authentication Successful!</h1>\
<p>You can close this window and return to your application.</p>\
<script>setTimeout(() => window.close(), 5000);</script>\
</body>\
</html>";
const ERROR_PAGE: &str = "<html>\
<body>\
<h1>Authentication Error</h1>\
<p>The authorization redirect was missing required parameters or carried a provider error.</p>\
<p>You can close this window and try again.</p>\
<script>setTimeout(() => window.close(), 10000);</script>\
</body>\
</html>";

/// One-shot HTTPS listener bound to the registered redirect host/port.
#[derive(Clone, Debug)]
pub struct CallbackListener {
	host: String,
	port: u16,
	path: String,
	timeout: StdDuration,
}
impl CallbackListener {
	/// Derives the listener parameters from the registered redirect URI.
	///
	/// The redirect must use HTTPS and carry a host; the port defaults to 8080
	/// when the URI leaves it implicit.
	pub fn for_redirect(redirect_uri: &Url, timeout: StdDuration) -> Result<Self, ConfigError> {
		if redirect_uri.scheme() != "https" {
			return Err(ConfigError::RedirectNotHttps {
				scheme: redirect_uri.scheme().to_owned(),
			});
		}

		let host = redirect_uri.host_str().ok_or(ConfigError::MissingRedirectHost)?.to_owned();
		let port = redirect_uri.port().unwrap_or(8080);
		let path = redirect_uri.path().to_owned();

		Ok(Self { host, port, path, timeout })
	}

	/// Waits for the provider's redirect and returns its parsed parameters.
	///
	/// Accepts exactly one request matching the callback path; unrelated probes
	/// (favicon fetches, certificate warm-ups) get a 404 and the wait continues.
	/// The wait is bounded: exceeding the timeout resolves to
	/// [`OAuthError::FlowTimeout`] after the listener is torn down.
	pub async fn capture(&self) -> Result<CallbackResult> {
		let listener = TcpListener::bind((self.host.as_str(), self.port))
			.await
			.map_err(TransportError::Io)?;
		let acceptor = TlsAcceptor::from(Arc::new(self.tls_config()?));
		let capture = self.accept_matching(&listener, &acceptor);

		match time::timeout(self.timeout, capture).await {
			Ok(result) => result,
			Err(_) => Err(OAuthError::FlowTimeout { waited: self.timeout.as_secs() }.into()),
		}
	}

	fn tls_config(&self) -> Result<ServerConfig, ConfigError> {
		let certified = rcgen::generate_simple_self_signed(vec![self.host.clone()])
			.map_err(ConfigError::tls)?;
		let cert = certified.cert.der().clone();
		let key =
			PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

		ServerConfig::builder()
			.with_no_client_auth()
			.with_single_cert(vec![cert], key)
			.map_err(ConfigError::tls)
	}

	async fn accept_matching(
		&self,
		listener: &TcpListener,
		acceptor: &TlsAcceptor,
	) -> Result<CallbackResult> {
		loop {
			let (stream, _peer) = listener.accept().await.map_err(TransportError::Io)?;
			// Browsers abort the first handshake while the user inspects the
			// self-signed certificate warning; keep accepting.
			let Ok(tls) = acceptor.accept(stream).await else { continue };
			let mut tls = tls;
			let Ok(target) = read_request_target(&mut tls).await else { continue };
			let Some(query) = self.match_callback(&target) else {
				let _ = respond(&mut tls, "404 Not Found", "").await;

				continue;
			};
			let result = parse_query(&query);
			let page = if result.is_grant() { SUCCESS_PAGE } else { ERROR_PAGE };
			let status = if result.is_grant() { "200 OK" } else { "400 Bad Request" };

			respond(&mut tls, status, page).await?;

			return Ok(result);
		}
	}

	/// Returns the query string when the request target matches the callback path.
	fn match_callback(&self, target: &str) -> Option<String> {
		let (path, query) = match target.split_once('?') {
			Some((path, query)) => (path, query),
			None => (target, ""),
		};

		(path == self.path).then(|| query.to_owned())
	}
}

/// Reads the HTTP request line and drains the headers, returning the target.
async fn read_request_target(tls: &mut TlsStream<TcpStream>) -> Result<String> {
	let mut reader = BufReader::new(tls);
	let mut request_line = String::new();

	reader.read_line(&mut request_line).await.map_err(TransportError::Io)?;

	let target = request_line
		.split_whitespace()
		.nth(1)
		.ok_or_else(|| {
			TransportError::Io(std::io::Error::new(
				std::io::ErrorKind::InvalidData,
				"Malformed HTTP request line on callback listener.",
			))
		})?
		.to_owned();

	loop {
		let mut header = String::new();
		let read = reader.read_line(&mut header).await.map_err(TransportError::Io)?;

		if read == 0 || header.trim().is_empty() {
			break;
		}
	}

	Ok(target)
}

fn parse_query(query: &str) -> CallbackResult {
	let mut result =
		CallbackResult { code: None, state: None, error: None, error_description: None };

	for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
		match key.as_ref() {
			"code" => result.code = Some(value.into_owned()),
			"state" => result.state = Some(value.into_owned()),
			"error" => result.error = Some(value.into_owned()),
			"error_description" => result.error_description = Some(value.into_owned()),
			_ => {},
		}
	}

	result
}

async fn respond(tls: &mut TlsStream<TcpStream>, status: &str, body: &str) -> Result<()> {
	let response = format!(
		"HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
		body.len(),
	);

	tls.write_all(response.as_bytes()).await.map_err(TransportError::Io)?;
	tls.shutdown().await.map_err(TransportError::Io)?;

	// Drain anything the peer already sent so the close is clean.
	let mut sink = [0_u8; 64];
	let _ = tls.read(&mut sink).await;

	Ok(())
}
