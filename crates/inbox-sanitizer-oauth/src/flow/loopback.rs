//! Loopback redirect receiver for installed applications (RFC 8252 §7.3).
//!
//! Binds a listener on `127.0.0.1`, hands out the matching redirect URI and
//! waits for the browser to deliver the authorization response.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Longest request line or header accepted from the browser.
const MAX_LINE_LEN: usize = 8 * 1024;

/// How long to wait for the user to finish in the browser.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str =
    "<html><body><h3>Authorization complete.</h3><p>You can close this window.</p></body></html>";
const FAILURE_PAGE: &str =
    "<html><body><h3>Authorization failed.</h3><p>Return to the terminal for details.</p></body></html>";

/// One-shot HTTP listener that captures the authorization code.
#[derive(Debug)]
pub struct LoopbackReceiver {
    listener: TcpListener,
    port: u16,
    timeout: Duration,
}

impl LoopbackReceiver {
    /// Binds to `127.0.0.1:port`; port 0 picks a free ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let port = listener.local_addr()?.port();
        debug!(port, "loopback receiver listening");
        Ok(Self {
            listener,
            port,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Overrides how long [`Self::receive_code`] waits.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Redirect URI to register with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Waits for the redirect carrying `expected_state` and returns its code.
    ///
    /// Requests that carry neither a code nor an error (favicon lookups and
    /// the like) are answered with 404 and ignored. So are connections that
    /// close early or send something other than a redirect, as browsers
    /// open speculative sockets to the redirect host.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, state mismatch, user denial, or an
    /// `error` parameter from the provider.
    pub async fn receive_code(self, expected_state: &str) -> Result<String> {
        let wait = async {
            loop {
                let (mut stream, peer) = self.listener.accept().await?;
                debug!(%peer, "loopback connection");
                match serve_redirect(&mut stream, expected_state).await {
                    Ok(Some(code)) => return Ok::<_, Error>(code),
                    Ok(None) => {}
                    Err(e @ (Error::InvalidRedirect(_) | Error::Io(_))) => {
                        debug!(%peer, "ignoring loopback connection: {e}");
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        tokio::time::timeout(self.timeout, wait)
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_secs()))?
    }
}

/// Reads one HTTP request from `stream`, answers it, and extracts the code.
async fn serve_redirect<S>(stream: &mut S, expected_state: &str) -> Result<Option<String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let target = {
        let mut reader = BufReader::new(&mut *stream);
        let request_line = read_line(&mut reader).await?;
        loop {
            let header = read_line(&mut reader).await?;
            if header.trim_end().is_empty() {
                break;
            }
        }
        request_target(&request_line)?
    };

    let url = Url::parse(&format!("http://127.0.0.1{target}"))
        .map_err(|e| Error::InvalidRedirect(e.to_string()))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = String::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = value.into_owned(),
            _ => {}
        }
    }

    if let Some(error) = error {
        respond(stream, "400 Bad Request", FAILURE_PAGE).await?;
        warn!(%error, "authorization rejected by provider");
        return Err(if error == "access_denied" {
            Error::AccessDenied
        } else {
            Error::oauth_error(error, description)
        });
    }

    let Some(code) = code else {
        respond(stream, "404 Not Found", "").await?;
        return Ok(None);
    };

    if state.as_deref() != Some(expected_state) {
        respond(stream, "400 Bad Request", FAILURE_PAGE).await?;
        return Err(Error::StateMismatch);
    }

    respond(stream, "200 OK", SUCCESS_PAGE).await?;
    Ok(Some(code))
}

async fn read_line<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(Error::InvalidRedirect("connection closed mid-request".into()));
    }
    if line.len() > MAX_LINE_LEN {
        return Err(Error::InvalidRedirect("request line too long".into()));
    }
    Ok(line)
}

/// Extracts the target from `GET <target> HTTP/1.1`.
fn request_target(request_line: &str) -> Result<String> {
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) if target.starts_with('/') => Ok(target.to_string()),
        _ => Err(Error::InvalidRedirect(format!(
            "unexpected request: {}",
            request_line.trim_end()
        ))),
    }
}

async fn respond<S>(stream: &mut S, status: &str, body: &str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
