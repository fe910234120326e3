//! Single-shot loopback HTTP listener for the authorization-code redirect.
//!
//! The listener accepts one connection, reads one request, answers with a
//! fixed success page and closes. Only the request line is inspected.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{HubError, Result};

/// Upper bound on the bytes read from the browser.
const MAX_REQUEST_BYTES: usize = 8192;

/// Suffix that terminates the request target on the request line.
const REQUEST_LINE_SUFFIX: &str = " HTTP/1.1";

/// Listener bound to the redirect URI's loopback address.
pub struct LocalRedirectListener {
    listener: TcpListener,
}

impl LocalRedirectListener {
    /// Bind to `address:port`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::LocalListener`] if the port cannot be bound.
    pub async fn bind(address: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((address, port)).await.map_err(|e| {
            HubError::LocalListener(format!("cannot listen on {address}:{port}: {e}"))
        })?;
        tracing::debug!(address, port, "Listening for authorization redirect");
        Ok(Self { listener })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| HubError::LocalListener(e.to_string()))
    }

    /// Waits up to `timeout` for the browser to connect.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Timeout`] if nobody connects in time.
    pub async fn wait_for_client(&self, timeout: Duration) -> Result<RedirectConnection> {
        match tokio::time::timeout(timeout, self.listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                tracing::debug!(%peer, "Accepted redirect connection");
                Ok(RedirectConnection { stream })
            },
            Ok(Err(e)) => Err(HubError::LocalListener(format!("accept failed: {e}"))),
            Err(_) => Err(HubError::Timeout(format!(
                "No response from the browser within {}s",
                timeout.as_secs()
            ))),
        }
    }

    /// Accepts one connection, reads its request, answers with the success
    /// page showing `message`, then closes the listener.
    ///
    /// Returns the raw request text.
    pub async fn capture(self, timeout: Duration, message: &str) -> Result<String> {
        let mut connection = self.wait_for_client(timeout).await?;
        let request = tokio::time::timeout(timeout, connection.receive())
            .await
            .map_err(|_| HubError::Timeout("Browser connected but sent no request".to_string()))??;

        if let Err(e) = connection.respond(message).await {
            tracing::warn!(error = %e, "Authorization code response failed to send");
        }
        Ok(request)
    }
}

/// One accepted browser connection.
pub struct RedirectConnection {
    stream: TcpStream,
}

impl RedirectConnection {
    /// Reads one request, up to the end of its headers.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::LocalListener`] if the connection closes before
    /// any bytes arrive.
    pub async fn receive(&mut self) -> Result<String> {
        let mut request = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];

        while request.len() < MAX_REQUEST_BYTES {
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(|e| HubError::LocalListener(format!("read failed: {e}")))?;
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        if request.is_empty() {
            return Err(HubError::LocalListener(
                "connection closed before a request was received".to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&request).into_owned())
    }

    /// Writes the success page and shuts the connection down.
    pub async fn respond(mut self, message: &str) -> Result<()> {
        self.stream
            .write_all(success_response(message).as_bytes())
            .await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Fixed 200 response served to the browser.
pub fn success_response(message: &str) -> String {
    let body = format!("<html><body><h1>Success!</h1><p>{message}</p></body></html>");
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Authorization code carried by a redirect request.
///
/// Empty if the request line has no `code` parameter or does not end in
/// ` HTTP/1.1`.
pub fn extract_code(request: &str) -> String {
    query_value(request, "code").unwrap_or_default()
}

/// `state` parameter carried by a redirect request.
pub fn extract_state(request: &str) -> Option<String> {
    query_value(request, "state")
}

fn query_value(request: &str, key: &str) -> Option<String> {
    let request_line = request.lines().next()?;
    let (_, target) = request_line
        .strip_suffix(REQUEST_LINE_SUFFIX)?
        .split_once(' ')?;
    let (_, query) = target.split_once('?')?;

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}
