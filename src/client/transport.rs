//! Single-use HTTP/1.1 transport driving a phase clock
//!
//! Every call dials a fresh connection: resolve, TCP connect, optional TLS
//! handshake, one request, full body drain, close. Nothing is pooled and
//! redirects are never followed.

use super::{clock::PhaseClock, tls, ExchangeSettings};
use crate::{
    dns::HostResolver,
    error::{AppError, Result},
};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    client::conn::http1,
    header::{HeaderName, HeaderValue, CONTENT_TYPE, HOST, USER_AGENT},
    Method, Request,
};
use hyper_util::rt::TokioIo;
use socket2::{SockRef, TcpKeepalive};
use std::net::SocketAddr;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    task::JoinHandle,
    time::timeout,
};
use tokio_rustls::TlsConnector;
use url::Url;

/// What goes on the wire for one exchange
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    /// Already encoded request body, empty for downloads
    pub body: Bytes,
    pub content_type: Option<&'static str>,
}

/// Status and drained body size of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body_bytes: u64,
}

/// Aborts the connection driver when the exchange ends, however it ends
struct ConnectionTask(JoinHandle<()>);

impl Drop for ConnectionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one request over a fresh connection, marking every phase on `clock`.
///
/// A response with any status is returned as `Ok`; judging the status is
/// the caller's business.
pub async fn send(
    settings: &ExchangeSettings,
    request: &WireRequest,
    clock: &mut PhaseClock,
) -> Result<WireResponse> {
    let host = request
        .url
        .host_str()
        .ok_or_else(|| AppError::validation(format!("URL has no host: {}", request.url)))?
        .to_string();
    let port = request
        .url
        .port_or_known_default()
        .ok_or_else(|| AppError::validation(format!("URL has no port: {}", request.url)))?;

    let addrs = HostResolver::new(settings.ip_family)
        .resolve(&host, port, clock)
        .await?;

    clock.connect_start();
    let stream = timeout(settings.timeouts.dial, connect_any(&addrs))
        .await
        .map_err(|_| {
            AppError::timeout(format!(
                "Connecting to {} timed out after {}s",
                host,
                settings.timeouts.dial.as_secs()
            ))
        })??;
    clock.connect_done();

    SockRef::from(&stream)
        .set_tcp_keepalive(&TcpKeepalive::new().with_time(settings.timeouts.keep_alive))?;
    stream.set_nodelay(true)?;

    match request.url.scheme() {
        "https" => {
            let server_name = tls::server_name(settings.host_override().unwrap_or(&host))?;
            let connector = TlsConnector::from(settings.tls.clone());

            clock.tls_start();
            let handshake = timeout(
                settings.timeouts.tls_handshake,
                connector.connect(server_name, stream),
            )
            .await;
            clock.tls_done();

            let tls_stream = handshake
                .map_err(|_| {
                    AppError::timeout(format!(
                        "TLS handshake with {} timed out after {}s",
                        host,
                        settings.timeouts.tls_handshake.as_secs()
                    ))
                })?
                .map_err(|e| AppError::tls(format!("TLS handshake with {} failed: {}", host, e)))?;

            exchange_over(tls_stream, settings, request, clock).await
        }
        "http" => exchange_over(stream, settings, request, clock).await,
        other => Err(AppError::validation(format!("Unsupported URL scheme: {}", other))),
    }
}

async fn connect_any(addrs: &[SocketAddr]) -> Result<TcpStream> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(format!("{}: {}", addr, e)),
        }
    }
    Err(AppError::network(format!(
        "Unable to connect: {}",
        last_error.unwrap_or_else(|| "no addresses to dial".to_string())
    )))
}

async fn exchange_over<S>(
    io: S,
    settings: &ExchangeSettings,
    request: &WireRequest,
    clock: &mut PhaseClock,
) -> Result<WireResponse>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) = http1::handshake::<_, Full<Bytes>>(TokioIo::new(io)).await?;
    let _driver = ConnectionTask(tokio::spawn(async move {
        let _ = connection.await;
    }));

    sender.ready().await?;
    clock.got_connection();

    let outgoing = build_request(settings, request)?;

    timeout(settings.timeouts.request, async {
        let response = sender.send_request(outgoing).await?;
        clock.first_response_byte();

        let status = response.status().as_u16();
        let mut body = response.into_body();
        let mut body_bytes = 0u64;
        while let Some(frame) = body.frame().await {
            if let Some(data) = frame?.data_ref() {
                body_bytes += data.len() as u64;
            }
        }
        clock.body_complete();

        Ok::<_, AppError>(WireResponse { status, body_bytes })
    })
    .await
    .map_err(|_| {
        AppError::timeout(format!(
            "No complete response from {} within {}s",
            request.url,
            settings.timeouts.request.as_secs()
        ))
    })?
}

/// Assemble the outgoing request: origin-form target, Host, User-Agent and
/// the configured extra headers. A configured `Host` or `User-Agent`
/// replaces the default one.
pub fn build_request(settings: &ExchangeSettings, request: &WireRequest) -> Result<Request<Full<Bytes>>> {
    let target = &request.url[url::Position::BeforePath..];
    let host = match settings.host_override() {
        Some(host) => host.to_string(),
        None => authority(&request.url)?,
    };

    let mut builder = Request::builder()
        .method(request.method.clone())
        .uri(target)
        .header(HOST, host);

    if !settings
        .headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
    {
        builder = builder.header(USER_AGENT, settings.user_agent.as_str());
    }

    if let Some(content_type) = request.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }

    for (name, value) in &settings.headers {
        if name.eq_ignore_ascii_case("host") {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::validation(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AppError::validation(format!("Invalid header value for '{}': {}", name, e)))?;
        builder = builder.header(name, value);
    }

    Ok(builder.body(Full::new(request.body.clone()))?)
}

fn authority(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::validation(format!("URL has no host: {}", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
