//! Timed request/response exchanges against the speed test endpoints

pub mod clock;
pub mod tls;
pub mod transport;


use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::{Config, ExchangeOutcome},
    types::{Direction, IpFamily},
};
use async_trait::async_trait;
use bytes::Bytes;
use clock::PhaseClock;
use hyper::Method;
use rustls::ClientConfig;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use transport::{WireRequest, WireResponse};
use url::Url;

/// Content type of upload bodies
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// One exchange of the test plan
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Issue the request and report how it went. Never fails: transport
    /// problems come back as an unsuccessful outcome.
    async fn run(&self, request: &ExchangeRequest) -> ExchangeOutcome;
}

/// Transport bounds, all fixed except the whole-response bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportTimeouts {
    pub dial: Duration,
    pub keep_alive: Duration,
    pub tls_handshake: Duration,
    /// Recorded only: requests never carry `Expect: 100-continue`
    pub expect_continue: Duration,
    /// Recorded only: connections are closed after one exchange
    pub idle_connection: Duration,
    /// From the connection being acquired until the body is drained
    pub request: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        use crate::defaults::*;
        Self {
            dial: DIAL_TIMEOUT,
            keep_alive: TCP_KEEP_ALIVE,
            tls_handshake: TLS_HANDSHAKE_TIMEOUT,
            expect_continue: EXPECT_CONTINUE_TIMEOUT,
            idle_connection: IDLE_CONNECTION_TIMEOUT,
            request: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Everything an exchange needs besides the request itself
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub tls: Arc<ClientConfig>,
    pub timeouts: TransportTimeouts,
    pub user_agent: String,
    /// Extra headers, in configuration order
    pub headers: Vec<(String, String)>,
    pub ip_family: IpFamily,
}

impl ExchangeSettings {
    /// Build from configuration. Reading or parsing the client certificate
    /// happens here, once, so a bad file fails the run before any exchange.
    pub fn from_config(config: &Config) -> Result<Self> {
        let identity = config
            .client_cert
            .as_deref()
            .map(tls::ClientIdentity::from_pem_file)
            .transpose()?;

        Ok(Self {
            tls: tls::client_config(config.insecure, identity)?,
            timeouts: TransportTimeouts {
                request: config.timeout(),
                ..TransportTimeouts::default()
            },
            user_agent: config.user_agent.clone(),
            headers: config.parsed_headers()?,
            ip_family: config.ip_family,
        })
    }

    /// Value of a configured `Host` header
    pub fn host_override(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("host"))
            .map(|(_, value)| value.as_str())
    }
}

/// A download or upload of a given size against a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub direction: Direction,
    pub url: Url,
    pub payload_bytes: u64,
}

impl ExchangeRequest {
    pub fn download(url: Url, payload_bytes: u64) -> Self {
        Self {
            direction: Direction::Download,
            url,
            payload_bytes,
        }
    }

    pub fn upload(url: Url, payload_bytes: u64) -> Self {
        Self {
            direction: Direction::Upload,
            url,
            payload_bytes,
        }
    }

    /// GET with no body, or POST with the payload as a form field of zero
    /// bytes
    fn to_wire(&self) -> WireRequest {
        match self.direction {
            Direction::Download => WireRequest {
                method: Method::GET,
                url: self.url.clone(),
                body: Bytes::new(),
                content_type: None,
            },
            Direction::Upload => WireRequest {
                method: Method::POST,
                url: self.url.clone(),
                body: upload_body(self.payload_bytes),
                content_type: Some(FORM_CONTENT_TYPE),
            },
        }
    }
}

/// `data=` followed by `payload_bytes` form-encoded NUL bytes
pub fn upload_body(payload_bytes: u64) -> Bytes {
    let payload = "\0".repeat(payload_bytes as usize);
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("data", &payload)
        .finish();
    Bytes::from(encoded)
}

/// Exchange over a fresh, instrumented connection
pub struct TimedExchange {
    settings: ExchangeSettings,
    logger: Logger,
}

impl TimedExchange {
    pub fn new(settings: ExchangeSettings, logger: Logger) -> Self {
        Self { settings, logger }
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    async fn attempt(&self, request: &ExchangeRequest) -> std::result::Result<ExchangeOutcome, (AppError, Option<u16>)> {
        let mut clock = PhaseClock::new();
        let wire = request.to_wire();

        let WireResponse { status, body_bytes } = transport::send(&self.settings, &wire, &mut clock)
            .await
            .map_err(|e| (e, None))?;

        if status != 200 {
            return Err((AppError::status(status, request.url.as_str()), Some(status)));
        }

        let durations = clock
            .finish()
            .durations(request.direction)
            .map_err(|e| (e, Some(status)))?;

        let bytes_transferred = match request.direction {
            Direction::Download => body_bytes,
            Direction::Upload => request.payload_bytes,
        };

        Ok(ExchangeOutcome::success(status, durations, bytes_transferred))
    }
}

#[async_trait]
impl Exchange for TimedExchange {
    async fn run(&self, request: &ExchangeRequest) -> ExchangeOutcome {
        match self.attempt(request).await {
            Ok(outcome) => {
                if let Some(durations) = &outcome.durations {
                    self.logger
                        .debug(&format!("{} of {} bytes completed", request.direction, request.payload_bytes))
                        .field("url", request.url.as_str())
                        .field("bytes", outcome.bytes_transferred)
                        .phases(durations)
                        .log()
                        .await;
                }
                outcome
            }
            Err((error, status)) => {
                self.logger
                    .error(&format!("{} request failed: {}", request.direction, error))
                    .field("url", request.url.as_str())
                    .field("status", status)
                    .error_info(&error)
                    .log()
                    .await;
                ExchangeOutcome::failed(&error, status)
            }
        }
    }
}
