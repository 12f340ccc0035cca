//! Per-exchange phase clock
//!
//! The transport calls the hooks in order as a request progresses through
//! DNS, connect, TLS, request write and response read. Each hook records the
//! current monotonic instant; nothing here can block or fail.

use crate::models::PhaseTimestamps;
use std::time::Instant;

/// Lifecycle observer for a single exchange
#[derive(Debug, Default)]
pub struct PhaseClock {
    stamps: PhaseTimestamps,
}

impl PhaseClock {
    /// Create a clock with no recorded instants
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dns_start(&mut self) {
        self.stamps.dns_start = Some(Instant::now());
    }

    pub fn dns_done(&mut self) {
        self.stamps.dns_end = Some(Instant::now());
    }

    pub fn connect_start(&mut self) {
        self.stamps.connect_start = Some(Instant::now());
    }

    pub fn connect_done(&mut self) {
        self.stamps.connect_end = Some(Instant::now());
    }

    pub fn tls_start(&mut self) {
        self.stamps.tls_start = Some(Instant::now());
    }

    pub fn tls_done(&mut self) {
        self.stamps.tls_end = Some(Instant::now());
    }

    /// The connection is ready and about to carry the request
    pub fn got_connection(&mut self) {
        self.stamps.connection_acquired = Some(Instant::now());
    }

    /// The response head has been received and parsed.
    ///
    /// This is marked when hyper hands back the parsed status line and
    /// headers, not when the first raw byte arrives on the socket, so server
    /// processing includes the time spent receiving the head.
    pub fn first_response_byte(&mut self) {
        self.stamps.first_byte = Some(Instant::now());
    }

    /// The response body has been fully drained
    pub fn body_complete(&mut self) {
        self.stamps.body_complete = Some(Instant::now());
    }

    /// Instants recorded so far
    pub fn snapshot(&self) -> PhaseTimestamps {
        self.stamps
    }

    /// Consume the clock, yielding its instants
    pub fn finish(self) -> PhaseTimestamps {
        self.stamps
    }
}
