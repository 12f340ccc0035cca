//! Host name resolution for timed exchanges
//!
//! A fresh resolver is built from the system configuration for every lookup,
//! so each exchange pays for (and measures) a real DNS round trip. Literal
//! IP hosts skip DNS entirely and leave the clock's DNS instants unset.

use crate::{
    client::clock::PhaseClock,
    error::{AppError, Result},
    types::IpFamily,
};
use std::net::{IpAddr, SocketAddr};
use trust_dns_resolver::{
    config::LookupIpStrategy,
    system_conf,
    TokioAsyncResolver,
};

/// Resolves the target host to dialable socket addresses
#[derive(Debug, Clone, Copy)]
pub struct HostResolver {
    family: IpFamily,
}

impl HostResolver {
    pub fn new(family: IpFamily) -> Self {
        Self { family }
    }

    pub fn family(&self) -> IpFamily {
        self.family
    }

    /// Resolve `host` and pair every allowed address with `port`.
    ///
    /// Marks `dns_start`/`dns_done` on the clock around the lookup; the
    /// done mark is recorded even when the lookup fails.
    pub async fn resolve(
        &self,
        host: &str,
        port: u16,
        clock: &mut PhaseClock,
    ) -> Result<Vec<SocketAddr>> {
        if let Some(ip) = literal_ip(host) {
            if !self.family.allows(&ip) {
                return Err(AppError::dns_resolution(format!(
                    "Address {} does not match the requested IP family {:?}",
                    ip, self.family
                )));
            }
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        clock.dns_start();
        let lookup = self.lookup(host).await;
        clock.dns_done();

        let addrs: Vec<SocketAddr> = lookup?
            .into_iter()
            .filter(|ip| self.family.allows(ip))
            .map(|ip| SocketAddr::new(ip, port))
            .collect();

        if addrs.is_empty() {
            return Err(AppError::dns_resolution(format!(
                "No {:?} addresses resolved for {}",
                self.family, host
            )));
        }

        Ok(addrs)
    }

    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        let (config, mut opts) = system_conf::read_system_conf().map_err(|e| {
            AppError::dns_resolution(format!("Failed to read system DNS config: {}", e))
        })?;
        opts.ip_strategy = ip_strategy(self.family);
        opts.cache_size = 0;

        let resolver = TokioAsyncResolver::tokio(config, opts);
        let response = resolver.lookup_ip(host).await.map_err(|e| {
            AppError::dns_resolution(format!("Failed to resolve {}: {}", host, e))
        })?;

        Ok(response.iter().collect())
    }
}

/// Resolver strategy matching an address family
pub fn ip_strategy(family: IpFamily) -> LookupIpStrategy {
    match family {
        IpFamily::V4 => LookupIpStrategy::Ipv4Only,
        IpFamily::V6 => LookupIpStrategy::Ipv6Only,
        IpFamily::Any => LookupIpStrategy::Ipv4thenIpv6,
    }
}

/// Parse a URL host as an IP literal, accepting bracketed IPv6
pub fn literal_ip(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
}

impl Default for HostResolver {
    fn default() -> Self {
        Self::new(IpFamily::default())
    }
}
