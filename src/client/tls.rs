//! TLS client configuration
//!
//! One `rustls::ClientConfig` is built at startup and shared by every
//! exchange. Session resumption is disabled so each exchange performs (and
//! measures) a full handshake.

use crate::error::{AppError, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::Resumption;
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::path::Path;
use std::sync::Arc;

/// Client certificate chain and key loaded from a single PEM file
pub struct ClientIdentity {
    pub certs: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("certs", &self.certs.len())
            .finish_non_exhaustive()
    }
}

impl ClientIdentity {
    /// Read a PEM file holding both the certificate chain and private key
    pub fn from_pem_file(path: &Path) -> Result<Self> {
        let pem = std::fs::read(path).map_err(|e| {
            AppError::tls(format!(
                "Failed to read client certificate {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_pem(&pem)
    }

    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let certs = rustls_pemfile::certs(&mut &pem[..])
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::tls(format!("Invalid client certificate: {}", e)))?;
        if certs.is_empty() {
            return Err(AppError::tls("No certificate found in client certificate file"));
        }

        let key = rustls_pemfile::private_key(&mut &pem[..])
            .map_err(|e| AppError::tls(format!("Invalid client private key: {}", e)))?
            .ok_or_else(|| AppError::tls("No private key found in client certificate file"))?;

        Ok(Self { certs, key })
    }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(crypto::ring::default_provider())
}

/// Build the shared client configuration.
///
/// `insecure` disables server certificate verification; the handshake
/// itself, SNI and signature checks on the key exchange still run.
pub fn client_config(insecure: bool, identity: Option<ClientIdentity>) -> Result<Arc<ClientConfig>> {
    let builder = ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?;

    let builder = if insecure {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerification::new(provider())))
    } else {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots)
    };

    let mut config = match identity {
        Some(identity) => builder.with_client_auth_cert(identity.certs, identity.key)?,
        None => builder.with_no_client_auth(),
    };

    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    config.resumption = Resumption::disabled();

    Ok(Arc::new(config))
}

/// Server name for SNI and certificate verification.
///
/// Accepts a bare host or a `Host` header value; a trailing `:port` is
/// dropped and IPv6 brackets are removed.
pub fn server_name(host: &str) -> Result<ServerName<'static>> {
    let host = strip_port(host);
    ServerName::try_from(host)
        .map(|name| name.to_owned())
        .map_err(|e| AppError::tls(format!("Invalid TLS server name '{}': {}", host, e)))
}

/// Host part of an authority: `[::1]:443` gives `::1`, `example.com:8443`
/// gives `example.com`. An unbracketed IPv6 literal is returned whole.
fn strip_port(authority: &str) -> &str {
    if let Some(rest) = authority.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => rest,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            host
        }
        _ => authority,
    }
}

/// Accepts any server certificate
#[derive(Debug)]
struct NoVerification {
    provider: Arc<CryptoProvider>,
}

impl NoVerification {
    fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
