//! TLS client configuration.
//!
//! The device serves a self-signed certificate on both the channel port and
//! the ad-hoc upload sockets, so certificate chains are not validated.
//! Handshake signatures still are.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::client::Security;
use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Write half used by the upload sub-protocol.
pub type ByteStream = Box<dyn AsyncWrite + Send + Unpin>;

// ============================================================================
// Certificate Verifier
// ============================================================================

/// Accepts any certificate chain presented by the device.
#[derive(Debug)]
struct DeviceCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for DeviceCertificate {
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
        verify_tls12_signature(
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
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Builds the client configuration used for every device connection.
///
/// # Errors
///
/// Returns [`Error::Tls`] if the protocol versions cannot be configured.
pub fn client_config() -> Result<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(DeviceCertificate { provider }))
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Opens a TLS stream to `host:port`.
///
/// # Errors
///
/// - [`Error::Io`] if the TCP connection or TLS handshake fails
/// - [`Error::Config`] if `host` is not a valid server name
pub async fn connect(host: &str, port: u16) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| Error::config(format!("invalid host {host}: {e}")))?;
    let tcp = TcpStream::connect((host, port)).await?;
    let stream = TlsConnector::from(client_config()?)
        .connect(server_name, tcp)
        .await?;
    debug!(host, port, "TLS stream established");
    Ok(stream)
}

/// Opens a plain or TLS byte stream to `host:port`.
///
/// # Errors
///
/// See [`connect`].
pub async fn open_stream(host: &str, port: u16, security: Security) -> Result<ByteStream> {
    match security {
        Security::Tls => Ok(Box::new(connect(host, port).await?)),
        Security::Plain => {
            let stream = TcpStream::connect((host, port)).await?;
            debug!(host, port, "Plain stream established");
            Ok(Box::new(stream))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_builds() {
        let config = client_config().expect("config");
        assert!(config.alpn_protocols.is_empty());
    }

    #[test]
    fn test_verifier_accepts_any_chain() {
        let verifier = DeviceCertificate {
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        };
        let name = ServerName::try_from("192.168.1.20").expect("ip server name");
        let verdict = verifier.verify_server_cert(
            &CertificateDer::from(vec![0u8; 8]),
            &[],
            &name,
            &[],
            UnixTime::now(),
        );
        assert!(verdict.is_ok());
        assert!(!verifier.supported_verify_schemes().is_empty());
    }

    #[tokio::test]
    async fn test_open_plain_stream() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let stream = open_stream("127.0.0.1", port, Security::Plain).await;
        assert!(stream.is_ok());
        assert!(accept.await.expect("join").is_ok());
    }

    #[tokio::test]
    async fn test_invalid_host_is_config_error() {
        let err = connect("not a host name!", 443).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
