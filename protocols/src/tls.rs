//! Browser-fingerprinted TLS client.
//!
//! Censors that block by TLS fingerprint key on the client hello: cipher
//! ordering, extensions, ALPN. The connector built here presents the hello
//! of a mainstream browser instead of the default stack ordering, within
//! what rustls can emit (legacy CBC suites are not available, so profiles
//! are the browser ordering restricted to supported suites).
//!
//! Certificate verification is disabled everywhere in this module: probes
//! measure liveness and flow behavior, not trust. Connections are made to
//! bare addresses, so no SNI is sent.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    AlertDescription, ClientConfig, DigitallySignedStruct, ProtocolVersion, SignatureScheme,
    SupportedCipherSuite,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use dpiprobe_common::error::ProbeFailure;

/// Client-hello profile to present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fingerprint {
    #[default]
    Chrome,
    Firefox,
    Safari,
}

impl Fingerprint {
    /// Suite ordering of the emulated browser, restricted to what rustls
    /// ships.
    fn cipher_suites(self) -> Vec<SupportedCipherSuite> {
        use rustls::crypto::ring::cipher_suite as cs;

        match self {
            Fingerprint::Chrome => vec![
                cs::TLS13_AES_128_GCM_SHA256,
                cs::TLS13_AES_256_GCM_SHA384,
                cs::TLS13_CHACHA20_POLY1305_SHA256,
                cs::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
                cs::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
                cs::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
                cs::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
                cs::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
                cs::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
            ],
            Fingerprint::Firefox => vec![
                cs::TLS13_AES_128_GCM_SHA256,
                cs::TLS13_CHACHA20_POLY1305_SHA256,
                cs::TLS13_AES_256_GCM_SHA384,
                cs::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
                cs::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
                cs::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
                cs::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
                cs::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
                cs::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
            ],
            Fingerprint::Safari => vec![
                cs::TLS13_AES_128_GCM_SHA256,
                cs::TLS13_AES_256_GCM_SHA384,
                cs::TLS13_CHACHA20_POLY1305_SHA256,
                cs::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
                cs::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
                cs::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
                cs::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
                cs::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
                cs::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
            ],
        }
    }

    /// Browsers advertise h2 first; responses are drained as opaque bytes
    /// upstream, so the negotiated protocol never matters to the probes.
    fn alpn(self) -> Vec<Vec<u8>> {
        vec![b"h2".to_vec(), b"http/1.1".to_vec()]
    }

    /// One reusable client config per invocation: suite ordering from the
    /// profile, no SNI, no certificate verification.
    pub fn client_config(self) -> Result<Arc<ClientConfig>, rustls::Error> {
        let mut provider = ring::default_provider();
        provider.cipher_suites = self.cipher_suites();

        let mut config = ClientConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerify::new()))
            .with_no_client_auth();

        config.alpn_protocols = self.alpn();
        config.enable_sni = false;

        Ok(Arc::new(config))
    }
}

/// Runs the handshake over an established TCP connection within `deadline`.
pub async fn handshake(
    stream: TcpStream,
    ip: IpAddr,
    config: Arc<ClientConfig>,
    deadline: Duration,
) -> Result<TlsStream<TcpStream>, ProbeFailure> {
    let connector = TlsConnector::from(config);
    let name = ServerName::from(ip);

    match timeout(deadline, connector.connect(name, stream)).await {
        Err(_elapsed) => Err(ProbeFailure::HandshakeTimeout),
        Ok(Err(err)) => Err(classify_handshake_error(&err)),
        Ok(Ok(tls)) => Ok(tls),
    }
}

/// Negotiated protocol version of an established session.
pub fn protocol_version(conn: &TlsStream<TcpStream>) -> Option<ProtocolVersion> {
    conn.get_ref().1.protocol_version()
}

fn classify_handshake_error(err: &io::Error) -> ProbeFailure {
    if err.kind() == io::ErrorKind::TimedOut {
        return ProbeFailure::HandshakeTimeout;
    }

    if let Some(tls_err) = err.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
        // A handshake_failure alert is the fingerprint-block signal; every
        // other alert stays unclassified.
        if matches!(
            tls_err,
            rustls::Error::AlertReceived(AlertDescription::HandshakeFailure)
        ) {
            return ProbeFailure::HandshakeFailure;
        }
    }

    debug!("tls handshake: {err}");
    ProbeFailure::Internal
}

/// Accepts any certificate chain. Liveness is being measured, not trust.
#[derive(Debug)]
pub struct NoVerify;

impl Default for NoVerify {
    fn default() -> Self {
        Self::new()
    }
}

impl NoVerify {
    pub const fn new() -> Self {
        Self
    }
}

impl ServerCertVerifier for NoVerify {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
