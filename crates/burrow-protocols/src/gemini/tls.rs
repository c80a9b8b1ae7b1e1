//! TLS transport for gemini
//!
//! rustls is told to accept any certificate during the handshake. The
//! handshake signatures are still checked, so the peer does hold the key
//! for the certificate it presents; whether that certificate is acceptable
//! is decided afterwards by the trust store.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme, StreamOwned};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

use crate::error::FetchError;
use crate::net;
use crate::Result;

pub type TlsStream = StreamOwned<ClientConnection, TcpStream>;

#[derive(Debug)]
struct DeferredVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for DeferredVerifier {
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

fn client_config() -> Result<Arc<ClientConfig>> {
    let provider = Arc::new(ring::default_provider());
    let verifier = Arc::new(DeferredVerifier {
        provider: Arc::clone(&provider),
    });

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| FetchError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

/// Run the handshake over `tcp` and return the ready stream
pub fn handshake(tcp: TcpStream, host: &str, addr: &str) -> Result<TlsStream> {
    let name = host.trim_start_matches('[').trim_end_matches(']').to_string();
    let server_name =
        ServerName::try_from(name).map_err(|e| FetchError::Tls(format!("{host}: {e}")))?;

    let conn = ClientConnection::new(client_config()?, server_name)
        .map_err(|e| FetchError::Tls(e.to_string()))?;
    let mut stream = StreamOwned::new(conn, tcp);

    while stream.conn.is_handshaking() {
        stream
            .conn
            .complete_io(&mut stream.sock)
            .map_err(|e| match e.kind() {
                ErrorKind::TimedOut | ErrorKind::WouldBlock => net::io_error(addr, e),
                _ => FetchError::Tls(format!("handshake with {addr} failed: {e}")),
            })?;
    }

    tracing::debug!(addr = %addr, "TLS handshake complete");
    Ok(stream)
}

/// DER certificates offered by the server, leaf first
pub fn peer_certificates(stream: &TlsStream) -> Vec<Vec<u8>> {
    stream
        .conn
        .peer_certificates()
        .map(|certs| certs.iter().map(|cert| cert.to_vec()).collect())
        .unwrap_or_default()
}
