//! Per-target TLS settings: a private CA, or no verification at all.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use signalfire_core::config::TargetConfig;
use signalfire_core::DirectorError;

/// TLS client config for `target`, or `None` to keep the system roots.
///
/// A `ca_cert` replaces the system roots entirely. It is parsed even when
/// `insecure_skip_verify` is set, so a broken certificate is always reported.
pub fn client_config(target: &TargetConfig) -> Result<Option<Arc<ClientConfig>>, DirectorError> {
    let roots = target.ca_cert().map(root_store).transpose()?;
    if roots.is_none() && !target.insecure_skip_verify {
        return Ok(None);
    }

    let provider = Arc::new(ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|err| DirectorError::InvalidTarget(format!("tls setup failed: {err}")))?;

    let config = match roots {
        Some(roots) if !target.insecure_skip_verify => {
            builder.with_root_certificates(roots).with_no_client_auth()
        }
        _ => {
            tracing::warn!(url = %target.url, "tls certificate verification disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerification { provider }))
                .with_no_client_auth()
        }
    };
    Ok(Some(Arc::new(config)))
}

/// Trust exactly the certificates in `pem`.
pub fn root_store(pem: &str) -> Result<RootCertStore, DirectorError> {
    let mut reader = pem.as_bytes();
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| DirectorError::InvalidTarget(format!("ca_cert is not valid PEM: {err}")))?;
    if certs.is_empty() {
        return Err(DirectorError::InvalidTarget(
            "ca_cert contains no PEM certificate".to_owned(),
        ));
    }

    let mut roots = RootCertStore::empty();
    for cert in certs {
        roots.add(cert).map_err(|err| {
            DirectorError::InvalidTarget(format!("ca_cert is not a usable certificate: {err}"))
        })?;
    }
    Ok(roots)
}

/// Accepts any server certificate. Handshake signatures are still checked.
#[derive(Debug)]
struct NoVerification {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
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
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
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
