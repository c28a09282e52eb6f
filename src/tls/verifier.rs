use rustls::{
    DigitallySignedStruct, Error as TlsError, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::ring::default_provider,
    pki_types::{CertificateDer, ServerName, UnixTime},
};

/// Certificate verifier that accepts whatever chain the server presents.
///
/// # Security Note
///
/// The probe only reads the served chain to report expiry times, nothing is
/// sent over the connection after the handshake. Expired, self-signed and
/// mismatched certificates must still be reported, so no trust or hostname
/// checks are made here.
#[derive(Debug)]
pub struct InspectOnlyVerifier {
    schemes: Vec<SignatureScheme>,
}

impl InspectOnlyVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemes: default_provider()
                .signature_verification_algorithms
                .supported_schemes(),
        }
    }
}

impl Default for InspectOnlyVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerCertVerifier for InspectOnlyVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}
