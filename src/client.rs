//! EST client implementation.
//!
//! This module provides the main `EstClient` struct for the client side of
//! RFC 7030: CA certificate distribution, simple enrollment and simple
//! re-enrollment.

use std::sync::Arc;

use base64::prelude::*;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, StatusCode};
use x509_cert::request::CertReq;
use x509_cert::Certificate;

use crate::config::{EstClientConfig, HttpAuth};
use crate::endpoint::{EndpointDescriptor, Operation};
use crate::envelope::{
    check_status_code, content_types, decode_base64_body, encode_base64_envelope,
    retry_after_seconds, validate_envelope, BASE64_ENCODING, CONTENT_TRANSFER_ENCODING,
};
use crate::error::{EstError, Result};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{
    CaCertificates, CertificateDecoder, CsrEncoder, EnrollmentResponse, Pkcs10Codec, Pkcs7Codec,
};

const CACERTS_STATUS: &[u16] = &[200];
const ENROLL_STATUS: &[u16] = &[200, 202];

/// Which enrollment endpoint a CSR is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnrollCommand {
    Enroll,
    Renew,
}

impl EnrollCommand {
    fn operation(self) -> Operation {
        match self {
            Self::Enroll => Operation::SimpleEnroll,
            Self::Renew => Operation::SimpleRenew,
        }
    }
}

/// EST client for certificate enrollment operations.
///
/// Every call performs exactly one HTTP exchange and never retries. A
/// [`EnrollmentResponse::Pending`] result tells the caller to resubmit the
/// same request after the indicated delay.
///
/// # Example
///
/// ```no_run
/// use est_protocol::{EstClient, EstClientConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = EstClientConfig::builder()
///     .host("est.example.com")
///     .build()?;
///
/// let client = EstClient::new(config)?;
///
/// let ca_certs = client.get_ca_certs().await?;
/// println!("Got {} CA certificates", ca_certs.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EstClient {
    endpoint: EndpointDescriptor,
    transport: Arc<dyn HttpTransport>,
    cert_decoder: Arc<dyn CertificateDecoder>,
    csr_encoder: Arc<dyn CsrEncoder>,
    http_auth: Option<HttpAuth>,
}

impl std::fmt::Debug for EstClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstClient")
            .field("endpoint", &self.endpoint)
            .field("http_auth", &self.http_auth)
            .finish_non_exhaustive()
    }
}

impl EstClient {
    /// Create a new EST client over a reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an error if TLS configuration fails.
    pub fn new(config: EstClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        let mut client = Self::with_transport(config.endpoint(), Arc::new(transport));
        client.http_auth = config.http_auth;
        Ok(client)
    }

    /// Create a client over an arbitrary transport with the default codecs.
    pub fn with_transport(endpoint: EndpointDescriptor, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoint,
            transport,
            cert_decoder: Arc::new(Pkcs7Codec),
            csr_encoder: Arc::new(Pkcs10Codec),
            http_auth: None,
        }
    }

    /// Replace the certificate bundle decoder.
    pub fn with_certificate_decoder(mut self, decoder: Arc<dyn CertificateDecoder>) -> Self {
        self.cert_decoder = decoder;
        self
    }

    /// Replace the CSR encoder.
    pub fn with_csr_encoder(mut self, encoder: Arc<dyn CsrEncoder>) -> Self {
        self.csr_encoder = encoder;
        self
    }

    /// Send HTTP Basic credentials with every request.
    pub fn with_http_auth(mut self, auth: HttpAuth) -> Self {
        self.http_auth = Some(auth);
        self
    }

    /// The endpoint this client talks to.
    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    /// Retrieve CA certificates from the EST server.
    ///
    /// Only status 200 is accepted. The full sequence is returned in bundle
    /// order, without deduplication or trust evaluation.
    ///
    /// # RFC Reference
    ///
    /// RFC 7030 Section 4.1: Distribution of CA Certificates
    pub async fn get_ca_certs(&self) -> Result<CaCertificates> {
        let url = self.endpoint.resolve(Operation::CaCertificates);
        tracing::debug!("GET {}", url);

        let request = self
            .authorize(http::Request::builder().method(Method::GET).uri(&url))
            .body(Vec::new())
            .map_err(|e| EstError::transport(format!("Failed to build request: {}", e)))?;

        let (parts, body) = self.transport.execute(request).await?.into_parts();
        tracing::debug!("GET {} -> {}", url, parts.status);

        check_status_code(parts.status.as_u16(), CACERTS_STATUS)?;
        validate_envelope(&parts.headers, content_types::PKCS7_MIME)?;

        let certs = self.decode_certificates(&body.read().await?)?;
        Ok(CaCertificates::new(certs))
    }

    /// Enroll for a new certificate.
    ///
    /// Returns `EnrollmentResponse::Issued` with the certificate if the
    /// server issues immediately, or `EnrollmentResponse::Pending` with the
    /// server's `Retry-After` delay.
    ///
    /// # RFC Reference
    ///
    /// RFC 7030 Section 4.2.1: Simple Enrollment of Clients
    pub async fn simple_enroll(&self, csr: &CertReq) -> Result<EnrollmentResponse> {
        self.enroll_request(EnrollCommand::Enroll, csr).await
    }

    /// Re-enroll (renew/rekey) an existing certificate.
    ///
    /// # RFC Reference
    ///
    /// RFC 7030 Section 4.2.2: Simple Re-enrollment of Clients
    pub async fn simple_reenroll(&self, csr: &CertReq) -> Result<EnrollmentResponse> {
        self.enroll_request(EnrollCommand::Renew, csr).await
    }

    async fn enroll_request(
        &self,
        command: EnrollCommand,
        csr: &CertReq,
    ) -> Result<EnrollmentResponse> {
        let url = self.endpoint.resolve(command.operation());
        tracing::debug!("POST {}", url);

        let body = encode_base64_envelope(|sink| self.csr_encoder.encode(sink, csr))?;

        let request = self
            .authorize(
                http::Request::builder()
                    .method(Method::POST)
                    .uri(&url)
                    .header(CONTENT_TYPE, content_types::PKCS10)
                    .header(CONTENT_TRANSFER_ENCODING, BASE64_ENCODING)
                    .header(CONTENT_LENGTH, body.len()),
            )
            .body(body)
            .map_err(|e| EstError::transport(format!("Failed to build request: {}", e)))?;

        let (parts, body) = self.transport.execute(request).await?.into_parts();
        let status = parts.status;
        tracing::debug!("POST {} -> {}", url, status);

        check_status_code(status.as_u16(), ENROLL_STATUS)?;

        if status == StatusCode::ACCEPTED {
            let retry_after = retry_after_seconds(&parts.headers)?;
            tracing::info!(
                "{} pending, retry after {} seconds",
                command.operation(),
                retry_after
            );
            return Ok(EnrollmentResponse::pending(retry_after));
        }

        validate_envelope(&parts.headers, content_types::PKCS7_MIME)?;

        let certs = self.decode_certificates(&body.read().await?)?;
        if certs.len() > 1 {
            tracing::debug!("Response contains {} certificates, using first", certs.len());
        }

        let certificate = certs
            .into_iter()
            .next()
            .ok_or(EstError::EmptyCertificateBundle)?;

        Ok(EnrollmentResponse::issued(certificate))
    }

    fn decode_certificates(&self, body: &[u8]) -> Result<Vec<Certificate>> {
        let der = decode_base64_body(body)?;
        self.cert_decoder.decode(&der)
    }

    /// Add HTTP Basic auth header if configured.
    fn authorize(&self, request: http::request::Builder) -> http::request::Builder {
        match self.http_auth {
            Some(ref auth) => {
                let credentials =
                    BASE64_STANDARD.encode(format!("{}:{}", auth.username, auth.password));
                request.header(AUTHORIZATION, format!("Basic {}", credentials))
            }
            None => request,
        }
    }
}
