//! TLS configuration helpers for the EST client.
//!
//! This module builds the reqwest client used by
//! [`ReqwestTransport`](crate::transport::ReqwestTransport).

use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::config::{ClientIdentity, EstClientConfig, TrustAnchors};
use crate::error::{EstError, Result};

// RFC 7030 Section 3.3.1 requires TLS 1.1 or later; TLS 1.2 is the floor here
// since 1.1 is deprecated.

/// Build a reqwest Client with the appropriate TLS configuration.
pub fn build_http_client(config: &EstClientConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(crate::USER_AGENT)
        .use_rustls_tls()
        .min_tls_version(reqwest::tls::Version::TLS_1_2);

    match &config.trust_anchors {
        TrustAnchors::WebPki => {
            builder = builder.tls_built_in_root_certs(true);
        }
        TrustAnchors::Explicit(bundles) => {
            builder = builder.tls_built_in_root_certs(false);
            for bundle in bundles {
                for der in parse_pem_certificates(bundle)? {
                    let cert = reqwest::Certificate::from_der(der.as_ref()).map_err(|e| {
                        EstError::tls(format!("Failed to parse CA certificate: {}", e))
                    })?;
                    builder = builder.add_root_certificate(cert);
                }
            }
        }
        TrustAnchors::InsecureAcceptAny => {
            tracing::warn!("TLS server certificate verification disabled");
            builder = builder
                .tls_built_in_root_certs(false)
                .danger_accept_invalid_certs(true);
        }
    }

    if let Some(ref identity) = config.client_identity {
        builder = builder.identity(build_reqwest_identity(identity)?);
    }

    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in &config.additional_headers {
        let name = reqwest::header::HeaderName::try_from(name.as_str())
            .map_err(|e| EstError::config(format!("Invalid header name '{}': {}", name, e)))?;
        let value = reqwest::header::HeaderValue::try_from(value.as_str())
            .map_err(|e| EstError::config(format!("Invalid header value: {}", e)))?;
        headers.insert(name, value);
    }
    builder = builder.default_headers(headers);

    builder
        .build()
        .map_err(|e| EstError::tls(format!("Failed to build HTTP client: {}", e)))
}

/// Build a reqwest Identity from PEM-encoded certificate and key.
fn build_reqwest_identity(identity: &ClientIdentity) -> Result<reqwest::Identity> {
    // Fail early with a PEM diagnostic rather than an opaque TLS one.
    parse_pem_certificates(&identity.cert_pem)?;
    parse_pem_private_key(&identity.key_pem)?;

    let mut pem_data = identity.cert_pem.clone();
    pem_data.extend_from_slice(b"\n");
    pem_data.extend_from_slice(&identity.key_pem);

    reqwest::Identity::from_pem(&pem_data)
        .map_err(|e| EstError::tls(format!("Failed to create client identity: {}", e)))
}

/// Parse PEM-encoded certificates.
pub fn parse_pem_certificates(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::BufReader::new(pem_data);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| EstError::invalid_pem(format!("Failed to parse PEM: {}", e)))?;

    if certs.is_empty() {
        return Err(EstError::invalid_pem("No certificates found in PEM data"));
    }

    Ok(certs)
}

/// Parse a PEM-encoded private key.
pub fn parse_pem_private_key(pem_data: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut reader = std::io::BufReader::new(pem_data);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| EstError::invalid_pem(format!("Failed to parse PEM: {}", e)))?
        .ok_or_else(|| EstError::invalid_pem("No private key found in PEM data"))
}
