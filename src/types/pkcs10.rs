//! PKCS#10 certification request codec.

use std::io::Write;

use der::{Decode, DecodePem, Encode};
use x509_cert::request::CertReq;

use crate::error::{EstError, Result};

/// Streams the DER encoding of a CSR into a sink.
pub trait CsrEncoder: Send + Sync {
    /// Write `csr` to `sink`.
    fn encode(&self, sink: &mut dyn Write, csr: &CertReq) -> Result<()>;
}

/// Parses a CSR from its DER encoding.
pub trait CsrDecoder: Send + Sync {
    /// Decode `der` (already base64-decoded) into a CSR.
    fn decode(&self, der: &[u8]) -> Result<CertReq>;
}

/// DER PKCS#10 codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pkcs10Codec;

impl CsrEncoder for Pkcs10Codec {
    fn encode(&self, sink: &mut dyn Write, csr: &CertReq) -> Result<()> {
        let der = csr
            .to_der()
            .map_err(|e| EstError::csr(format!("Failed to encode CSR: {}", e)))?;
        sink.write_all(&der)?;
        Ok(())
    }
}

impl CsrDecoder for Pkcs10Codec {
    fn decode(&self, der: &[u8]) -> Result<CertReq> {
        CertReq::from_der(der).map_err(|e| EstError::csr(format!("Failed to parse CSR: {}", e)))
    }
}

/// Load a CSR from PEM (`CERTIFICATE REQUEST`) or raw DER bytes.
pub fn load_csr(data: &[u8]) -> Result<CertReq> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());

    if data[start..].starts_with(b"-----BEGIN") {
        CertReq::from_pem(data)
            .map_err(|e| EstError::invalid_pem(format!("Failed to parse CSR PEM: {}", e)))
    } else {
        Pkcs10Codec.decode(data)
    }
}
