//! Error types for the EST protocol core.
//!
//! Errors fall into three families:
//!
//! - **protocol** errors: the peer violated the EST wire contract
//!   (unexpected status, wrong or missing envelope headers, missing
//!   `Retry-After`, an empty certificate bundle),
//! - **transport** errors: propagated unchanged from the HTTP/TLS layer,
//! - **codec** errors: the payload is not valid base64, DER, PKCS#7 or PKCS#10.
//!
//! None of them are retried internally. A pending enrollment is not an error;
//! it is reported as [`EnrollmentResponse::Pending`](crate::EnrollmentResponse::Pending).

use thiserror::Error;

/// Result type alias using [`EstError`].
pub type Result<T> = std::result::Result<T, EstError>;

/// Errors that can occur during EST operations.
#[derive(Debug, Error)]
pub enum EstError {
    /// Response status code is not one the operation accepts.
    #[error("Status code should be in {expected:?}; was {actual}")]
    UnexpectedStatus {
        /// Status codes the operation accepts.
        expected: Vec<u16>,
        /// Status code received.
        actual: u16,
    },

    /// Content-Type header is missing or does not equal the expected value.
    #[error("Content type should be {expected}; was '{actual}'")]
    InvalidContentType {
        /// Expected media type.
        expected: String,
        /// Received header value (empty when missing).
        actual: String,
    },

    /// Content-Transfer-Encoding header is missing or not `base64`.
    #[error("Content transfer encoding should be base64; was '{actual}'")]
    InvalidTransferEncoding {
        /// Received header value (empty when missing).
        actual: String,
    },

    /// Required HTTP header is missing from the response.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// Retry-After header could not be interpreted.
    #[error("Invalid Retry-After value: '{0}'")]
    InvalidRetryAfter(String),

    /// A successful enrollment response carried no certificate.
    #[error("No certificate in enrollment response")]
    EmptyCertificateBundle,

    /// HTTP request or response error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure outside of reqwest (request construction, custom transports).
    #[error("Transport error: {0}")]
    Transport(String),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// DER encoding/decoding error.
    #[error("DER error: {0}")]
    Der(#[from] der::Error),

    /// Failed to parse or build a CMS/PKCS#7 structure.
    #[error("CMS/PKCS#7 error: {0}")]
    CmsParsing(String),

    /// Failed to encode, decode or generate a CSR.
    #[error("CSR error: {0}")]
    Csr(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid PEM data.
    #[error("Invalid PEM data: {0}")]
    InvalidPem(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EstError {
    /// Create an unexpected status error.
    pub fn unexpected_status(actual: u16, expected: &[u16]) -> Self {
        Self::UnexpectedStatus {
            expected: expected.to_vec(),
            actual,
        }
    }

    /// Create an invalid content-type error.
    pub fn invalid_content_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidContentType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid transfer encoding error.
    pub fn invalid_transfer_encoding(actual: impl Into<String>) -> Self {
        Self::InvalidTransferEncoding {
            actual: actual.into(),
        }
    }

    /// Create a missing header error.
    pub fn missing_header(header: impl Into<String>) -> Self {
        Self::MissingHeader(header.into())
    }

    /// Create an invalid Retry-After error.
    pub fn invalid_retry_after(value: impl Into<String>) -> Self {
        Self::InvalidRetryAfter(value.into())
    }

    /// Create a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a TLS error with the given message.
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create a CMS parsing error with the given message.
    pub fn cms_parsing(msg: impl Into<String>) -> Self {
        Self::CmsParsing(msg.into())
    }

    /// Create a CSR error with the given message.
    pub fn csr(msg: impl Into<String>) -> Self {
        Self::Csr(msg.into())
    }

    /// Create a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid PEM error.
    pub fn invalid_pem(msg: impl Into<String>) -> Self {
        Self::InvalidPem(msg.into())
    }

    /// Returns true if the peer violated the EST wire contract.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedStatus { .. }
                | Self::InvalidContentType { .. }
                | Self::InvalidTransferEncoding { .. }
                | Self::MissingHeader(_)
                | Self::InvalidRetryAfter(_)
                | Self::EmptyCertificateBundle
        )
    }

    /// Returns true if the error came from the HTTP/TLS layer.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Transport(_) | Self::Tls(_))
    }

    /// Returns true if a payload could not be encoded or decoded.
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            Self::Base64(_) | Self::Der(_) | Self::CmsParsing(_) | Self::Csr(_)
        )
    }

    /// Returns the offending status code for [`EstError::UnexpectedStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}
