// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Server-side EST mediator.
//!
//! [`CaDistribution`] answers `/cacerts` requests with the CA chain taken
//! from a [`CaStateProvider`], using the same base64 PKCS#7 envelope the
//! client validates. [`decode_enrollment_request`] is the matching inbound
//! path for `simpleenroll` / `simplereenroll` bodies.
//!
//! The mediator is framework agnostic: it consumes and produces `http` types
//! so any dispatcher can mount it.

use std::io::Write;
use std::sync::Arc;

use base64::prelude::*;
use base64::write::EncoderWriter;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use x509_cert::request::CertReq;
use x509_cert::Certificate;

use crate::envelope::{
    content_types, decode_base64_body, validate_envelope, BASE64_ENCODING,
    CONTENT_TRANSFER_ENCODING,
};
use crate::error::{EstError, Result};
use crate::types::{CertificateEncoder, CsrDecoder, Pkcs10Codec, Pkcs7Codec};

/// Source of the CA certificate chain served by [`CaDistribution`].
pub trait CaStateProvider: Send + Sync {
    /// Return the current CA chain, in distribution order.
    fn get_ca_certificates(&self) -> Result<Vec<Certificate>>;
}

/// Provider over a fixed certificate chain.
#[derive(Debug, Clone, Default)]
pub struct StaticCaState {
    certificates: Vec<Certificate>,
}

impl StaticCaState {
    /// Serve `certificates` unchanged on every request.
    pub fn new(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }
}

impl From<Vec<Certificate>> for StaticCaState {
    fn from(certificates: Vec<Certificate>) -> Self {
        Self::new(certificates)
    }
}

impl CaStateProvider for StaticCaState {
    fn get_ca_certificates(&self) -> Result<Vec<Certificate>> {
        Ok(self.certificates.clone())
    }
}

/// Answers CA certificate distribution requests.
#[derive(Clone)]
pub struct CaDistribution {
    provider: Arc<dyn CaStateProvider>,
    encoder: Arc<dyn CertificateEncoder>,
}

impl std::fmt::Debug for CaDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaDistribution").finish_non_exhaustive()
    }
}

impl CaDistribution {
    /// Create a mediator using the PKCS#7 certs-only encoder.
    pub fn new(provider: Arc<dyn CaStateProvider>) -> Self {
        Self {
            provider,
            encoder: Arc::new(Pkcs7Codec),
        }
    }

    /// Replace the certificate bundle encoder.
    pub fn with_encoder(mut self, encoder: Arc<dyn CertificateEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Stream the base64 certs-only bundle into `sink`.
    ///
    /// The base64 encoder is finished before `sink` is handed back, so the
    /// final quantum and its padding have been written.
    pub fn write_ca_certificates<W: Write>(&self, sink: W) -> Result<W> {
        let certificates = self.provider.get_ca_certificates()?;
        tracing::debug!("Distributing {} CA certificates", certificates.len());

        let mut encoder = EncoderWriter::new(sink, &BASE64_STANDARD);
        self.encoder.encode(&mut encoder, &certificates)?;
        Ok(encoder.finish()?)
    }

    /// Build the full `/cacerts` response.
    pub fn respond(&self) -> http::Response<Vec<u8>> {
        match self.write_ca_certificates(Vec::new()) {
            Ok(body) => http::Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, content_types::PKCS7_CERTS_ONLY)
                .header(CONTENT_TRANSFER_ENCODING, BASE64_ENCODING)
                .body(body)
                .unwrap_or_else(|_| status_only(StatusCode::INTERNAL_SERVER_ERROR)),
            Err(e) => {
                tracing::error!("Failed to distribute CA certificates: {}", e);
                status_only(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Dispatch a request aimed at the `/cacerts` endpoint.
    ///
    /// Only GET is served; anything else gets 405 with `Allow: GET`.
    pub fn handle<B>(&self, request: &http::Request<B>) -> http::Response<Vec<u8>> {
        if request.method() != Method::GET {
            tracing::debug!("Rejecting {} {}", request.method(), request.uri());
            let mut response = status_only(StatusCode::METHOD_NOT_ALLOWED);
            response
                .headers_mut()
                .insert(ALLOW, http::HeaderValue::from_static("GET"));
            return response;
        }

        self.respond()
    }
}

fn status_only(status: StatusCode) -> http::Response<Vec<u8>> {
    let mut response = http::Response::new(Vec::new());
    *response.status_mut() = status;
    response
}

/// Decode an inbound `simpleenroll` / `simplereenroll` body.
///
/// The envelope headers are checked before the body is touched.
pub fn decode_enrollment_request(headers: &HeaderMap, body: &[u8]) -> Result<CertReq> {
    decode_enrollment_request_with(&Pkcs10Codec, headers, body)
}

/// Decode with a caller-supplied CSR decoder.
pub fn decode_enrollment_request_with(
    decoder: &dyn CsrDecoder,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<CertReq> {
    validate_envelope(headers, content_types::PKCS10)?;
    let der = decode_base64_body(body)?;
    decoder.decode(&der)
}

impl EstError {
    /// Status code a mediator should answer with for this error.
    pub fn mediator_status(&self) -> StatusCode {
        if self.is_protocol_error() || self.is_codec_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
