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

//! EST wire envelope.
//!
//! EST payloads are DER structures carried base64-encoded in the HTTP body
//! and tagged by two headers: `Content-Type` and
//! `Content-Transfer-Encoding: base64`. This module holds the header
//! predicates run against every response before its body is touched, plus
//! the base64 helpers used on both sides of the wire.

use std::io::Write;

use base64::prelude::*;
use base64::write::EncoderWriter;
use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderName, CONTENT_TYPE, RETRY_AFTER};

use crate::error::{EstError, Result};

/// `Content-Transfer-Encoding` header name.
pub const CONTENT_TRANSFER_ENCODING: HeaderName =
    HeaderName::from_static("content-transfer-encoding");

/// The only transfer encoding EST uses.
pub const BASE64_ENCODING: &str = "base64";

/// Content types used in the EST protocol.
pub mod content_types {
    /// PKCS#10 CSR content type.
    pub const PKCS10: &str = "application/pkcs10";

    /// PKCS#7/CMS content type.
    pub const PKCS7_MIME: &str = "application/pkcs7-mime";

    /// PKCS#7 certs-only content type emitted by the CA distribution mediator.
    pub const PKCS7_CERTS_ONLY: &str = "application/pkcs7-mime;smime-type=certs-only";
}

/// Fail unless `actual` is one of `allowed`.
pub fn check_status_code(actual: u16, allowed: &[u16]) -> Result<()> {
    if allowed.contains(&actual) {
        Ok(())
    } else {
        Err(EstError::unexpected_status(actual, allowed))
    }
}

/// Fail unless `Content-Type` is exactly `expected`.
///
/// For `application/pkcs7-mime` the exact certs-only form the mediator emits
/// is also accepted. No other parameters, casing or whitespace are tolerated.
pub fn check_content_type(headers: &HeaderMap, expected: &str) -> Result<()> {
    let actual = header_str(headers, &CONTENT_TYPE);

    let matches = actual == expected
        || (expected == content_types::PKCS7_MIME && actual == content_types::PKCS7_CERTS_ONLY);
    if !matches {
        return Err(EstError::invalid_content_type(expected, actual));
    }
    Ok(())
}

/// Fail unless `Content-Transfer-Encoding` is exactly `base64`.
pub fn check_content_transfer_encoding(headers: &HeaderMap) -> Result<()> {
    let actual = header_str(headers, &CONTENT_TRANSFER_ENCODING);

    if actual != BASE64_ENCODING {
        return Err(EstError::invalid_transfer_encoding(actual));
    }
    Ok(())
}

/// Run both header checks. Must succeed before the body is decoded.
pub fn validate_envelope(headers: &HeaderMap, expected_content_type: &str) -> Result<()> {
    check_content_type(headers, expected_content_type)?;
    check_content_transfer_encoding(headers)
}

/// Read the mandatory `Retry-After` header of a 202 response as seconds.
pub fn retry_after_seconds(headers: &HeaderMap) -> Result<u64> {
    let value = headers
        .get(RETRY_AFTER)
        .ok_or_else(|| EstError::missing_header("Retry-After"))?;
    let value = value
        .to_str()
        .map_err(|_| EstError::invalid_retry_after(String::from_utf8_lossy(value.as_bytes())))?;

    parse_retry_after(value, Utc::now())
}

/// Parse a `Retry-After` value relative to `now`.
///
/// Accepts delta-seconds and HTTP-dates (RFC 9110 Section 10.2.3). A date in
/// the past yields zero.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Result<u64> {
    let value = value.trim();

    // delta-seconds is 1*DIGIT, no sign.
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<u64>()
            .map_err(|_| EstError::invalid_retry_after(value));
    }

    let date = DateTime::parse_from_rfc2822(value)
        .map_err(|_| EstError::invalid_retry_after(value))?
        .with_timezone(&Utc);

    Ok((date - now).num_seconds().max(0) as u64)
}

/// Base64-encode whatever `encode` writes, through a scoped streaming encoder.
///
/// The encoder is finished before the buffer is returned so trailing bytes
/// and padding are always materialized.
pub fn encode_base64_envelope<F>(encode: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let mut encoder = EncoderWriter::new(Vec::new(), &BASE64_STANDARD);
    let sink: &mut dyn Write = &mut encoder;
    encode(sink)?;
    encoder.flush()?;
    Ok(encoder.finish()?)
}

/// Decode a base64 body, tolerating line breaks and other ASCII whitespace.
pub fn decode_base64_body(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    BASE64_STANDARD.decode(&cleaned).map_err(EstError::Base64)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
