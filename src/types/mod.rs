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

//! EST message types and codecs.
//!
//! This module provides the enrollment outcome type and the PKCS#7 / PKCS#10
//! codecs used to move certificates and CSRs across the wire.

pub mod pkcs10;
pub mod pkcs7;

pub use pkcs10::{load_csr, CsrDecoder, CsrEncoder, Pkcs10Codec};
pub use pkcs7::{
    encode_certs_only, parse_certs_only, CaCertificates, CertificateDecoder, CertificateEncoder,
    Pkcs7Codec,
};

use std::time::Duration;

use x509_cert::Certificate;

/// Response from a simple enrollment or re-enrollment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentResponse {
    /// Certificate was issued immediately.
    Issued {
        /// The issued certificate.
        certificate: Box<Certificate>,
    },

    /// Enrollment is pending.
    ///
    /// The caller should resubmit the identical request after at least
    /// `retry_after` seconds.
    Pending {
        /// Number of seconds to wait before retrying.
        retry_after: u64,
    },
}

impl EnrollmentResponse {
    /// Create a new issued response.
    pub fn issued(certificate: Certificate) -> Self {
        Self::Issued {
            certificate: Box::new(certificate),
        }
    }

    /// Create a new pending response.
    pub fn pending(retry_after: u64) -> Self {
        Self::Pending { retry_after }
    }

    /// Returns the certificate if the enrollment was successful.
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            Self::Issued { certificate } => Some(certificate),
            Self::Pending { .. } => None,
        }
    }

    /// Consume the response, returning the certificate if it was issued.
    pub fn into_certificate(self) -> Option<Certificate> {
        match self {
            Self::Issued { certificate } => Some(*certificate),
            Self::Pending { .. } => None,
        }
    }

    /// Returns true if the enrollment is pending.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Returns the retry-after value if pending.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Pending { retry_after } => Some(*retry_after),
            Self::Issued { .. } => None,
        }
    }

    /// Returns the retry-after delay as a [`Duration`] if pending.
    pub fn retry_delay(&self) -> Option<Duration> {
        self.retry_after().map(Duration::from_secs)
    }
}
