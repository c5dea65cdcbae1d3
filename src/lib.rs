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

//! # est-protocol
//!
//! The protocol core of RFC 7030 EST (Enrollment over Secure Transport).
//!
//! Two roles share one wire contract:
//!
//! - [`EstClient`] fetches CA certificates and submits PKCS#10 requests for
//!   simple enrollment and re-enrollment, turning each HTTP response into a
//!   typed outcome.
//! - [`CaDistribution`](mediator::CaDistribution) answers CA certificate
//!   distribution requests on the server side with the same base64 PKCS#7
//!   envelope the client validates.
//!
//! ## Quick Start
//!
//! ```no_run
//! use est_protocol::{EstClient, EstClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EstClientConfig::builder()
//!         .host("est.example.com")
//!         .ca_label("arbitraryLabel1")
//!         .build()?;
//!
//!     let client = EstClient::new(config)?;
//!
//!     let ca_certs = client.get_ca_certs().await?;
//!     println!("Retrieved {} CA certificates", ca_certs.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Certificate Enrollment
//!
//! ```no_run
//! use est_protocol::{EstClient, EstClientConfig, EnrollmentResponse};
//! # #[cfg(feature = "csr-gen")]
//! use est_protocol::csr::CsrBuilder;
//!
//! # #[cfg(feature = "csr-gen")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EstClientConfig::builder()
//!     .host("est.example.com")
//!     .http_auth("username", "password")
//!     .build()?;
//!
//! let client = EstClient::new(config)?;
//!
//! let (csr, _key_pair) = CsrBuilder::new()
//!     .common_name("device.example.com")
//!     .san_dns("device.example.com")
//!     .build()?;
//!
//! match client.simple_enroll(&csr).await? {
//!     EnrollmentResponse::Issued { certificate } => {
//!         println!("Certificate issued to {}", certificate.tbs_certificate.subject);
//!     }
//!     EnrollmentResponse::Pending { retry_after } => {
//!         println!("Enrollment pending, retry in {} seconds", retry_after);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Pending enrollments are never retried by the library. Resubmit the same
//! request once the delay has passed.
//!
//! ## Cargo Features
//!
//! - `csr-gen` (default): Enables CSR generation helpers using `rcgen`
//!
//! ## RFC 7030 Compliance
//!
//! - Section 4.1: Distribution of CA Certificates (`get_ca_certs`, `CaDistribution`)
//! - Section 4.2.1: Simple Enrollment (`simple_enroll`)
//! - Section 4.2.2: Simple Re-enrollment (`simple_reenroll`)
//! - Section 4.2.3: Delayed issuance via 202 + `Retry-After`

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod mediator;
pub mod tls;
pub mod transport;
pub mod types;

#[cfg(feature = "csr-gen")]
pub mod csr;

// Re-export main types at crate root for convenience
pub use client::EstClient;
pub use config::{
    ClientIdentity, ConfigFile, EstClientConfig, EstClientConfigBuilder, HttpAuth, TrustAnchors,
};
pub use endpoint::{EndpointDescriptor, Operation};
pub use error::{EstError, Result};
pub use mediator::{decode_enrollment_request, CaDistribution, CaStateProvider, StaticCaState};
pub use transport::{HttpTransport, ReqwestTransport, ResponseBody};
pub use types::{CaCertificates, EnrollmentResponse};

// Re-export x509_cert types for convenience
pub use x509_cert::request::CertReq;
pub use x509_cert::Certificate;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent string for HTTP requests.
pub const USER_AGENT: &str = concat!("est-protocol/", env!("CARGO_PKG_VERSION"));
