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

//! CSR (Certificate Signing Request) generation utilities.
//!
//! This module provides a builder for creating PKCS#10 requests ready to be
//! handed to [`EstClient::simple_enroll`](crate::EstClient::simple_enroll).
//! It is feature-gated behind the `csr-gen` feature.

use std::net::IpAddr;

use der::Decode;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, KeyPair,
    KeyUsagePurpose, SanType,
};
use x509_cert::request::CertReq;

use crate::error::{EstError, Result};

/// Builder for creating Certificate Signing Requests.
///
/// Subject alternative names are validated when [`build`](Self::build) runs,
/// so an invalid DNS name surfaces as an error rather than a panic.
///
/// # Example
///
/// ```no_run
/// use est_protocol::csr::CsrBuilder;
///
/// # fn example() -> est_protocol::Result<()> {
/// let (csr, key_pair) = CsrBuilder::new()
///     .common_name("device.example.com")
///     .organization("Example Corp")
///     .san_dns("device.example.com")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct CsrBuilder {
    subject: Vec<(DnType, String)>,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
    client_auth: bool,
    key_pair: Option<KeyPair>,
}

impl CsrBuilder {
    /// Create a new CSR builder with an empty subject.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Common Name (CN) for the subject.
    pub fn common_name(self, cn: impl Into<String>) -> Self {
        self.subject_field(DnType::CommonName, cn)
    }

    /// Set the Organization (O) for the subject.
    pub fn organization(self, org: impl Into<String>) -> Self {
        self.subject_field(DnType::OrganizationName, org)
    }

    /// Set the Organizational Unit (OU) for the subject.
    pub fn organizational_unit(self, ou: impl Into<String>) -> Self {
        self.subject_field(DnType::OrganizationalUnitName, ou)
    }

    /// Set the Country (C) for the subject.
    pub fn country(self, country: impl Into<String>) -> Self {
        self.subject_field(DnType::CountryName, country)
    }

    fn subject_field(mut self, kind: DnType, value: impl Into<String>) -> Self {
        self.subject.push((kind, value.into()));
        self
    }

    /// Add a DNS Subject Alternative Name.
    pub fn san_dns(mut self, dns: impl Into<String>) -> Self {
        self.dns_names.push(dns.into());
        self
    }

    /// Add an IP address Subject Alternative Name.
    pub fn san_ip(mut self, ip: IpAddr) -> Self {
        self.ip_addresses.push(ip);
        self
    }

    /// Request digitalSignature key usage and the TLS client auth EKU.
    pub fn client_auth(mut self) -> Self {
        self.client_auth = true;
        self
    }

    /// Use an existing key pair instead of generating a new one.
    pub fn with_key_pair(mut self, key_pair: KeyPair) -> Self {
        self.key_pair = Some(key_pair);
        self
    }

    /// Build the CSR, generating an ECDSA P-256 key pair unless one was supplied.
    pub fn build(self) -> Result<(CertReq, KeyPair)> {
        let mut params = CertificateParams::default();

        let mut subject = DistinguishedName::new();
        for (kind, value) in self.subject {
            subject.push(kind, value);
        }
        params.distinguished_name = subject;

        for name in self.dns_names {
            let dns = name
                .clone()
                .try_into()
                .map_err(|e| EstError::csr(format!("Invalid DNS name '{}': {}", name, e)))?;
            params.subject_alt_names.push(SanType::DnsName(dns));
        }
        params
            .subject_alt_names
            .extend(self.ip_addresses.into_iter().map(SanType::IpAddress));

        if self.client_auth {
            params.key_usages.push(KeyUsagePurpose::DigitalSignature);
            params
                .extended_key_usages
                .push(ExtendedKeyUsagePurpose::ClientAuth);
        }

        let key_pair = match self.key_pair {
            Some(kp) => kp,
            None => KeyPair::generate()
                .map_err(|e| EstError::csr(format!("Failed to generate key pair: {}", e)))?,
        };

        let request = params
            .serialize_request(&key_pair)
            .map_err(|e| EstError::csr(format!("Failed to serialize CSR: {}", e)))?;

        let csr = CertReq::from_der(request.der())
            .map_err(|e| EstError::csr(format!("Failed to parse generated CSR: {}", e)))?;

        Ok((csr, key_pair))
    }
}

/// Generate a CSR for a device identified by `common_name`.
pub fn generate_device_csr(common_name: &str) -> Result<(CertReq, KeyPair)> {
    CsrBuilder::new()
        .common_name(common_name)
        .san_dns(common_name)
        .client_auth()
        .build()
}
