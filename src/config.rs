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

//! Configuration types for the EST client.
//!
//! [`EstClientConfig`] is built programmatically through
//! [`EstClientConfigBuilder`], or loaded from a TOML file through
//! [`ConfigFile`]:
//!
//! ```toml
//! [server]
//! host = "est.example.com:8443"
//! ca_label = "arbitraryLabel1"
//! timeout_secs = 30
//!
//! [trust]
//! ca_bundle_path = "/etc/est/ca-bundle.pem"
//!
//! [authentication]
//! username = "device01"
//! password = "secret"
//! client_cert_path = "/etc/est/client.pem"
//! client_key_path = "/etc/est/client-key.pem"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::endpoint::EndpointDescriptor;
use crate::error::{EstError, Result};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for an EST client.
#[derive(Clone)]
pub struct EstClientConfig {
    /// EST server authority (`host` or `host:port`).
    pub host: String,

    /// Optional CA label for multi-CA deployments.
    ///
    /// When set, the EST path becomes `/.well-known/est/{ca_label}/{operation}`.
    pub ca_label: Option<String>,

    /// Client identity for TLS client certificate authentication.
    pub client_identity: Option<ClientIdentity>,

    /// HTTP Basic authentication credentials.
    pub http_auth: Option<HttpAuth>,

    /// Trust anchor configuration for server certificate verification.
    pub trust_anchors: TrustAnchors,

    /// Request timeout duration.
    pub timeout: Duration,

    /// Additional HTTP headers to include in requests.
    pub additional_headers: Vec<(String, String)>,
}

impl std::fmt::Debug for EstClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstClientConfig")
            .field("host", &self.host)
            .field("ca_label", &self.ca_label)
            .field("client_identity", &self.client_identity.is_some())
            .field("http_auth", &self.http_auth.is_some())
            .field("trust_anchors", &self.trust_anchors)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl EstClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EstClientConfigBuilder {
        EstClientConfigBuilder::new()
    }

    /// The endpoint descriptor for this configuration.
    pub fn endpoint(&self) -> EndpointDescriptor {
        match self.ca_label {
            Some(ref label) => EndpointDescriptor::with_label(&self.host, label),
            None => EndpointDescriptor::new(&self.host),
        }
    }
}

/// Builder for [`EstClientConfig`].
#[derive(Default)]
pub struct EstClientConfigBuilder {
    host: Option<String>,
    ca_label: Option<String>,
    client_identity: Option<ClientIdentity>,
    http_auth: Option<HttpAuth>,
    trust_anchors: Option<TrustAnchors>,
    timeout: Option<Duration>,
    additional_headers: Vec<(String, String)>,
}

impl EstClientConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the EST server authority (`host` or `host:port`).
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the CA label for multi-CA deployments.
    pub fn ca_label(mut self, label: impl Into<String>) -> Self {
        self.ca_label = Some(label.into());
        self
    }

    /// Set the client identity for TLS client authentication.
    pub fn client_identity(mut self, identity: ClientIdentity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    /// Set HTTP Basic authentication credentials.
    pub fn http_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.http_auth = Some(HttpAuth::new(username, password));
        self
    }

    /// Use Mozilla's root CA store (webpki-roots) for server verification.
    pub fn trust_webpki_roots(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::WebPki);
        self
    }

    /// Use explicit PEM-encoded CA certificates for server verification.
    pub fn trust_explicit(mut self, ca_certs: Vec<Vec<u8>>) -> Self {
        self.trust_anchors = Some(TrustAnchors::Explicit(ca_certs));
        self
    }

    /// Accept any server certificate (insecure, for testing only).
    pub fn trust_any_insecure(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::InsecureAcceptAny);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add an additional HTTP header to all requests.
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is missing or is not a bare authority.
    pub fn build(self) -> Result<EstClientConfig> {
        let host = self
            .host
            .ok_or_else(|| EstError::config("host is required"))?;
        validate_host(&host)?;

        if let Some(ref label) = self.ca_label {
            if label.is_empty() || label.contains('/') {
                return Err(EstError::config(format!("invalid CA label '{}'", label)));
            }
        }

        Ok(EstClientConfig {
            host,
            ca_label: self.ca_label,
            client_identity: self.client_identity,
            http_auth: self.http_auth,
            trust_anchors: self.trust_anchors.unwrap_or(TrustAnchors::WebPki),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            additional_headers: self.additional_headers,
        })
    }
}

/// A host must parse as the authority of an https URL and carry nothing else.
fn validate_host(host: &str) -> Result<()> {
    let url = Url::parse(&format!("https://{}/", host))
        .map_err(|e| EstError::config(format!("invalid host '{}': {}", host, e)))?;

    if url.path() != "/" || url.query().is_some() || !url.username().is_empty() {
        return Err(EstError::config(format!(
            "host '{}' must not contain a path, query or credentials",
            host
        )));
    }
    Ok(())
}

/// Client identity for TLS client certificate authentication.
#[derive(Clone)]
pub struct ClientIdentity {
    /// PEM-encoded certificate chain, client certificate first.
    pub cert_pem: Vec<u8>,

    /// PEM-encoded private key.
    pub key_pem: Vec<u8>,
}

impl ClientIdentity {
    /// Create a new client identity from PEM-encoded data.
    pub fn new(cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    /// Create a client identity from file paths.
    pub fn from_files(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self> {
        let cert_pem = std::fs::read(cert_path)?;
        let key_pem = std::fs::read(key_path)?;
        Ok(Self { cert_pem, key_pem })
    }
}

/// HTTP Basic authentication credentials.
#[derive(Clone)]
pub struct HttpAuth {
    /// Username (may be empty for password-only auth).
    pub username: String,

    /// Password.
    pub password: String,
}

impl HttpAuth {
    /// Create new HTTP auth credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Trust anchor configuration for server certificate verification.
#[derive(Clone)]
pub enum TrustAnchors {
    /// Use Mozilla's root CA store (webpki-roots).
    WebPki,

    /// Use explicit CA certificates (PEM-encoded, one bundle per entry).
    Explicit(Vec<Vec<u8>>),

    /// Accept any server certificate (insecure, for testing only).
    ///
    /// **WARNING**: This disables all server certificate verification.
    InsecureAcceptAny,
}

impl std::fmt::Debug for TrustAnchors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebPki => write!(f, "WebPki"),
            Self::Explicit(certs) => write!(f, "Explicit({} bundles)", certs.len()),
            Self::InsecureAcceptAny => write!(f, "InsecureAcceptAny"),
        }
    }
}

// ============================================================================
// TOML configuration file
// ============================================================================

/// On-disk client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// EST server section.
    pub server: ServerSection,

    /// TLS trust section.
    #[serde(default)]
    pub trust: TrustSection,

    /// Authentication section.
    #[serde(default)]
    pub authentication: AuthenticationSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Server authority (`host` or `host:port`).
    pub host: String,

    /// Optional CA label.
    #[serde(default)]
    pub ca_label: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// `[trust]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustSection {
    /// PEM bundle of CA certificates to trust instead of the WebPKI roots.
    #[serde(default)]
    pub ca_bundle_path: Option<PathBuf>,

    /// Disable server certificate verification (testing only).
    #[serde(default)]
    pub insecure: bool,
}

/// `[authentication]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthenticationSection {
    /// HTTP Basic username.
    #[serde(default)]
    pub username: Option<String>,

    /// HTTP Basic password.
    #[serde(default)]
    pub password: Option<String>,

    /// PEM client certificate chain for TLS client authentication.
    #[serde(default)]
    pub client_cert_path: Option<PathBuf>,

    /// PEM private key matching `client_cert_path`.
    #[serde(default)]
    pub client_key_path: Option<PathBuf>,
}

impl ConfigFile {
    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| EstError::config(format!("Invalid TOML: {e}")))
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EstError::config(format!("TOML serialize: {e}")))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EstError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_toml(&contents)
    }

    /// Convert into an [`EstClientConfig`], reading referenced PEM files.
    pub fn to_client_config(&self) -> Result<EstClientConfig> {
        let mut builder = EstClientConfig::builder()
            .host(&self.server.host)
            .timeout(Duration::from_secs(self.server.timeout_secs));

        if let Some(ref label) = self.server.ca_label {
            builder = builder.ca_label(label);
        }

        if self.trust.insecure {
            tracing::warn!("Server certificate verification is disabled");
            builder = builder.trust_any_insecure();
        } else if let Some(ref path) = self.trust.ca_bundle_path {
            builder = builder.trust_explicit(vec![std::fs::read(path)?]);
        }

        let auth = &self.authentication;
        match (&auth.username, &auth.password) {
            (Some(user), Some(pass)) => builder = builder.http_auth(user, pass),
            (None, None) => {}
            _ => {
                return Err(EstError::config(
                    "username and password must be configured together",
                ))
            }
        }

        match (&auth.client_cert_path, &auth.client_key_path) {
            (Some(cert), Some(key)) => {
                builder = builder.client_identity(ClientIdentity::from_files(cert, key)?)
            }
            (None, None) => {}
            _ => {
                return Err(EstError::config(
                    "client_cert_path and client_key_path must be configured together",
                ))
            }
        }

        builder.build()
    }
}
