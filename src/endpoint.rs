//! EST endpoint resolution.
//!
//! Every EST operation is published under the well-known root
//! `/.well-known/est/`, optionally qualified by a CA label for servers that
//! host more than one CA (RFC 7030 Section 3.2.2).

use std::fmt;

/// Well-known root under which all EST operations are published.
pub const WELL_KNOWN_LOCATION: &str = "/.well-known/est/";

/// EST operations implemented by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Distribution of CA certificates (`cacerts`).
    CaCertificates,
    /// Simple enrollment (`simpleenroll`).
    SimpleEnroll,
    /// Simple re-enrollment (`simplereenroll`).
    SimpleRenew,
}

impl Operation {
    /// Path segment of the operation below the well-known root.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::CaCertificates => "cacerts",
            Self::SimpleEnroll => "simpleenroll",
            Self::SimpleRenew => "simplereenroll",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Host and optional CA label of an EST server.
///
/// The descriptor does not validate its contents; callers are expected to
/// supply a well-formed authority (`host` or `host:port`) and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    host: String,
    ca_label: Option<String>,
}

impl EndpointDescriptor {
    /// Create a descriptor for the default CA of `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ca_label: None,
        }
    }

    /// Create a descriptor for the CA published under `label`.
    pub fn with_label(host: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ca_label: Some(label.into()),
        }
    }

    /// The server authority.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The CA label, if any.
    pub fn ca_label(&self) -> Option<&str> {
        self.ca_label.as_deref()
    }

    /// Absolute URL of `operation` on this endpoint.
    pub fn resolve(&self, operation: Operation) -> String {
        match self.ca_label {
            Some(ref label) => format!(
                "https://{}{}{}/{}",
                self.host,
                WELL_KNOWN_LOCATION,
                label,
                operation.path_segment()
            ),
            None => format!(
                "https://{}{}{}",
                self.host,
                WELL_KNOWN_LOCATION,
                operation.path_segment()
            ),
        }
    }
}
