//! PKCS#7/CMS certs-only codec.
//!
//! EST carries certificate sequences as a degenerate CMS `SignedData`
//! ("certs-only"): no signers, no encapsulated content, just the
//! `certificates` field. This module decodes that structure for the client
//! and builds it for the CA distribution mediator.

use std::io::Write;

use cms::cert::CertificateChoices;
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    DigestAlgorithmIdentifiers, EncapsulatedContentInfo, SignedData, SignerInfos,
};
use const_oid::db::rfc5911::{ID_DATA, ID_SIGNED_DATA};
use der::asn1::{AnyRef, SetOfVec};
use der::{Any, Decode, Encode, Header, Reader, SliceReader, Tag, TagNumber};
use x509_cert::Certificate;

use crate::envelope::decode_base64_body;
use crate::error::{EstError, Result};

/// `certificates [0] IMPLICIT CertificateSet` inside `SignedData`.
const CERTIFICATES_TAG: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N0,
};

/// Decodes a DER certificate bundle into an ordered certificate sequence.
pub trait CertificateDecoder: Send + Sync {
    /// Decode `der` (already base64-decoded) into certificates, in bundle order.
    fn decode(&self, der: &[u8]) -> Result<Vec<Certificate>>;
}

/// Encodes a certificate sequence as a DER bundle into a sink.
pub trait CertificateEncoder: Send + Sync {
    /// Write the DER bundle for `certificates` to `sink`.
    fn encode(&self, sink: &mut dyn Write, certificates: &[Certificate]) -> Result<()>;
}

/// CMS `SignedData` certs-only codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pkcs7Codec;

impl CertificateDecoder for Pkcs7Codec {
    fn decode(&self, der: &[u8]) -> Result<Vec<Certificate>> {
        let content_info = ContentInfo::from_der(der)
            .map_err(|e| EstError::cms_parsing(format!("Failed to parse ContentInfo: {}", e)))?;

        check_signed_data(&content_info)?;

        let choices = certificate_choices(content_info.content.value())
            .map_err(|e| EstError::cms_parsing(format!("Failed to read certificates: {}", e)))?;

        Ok(extract_certificates(choices))
    }
}

impl CertificateEncoder for Pkcs7Codec {
    fn encode(&self, sink: &mut dyn Write, certificates: &[Certificate]) -> Result<()> {
        let der = encode_certs_only(certificates)?;
        sink.write_all(&der)?;
        Ok(())
    }
}

/// Collection of CA certificates returned from the /cacerts endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaCertificates {
    /// The CA certificates, in bundle order.
    pub certificates: Vec<Certificate>,
}

impl CaCertificates {
    /// Create a new CA certificates collection.
    pub fn new(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }

    /// Returns true if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Returns the number of certificates.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Get the first certificate, if any.
    pub fn first(&self) -> Option<&Certificate> {
        self.certificates.first()
    }

    /// Iterate over the certificates.
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.certificates.iter()
    }
}

impl IntoIterator for CaCertificates {
    type Item = Certificate;
    type IntoIter = std::vec::IntoIter<Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certificates.into_iter()
    }
}

impl<'a> IntoIterator for &'a CaCertificates {
    type Item = &'a Certificate;
    type IntoIter = std::slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certificates.iter()
    }
}

/// Parse a base64-encoded PKCS#7 certs-only body.
pub fn parse_certs_only(body: &[u8]) -> Result<Vec<Certificate>> {
    let der_bytes = decode_base64_body(body)?;
    Pkcs7Codec.decode(&der_bytes)
}

/// Build the DER encoding of a certs-only `SignedData` holding `certificates`.
///
/// The certificates are written in the order given. `der` would sort a
/// `SetOfVec` into canonical order, so the `[0]` set is assembled by hand.
pub fn encode_certs_only(certificates: &[Certificate]) -> Result<Vec<u8>> {
    let mut fields = Vec::new();
    CmsVersion::V1.encode_to_vec(&mut fields)?;
    DigestAlgorithmIdentifiers::new().encode_to_vec(&mut fields)?;
    EncapsulatedContentInfo {
        econtent_type: ID_DATA,
        econtent: None,
    }
    .encode_to_vec(&mut fields)?;

    if !certificates.is_empty() {
        let mut set = Vec::new();
        for certificate in certificates {
            certificate.encode_to_vec(&mut set)?;
        }
        Header::new(CERTIFICATES_TAG, set.len())?.encode_to_vec(&mut fields)?;
        fields.extend_from_slice(&set);
    }

    SignerInfos(SetOfVec::new()).encode_to_vec(&mut fields)?;

    let mut signed_data = Vec::with_capacity(fields.len() + 8);
    Header::new(Tag::Sequence, fields.len())?.encode_to_vec(&mut signed_data)?;
    signed_data.extend_from_slice(&fields);

    let content_info = ContentInfo {
        content_type: ID_SIGNED_DATA,
        content: Any::from_der(&signed_data)?,
    };

    Ok(content_info.to_der()?)
}

/// Check that ContentInfo carries a well-formed SignedData.
fn check_signed_data(content_info: &ContentInfo) -> Result<()> {
    if content_info.content_type != ID_SIGNED_DATA {
        return Err(EstError::cms_parsing(format!(
            "Expected SignedData OID, got {}",
            content_info.content_type
        )));
    }

    let content = content_info
        .content
        .to_der()
        .map_err(|e| EstError::cms_parsing(format!("Failed to encode content: {}", e)))?;

    SignedData::from_der(&content)
        .map(|_| ())
        .map_err(|e| EstError::cms_parsing(format!("Failed to parse SignedData: {}", e)))
}

/// Read the `certificates` set out of the SignedData SEQUENCE contents in
/// wire order.
fn certificate_choices(signed_data: &[u8]) -> der::Result<Vec<CertificateChoices>> {
    let mut reader = SliceReader::new(signed_data)?;

    // version, digestAlgorithms, encapContentInfo
    for _ in 0..3 {
        AnyRef::decode(&mut reader)?;
    }

    if reader.is_finished() || reader.peek_tag()? != CERTIFICATES_TAG {
        return Ok(Vec::new());
    }

    let header = Header::decode(&mut reader)?;
    reader.read_nested(header.length, |set| {
        let mut choices = Vec::new();
        while !set.is_finished() {
            choices.push(CertificateChoices::decode(set)?);
        }
        Ok(choices)
    })
}

fn extract_certificates(choices: Vec<CertificateChoices>) -> Vec<Certificate> {
    let mut certificates = Vec::with_capacity(choices.len());
    for choice in choices {
        match choice {
            CertificateChoices::Certificate(cert) => certificates.push(cert),
            _ => tracing::warn!("Skipping non-X.509 certificate choice"),
        }
    }

    certificates
}
