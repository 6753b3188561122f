//! `Certificate` type and helpers.
//!
//! Certificates wrap DER-encoded bytes and are validated at construction time.

use crate::cert::error::CertificateError;
use crate::cert::parsing::{
    certificates_from_pem_or_der, parse_der_encoded_bytes_as_x509_certificate,
    subject_common_name,
};
use x509_parser::certificate::X509Certificate;

pub mod error;
pub(crate) mod parsing;

/// A single DER-encoded X.509 certificate.
///
/// Invariant: instances are always validated as parseable DER-encoded X.509.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Certificate(Vec<u8>);

impl Certificate {
    /// Returns the certificate bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the subject common name, lowercased.
    ///
    /// This is the signer identity a signed XRDS document is attributed to.
    ///
    /// # Errors
    /// - [`CertificateError::MissingCommonName`] if the subject has no CN attribute.
    /// - [`CertificateError::ParseX509Certificate`] if the CN is not a string.
    pub fn common_name(&self) -> Result<String, CertificateError> {
        let x509 = self.parse()?;
        Ok(subject_common_name(&x509)?.to_lowercase())
    }

    /// Parses all certificates found in `bytes`, which may hold any number of
    /// PEM `CERTIFICATE` blocks or exactly one DER certificate.
    ///
    /// # Errors
    ///
    /// Returns a [`CertificateError`] if a block cannot be decoded.
    pub fn parse_pem_or_der(bytes: &[u8]) -> Result<Vec<Certificate>, CertificateError> {
        certificates_from_pem_or_der(bytes)
    }

    pub(crate) fn parse(&self) -> Result<X509Certificate<'_>, CertificateError> {
        parse_der_encoded_bytes_as_x509_certificate(&self.0)
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Certificate {
    type Error = CertificateError;

    fn try_from(der_bytes: &[u8]) -> Result<Self, Self::Error> {
        parse_der_encoded_bytes_as_x509_certificate(der_bytes)?;
        Ok(Self(Vec::from(der_bytes)))
    }
}

impl TryFrom<Vec<u8>> for Certificate {
    type Error = CertificateError;

    fn try_from(der_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        parse_der_encoded_bytes_as_x509_certificate(&der_bytes)?;
        Ok(Self(der_bytes))
    }
}
