//! Error types for certificate decoding and inspection.

use x509_parser::error::{PEMError, X509Error};

/// An error that may arise decoding or inspecting X.509 certificates.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    /// Error returned by the X.509 parsing library.
    #[error("failed parsing X.509 certificate")]
    ParseX509Certificate(#[from] X509Error),

    /// A PEM block could not be decoded.
    #[error("failed decoding PEM certificate: {0}")]
    DecodePem(String),

    /// A base64 certificate (as embedded in an XML signature) could not be decoded.
    #[error("failed decoding base64 certificate: {0}")]
    DecodeBase64(#[from] base64::DecodeError),

    /// The certificate subject has no common name attribute.
    #[error("certificate subject has no common name")]
    MissingCommonName,

    /// The certificate chain exceeds the supported length.
    #[error("certificate chain is too long (max {max})")]
    TooManyCertificates {
        /// Maximum number of certificates accepted in a chain.
        max: usize,
    },
}

impl From<PEMError> for CertificateError {
    fn from(e: PEMError) -> Self {
        CertificateError::DecodePem(e.to_string())
    }
}
