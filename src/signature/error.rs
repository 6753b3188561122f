//! Error types for signed document verification.

use crate::cert::error::CertificateError;

/// An error that can arise verifying a signed XML document.
///
/// Every variant is terminal for the verification: there is no partial success.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum SignatureError {
    /// The document is not well-formed XML.
    #[error("malformed XML document: {0}")]
    MalformedXml(String),

    /// The document has no `ds:SignedInfo` element.
    #[error("document has no signature block")]
    MissingSignatureBlock,

    /// The declared canonicalization method is not raw octets.
    #[error("unsupported canonicalization algorithm: {0:?}")]
    UnsupportedCanonicalization(String),

    /// The declared signature method is not RSA-SHA1.
    #[error("unsupported signature algorithm: {0:?}")]
    UnsupportedSignatureAlgorithm(String),

    /// The signature block embeds no X.509 certificate.
    #[error("signature block has no X.509 certificate")]
    MissingCertificate,

    /// The signing certificate does not carry an RSA public key.
    #[error("signing certificate does not hold an RSA public key")]
    UnsupportedKey,

    /// The signature value is not valid base64.
    #[error("signature value is not valid base64")]
    InvalidSignatureEncoding(#[from] base64::DecodeError),

    /// The signature does not match the document and signing key.
    #[error("signature verification failed")]
    SignatureMismatch,

    /// The signing certificate does not chain up to a trusted root.
    #[error("cannot verify trust chain of signing certificate")]
    UntrustedChain,

    /// An embedded certificate cannot be decoded or inspected.
    #[error(transparent)]
    Certificate(#[from] CertificateError),
}
