//! Verification of signed XRDS documents.
//!
//! Only the XML Simple Sign profile is supported: the signature covers the
//! exact bytes received ("raw octets" canonicalization) and is computed with
//! RSA-SHA1. The signature value travels out of band, in the `Signature` HTTP
//! response header; the document only declares the algorithms and embeds the
//! signing certificate chain.
//!
//! # Examples
//!
//! ```no_run
//! use hosted_discovery::signature::SignatureVerifier;
//! use hosted_discovery::trust::TrustRootSet;
//!
//! # fn example(body: &[u8], signature_header: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = SignatureVerifier::new(TrustRootSet::from_paths(["/etc/ssl/certs"])?);
//! let signer = verifier.verify(body, signature_header)?;
//! println!("document signed by {signer}");
//! # Ok(())
//! # }
//! ```

use crate::observability::log_debug;
use crate::trust::TrustRootSet;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use block::SignatureBlock;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha1::Sha1;

mod block;
pub mod error;

pub use error::SignatureError;

/// Canonicalization algorithm meaning "sign the bytes exactly as sent".
pub const C14N_RAW_OCTETS: &str =
    "http://docs.oasis-open.org/xri/xrd/2009/01#canonicalize-raw-octets";

/// RSA-SHA1 signature algorithm.
pub const SIGN_RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";

/// XML-DSig namespace.
pub const NS_DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Outcome of verifying one document, for callers that want a flat record
/// instead of an error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SignatureVerificationResult {
    /// `true` if the signature and its certificate chain are valid.
    pub valid: bool,
    /// Lowercased subject CN of the signing certificate, present only when `valid`.
    pub signer_common_name: Option<String>,
}

impl From<Result<String, SignatureError>> for SignatureVerificationResult {
    fn from(result: Result<String, SignatureError>) -> Self {
        match result {
            Ok(cn) => Self {
                valid: true,
                signer_common_name: Some(cn),
            },
            Err(_) => Self {
                valid: false,
                signer_common_name: None,
            },
        }
    }
}

/// Verifies XML Simple Sign signatures against a [`TrustRootSet`].
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    trust_roots: TrustRootSet,
}

impl SignatureVerifier {
    /// Creates a verifier trusting the given roots.
    pub fn new(trust_roots: TrustRootSet) -> Self {
        Self { trust_roots }
    }

    /// Returns the trust roots signing chains are validated against.
    pub fn trust_roots(&self) -> &TrustRootSet {
        &self.trust_roots
    }

    /// Verifies that `document` was signed by the key of its embedded signing
    /// certificate, and that the certificate chains up to a trusted root.
    ///
    /// # Arguments
    ///
    /// * `document` - The document exactly as received. These bytes are what
    ///   the signature is checked against.
    /// * `signature` - The base64 signature value.
    ///
    /// Returns the lowercased subject common name of the signing certificate.
    /// Deciding whether that signer may speak for a given authority is up to
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] variant for the first check that fails.
    pub fn verify(&self, document: &[u8], signature: &str) -> Result<String, SignatureError> {
        let doc = crate::xml::parse_document(document).map_err(SignatureError::MalformedXml)?;
        let block = SignatureBlock::extract(&doc)?;

        if block.canonicalization != C14N_RAW_OCTETS {
            return Err(SignatureError::UnsupportedCanonicalization(
                block.canonicalization,
            ));
        }
        if block.algorithm != SIGN_RSA_SHA1 {
            return Err(SignatureError::UnsupportedSignatureAlgorithm(
                block.algorithm,
            ));
        }

        let certificates = block.certificates()?;
        let (leaf, intermediates) = certificates
            .split_first()
            .ok_or(SignatureError::MissingCertificate)?;

        let public_key = {
            let x509 = leaf.parse()?;
            RsaPublicKey::from_public_key_der(x509.public_key().raw)
                .map_err(|_| SignatureError::UnsupportedKey)?
        };
        verify_rsa_sha1(public_key, document, signature)?;

        if !self.trust_roots.verify(leaf, intermediates)? {
            return Err(SignatureError::UntrustedChain);
        }

        let signer = leaf.common_name()?;
        log_debug!("verified document signature from {signer}");
        Ok(signer)
    }

    /// Like [`SignatureVerifier::verify`], flattened into a
    /// [`SignatureVerificationResult`].
    pub fn check(&self, document: &[u8], signature: &str) -> SignatureVerificationResult {
        self.verify(document, signature).into()
    }
}

fn verify_rsa_sha1(
    public_key: RsaPublicKey,
    document: &[u8],
    signature: &str,
) -> Result<(), SignatureError> {
    let compact: String = signature
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let raw = STANDARD.decode(compact.as_bytes())?;
    let signature =
        Signature::try_from(raw.as_slice()).map_err(|_| SignatureError::SignatureMismatch)?;

    VerifyingKey::<Sha1>::new(public_key)
        .verify(document, &signature)
        .map_err(|_| SignatureError::SignatureMismatch)
}
