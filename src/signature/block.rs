//! Extraction of the XML Simple Sign signature block.

use crate::cert::error::CertificateError;
use crate::cert::parsing::{decode_base64_certificate, MAX_CERT_CHAIN_LENGTH};
use crate::cert::Certificate;
use crate::signature::error::SignatureError;
use crate::signature::NS_DSIG;
use crate::xml::{children, is_element, text_content};
use roxmltree::Document;

/// What the signature block declares. Nothing here is trusted yet.
#[derive(Debug)]
pub(crate) struct SignatureBlock {
    pub(crate) canonicalization: String,
    pub(crate) algorithm: String,
    /// Base64 `X509Certificate` texts, leaf first, in document order.
    certificates: Vec<String>,
}

impl SignatureBlock {
    pub(crate) fn extract(doc: &Document<'_>) -> Result<Self, SignatureError> {
        let signed_info = doc
            .descendants()
            .find(|n| is_element(n, NS_DSIG, "SignedInfo"))
            .ok_or(SignatureError::MissingSignatureBlock)?;

        let canonicalization = algorithm_of(signed_info, "CanonicalizationMethod");
        let algorithm = algorithm_of(signed_info, "SignatureMethod");

        let certificates = doc
            .descendants()
            .filter(|n| is_element(n, NS_DSIG, "Signature"))
            .flat_map(|sig| children(sig, NS_DSIG, "KeyInfo"))
            .flat_map(|key_info| children(key_info, NS_DSIG, "X509Data"))
            .flat_map(|data| children(data, NS_DSIG, "X509Certificate"))
            .map(text_content)
            .collect();

        Ok(Self {
            canonicalization,
            algorithm,
            certificates,
        })
    }

    /// Decodes the embedded certificates: leaf first, then intermediates.
    pub(crate) fn certificates(&self) -> Result<Vec<Certificate>, SignatureError> {
        if self.certificates.is_empty() {
            return Err(SignatureError::MissingCertificate);
        }
        if self.certificates.len() > MAX_CERT_CHAIN_LENGTH {
            return Err(CertificateError::TooManyCertificates {
                max: MAX_CERT_CHAIN_LENGTH,
            }
            .into());
        }
        let certs = self
            .certificates
            .iter()
            .map(|text| decode_base64_certificate(text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(certs)
    }
}

fn algorithm_of(signed_info: roxmltree::Node<'_, '_>, method: &str) -> String {
    children(signed_info, NS_DSIG, method)
        .next()
        .and_then(|n| n.attribute("Algorithm"))
        .unwrap_or_default()
        .to_owned()
}
