use crate::fetcher::FetchError;
use crate::signature::SignatureError;
use crate::xrds::XrdsError;

/// Why a signed discovery attempt failed.
///
/// Never returned from [`DiscoveryResolver::discover`]: every variant ends
/// in a logged fallback to generic discovery.
///
/// [`DiscoveryResolver::discover`]: crate::discovery::DiscoveryResolver::discover
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub(crate) enum DiscoveryError {
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature does not match the document")]
    SignatureMismatch,

    #[error("untrusted signing chain: {0}")]
    UntrustedChain(String),

    #[error("document signed by {signer:?}, expected {authority:?}")]
    SignerMismatch { signer: String, authority: String },

    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("received status {status} fetching {url}")]
    HttpFailure { url: String, status: u16 },

    #[error("missing {0} in XRDS")]
    MissingElement(&'static str),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Xrds(#[from] XrdsError),
}

impl From<SignatureError> for DiscoveryError {
    fn from(e: SignatureError) -> Self {
        match e {
            SignatureError::MalformedXml(msg) => DiscoveryError::MalformedXml(msg),
            SignatureError::UnsupportedCanonicalization(alg)
            | SignatureError::UnsupportedSignatureAlgorithm(alg) => {
                DiscoveryError::UnsupportedAlgorithm(alg)
            }
            SignatureError::UnsupportedKey => {
                DiscoveryError::UnsupportedAlgorithm("non-RSA signing key".to_owned())
            }
            SignatureError::MissingSignatureBlock => DiscoveryError::MissingElement("ds:SignedInfo"),
            SignatureError::MissingCertificate => {
                DiscoveryError::MissingElement("ds:X509Certificate")
            }
            SignatureError::InvalidSignatureEncoding(_) | SignatureError::SignatureMismatch => {
                DiscoveryError::SignatureMismatch
            }
            other => DiscoveryError::UntrustedChain(other.to_string()),
        }
    }
}
