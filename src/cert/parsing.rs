//! Internal parsing helpers.

use crate::cert::error::CertificateError;
use crate::cert::Certificate;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use x509_parser::certificate::X509Certificate;
use x509_parser::der_parser::oid::Oid;
use x509_parser::error::X509Error;
use x509_parser::extensions::ParsedExtension;
use x509_parser::nom::Err;
use x509_parser::pem::Pem;

const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Maximum number of certificates accepted from a single XML signature block.
///
/// Hosted identity providers send a leaf and at most a couple of intermediates.
pub(crate) const MAX_CERT_CHAIN_LENGTH: usize = 16;

/// Parses the given DER-encoded bytes as an X.509 certificate.
///
/// Returns a [`CertificateError`] if the input is not a parseable DER-encoded X.509 certificate.
pub(crate) fn parse_der_encoded_bytes_as_x509_certificate(
    der_bytes: &[u8],
) -> Result<X509Certificate<'_>, CertificateError> {
    match x509_parser::parse_x509_certificate(der_bytes) {
        Ok((_, cert)) => Ok(cert),
        Err(Err::Incomplete(_)) => Err(CertificateError::ParseX509Certificate(
            X509Error::InvalidCertificate,
        )),
        Err(Err::Error(e) | Err::Failure(e)) => Err(CertificateError::ParseX509Certificate(e)),
    }
}

/// Decodes the base64 text of an `X509Certificate` XML element.
///
/// Line breaks and indentation inside the element are ignored.
pub(crate) fn decode_base64_certificate(text: &str) -> Result<Certificate, CertificateError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let der = STANDARD.decode(compact.as_bytes())?;
    Certificate::try_from(der)
}

/// Reads every certificate from a buffer holding either PEM blocks or a single
/// DER certificate.
///
/// PEM blocks with a label other than `CERTIFICATE` are skipped.
pub(crate) fn certificates_from_pem_or_der(
    bytes: &[u8],
) -> Result<Vec<Certificate>, CertificateError> {
    if !looks_like_pem(bytes) {
        return Ok(vec![Certificate::try_from(bytes)?]);
    }

    let mut certs = Vec::new();
    for pem in Pem::iter_from_buffer(bytes) {
        let pem: Pem = pem?;
        if pem.label != PEM_CERTIFICATE_LABEL {
            continue;
        }
        certs.push(Certificate::try_from(pem.contents)?);
    }
    Ok(certs)
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    bytes.windows(11).any(|w| w == b"-----BEGIN ")
}

/// Returns the first subject common name of the certificate.
pub(crate) fn subject_common_name(cert: &X509Certificate<'_>) -> Result<String, CertificateError> {
    let attr = cert
        .subject()
        .iter_common_name()
        .next()
        .ok_or(CertificateError::MissingCommonName)?;
    let cn = attr.as_str()?;
    Ok(cn.to_owned())
}

/// Returns the parsed X.509 extension for the provided OID, or `None` if the
/// certificate does not carry it.
///
/// # Errors
/// - [`CertificateError::ParseX509Certificate`] if the extension appears more than once.
pub(crate) fn find_x509_extension<'a>(
    cert: &'a X509Certificate<'_>,
    oid: &Oid<'static>,
) -> Result<Option<&'a ParsedExtension<'a>>, CertificateError> {
    Ok(cert
        .tbs_certificate
        .get_extension_unique(oid)?
        .map(|ext| ext.parsed_extension()))
}
