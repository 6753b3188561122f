//! Checks applied to each link while building a certificate path.

use crate::cert::error::CertificateError;
use crate::cert::parsing::find_x509_extension;
use x509_parser::certificate::X509Certificate;
use x509_parser::der_parser::oid::Oid;
use x509_parser::extensions::ParsedExtension;
use x509_parser::oid_registry;
use x509_parser::time::ASN1Time;

/// Why a candidate path was rejected.
#[derive(Debug, thiserror::Error, PartialEq)]
pub(crate) enum ChainError {
    #[error("certificate is outside its validity period")]
    NotValidAt,

    #[error("issuer certificate must have CA flag set to true")]
    IssuerNotCa,

    #[error("issuer certificate must have 'keyCertSign' set as key usage")]
    IssuerNoKeyCertSign,

    #[error("issuer allows {allowed} intermediate CAs below it, path has {found}")]
    PathLenExceeded { allowed: u32, found: usize },

    #[error("unhandled critical extension {0}")]
    UnhandledCriticalExtension(String),

    #[error("no trusted issuer found for certificate")]
    NoIssuer,

    #[error("certificate chain exceeds {0} links")]
    TooLong(usize),

    #[error(transparent)]
    Certificate(#[from] CertificateError),
}

pub(crate) fn validate_validity(
    cert: &X509Certificate<'_>,
    at: ASN1Time,
) -> Result<(), ChainError> {
    if cert.validity().is_valid_at(at) {
        Ok(())
    } else {
        Err(ChainError::NotValidAt)
    }
}

/// A certificate may issue others only if it does not deny being a CA and
/// its path length constraint allows `cas_below` intermediate CAs under it.
///
/// Certificates without the basic constraints extension (v1 roots) are
/// accepted; key usage is only enforced when present.
pub(crate) fn validate_issuer_certificate(
    cert: &X509Certificate<'_>,
    cas_below: usize,
) -> Result<(), ChainError> {
    let basic_constraints =
        find_x509_extension(cert, &oid_registry::OID_X509_EXT_BASIC_CONSTRAINTS)?;
    if let Some(ParsedExtension::BasicConstraints(b)) = basic_constraints {
        if !b.ca {
            return Err(ChainError::IssuerNotCa);
        }
        if let Some(allowed) = b.path_len_constraint {
            if cas_below as u64 > u64::from(allowed) {
                return Err(ChainError::PathLenExceeded {
                    allowed,
                    found: cas_below,
                });
            }
        }
    }

    let key_usage = find_x509_extension(cert, &oid_registry::OID_X509_EXT_KEY_USAGE)?;
    match key_usage {
        Some(ParsedExtension::KeyUsage(k)) if !k.key_cert_sign() => {
            Err(ChainError::IssuerNoKeyCertSign)
        }
        _ => Ok(()),
    }
}

/// Rejects certificates carrying a critical extension path building does
/// not understand.
pub(crate) fn validate_critical_extensions(cert: &X509Certificate<'_>) -> Result<(), ChainError> {
    match cert
        .extensions()
        .iter()
        .find(|ext| ext.critical && !is_handled_extension(&ext.oid))
    {
        Some(ext) => Err(ChainError::UnhandledCriticalExtension(ext.oid.to_id_string())),
        None => Ok(()),
    }
}

fn is_handled_extension(oid: &Oid<'_>) -> bool {
    [
        oid_registry::OID_X509_EXT_BASIC_CONSTRAINTS,
        oid_registry::OID_X509_EXT_KEY_USAGE,
        oid_registry::OID_X509_EXT_EXTENDED_KEY_USAGE,
        oid_registry::OID_X509_EXT_SUBJECT_ALT_NAME,
        oid_registry::OID_X509_EXT_SUBJECT_KEY_IDENTIFIER,
        oid_registry::OID_X509_EXT_AUTHORITY_KEY_IDENTIFIER,
    ]
    .iter()
    .any(|handled| handled == oid)
}

/// `issuer` issued `cert`: names chain up and the signature checks out.
pub(crate) fn is_issued_by(cert: &X509Certificate<'_>, issuer: &X509Certificate<'_>) -> bool {
    cert.issuer().as_raw() == issuer.subject().as_raw()
        && cert.verify_signature(Some(issuer.public_key())).is_ok()
}

/// Both parse the same certificate.
pub(crate) fn is_same_certificate(a: &X509Certificate<'_>, b: &X509Certificate<'_>) -> bool {
    a.tbs_certificate.as_ref() == b.tbs_certificate.as_ref()
}
