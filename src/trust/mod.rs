//! Trust roots and X.509 chain validation.
//!
//! A [`TrustRootSet`] is configured once at startup from certificate files,
//! certificate directories or in-memory certificates, and is read-only after
//! that. [`validate_chain`] decides whether a signing certificate chains up
//! to one of those roots.
//!
//! The validation purpose is "any": no extended key usage is required from
//! the leaf. Revocation is not checked.

use crate::cert::error::CertificateError;
use crate::cert::Certificate;
use crate::observability::log_debug;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use x509_parser::certificate::X509Certificate;
use x509_parser::time::ASN1Time;

mod validations;

use validations::{
    is_issued_by, is_same_certificate, validate_critical_extensions, validate_issuer_certificate,
    validate_validity, ChainError,
};

/// Environment variable holding the list of trust root files and directories.
///
/// Uses the platform path-list syntax (`:` separated on Unix).
pub const TRUST_ROOTS_ENV: &str = "HOSTED_DISCOVERY_TRUST_ROOTS";

/// Maximum number of links followed from the leaf towards a root.
const MAX_CHAIN_DEPTH: usize = 10;

/// An immutable set of trusted CA certificates.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TrustRootSet {
    roots: Vec<Certificate>,
    verification_time: Option<OffsetDateTime>,
}

/// An error that can arise building a [`TrustRootSet`].
///
/// These are configuration errors: they surface at startup, never per request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TrustRootError {
    /// A configured trust root path cannot be read.
    #[error("cannot read trust root {}", path.display())]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configured trust root file does not hold a valid certificate.
    #[error("invalid certificate in trust root {}", path.display())]
    Certificate {
        /// The offending path.
        path: PathBuf,
        /// The underlying decoding error.
        #[source]
        source: CertificateError,
    },

    /// The configured sources did not yield a single certificate.
    #[error("no trusted certificates configured")]
    NoCertificates,

    /// The trust roots environment variable is not set.
    #[error("trust roots environment variable {0} is not set")]
    MissingEnv(&'static str),
}

impl TrustRootSet {
    /// Creates a set from in-memory CA certificates.
    ///
    /// # Errors
    ///
    /// Returns [`TrustRootError::NoCertificates`] if `roots` is empty.
    pub fn from_certificates(roots: Vec<Certificate>) -> Result<Self, TrustRootError> {
        if roots.is_empty() {
            return Err(TrustRootError::NoCertificates);
        }
        Ok(Self {
            roots,
            verification_time: None,
        })
    }

    /// Loads CA certificates from files and directories.
    ///
    /// Files may hold any number of PEM certificates or a single DER
    /// certificate. For a directory, every regular file in it is loaded;
    /// files in a directory that are not certificates are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`TrustRootError`] if a path cannot be read, if a file given
    /// explicitly is not a certificate, or if no certificate was found at all.
    pub fn from_paths<I, P>(paths: I) -> Result<Self, TrustRootError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut roots = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let metadata = fs::metadata(path).map_err(|source| TrustRootError::Io {
                path: path.to_path_buf(),
                source,
            })?;

            if metadata.is_dir() {
                roots.extend(load_directory(path)?);
            } else {
                roots.extend(load_file(path)?);
            }
        }
        Self::from_certificates(roots)
    }

    /// Loads CA certificates from the paths listed in [`TRUST_ROOTS_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`TrustRootError::MissingEnv`] if the variable is not set, or
    /// any error [`TrustRootSet::from_paths`] returns.
    pub fn from_env() -> Result<Self, TrustRootError> {
        let value =
            env::var_os(TRUST_ROOTS_ENV).ok_or(TrustRootError::MissingEnv(TRUST_ROOTS_ENV))?;
        Self::from_paths(env::split_paths(&value))
    }

    /// Pins the time certificates are checked against, instead of the
    /// current time.
    #[must_use]
    pub fn with_verification_time(mut self, at: OffsetDateTime) -> Self {
        self.verification_time = Some(at);
        self
    }

    /// Returns the trusted CA certificates.
    pub fn roots(&self) -> &[Certificate] {
        &self.roots
    }

    /// Returns `true` if `leaf` chains up to one of the roots, using
    /// `untrusted` as additional chain material.
    ///
    /// See [`validate_chain`].
    ///
    /// # Errors
    ///
    /// Only for malformed input; an untrusted chain is `Ok(false)`.
    pub fn verify(
        &self,
        leaf: &Certificate,
        untrusted: &[Certificate],
    ) -> Result<bool, CertificateError> {
        validate_chain(leaf, untrusted, self)
    }

    fn verification_time(&self) -> Result<ASN1Time, CertificateError> {
        match self.verification_time {
            Some(at) => Ok(ASN1Time::from_timestamp(at.unix_timestamp())?),
            None => Ok(ASN1Time::now()),
        }
    }
}

/// Validates the chain from `leaf` to one of the `trust_roots`.
///
/// `untrusted` certificates are only used to bridge the gap between the leaf
/// and a root; they are never trusted on their own. Every certificate on the
/// path must be within its validity period. Issuers must be allowed to act
/// as a CA and their path length constraints are enforced. Critical
/// extensions that are not understood reject the certificate carrying them.
/// When several supplied certificates could issue the same link, each is
/// tried in turn.
///
/// # Errors
///
/// Returns a [`CertificateError`] only if one of the inputs cannot be parsed.
/// An untrusted chain is reported as `Ok(false)`.
pub fn validate_chain(
    leaf: &Certificate,
    untrusted: &[Certificate],
    trust_roots: &TrustRootSet,
) -> Result<bool, CertificateError> {
    let at = trust_roots.verification_time()?;
    let leaf_x509 = leaf.parse()?;
    let intermediates = untrusted
        .iter()
        .map(Certificate::parse)
        .collect::<Result<Vec<_>, _>>()?;
    let roots = trust_roots
        .roots
        .iter()
        .map(Certificate::parse)
        .collect::<Result<Vec<_>, _>>()?;

    match build_path(&leaf_x509, &intermediates, &roots, at) {
        Ok(()) => Ok(true),
        Err(ChainError::Certificate(e)) => Err(e),
        Err(e) => {
            log_debug!("certificate chain rejected: {e}");
            Ok(false)
        }
    }
}

fn build_path(
    leaf: &X509Certificate<'_>,
    intermediates: &[X509Certificate<'_>],
    roots: &[X509Certificate<'_>],
    at: ASN1Time,
) -> Result<(), ChainError> {
    validate_validity(leaf, at)?;
    validate_critical_extensions(leaf)?;

    let mut used = vec![false; intermediates.len()];
    extend_path(leaf, 0, intermediates, &mut used, roots, at)
}

/// Finds an issuer for `current`, trying roots first, then every unused
/// intermediate in turn. `cas_below` counts the intermediates already on the
/// path under `current`'s issuer.
fn extend_path(
    current: &X509Certificate<'_>,
    cas_below: usize,
    intermediates: &[X509Certificate<'_>],
    used: &mut [bool],
    roots: &[X509Certificate<'_>],
    at: ASN1Time,
) -> Result<(), ChainError> {
    if cas_below >= MAX_CHAIN_DEPTH {
        return Err(ChainError::TooLong(MAX_CHAIN_DEPTH));
    }
    if roots.iter().any(|root| is_same_certificate(root, current)) {
        return Ok(());
    }

    let mut rejection = ChainError::NoIssuer;

    for root in roots.iter().filter(|root| is_issued_by(current, root)) {
        match check_issuer(root, cas_below, at) {
            Ok(()) => return Ok(()),
            Err(e @ ChainError::Certificate(_)) => return Err(e),
            Err(e) => rejection = e,
        }
    }

    for (i, candidate) in intermediates.iter().enumerate() {
        if used[i] || !is_issued_by(current, candidate) {
            continue;
        }
        let result = check_issuer(candidate, cas_below, at).and_then(|()| {
            used[i] = true;
            let result = extend_path(candidate, cas_below + 1, intermediates, used, roots, at);
            used[i] = false;
            result
        });
        match result {
            Ok(()) => return Ok(()),
            Err(e @ ChainError::Certificate(_)) => return Err(e),
            Err(e) => rejection = e,
        }
    }

    Err(rejection)
}

fn check_issuer(
    issuer: &X509Certificate<'_>,
    cas_below: usize,
    at: ASN1Time,
) -> Result<(), ChainError> {
    validate_issuer_certificate(issuer, cas_below)?;
    validate_critical_extensions(issuer)?;
    validate_validity(issuer, at)
}

fn load_file(path: &Path) -> Result<Vec<Certificate>, TrustRootError> {
    let bytes = fs::read(path).map_err(|source| TrustRootError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Certificate::parse_pem_or_der(&bytes).map_err(|source| TrustRootError::Certificate {
        path: path.to_path_buf(),
        source,
    })
}

fn load_directory(dir: &Path) -> Result<Vec<Certificate>, TrustRootError> {
    let io_err = |source| TrustRootError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut certs = Vec::new();
    for file in files {
        match load_file(&file) {
            Ok(found) => certs.extend(found),
            Err(e) => log_debug!("skipping {}: {e}", file.display()),
        }
    }
    Ok(certs)
}
