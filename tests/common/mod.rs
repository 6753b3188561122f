// Shared fixtures: a throw-away PKI, XRDS signing and an in-memory fetcher.
#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hosted_discovery::cert::Certificate;
use hosted_discovery::fetcher::{FetchError, HttpFetcher, HttpResponse};
use hosted_discovery::signature::{C14N_RAW_OCTETS, SIGN_RSA_SHA1};
use hosted_discovery::trust::TrustRootSet;
use openssl::asn1::{Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509Extension, X509NameBuilder, X509};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

pub const LEAF_VALIDITY_DAYS: u32 = 365;

/// A certificate and its private key.
pub struct Identity {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl Identity {
    pub fn certificate(&self) -> Certificate {
        Certificate::try_from(self.cert.to_der().unwrap()).unwrap()
    }

    /// Signs `body` with RSA-SHA1 and returns the base64 signature value.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut signer = Signer::new(MessageDigest::sha1(), &self.key).unwrap();
        signer.update(body).unwrap();
        STANDARD.encode(signer.sign_to_vec().unwrap())
    }
}

/// Knobs for [`issue_with`] beyond name, issuer and CA flag.
#[derive(Default)]
pub struct IssueOptions {
    /// `pathLenConstraint` of a CA certificate.
    pub pathlen: Option<u32>,
    /// Reuse an existing key instead of generating one.
    pub key: Option<PKey<Private>>,
    /// Make the certificate expire a day ago.
    pub expired: bool,
    /// Add a critical extension with this private OID.
    pub critical_oid: Option<&'static str>,
}

/// Issues a certificate for `cn`, self-signed when `issuer` is `None`.
pub fn issue(cn: &str, issuer: Option<&Identity>, ca: bool) -> Identity {
    issue_with(cn, issuer, ca, IssueOptions::default())
}

pub fn issue_with(
    cn: &str,
    issuer: Option<&Identity>,
    ca: bool,
    options: IssueOptions,
) -> Identity {
    let key = options
        .key
        .unwrap_or_else(|| PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap());

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("O", "Hosted Discovery Test").unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    let name = name.build();

    let serial = {
        let mut bn = BigNum::new().unwrap();
        bn.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
        bn.to_asn1_integer().unwrap()
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let (not_before, not_after) = if options.expired {
        (
            Asn1Time::from_unix(now - 2 * 86400).unwrap(),
            Asn1Time::from_unix(now - 86400).unwrap(),
        )
    } else {
        (
            Asn1Time::from_unix(now - 3600).unwrap(),
            Asn1Time::days_from_now(LEAF_VALIDITY_DAYS).unwrap(),
        )
    };

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some(issuer) => builder.set_issuer_name(issuer.cert.subject_name()).unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }
    builder.set_pubkey(&key).unwrap();
    builder.set_not_before(&not_before).unwrap();
    builder.set_not_after(&not_after).unwrap();

    if ca {
        let mut basic_constraints = BasicConstraints::new();
        basic_constraints.critical().ca();
        if let Some(pathlen) = options.pathlen {
            basic_constraints.pathlen(pathlen);
        }
        builder
            .append_extension(basic_constraints.build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .key_cert_sign()
                    .crl_sign()
                    .build()
                    .unwrap(),
            )
            .unwrap();
    } else {
        builder
            .append_extension(BasicConstraints::new().build().unwrap())
            .unwrap();
        builder
            .append_extension(KeyUsage::new().digital_signature().build().unwrap())
            .unwrap();
    }

    if let Some(oid) = options.critical_oid {
        // DER NULL as the extension value
        let extension = X509Extension::new_from_der(
            &Asn1Object::from_str(oid).unwrap(),
            true,
            &Asn1OctetString::new_from_bytes(&[0x05, 0x00]).unwrap(),
        )
        .unwrap();
        builder.append_extension(extension).unwrap();
    }

    let signing_key = issuer.map_or(&key, |issuer| &issuer.key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();

    Identity {
        cert: builder.build(),
        key,
    }
}

/// Root CA, intermediate CA and the signers used across tests.
pub struct Pki {
    pub root: Identity,
    pub intermediate: Identity,
    pub example_com: Identity,
    pub idp_example_com: Identity,
    pub hosted_id: Identity,
    pub evil: Identity,
}

impl Pki {
    pub fn new() -> Self {
        let root = issue("Hosted Discovery Test Root", None, true);
        let intermediate = issue("Hosted Discovery Test Intermediate", Some(&root), true);
        let example_com = issue("Example.COM", Some(&intermediate), false);
        let idp_example_com = issue("idp.example.com", Some(&intermediate), false);
        let hosted_id = issue("hosted-id.google.com", Some(&intermediate), false);
        let evil = issue("evil.example.net", Some(&intermediate), false);
        Self {
            root,
            intermediate,
            example_com,
            idp_example_com,
            hosted_id,
            evil,
        }
    }

    pub fn trust_roots(&self) -> TrustRootSet {
        TrustRootSet::from_certificates(vec![self.root.certificate()]).unwrap()
    }
}

/// An XRDS document whose signature block embeds `chain` and declares the
/// given algorithms.
pub fn xrds_with_algorithms(chain: &[&Identity], services: &str, c14n: &str, alg: &str) -> String {
    let certs: String = chain
        .iter()
        .map(|id| {
            format!(
                "<ds:X509Certificate>{}</ds:X509Certificate>",
                STANDARD.encode(id.cert.to_der().unwrap())
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"
    xmlns:ds="http://www.w3.org/2000/09/xmldsig#"
    xmlns:openid="http://namespace.google.com/openid/xmlns">
  <XRD>
    <ds:Signature>
      <ds:SignedInfo>
        <ds:CanonicalizationMethod Algorithm="{c14n}" />
        <ds:SignatureMethod Algorithm="{alg}" />
      </ds:SignedInfo>
      <ds:KeyInfo>
        <ds:X509Data>{certs}</ds:X509Data>
      </ds:KeyInfo>
    </ds:Signature>
{services}
  </XRD>
</xrds:XRDS>
"#
    )
}

/// An XRDS document signed with the supported algorithms.
pub fn xrds(chain: &[&Identity], services: &str) -> String {
    xrds_with_algorithms(chain, services, C14N_RAW_OCTETS, SIGN_RSA_SHA1)
}

/// An `HttpFetcher` serving canned responses and recording requested URLs.
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, response: HttpResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "")))
    }
}
