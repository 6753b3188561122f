//! Signed discovery for hosted domains.
//!
//! [`DiscoveryResolver::discover`] resolves a domain or a claimed identifier
//! in a fixed sequence of steps:
//!
//! 1. fetch the domain's host-meta and read the site XRDS location from it;
//! 2. fetch the site XRDS and verify its signature, which must come from the
//!    domain itself or from the hosted-identity signer;
//! 3. for a domain, build endpoints from the site XRDS; for a claimed
//!    identifier, follow the site XRDS's `describedby` service to the user
//!    XRDS, verify it against the next authority and build endpoints from it.
//!
//! Any failure along the way yields [`Discovery::Fallback`]: the caller
//! should continue with generic, unsigned discovery. [`HostedDomainDiscovery`]
//! does exactly that with any [`DiscoveryStrategy`].
//!
//! # Examples
//!
//! ```no_run
//! use hosted_discovery::cache::MemoryCache;
//! use hosted_discovery::discovery::{Discovery, DiscoveryResolver};
//! use hosted_discovery::fetcher::ReqwestFetcher;
//! use hosted_discovery::trust::TrustRootSet;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = DiscoveryResolver::builder()
//!     .with_trust_roots(TrustRootSet::from_paths(["/etc/ssl/certs"])?)
//!     .with_cache(Arc::new(MemoryCache::new()))
//!     .build()?;
//!
//! let fetcher = ReqwestFetcher::new()?;
//! match resolver.discover("example.com", &fetcher).await {
//!     Discovery::Resolved(info) => println!("{} endpoints", info.endpoints().len()),
//!     Discovery::Fallback => println!("use generic discovery"),
//! }
//! # Ok(())
//! # }
//! ```

use crate::cache::Cache;
use crate::config::{ConfigError, DiscoveryConfig};
use crate::fetcher::HttpFetcher;
use crate::observability::{log_debug, log_error, log_info, log_warn};
use crate::openid::{Endpoint, EndpointBuilder, OpenIdEndpointBuilder, OPENID_TYPES};
use crate::signature::SignatureVerifier;
use crate::trust::TrustRootSet;
use crate::xrds::{ServiceDescriptor, XrdsDocument};
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;

mod error;
pub mod host_meta;
mod lookup;

use error::DiscoveryError;
pub use host_meta::DESCRIBED_BY_TYPE;
pub use lookup::LookupKind;

/// Placeholder in a user XRDS URI template, replaced with the encoded
/// claimed identifier.
pub const USER_URI_VAR: &str = "{%uri}";

/// Namespaces the `URITemplate` and `NextAuthority` extension elements are
/// accepted in.
pub const EXTENSION_NAMESPACES: [&str; 2] = [
    "http://namespace.google.com/openid/xmlns",
    crate::xrds::NS_OPENID,
];

/// The verified outcome of a discovery.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiscoveredInfo {
    identifier: String,
    endpoints: Vec<Endpoint>,
}

impl DiscoveredInfo {
    /// Creates a discovery outcome.
    pub fn new(identifier: impl Into<String>, endpoints: Vec<Endpoint>) -> Self {
        Self {
            identifier: identifier.into(),
            endpoints,
        }
    }

    /// The resolved identifier: the site XRDS URL for a domain, the claimed
    /// identifier for a user.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// OpenID endpoints, in document order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Consumes the outcome, returning the identifier and endpoints.
    pub fn into_parts(self) -> (String, Vec<Endpoint>) {
        (self.identifier, self.endpoints)
    }
}

/// Result of [`DiscoveryResolver::discover`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Discovery {
    /// Discovery succeeded on signed, verified documents.
    Resolved(DiscoveredInfo),
    /// Signed discovery is not possible; defer to generic discovery.
    Fallback,
}

impl Discovery {
    /// Returns the verified outcome, if any.
    pub fn resolved(self) -> Option<DiscoveredInfo> {
        match self {
            Discovery::Resolved(info) => Some(info),
            Discovery::Fallback => None,
        }
    }

    /// Returns `true` for [`Discovery::Fallback`].
    pub fn is_fallback(&self) -> bool {
        matches!(self, Discovery::Fallback)
    }
}

/// A discovery mechanism an OpenID consumer can be configured with.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// Discovers the endpoints of `identifier`.
    async fn discover(
        &self,
        identifier: &str,
        fetcher: &dyn HttpFetcher,
    ) -> Result<DiscoveredInfo, Box<dyn Error + Send + Sync>>;
}

/// Resolves hosted domains and their users through signed discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryResolver {
    verifier: SignatureVerifier,
    cache: Option<Arc<dyn Cache>>,
    endpoint_builder: Arc<dyn EndpointBuilder>,
    config: DiscoveryConfig,
}

/// Builder for [`DiscoveryResolver`].
///
/// Trust roots are required. Without a cache every call fetches every
/// document; with [`DiscoveryConfig::default`] settings and the
/// [`OpenIdEndpointBuilder`] unless configured otherwise.
#[derive(Debug, Default)]
pub struct DiscoveryResolverBuilder {
    trust_roots: Option<TrustRootSet>,
    cache: Option<Arc<dyn Cache>>,
    endpoint_builder: Option<Arc<dyn EndpointBuilder>>,
    config: DiscoveryConfig,
}

impl DiscoveryResolverBuilder {
    /// Creates a new `DiscoveryResolverBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the roots signing certificates must chain up to.
    #[must_use]
    pub fn with_trust_roots(mut self, trust_roots: TrustRootSet) -> Self {
        self.trust_roots = Some(trust_roots);
        self
    }

    /// Sets a cache shared with other resolvers or other users.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets how endpoints are built from OpenID services.
    #[must_use]
    pub fn with_endpoint_builder(mut self, endpoint_builder: Arc<dyn EndpointBuilder>) -> Self {
        self.endpoint_builder = Some(endpoint_builder);
        self
    }

    /// Sets the discovery settings.
    #[must_use]
    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the resolver.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTrustRoots`] if no trust roots were set.
    pub fn build(self) -> Result<DiscoveryResolver, ConfigError> {
        let trust_roots = self.trust_roots.ok_or(ConfigError::MissingTrustRoots)?;
        Ok(DiscoveryResolver {
            verifier: SignatureVerifier::new(trust_roots),
            cache: self.cache,
            endpoint_builder: self
                .endpoint_builder
                .unwrap_or_else(|| Arc::new(OpenIdEndpointBuilder)),
            config: self.config,
        })
    }
}

impl DiscoveryResolver {
    /// Returns a builder.
    pub fn builder() -> DiscoveryResolverBuilder {
        DiscoveryResolverBuilder::new()
    }

    /// The resolver's settings.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Resolves `identifier`, a domain or a claimed identifier URL.
    ///
    /// Never fails: any problem is logged and reported as
    /// [`Discovery::Fallback`].
    pub async fn discover(&self, identifier: &str, fetcher: &dyn HttpFetcher) -> Discovery {
        match self.try_discover(identifier, fetcher).await {
            Ok(info) => {
                log_info!(
                    "signed discovery for {identifier} resolved {} endpoint(s)",
                    info.endpoints.len()
                );
                Discovery::Resolved(info)
            }
            Err(e) => {
                log_warn!("signed discovery for {identifier} failed, falling back: {e}");
                Discovery::Fallback
            }
        }
    }

    /// Drops the cached host-meta location and site XRDS of the domain
    /// `identifier` belongs to.
    pub fn invalidate(&self, identifier: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        let lookup = LookupKind::classify(identifier);
        let domain = lookup.domain();
        let key = self.host_meta_key(domain);
        if let Some(location) = cache.get(&key).and_then(|v| String::from_utf8(v).ok()) {
            cache.evict(&self.xrds_key(domain, &location));
        }
        cache.evict(&key);
    }

    async fn try_discover(
        &self,
        identifier: &str,
        fetcher: &dyn HttpFetcher,
    ) -> Result<DiscoveredInfo, DiscoveryError> {
        match LookupKind::classify(identifier) {
            LookupKind::Site { domain } => self.discover_site(&domain, fetcher).await,
            LookupKind::User { domain, claimed_id } => {
                self.discover_user(&domain, &claimed_id, fetcher).await
            }
        }
    }

    async fn discover_site(
        &self,
        domain: &str,
        fetcher: &dyn HttpFetcher,
    ) -> Result<DiscoveredInfo, DiscoveryError> {
        let site_url = self.fetch_host_meta(domain, fetcher).await?;
        let xrds = self.fetch_xrds(domain, &site_url, fetcher, true).await?;
        let endpoints = self.build_endpoints(domain, &xrds);
        Ok(DiscoveredInfo::new(site_url, endpoints))
    }

    async fn discover_user(
        &self,
        domain: &str,
        claimed_id: &str,
        fetcher: &dyn HttpFetcher,
    ) -> Result<DiscoveredInfo, DiscoveryError> {
        let site_url = self.fetch_host_meta(domain, fetcher).await?;
        let site_xrds = self.fetch_xrds(domain, &site_url, fetcher, true).await?;
        let (user_url, next_authority) = user_xrds_location(&site_xrds, claimed_id)?;

        // per-user documents are never cached
        let user_xrds = self
            .fetch_xrds(&next_authority, &user_url, fetcher, false)
            .await?;
        let endpoints = self.build_endpoints(claimed_id, &user_xrds);
        Ok(DiscoveredInfo::new(claimed_id, endpoints))
    }

    async fn fetch_host_meta(
        &self,
        domain: &str,
        fetcher: &dyn HttpFetcher,
    ) -> Result<String, DiscoveryError> {
        let key = self.host_meta_key(domain);
        if let Some(location) = self.cache_get(&key).and_then(|v| String::from_utf8(v).ok()) {
            return Ok(location);
        }

        let url = self.config.host_meta_url(domain);
        log_debug!("fetching host-meta {url}");
        let response = fetcher.get(&url).await?;
        if !response.is_success() {
            return Err(DiscoveryError::HttpFailure {
                url,
                status: response.status(),
            });
        }

        let location = host_meta::find_xrds_location(response.body(), response.header("Link"))
            .ok_or(DiscoveryError::MissingHeader("Link"))?;
        self.cache_put(&key, location.as_bytes().to_vec());
        Ok(location)
    }

    async fn fetch_xrds(
        &self,
        authority: &str,
        url: &str,
        fetcher: &dyn HttpFetcher,
        use_cache: bool,
    ) -> Result<XrdsDocument, DiscoveryError> {
        let authority = authority.to_lowercase();
        let key = self.xrds_key(&authority, url);
        if use_cache {
            if let Some(body) = self.cache_get(&key) {
                return Ok(XrdsDocument::parse(&body)?);
            }
        }

        log_debug!("fetching XRDS {url}");
        let response = fetcher.get(url).await?;
        if !response.is_success() {
            return Err(DiscoveryError::HttpFailure {
                url: url.to_owned(),
                status: response.status(),
            });
        }

        let signature = response
            .header("Signature")
            .ok_or(DiscoveryError::MissingHeader("Signature"))?;
        let signer = self.verifier.verify(response.body(), signature)?;
        if signer != authority && signer != self.config.hosted_id() {
            return Err(DiscoveryError::SignerMismatch { signer, authority });
        }

        let body = response.into_body();
        let xrds = XrdsDocument::parse(&body)?;
        if use_cache {
            self.cache_put(&key, body);
        }
        Ok(xrds)
    }

    fn build_endpoints(&self, subject: &str, xrds: &XrdsDocument) -> Vec<Endpoint> {
        let services: Vec<&ServiceDescriptor> = xrds.services_matching(&OPENID_TYPES).collect();
        self.endpoint_builder.build(subject, &services)
    }

    fn host_meta_key(&self, domain: &str) -> String {
        format!(
            "{}hostmeta:{}",
            self.config.cache_prefix(),
            domain.to_lowercase()
        )
    }

    /// Verified documents are cached per authority: a body accepted for one
    /// domain is never served to another.
    fn xrds_key(&self, authority: &str, url: &str) -> String {
        format!(
            "{}xrds:{}:{url}",
            self.config.cache_prefix(),
            authority.to_lowercase()
        )
    }

    fn cache_get(&self, key: &str) -> Option<Vec<u8>> {
        let value = self.cache.as_ref()?.get(key);
        match value {
            Some(_) => log_debug!("cache hit for {key}"),
            None => log_debug!("cache miss for {key}"),
        }
        value
    }

    fn cache_put(&self, key: &str, value: Vec<u8>) {
        if let Some(cache) = &self.cache {
            cache.put(key, value, self.config.cache_ttl());
        }
    }
}

/// Locates the user XRDS of `claimed_id` through the `describedby` service
/// of the site XRDS. Returns the URL and the authority that must sign it.
fn user_xrds_location(
    site_xrds: &XrdsDocument,
    claimed_id: &str,
) -> Result<(String, String), DiscoveryError> {
    let service = site_xrds
        .services()
        .iter()
        .find(|s| s.matches_types(&[DESCRIBED_BY_TYPE]))
        .ok_or(DiscoveryError::MissingElement("describedby service"))?;

    let template = service
        .find_element(&EXTENSION_NAMESPACES, "URITemplate")
        .ok_or(DiscoveryError::MissingElement("openid:URITemplate"))?;
    let next_authority = service
        .find_element(&EXTENSION_NAMESPACES, "NextAuthority")
        .ok_or(DiscoveryError::MissingElement("openid:NextAuthority"))?;

    let encoded: String = url::form_urlencoded::byte_serialize(claimed_id.as_bytes()).collect();
    Ok((
        template.replace(USER_URI_VAR, &encoded),
        next_authority.to_owned(),
    ))
}

/// Signed discovery with a generic fallback.
///
/// Tries the [`DiscoveryResolver`] first and defers to `G` whenever signed
/// discovery is not possible.
#[derive(Debug, Clone)]
pub struct HostedDomainDiscovery<G> {
    resolver: DiscoveryResolver,
    generic: G,
}

impl<G: DiscoveryStrategy> HostedDomainDiscovery<G> {
    /// Combines `resolver` with the `generic` fallback strategy.
    pub fn new(resolver: DiscoveryResolver, generic: G) -> Self {
        Self { resolver, generic }
    }

    /// The signed discovery resolver.
    pub fn resolver(&self) -> &DiscoveryResolver {
        &self.resolver
    }
}

#[async_trait]
impl<G: DiscoveryStrategy> DiscoveryStrategy for HostedDomainDiscovery<G> {
    async fn discover(
        &self,
        identifier: &str,
        fetcher: &dyn HttpFetcher,
    ) -> Result<DiscoveredInfo, Box<dyn Error + Send + Sync>> {
        match self.resolver.discover(identifier, fetcher).await {
            Discovery::Resolved(info) => Ok(info),
            Discovery::Fallback => self
                .generic
                .discover(identifier, fetcher)
                .await
                .inspect_err(|e| log_error!("generic discovery for {identifier} failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE_XRDS: &str = r#"<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"
    xmlns:openid="http://namespace.google.com/openid/xmlns">
  <XRD>
    <Service>
      <Type>http://www.iana.org/assignments/relation/describedby</Type>
      <openid:URITemplate>https://idp.example.com/user?uri={%uri}</openid:URITemplate>
      <openid:NextAuthority>idp.example.com</openid:NextAuthority>
    </Service>
  </XRD>
</xrds:XRDS>"#;

    #[test]
    fn test_user_xrds_location() {
        let xrds = XrdsDocument::parse(SITE_XRDS.as_bytes()).unwrap();
        let (url, authority) =
            user_xrds_location(&xrds, "http://example.com/openid/alice").unwrap();

        assert_eq!(
            url,
            "https://idp.example.com/user?uri=http%3A%2F%2Fexample.com%2Fopenid%2Falice"
        );
        assert_eq!(authority, "idp.example.com");
    }

    #[test]
    fn test_missing_described_by_service() {
        let xrds = XrdsDocument::parse(
            br#"<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"><XRD/></xrds:XRDS>"#,
        )
        .unwrap();
        let result = user_xrds_location(&xrds, "http://example.com/openid/alice");
        assert!(matches!(
            result,
            Err(DiscoveryError::MissingElement("describedby service"))
        ));
    }

    #[test]
    fn test_missing_next_authority() {
        let xrds = XrdsDocument::parse(
            SITE_XRDS
                .replace("<openid:NextAuthority>idp.example.com</openid:NextAuthority>", "")
                .as_bytes(),
        )
        .unwrap();
        let result = user_xrds_location(&xrds, "http://example.com/openid/alice");
        assert!(matches!(
            result,
            Err(DiscoveryError::MissingElement("openid:NextAuthority"))
        ));
    }

    #[test]
    fn test_builder_requires_trust_roots() {
        let result = DiscoveryResolver::builder().build();
        assert!(matches!(result, Err(ConfigError::MissingTrustRoots)));
    }
}
