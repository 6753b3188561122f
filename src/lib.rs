#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

//! This library implements signed OpenID discovery for hosted domains: a
//! domain's host-meta points at a site XRDS document, whose XML Simple Sign
//! signature is checked against a set of trusted X.509 roots before any of
//! its service endpoints are used. Claimed identifiers are resolved one step
//! further, through a per-user XRDS signed by the domain's next authority.
//!
//! Whenever signed discovery is not possible the resolver says so with
//! [`Discovery::Fallback`](discovery::Discovery::Fallback), so the caller can
//! continue with generic discovery.
//!
//! # Examples
//!
//! ```no_run
//! use hosted_discovery::cache::MemoryCache;
//! use hosted_discovery::config::DiscoveryConfig;
//! use hosted_discovery::discovery::{Discovery, DiscoveryResolver};
//! use hosted_discovery::fetcher::ReqwestFetcher;
//! use hosted_discovery::trust::TrustRootSet;
//! use std::error::Error;
//! use std::sync::Arc;
//!
//! # async fn some_function() -> Result<(), Box<dyn Error>> {
//!
//! // trusted roots are read from the paths in HOSTED_DISCOVERY_TRUST_ROOTS
//! let trust_roots = TrustRootSet::from_env()?;
//!
//! let resolver = DiscoveryResolver::builder()
//!     .with_trust_roots(trust_roots)
//!     .with_config(DiscoveryConfig::from_env()?)
//!     .with_cache(Arc::new(MemoryCache::new()))
//!     .build()?;
//!
//! let fetcher = ReqwestFetcher::new()?;
//!
//! // site discovery for a hosted domain
//! if let Discovery::Resolved(info) = resolver.discover("example.com", &fetcher).await {
//!     for endpoint in info.endpoints() {
//!         println!("OP endpoint: {}", endpoint.provider_url());
//!     }
//! }
//!
//! // user discovery for a claimed identifier
//! let discovery = resolver
//!     .discover("http://example.com/openid?id=1234", &fetcher)
//!     .await;
//! if discovery.is_fallback() {
//!     println!("falling back to generic discovery");
//! }
//!
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cert;
pub mod config;
pub mod discovery;
pub mod fetcher;
pub(crate) mod observability;
pub mod openid;
pub mod signature;
pub mod trust;
pub(crate) mod xml;
pub mod xrds;
