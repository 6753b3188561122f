//! Discovery settings.

use std::env;
use std::time::Duration;

/// Placeholder substituted with the domain in [`DiscoveryConfig::host_meta_template`].
pub const DOMAIN_PLACEHOLDER: &str = "{domain}";

/// Default host-meta location, templated with the domain.
pub const DEFAULT_HOST_META_TEMPLATE: &str =
    "https://www.google.com/accounts/o8/.well-known/host-meta?hd={domain}";

/// Default lifetime of cached host-meta locations and XRDS documents.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default namespace prepended to every cache key.
pub const DEFAULT_CACHE_PREFIX: &str = "_hosted_discovery_";

/// Default signer allowed to sign for any hosted domain.
pub const DEFAULT_HOSTED_ID: &str = "hosted-id.google.com";

/// Environment variable overriding the host-meta template.
pub const HOST_META_TEMPLATE_ENV: &str = "HOSTED_DISCOVERY_HOST_META_TEMPLATE";
/// Environment variable overriding the cache TTL, in seconds.
pub const CACHE_TTL_ENV: &str = "HOSTED_DISCOVERY_CACHE_TTL_SECS";
/// Environment variable overriding the cache key prefix.
pub const CACHE_PREFIX_ENV: &str = "HOSTED_DISCOVERY_CACHE_PREFIX";
/// Environment variable overriding the hosted-identity signer.
pub const HOSTED_ID_ENV: &str = "HOSTED_DISCOVERY_HOSTED_ID";

/// An error in the discovery configuration.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The host-meta template has no `{domain}` placeholder.
    #[error("host-meta template must contain {{domain}}: {0}")]
    InvalidHostMetaTemplate(String),

    /// A setting has a value that cannot be used.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Name of the setting.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The resolver was built without trust roots.
    #[error("trust roots are required to verify signed discovery documents")]
    MissingTrustRoots,
}

/// Settings of a [`DiscoveryResolver`](crate::discovery::DiscoveryResolver).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiscoveryConfig {
    host_meta_template: String,
    cache_ttl: Duration,
    cache_prefix: String,
    hosted_id: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            host_meta_template: DEFAULT_HOST_META_TEMPLATE.to_owned(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_owned(),
            hosted_id: DEFAULT_HOSTED_ID.to_owned(),
        }
    }
}

impl DiscoveryConfig {
    /// Creates a configuration with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings, overridden by the `HOSTED_DISCOVERY_*` environment
    /// variables that are set.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable holds an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(template) = read_env(HOST_META_TEMPLATE_ENV)? {
            config = config.with_host_meta_template(template)?;
        }
        if let Some(ttl) = read_env(CACHE_TTL_ENV)? {
            let secs = ttl.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: CACHE_TTL_ENV,
                value: ttl.clone(),
            })?;
            config = config.with_cache_ttl(Duration::from_secs(secs));
        }
        if let Some(prefix) = read_env(CACHE_PREFIX_ENV)? {
            config = config.with_cache_prefix(prefix);
        }
        if let Some(hosted_id) = read_env(HOSTED_ID_ENV)? {
            config = config.with_hosted_id(hosted_id);
        }
        Ok(config)
    }

    /// Sets the host-meta URL template; `{domain}` is replaced with the
    /// domain being discovered.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostMetaTemplate`] if the placeholder is
    /// missing.
    pub fn with_host_meta_template(
        mut self,
        template: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let template = template.into();
        if !template.contains(DOMAIN_PLACEHOLDER) {
            return Err(ConfigError::InvalidHostMetaTemplate(template));
        }
        self.host_meta_template = template;
        Ok(self)
    }

    /// Sets the lifetime of cache entries.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the namespace prepended to cache keys.
    #[must_use]
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// Sets the signer accepted for every hosted domain. Compared
    /// case-insensitively.
    #[must_use]
    pub fn with_hosted_id(mut self, hosted_id: impl Into<String>) -> Self {
        self.hosted_id = hosted_id.into().to_lowercase();
        self
    }

    /// The host-meta URL template.
    pub fn host_meta_template(&self) -> &str {
        &self.host_meta_template
    }

    /// The host-meta URL for `domain`, percent-encoded into the template.
    pub fn host_meta_url(&self, domain: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(domain.as_bytes()).collect();
        self.host_meta_template.replace(DOMAIN_PLACEHOLDER, &encoded)
    }

    /// Lifetime of cache entries.
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Namespace prepended to cache keys.
    pub fn cache_prefix(&self) -> &str {
        &self.cache_prefix
    }

    /// Signer accepted for every hosted domain, lowercased.
    pub fn hosted_id(&self) -> &str {
        &self.hosted_id
    }
}

fn read_env(name: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(value)) => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string_lossy().into_owned(),
        }),
    }
}
