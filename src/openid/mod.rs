//! OpenID service types and endpoint construction.
//!
//! Discovery produces [`ServiceDescriptor`]s; an [`EndpointBuilder`] turns
//! the OpenID-typed ones into [`Endpoint`]s that an OpenID consumer acts on.

use crate::xrds::ServiceDescriptor;
use serde::Serialize;
use std::fmt::Debug;

/// OpenID 2.0 OP identifier service type.
pub const TYPE_OPENID_2_0_SERVER: &str = "http://specs.openid.net/auth/2.0/server";

/// OpenID 2.0 claimed identifier service type.
pub const TYPE_OPENID_2_0_SIGNON: &str = "http://specs.openid.net/auth/2.0/signon";

/// OpenID 1.1 service type.
pub const TYPE_OPENID_1_1: &str = "http://openid.net/signon/1.1";

/// OpenID 1.0 service type.
pub const TYPE_OPENID_1_0: &str = "http://openid.net/signon/1.0";

/// Every service type considered OpenID-compatible, most preferred first.
pub const OPENID_TYPES: [&str; 4] = [
    TYPE_OPENID_2_0_SERVER,
    TYPE_OPENID_2_0_SIGNON,
    TYPE_OPENID_1_1,
    TYPE_OPENID_1_0,
];

/// OpenID protocol version an endpoint speaks.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub enum ProtocolVersion {
    /// OpenID 1.0
    #[serde(rename = "1.0")]
    V1_0,
    /// OpenID 1.1
    #[serde(rename = "1.1")]
    V1_1,
    /// OpenID 2.0
    #[serde(rename = "2.0")]
    V2_0,
}

impl ProtocolVersion {
    /// Maps a service type URI to the protocol version it implies.
    pub fn from_type_uri(type_uri: &str) -> Option<Self> {
        match type_uri {
            TYPE_OPENID_2_0_SERVER | TYPE_OPENID_2_0_SIGNON => Some(Self::V2_0),
            TYPE_OPENID_1_1 => Some(Self::V1_1),
            TYPE_OPENID_1_0 => Some(Self::V1_0),
            _ => None,
        }
    }
}

/// A discovered OpenID provider endpoint.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Endpoint {
    claimed_id: Option<String>,
    provider_url: String,
    local_id: Option<String>,
    type_uris: Vec<String>,
    versions: Vec<ProtocolVersion>,
    op_identifier: bool,
}

impl Endpoint {
    /// The identifier this endpoint is bound to. `None` for OP identifier
    /// endpoints, where the provider chooses the identity.
    pub fn claimed_id(&self) -> Option<&str> {
        self.claimed_id.as_deref()
    }

    /// URL authentication requests are sent to.
    pub fn provider_url(&self) -> &str {
        &self.provider_url
    }

    /// The provider-local identifier, from `LocalID` or `openid:Delegate`.
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// Service type URIs the endpoint was discovered with.
    pub fn type_uris(&self) -> &[String] {
        &self.type_uris
    }

    /// Protocol versions supported, highest first.
    pub fn versions(&self) -> &[ProtocolVersion] {
        &self.versions
    }

    /// Returns `true` for an OpenID 2.0 OP identifier endpoint.
    pub fn is_op_identifier(&self) -> bool {
        self.op_identifier
    }

    /// Returns `true` if the endpoint supports `version`.
    pub fn supports(&self, version: ProtocolVersion) -> bool {
        self.versions.contains(&version)
    }
}

/// Builds endpoints from the OpenID-typed services of an XRDS document.
pub trait EndpointBuilder: Send + Sync + Debug {
    /// Builds endpoints for `subject` (a domain or claimed identifier) from
    /// `services`, preserving their order.
    fn build(&self, subject: &str, services: &[&ServiceDescriptor]) -> Vec<Endpoint>;
}

/// Default [`EndpointBuilder`]: one endpoint per (service, URI) pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenIdEndpointBuilder;

impl EndpointBuilder for OpenIdEndpointBuilder {
    fn build(&self, subject: &str, services: &[&ServiceDescriptor]) -> Vec<Endpoint> {
        let mut endpoints = Vec::new();
        for service in services {
            let mut versions: Vec<_> = service
                .types()
                .iter()
                .filter_map(|t| ProtocolVersion::from_type_uri(t))
                .collect();
            if versions.is_empty() {
                continue;
            }
            versions.sort_unstable_by(|a, b| b.cmp(a));
            versions.dedup();

            let op_identifier = service.matches_types(&[TYPE_OPENID_2_0_SERVER]);
            let (claimed_id, local_id) = if op_identifier {
                (None, None)
            } else {
                let local_id = service.local_id().or(service.delegate());
                (Some(subject.to_owned()), local_id.map(str::to_owned))
            };

            for uri in service.uris() {
                endpoints.push(Endpoint {
                    claimed_id: claimed_id.clone(),
                    provider_url: uri.clone(),
                    local_id: local_id.clone(),
                    type_uris: service.types().to_vec(),
                    versions: versions.clone(),
                    op_identifier,
                });
            }
        }
        endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrds::XrdsDocument;

    const XRDS: &str = r#"<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"
    xmlns:openid="http://openid.net/xmlns/1.0">
  <XRD>
    <Service>
      <Type>http://specs.openid.net/auth/2.0/server</Type>
      <URI>https://idp.example.com/op</URI>
    </Service>
    <Service>
      <Type>http://specs.openid.net/auth/2.0/signon</Type>
      <Type>http://openid.net/signon/1.1</Type>
      <URI>https://idp.example.com/a</URI>
      <URI>https://idp.example.com/b</URI>
      <openid:Delegate>https://idp.example.com/id/alice</openid:Delegate>
    </Service>
    <Service>
      <Type>http://example.com/not-openid</Type>
      <URI>https://example.com/elsewhere</URI>
    </Service>
  </XRD>
</xrds:XRDS>"#;

    fn endpoints() -> Vec<Endpoint> {
        let xrds = XrdsDocument::parse(XRDS.as_bytes()).unwrap();
        let services: Vec<_> = xrds.services().iter().collect();
        OpenIdEndpointBuilder.build("http://example.com/openid/alice", &services)
    }

    #[test]
    fn test_one_endpoint_per_service_uri() {
        let urls: Vec<_> = endpoints()
            .iter()
            .map(|e| e.provider_url().to_owned())
            .collect();
        assert_eq!(
            urls,
            [
                "https://idp.example.com/op",
                "https://idp.example.com/a",
                "https://idp.example.com/b"
            ]
        );
    }

    #[test]
    fn test_op_identifier_endpoint() {
        let endpoints = endpoints();
        let op = &endpoints[0];

        assert!(op.is_op_identifier());
        assert_eq!(op.claimed_id(), None);
        assert_eq!(op.versions(), [ProtocolVersion::V2_0]);
    }

    #[test]
    fn test_claimed_id_endpoint() {
        let endpoints = endpoints();
        let signon = &endpoints[1];

        assert!(!signon.is_op_identifier());
        assert_eq!(signon.claimed_id(), Some("http://example.com/openid/alice"));
        assert_eq!(signon.local_id(), Some("https://idp.example.com/id/alice"));
        assert_eq!(
            signon.versions(),
            [ProtocolVersion::V2_0, ProtocolVersion::V1_1]
        );
        assert!(signon.supports(ProtocolVersion::V1_1));
        assert!(!signon.supports(ProtocolVersion::V1_0));
    }

    #[test]
    fn test_serialize_endpoint() {
        let json = serde_json::to_value(&endpoints()[0]).unwrap();
        assert_eq!(json["provider_url"], "https://idp.example.com/op");
        assert_eq!(json["versions"][0], "2.0");
        assert_eq!(json["op_identifier"], true);
    }
}
