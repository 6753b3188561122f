//! XRDS service directories.
//!
//! Only what discovery needs is extracted: the `Service` elements of the
//! authoritative `XRD`, with their type URIs, endpoint URIs, local
//! identifiers and any other child element.

use crate::xml::{children, is_element, parse_document, text_content};
use roxmltree::Node;

/// XRDS envelope namespace.
pub const NS_XRDS: &str = "xri://$xrds";

/// XRD 2.0 namespace.
pub const NS_XRD: &str = "xri://$xrd*($v*2.0)";

/// OpenID 1.x extension namespace (`openid:Delegate`).
pub const NS_OPENID: &str = "http://openid.net/xmlns/1.0";

/// An error that can arise parsing an XRDS document.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum XrdsError {
    /// The document is not well-formed XML.
    #[error("malformed XRDS document: {0}")]
    MalformedXml(String),

    /// The root element is not `xrds:XRDS`.
    #[error("root element is not xrds:XRDS")]
    NotXrds,

    /// The document holds no `XRD` element.
    #[error("XRDS document has no XRD element")]
    MissingXrd,
}

/// A child element of a `Service`, kept verbatim by qualified name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServiceElement {
    namespace: Option<String>,
    name: String,
    text: String,
}

impl ServiceElement {
    /// Namespace URI of the element, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed text content.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One `Service` element of an XRD.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServiceDescriptor {
    priority: Option<u32>,
    types: Vec<String>,
    uris: Vec<String>,
    local_id: Option<String>,
    delegate: Option<String>,
    elements: Vec<ServiceElement>,
}

impl ServiceDescriptor {
    /// The `priority` attribute, if present and numeric.
    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    /// `Type` URIs, in document order.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// `URI` values, in document order.
    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    /// The `LocalID` element.
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// The OpenID 1.x `openid:Delegate` element.
    pub fn delegate(&self) -> Option<&str> {
        self.delegate.as_deref()
    }

    /// Every child element, in document order.
    pub fn elements(&self) -> &[ServiceElement] {
        &self.elements
    }

    /// Returns `true` if the service declares any of `types`.
    pub fn matches_types(&self, types: &[&str]) -> bool {
        self.types.iter().any(|t| types.contains(&t.as_str()))
    }

    /// Text of the first child element named `name` in one of `namespaces`.
    pub fn find_element(&self, namespaces: &[&str], name: &str) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| e.name == name && e.namespace().is_some_and(|ns| namespaces.contains(&ns)))
            .map(ServiceElement::text)
    }

    fn from_node(service: Node<'_, '_>) -> Self {
        let priority = service.attribute("priority").and_then(|p| p.parse().ok());
        let texts = |local| {
            children(service, NS_XRD, local)
                .map(text_content)
                .collect::<Vec<_>>()
        };

        let elements = service
            .children()
            .filter(Node::is_element)
            .map(|n| ServiceElement {
                namespace: n.tag_name().namespace().map(str::to_owned),
                name: n.tag_name().name().to_owned(),
                text: text_content(n),
            })
            .collect();

        Self {
            priority,
            types: texts("Type"),
            uris: texts("URI"),
            local_id: texts("LocalID").into_iter().next(),
            delegate: children(service, NS_OPENID, "Delegate")
                .next()
                .map(text_content),
            elements,
        }
    }
}

/// A parsed XRDS document.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct XrdsDocument {
    services: Vec<ServiceDescriptor>,
}

impl XrdsDocument {
    /// Parses an XRDS document.
    ///
    /// The last `XRD` element is the authoritative one; its services are kept
    /// in document order.
    ///
    /// # Errors
    ///
    /// Returns an [`XrdsError`] if the bytes are not an XRDS document.
    pub fn parse(bytes: &[u8]) -> Result<Self, XrdsError> {
        let doc = parse_document(bytes).map_err(XrdsError::MalformedXml)?;
        let root = doc.root_element();
        if !is_element(&root, NS_XRDS, "XRDS") {
            return Err(XrdsError::NotXrds);
        }

        let xrd = children(root, NS_XRD, "XRD")
            .last()
            .ok_or(XrdsError::MissingXrd)?;

        let services = children(xrd, NS_XRD, "Service")
            .map(ServiceDescriptor::from_node)
            .collect();
        Ok(Self { services })
    }

    /// All services, in document order.
    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// Services declaring any of `types`, in document order.
    pub fn services_matching<'a>(
        &'a self,
        types: &'a [&'a str],
    ) -> impl Iterator<Item = &'a ServiceDescriptor> + 'a {
        self.services.iter().filter(move |s| s.matches_types(types))
    }
}
