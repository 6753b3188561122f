//! Namespace-aware helpers over `roxmltree`.

use roxmltree::{Document, Node};

/// Parses `bytes` as an XML document.
///
/// The returned error message is what ends up in `MalformedXml` errors.
pub(crate) fn parse_document(bytes: &[u8]) -> Result<Document<'_>, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("document is not UTF-8: {e}"))?;
    Document::parse(text).map_err(|e| e.to_string())
}

pub(crate) fn is_element(node: &Node<'_, '_>, ns: &str, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(ns)
}

/// Child elements of `node` with the given qualified name, in document order.
pub(crate) fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    ns: &'a str,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is_element(n, ns, local))
}

/// Concatenated text content of `node`, trimmed.
pub(crate) fn text_content(node: Node<'_, '_>) -> String {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    text.trim().to_owned()
}
