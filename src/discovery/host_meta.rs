//! Host-meta parsing.
//!
//! A host-meta document points at the site XRDS through a link such as
//!
//! ```text
//! Link: <https://idp.example.com/site-xrds?hd=example.com>; rel="describedby http://reltype.google.com/openid/xrd-op"; type="application/xrds+xml"
//! ```
//!
//! The link is looked up in the document body first, then in the `Link`
//! response header.

/// IANA `describedby` relation type.
pub const DESCRIBED_BY_TYPE: &str = "http://www.iana.org/assignments/relation/describedby";

/// Relation type marking the XRD of an OpenID provider.
pub const XRD_OP_TYPE: &str = "http://reltype.google.com/openid/xrd-op";

const ACCEPTED_RELATIONS: [&str; 3] = ["describedby", DESCRIBED_BY_TYPE, XRD_OP_TYPE];

/// Finds the XRDS location in a host-meta response.
pub(crate) fn find_xrds_location(body: &[u8], link_header: Option<&str>) -> Option<String> {
    let body = String::from_utf8_lossy(body);
    let from_body = body.lines().find_map(|line| {
        let line = line.trim_start();
        let prefix = line.get(..5)?;
        if !prefix.eq_ignore_ascii_case("link:") {
            return None;
        }
        first_accepted_link(&line[5..])
    });

    from_body.or_else(|| link_header.and_then(first_accepted_link))
}

fn first_accepted_link(value: &str) -> Option<String> {
    LinkValues { rest: value }
        .find(|(_, params)| relation_accepted(params))
        .map(|(url, _)| url.to_owned())
}

/// `true` if the link has no `rel` parameter or names an accepted relation.
fn relation_accepted(params: &str) -> bool {
    let rel = params.split(';').find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("rel")
            .then(|| value.trim().trim_matches('"'))
    });

    match rel {
        None => true,
        Some(rel) => rel.split_ascii_whitespace().any(|r| {
            ACCEPTED_RELATIONS
                .iter()
                .any(|accepted| r.eq_ignore_ascii_case(accepted))
        }),
    }
}

/// Iterates `<url>; params` entries of a comma separated link list.
struct LinkValues<'a> {
    rest: &'a str,
}

impl<'a> Iterator for LinkValues<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self
            .rest
            .trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        let rest = rest.strip_prefix('<')?;
        let (url, after) = rest.split_once('>')?;

        let mut in_quotes = false;
        let end = after
            .char_indices()
            .find(|&(_, c)| {
                if c == '"' {
                    in_quotes = !in_quotes;
                }
                c == ',' && !in_quotes
            })
            .map_or(after.len(), |(i, _)| i);

        self.rest = &after[end..];
        Some((url.trim(), &after[..end]))
    }
}
