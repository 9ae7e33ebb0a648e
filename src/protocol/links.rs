//! `Link` header relations (RFC 8288) as used by ACME.
//!
//! ACME providers use them for updated terms of service, alternate
//! certificate chains and the next page of an order list. Other relations,
//! such as `up` and `index`, are parsed and can be read by name.

use http::HeaderMap;

use super::Url;

/// Relation for alternate certificate chains.
pub const REL_ALTERNATE: &str = "alternate";

/// Relation for the next page of a paginated list.
pub const REL_NEXT: &str = "next";

/// Relation for the terms of service.
pub const REL_TERMS_OF_SERVICE: &str = "terms-of-service";

/// Link relations from a response, in header order.
///
/// A relation may appear any number of times; [`Links::get`] yields every
/// target for a relation in the order the provider sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links(Vec<(String, Url)>);

impl Links {
    /// Collect every `Link` header in `headers`, resolving relative targets
    /// against `base`.
    pub fn from_headers(headers: &HeaderMap, base: &Url) -> Self {
        let mut links = Vec::new();
        for value in headers.get_all(http::header::LINK) {
            match value.to_str() {
                Ok(value) => parse_link_header(value, base, &mut links),
                Err(_) => tracing::warn!("Ignoring Link header which is not valid text"),
            }
        }
        Links(links)
    }

    /// Every target for `relation`, in header order.
    pub fn get<'l>(&'l self, relation: &'l str) -> impl Iterator<Item = &'l Url> + 'l {
        self.0
            .iter()
            .filter(move |(rel, _)| rel.eq_ignore_ascii_case(relation))
            .map(|(_, url)| url)
    }

    /// The first target for `relation`.
    pub fn first(&self, relation: &str) -> Option<&Url> {
        self.0
            .iter()
            .find(|(rel, _)| rel.eq_ignore_ascii_case(relation))
            .map(|(_, url)| url)
    }

    /// Whether no relations were found.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of relation entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Split a header value into its `<target>; params` entries.
///
/// Commas may appear inside a target, so a segment which does not open with
/// `<` continues the previous entry.
fn split_entries(value: &str) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();
    for segment in value.split(',') {
        match entries.last_mut() {
            Some(entry) if !segment.trim_start().starts_with('<') => {
                entry.push(',');
                entry.push_str(segment);
            }
            _ => entries.push(segment.to_owned()),
        }
    }
    entries
}

fn parse_link_header(value: &str, base: &Url, links: &mut Vec<(String, Url)>) {
    for entry in split_entries(value) {
        let entry = entry.trim();
        let Some((target, params)) = entry
            .strip_prefix('<')
            .and_then(|rest| rest.split_once('>'))
        else {
            tracing::warn!("Ignoring malformed Link entry: {entry}");
            continue;
        };

        let url: Url = match base.join(target.trim()) {
            Ok(url) => url.into(),
            Err(error) => {
                tracing::warn!("Ignoring Link target {target}: {error}");
                continue;
            }
        };

        for param in params.split(';') {
            let Some((name, rel)) = param.split_once('=') else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case("rel") {
                continue;
            }
            for relation in rel.trim().trim_matches('"').split_whitespace() {
                links.push((relation.to_ascii_lowercase(), url.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        "https://example.com/acme/cert/mAt3xBGaobw".parse().unwrap()
    }

    #[test]
    fn relations_keep_header_order() {
        let response = crate::response!("cert-chain.http");
        let links = Links::from_headers(response.headers(), &base());

        let alternates: Vec<_> = links.get(REL_ALTERNATE).map(|url| url.as_str()).collect();
        assert_eq!(
            alternates,
            vec![
                "https://example.com/acme/cert/mAt3xBGaobw/1",
                "https://example.com/acme/cert/mAt3xBGaobw/2",
            ]
        );
        assert_eq!(
            links.first("up").map(|url| url.as_str()),
            Some("https://example.com/acme/ca")
        );
        assert!(links.first(REL_NEXT).is_none());
    }

    #[test]
    fn combined_header_value() {
        let mut headers = HeaderMap::new();
        headers.append(
            http::header::LINK,
            r#"<https://example.com/acme/directory>;rel="index", <https://example.com/tos?a=1,2>; rel="terms-of-service""#
                .parse()
                .unwrap(),
        );
        let links = Links::from_headers(&headers, &base());
        assert_eq!(links.len(), 2);
        assert_eq!(
            links.first("index").map(|url| url.as_str()),
            Some("https://example.com/acme/directory")
        );
        assert_eq!(
            links.first(REL_TERMS_OF_SERVICE).map(|url| url.as_str()),
            Some("https://example.com/tos?a=1,2")
        );
    }

    #[test]
    fn relative_targets_and_bad_entries() {
        let mut headers = HeaderMap::new();
        headers.append(
            http::header::LINK,
            "<../orders?cursor=2>;rel=next".parse().unwrap(),
        );
        headers.append(http::header::LINK, r#"garbage;rel="up""#.parse().unwrap());
        let links = Links::from_headers(&headers, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(
            links.first(REL_NEXT).map(|url| url.as_str()),
            Some("https://example.com/acme/orders?cursor=2")
        );
    }
}
