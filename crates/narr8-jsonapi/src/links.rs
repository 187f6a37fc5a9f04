//! Link construction for documents and resource objects.

use url::Url;

use crate::error::{JsonApiError, Result};
use crate::filters::{PAGE_OFFSET, PAGE_SIZE};

/// Base URL of a resource collection plus the request's pass-through
/// query parameters.
#[derive(Debug, Clone)]
pub struct LinkBase {
    url: Url,
}

impl LinkBase {
    /// `<api_url><endpoint>` with `passthrough` appended as query pairs.
    pub fn new(api_url: &str, endpoint: &str, passthrough: &[(String, String)]) -> Result<Self> {
        let base = format!("{api_url}{endpoint}");
        let mut url = Url::parse(&base).map_err(|source| JsonApiError::InvalidUrl {
            base: base.clone(),
            source,
        })?;

        if !passthrough.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(passthrough.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(Self { url })
    }

    /// This collection's URL with `page[size]` and, when given,
    /// `page[offset]` set.
    pub fn with_page(&self, size: usize, offset: Option<usize>) -> String {
        let mut url = self.url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != PAGE_SIZE && k != PAGE_OFFSET)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            pairs.append_pair(PAGE_SIZE, &size.to_string());
            if let Some(offset) = offset {
                pairs.append_pair(PAGE_OFFSET, &offset.to_string());
            }
        }

        decode_brackets(url.as_str())
    }
}

/// Link to one resource: `<api_url><endpoint>/<id>`.
pub fn resource_link(api_url: &str, endpoint: &str, id: &str) -> String {
    format!("{api_url}{endpoint}/{id}")
}

/// Query serialisation percent-encodes brackets; the wire format wants
/// them literal.
pub fn decode_brackets(link: &str) -> String {
    link.replace("%5B", "[")
        .replace("%5D", "]")
        .replace("%5b", "[")
        .replace("%5d", "]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parameters_keep_literal_brackets() {
        let base = LinkBase::new("http://localhost:3000/", "characters", &[]).unwrap();
        assert_eq!(
            base.with_page(25, None),
            "http://localhost:3000/characters?page[size]=25"
        );
        assert_eq!(
            base.with_page(2, Some(4)),
            "http://localhost:3000/characters?page[size]=2&page[offset]=4"
        );
    }

    #[test]
    fn passthrough_parameters_precede_page() {
        let passthrough = vec![
            ("include".to_string(), "user".to_string()),
            ("fields[character]".to_string(), "name".to_string()),
        ];
        let base = LinkBase::new("http://api.test/", "characters", &passthrough).unwrap();
        assert_eq!(
            base.with_page(10, Some(10)),
            "http://api.test/characters?include=user&fields[character]=name&page[size]=10&page[offset]=10"
        );
    }

    #[test]
    fn invalid_base_is_reported() {
        let err = LinkBase::new("not a url/", "characters", &[]).unwrap_err();
        assert!(matches!(err, JsonApiError::InvalidUrl { .. }));
    }

    #[test]
    fn resource_link_joins_endpoint_and_id() {
        assert_eq!(
            resource_link("http://localhost:3000/", "users", "u1"),
            "http://localhost:3000/users/u1"
        );
    }
}
