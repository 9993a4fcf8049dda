//! Affiliate URL tagger
//!
//! Appends the configured `tag` query parameter to outbound Amazon links at
//! read time, so the stored URL stays clean and the tag can change without
//! a data migration. Non-Amazon and unparseable URLs pass through as-is.

use url::Url;

/// Hostnames eligible for affiliate tagging
const AMAZON_DOMAINS: &[&str] = &[
    "amazon.com",
    "www.amazon.com",
    "smile.amazon.com",
    "amazon.co.uk",
    "www.amazon.co.uk",
    "amazon.de",
    "www.amazon.de",
    "amazon.ca",
    "www.amazon.ca",
    "amazon.fr",
    "www.amazon.fr",
    "amazon.it",
    "www.amazon.it",
    "amazon.es",
    "www.amazon.es",
    "amazon.co.jp",
    "www.amazon.co.jp",
    "amzn.to",
    "amzn.eu",
];

/// Affiliate tagger configured with a partner tag
#[derive(Debug, Clone)]
pub struct AffiliateTagger {
    tag: String,
}

impl AffiliateTagger {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// Tag a URL if it points at Amazon and carries no `tag` parameter yet.
    ///
    /// Anything that does not parse as an absolute URL is returned
    /// unchanged; stored data is never rejected at read time.
    pub fn tag_url(&self, raw: &str) -> String {
        let Ok(mut url) = Url::parse(raw) else {
            return raw.to_string();
        };

        if !matches!(url.scheme(), "http" | "https") {
            return raw.to_string();
        }

        let Some(host) = url.host_str() else {
            return raw.to_string();
        };

        if !is_amazon_host(host) {
            return raw.to_string();
        }

        let already_tagged = url
            .query_pairs()
            .any(|(key, _)| key.eq_ignore_ascii_case("tag"));
        if already_tagged {
            return raw.to_string();
        }

        url.query_pairs_mut().append_pair("tag", &self.tag);
        url.to_string()
    }
}

fn is_amazon_host(host: &str) -> bool {
    let host = host.to_lowercase();
    AMAZON_DOMAINS.contains(&host.as_str())
}
