//! Horizon page walking helpers

use super::error::RpcError;
use reqwest::Url;

/// Largest page Horizon will serve
pub const HORIZON_PAGE_MAX_LIMIT: usize = 200;

/// Clamp a requested page size into `1..=200`; zero means "as large as allowed"
pub fn normalize_page_size(limit: usize) -> usize {
    if limit == 0 {
        HORIZON_PAGE_MAX_LIMIT
    } else {
        limit.min(HORIZON_PAGE_MAX_LIMIT)
    }
}

/// A Horizon resource path plus query, independent of the endpoint serving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    /// Resolve against `base`, keeping any path prefix the base carries
    pub fn url(&self, base: &str) -> Result<Url, RpcError> {
        let mut url = join_url(base, &self.path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }

    /// Rebase a `_links.next.href` so the next page can be served by any
    /// endpoint in the pool, not just the one that produced the link
    pub fn from_next_link(href: &str, base: &str) -> Result<Self, RpcError> {
        let link = match Url::parse(href) {
            Ok(link) => link,
            Err(_) => join_url(base, href)
                .map_err(|_| RpcError::Decode(format!("invalid next-page link: {}", href)))?,
        };

        let prefix = Url::parse(base)
            .map(|b| b.path().trim_end_matches('/').to_string())
            .unwrap_or_default();
        let path = link.path();
        let path = path.strip_prefix(prefix.as_str()).unwrap_or(path);

        Ok(Self {
            path: path.trim_start_matches('/').to_string(),
            query: link.query_pairs().into_owned().collect(),
        })
    }
}

/// `base` + `/` + `path`, tolerant of slashes on either side
pub fn join_url(base: &str, path: &str) -> Result<Url, RpcError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| RpcError::InvalidConfig(format!("invalid endpoint URL {}: {}", joined, e)))
}
