//! Link sources: where article pages come from and how links are read off them.

pub mod wiki;

pub use wiki::WikiSource;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

/// Terms found in a page's content region, in document order, with the
/// lookup URL for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub terms: Vec<String>,
    pub urls: HashMap<String, String>,
}

impl Discovery {
    /// Append a discovered link. The first URL seen for a term is kept.
    pub fn push(&mut self, term: String, url: String) {
        self.urls.entry(term.clone()).or_insert(url);
        self.terms.push(term);
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Access to an encyclopedia's pages and their outgoing article links.
#[async_trait]
pub trait LinkSource: Send + Sync {
    /// Canonical lookup URL for a term.
    fn lookup_url(&self, term: &str) -> String;

    /// Retrieve a page as decoded text. Any transport failure or non-success
    /// status is an error.
    async fn fetch_page(&self, url: &str) -> Result<String>;

    /// Read article links out of a page. A page without the expected content
    /// region yields an empty discovery.
    fn extract(&self, page: &str) -> Discovery;
}
