use super::ast;

use rowmap_core::{schema::Registry, Result};
use std::{cell::RefCell, collections::HashMap, rc::Rc, sync::Arc};

/// Parsed queries keyed by their trimmed text.
///
/// Cloning a `ParseCache` yields another handle to the same cache, so a
/// cache can be shared between entity managers or inspected by the code
/// that created it.
#[derive(Debug, Clone, Default)]
pub struct ParseCache {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Arc<ast::Query>>,
    hits: u64,
    misses: u64,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached parse of `oql`, parsing it on a miss. Failed
    /// parses are not cached.
    pub fn parse(&self, oql: &str, registry: &Registry) -> Result<Arc<ast::Query>> {
        let key = oql.trim();

        if let Some(query) = self.lookup(key) {
            tracing::trace!(oql = key, "parse cache hit");
            return Ok(query);
        }

        tracing::trace!(oql = key, "parse cache miss");
        self.inner.borrow_mut().misses += 1;

        let query = Arc::new(super::parse(key, registry)?);
        self.inner
            .borrow_mut()
            .entries
            .insert(key.to_string(), query.clone());

        Ok(query)
    }

    fn lookup(&self, key: &str) -> Option<Arc<ast::Query>> {
        let mut inner = self.inner.borrow_mut();
        let query = inner.entries.get(key).cloned()?;
        inner.hits += 1;
        Some(query)
    }

    pub fn contains(&self, oql: &str) -> bool {
        self.inner.borrow().entries.contains_key(oql.trim())
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.inner.borrow().hits
    }

    pub fn misses(&self) -> u64 {
        self.inner.borrow().misses
    }

    /// Drops every cached entry and resets the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }
}
