//! In-memory search index
//!
//! Documents are JSON objects stored per index. A query is split into
//! lowercase terms; a document's score is the number of times those terms
//! appear among the words of its string values (nested ones included).
//! Results come back best score first, ties broken by id, each carrying
//! `_id` and `_score`. An empty query matches every document with score 0.

use async_trait::async_trait;
use conduit_core::config::ProviderConfig;
use conduit_core::traits::{SearchProvider, SearchProviderFactory};
use conduit_core::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::MEMORY_SEARCH;

type Index = BTreeMap<String, Value>;

/// In-memory search provider
#[derive(Debug, Clone)]
pub struct MemorySearchProvider {
    indexes: Arc<RwLock<HashMap<String, Index>>>,
    max_results: Option<usize>,
}

impl MemorySearchProvider {
    /// Number of documents held in `index`
    pub async fn document_count(&self, index: &str) -> usize {
        self.indexes
            .read()
            .await
            .get(index)
            .map_or(0, BTreeMap::len)
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn collect_words(value: &Value, words: &mut Vec<String>) {
    match value {
        Value::String(s) => words.extend(terms(s)),
        Value::Array(items) => items.iter().for_each(|v| collect_words(v, words)),
        Value::Object(map) => map.values().for_each(|v| collect_words(v, words)),
        _ => {}
    }
}

fn score(document: &Value, query_terms: &[String]) -> usize {
    let mut words = Vec::new();
    collect_words(document, &mut words);
    words
        .iter()
        .filter(|w| query_terms.iter().any(|t| t == *w))
        .count()
}

fn passes(document: &Value, filters: Option<&Map<String, Value>>) -> bool {
    filters.is_none_or(|filters| {
        filters
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    })
}

#[async_trait]
impl SearchProvider for MemorySearchProvider {
    async fn query(
        &self,
        text: &str,
        index: &str,
        filters: Option<&Map<String, Value>>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let limit = self.max_results.map_or(limit, |max| limit.min(max));
        let query_terms = terms(text);

        let indexes = self.indexes.read().await;
        let Some(documents) = indexes.get(index) else {
            return Ok(Vec::new());
        };

        let mut ranked: Vec<(usize, &String, &Value)> = documents
            .iter()
            .filter(|(_, doc)| passes(doc, filters))
            .filter_map(|(id, doc)| {
                if query_terms.is_empty() {
                    return Some((0, id, doc));
                }
                let s = score(doc, &query_terms);
                (s > 0).then_some((s, id, doc))
            })
            .collect();

        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(s, id, doc)| {
                let mut hit = doc.as_object().cloned().unwrap_or_default();
                hit.insert("_id".into(), Value::String(id.clone()));
                hit.insert("_score".into(), Value::from(s));
                Value::Object(hit)
            })
            .collect())
    }

    async fn index_document(&self, id: &str, document: &Value, index: &str) -> Result<bool> {
        if !document.is_object() {
            return Err(Error::permanent(MEMORY_SEARCH, "document must be an object"));
        }

        let mut indexes = self.indexes.write().await;
        let replaced = indexes
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), document.clone())
            .is_some();

        tracing::debug!(
            "{} document {} in index {}",
            if replaced { "Replaced" } else { "Indexed" },
            id,
            index
        );
        Ok(true)
    }

    fn provider_name(&self) -> &str {
        MEMORY_SEARCH
    }
}

/// Factory for in-memory search providers
///
/// Every provider built by one factory (or its clones) shares the same
/// indexes, so documents survive across gateway calls.
#[derive(Debug, Clone, Default)]
pub struct MemorySearchFactory {
    indexes: Arc<RwLock<HashMap<String, Index>>>,
}

impl MemorySearchFactory {
    /// Create a factory with no documents
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SearchProviderFactory for MemorySearchFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn SearchProvider>> {
        let max_results = match config.values.get("max_results") {
            None => None,
            Some(v) => match v.as_u64() {
                Some(n) if n > 0 => Some(n as usize),
                _ => {
                    return Err(Error::config(
                        "memory search: max_results must be a positive integer",
                    ));
                }
            },
        };

        Ok(Box::new(MemorySearchProvider {
            indexes: self.indexes.clone(),
            max_results,
        }))
    }
}
