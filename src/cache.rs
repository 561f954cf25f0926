//! Compiled query cache.
//!
//! Holds finalized trees whose shape does not depend on bound values, keyed
//! by a caller-chosen query key plus the names of the parameters bound to
//! NULL. Trees the postprocessor marks non-cacheable are never stored.

use crate::ast::{ParameterValues, SelectExpression, Value};
use crate::error::QueryResult;
use crate::postprocessor::ParameterBasedPostprocessor;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

/// Thread-safe cache of finalized query trees
pub struct CompiledQueryCache {
    entries: DashMap<String, Arc<SelectExpression>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CompiledQueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::with_capacity(config.max_entries.min(1024)),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn get(&self, key: &str) -> Option<Arc<SelectExpression>> {
        if !self.config.enabled {
            return None;
        }

        if let Some(entry) = self.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(entry.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a finalized tree. Returns whether it was stored.
    pub fn insert(&self, key: &str, select: Arc<SelectExpression>, can_cache: bool) -> bool {
        if !self.config.enabled || !can_cache {
            return false;
        }
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(key) {
            tracing::debug!(key, max_entries = self.config.max_entries, "query cache full");
            return false;
        }
        self.entries.insert(key.to_string(), select);
        true
    }

    /// Cache key for `query_key` under this binding.
    ///
    /// A tree finalized with a parameter bound to NULL differs from one
    /// finalized with a value, so the NULL-bound names are part of the key.
    pub fn shape_key(query_key: &str, parameter_values: &ParameterValues) -> String {
        let mut null_names: Vec<&str> = parameter_values
            .iter()
            .filter(|(_, value)| matches!(value, Value::Null))
            .map(|(name, _)| name.as_str())
            .collect();
        if null_names.is_empty() {
            return query_key.to_string();
        }
        null_names.sort_unstable();
        format!("{}|null:{}", query_key, null_names.join(","))
    }

    /// Look up `query_key` for this binding, postprocessing and storing the
    /// tree on a miss.
    ///
    /// Concurrent misses on one key may both run the postprocessor; the
    /// results are equivalent so either insert is fine.
    pub fn get_or_optimize(
        &self,
        query_key: &str,
        select: &Arc<SelectExpression>,
        parameter_values: &ParameterValues,
        postprocessor: &ParameterBasedPostprocessor,
    ) -> QueryResult<(Arc<SelectExpression>, bool)> {
        let key = Self::shape_key(query_key, parameter_values);
        if let Some(cached) = self.get(&key) {
            tracing::trace!(key = %key, "query cache hit");
            return Ok((cached, true));
        }
        let (finalized, can_cache) = postprocessor.optimize(select, parameter_values)?;
        self.insert(&key, Arc::clone(&finalized), can_cache);
        Ok((finalized, can_cache))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
