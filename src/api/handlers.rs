//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CoalescingCache, Lookup};
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::source::{MemorySource, Source};

/// Application state shared across all handlers.
///
/// The cache is internally synchronized, so handlers share it without an
/// outer lock.
#[derive(Clone)]
pub struct AppState {
    /// Cache in front of `source`
    pub cache: CoalescingCache<String, String>,
    /// Backing lookup used on cache misses
    pub source: Arc<dyn Source>,
}

impl AppState {
    /// Creates a new AppState from a cache and its backing source.
    pub fn new(cache: CoalescingCache<String, String>, source: Arc<dyn Source>) -> Self {
        Self { cache, source }
    }

    /// Creates a new AppState from configuration, backed by an empty
    /// in-memory source.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            CoalescingCache::from_config(config),
            Arc::new(MemorySource::new()),
        )
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair directly in the cache.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.set(req.key.clone(), req.value);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Reads the cache only; a negative entry and a miss both yield 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.lookup(&key) {
        Lookup::Hit(value) => Ok(Json(GetResponse::new(key, value))),
        Lookup::Absent | Lookup::Miss => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /resolve/:key
///
/// Reads through the cache to the backing source. Concurrent requests for the
/// same key share one source lookup, and "not found" is remembered for the
/// negative TTL.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    check_key(&key)?;

    let source = Arc::clone(&state.source);
    let lookup_key = key.clone();
    let value = state
        .cache
        .get_or_create(key.clone(), move || async move {
            source
                .lookup(&lookup_key)
                .await
                .map(Option::unwrap_or_default)
        })
        .await?;

    if value.is_empty() {
        return Err(CacheError::NotFound(key));
    }
    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for PUT /source
///
/// Inserts a mapping into the backing source, then populates the cache so
/// the next resolve is a hit.
pub async fn source_insert_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state
        .source
        .insert(req.key.clone(), req.value.clone())
        .await
        .map_err(CacheError::factory)?;
    state.cache.set(req.key.clone(), req.value);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for DELETE /del/:key
///
/// Drops the cached entry, positive or negative.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if state.cache.remove(&key) {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats(),
        state.cache.max_entries(),
    ))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
