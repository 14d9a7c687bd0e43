//! Edge raster tiles fetched from an HTTP provider.
//!
//! The provider is queried once per tile:
//! `GET {url}?lat=..&lon=..&radius_m=..&size=..&resolution_m=..` and answers
//! `{"values": [...]}` with `size * size` row-major values, northern row first.

use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use survey_core::{PlannerError, Raster, RasterSource, TileRequest};
use tokio::runtime::Handle;

use crate::cache::{prune_cache, CacheEntry};
use crate::config::Config;

#[derive(Debug, Clone)]
struct RasterCacheEntry {
    fetched_at: Instant,
    raster: Raster<f32>,
}

impl CacheEntry for RasterCacheEntry {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

#[derive(Debug, Deserialize)]
struct RasterResponse {
    values: Option<Vec<f32>>,
}

/// [`RasterSource`] backed by an HTTP provider with a TTL cache.
///
/// `fetch` blocks on the runtime it was created in, so it must be called
/// from a blocking worker such as `tokio::task::spawn_blocking`.
pub struct HttpRasterSource {
    client: Client,
    handle: Handle,
    base_url: String,
    timeout: Duration,
    cache_ttl: Duration,
    cache_max_entries: usize,
    cache: DashMap<String, RasterCacheEntry>,
}

impl HttpRasterSource {
    pub fn new(client: Client, handle: Handle, config: &Config) -> Self {
        Self {
            client,
            handle,
            base_url: config.raster_source_url.trim().to_string(),
            timeout: Duration::from_secs(config.raster_request_timeout_s.max(1)),
            cache_ttl: Duration::from_secs(config.raster_cache_ttl_s.max(30)),
            cache_max_entries: config.raster_cache_max_entries.max(1),
            cache: DashMap::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cached_tiles(&self) -> usize {
        self.cache.len()
    }

    async fn fetch_remote(&self, request: &TileRequest) -> Result<Raster<f32>, String> {
        let url = build_provider_url(&self.base_url, request);
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        if !response.status().is_success() {
            return Err(format!("raster provider HTTP {}", response.status()));
        }
        let payload: RasterResponse = response.json().await.map_err(|err| err.to_string())?;
        let mut values = payload
            .values
            .ok_or_else(|| "raster provider missing values".to_string())?;
        for value in values.iter_mut() {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
        Raster::from_vec(request.patch_size, request.patch_size, values).map_err(|err| err.to_string())
    }
}

impl RasterSource for HttpRasterSource {
    fn fetch(&self, request: &TileRequest) -> Result<Raster<f32>, PlannerError> {
        if self.base_url.is_empty() {
            return Err(PlannerError::RasterSource(
                "raster provider URL is empty".to_string(),
            ));
        }

        let key = raster_cache_key(request);
        let mut stale_cache: Option<Raster<f32>> = None;
        if let Some(entry) = self.cache.get(&key) {
            let age = entry.fetched_at.elapsed();
            if age <= self.cache_ttl {
                return Ok(entry.raster.clone());
            }
            if age <= self.cache_ttl.saturating_mul(2) {
                stale_cache = Some(entry.raster.clone());
            }
        }

        match self.handle.block_on(self.fetch_remote(request)) {
            Ok(raster) => {
                self.cache.insert(
                    key,
                    RasterCacheEntry {
                        fetched_at: Instant::now(),
                        raster: raster.clone(),
                    },
                );
                prune_cache(
                    &self.cache,
                    self.cache_max_entries,
                    self.cache_ttl.saturating_mul(2),
                );
                Ok(raster)
            }
            Err(err) => {
                if let Some(stale) = stale_cache {
                    tracing::warn!("Raster fetch failed, using stale cache: {}", err);
                    return Ok(stale);
                }
                Err(PlannerError::RasterSource(err))
            }
        }
    }
}

fn build_provider_url(base: &str, request: &TileRequest) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!(
        "{}{}lat={:.7}&lon={:.7}&radius_m={:.3}&size={}&resolution_m={:.3}",
        base,
        separator,
        request.center.0,
        request.center.1,
        request.buffer_radius_m,
        request.patch_size,
        request.resolution_m
    )
}

fn raster_cache_key(request: &TileRequest) -> String {
    format!(
        "raster:{:.7}:{:.7}:{}:{:.3}",
        request.center.0, request.center.1, request.patch_size, request.resolution_m
    )
}
