//! Concurrent, rate-limited, cache-backed batch querying.
//!
//! A batch is split into chunks of `max_concurrency` packages. Each chunk is
//! dispatched at once and awaited as a whole before the next one starts.
//! Every request has its own timeout and its own terminal outcome, so one
//! failing package never fails the batch.
//!
//! Dispatches are spaced `inter_request_delay_ms` apart across the whole
//! engine, so a chunk trickles out instead of firing at once. Cache reads and
//! writes run on the blocking pool.
//!
//! Before the first network call the engine probes the database once. If the
//! probe fails, every later batch short-circuits with `network_unavailable`
//! without waiting on any request timeout.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{QueryConfig, VulnerabilitySource};
use crate::cache::{cache_key, Cache, CACHE_TTL_HOURS};
use crate::error::QueryError;
use crate::model::{PackageRecord, QueryOutcome};
use crate::rate_limit::RateLimiter;

/// Cache key namespace for vulnerability lookups.
pub const CACHE_NAMESPACE: &str = "osv";

pub struct QueryEngine {
    source: Arc<dyn VulnerabilitySource>,
    cache: Option<Arc<Cache>>,
    rate_limiter: Arc<RateLimiter>,
    config: QueryConfig,
    cache_ttl_hours: u64,
    reachable: OnceCell<bool>,
    /// Earliest instant the next request may be dispatched.
    next_dispatch: Mutex<Option<Instant>>,
}

impl QueryEngine {
    pub fn new(
        source: Arc<dyn VulnerabilitySource>,
        rate_limiter: Arc<RateLimiter>,
        config: QueryConfig,
    ) -> Self {
        Self {
            source,
            cache: None,
            rate_limiter,
            config,
            cache_ttl_hours: CACHE_TTL_HOURS,
            reachable: OnceCell::new(),
            next_dispatch: Mutex::new(None),
        }
    }

    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_ttl_hours(mut self, hours: u64) -> Self {
        self.cache_ttl_hours = hours;
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Queries every package, honouring the configured batch deadline if any.
    ///
    /// Returns exactly one outcome per package, in input order.
    pub async fn query_batch(&self, packages: &[PackageRecord]) -> Vec<QueryOutcome> {
        let deadline = self
            .config
            .batch_deadline_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        self.run_batch(packages, deadline).await
    }

    /// Like [`QueryEngine::query_batch`], but chunks not started by
    /// `deadline` are reported as `cancelled`. Requests already in flight
    /// still run to completion or to their own timeout.
    pub async fn query_batch_until(
        &self,
        packages: &[PackageRecord],
        deadline: Instant,
    ) -> Vec<QueryOutcome> {
        self.run_batch(packages, Some(deadline)).await
    }

    /// Result of the one-time reachability probe.
    pub async fn network_available(&self) -> bool {
        *self
            .reachable
            .get_or_init(|| async {
                let probe_timeout = Duration::from_millis(self.config.probe_timeout_ms);
                let reachable = tokio::time::timeout(probe_timeout, self.source.is_reachable())
                    .await
                    .unwrap_or(false);
                if !reachable {
                    warn!(source = self.source.name(), "vulnerability database unreachable");
                }
                reachable
            })
            .await
    }

    async fn run_batch(
        &self,
        packages: &[PackageRecord],
        deadline: Option<Instant>,
    ) -> Vec<QueryOutcome> {
        if packages.is_empty() {
            return Vec::new();
        }

        if !self.network_available().await {
            let code = QueryError::NetworkUnavailable.code();
            return packages
                .iter()
                .map(|pkg| QueryOutcome::failed(pkg, code.clone()))
                .collect();
        }

        let chunk_size = self.config.max_concurrency.max(1);
        let mut outcomes = Vec::with_capacity(packages.len());

        for chunk in packages.chunks(chunk_size) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(remaining = packages.len() - outcomes.len(), "batch deadline reached");
                let code = QueryError::Cancelled.code();
                outcomes.extend(
                    packages[outcomes.len()..]
                        .iter()
                        .map(|pkg| QueryOutcome::failed(pkg, code.clone())),
                );
                break;
            }

            // join_all yields results in future order, not completion order.
            let results = join_all(chunk.iter().map(|pkg| self.query_one(pkg))).await;
            outcomes.extend(results);
        }

        let failed = outcomes.iter().filter(|o| !o.success).count();
        info!(
            packages = packages.len(),
            failed,
            source = self.source.name(),
            "vulnerability batch complete"
        );
        outcomes
    }

    async fn query_one(&self, package: &PackageRecord) -> QueryOutcome {
        let key = cache_key(
            CACHE_NAMESPACE,
            package.ecosystem.as_str(),
            &package.name,
            Some(&package.version),
        );

        if self.cache.is_some() {
            if let Some(outcome) = self.cached_outcome(&key).await {
                debug!(key = %key, "cache hit");
                return outcome;
            }
            debug!(key = %key, "cache miss");
        }

        self.rate_limiter.acquire().await;
        self.wait_for_dispatch_slot().await;

        let request_timeout = Duration::from_secs(self.config.request_timeout_secs);
        let outcome = match tokio::time::timeout(request_timeout, self.source.query(package)).await {
            Ok(Ok(vulns)) => QueryOutcome::succeeded(package, vulns),
            Ok(Err(e)) => QueryOutcome::failed(package, e.code()),
            Err(_) => QueryOutcome::failed(package, QueryError::Timeout.code()),
        };

        debug!(
            package = %package.name,
            ecosystem = %package.ecosystem,
            success = outcome.success,
            vulns = outcome.vulnerabilities.len(),
            "query finished"
        );

        if outcome.success {
            self.store_outcome(key, &outcome).await;
        }

        outcome
    }

    /// Reserves the next dispatch slot and sleeps until it arrives.
    ///
    /// The first request goes out immediately; each later one waits at least
    /// `inter_request_delay_ms` after the slot before it.
    async fn wait_for_dispatch_slot(&self) {
        let delay = Duration::from_millis(self.config.inter_request_delay_ms);
        if delay.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_dispatch.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + delay);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    async fn cached_outcome(&self, key: &str) -> Option<QueryOutcome> {
        let cache = self.cache.clone()?;
        let key = key.to_string();
        match tokio::task::spawn_blocking(move || cache.get::<QueryOutcome>(&key)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "cache read task failed");
                None
            }
        }
    }

    async fn store_outcome(&self, key: String, outcome: &QueryOutcome) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let outcome = outcome.clone();
        let ttl_hours = self.cache_ttl_hours;
        let write_key = key.clone();
        match tokio::task::spawn_blocking(move || cache.put(&write_key, &outcome, ttl_hours)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key = %key, error = %e, "failed to write cache entry"),
            Err(e) => warn!(key = %key, error = %e, "cache write task failed"),
        }
    }
}
