//! Periodic eviction of old entries from the dynamic generation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use offcache_core::{AppConfig, Bucket, CacheDb};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SweepReport {
    pub generation: String,
    pub scanned: u64,
    pub evicted: u64,
    pub retained: u64,
    /// Entries kept because their `date` header is missing or unparseable.
    pub undated: u64,
    pub errors: u64,
}

pub struct Janitor {
    store: CacheDb,
    generation: String,
    max_age: chrono::Duration,
    interval: Duration,
    shutdown: CancellationToken,
}

impl Janitor {
    pub fn new(store: CacheDb, generation: impl Into<String>, max_age: chrono::Duration) -> Self {
        Self {
            store,
            generation: generation.into(),
            max_age,
            interval: Duration::from_secs(86400),
            shutdown: CancellationToken::new(),
        }
    }

    /// Sweep the current version's dynamic generation on the configured schedule.
    pub fn from_config(store: CacheDb, config: &AppConfig) -> Self {
        Self::new(store, Bucket::Dynamic.generation(&config.version), config.max_age())
            .with_interval(config.janitor_interval())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// Delete entries whose `date` is older than `now - max_age`.
    ///
    /// Best effort: an entry that cannot be read or deleted is counted in
    /// `errors` and the sweep moves on.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport { generation: self.generation.clone(), ..SweepReport::default() };
        let cutoff = now - self.max_age;

        let keys = match self.store.entry_keys(&self.generation).await {
            Ok(keys) => keys,
            Err(e) => {
                error!(generation = %self.generation, error = %e, "janitor could not list entries");
                report.errors += 1;
                return report;
            }
        };

        for key in keys {
            report.scanned += 1;
            let entry = match self.store.match_entry(&self.generation, &key).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%key, error = %e, "janitor could not read entry");
                    report.errors += 1;
                    continue;
                }
            };

            let Some(timestamp) = entry.timestamp() else {
                report.undated += 1;
                continue;
            };
            if timestamp >= cutoff {
                report.retained += 1;
                continue;
            }

            match self.store.delete_entry(&self.generation, &key).await {
                Ok(_) => report.evicted += 1,
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "janitor could not delete entry");
                    report.errors += 1;
                }
            }
        }

        info!(
            generation = %report.generation,
            scanned = report.scanned,
            evicted = report.evicted,
            errors = report.errors,
            "janitor sweep completed"
        );
        report
    }

    /// Run sweeps every interval until cancelled. The first sweep runs one interval after start.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            generation = %self.generation,
            max_age_days = self.max_age.num_days(),
            "starting janitor"
        );

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut interval = tokio::time::interval_at(start, self.interval);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("janitor shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.sweep().await;
                    }
                }
            }
        })
    }
}
