// config/cache.rs
// Time-boxed cache of the rule set + matrix, swapped as one unit

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::loader::ConfigLoader;
use super::types::DiagnosisConfig;
use super::ConfigError;
use crate::clock::Clock;
use crate::source::TabularDataSource;

pub const DEFAULT_TTL_MINUTES: i64 = 1440;

/// Loads attempted per `get_config` while `force_reload` keeps racing it.
const MAX_RELOAD_ATTEMPTS: usize = 3;

struct CachedConfig {
    config: Arc<DiagnosisConfig>,
    fetched_at: DateTime<Utc>,
}

/// Shared holder of the current `DiagnosisConfig`.
///
/// Readers get an `Arc` to an immutable config, so rules and matrix always
/// come from the same load. Reloads are serialized by `reload_lock`; a
/// caller that waited on the lock re-checks freshness before fetching.
/// `force_reload` bumps `generation`, and a load that started under an older
/// generation is never installed.
pub struct ConfigCache {
    source: Arc<dyn TabularDataSource>,
    clock: Arc<dyn Clock>,
    loader: ConfigLoader,
    ttl: Duration,
    state: RwLock<Option<CachedConfig>>,
    reload_lock: Mutex<()>,
    generation: AtomicU64,
}

impl ConfigCache {
    pub fn new(source: Arc<dyn TabularDataSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            loader: ConfigLoader::default(),
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            state: RwLock::new(None),
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current config, reloading when absent or older than the TTL.
    ///
    /// A failed reload is returned as `ConfigError::Unavailable`; an expired
    /// config is never served in its place.
    pub fn get_config(&self) -> Result<Arc<DiagnosisConfig>, ConfigError> {
        if let Some(config) = self.fresh() {
            return Ok(config);
        }

        let _guard = self.reload_lock.lock().map_err(|_| ConfigError::LockPoisoned)?;
        if let Some(config) = self.fresh() {
            return Ok(config);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let generation = self.generation.load(Ordering::SeqCst);
            let now = self.clock.now();
            let config = Arc::new(self.loader.load(self.source.as_ref(), now)?);

            let mut state = self.state.write().map_err(|_| ConfigError::LockPoisoned)?;
            if self.generation.load(Ordering::SeqCst) != generation {
                drop(state);
                if attempt < MAX_RELOAD_ATTEMPTS {
                    debug!(attempt, "Cache invalidated during load, reloading");
                    continue;
                }
                // Served to this caller only; the cache stays empty
                warn!(attempts = attempt, "Config kept changing during reload, not caching");
                return Ok(config);
            }

            *state = Some(CachedConfig {
                config: Arc::clone(&config),
                fetched_at: now,
            });
            info!(
                version = %config.short_version(),
                rules = config.rules.len(),
                diagnoses = config.matrix.rows.len(),
                ttl_minutes = self.ttl.num_minutes(),
                "Diagnosis config reloaded"
            );
            return Ok(config);
        }
    }

    /// Drop the cached config so the next `get_config` refetches. A load
    /// already in flight is discarded rather than installed.
    pub fn force_reload(&self) {
        match self.state.write() {
            Ok(mut state) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                *state = None;
            }
            Err(poisoned) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                *poisoned.into_inner() = None;
            }
        }
        info!("Diagnosis config cache invalidated");
    }

    /// Age of the cached config, if one is held.
    pub fn age(&self) -> Option<Duration> {
        let state = self.state.read().ok()?;
        state.as_ref().map(|c| self.clock.now() - c.fetched_at)
    }

    fn fresh(&self) -> Option<Arc<DiagnosisConfig>> {
        let state = self.state.read().ok()?;
        let cached = state.as_ref()?;
        let age = self.clock.now() - cached.fetched_at;
        if age < self.ttl {
            Some(Arc::clone(&cached.config))
        } else {
            debug!(age_minutes = age.num_minutes(), "Diagnosis config expired");
            None
        }
    }
}
