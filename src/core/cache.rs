use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::engine::run_forecast;
use super::types::{Catalog, ForecastError, ForecastParams, ForecastResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    usd_rate_bits: u64,
    local_rate_bits: u64,
    iterations: u32,
    seed: u64,
}

impl CacheKey {
    fn for_params(params: &ForecastParams) -> Self {
        Self {
            usd_rate_bits: params.usd_rate_percent.to_bits(),
            local_rate_bits: params.local_rate_percent.to_bits(),
            iterations: params.iterations,
            seed: params.seed,
        }
    }
}

/// Memoizes forecasts by their exact input tuple. Entries are never evicted;
/// the key space is bounded by the ranges the boundary exposes.
#[derive(Debug, Default)]
pub struct ForecastCache {
    entries: Mutex<HashMap<CacheKey, Arc<ForecastResult>>>,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `params`, computing and storing it on a
    /// miss. Two racing misses on one key both compute; the deterministic
    /// engine makes the second insert an identical overwrite. Failed runs are
    /// never stored.
    pub fn get_or_compute(
        &self,
        catalog: &Catalog,
        params: &ForecastParams,
    ) -> Result<Arc<ForecastResult>, ForecastError> {
        let key = CacheKey::for_params(params);
        if let Some(hit) = self.entries_guard().get(&key).cloned() {
            return Ok(hit);
        }

        let computed = Arc::new(run_forecast(catalog, params)?);
        self.entries_guard().insert(key, Arc::clone(&computed));
        Ok(computed)
    }

    pub fn len(&self) -> usize {
        self.entries_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries_guard().is_empty()
    }

    fn entries_guard(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<ForecastResult>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
