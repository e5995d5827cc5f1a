//! Settings snapshot provider
//!
//! AppSettings 单例的时效缓存：过期后从 redb 重新加载，写入后显式失效。
//! 每次定价/指派调用拿到的是一份不可变快照（按值传递）。

use parking_lot::RwLock;
use shared::models::AppSettings;
use std::time::{Duration, Instant};

use crate::db::{MarketStorage, StorageResult};

#[derive(Debug)]
struct CachedSettings {
    loaded_at: Instant,
    settings: AppSettings,
}

#[derive(Debug)]
pub struct SettingsProvider {
    storage: MarketStorage,
    ttl: Duration,
    cache: RwLock<Option<CachedSettings>>,
}

impl SettingsProvider {
    pub fn new(storage: MarketStorage, ttl: Duration) -> Self {
        Self {
            storage,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Current settings snapshot
    ///
    /// Must not be called while the caller holds a write transaction: the
    /// first read may create the singleton row.
    pub fn snapshot(&self) -> StorageResult<AppSettings> {
        {
            let cache = self.cache.read();
            if let Some(cached) = cache.as_ref()
                && cached.loaded_at.elapsed() < self.ttl
            {
                return Ok(cached.settings.clone());
            }
        }

        let settings = self.storage.load_or_init_settings()?;
        *self.cache.write() = Some(CachedSettings {
            loaded_at: Instant::now(),
            settings: settings.clone(),
        });
        tracing::debug!("Settings snapshot reloaded");
        Ok(settings)
    }

    /// Drop the cached snapshot
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    /// Persist new settings and invalidate the cache
    pub fn update(&self, mut settings: AppSettings) -> StorageResult<AppSettings> {
        settings.updated_at = shared::util::now_millis();
        self.storage.save_settings(&settings)?;
        self.invalidate();
        tracing::info!("Settings updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_until_invalidated() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let provider = SettingsProvider::new(storage.clone(), Duration::from_secs(3600));
        assert_eq!(provider.snapshot().unwrap().tax_rate, 0.05);

        // Written behind the provider's back: cache still serves the old value
        let mut changed = storage.load_or_init_settings().unwrap();
        changed.tax_rate = 0.18;
        storage.save_settings(&changed).unwrap();
        assert_eq!(provider.snapshot().unwrap().tax_rate, 0.05);

        provider.invalidate();
        assert_eq!(provider.snapshot().unwrap().tax_rate, 0.18);
    }

    #[test]
    fn test_zero_ttl_always_reloads() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let provider = SettingsProvider::new(storage.clone(), Duration::ZERO);
        provider.snapshot().unwrap();

        let mut changed = storage.load_or_init_settings().unwrap();
        changed.min_order_value = 99.0;
        storage.save_settings(&changed).unwrap();
        assert_eq!(provider.snapshot().unwrap().min_order_value, 99.0);
    }

    #[test]
    fn test_update_is_visible_immediately() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let provider = SettingsProvider::new(storage, Duration::from_secs(3600));
        let mut settings = provider.snapshot().unwrap();
        settings.auto_reduce_stock_on_delivery = true;
        provider.update(settings).unwrap();
        assert!(provider.snapshot().unwrap().auto_reduce_stock_on_delivery);
    }
}
