use chrono::NaiveDate;
use log::info;

use super::{DailyForecast, ForecastSpan, WeatherProvider};
use crate::cache::FileCache;
use crate::error::Result;

/// Serves provider answers from the file cache while they are fresh
pub struct CachedProvider<P> {
    inner: P,
    cache: FileCache,
    location: String,
    forecast_ttl: u64,
    historical_ttl: u64,
    now: i64,
}

impl<P: WeatherProvider> CachedProvider<P> {
    /// `now` is the epoch second freshness is judged against
    pub fn new(inner: P, cache: FileCache, location: &str, now: i64) -> Self {
        Self {
            inner,
            cache,
            location: location.to_string(),
            forecast_ttl: 5 * 60,
            historical_ttl: 6 * 60 * 60,
            now,
        }
    }

    pub fn with_ttls(mut self, forecast_ttl: u64, historical_ttl: u64) -> Self {
        self.forecast_ttl = forecast_ttl;
        self.historical_ttl = historical_ttl;
        self
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub const fn now(&self) -> i64 {
        self.now
    }
}

impl<P: WeatherProvider> WeatherProvider for CachedProvider<P> {
    fn daily(&self, span: ForecastSpan) -> Result<Vec<DailyForecast>> {
        let key = format!("qweather_daily_{}_{span}", self.location);
        if let Some(days) = self.cache.get(&key, self.now) {
            return Ok(days);
        }
        let days = self.inner.daily(span)?;
        info!("Fetched {} forecast days ({span})", days.len());
        self.cache.set(&key, &days, self.forecast_ttl, self.now);
        Ok(days)
    }

    fn historical(&self, date: NaiveDate) -> Result<Option<DailyForecast>> {
        let key = format!("qweather_historical_{}_{}", self.location, date.format("%Y%m%d"));
        if let Some(day) = self.cache.get(&key, self.now) {
            return Ok(Some(day));
        }
        let day = self.inner.historical(date)?;
        if let Some(day) = &day {
            self.cache.set(&key, day, self.historical_ttl, self.now);
        }
        Ok(day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counting {
        calls: Cell<u32>,
    }

    impl WeatherProvider for Counting {
        fn daily(&self, _span: ForecastSpan) -> Result<Vec<DailyForecast>> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![DailyForecast {
                fx_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                icon_day: "100".to_string(),
                icon_night: "150".to_string(),
                text_day: "晴".to_string(),
                text_night: "晴".to_string(),
                temp_max: 10,
                temp_min: 0,
            }])
        }

        fn historical(&self, _date: NaiveDate) -> Result<Option<DailyForecast>> {
            self.calls.set(self.calls.get() + 1);
            Ok(None)
        }
    }

    #[test]
    fn second_call_hits_the_cache_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Counting { calls: Cell::new(0) };
        let cached = CachedProvider::new(&inner, FileCache::new(dir.path()), "101", 1_000);
        cached.daily(ForecastSpan::Days7).unwrap();
        let days = cached.daily(ForecastSpan::Days7).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(inner.calls.get(), 1);

        let later = CachedProvider::new(&inner, FileCache::new(dir.path()), "101", 1_000 + 301);
        later.daily(ForecastSpan::Days7).unwrap();
        assert_eq!(inner.calls.get(), 2);
    }

    #[test]
    fn missing_history_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Counting { calls: Cell::new(0) };
        let cached = CachedProvider::new(&inner, FileCache::new(dir.path()), "101", 0);
        let date = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        assert_eq!(cached.historical(date).unwrap(), None);
        assert_eq!(cached.historical(date).unwrap(), None);
        assert_eq!(inner.calls.get(), 2);
    }
}
