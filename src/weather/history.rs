//! Day series for the trend chart, optionally led by yesterday's weather

use chrono::{Days, NaiveDate};
use log::{info, warn};

use super::{CachedProvider, DailyForecast, ForecastSpan, WeatherProvider};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartDay {
    pub forecast: DailyForecast,
    /// Lies before today
    pub is_historical: bool,
    /// Derived from a forecast rather than observed
    pub is_estimate: bool,
}

impl ChartDay {
    pub fn forecast(forecast: DailyForecast) -> Self {
        Self {
            forecast,
            is_historical: false,
            is_estimate: false,
        }
    }
}

fn observation_key(location: &str, date: NaiveDate) -> String {
    format!("qweather_historical_real_{location}_{}", date.format("%Y-%m-%d"))
}

/// Yesterday's record: our own saved observation, then the historical API, then today's
/// forecast shifted back one day as an estimate.
fn yesterday<P: WeatherProvider>(
    provider: &CachedProvider<P>,
    date: NaiveDate,
    forecast: &[DailyForecast],
) -> Option<ChartDay> {
    let key = observation_key(provider.location(), date);
    if let Some(observed) = provider.cache().get::<DailyForecast>(&key, provider.now()) {
        info!("Yesterday from saved observation");
        return Some(ChartDay {
            forecast: observed,
            is_historical: true,
            is_estimate: false,
        });
    }

    match provider.historical(date) {
        Ok(Some(observed)) => {
            info!("Yesterday from historical weather");
            return Some(ChartDay {
                forecast: DailyForecast {
                    fx_date: date,
                    ..observed
                },
                is_historical: true,
                is_estimate: false,
            });
        }
        Ok(None) => info!("No historical weather for {date}"),
        Err(e) => warn!("Historical weather lookup failed: {e}"),
    }

    let first = forecast.first()?;
    let fx_date = first.fx_date.checked_sub_days(Days::new(1))?;
    info!("Yesterday estimated from the forecast");
    Some(ChartDay {
        forecast: DailyForecast {
            fx_date,
            ..first.clone()
        },
        is_historical: true,
        is_estimate: true,
    })
}

/// Forecast of `days` days from `today`, led by yesterday when asked for and available.
///
/// Today's forecast is saved as tomorrow's "yesterday" observation.
pub fn chart_series<P: WeatherProvider>(
    provider: &CachedProvider<P>,
    days: u8,
    include_yesterday: bool,
    today: NaiveDate,
    observation_ttl: u64,
) -> Result<Vec<ChartDay>> {
    let mut forecast = provider.daily(ForecastSpan::covering(days))?;
    forecast.truncate(usize::from(days));
    if forecast.is_empty() {
        return Err(Error::Render("no forecast days for the chart".to_string()));
    }

    let mut series = Vec::with_capacity(forecast.len() + 1);
    if include_yesterday {
        match today.checked_sub_days(Days::new(1)) {
            Some(date) => match yesterday(provider, date, &forecast) {
                Some(day) => series.push(day),
                None => warn!("Leaving yesterday out of the chart"),
            },
            None => warn!("Leaving yesterday out of the chart"),
        }
    }

    if let Some(current) = forecast.iter().find(|day| day.fx_date == today) {
        let key = observation_key(provider.location(), today);
        provider
            .cache()
            .set(&key, current, observation_ttl, provider.now());
    }

    series.extend(forecast.into_iter().map(ChartDay::forecast));
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCache;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn day(d: u32, min: i32, max: i32) -> DailyForecast {
        DailyForecast {
            fx_date: date(d),
            icon_day: "100".to_string(),
            icon_night: "150".to_string(),
            text_day: "晴".to_string(),
            text_night: "晴".to_string(),
            temp_max: max,
            temp_min: min,
        }
    }

    enum History {
        Observed,
        Missing,
        Broken,
    }

    struct Fake {
        history: History,
        days: Vec<DailyForecast>,
    }

    impl WeatherProvider for Fake {
        fn daily(&self, _span: ForecastSpan) -> Result<Vec<DailyForecast>> {
            Ok(self.days.clone())
        }

        fn historical(&self, date: NaiveDate) -> Result<Option<DailyForecast>> {
            match self.history {
                History::Observed => Ok(Some(DailyForecast {
                    fx_date: date,
                    ..day(1, -10, -1)
                })),
                History::Missing => Ok(None),
                History::Broken => Err(Error::protocol(403, "historical weather")),
            }
        }
    }

    fn fake(history: History) -> Fake {
        Fake {
            history,
            days: (5..=20).map(|d| day(d, 0, 10)).collect(),
        }
    }

    #[test]
    fn saved_observation_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set(&observation_key("101", date(4)), &day(4, 3, 7), 0, 0);
        let provider = CachedProvider::new(fake(History::Observed), cache, "101", 10);

        let series = chart_series(&provider, 15, true, date(5), 86_400).unwrap();
        assert_eq!(series.len(), 16);
        assert!(series[0].is_historical && !series[0].is_estimate);
        assert_eq!(series[0].forecast.temp_max, 7);
        assert!(!series[1].is_historical);
    }

    #[test]
    fn falls_back_to_historical_api() {
        let provider = CachedProvider::new(fake(History::Observed), FileCache::disabled(), "101", 0);
        let series = chart_series(&provider, 7, true, date(5), 86_400).unwrap();
        assert_eq!(series.len(), 8);
        assert_eq!(series[0].forecast.fx_date, date(4));
        assert_eq!(series[0].forecast.temp_min, -10);
        assert!(!series[0].is_estimate);
    }

    #[test]
    fn estimate_from_forecast_when_history_fails() {
        for history in [History::Missing, History::Broken] {
            let provider = CachedProvider::new(fake(history), FileCache::disabled(), "101", 0);
            let series = chart_series(&provider, 7, true, date(5), 86_400).unwrap();
            assert!(series[0].is_estimate);
            assert_eq!(series[0].forecast.fx_date, date(4));
            assert_eq!(series[0].forecast.temp_max, series[1].forecast.temp_max);
        }
    }

    #[test]
    fn without_yesterday_and_write_back() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CachedProvider::new(fake(History::Broken), FileCache::new(dir.path()), "101", 100);
        let series = chart_series(&provider, 10, false, date(5), 86_400).unwrap();
        assert_eq!(series.len(), 10);
        assert!(series.iter().all(|d| !d.is_historical));

        let saved: Option<DailyForecast> = provider.cache().get(&observation_key("101", date(5)), 200);
        assert_eq!(saved, Some(day(5, 0, 10)));
    }

    #[test]
    fn empty_forecast_is_render_error() {
        let provider = CachedProvider::new(
            Fake {
                history: History::Missing,
                days: Vec::new(),
            },
            FileCache::disabled(),
            "101",
            0,
        );
        assert!(matches!(
            chart_series(&provider, 7, true, date(5), 0),
            Err(Error::Render(_))
        ));
    }
}
