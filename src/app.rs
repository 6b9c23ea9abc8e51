//! Render entrypoints: the weather calendar and the trend chart

use chrono::DateTime;
use chrono_tz::Tz;
use image::RgbImage;
use log::{info, warn};

use crate::draw::{binarize, Composer, FontSet, Locale, TrendChart};
use crate::error::{Error, Result};
use crate::event_source::{EventSource, TimeWindow};
use crate::todolist::todolist_from_events;
use crate::weather::{ChartDay, DailyForecast};

/// Callers must present the configured token. No configured token locks everyone out.
pub fn authorize(expected: Option<&str>, given: Option<&str>) -> Result<()> {
    match (expected, given) {
        (Some(expected), Some(given)) if !expected.is_empty() && expected == given => Ok(()),
        _ => Err(Error::Forbidden),
    }
}

/// Discover, fetch the window and close, whatever the outcome
pub fn todolist_from_source(
    source: &mut dyn EventSource,
    window: &TimeWindow,
    now: &DateTime<Tz>,
) -> Result<Vec<String>> {
    let events = source
        .discover()
        .and_then(|calendars| {
            info!("Found {} calendar(s)", calendars.len());
            source.fetch_events(window)
        });
    source.close();

    let events = events?;
    info!("Fetched {} event(s)", events.len());
    Ok(todolist_from_events(events, now))
}

/// Compose the weather calendar and reduce it to black and white
pub fn render_calendar(
    fonts: &FontSet,
    locale: &Locale,
    forecast: &[DailyForecast],
    todolist: &[String],
    now: &DateTime<Tz>,
) -> Result<RgbImage> {
    info!(
        "Rendering calendar: {} forecast day(s), {} todo line(s)",
        forecast.len(),
        todolist.len()
    );
    let canvas = Composer::new(fonts, locale).compose(forecast, todolist, now)?;
    let image = binarize(canvas.image());
    info!("Calendar rendered");
    Ok(image)
}

pub fn render_chart(fonts: &FontSet, series: &[ChartDay]) -> Result<RgbImage> {
    info!("Rendering trend chart: {} day(s)", series.len());
    if series.iter().any(|day| day.is_estimate) {
        warn!("Yesterday is an estimate from the forecast");
    }
    let canvas = TrendChart::new(fonts).render(series)?;
    let image = binarize(canvas.image());
    info!("Trend chart rendered");
    Ok(image)
}

#[cfg(feature = "http")]
pub use service::App;

#[cfg(feature = "http")]
mod service {
    use chrono::DateTime;
    use chrono_tz::Tz;
    use log::{error, info};

    use super::{render_calendar, render_chart, todolist_from_source};
    use crate::cache::FileCache;
    use crate::config::Config;
    use crate::device_push::DevicePusher;
    use crate::draw::{encode_png, FontSet};
    use crate::error::Result;
    use crate::event_source::transport::HttpDavTransport;
    use crate::event_source::{SourceRegistry, TimeWindow};
    use crate::time::{Clock, SystemClock};
    use crate::todolist::todolist_from_payload;
    use crate::weather::qweather::QWeatherClient;
    use crate::weather::{chart_series, CachedProvider, ForecastSpan, WeatherProvider};

    /// Everything a render needs, built once from the configuration
    pub struct App {
        config: Config,
        fonts: FontSet,
        registry: SourceRegistry,
        clock: Box<dyn Clock>,
    }

    impl App {
        pub fn new(config: Config) -> Self {
            let fonts = FontSet::load(&config.fonts);
            let clock = Box::new(SystemClock::new(config.tz()));
            Self {
                config,
                fonts,
                registry: SourceRegistry::default(),
                clock,
            }
        }

        pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
            self.clock = clock;
            self
        }

        pub fn authorize(&self, token: Option<&str>) -> Result<()> {
            super::authorize(self.config.token.as_deref(), token)
        }

        fn cache(&self) -> FileCache {
            if self.config.cache.enabled {
                FileCache::new(&self.config.cache.dir)
            } else {
                FileCache::disabled()
            }
        }

        fn weather(&self, forecast_ttl: u64, now: &DateTime<Tz>) -> Result<CachedProvider<QWeatherClient>> {
            let settings = self.config.require_weather()?;
            let client = QWeatherClient::new(settings, self.config.http_timeout())?;
            Ok(
                CachedProvider::new(client, self.cache(), &settings.location, now.timestamp())
                    .with_ttls(forecast_ttl, settings.historical_cache_ttl),
            )
        }

        /// Todo lines from a pre-built JSON payload, or else from the configured source
        pub fn collect_todolist(&self, calendar_json: Option<&str>) -> Result<Vec<String>> {
            self.todolist_at(calendar_json, &self.clock.now())
        }

        fn todolist_at(&self, calendar_json: Option<&str>, now: &DateTime<Tz>) -> Result<Vec<String>> {
            if let Some(raw) = calendar_json {
                return Ok(todolist_from_payload(raw, now));
            }
            let Some(settings) = self.config.require_calendar()? else {
                info!("No calendar source configured");
                return Ok(Vec::new());
            };

            let transport = HttpDavTransport::new(
                &settings.username,
                &settings.password,
                self.config.http_timeout(),
            )?;
            let mut source = self
                .registry
                .create(settings, Box::new(transport), self.config.tz())?;
            let window = TimeWindow::lookahead(now, settings.lookahead_days);
            todolist_from_source(source.as_mut(), &window, now)
        }

        /// PNG of the weather calendar, pushed to the devices when `dotsync` is set
        pub fn calendar_png(&self, calendar_json: Option<&str>, dotsync: bool) -> Result<Vec<u8>> {
            let now = self.clock.now();
            let todolist = self.todolist_at(calendar_json, &now)?;

            let settings = &self.config.weather;
            let provider = self.weather(settings.calendar_cache_ttl, &now)?;
            let mut forecast = provider.daily(ForecastSpan::covering(settings.calendar_days))?;
            forecast.truncate(usize::from(settings.calendar_days));

            let image = render_calendar(&self.fonts, &self.config.locale, &forecast, &todolist, &now)?;
            let png = encode_png(&image)?;
            if dotsync {
                self.sync(&png);
            }
            Ok(png)
        }

        /// PNG of the trend chart over `days` days, optionally led by yesterday
        pub fn chart_png(&self, days: u8, include_yesterday: bool, dotsync: bool) -> Result<Vec<u8>> {
            let now = self.clock.now();
            let settings = &self.config.weather;
            let provider = self.weather(settings.chart_cache_ttl, &now)?;
            let series = chart_series(
                &provider,
                days,
                include_yesterday,
                now.date_naive(),
                settings.observation_cache_ttl,
            )?;

            let image = render_chart(&self.fonts, &series)?;
            let png = encode_png(&image)?;
            if dotsync {
                self.sync(&png);
            }
            Ok(png)
        }

        fn sync(&self, png: &[u8]) {
            let pusher = self
                .config
                .require_device()
                .and_then(|device| DevicePusher::new(device, self.config.http_timeout()));
            match pusher {
                Ok(pusher) => {
                    pusher.push(png);
                }
                Err(e) => error!("Skipping device push: {e}"),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::error::Error;
        use crate::time::{FixedClock, DEFAULT_TZ};
        use chrono::TimeZone;

        fn app(config: Config) -> App {
            let now = DEFAULT_TZ.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap();
            App::new(config).with_clock(Box::new(FixedClock(now)))
        }

        fn ms(day: u32, hour: u32) -> i64 {
            DEFAULT_TZ
                .with_ymd_and_hms(2024, 1, day, hour, 0, 0)
                .unwrap()
                .timestamp_millis()
        }

        #[test]
        fn payload_is_bucketed_against_the_app_clock() {
            let raw = format!(
                r#"[
                    {{"time": {gym}, "timeLabel": "08:00", "title": "Gym"}},
                    {{"time": {standup}, "timeLabel": "09:00", "title": "Standup"}}
                ]"#,
                gym = ms(6, 8),
                standup = ms(5, 9),
            );
            let lines = app(Config::default()).collect_todolist(Some(&raw)).unwrap();
            assert_eq!(lines, vec!["09:00 Standup", "", "08:00 Gym"]);
        }

        #[test]
        fn no_source_configured_gives_no_lines() {
            let lines = app(Config::default()).collect_todolist(None).unwrap();
            assert!(lines.is_empty());
        }

        #[test]
        fn source_without_credentials_fails_before_any_request() {
            let mut config = Config::default();
            config.calendar.source = "dingtalk".to_string();
            let result = app(config).collect_todolist(None);
            assert!(matches!(result, Err(Error::Config(_))));
        }
    }
}
