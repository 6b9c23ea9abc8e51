//! Calendar event sources
//!
//! Every backend implements [`EventSource`]. Which one a deployment uses is decided by the
//! `calendar.source` config key, looked up in a [`SourceRegistry`].

pub mod caldav;
pub mod transport;
pub mod xml;

use std::collections::HashMap;

use chrono::{DateTime, Days};
use chrono_tz::Tz;
use log::info;

use crate::config::CalendarSettings;
use crate::error::{Error, Result};
use crate::time::local_to_epoch;
use crate::todolist::CalendarEvent;

pub use caldav::CalDavSource;
pub use transport::{DavRequest, DavResponse, DavTransport};

/// A calendar collection found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCollection {
    pub href: String,
    pub display_name: String,
    pub ctag: Option<String>,
}

/// Half-open window of epoch seconds events are fetched for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// From local midnight today through `days` days ahead
    pub fn lookahead(now: &DateTime<Tz>, days: u32) -> Self {
        let today = now.date_naive();
        let start = today
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| local_to_epoch(&midnight, now.timezone()))
            .unwrap_or_else(|| now.timestamp());
        let end = today
            .checked_add_days(Days::new(u64::from(days)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|midnight| local_to_epoch(&midnight, now.timezone()))
            .unwrap_or(start + i64::from(days) * 86_400);
        Self { start, end }
    }

    pub const fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts < self.end
    }
}

pub trait EventSource {
    /// Find the calendars behind the account. Results are remembered until [`close`].
    ///
    /// [`close`]: EventSource::close
    fn discover(&mut self) -> Result<Vec<CalendarCollection>>;

    /// Events of every discovered calendar starting inside `window`, sorted by start
    fn fetch_events(&mut self, window: &TimeWindow) -> Result<Vec<CalendarEvent>>;

    fn close(&mut self);
}

pub type SourceFactory =
    fn(&CalendarSettings, Box<dyn DavTransport>, Tz) -> Result<Box<dyn EventSource>>;

pub struct SourceRegistry {
    factories: HashMap<String, SourceFactory>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("dingtalk", |settings, transport, tz| {
            Ok(Box::new(CalDavSource::dingtalk(&settings.username, transport, tz)))
        });
        registry.register("caldav", generic_caldav);
        registry.register("google", generic_caldav);
        registry
    }
}

fn generic_caldav(
    settings: &CalendarSettings,
    transport: Box<dyn DavTransport>,
    tz: Tz,
) -> Result<Box<dyn EventSource>> {
    if settings.url.trim().is_empty() {
        return Err(Error::Config(format!(
            "calendar source {:?} needs a url",
            settings.source
        )));
    }
    Ok(Box::new(CalDavSource::generic(&settings.url, transport, tz)))
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, key: &str, factory: SourceFactory) {
        self.factories.insert(key.to_ascii_lowercase(), factory);
    }

    pub fn create(
        &self,
        settings: &CalendarSettings,
        transport: Box<dyn DavTransport>,
        tz: Tz,
    ) -> Result<Box<dyn EventSource>> {
        let key = settings.source.trim().to_ascii_lowercase();
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| Error::Config(format!("unknown calendar source {key:?}")))?;
        info!("Using calendar source {key}");
        factory(settings, transport, tz)
    }
}
