use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;

/// Timezone used when nothing else is configured
///
/// Used to decide day roll-over for todo bucketing and the evening icon switch
pub const DEFAULT_TZ: Tz = chrono_tz::Asia::Shanghai;

/// Source of "now" for a render call. Tests pin it, the service reads the system clock.
pub trait Clock {
    fn now(&self) -> DateTime<Tz>;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Tz>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.0
    }
}

/// Parse an IANA zone name, falling back to `fallback` with a warning
pub fn parse_tz(name: &str, fallback: Tz) -> Tz {
    name.trim().parse::<Tz>().unwrap_or_else(|_| {
        warn!("Unknown timezone {name:?}, using {fallback}");
        fallback
    })
}

/// Interpret a wall-clock time in `tz` as epoch seconds.
///
/// Ambiguous local times (DST fold) resolve to the earlier instant, times that fall in a
/// DST gap yield `None`.
pub fn local_to_epoch(naive: &NaiveDateTime, tz: Tz) -> Option<i64> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

pub fn epoch_to_local(ts: i64, tz: Tz) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.with_timezone(&tz))
}
