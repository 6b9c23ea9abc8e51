//! Daily forecast records and the providers that deliver them

pub mod cached;
pub mod history;
#[cfg(feature = "http")]
pub mod qweather;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

pub use cached::CachedProvider;
pub use history::{chart_series, ChartDay};

/// Icon code for "unknown", also used for padding cells
pub const UNKNOWN_ICON: &str = "999";
const UNKNOWN_GLYPH: char = '\u{F146}';

/// One forecast day as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub fx_date: NaiveDate,
    #[serde(default = "unknown_icon")]
    pub icon_day: String,
    #[serde(default = "unknown_icon")]
    pub icon_night: String,
    #[serde(default)]
    pub text_day: String,
    #[serde(default)]
    pub text_night: String,
    #[serde(deserialize_with = "lenient_int")]
    pub temp_max: i32,
    #[serde(deserialize_with = "lenient_int")]
    pub temp_min: i32,
}

fn unknown_icon() -> String {
    UNKNOWN_ICON.to_string()
}

impl DailyForecast {
    /// Whether any of `keywords` shows up in the night condition text
    pub fn night_matches(&self, keywords: &[String]) -> bool {
        contains_any(&self.text_night, keywords)
    }

    pub fn day_matches(&self, keywords: &[String]) -> bool {
        contains_any(&self.text_day, keywords)
    }
}

pub fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| !k.is_empty() && text.contains(k.as_str()))
}

/// The provider sends numbers as strings, the cache writes them back as numbers
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> core::result::Result<i32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(i64),
        Float(f64),
        Str(String),
    }

    let value = match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => n as f64,
        NumOrString::Float(f) => f,
        NumOrString::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("not a temperature: {s:?}")))?,
    };
    Ok(value.round() as i32)
}

/// Body of the daily forecast endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DailyResponse {
    pub code: String,
    #[serde(default)]
    pub daily: Vec<DailyForecast>,
}

/// Body of the historical weather endpoint. Depending on the API version `weatherDaily` is
/// either a single object or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalResponse {
    pub code: String,
    #[serde(default)]
    pub weather_daily: Option<OneOrMany<HistoricalDay>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_first(self) -> Option<T> {
        match self {
            Self::One(item) => Some(item),
            Self::Many(items) => items.into_iter().next(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDay {
    #[serde(default, alias = "date")]
    pub fx_date: Option<NaiveDate>,
    #[serde(default)]
    pub icon_day: Option<String>,
    #[serde(default)]
    pub icon_night: Option<String>,
    #[serde(default)]
    pub text_day: Option<String>,
    #[serde(default)]
    pub text_night: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub temp_max: i32,
    #[serde(deserialize_with = "lenient_int")]
    pub temp_min: i32,
}

impl HistoricalDay {
    /// Fill the gaps of an observation, `date` is used when the record carries none
    pub fn into_forecast(self, date: NaiveDate) -> DailyForecast {
        DailyForecast {
            fx_date: self.fx_date.unwrap_or(date),
            icon_day: self.icon_day.unwrap_or_else(unknown_icon),
            icon_night: self.icon_night.unwrap_or_else(unknown_icon),
            text_day: self.text_day.unwrap_or_default(),
            text_night: self.text_night.unwrap_or_default(),
            temp_max: self.temp_max,
            temp_min: self.temp_min,
        }
    }
}

/// Forecast lengths the provider offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ForecastSpan {
    Days3,
    Days7,
    Days10,
    Days15,
    Days30,
}

impl ForecastSpan {
    pub const fn all() -> [Self; 5] {
        [Self::Days3, Self::Days7, Self::Days10, Self::Days15, Self::Days30]
    }

    pub const fn days(self) -> u8 {
        match self {
            Self::Days3 => 3,
            Self::Days7 => 7,
            Self::Days10 => 10,
            Self::Days15 => 15,
            Self::Days30 => 30,
        }
    }

    /// Shortest span with at least `days` days, capped at the longest
    pub fn covering(days: u8) -> Self {
        Self::all()
            .into_iter()
            .find(|span| span.days() >= days)
            .unwrap_or(Self::Days30)
    }
}

impl fmt::Display for ForecastSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

pub trait WeatherProvider {
    /// Daily forecast starting today, ascending by date
    fn daily(&self, span: ForecastSpan) -> Result<Vec<DailyForecast>>;

    /// Observed weather of a past day, `None` when the provider has no record
    fn historical(&self, date: NaiveDate) -> Result<Option<DailyForecast>>;
}

impl<P: WeatherProvider + ?Sized> WeatherProvider for &P {
    fn daily(&self, span: ForecastSpan) -> Result<Vec<DailyForecast>> {
        (**self).daily(span)
    }

    fn historical(&self, date: NaiveDate) -> Result<Option<DailyForecast>> {
        (**self).historical(date)
    }
}

/// Glyph of the weather icon font for a provider icon code
pub fn icon_glyph(code: &str) -> char {
    let code: u16 = match code.trim().parse() {
        Ok(code) => code,
        Err(_) => return UNKNOWN_GLYPH,
    };
    let glyph = match code {
        100..=104 => 0xF101 + u32::from(code - 100),
        150..=153 => 0xF106 + u32::from(code - 150),
        154 => 0xF105,
        300..=318 => 0xF1D5 + u32::from(code - 300),
        350 => 0xF1E8,
        351 => 0xF1E9,
        399 => 0xF1EA,
        400..=410 => 0xF1EB + u32::from(code - 400),
        456 => 0xF1F6,
        457 => 0xF1F7,
        499 => 0xF1F8,
        500..=504 => 0xF1F9 + u32::from(code - 500),
        507..=515 => 0xF1FE + u32::from(code - 507),
        900 => 0xF207,
        901 => 0xF208,
        _ => return UNKNOWN_GLYPH,
    };
    char::from_u32(glyph).unwrap_or(UNKNOWN_GLYPH)
}
