//! Use <https://dev.qweather.com> for daily forecasts and historical observations

use std::time::Duration;

use chrono::NaiveDate;
use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::{DailyForecast, DailyResponse, ForecastSpan, HistoricalResponse, WeatherProvider};
use crate::config::WeatherSettings;
use crate::error::{Error, Result};

/// API level success code, carried in the body
const CODE_OK: &str = "200";
/// No data for the requested date
const CODE_NO_DATA: &str = "204";

pub struct QWeatherClient {
    client: Client,
    host: String,
    key: String,
    location: String,
}

impl QWeatherClient {
    pub fn new(settings: &WeatherSettings, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: settings.host.trim().trim_end_matches('/').to_string(),
            key: settings.key.clone(),
            location: settings.location.clone(),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("https://{}{path}", self.host);
        let response = self
            .client
            .get(&url)
            .query(&[("location", self.location.as_str()), ("key", self.key.as_str())])
            .query(query)
            .send()?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text()?;
                serde_json::from_str(&body)
                    .map_err(|e| Error::Parse(format!("unexpected body from {path}: {e}")))
            }
            status => Err(Error::protocol(status.as_u16(), format!("GET {path}"))),
        }
    }
}

/// The API reports failures in the body with a numeric string code
fn api_error(code: &str, context: &str) -> Error {
    Error::protocol(code.parse().unwrap_or(0), context)
}

impl WeatherProvider for QWeatherClient {
    fn daily(&self, span: ForecastSpan) -> Result<Vec<DailyForecast>> {
        info!("Fetching {span} forecast for {}", self.location);
        let path = format!("/v7/weather/{span}");
        let response: DailyResponse = self.get(&path, &[])?;
        if response.code != CODE_OK {
            return Err(api_error(&response.code, "daily forecast"));
        }
        Ok(response.daily)
    }

    fn historical(&self, date: NaiveDate) -> Result<Option<DailyForecast>> {
        info!("Fetching observed weather of {date} for {}", self.location);
        let date_param = date.format("%Y%m%d").to_string();
        let response: HistoricalResponse =
            self.get("/v7/historical/weather", &[("date", &date_param)])?;

        match response.code.as_str() {
            CODE_OK => Ok(response
                .weather_daily
                .and_then(|days| days.into_first())
                .map(|day| day.into_forecast(date))),
            CODE_NO_DATA => {
                warn!("No historical weather for {date}");
                Ok(None)
            }
            code => Err(api_error(code, "historical weather")),
        }
    }
}
