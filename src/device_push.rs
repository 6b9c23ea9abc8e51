//! Pushing a rendered PNG to Dot devices
//!
//! Failures are logged and counted, never returned: the image has already been produced
//! by the time we get here.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{error, info, warn};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_ENCODING, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::DeviceSettings;
use crate::error::Result;

/// Devices a push goes to. A non-negative index picks one of the comma separated ids.
pub fn target_devices(ids: &str, idx: i32) -> Vec<&str> {
    let all: Vec<&str> = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    let Ok(idx) = usize::try_from(idx) else {
        return all;
    };
    match all.get(idx) {
        Some(id) => vec![*id],
        None => {
            warn!(
                "Device index {idx} out of range for {} device(s), using the first",
                all.len()
            );
            all.into_iter().take(1).collect()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushBody<'a> {
    device_id: &'a str,
    /// Base64 PNG
    image: String,
    refresh_now: bool,
    border: u8,
    dither_type: &'a str,
    link: &'a str,
}

impl<'a> PushBody<'a> {
    pub fn new(device_id: &'a str, png: &[u8], link: &'a str) -> Self {
        Self {
            device_id,
            image: STANDARD.encode(png),
            refresh_now: true,
            border: 0,
            // the image is already two-level
            dither_type: "NONE",
            link,
        }
    }
}

pub struct DevicePusher {
    client: Client,
    settings: DeviceSettings,
}

impl DevicePusher {
    pub fn new(settings: &DeviceSettings, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    /// Returns how many devices accepted the image
    pub fn push(&self, png: &[u8]) -> usize {
        let devices = target_devices(&self.settings.device_ids, self.settings.device_idx);
        let mut pushed = 0;

        for device in &devices {
            let body = PushBody::new(device, png, &self.settings.link);
            let response = self
                .client
                .post(&self.settings.endpoint)
                .header(AUTHORIZATION, format!("Bearer {}", self.settings.app_key))
                .header(ACCEPT_ENCODING, "identity")
                .json(&body)
                .send();

            match response {
                Ok(response) => match response.status() {
                    status if accepted(status) => {
                        info!("Pushed image to device {device}");
                        pushed += 1;
                    }
                    status => {
                        let text = response.text().unwrap_or_default();
                        error!("Device {device} rejected the image: {status} {text}");
                    }
                },
                Err(e) => error!("Push to device {device} failed: {e}"),
            }
        }

        info!("Push result: {pushed}/{} device(s)", devices.len());
        pushed
    }
}

/// Any 2xx reply means the device queued the image
fn accepted(status: StatusCode) -> bool {
    status.is_success()
}
