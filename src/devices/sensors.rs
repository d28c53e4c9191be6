//! Motion sensor status poll, used once at start-up to catch motion that
//! began before the controller came up.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{DeviceError, SensorPoller};

/// Reads `sensor.motion` from a status document. Anything that is not a
/// JSON object carrying a boolean there means "no motion".
pub fn motion_from_body(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|doc| doc.get("sensor")?.get("motion")?.as_bool())
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct HttpSensorPoller {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpSensorPoller {
    pub const fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl SensorPoller for HttpSensorPoller {
    async fn motion(&self, status_url: &str) -> Result<bool, DeviceError> {
        let resp = self.http.get(status_url).timeout(self.timeout).send().await?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(DeviceError::Status(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        Ok(motion_from_body(&body))
    }
}
