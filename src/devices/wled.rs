//! WLED strip adapter (`POST /json/state`).

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::shelly::base_url;
use super::{DeviceError, SecondaryCommand, SecondaryLight};
use crate::config::SecondaryConfig;

/// WLED brightness (0-255) for a percentage. Any non-zero percentage stays
/// visible.
pub fn wled_brightness(pct: u8) -> u8 {
    let pct = u32::from(pct.min(100));
    let bri = (pct * 255 + 50) / 100;
    match u8::try_from(bri) {
        Ok(0) if pct > 0 => 1,
        Ok(b) => b,
        Err(_) => u8::MAX,
    }
}

/// WLED transitions count in tenths of a second.
pub fn wled_transition(transition: Duration) -> u64 {
    let ms = u64::try_from(transition.as_millis()).unwrap_or(u64::MAX);
    ms.saturating_add(50) / 100
}

#[derive(Debug, Clone)]
pub struct WledClient {
    http: reqwest::Client,
    url: String,
    playlist: i64,
    preset: i64,
    effect: i64,
    default_color: Map<String, Value>,
}

impl WledClient {
    pub fn new(http: reqwest::Client, config: &SecondaryConfig) -> Self {
        Self {
            http,
            url: format!("{}/json/state", base_url(&config.wled_host)),
            playlist: config.playlist_on_motion,
            preset: config.preset_on_motion,
            effect: config.effect_on_motion,
            default_color: config.default_color.clone(),
        }
    }

    /// First configured motion look, in priority order playlist, preset,
    /// effect. Ids below 1 are unset.
    fn motion_effect(&self) -> Option<(&'static str, i64)> {
        [("pl", self.playlist), ("ps", self.preset), ("fx", self.effect)]
            .into_iter()
            .find(|(_, id)| *id > 0)
    }

    /// JSON body for `command`.
    pub fn state_payload(&self, command: SecondaryCommand) -> Value {
        match command {
            SecondaryCommand::Off { transition } => {
                json!({ "on": false, "transition": wled_transition(transition) })
            }
            SecondaryCommand::On {
                brightness_pct,
                transition,
                motion,
            } => {
                let mut payload = Map::new();
                payload.insert("on".into(), json!(true));
                payload.insert("bri".into(), json!(wled_brightness(brightness_pct)));
                payload.insert("transition".into(), json!(wled_transition(transition)));

                match self.motion_effect().filter(|_| motion) {
                    Some((key, id)) => {
                        payload.insert(key.into(), json!(id));
                    }
                    None => payload.extend(self.default_color.clone()),
                }
                Value::Object(payload)
            }
        }
    }
}

#[async_trait]
impl SecondaryLight for WledClient {
    async fn apply(&self, command: SecondaryCommand) -> Result<(), DeviceError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&self.state_payload(command))
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DeviceError::Status(resp.status().as_u16()))
        }
    }
}
