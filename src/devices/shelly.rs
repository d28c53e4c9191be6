//! Shelly Gen2 JSON-RPC adapters: the dimmer, its virtual boolean and the
//! strip's power switch.
//!
//! Every call is `POST http://{host}/rpc` with `{id, method, params}`. The
//! device answers `{"id", "src", "result"}` or `{"id", "src", "error": {code, message}}`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{DeviceError, LightCommand, MotionFlagStore, PowerSwitch, PrimaryLight};
use crate::config::defaults::RPC_REQUEST_ID;
use crate::types::PrimaryStatus;

// ============================================================================
// RPC Transport
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcFrame {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
struct RpcFault {
    code: i64,
    #[serde(default)]
    message: String,
}

/// `http://` is prepended unless the host already carries a scheme.
pub fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[derive(Debug, Clone)]
pub struct ShellyRpc {
    http: reqwest::Client,
    url: String,
}

impl ShellyRpc {
    pub fn new(http: reqwest::Client, host: &str) -> Self {
        Self {
            http,
            url: format!("{}/rpc", base_url(host)),
        }
    }

    /// Invoke `method` and return its `result` member (`null` when absent).
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, DeviceError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&json!({ "id": RPC_REQUEST_ID, "method": method, "params": params }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DeviceError::Status(resp.status().as_u16()));
        }

        let frame: RpcFrame = resp
            .json()
            .await
            .map_err(|e| DeviceError::Decode(format!("{method}: {e}")))?;

        match frame {
            RpcFrame { error: Some(fault), .. } => Err(DeviceError::Rpc {
                code: fault.code,
                message: fault.message,
            }),
            RpcFrame { result, .. } => Ok(result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// Dimmer
// ============================================================================

/// `Light.Set` parameters. Durations go out in seconds.
pub fn light_set_params(light_id: u32, command: &LightCommand) -> Value {
    let mut params = json!({ "id": light_id, "on": command.on });
    if let Some(brightness) = command.brightness {
        params["brightness"] = json!(brightness);
    }
    if let Some(transition) = command.transition {
        params["transition_duration"] = json!(transition.as_secs_f64());
    }
    if let Some(after) = command.toggle_after {
        params["toggle_after"] = json!(after.as_secs_f64());
    }
    params
}

#[derive(Debug, Deserialize)]
struct LightStatusBody {
    output: bool,
    #[serde(default)]
    brightness: Option<f64>,
}

/// Decode a `Light.GetStatus` result.
pub fn parse_light_status(result: Value) -> Result<PrimaryStatus, DeviceError> {
    let body: LightStatusBody = serde_json::from_value(result)
        .map_err(|e| DeviceError::Decode(format!("Light.GetStatus: {e}")))?;
    Ok(PrimaryStatus {
        output: body.output,
        brightness: body.brightness.map(percent_from_f64),
    })
}

// Clamped to 0..=100 first, so the cast cannot truncate
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_from_f64(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone)]
pub struct ShellyDimmer {
    rpc: ShellyRpc,
    light_id: u32,
}

impl ShellyDimmer {
    pub const fn new(rpc: ShellyRpc, light_id: u32) -> Self {
        Self { rpc, light_id }
    }
}

#[async_trait]
impl PrimaryLight for ShellyDimmer {
    async fn set(&self, command: LightCommand) -> Result<(), DeviceError> {
        self.rpc
            .call("Light.Set", light_set_params(self.light_id, &command))
            .await
            .map(|_| ())
    }

    async fn status(&self) -> Result<PrimaryStatus, DeviceError> {
        let result = self
            .rpc
            .call("Light.GetStatus", json!({ "id": self.light_id }))
            .await?;
        parse_light_status(result)
    }
}

// ============================================================================
// Virtual Boolean (motion flag)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ShellyFlag {
    rpc: ShellyRpc,
    vbool_id: u32,
}

impl ShellyFlag {
    pub const fn new(rpc: ShellyRpc, vbool_id: u32) -> Self {
        Self { rpc, vbool_id }
    }
}

#[async_trait]
impl MotionFlagStore for ShellyFlag {
    async fn get(&self) -> Result<Option<bool>, DeviceError> {
        let result = self
            .rpc
            .call("Boolean.GetStatus", json!({ "id": self.vbool_id }))
            .await?;
        Ok(result.get("value").and_then(Value::as_bool))
    }

    async fn set(&self, enabled: bool) -> Result<(), DeviceError> {
        self.rpc
            .call("Boolean.Set", json!({ "id": self.vbool_id, "value": enabled }))
            .await
            .map(|_| ())
    }
}

// ============================================================================
// Power Switch
// ============================================================================

/// `Switch.Set` parameters; the switch only ever gets turned on.
pub fn switch_on_params(switch_id: u32, toggle_after: Option<Duration>) -> Value {
    let mut params = json!({ "id": switch_id, "on": true });
    if let Some(after) = toggle_after {
        params["toggle_after"] = json!(after.as_secs());
    }
    params
}

#[derive(Debug, Clone)]
pub struct ShellySwitch {
    rpc: ShellyRpc,
    switch_id: u32,
}

impl ShellySwitch {
    pub const fn new(rpc: ShellyRpc, switch_id: u32) -> Self {
        Self { rpc, switch_id }
    }
}

#[async_trait]
impl PowerSwitch for ShellySwitch {
    async fn turn_on(&self, toggle_after: Option<Duration>) -> Result<(), DeviceError> {
        self.rpc
            .call("Switch.Set", switch_on_params(self.switch_id, toggle_after))
            .await
            .map(|_| ())
    }
}
