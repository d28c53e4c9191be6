//! API route handlers
//!
//! Signal handlers never touch controller state: they validate the request,
//! turn it into a [`ControlEvent`] and queue it.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use crate::controller::{Controller, EventSender, ScenePreview, StateSnapshot};
use crate::types::{ButtonGesture, ControlEvent, StatusDelta};

// ============================================================================
// API State
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiState {
    pub controller: Controller,
    pub events: EventSender,
}

impl ApiState {
    pub const fn new(controller: Controller, events: EventSender) -> Self {
        Self { controller, events }
    }
}

type SignalReply = (StatusCode, &'static str);

async fn enqueue(state: &ApiState, event: ControlEvent) -> SignalReply {
    if state.events.send(event).await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
    }
}

// ============================================================================
// Signals
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SensorQuery {
    pub sensor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ButtonQuery {
    pub event: Option<String>,
}

async fn sensor_signal(
    state: &ApiState,
    query: SensorQuery,
    to_event: fn(String) -> ControlEvent,
) -> SignalReply {
    let Some(id) = query.sensor.filter(|s| !s.is_empty()) else {
        warn!("Sensor signal without sensor id dropped");
        return (StatusCode::BAD_REQUEST, "missing sensor");
    };
    if !state.controller.knows_sensor(&id) {
        warn!(sensor = %id, "Signal from unconfigured sensor dropped");
        return (StatusCode::NOT_FOUND, "unknown sensor");
    }
    enqueue(state, to_event(id)).await
}

/// GET /motion?sensor=ID
pub async fn motion(State(state): State<ApiState>, Query(query): Query<SensorQuery>) -> SignalReply {
    sensor_signal(&state, query, ControlEvent::MotionStart).await
}

/// GET /motion_end?sensor=ID
pub async fn motion_end(
    State(state): State<ApiState>,
    Query(query): Query<SensorQuery>,
) -> SignalReply {
    sensor_signal(&state, query, ControlEvent::MotionEnd).await
}

/// GET /button?event=double_push|long_push|btn_up
pub async fn button(State(state): State<ApiState>, Query(query): Query<ButtonQuery>) -> SignalReply {
    let event = query.event.unwrap_or_default();
    match ButtonGesture::from_event(&event) {
        Some(gesture) => enqueue(&state, ControlEvent::Button(gesture)).await,
        None => {
            warn!(event = %event, "Unknown button event dropped");
            (StatusCode::BAD_REQUEST, "unknown event")
        }
    }
}

/// POST /status - primary light on/off notification
pub async fn status(State(state): State<ApiState>, Json(delta): Json<StatusDelta>) -> SignalReply {
    enqueue(&state, ControlEvent::Status(delta)).await
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

// ============================================================================
// Views
// ============================================================================

/// GET /api/v1/state
pub async fn get_state(State(state): State<ApiState>) -> Json<StateSnapshot> {
    Json(state.controller.snapshot())
}

/// GET /api/v1/config - the active configuration
pub async fn get_config(State(state): State<ApiState>) -> Json<serde_json::Value> {
    match serde_json::to_value(state.controller.config()) {
        Ok(v) => Json(v),
        Err(e) => Json(serde_json::json!({
            "error": format!("Failed to serialize config: {e}")
        })),
    }
}

/// GET /api/v1/scene - what a motion event would produce right now
pub async fn get_scene(State(state): State<ApiState>) -> Json<ScenePreview> {
    Json(state.controller.preview_scene())
}
