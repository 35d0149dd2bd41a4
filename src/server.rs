//! Status service.
//!
//! Read-only HTTP routes:
//! - `GET /temp`: current CPU temperature, `{"temp": <number>}`
//! - `GET /hat`: control accessory presence, `{"hat": <bool>}`
//!
//! `/temp` doubles as the wire contract for peer coordination. Every request
//! samples the sensors afresh; nothing here touches the actuator.

use crate::error::SensorError;
use crate::sensors::{self, PresenceDetector, Temperature, TemperatureSource};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize, Deserialize)]
pub struct TempResponse {
    pub temp: Temperature,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HatResponse {
    pub hat: bool,
}

/// Sensors shared read-only with the control loop.
#[derive(Clone)]
pub struct StatusState {
    pub temperature: Arc<dyn TemperatureSource>,
    pub presence: Arc<dyn PresenceDetector>,
}

/// `/temp` failure: the sensor could not be read. Carries no reading.
pub struct StatusError(SensorError);

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        warn!("Temperature query failed: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

/// GET /temp
async fn temp_handler(
    State(state): State<StatusState>,
) -> Result<Json<TempResponse>, StatusError> {
    let temp = sensors::sample(&state.temperature).await.map_err(StatusError)?;
    debug!("GET /temp -> {}", temp);
    Ok(Json(TempResponse { temp }))
}

/// GET /hat
async fn hat_handler(State(state): State<StatusState>) -> Json<HatResponse> {
    Json(HatResponse {
        hat: state.presence.is_present(),
    })
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/temp", get(temp_handler))
        .route("/hat", get(hat_handler))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn run_server(
    listener: TcpListener,
    state: StatusState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!("Status service listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    TcpListener::bind(addr).await
}
