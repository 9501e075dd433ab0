pub mod auth;
pub mod events;
pub mod users;

use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthPayload {
    pub ok: bool,
    pub time: String,
}

pub async fn health_check() -> Json<HealthPayload> {
    Json(HealthPayload {
        ok: true,
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
