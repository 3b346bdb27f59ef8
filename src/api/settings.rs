use crate::models::{AppSettings, UpdateSettings};
use crate::store::Store;
use axum::extract::State;
use axum::Json;
use axum_valid::Garde;
use std::sync::Arc;

pub async fn fetch(State(store): State<Arc<Store>>) -> Json<AppSettings> {
    Json(store.settings().await)
}

/// Partial update, absent fields keep their stored value.
pub async fn update(
    State(store): State<Arc<Store>>,
    Garde(Json(update)): Garde<Json<UpdateSettings>>,
) -> Json<AppSettings> {
    Json(store.update_settings(update).await)
}
