use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde_derive::Deserialize;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod customers;
pub mod documents;
pub mod invoices;
pub mod settings;
pub mod signature;

/// Destructive routes demand an explicit `?confirm=true`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

pub fn app() -> Router<crate::state::State> {
    let cors_layer = CorsLayer::new().allow_origin([
        "http://localhost:5173".parse().unwrap(),
        "http://localhost:3000".parse().unwrap(),
    ]);

    Router::new()
        .route("/health", get(health))
        .route("/customers", get(customers::list).post(customers::create))
        .route(
            "/customers/:id",
            get(customers::fetch)
                .put(customers::update)
                .delete(customers::remove),
        )
        .route("/invoices", get(invoices::list).post(invoices::create))
        .route(
            "/invoices/:id",
            get(invoices::fetch)
                .put(invoices::update)
                .delete(invoices::remove),
        )
        .route("/invoices/export", post(documents::export))
        .route("/invoices/email", post(documents::email_batch))
        .route("/invoices/:id/document", get(documents::preview))
        .route("/invoices/:id/pdf", get(documents::pdf))
        .route("/invoices/:id/email", post(documents::email))
        .route("/signature", post(signature::capture))
        .route("/settings", get(settings::fetch).put(settings::update))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(DefaultBodyLimit::disable())
        // Limit the body to 8 MiB, logos and signatures travel inline as data URLs
        .layer(RequestBodyLimitLayer::new(8 * 1024 * 1024))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "commit": env!("COMMIT_HASH") }))
}
