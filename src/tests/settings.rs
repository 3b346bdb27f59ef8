use super::test_app;
use crate::models::AppSettings;
use axum::http::StatusCode;

#[tokio::test]
async fn defaults_are_seeded_on_first_run() {
    let app = test_app().await;

    let response = app.server.get("/settings").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let settings = response.json::<AppSettings>();
    assert_eq!(settings.business_name, "Your Business");
    assert_eq!(settings.business_address, "123 Business Street, City");
    assert_eq!(settings.business_email, "business@example.com");
    assert_eq!(settings.business_phone, "(123) 456-7890");
    assert_eq!(settings.tax_rate.cgst, 9.0);
    assert_eq!(settings.tax_rate.sgst, 9.0);
}

#[tokio::test]
async fn update_merges_only_the_given_fields() {
    let app = test_app().await;

    let response = app
        .server
        .put("/settings")
        .json(&serde_json::json!({ "businessName": "Highway Cabs" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let settings = response.json::<AppSettings>();
    assert_eq!(settings.business_name, "Highway Cabs");
    assert_eq!(settings.business_address, "123 Business Street, City");

    let settings = app.server.get("/settings").await.json::<AppSettings>();
    assert_eq!(settings.business_name, "Highway Cabs");
}

#[tokio::test]
async fn update_replaces_the_tax_rate_whole() {
    let app = test_app().await;

    let settings = app
        .server
        .put("/settings")
        .json(&serde_json::json!({ "taxRate": { "CGST": 2.5, "SGST": 2.5 } }))
        .await
        .json::<AppSettings>();

    assert_eq!(settings.tax_rate.cgst, 2.5);
    assert_eq!(settings.tax_rate.sgst, 2.5);
}

#[tokio::test]
async fn update_accepts_an_image_signature() {
    let app = test_app().await;

    // A 1x1 PNG.
    let data_url = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    let response = app
        .server
        .put("/settings")
        .json(&serde_json::json!({ "signature": data_url }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<AppSettings>().signature, data_url);
}

#[tokio::test]
async fn update_rejects_a_non_image_logo() {
    let app = test_app().await;

    let response = app
        .server
        .put("/settings")
        .json(&serde_json::json!({ "businessLogo": "data:text/html;base64,PGI+" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
