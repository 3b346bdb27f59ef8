use super::{sample_customer, sample_invoice, test_app, test_app_with, TestApp, RENDERER};
use crate::models::{Customer, Invoice};
use crate::signature::{Point, SignaturePad};
use axum::http::StatusCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn seeded(app: &TestApp) -> (Customer, Invoice) {
    let customer = app
        .server
        .post("/customers")
        .json(&sample_customer())
        .await
        .json::<Customer>();
    let invoice = app
        .server
        .post("/invoices")
        .json(&sample_invoice(&customer.id))
        .await
        .json::<Invoice>();

    (customer, invoice)
}

#[tokio::test]
async fn preview_is_a_png() {
    let app = test_app().await;
    let (_, invoice) = seeded(&app).await;

    let response = app
        .server
        .get(&format!("/invoices/{}/document", invoice.id))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(&response.as_bytes()[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn pdf_downloads_with_the_invoice_number_in_the_name() {
    let app = test_app().await;
    let (_, invoice) = seeded(&app).await;

    let response = app
        .server
        .get(&format!("/invoices/{}/pdf", invoice.id))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "application/pdf");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"Invoice_INV-001.pdf\""
    );
    assert_eq!(&response.as_bytes()[..5], b"%PDF-");
}

#[tokio::test]
async fn pdf_filename_is_sanitized() {
    let app = test_app().await;

    let mut new = sample_invoice("gone");
    new.invoice_number = String::from("INV 7/2025");
    let invoice = app
        .server
        .post("/invoices")
        .json(&new)
        .await
        .json::<Invoice>();

    let response = app
        .server
        .get(&format!("/invoices/{}/pdf", invoice.id))
        .await;

    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"Invoice_INV_7_2025.pdf\""
    );
}

#[tokio::test]
async fn documents_render_after_the_customer_is_gone() {
    let app = test_app().await;
    let (customer, invoice) = seeded(&app).await;

    let response = app
        .server
        .delete(&format!("/customers/{}?confirm=true", customer.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = app
        .server
        .get(&format!("/invoices/{}/pdf", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn documents_embed_a_saved_signature() {
    let app = test_app().await;

    let mut pad = SignaturePad::default();
    pad.begin_stroke(Point { x: 20.0, y: 20.0 });
    pad.add_point(Point { x: 200.0, y: 90.0 });

    let mut new = sample_invoice("gone");
    new.signature = pad.save().unwrap().unwrap();
    let invoice = app
        .server
        .post("/invoices")
        .json(&new)
        .await
        .json::<Invoice>();

    let response = app
        .server
        .get(&format!("/invoices/{}/document", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn documents_reject_without_a_render_surface() {
    let app = test_app_with(None, None).await;
    let (_, invoice) = seeded(&app).await;

    let response = app
        .server
        .get(&format!("/invoices/{}/document", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .server
        .get(&format!("/invoices/{}/pdf", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    // Batch operations fail whole, nothing is partially exported.
    let response = app
        .server
        .post("/invoices/export")
        .json(&serde_json::json!({ "invoiceIds": [invoice.id] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn export_writes_pdfs_and_reports_failures() {
    let app = test_app().await;
    let (_, invoice) = seeded(&app).await;

    let response = app
        .server
        .post("/invoices/export")
        .json(&serde_json::json!({ "invoiceIds": [invoice.id, "missing"] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let report = response.json::<serde_json::Value>();
    assert_eq!(report["exported"], serde_json::json!(["Invoice_INV-001.pdf"]));
    assert_eq!(report["failed"][0]["id"], "missing");
    assert_eq!(report["failed"][0]["error"], "invoice not found");

    let exported = std::path::PathBuf::from(std::env::var("EXPORT_PATH").unwrap())
        .join("Invoice_INV-001.pdf");
    let bytes = std::fs::read(exported).unwrap();
    assert_eq!(&bytes[..5], b"%PDF-");
}

#[tokio::test]
async fn batch_selection_must_not_be_empty() {
    let app = test_app().await;

    let response = app
        .server
        .post("/invoices/export")
        .json(&serde_json::json!({ "invoiceIds": [] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn email_hands_the_invoice_to_the_relay() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let app = test_app_with(
        RENDERER.clone(),
        Some(format!("{}/messages", relay.uri())),
    )
    .await;
    let (_, invoice) = seeded(&app).await;

    let response = app
        .server
        .post(&format!("/invoices/{}/email", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn email_falls_back_to_the_customer_address() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let app = test_app_with(RENDERER.clone(), Some(relay.uri())).await;

    let customer = app
        .server
        .post("/customers")
        .json(&sample_customer())
        .await
        .json::<Customer>();

    let mut new = sample_invoice(&customer.id);
    new.email_id = String::new();
    let invoice = app
        .server
        .post("/invoices")
        .json(&new)
        .await
        .json::<Invoice>();

    let response = app
        .server
        .post(&format!("/invoices/{}/email", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn email_without_any_recipient_is_rejected() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&relay)
        .await;

    let app = test_app_with(RENDERER.clone(), Some(relay.uri())).await;

    let mut new = sample_invoice("gone");
    new.email_id = String::new();
    let invoice = app
        .server
        .post("/invoices")
        .json(&new)
        .await
        .json::<Invoice>();

    let response = app
        .server
        .post(&format!("/invoices/{}/email", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn email_reports_the_relay_unavailable() {
    let app = test_app().await;
    let (_, invoice) = seeded(&app).await;

    let response = app
        .server
        .post(&format!("/invoices/{}/email", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn relay_failures_surface() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&relay)
        .await;

    let app = test_app_with(RENDERER.clone(), Some(relay.uri())).await;
    let (_, invoice) = seeded(&app).await;

    let response = app
        .server
        .post(&format!("/invoices/{}/email", invoice.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn email_batch_continues_past_failures() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let app = test_app_with(RENDERER.clone(), Some(relay.uri())).await;
    let (_, invoice) = seeded(&app).await;

    let response = app
        .server
        .post("/invoices/email")
        .json(&serde_json::json!({ "invoiceIds": ["missing", invoice.id] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let report = response.json::<serde_json::Value>();
    assert_eq!(report["sent"], 1);
    assert_eq!(report["failed"][0]["id"], "missing");
    assert_eq!(report["failed"][0]["error"], "invoice not found");
}
