use crate::api::app;
use crate::mailer::Mailer;
use crate::models::{GuestName, InvoiceStatus, NewCustomer, NewInvoice, NewInvoiceItem};
use crate::render::Renderer;
use crate::store::{JsonStore, Store};
use axum::body::Body;
use axum::http::request::Request;
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::NaiveDate;
use std::sync::{Arc, LazyLock, Once};
use tempdir::TempDir;
use tower::ServiceExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod documents;
mod settings;

static INIT: Once = Once::new();

/// Fonts load once for the whole test run.
static RENDERER: LazyLock<Option<Arc<Renderer>>> =
    LazyLock::new(|| Renderer::new().ok().map(Arc::new));

fn test_init() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with::<EnvFilter>("dutybill=debug,tower_http=debug,axum::rejection=trace".into())
            .with(tracing_subscriber::fmt::layer())
            .init();

        let exports = TempDir::new("dutybill-exports").unwrap();
        std::env::set_var("EXPORT_PATH", exports.path());
        std::mem::forget(exports);
    });
}

pub struct TestApp {
    pub server: TestServer,
    pub state: crate::state::State,
    _data: TempDir,
}

pub async fn test_app() -> TestApp {
    test_app_with(RENDERER.clone(), None).await
}

pub async fn test_app_with(renderer: Option<Arc<Renderer>>, relay: Option<String>) -> TestApp {
    test_init();

    let data = TempDir::new("dutybill").unwrap();
    let store = Store::open(JsonStore::open(data.path()).unwrap()).unwrap();

    let state = crate::state::State {
        store: Arc::new(store),
        renderer,
        mailer: Mailer {
            client: reqwest::Client::new(),
            url: relay,
            from: String::from("billing@test.local"),
        },
        for_garde: (),
    };

    let server = TestServer::new(app().with_state(state.clone())).unwrap();

    TestApp {
        server,
        state,
        _data: data,
    }
}

pub fn sample_customer() -> NewCustomer {
    NewCustomer {
        name: String::from("Acme Travels"),
        address: String::from("42 Station Road"),
        gst_no: String::from("27AAEPM1234C1ZV"),
        pan_no: String::from("AAEPM1234C"),
        city: String::from("Mumbai"),
        state: String::from("Maharashtra"),
        phone_no: String::from("+91 98200 12345"),
        email_id: String::from("accounts@acmetravels.example"),
        country: String::from("India"),
        pin_code: String::from("400001"),
    }
}

pub fn sample_invoice(customer_id: &str) -> NewInvoice {
    NewInvoice {
        invoice_number: String::from("INV-001"),
        bill_no: String::from("B-17"),
        date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        customer_id: customer_id.to_string(),
        booked_by: String::from("Front Desk"),
        guest_names: vec![GuestName {
            id: String::from("g1"),
            name: String::from("R. Sharma"),
        }],
        vehicle_no: String::from("MH 01 AB 1234"),
        address: String::from("42 Station Road"),
        detail_address: String::from("Opposite Central Mall"),
        contact_no: String::from("+91 98200 12345"),
        email_id: String::from("accounts@acmetravels.example"),
        gst_no: String::from("27AAEPM1234C1ZV"),
        pan_no: String::from("AAEPM1234C"),
        duty_from: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        duty_to: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
        kilometer: String::from("320"),
        vehicle_detail: String::from("Innova Crysta"),
        rate: 0.0,
        duty_description: String::from("Airport transfer and local duty"),
        cgst: 9.0,
        sgst: 9.0,
        items: vec![
            NewInvoiceItem {
                id: String::from("i1"),
                description: String::from("Outstation duty"),
                rate: 1000.0,
                quantity: 2.0,
            },
            NewInvoiceItem {
                id: String::from("i2"),
                description: String::from("Waiting charge"),
                rate: 500.0,
                quantity: 1.0,
            },
        ],
        signature: String::new(),
        status: InvoiceStatus::Draft,
    }
}

#[tokio::test]
async fn health() {
    let app = test_app().await;
    let router = crate::api::app().with_state(app.state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
