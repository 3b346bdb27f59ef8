use crate::error::Error;
use crate::export;
use crate::mailer::Mailer;
use crate::models::{Customer, Invoice};
use crate::render::{self, Renderer, Surface};
use crate::store::Store;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_valid::Garde;
use garde::Validate;
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Body for batch operations over several invoices
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[garde(length(min = 1), inner(length(bytes, min = 1, max = 64)))]
    pub invoice_ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SendReport {
    pub sent: usize,
    pub failed: Vec<BatchFailure>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExportReport {
    pub exported: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

/// A deleted customer is not an error here, the document renders with the
/// unknown-customer fallback instead.
async fn populate(store: &Store, id: &str) -> Result<(Invoice, Option<Customer>), Error> {
    let invoice = store.invoice(id).await?;
    let customer = if invoice.customer_id.is_empty() {
        None
    } else {
        store.customer(&invoice.customer_id).await.ok()
    };

    Ok((invoice, customer))
}

/// The full document as a single PNG, pages stacked vertically.
pub async fn preview(
    State(store): State<Arc<Store>>,
    Surface(renderer): Surface,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let (invoice, customer) = populate(&store, &id).await?;
    let settings = store.settings().await;

    let document = renderer.document(&invoice, customer.as_ref(), &settings)?;
    let pages = render::rasterize(&document, render::RASTER_SCALE)?;
    let png = render::preview_png(&pages)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

pub async fn pdf(
    State(store): State<Arc<Store>>,
    Surface(renderer): Surface,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let (invoice, customer) = populate(&store, &id).await?;
    let settings = store.settings().await;

    let pdf = export::pdf_bytes(&renderer, &invoice, customer.as_ref(), &settings)?;
    let disposition = format!("attachment; filename=\"{}\"", export::filename(&invoice));

    Ok((
        [
            (header::CONTENT_TYPE, String::from("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    ))
}

async fn send_one(
    store: &Store,
    mailer: &Mailer,
    renderer: &Renderer,
    id: &str,
) -> Result<(), Error> {
    let (invoice, customer) = populate(store, id).await?;
    let settings = store.settings().await;

    let pdf = export::pdf_bytes(renderer, &invoice, customer.as_ref(), &settings)?;
    mailer
        .clone()
        .send_invoice(&invoice, customer.as_ref(), pdf)
        .await
}

pub async fn email(
    State(store): State<Arc<Store>>,
    mailer: Mailer,
    Surface(renderer): Surface,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    send_one(&store, &mailer, &renderer, &id).await?;
    Ok(StatusCode::OK)
}

/// Sends the selection one invoice at a time, a single failure never aborts
/// the rest of the batch.
pub async fn email_batch(
    State(store): State<Arc<Store>>,
    mailer: Mailer,
    Surface(renderer): Surface,
    Garde(Json(selection)): Garde<Json<Selection>>,
) -> Result<Json<SendReport>, Error> {
    let mut report = SendReport {
        sent: 0,
        failed: Vec::new(),
    };

    for id in &selection.invoice_ids {
        match send_one(&store, &mailer, &renderer, id).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                error!("Sending invoice {id} failed: {e}");
                report.failed.push(BatchFailure {
                    id: id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(report))
}

async fn export_one(
    store: &Store,
    renderer: &Renderer,
    root: &std::path::Path,
    id: &str,
) -> Result<String, Error> {
    let (invoice, customer) = populate(store, id).await?;
    let settings = store.settings().await;

    let pdf = export::pdf_bytes(renderer, &invoice, customer.as_ref(), &settings)?;
    let filename = export::filename(&invoice);
    std::fs::write(root.join(&filename), pdf)?;

    Ok(filename)
}

/// Writes the selection to `EXPORT_PATH` one PDF per invoice, in selection
/// order.
pub async fn export(
    State(store): State<Arc<Store>>,
    Surface(renderer): Surface,
    Garde(Json(selection)): Garde<Json<Selection>>,
) -> Result<Json<ExportReport>, Error> {
    let root = PathBuf::from(std::env::var("EXPORT_PATH").unwrap_or(String::from("./exports")));
    std::fs::create_dir_all(&root)?;

    let mut report = ExportReport {
        exported: Vec::new(),
        failed: Vec::new(),
    };

    for id in &selection.invoice_ids {
        match export_one(&store, &renderer, &root, id).await {
            Ok(filename) => report.exported.push(filename),
            Err(e) => {
                error!("Exporting invoice {id} failed: {e}");
                report.failed.push(BatchFailure {
                    id: id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(report))
}
