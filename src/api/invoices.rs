use super::ConfirmQuery;
use crate::error::Error;
use crate::models::{Invoice, NewInvoice};
use crate::store::{InvoiceFilter, Store};
use axum::extract::{Path, Query, State};
use axum::{http::StatusCode, Json};
use axum_valid::Garde;
use std::sync::Arc;

pub async fn list(
    State(store): State<Arc<Store>>,
    Query(filter): Query<InvoiceFilter>,
) -> Json<Vec<Invoice>> {
    Json(store.invoices(&filter).await)
}

pub async fn create(
    State(store): State<Arc<Store>>,
    Garde(Json(new)): Garde<Json<NewInvoice>>,
) -> (StatusCode, Json<Invoice>) {
    (StatusCode::CREATED, Json(store.add_invoice(new).await))
}

pub async fn fetch(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, Error> {
    Ok(Json(store.invoice(&id).await?))
}

pub async fn update(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
    Garde(Json(new)): Garde<Json<NewInvoice>>,
) -> Result<Json<Invoice>, Error> {
    Ok(Json(store.update_invoice(&id, new).await?))
}

pub async fn remove(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
    Query(query): Query<ConfirmQuery>,
) -> Result<StatusCode, Error> {
    if !query.confirm {
        return Err(Error::ConfirmationRequired);
    }

    store.remove_invoice(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
