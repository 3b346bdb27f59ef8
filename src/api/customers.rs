use super::ConfirmQuery;
use crate::error::Error;
use crate::models::{Customer, NewCustomer};
use crate::store::Store;
use axum::extract::{Path, Query, State};
use axum::{http::StatusCode, Json};
use axum_valid::Garde;
use serde_derive::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

pub async fn list(
    State(store): State<Arc<Store>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Customer>> {
    Json(store.customers(query.search.as_deref()).await)
}

pub async fn create(
    State(store): State<Arc<Store>>,
    Garde(Json(new)): Garde<Json<NewCustomer>>,
) -> (StatusCode, Json<Customer>) {
    (StatusCode::CREATED, Json(store.add_customer(new).await))
}

pub async fn fetch(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, Error> {
    Ok(Json(store.customer(&id).await?))
}

pub async fn update(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
    Garde(Json(new)): Garde<Json<NewCustomer>>,
) -> Result<Json<Customer>, Error> {
    Ok(Json(store.update_customer(&id, new).await?))
}

/// Deleting a customer leaves their invoices in place, those render with an
/// unknown customer from then on.
pub async fn remove(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
    Query(query): Query<ConfirmQuery>,
) -> Result<StatusCode, Error> {
    if !query.confirm {
        return Err(Error::ConfirmationRequired);
    }

    store.remove_customer(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
