use crate::mailer::Mailer;
use crate::render::Renderer;
use crate::store::{JsonStore, Store};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(FromRef, Clone)]
pub struct State {
    pub store: Arc<Store>,
    pub renderer: Option<Arc<Renderer>>,
    pub mailer: Mailer,
    pub for_garde: (),
}

pub async fn new() -> State {
    dotenv::dotenv().ok();

    let path = std::env::var("STORE_PATH").unwrap_or(String::from("./data"));
    let disk = JsonStore::open(&path).expect("Failed to open store directory");
    let store = Store::open(disk).expect("Failed to load store");

    // A failed surface leaves the rest of the application running, document
    // endpoints reject until the next restart.
    let renderer = match Renderer::new() {
        Ok(renderer) => Some(Arc::new(renderer)),
        Err(e) => {
            error!("Document surface failed to initialize: {e}");
            None
        }
    };

    State {
        store: Arc::new(store),
        renderer,
        mailer: Mailer::from_env(),
        for_garde: (),
    }
}
