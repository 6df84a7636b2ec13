use std::sync::Arc;

use crate::storage::JsonlMarketStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonlMarketStore>,
    pub cors_origin: String,
}
