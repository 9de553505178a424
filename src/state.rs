use crate::backend::CheckInBackend;
use crate::config::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn CheckInBackend>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(backend: Arc<dyn CheckInBackend>, config: Config) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }
}
