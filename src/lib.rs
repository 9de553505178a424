pub mod aggregate;
pub mod app;
pub mod backend;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pending;
pub mod state;

pub use app::router;
pub use backend::{CheckInBackend, JsonFileBackend};
pub use config::Config;
pub use state::AppState;
