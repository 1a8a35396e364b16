pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod store;
pub mod telemetry;

pub use app::{api_router, app};
pub use config::AppConfig;
pub use error::{ApiError, StoreError, StoreResult};
pub use store::{SharedStore, TaskStore};
