pub mod config;
pub mod document;
pub mod error;
pub mod metrics;
pub mod payload;
pub mod server;
pub mod store;

pub use config::{ServerConfig, Settings, StoreConfig, TelemetryConfig, WriteMode};
pub use document::{Comment, Document};
pub use error::{FeedbackError, FeedbackResult, StoreError, StoreResult, ValidationError};
pub use metrics::MetricsService;
pub use server::FeedbackServer;
pub use store::DocumentStore;
