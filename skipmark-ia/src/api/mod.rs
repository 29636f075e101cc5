//! HTTP API handlers for skipmark-ia

pub mod analysis;
pub mod health;
pub mod settings;
pub mod sse;

pub use analysis::analysis_routes;
pub use health::health_routes;
pub use settings::settings_routes;
pub use sse::event_stream;
