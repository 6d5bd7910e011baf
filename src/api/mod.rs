//! API layer
//!
//! HTTP handlers for:
//! - The page itself (server-rendered)
//! - Staging form targets
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;
mod staging;

pub use metrics::{metrics_router, track_requests};
pub use pages::{PageView, Tab, index, render_page};
pub use staging::staging_router;
