//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("filestage_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Session Metrics
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("filestage_login_attempts_total", "Redirect logins by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref SESSION_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("filestage_session_transitions_total", "Session state transitions"),
        &["transition"]
    ).expect("metric can be created");
    pub static ref SESSION_CACHE_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("filestage_session_cache_events_total", "Local session cache reads, writes and evictions"),
        &["event"]
    ).expect("metric can be created");

    // Staging Metrics
    pub static ref STAGED_ITEMS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("filestage_staged_items", "Current number of staged items"),
        &["kind"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("filestage_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; re-registration is ignored so test
/// harnesses can build several app states in one process.
pub fn init_metrics() {
    let collectors: [(&str, Box<dyn prometheus::core::Collector>); 6] = [
        ("HTTP_REQUESTS_TOTAL", Box::new(HTTP_REQUESTS_TOTAL.clone())),
        ("LOGIN_ATTEMPTS_TOTAL", Box::new(LOGIN_ATTEMPTS_TOTAL.clone())),
        (
            "SESSION_TRANSITIONS_TOTAL",
            Box::new(SESSION_TRANSITIONS_TOTAL.clone()),
        ),
        (
            "SESSION_CACHE_EVENTS_TOTAL",
            Box::new(SESSION_CACHE_EVENTS_TOTAL.clone()),
        ),
        ("STAGED_ITEMS", Box::new(STAGED_ITEMS.clone())),
        ("ERRORS_TOTAL", Box::new(ERRORS_TOTAL.clone())),
    ];

    for (name, collector) in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(error) => tracing::warn!(metric = name, %error, "Failed to register metric"),
        }
    }

    tracing::info!("Metrics registry initialized");
}
