pub mod api;
pub mod config;
pub mod contact;
pub mod dispatch;
pub mod email;
pub mod error;
pub mod quote;
pub mod rate_limit;
pub mod sanitize;
pub mod security;
pub mod types;
pub mod validation;
pub mod webhook;
pub mod wizard;

use config::AppConfig;
use email::Mailer;
use rate_limit::{KeyValueStore, SlidingWindowLimiter};
use std::sync::Arc;
use webhook::LeadSink;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub mailer: Arc<dyn Mailer>,
    pub lead_sink: Option<Arc<dyn LeadSink>>,
    pub limiter: SlidingWindowLimiter,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        mailer: Arc<dyn Mailer>,
        lead_sink: Option<Arc<dyn LeadSink>>,
        rate_limit_store: Arc<dyn KeyValueStore>,
    ) -> Arc<Self> {
        let limiter = SlidingWindowLimiter::new(
            rate_limit_store,
            config.rate_limit_max,
            config.rate_limit_window,
        );
        Arc::new(Self {
            config,
            mailer,
            lead_sink,
            limiter,
        })
    }
}
