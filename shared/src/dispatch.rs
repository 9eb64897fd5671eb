//! Side effects of an accepted submission. Every outcome is logged and
//! reported; none of them changes the response the caller gets.

use crate::email::{confirmation_email, notification_email, DeliveryError};
use crate::types::{Lead, LeadRecord};
use crate::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Sent,
    Failed(String),
    Skipped,
}

impl Delivery {
    fn from_result(result: Result<(), DeliveryError>) -> Self {
        match result {
            Ok(()) => Delivery::Sent,
            Err(e) => Delivery::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub confirmation: Delivery,
    pub notification: Delivery,
    pub webhook: Delivery,
}

impl DispatchReport {
    pub fn all_sent(&self) -> bool {
        [&self.confirmation, &self.notification, &self.webhook]
            .iter()
            .all(|d| !matches!(d, Delivery::Failed(_)))
    }
}

fn log_delivery(submission_id: &str, channel: &str, delivery: &Delivery) {
    match delivery {
        Delivery::Sent => tracing::info!(submission_id, channel, "delivered"),
        Delivery::Skipped => tracing::info!(submission_id, channel, "skipped, not configured"),
        Delivery::Failed(reason) => {
            tracing::error!(submission_id, channel, reason = %reason, "delivery failed")
        }
    }
}

/// Send both emails concurrently, then post to the webhook.
pub async fn dispatch(state: &AppState, lead: &Lead) -> DispatchReport {
    let config = &state.config;
    let confirmation = confirmation_email(lead, &config.site_name);
    let notification = notification_email(lead, &config.admin_email, &config.site_name);

    let (confirmation, notification) = tokio::join!(
        state.mailer.send(&confirmation),
        state.mailer.send(&notification),
    );

    let webhook = match &state.lead_sink {
        Some(sink) => Delivery::from_result(sink.deliver(&LeadRecord::from(lead)).await),
        None => Delivery::Skipped,
    };

    let report = DispatchReport {
        confirmation: Delivery::from_result(confirmation),
        notification: Delivery::from_result(notification),
        webhook,
    };

    let id = lead.provenance.submission_id.as_str();
    log_delivery(id, "confirmation_email", &report.confirmation);
    log_delivery(id, "notification_email", &report.notification);
    log_delivery(id, "webhook", &report.webhook);
    report
}
