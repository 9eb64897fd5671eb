use crate::config::AppConfig;
use crate::dispatch::{dispatch, DispatchReport};
use crate::error::{json_response, ContactError};
use crate::security;
use crate::types::{ContactForm, FieldError, Lead, Provenance, SuccessResponse};
use crate::validation;
use crate::AppState;
use chrono::Utc;
use lambda_http::http::StatusCode;
use lambda_http::{Body, Error, Request, Response};
use uuid::Uuid;

pub const SUCCESS_MESSAGE: &str = "Thanks! We received your message and will be in touch soon.";

/// What happened to a submission that passed every gate
#[derive(Debug)]
pub enum Outcome {
    Accepted {
        submission_id: String,
        report: DispatchReport,
    },
    /// Honeypot filled; answered as success, nothing sent
    Discarded,
}

/// POST /api/contact
pub async fn handle_contact(event: &Request, state: &AppState) -> Result<Response<Body>, Error> {
    let origin = security::request_origin(event.headers());
    let cors_origin = security::allowed_origin(&state.config, origin.as_deref());

    let result = match submit(event, state, origin.as_deref(), cors_origin.as_deref()).await {
        Ok(outcome) => {
            if let Outcome::Accepted {
                submission_id,
                report,
            } = &outcome
            {
                tracing::info!(
                    submission_id = %submission_id,
                    all_sent = report.all_sent(),
                    "contact submission accepted"
                );
            }
            json_response(
                StatusCode::OK,
                &SuccessResponse {
                    success: true,
                    message: SUCCESS_MESSAGE.to_string(),
                },
            )
        }
        Err(e) => {
            match &e {
                ContactError::Unexpected(detail) => {
                    tracing::error!("contact submission failed: {}", detail)
                }
                other => tracing::warn!(status = other.status().as_u16(), "contact rejected: {}", other),
            }
            e.into_response()
        }
    };

    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("failed to build contact response: {}", e);
            ContactError::Unexpected(e.to_string()).into_response()?
        }
    };
    security::apply_cors(response.headers_mut(), cors_origin.as_deref(), false);
    Ok(response)
}

/// Runs the gate chain in order; the first failing gate decides the response.
pub async fn submit(
    event: &Request,
    state: &AppState,
    origin: Option<&str>,
    cors_origin: Option<&str>,
) -> Result<Outcome, ContactError> {
    let config = &state.config;

    let host = security::request_host(event).unwrap_or_default();
    if !config.host_gate.permits(&host) {
        return Err(ContactError::HostNotPermitted(host));
    }

    if cors_origin.is_none() {
        return Err(ContactError::OriginRejected(
            origin.unwrap_or("<missing>").to_string(),
        ));
    }

    let client_ip = security::client_ip(event);
    let now = Utc::now();
    let decision = state
        .limiter
        .check(&format!("contact:{}", client_ip), now)
        .await;
    if !decision.allowed {
        return Err(ContactError::RateLimited(decision));
    }

    let (form, type_errors) = parse_form(event.body())?;

    let submission =
        validation::validate_decoded(&form, type_errors).map_err(ContactError::ValidationFailed)?;

    if form.is_bot() {
        tracing::warn!(client_ip = %client_ip, "honeypot filled, discarding submission");
        return Ok(Outcome::Discarded);
    }

    let lead = Lead {
        submission,
        provenance: Provenance {
            submission_id: Uuid::new_v4().to_string(),
            client_ip,
            user_agent: security::user_agent(event),
            submitted_at: now,
        },
    };
    tracing::info!(
        submission_id = %lead.provenance.submission_id,
        client_ip = %lead.provenance.client_ip,
        "dispatching contact submission"
    );

    let report = dispatch(state, &lead).await;
    Ok(Outcome::Accepted {
        submission_id: lead.provenance.submission_id,
        report,
    })
}

/// Only a body that is not a JSON object is an `InvalidJson` error. Mistyped
/// fields come back as field errors.
pub(crate) fn parse_form(body: &[u8]) -> Result<(ContactForm, Vec<FieldError>), ContactError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ContactError::InvalidJson(e.to_string()))?;
    let serde_json::Value::Object(object) = value else {
        return Err(ContactError::InvalidJson("expected a JSON object".to_string()));
    };
    ContactForm::from_object(object).map_err(|e| ContactError::InvalidJson(e.to_string()))
}

/// OPTIONS preflight. CORS headers only for an allow-listed `Origin`.
pub fn preflight(event: &Request, config: &AppConfig) -> Result<Response<Body>, Error> {
    let origin = security::declared_origin(event.headers());
    let allowed = security::allowed_origin(config, origin.as_deref());
    if allowed.is_none() {
        tracing::debug!(origin = ?origin, "preflight from origin outside allow-list");
    }

    let mut response = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::Empty)
        .map_err(Box::new)?;
    security::apply_cors(response.headers_mut(), allowed.as_deref(), true);
    Ok(response)
}
