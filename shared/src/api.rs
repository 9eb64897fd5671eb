//! Small JSON endpoints behind the admin quote generator and the
//! qualification page.

use crate::error::json_response;
use crate::quote::{self, QuoteRequest};
use crate::security;
use crate::types::ErrorResponse;
use crate::wizard::{self, QualificationInput};
use crate::AppState;
use lambda_http::http::StatusCode;
use lambda_http::{Body, Error, Request, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct QualifyRequest {
    #[serde(default)]
    inputs: Vec<QualificationInput>,
}

#[derive(Debug, Serialize)]
struct QualifyResponse {
    state: wizard::QualificationState,
    terminal: bool,
}

fn error(status: StatusCode, error: &str, message: String) -> Result<Response<Body>, Error> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            message,
            errors: None,
        },
    )
}

/// Origin gate shared by both endpoints.
fn checked_origin(event: &Request, state: &AppState) -> Option<String> {
    let origin = security::request_origin(event.headers());
    let allowed = security::allowed_origin(&state.config, origin.as_deref());
    if allowed.is_none() {
        tracing::warn!(origin = ?origin, "rejected request from origin outside allow-list");
    }
    allowed
}

fn forbidden() -> Result<Response<Body>, Error> {
    error(
        StatusCode::FORBIDDEN,
        "Forbidden",
        "Request origin is not allowed".to_string(),
    )
}

/// POST /api/quote
pub async fn handle_quote(event: &Request, state: &AppState) -> Result<Response<Body>, Error> {
    let Some(origin) = checked_origin(event, state) else {
        return forbidden();
    };

    let mut response = match serde_json::from_slice::<QuoteRequest>(event.body()) {
        Ok(request) => {
            let totals = quote::calculate(&request.line_items, request.discount);
            tracing::info!(
                lines = request.line_items.len(),
                total = totals.total,
                "quote calculated"
            );
            json_response(StatusCode::OK, &totals.rounded())?
        }
        Err(e) => error(
            StatusCode::BAD_REQUEST,
            "InvalidJson",
            format!("Invalid request body: {}", e),
        )?,
    };
    security::apply_cors(response.headers_mut(), Some(&origin), false);
    Ok(response)
}

/// POST /api/qualify: replays the given inputs from the first step.
pub async fn handle_qualify(event: &Request, state: &AppState) -> Result<Response<Body>, Error> {
    let Some(origin) = checked_origin(event, state) else {
        return forbidden();
    };

    let mut response = match serde_json::from_slice::<QualifyRequest>(event.body()) {
        Ok(request) => match wizard::replay(&request.inputs) {
            Ok(state) => json_response(
                StatusCode::OK,
                &QualifyResponse {
                    terminal: state.is_terminal(),
                    state,
                },
            )?,
            Err(e) => error(StatusCode::BAD_REQUEST, "InvalidTransition", e.to_string())?,
        },
        Err(e) => error(
            StatusCode::BAD_REQUEST,
            "InvalidJson",
            format!("Invalid request body: {}", e),
        )?,
    };
    security::apply_cors(response.headers_mut(), Some(&origin), false);
    Ok(response)
}
