use crate::rate_limit::RateLimitDecision;
use crate::types::{ErrorResponse, FieldError};
use lambda_http::http::{HeaderValue, StatusCode};
use lambda_http::{Body, Error, Response};

/// Reasons a contact submission is turned away before any side effect runs
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("host not permitted: {0}")]
    HostNotPermitted(String),
    #[error("origin rejected: {0}")]
    OriginRejected(String),
    #[error("rate limit exceeded")]
    RateLimited(RateLimitDecision),
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("validation failed on {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldError>),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ContactError {
    pub fn status(&self) -> StatusCode {
        match self {
            ContactError::HostNotPermitted(_) => StatusCode::NOT_FOUND,
            ContactError::OriginRejected(_) => StatusCode::FORBIDDEN,
            ContactError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ContactError::InvalidJson(_) | ContactError::ValidationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            ContactError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        let (error, message, errors) = match self {
            ContactError::HostNotPermitted(_) => ("NotFound", "Not found".to_string(), None),
            ContactError::OriginRejected(_) => (
                "Forbidden",
                "Request origin is not allowed".to_string(),
                None,
            ),
            ContactError::RateLimited(d) => (
                "TooManyRequests",
                format!(
                    "Too many submissions. Please try again in {} seconds.",
                    d.retry_after_secs
                ),
                None,
            ),
            ContactError::InvalidJson(e) => {
                ("InvalidJson", format!("Invalid request body: {}", e), None)
            }
            ContactError::ValidationFailed(fields) => (
                "ValidationFailed",
                "Some fields are missing or invalid".to_string(),
                Some(fields.clone()),
            ),
            // Details stay in the logs.
            ContactError::Unexpected(_) => (
                "InternalError",
                "Something went wrong. Please try again later.".to_string(),
                None,
            ),
        };
        ErrorResponse {
            error: error.to_string(),
            message,
            errors,
        }
    }

    /// JSON error response, with rate-limit headers when throttled.
    pub fn into_response(self) -> Result<Response<Body>, Error> {
        let mut response = json_response(self.status(), &self.body())?;
        if let ContactError::RateLimited(decision) = &self {
            rate_limit_headers(response.headers_mut(), decision);
        }
        Ok(response)
    }
}

pub fn rate_limit_headers(headers: &mut lambda_http::http::HeaderMap, d: &RateLimitDecision) {
    let pairs = [
        ("x-ratelimit-limit", d.limit.to_string()),
        ("x-ratelimit-remaining", d.remaining.to_string()),
        ("x-ratelimit-reset", d.reset_at.timestamp().to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(v) = HeaderValue::from_str(&value) {
            headers.insert(name, v);
        }
    }
    if !d.allowed {
        if let Ok(v) = HeaderValue::from_str(&d.retry_after_secs.to_string()) {
            headers.insert(lambda_http::http::header::RETRY_AFTER, v);
        }
    }
}

pub fn json_response<T: serde::Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(body)?.into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn text(response: &Response<Body>) -> String {
        match response.body() {
            Body::Text(t) => t.clone(),
            Body::Binary(b) => String::from_utf8_lossy(b).to_string(),
            Body::Empty => String::new(),
        }
    }

    #[test]
    fn statuses() {
        assert_eq!(
            ContactError::HostNotPermitted("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ContactError::OriginRejected("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ContactError::InvalidJson("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn throttled_response_has_headers() {
        let reset_at: DateTime<Utc> = DateTime::from_timestamp(1_760_000_900, 0).unwrap();
        let response = ContactError::RateLimited(RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_at,
            retry_after_secs: 42,
        })
        .into_response()
        .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "42");
        assert_eq!(response.headers()["x-ratelimit-limit"], "5");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["x-ratelimit-reset"], "1760000900");
    }

    #[test]
    fn unexpected_hides_details() {
        let response = ContactError::Unexpected("db password leaked".into())
            .into_response()
            .unwrap();
        assert!(!text(&response).contains("password"));
    }

    #[test]
    fn validation_lists_fields() {
        let response =
            ContactError::ValidationFailed(vec![FieldError::new("email", "Enter a valid email")])
                .into_response()
                .unwrap();
        let json: serde_json::Value = serde_json::from_str(&text(&response)).unwrap();
        assert_eq!(json["errors"][0]["field"], "email");
        assert_eq!(json["error"], "ValidationFailed");
    }
}
