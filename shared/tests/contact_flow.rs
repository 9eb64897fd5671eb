use async_trait::async_trait;
use lambda_http::http::StatusCode;
use lambda_http::{Body, Request, Response};
use leadgate_shared::config::AppConfig;
use leadgate_shared::contact::{handle_contact, preflight, submit, Outcome, SUCCESS_MESSAGE};
use leadgate_shared::dispatch::Delivery;
use leadgate_shared::email::{DeliveryError, Mailer, OutboundEmail};
use leadgate_shared::rate_limit::MemoryStore;
use leadgate_shared::types::LeadRecord;
use leadgate_shared::webhook::LeadSink;
use leadgate_shared::api::handle_quote;
use leadgate_shared::AppState;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const ORIGIN: &str = "https://studio.dev";

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    fail_for: Option<String>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError> {
        if self.fail_for.as_deref() == Some(email.to.as_str()) {
            return Err(DeliveryError::Provider("mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<LeadRecord>>,
    fail: bool,
}

#[async_trait]
impl LeadSink for RecordingSink {
    async fn deliver(&self, record: &LeadRecord) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Status(502));
        }
        self.delivered.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct Harness {
    state: Arc<AppState>,
    mailer: Arc<RecordingMailer>,
    sink: Arc<RecordingSink>,
}

fn config(rate_limit_max: &str) -> AppConfig {
    let max = rate_limit_max.to_string();
    AppConfig::from_lookup(move |key| match key {
        "ADMIN_EMAIL" => Some("team@studio.dev".to_string()),
        "ALLOWED_ORIGINS" => Some(format!("{},http://localhost:3000", ORIGIN)),
        "RATE_LIMIT_MAX" => Some(max.clone()),
        "RATE_LIMIT_WINDOW_SECS" => Some("900".to_string()),
        "SITE_NAME" => Some("Studio".to_string()),
        _ => None,
    })
    .unwrap()
}

fn harness_with(mailer: RecordingMailer, sink: RecordingSink, rate_limit_max: &str) -> Harness {
    let mailer = Arc::new(mailer);
    let sink = Arc::new(sink);
    let state = AppState::new(
        config(rate_limit_max),
        mailer.clone(),
        Some(sink.clone()),
        Arc::new(MemoryStore::new()),
    );
    Harness {
        state,
        mailer,
        sink,
    }
}

fn harness() -> Harness {
    harness_with(RecordingMailer::default(), RecordingSink::default(), "5")
}

fn valid_payload() -> Value {
    json!({
        "fullName": "Ada Lovelace",
        "email": "ada@example.com",
        "whatsapp": "+44 20 7946 0958",
        "company": "Analytical Engines",
        "role": "Founder",
        "websiteUrl": "https://engines.example.com",
        "companySize": "2-10",
        "industry": "saas",
        "need": ["website", "seo"],
        "summary": "We need a marketing site before our launch in spring.",
        "heardFrom": "referral",
        "acceptTerms": true,
        "honeypot": ""
    })
}

fn post(body: &str, ip: &str) -> Request {
    lambda_http::http::Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header("host", "localhost:3000")
        .header("origin", ORIGIN)
        .header("x-forwarded-for", ip)
        .header("user-agent", "integration-test")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(payload: &Value) -> Request {
    post(&payload.to_string(), "203.0.113.10")
}

fn json_body(response: &Response<Body>) -> Value {
    match response.body() {
        Body::Text(text) => serde_json::from_str(text).unwrap(),
        Body::Binary(bytes) => serde_json::from_slice(bytes).unwrap(),
        Body::Empty => Value::Null,
    }
}

fn error_fields(response: &Response<Body>) -> Vec<String> {
    json_body(response)["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| e["field"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn valid_submission_fans_out() {
    let h = harness();
    let response = handle_contact(&post_json(&valid_payload()), &h.state)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(&response)["message"], SUCCESS_MESSAGE);
    assert_eq!(response.headers()["access-control-allow-origin"], ORIGIN);

    let sent = h.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|e| e.to == "ada@example.com"));
    let admin = sent.iter().find(|e| e.to == "team@studio.dev").unwrap();
    assert_eq!(admin.reply_to.as_deref(), Some("ada@example.com"));
    assert!(admin.text.contains("Industry: SaaS / Technology"));

    let delivered = h.sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    let record = &delivered[0];
    assert_eq!(record.client_ip, "203.0.113.10");
    assert_eq!(record.user_agent, "integration-test");
    assert_eq!(record.company_size.label, "2-10 employees");
    assert_eq!(record.need.len(), 2);
    assert_eq!(record.heard_from.code, "referral");
}

#[tokio::test]
async fn honeypot_is_silently_discarded() {
    let h = harness();
    let mut payload = valid_payload();
    payload["honeypot"] = json!("https://cheap-seo.example");

    let response = handle_contact(&post_json(&payload), &h.state).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(&response)["message"], SUCCESS_MESSAGE);
    assert!(h.mailer.sent.lock().unwrap().is_empty());
    assert!(h.sink.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_required_fields_are_named() {
    for field in [
        "fullName",
        "email",
        "whatsapp",
        "company",
        "role",
        "websiteUrl",
        "companySize",
        "industry",
        "need",
        "summary",
        "heardFrom",
        "acceptTerms",
    ] {
        let h = harness();
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove(field);

        let response = handle_contact(&post_json(&payload), &h.state).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", field);
        assert_eq!(error_fields(&response), vec![field.to_string()]);
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn terms_must_be_accepted() {
    let h = harness();
    let mut payload = valid_payload();
    payload["acceptTerms"] = json!(false);

    let response = handle_contact(&post_json(&payload), &h.state).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response), vec!["acceptTerms".to_string()]);
    assert_eq!(json_body(&response)["error"], "ValidationFailed");
}

#[tokio::test]
async fn mistyped_fields_are_field_errors() {
    let h = harness();
    let mut payload = valid_payload();
    payload["acceptTerms"] = json!("yes");

    let response = handle_contact(&post_json(&payload), &h.state).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&response)["error"], "ValidationFailed");
    assert_eq!(error_fields(&response), vec!["acceptTerms".to_string()]);

    let mut payload = valid_payload();
    payload["fullName"] = json!(42);
    payload["need"] = json!([1]);
    let response = handle_contact(&post_json(&payload), &h.state).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_fields(&response),
        vec!["fullName".to_string(), "need".to_string()]
    );
    assert!(h.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_string_honeypot_is_discarded() {
    let h = harness();
    let mut payload = valid_payload();
    payload["honeypot"] = json!(1);

    let response = handle_contact(&post_json(&payload), &h.state).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(&response)["message"], SUCCESS_MESSAGE);
    assert!(h.mailer.sent.lock().unwrap().is_empty());
    assert!(h.sink.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn quote_treats_null_cells_as_zero() {
    let h = harness();
    let body = json!({
        "lineItems": [
            {"description": "Design", "quantity": 2, "rate": 100, "tax": 10},
            {"description": "Blank row", "quantity": null, "rate": 75, "tax": null}
        ],
        "discount": null
    });
    let request = lambda_http::http::Request::builder()
        .method("POST")
        .uri("/api/quote")
        .header("host", "localhost:3000")
        .header("origin", ORIGIN)
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = handle_quote(&request, &h.state).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let totals = json_body(&response);
    assert_eq!(totals["subtotal"], json!(200.0));
    assert_eq!(totals["discountAmount"], json!(0.0));
    assert_eq!(totals["taxAmount"], json!(20.0));
    assert_eq!(totals["total"], json!(220.0));
    assert_eq!(totals["lines"][1]["amount"], json!(0.0));
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let h = harness();
    let response = handle_contact(&post("{\"fullName\":", "203.0.113.10"), &h.state)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&response)["error"], "InvalidJson");
}

#[tokio::test]
async fn request_over_the_limit_is_throttled() {
    let h = harness_with(RecordingMailer::default(), RecordingSink::default(), "3");
    let body = valid_payload().to_string();

    for _ in 0..3 {
        let response = handle_contact(&post(&body, "198.51.100.1"), &h.state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = handle_contact(&post(&body, "198.51.100.1"), &h.state)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let headers = response.headers();
    assert!(headers.contains_key("retry-after"));
    assert_eq!(headers["x-ratelimit-limit"], "3");
    assert_eq!(headers["x-ratelimit-remaining"], "0");
    assert!(headers.contains_key("x-ratelimit-reset"));

    // a different client is unaffected
    let response = handle_contact(&post(&body, "198.51.100.2"), &h.state)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn throttling_happens_before_parsing() {
    let h = harness_with(RecordingMailer::default(), RecordingSink::default(), "1");
    let first = handle_contact(&post("not json", "198.51.100.9"), &h.state)
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);
    let second = handle_contact(&post("not json", "198.51.100.9"), &h.state)
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn foreign_host_is_not_found() {
    let h = harness();
    let mut request = post_json(&valid_payload());
    request
        .headers_mut()
        .insert("host", "studio.dev".parse().unwrap());

    let response = handle_contact(&request, &h.state).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(h.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn untrusted_or_missing_origin_is_forbidden() {
    let h = harness();

    let mut request = post_json(&valid_payload());
    request
        .headers_mut()
        .insert("origin", "https://evil.example".parse().unwrap());
    let response = handle_contact(&request, &h.state).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!response
        .headers()
        .contains_key("access-control-allow-origin"));

    let mut request = post_json(&valid_payload());
    request.headers_mut().remove("origin");
    let response = handle_contact(&request, &h.state).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // a same-site referer stands in for a missing Origin
    let mut request = post_json(&valid_payload());
    request.headers_mut().remove("origin");
    request
        .headers_mut()
        .insert("referer", "https://studio.dev/contact".parse().unwrap());
    let response = handle_contact(&request, &h.state).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn downstream_failures_do_not_fail_the_request() {
    let h = harness_with(
        RecordingMailer {
            fail_for: Some("team@studio.dev".to_string()),
            ..Default::default()
        },
        RecordingSink {
            fail: true,
            ..Default::default()
        },
        "5",
    );

    let outcome = submit(
        &post_json(&valid_payload()),
        &h.state,
        Some(ORIGIN),
        Some(ORIGIN),
    )
    .await
    .unwrap();

    match outcome {
        Outcome::Accepted { report, .. } => {
            assert_eq!(report.confirmation, Delivery::Sent);
            assert!(matches!(report.notification, Delivery::Failed(_)));
            assert!(matches!(report.webhook, Delivery::Failed(_)));
            assert!(!report.all_sent());
        }
        Outcome::Discarded => panic!("valid submission was discarded"),
    }

    let response = handle_contact(&post(&valid_payload().to_string(), "192.0.2.55"), &h.state)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    // the confirmation still went out both times
    assert_eq!(h.mailer.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn webhook_is_skipped_when_not_configured() {
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(config("5"), mailer.clone(), None, Arc::new(MemoryStore::new()));

    let outcome = submit(&post_json(&valid_payload()), &state, Some(ORIGIN), Some(ORIGIN))
        .await
        .unwrap();
    match outcome {
        Outcome::Accepted { report, .. } => {
            assert_eq!(report.webhook, Delivery::Skipped);
            assert!(report.all_sent());
        }
        Outcome::Discarded => panic!("valid submission was discarded"),
    }
    assert_eq!(mailer.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn inputs_are_sanitized_before_fan_out() {
    let h = harness();
    let mut payload = valid_payload();
    payload["fullName"] = json!("  Ada\t\tLovelace  ");
    payload["email"] = json!(" ADA@Example.com ");
    payload["websiteUrl"] = json!("engines.example.com");
    payload["summary"] = json!("  <img src=x onerror=alert(1)> please\r\n\r\n\r\nbuild it  ");

    let response = handle_contact(&post_json(&payload), &h.state).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let delivered = h.sink.delivered.lock().unwrap();
    let record = &delivered[0];
    assert_eq!(record.full_name, "Ada Lovelace");
    assert_eq!(record.email, "ada@example.com");
    assert_eq!(
        record.website_url.as_deref(),
        Some("https://engines.example.com")
    );
    assert_eq!(
        record.summary,
        "<img src=x onerror=alert(1)> please\n\nbuild it"
    );

    let sent = h.mailer.sent.lock().unwrap();
    let admin = sent.iter().find(|e| e.to == "team@studio.dev").unwrap();
    assert!(!admin.html.contains("<img"));
}

fn options(origin: Option<&str>) -> Request {
    let mut builder = lambda_http::http::Request::builder()
        .method("OPTIONS")
        .uri("/api/contact")
        .header("access-control-request-method", "POST");
    if let Some(origin) = origin {
        builder = builder.header("origin", origin);
    }
    builder.body(Body::Empty).unwrap()
}

#[test]
fn preflight_echoes_only_allow_listed_origins() {
    let cfg = config("5");

    let response = preflight(&options(Some(ORIGIN)), &cfg).unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], ORIGIN);
    assert!(response
        .headers()
        .contains_key("access-control-allow-methods"));

    for origin in [
        Some("https://evil.example"),
        Some("https://studio.dev.evil.example"),
        Some("http://studio.dev"),
        None,
    ] {
        let response = preflight(&options(origin), &cfg).unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(
            !response
                .headers()
                .contains_key("access-control-allow-origin"),
            "{:?}",
            origin
        );
    }
}
