use crate::config::AppConfig;
use lambda_http::http::{header, HeaderMap, HeaderValue};
use lambda_http::request::RequestContext;
use lambda_http::{Request, RequestExt};

pub const ALLOW_METHODS: &str = "POST,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";
pub const PREFLIGHT_MAX_AGE: &str = "86400";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Host without port, lower-cased. Bracketed IPv6 literals keep their brackets.
pub fn request_host(request: &Request) -> Option<String> {
    let raw = header_str(request.headers(), "host")
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string))?;
    let host = if raw.starts_with('[') {
        match raw.find(']') {
            Some(end) => raw[..=end].to_string(),
            None => raw,
        }
    } else {
        raw.split(':').next().unwrap_or_default().to_string()
    };
    Some(host.to_ascii_lowercase())
}

/// `scheme://host[:port]` of a URL, the same shape browsers send in `Origin`.
fn origin_of(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    match parsed.origin() {
        url::Origin::Tuple(..) => Some(parsed.origin().ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

/// The `Origin` header as sent. An opaque `null` origin counts as absent.
pub fn declared_origin(headers: &HeaderMap) -> Option<String> {
    match header_str(headers, "origin") {
        Some("null") | None => None,
        Some(origin) => Some(origin.to_string()),
    }
}

/// The caller's origin: `Origin` when sent, otherwise the origin of `Referer`.
pub fn request_origin(headers: &HeaderMap) -> Option<String> {
    if headers.contains_key("origin") {
        declared_origin(headers)
    } else {
        header_str(headers, "referer").and_then(origin_of)
    }
}

/// Exact match against the configured allow-list.
pub fn allowed_origin(config: &AppConfig, origin: Option<&str>) -> Option<String> {
    let origin = origin?;
    config
        .allowed_origins
        .iter()
        .find(|allowed| allowed.as_str() == origin)
        .cloned()
}

/// Client IP: first `X-Forwarded-For` hop, then `X-Real-IP`, then the API
/// Gateway source IP.
pub fn client_ip(request: &Request) -> String {
    let headers = request.headers();
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_string();
        }
    }
    if let Some(real) = header_str(headers, "x-real-ip") {
        return real.to_string();
    }
    match request.request_context_ref() {
        Some(RequestContext::ApiGatewayV2(ctx)) => ctx
            .http
            .source_ip
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        _ => "unknown".to_string(),
    }
}

pub fn user_agent(request: &Request) -> String {
    header_str(request.headers(), "user-agent")
        .unwrap_or("unknown")
        .chars()
        .take(512)
        .collect()
}

/// CORS headers for an allowed origin. Nothing is added otherwise.
pub fn apply_cors(headers: &mut HeaderMap, origin: Option<&str>, preflight: bool) {
    let Some(origin) = origin.and_then(|o| HeaderValue::from_str(o).ok()) else {
        return;
    };
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    if preflight {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::Body;

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = lambda_http::http::Request::builder().uri("/api/contact");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::Empty).unwrap()
    }

    fn config(origins: &[&str]) -> AppConfig {
        let joined = origins.join(",");
        AppConfig::from_lookup(move |key| match key {
            "ADMIN_EMAIL" => Some("team@studio.dev".to_string()),
            "ALLOWED_ORIGINS" => Some(joined.clone()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn host_strips_port() {
        assert_eq!(
            request_host(&request(&[("host", "LocalHost:3000")])).as_deref(),
            Some("localhost")
        );
        assert_eq!(
            request_host(&request(&[("host", "[::1]:8080")])).as_deref(),
            Some("[::1]")
        );
        assert_eq!(request_host(&request(&[])), None);
    }

    #[test]
    fn origin_falls_back_to_referer() {
        let req = request(&[("referer", "https://studio.dev/contact?step=2")]);
        assert_eq!(
            request_origin(req.headers()).as_deref(),
            Some("https://studio.dev")
        );
        let req = request(&[("origin", "null")]);
        assert_eq!(request_origin(req.headers()), None);
    }

    #[test]
    fn origin_match_is_exact() {
        let cfg = config(&["https://studio.dev"]);
        assert!(allowed_origin(&cfg, Some("https://studio.dev")).is_some());
        assert!(allowed_origin(&cfg, Some("https://studio.dev.evil.com")).is_none());
        assert!(allowed_origin(&cfg, Some("http://studio.dev")).is_none());
        assert!(allowed_origin(&cfg, None).is_none());
    }

    #[test]
    fn request_origin_is_not_normalized() {
        let cfg = config(&["https://Studio.dev/"]);
        let req = request(&[("origin", "HTTPS://Studio.dev/")]);
        let origin = declared_origin(req.headers());
        assert_eq!(origin.as_deref(), Some("HTTPS://Studio.dev/"));
        assert!(allowed_origin(&cfg, origin.as_deref()).is_none());

        let req = request(&[("origin", "https://studio.dev")]);
        assert_eq!(
            allowed_origin(&cfg, declared_origin(req.headers()).as_deref()).as_deref(),
            Some("https://studio.dev")
        );
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let req = request(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_ip(&req), "203.0.113.7");
        assert_eq!(client_ip(&request(&[("x-real-ip", "10.0.0.2")])), "10.0.0.2");
        assert_eq!(client_ip(&request(&[])), "unknown");
    }

    #[test]
    fn cors_only_for_allowed_origin() {
        let mut headers = HeaderMap::new();
        apply_cors(&mut headers, None, true);
        assert!(headers.is_empty());

        apply_cors(&mut headers, Some("https://studio.dev"), true);
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://studio.dev"
        );
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }
}
