use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use leadgate_shared::{api, contact, AppState};
use std::sync::Arc;

/// Main Lambda handler - routes requests to the contact, quote and qualify endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path().trim_end_matches('/');
    tracing::info!("Contact Lambda invoked - Method: {} Path: {}", method, path);

    match (method, path) {
        (&Method::OPTIONS, "/api/contact" | "/api/quote" | "/api/qualify") => {
            contact::preflight(&event, &state.config)
        }
        (&Method::POST, "/api/contact") => contact::handle_contact(&event, &state).await,
        (&Method::POST, "/api/quote") => api::handle_quote(&event, &state).await,
        (&Method::POST, "/api/qualify") => api::handle_qualify(&event, &state).await,
        (_, "/api/contact" | "/api/quote" | "/api/qualify") => method_not_allowed(),
        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    }
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .header("Allow", "POST, OPTIONS")
        .body(
            serde_json::json!({"error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}
