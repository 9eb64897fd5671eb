use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sesv2::Client as SesClient;
use lambda_http::{run, service_fn, tracing, Error, Request};
use leadgate_shared::config::AppConfig;
use leadgate_shared::email::SesMailer;
use leadgate_shared::rate_limit::{DynamoStore, KeyValueStore, MemoryStore};
use leadgate_shared::webhook::{LeadSink, WebhookSink};
use leadgate_shared::AppState;
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = AppConfig::from_env()?;

    // Initialize AWS clients once at startup
    let aws_config = aws_config::load_from_env().await;

    let mailer = Arc::new(SesMailer::new(
        SesClient::new(&aws_config),
        config.from_email.clone(),
    ));

    // Without a table the limiter only sees hits that land on this instance.
    let store: Arc<dyn KeyValueStore> = match &config.rate_limit_table {
        Some(table) => Arc::new(DynamoStore::new(DynamoClient::new(&aws_config), table)),
        None => {
            tracing::warn!("RATE_LIMIT_TABLE not set, using in-memory rate limiting");
            Arc::new(MemoryStore::new())
        }
    };

    let lead_sink: Option<Arc<dyn LeadSink>> = match &config.webhook_url {
        Some(url) => Some(Arc::new(WebhookSink::new(
            url.clone(),
            config.webhook_secret.clone(),
        )?)),
        None => None,
    };

    tracing::info!(
        allowed_origins = ?config.allowed_origins,
        host_gate = ?config.host_gate,
        rate_limit_max = config.rate_limit_max,
        webhook = lead_sink.is_some(),
        "contact lambda configured"
    );

    let state = AppState::new(config, mailer, lead_sink, store);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
