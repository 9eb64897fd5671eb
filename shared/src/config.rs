use chrono::Duration;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";
const DEFAULT_PERMITTED_HOSTS: &str = "localhost,127.0.0.1,[::1]";
const DEFAULT_RATE_LIMIT_MAX: u32 = 5;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: i64 = 900;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Which hosts may reach the contact endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum HostGate {
    Any,
    Only(Vec<String>),
}

impl HostGate {
    pub fn permits(&self, host: &str) -> bool {
        match self {
            HostGate::Any => true,
            HostGate::Only(hosts) => hosts.iter().any(|h| h == host),
        }
    }
}

/// Runtime settings, read from the environment once at cold start
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub admin_email: String,
    pub from_email: String,
    pub site_name: String,
    pub allowed_origins: Vec<String>,
    pub host_gate: HostGate,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub rate_limit_table: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let admin_email = get("ADMIN_EMAIL").ok_or(ConfigError::Missing("ADMIN_EMAIL"))?;
        if !crate::validation::is_valid_email(admin_email.trim()) {
            return Err(ConfigError::Invalid {
                name: "ADMIN_EMAIL",
                reason: format!("not an email address: {}", admin_email),
            });
        }

        let host_gate = match get("PERMITTED_HOSTS") {
            Some(raw) if raw.trim() == "*" => HostGate::Any,
            Some(raw) => HostGate::Only(list(&raw)),
            None => HostGate::Only(list(DEFAULT_PERMITTED_HOSTS)),
        };

        let rate_limit_max = match get("RATE_LIMIT_MAX") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                name: "RATE_LIMIT_MAX",
                reason: e.to_string(),
            })?,
            None => DEFAULT_RATE_LIMIT_MAX,
        };

        let window_secs = match get("RATE_LIMIT_WINDOW_SECS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => secs,
                Ok(secs) => {
                    return Err(ConfigError::Invalid {
                        name: "RATE_LIMIT_WINDOW_SECS",
                        reason: format!("must be positive, got {}", secs),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: "RATE_LIMIT_WINDOW_SECS",
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_RATE_LIMIT_WINDOW_SECS,
        };

        let webhook_url = get("WEBHOOK_URL");
        if let Some(raw) = &webhook_url {
            url::Url::parse(raw).map_err(|e| ConfigError::Invalid {
                name: "WEBHOOK_URL",
                reason: e.to_string(),
            })?;
        }

        Ok(Self {
            admin_email: admin_email.trim().to_string(),
            from_email: get("FROM_EMAIL").unwrap_or_else(|| "noreply@localhost".to_string()),
            site_name: get("SITE_NAME").unwrap_or_else(|| "Studio".to_string()),
            allowed_origins: list(
                &get("ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            ),
            host_gate,
            rate_limit_max,
            rate_limit_window: Duration::seconds(window_secs),
            rate_limit_table: get("RATE_LIMIT_TABLE"),
            webhook_url,
            webhook_secret: get("WEBHOOK_SECRET"),
        })
    }
}
