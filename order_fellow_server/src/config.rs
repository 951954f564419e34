use std::{env, str::FromStr, time::Duration};

use log::*;
use mof_common::{parse_boolean_flag, Secret};
use order_fellow_engine::{notifications::RetryPolicy, CredentialPolicy, TransitionPolicy};

const DEFAULT_MOF_HOST: &str = "127.0.0.1";
const DEFAULT_MOF_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/order_fellow.db";
const DEFAULT_FROM_EMAIL: &str = "webmaster@localhost";
const DEFAULT_EMAIL_MAX_RETRIES: u32 = 3;
const DEFAULT_EMAIL_RETRY_DELAY_SECS: u64 = 5;
const DEFAULT_WEBHOOK_RATE_LIMIT: u32 = 10;
const DEFAULT_CREDENTIAL_LIFETIME_DAYS: i64 = 90;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub notifications: NotificationConfig,
    /// The number of webhook calls a single business account may make per minute. Zero disables the limit.
    pub webhook_rate_limit: u32,
    pub transition_policy: TransitionPolicy,
    pub credential_policy: CredentialPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MOF_HOST.to_string(),
            port: DEFAULT_MOF_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            notifications: NotificationConfig::default(),
            webhook_rate_limit: DEFAULT_WEBHOOK_RATE_LIMIT,
            transition_policy: TransitionPolicy::default(),
            credential_policy: CredentialPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MOF_HOST").ok().unwrap_or_else(|| DEFAULT_MOF_HOST.into());
        let port = env::var("MOF_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MOF_PORT. {e} Using the default, {DEFAULT_MOF_PORT}, instead."
                    );
                    DEFAULT_MOF_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MOF_PORT);
        let database_url = env::var("MOF_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MOF_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let notifications = NotificationConfig::from_env_or_defaults();
        let webhook_rate_limit = number_from_env("MOF_WEBHOOK_RATE_LIMIT", DEFAULT_WEBHOOK_RATE_LIMIT);
        if webhook_rate_limit == 0 {
            warn!("🪛️ The webhook rate limit is disabled.");
        }
        let transition_policy = if parse_boolean_flag(env::var("MOF_ALLOW_BACKWARD_TRANSITIONS").ok(), false) {
            info!("🪛️ Orders may move to any tracking status, including earlier ones.");
            TransitionPolicy::Unrestricted
        } else {
            TransitionPolicy::ForwardOnly
        };
        let lifetime_days = number_from_env("MOF_CREDENTIAL_LIFETIME_DAYS", DEFAULT_CREDENTIAL_LIFETIME_DAYS);
        let credential_policy = if lifetime_days > 0 {
            CredentialPolicy::with_lifetime_days(lifetime_days)
        } else {
            error!(
                "🪛️ MOF_CREDENTIAL_LIFETIME_DAYS must be positive. Using the default of \
                 {DEFAULT_CREDENTIAL_LIFETIME_DAYS} days."
            );
            CredentialPolicy::default()
        };
        Self {
            host,
            port,
            database_url,
            notifications,
            webhook_rate_limit,
            transition_policy,
            credential_policy,
        }
    }
}

//-------------------------------------------------  NotificationConfig  -----------------------------------------------
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EmailBackend {
    /// Write emails to the log instead of sending them.
    #[default]
    Console,
    Resend { api_key: Secret<String> },
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub from_address: String,
    pub backend: EmailBackend,
    pub retry: RetryPolicy,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            from_address: DEFAULT_FROM_EMAIL.to_string(),
            backend: EmailBackend::default(),
            retry: RetryPolicy::new(DEFAULT_EMAIL_MAX_RETRIES, Duration::from_secs(DEFAULT_EMAIL_RETRY_DELAY_SECS)),
        }
    }
}

impl NotificationConfig {
    pub fn from_env_or_defaults() -> Self {
        let from_address = env::var("MOF_DEFAULT_FROM_EMAIL").ok().unwrap_or_else(|| {
            info!("🪛️ MOF_DEFAULT_FROM_EMAIL is not set. Emails will be sent from {DEFAULT_FROM_EMAIL}.");
            DEFAULT_FROM_EMAIL.to_string()
        });
        let backend = match env::var("MOF_EMAIL_BACKEND").map(|s| s.to_lowercase()) {
            Ok(s) if s == "resend" => match env::var("MOF_RESEND_API_KEY") {
                Ok(key) if !key.trim().is_empty() => EmailBackend::Resend { api_key: Secret::new(key) },
                _ => {
                    error!(
                        "🪛️ MOF_EMAIL_BACKEND is 'resend', but MOF_RESEND_API_KEY is not set. Emails will be written \
                         to the log instead."
                    );
                    EmailBackend::Console
                },
            },
            Ok(s) if s == "console" => EmailBackend::Console,
            Ok(s) => {
                warn!("🪛️ Unknown email backend '{s}' in MOF_EMAIL_BACKEND. Using 'console'.");
                EmailBackend::Console
            },
            Err(_) => {
                info!("🪛️ MOF_EMAIL_BACKEND is not set. Emails will be written to the log.");
                EmailBackend::Console
            },
        };
        let max_retries = number_from_env("MOF_EMAIL_MAX_RETRIES", DEFAULT_EMAIL_MAX_RETRIES);
        let delay = number_from_env("MOF_EMAIL_RETRY_DELAY_SECS", DEFAULT_EMAIL_RETRY_DELAY_SECS);
        let retry = RetryPolicy::new(max_retries, Duration::from_secs(delay));
        Self { from_address, backend, retry }
    }
}

fn number_from_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default, {default}.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}
