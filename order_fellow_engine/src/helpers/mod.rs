mod webhook_secret;

pub use webhook_secret::{generate_webhook_secret, secrets_match, WEBHOOK_SECRET_PREFIX};
