use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::WebhookCredential;

pub async fn fetch_active_credential(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookCredential>, sqlx::Error> {
    let credential = sqlx::query_as("SELECT * FROM webhook_credentials WHERE account_id = $1 AND is_active = 1")
        .bind(account_id)
        .fetch_optional(conn)
        .await?;
    Ok(credential)
}

/// Inserts the account's credential, or overwrites the secret and expiry of the existing one.
pub async fn upsert_credential(
    account_id: i64,
    secret: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<WebhookCredential, sqlx::Error> {
    let credential: WebhookCredential = sqlx::query_as(
        r#"
        INSERT INTO webhook_credentials (account_id, secret, is_active, expires_at) VALUES ($1, $2, 1, $3)
        ON CONFLICT (account_id) DO UPDATE SET
            secret = excluded.secret,
            is_active = 1,
            expires_at = excluded.expires_at,
            updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(account_id)
    .bind(secret)
    .bind(expires_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Webhook credential for account #{account_id} stored. It expires at {expires_at}");
    Ok(credential)
}
