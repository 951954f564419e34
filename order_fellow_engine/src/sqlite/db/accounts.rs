use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{BusinessAccount, NewBusinessAccount};

pub async fn insert_account(
    account: NewBusinessAccount,
    conn: &mut SqliteConnection,
) -> Result<BusinessAccount, sqlx::Error> {
    let account: BusinessAccount =
        sqlx::query_as("INSERT INTO business_accounts (email, username) VALUES ($1, $2) RETURNING *")
            .bind(account.email.as_str())
            .bind(account.username)
            .fetch_one(conn)
            .await?;
    debug!("🗃️ Business account #{} created for {}", account.id, account.email);
    Ok(account)
}

pub async fn fetch_account_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<BusinessAccount>, sqlx::Error> {
    let account = sqlx::query_as("SELECT * FROM business_accounts WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(account)
}

/// The `email` column is declared `COLLATE NOCASE`, so this lookup ignores case.
pub async fn fetch_account_by_email(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<BusinessAccount>, sqlx::Error> {
    let account = sqlx::query_as("SELECT * FROM business_accounts WHERE email = $1")
        .bind(email.trim())
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn set_verification_status(
    id: i64,
    is_active: bool,
    kyc_approved: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<BusinessAccount>, sqlx::Error> {
    let account = sqlx::query_as(
        "UPDATE business_accounts SET is_active = $1, kyc_approved = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3 \
         RETURNING *",
    )
    .bind(is_active)
    .bind(kyc_approved)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(account)
}
