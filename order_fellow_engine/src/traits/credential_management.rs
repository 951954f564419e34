use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{BusinessAccount, FieldErrors, NewBusinessAccount, WebhookCredential};

#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("Business account #{0} does not exist")]
    AccountNotFound(i64),
    #[error("Invalid account data. {0}")]
    ValidationError(FieldErrors),
    #[error("Business account #{0} has not been verified")]
    AccountNotVerified(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CredentialError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                CredentialError::ValidationError(FieldErrors::single("non_field_errors", db_err.message()))
            },
            _ => CredentialError::DatabaseError(e.to_string()),
        }
    }
}

/// Storage behaviour for business accounts and their webhook credentials.
///
/// There is at most one credential per account. Regenerating a credential replaces the secret and expiry of that
/// record in place.
#[allow(async_fn_in_trait)]
pub trait CredentialManagement: Clone {
    async fn create_account(&self, account: NewBusinessAccount) -> Result<BusinessAccount, CredentialError>;

    async fn fetch_account(&self, account_id: i64) -> Result<Option<BusinessAccount>, CredentialError>;

    /// Looks up an account by its email address. The comparison is case-insensitive.
    async fn fetch_account_by_email(&self, email: &str) -> Result<Option<BusinessAccount>, CredentialError>;

    async fn set_verification_status(
        &self,
        account_id: i64,
        is_active: bool,
        kyc_approved: bool,
    ) -> Result<BusinessAccount, CredentialError>;

    /// Returns the account's credential if it exists and is active. Expired credentials are still returned.
    async fn fetch_active_credential(&self, account_id: i64) -> Result<Option<WebhookCredential>, CredentialError>;

    /// Creates the account's credential, or replaces the secret and expiry of the existing one, and marks it active.
    async fn store_credential(
        &self,
        account_id: i64,
        secret: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<WebhookCredential, CredentialError>;
}

/// Answers whether a principal may use the order management routes.
#[allow(async_fn_in_trait)]
pub trait CallerVerification {
    async fn is_verified_caller(&self, account_id: i64) -> Result<bool, CredentialError>;
}
