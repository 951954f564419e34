use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use mof_common::EmailAddress;

use crate::{
    db_types::{BusinessAccount, FieldErrors, NewBusinessAccount, Principal, WebhookCredential},
    helpers::{generate_webhook_secret, secrets_match},
    ofe_api::errors::SignatureError,
    traits::{CallerVerification, CredentialError, CredentialManagement},
};

/// The header carrying the caller's webhook secret.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
/// The header naming the business account (by email) that the caller claims to be.
pub const ACCOUNT_HEADER: &str = "X-Customer-Email";

// Compared against when there is no real secret, so that unknown accounts take as long to reject as wrong secrets.
const DUMMY_SECRET: &str = "whsk_0000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy)]
pub struct CredentialPolicy {
    /// How long a newly issued webhook secret stays valid.
    pub lifetime: Duration,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self { lifetime: Duration::days(90) }
    }
}

impl CredentialPolicy {
    pub fn with_lifetime_days(days: i64) -> Self {
        Self { lifetime: Duration::days(days) }
    }
}

/// Manages business accounts and their webhook credentials, and authenticates webhook callers.
pub struct CredentialApi<B> {
    db: B,
    policy: CredentialPolicy,
}

impl<B> Debug for CredentialApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialApi ({:?})", self.policy)
    }
}

impl<B: Clone> Clone for CredentialApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), policy: self.policy }
    }
}

impl<B> CredentialApi<B> {
    pub fn new(db: B, policy: CredentialPolicy) -> Self {
        Self { db, policy }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CredentialApi<B>
where B: CredentialManagement
{
    /// Creates a new business account. It is inactive and unverified until [`Self::approve_verification`] is called.
    pub async fn register_account(&self, email: &str, username: &str) -> Result<BusinessAccount, CredentialError> {
        let mut errors = FieldErrors::new();
        let email = EmailAddress::parse(email).map_err(|e| errors.add("email", e.to_string())).ok();
        let username = username.trim();
        if username.is_empty() {
            errors.add("username", "This field may not be blank.");
        }
        let email = match email {
            Some(email) if errors.is_empty() => email,
            _ => return Err(CredentialError::ValidationError(errors)),
        };
        let account = self.db.create_account(NewBusinessAccount { email, username: username.to_string() }).await?;
        info!("🔐️ Business account #{} registered for {}", account.id, account.email);
        Ok(account)
    }

    /// Marks the account active and KYC-approved.
    pub async fn approve_verification(&self, account_id: i64) -> Result<BusinessAccount, CredentialError> {
        let account = self.db.set_verification_status(account_id, true, true).await?;
        info!("🔐️ Business account #{account_id} has been verified");
        Ok(account)
    }

    /// Returns the account's current credential. A new one is issued if the account has none, or if it has expired.
    ///
    /// Only verified accounts receive credentials.
    pub async fn fetch_or_issue_credential(&self, account_id: i64) -> Result<WebhookCredential, CredentialError> {
        self.ensure_verified(account_id).await?;
        match self.db.fetch_active_credential(account_id).await? {
            Some(credential) if !credential.is_expired() => Ok(credential),
            Some(_) => {
                debug!("🔐️ Webhook secret for account #{account_id} has expired. Issuing a new one.");
                self.issue_credential(account_id).await
            },
            None => self.issue_credential(account_id).await,
        }
    }

    /// Replaces the account's webhook secret with a fresh one, whether or not the old one has expired.
    pub async fn regenerate_credential(&self, account_id: i64) -> Result<WebhookCredential, CredentialError> {
        self.ensure_verified(account_id).await?;
        self.issue_credential(account_id).await
    }

    /// Authenticates a webhook caller from the contents of the [`ACCOUNT_HEADER`] and [`SIGNATURE_HEADER`] headers.
    ///
    /// A wrong secret is always reported as [`SignatureError::SignatureMismatch`], even if the stored one has expired.
    /// This call never modifies stored credentials.
    pub async fn verify_signature(
        &self,
        account_email: Option<&str>,
        signature: Option<&str>,
    ) -> Result<Principal, SignatureError> {
        let email = account_email.ok_or(SignatureError::MissingCredentialHeader(ACCOUNT_HEADER))?;
        let signature = signature.ok_or(SignatureError::MissingCredentialHeader(SIGNATURE_HEADER))?;
        let account = match self.db.fetch_account_by_email(email).await? {
            Some(account) if account.is_active => account,
            _ => {
                std::hint::black_box(secrets_match(signature, DUMMY_SECRET));
                debug!("🔐️ Webhook call for unknown or inactive account {email}");
                return Err(SignatureError::UnknownOrInactiveAccount);
            },
        };
        let Some(credential) = self.db.fetch_active_credential(account.id).await? else {
            std::hint::black_box(secrets_match(signature, DUMMY_SECRET));
            debug!("🔐️ Account #{} has no active webhook credential", account.id);
            return Err(SignatureError::UnknownOrInactiveAccount);
        };
        if !secrets_match(signature, credential.secret.reveal()) {
            warn!("🔐️ Invalid webhook signature for account #{}", account.id);
            return Err(SignatureError::SignatureMismatch);
        }
        if credential.is_expired() {
            info!("🔐️ Account #{} presented an expired webhook secret", account.id);
            return Err(SignatureError::CredentialExpired);
        }
        trace!("🔐️ Webhook signature for account #{} verified", account.id);
        Ok(Principal { account_id: account.id, email: account.email })
    }

    async fn ensure_verified(&self, account_id: i64) -> Result<BusinessAccount, CredentialError> {
        let account = self.db.fetch_account(account_id).await?.ok_or(CredentialError::AccountNotFound(account_id))?;
        if account.is_verified() {
            Ok(account)
        } else {
            Err(CredentialError::AccountNotVerified(account_id))
        }
    }

    async fn issue_credential(&self, account_id: i64) -> Result<WebhookCredential, CredentialError> {
        let secret = generate_webhook_secret();
        let expires_at = Utc::now() + self.policy.lifetime;
        let credential = self.db.store_credential(account_id, &secret, expires_at).await?;
        info!("🔐️ New webhook secret issued for account #{account_id}. It expires at {expires_at}");
        Ok(credential)
    }
}

impl<B> CredentialApi<B>
where B: CallerVerification
{
    /// True if the principal's account is active and KYC-approved.
    pub async fn is_verified_caller(&self, principal: &Principal) -> Result<bool, CredentialError> {
        self.db.is_verified_caller(principal.account_id).await
    }
}
