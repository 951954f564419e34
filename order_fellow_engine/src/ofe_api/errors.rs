use thiserror::Error;

use crate::traits::CredentialError;

/// Reasons a webhook caller could not be authenticated.
#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("The {0} header is missing.")]
    MissingCredentialHeader(&'static str),
    #[error("Customer account not found or inactive.")]
    UnknownOrInactiveAccount,
    #[error("The webhook secret has expired. Request a new one.")]
    CredentialExpired,
    #[error("Invalid webhook signature.")]
    SignatureMismatch,
    #[error("Could not verify the webhook signature. {0}")]
    DatabaseError(String),
}

impl From<CredentialError> for SignatureError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::AccountNotFound(_) | CredentialError::AccountNotVerified(_) => {
                SignatureError::UnknownOrInactiveAccount
            },
            e => SignatureError::DatabaseError(e.to_string()),
        }
    }
}

