use actix_web::{
    error::ResponseError,
    http::{
        header::{ContentType, RETRY_AFTER},
        StatusCode,
    },
    HttpResponse,
};
use log::error;
use order_fellow_engine::{db_types::FieldErrors, CredentialError, OrderStoreError, SignatureError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request data.")]
    ValidationError(FieldErrors),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Request was throttled. Expected available in {0} seconds.")]
    RateLimited(u64),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingCredentials(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
                AuthError::ExpiredCredential => StatusCode::UNAUTHORIZED,
                AuthError::AccountNotFound => StatusCode::NOT_FOUND,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::ValidationError(fields) => json!({ "error": self.to_string(), "fields": fields }),
            _ => json!({ "error": self.to_string() }),
        };
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(ContentType::json());
        if let Self::RateLimited(wait) = self {
            response.insert_header((RETRY_AFTER, wait.to_string()));
        }
        response.body(body.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("{0}")]
    MissingCredentials(String),
    #[error("Invalid webhook signature.")]
    InvalidSignature,
    #[error("The webhook secret has expired. Request a new one.")]
    ExpiredCredential,
    #[error("Customer account not found or inactive.")]
    AccountNotFound,
}

impl From<SignatureError> for ServerError {
    fn from(e: SignatureError) -> Self {
        match e {
            SignatureError::MissingCredentialHeader(_) => {
                Self::AuthenticationError(AuthError::MissingCredentials(e.to_string()))
            },
            SignatureError::UnknownOrInactiveAccount => Self::AuthenticationError(AuthError::AccountNotFound),
            SignatureError::CredentialExpired => Self::AuthenticationError(AuthError::ExpiredCredential),
            SignatureError::SignatureMismatch => Self::AuthenticationError(AuthError::InvalidSignature),
            SignatureError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<OrderStoreError> for ServerError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} does not exist.")),
            OrderStoreError::ValidationError(fields) => Self::ValidationError(fields),
            OrderStoreError::IllegalTransition(t) => {
                Self::ValidationError(FieldErrors::single("tracking_status", t.to_string()))
            },
            OrderStoreError::DatabaseError(e) => {
                error!("💻️ Unexpected database error. {e}");
                Self::BackendError(format!("Database error: {e}"))
            },
        }
    }
}

impl From<CredentialError> for ServerError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::AccountNotFound(_) => Self::AuthenticationError(AuthError::AccountNotFound),
            CredentialError::ValidationError(fields) => Self::ValidationError(fields),
            CredentialError::AccountNotVerified(_) => Self::InsufficientPermissions(e.to_string()),
            CredentialError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<FieldErrors> for ServerError {
    fn from(fields: FieldErrors) -> Self {
        Self::ValidationError(fields)
    }
}
