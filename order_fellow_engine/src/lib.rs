//! Order Fellow Engine
//!
//! Order Fellow lets businesses push their orders in through a signed webhook, tracks each order through a fixed
//! delivery lifecycle and emails the customer whenever something changes. This library holds the core logic and
//! knows nothing about HTTP.
//!
//! The library is divided into these main sections:
//! 1. Storage ([`mod@traits`] and the SQLite backend, [`SqliteDatabase`]). You should never need to talk to the
//!    database directly. Instead, use the public API. The data types stored in the database are defined in
//!    [`mod@db_types`] and are public.
//! 2. The public API ([`OrderFlowApi`] and [`CredentialApi`]). It creates, updates and deletes orders, decides which
//!    status changes are effective using the [`lifecycle`] rules, and authenticates webhook callers.
//! 3. Customer [`notifications`]. Every effective change produces exactly one job on a [`NotificationQueue`], which
//!    runs in the background and delivers an email with bounded retries.
pub mod db_types;
pub mod helpers;
pub mod lifecycle;
pub mod notifications;
mod ofe_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use lifecycle::{IllegalTransition, TransitionPolicy};
pub use notifications::{NotificationError, NotificationQueue};
pub use ofe_api::{
    credential_api::{CredentialApi, CredentialPolicy, ACCOUNT_HEADER, SIGNATURE_HEADER},
    errors::SignatureError,
    order_flow_api::OrderFlowApi,
    order_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{CallerVerification, CredentialError, CredentialManagement, OrderManagement, OrderStoreError};
