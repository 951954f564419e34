//! # Storage contracts
//!
//! This module defines the behaviour that a database *backend* must expose to support the Order Fellow engine.
//!
//! * [`OrderManagement`] stores orders, their customer snapshots and their status history. It is responsible for
//!   making status changes atomic.
//! * [`CredentialManagement`] stores business accounts and their webhook credentials.
//! * [`CallerVerification`] decides whether an authenticated business account may manage orders.
mod credential_management;
mod order_management;

pub use credential_management::{CallerVerification, CredentialError, CredentialManagement};
pub use order_management::{OrderManagement, OrderStoreError};
