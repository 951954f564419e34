//! # Order Fellow engine public API
//!
//! The `ofe_api` module exposes the programmatic API for the Order Fellow engine.
//!
//! * [`order_flow_api`] is the primary API for handling incoming orders, status changes and deletions. It submits
//!   the customer notification jobs that follow from each change.
//! * [`credential_api`] manages business accounts and their webhook credentials, and authenticates webhook callers.
//!
//! The other submodules in this module are support types.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits required by the API.
//!
//! ```rust,ignore
//! use order_fellow_engine::{OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements OrderManagement
//! let api = OrderFlowApi::new(db, queue, TransitionPolicy::ForwardOnly);
//! let order = api.fetch_order(&order_id).await?;
//! ```

pub mod credential_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
