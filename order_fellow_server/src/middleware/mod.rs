//! Request guards for the webhook and order management routes.
//!
//! Wrap order of the middleware matters. [`SignatureMiddlewareFactory`] must run first, since it places the
//! authenticated [`Principal`](order_fellow_engine::db_types::Principal) in the request extensions, where
//! [`AclMiddlewareFactory`] and [`RateLimitMiddlewareFactory`] look for it. In actix the last `wrap` runs first.
mod acl;
mod rate_limit;
mod signature;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use rate_limit::{RateLimitMiddlewareFactory, RateLimitMiddlewareService, WebhookRateLimiter};
pub use signature::{SignatureMiddlewareFactory, SignatureMiddlewareService};
