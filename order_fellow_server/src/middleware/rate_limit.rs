//! Per-account rate limiting for the webhook route.
//!
//! Every business account gets a token bucket holding up to `limit` tokens, refilled continuously at `limit` tokens per
//! minute. Each webhook call takes one token. A call that finds the bucket empty is rejected with 429 Too Many
//! Requests and a `Retry-After` hint.
//!
//! Buckets live in memory and are shared by all workers of the server. They are not persisted.
use std::{
    collections::HashMap,
    future::{ready, Ready},
    rc::Rc,
    sync::Mutex,
    time::{Duration, Instant},
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace, warn};
use order_fellow_engine::db_types::Principal;

use crate::errors::ServerError;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct RateLimitBucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct WebhookRateLimiter {
    limit: u32,
    buckets: Mutex<HashMap<i64, RateLimitBucket>>,
}

impl WebhookRateLimiter {
    /// A limiter allowing `limit` calls per account per minute. A limit of zero disables limiting.
    pub fn new(limit: u32) -> Self {
        Self { limit, buckets: Mutex::new(HashMap::new()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    pub fn check(&self, account_id: i64) -> Result<(), u64> {
        self.check_at(account_id, Instant::now())
    }

    /// Takes a token from the account's bucket. If the bucket is empty, returns the number of seconds until the next
    /// token becomes available.
    pub fn check_at(&self, account_id: i64, now: Instant) -> Result<(), u64> {
        if !self.is_enabled() {
            return Ok(());
        }
        let capacity = f64::from(self.limit);
        let window = WINDOW.as_secs_f64();
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let bucket = buckets.entry(account_id).or_insert(RateLimitBucket { tokens: capacity, last_refill: now });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * capacity / window).min(capacity);
        bucket.last_refill = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let wait = ((1.0 - bucket.tokens) * window / capacity).ceil() as u64;
            Err(wait.max(1))
        }
    }
}

pub struct RateLimitMiddlewareFactory;

impl RateLimitMiddlewareFactory {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        RateLimitMiddlewareFactory
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = RateLimitMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let limiter = req.app_data::<web::Data<WebhookRateLimiter>>().cloned();
            let account_id = req.extensions().get::<Principal>().map(|p| p.account_id);
            match (limiter, account_id) {
                (Some(limiter), Some(account_id)) => {
                    if let Err(wait) = limiter.check(account_id) {
                        warn!("🔐️ Account #{account_id} exceeded the webhook rate limit. Next call in {wait}s.");
                        return Err(ServerError::RateLimited(wait).into());
                    }
                    trace!("🔐️ Rate limit check for account #{account_id} ✅️");
                },
                (None, _) => trace!("🔐️ No webhook rate limiter configured"),
                (Some(_), None) => debug!("🔐️ Request is not authenticated. Skipping rate limit."),
            }
            service.call(req).await
        })
    }
}
