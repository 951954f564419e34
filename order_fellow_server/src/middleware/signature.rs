//! Webhook signature middleware for Actix Web.
//!
//! Callers identify the business account they act for in the `X-Customer-Email` header, and present that account's
//! webhook secret in the `X-Webhook-Signature` header. Both are checked by
//! [`CredentialApi::verify_signature`](order_fellow_engine::CredentialApi::verify_signature).
//!
//! On success the [`Principal`] is stored in the request extensions for the handlers and the other middleware.
use std::{
    future::{ready, Ready},
    marker::PhantomData,
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorInternalServerError,
    web,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use order_fellow_engine::{
    db_types::Principal,
    traits::CredentialManagement,
    CredentialApi,
    ACCOUNT_HEADER,
    SIGNATURE_HEADER,
};

use crate::errors::ServerError;

pub struct SignatureMiddlewareFactory<B> {
    _backend: PhantomData<fn() -> B>,
}

impl<B> SignatureMiddlewareFactory<B> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        SignatureMiddlewareFactory { _backend: PhantomData }
    }
}

impl<S, Body, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory<B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<Body>, Error = Error> + 'static,
    S::Future: 'static,
    Body: 'static,
    B: CredentialManagement + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<Body>;
    type Transform = SignatureMiddlewareService<S, B>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService { service: Rc::new(service), _backend: PhantomData }))
    }
}

pub struct SignatureMiddlewareService<S, B> {
    service: Rc<S>,
    _backend: PhantomData<fn() -> B>,
}

impl<S, Body, B> Service<ServiceRequest> for SignatureMiddlewareService<S, B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<Body>, Error = Error> + 'static,
    S::Future: 'static,
    Body: 'static,
    B: CredentialManagement + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<Body>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for request");
            let api = req.app_data::<web::Data<CredentialApi<B>>>().cloned().ok_or_else(|| {
                warn!("🔐️ No credential API has been configured. Denying access.");
                ErrorInternalServerError("Signature verification is not configured.")
            })?;
            let email = header_value(&req, ACCOUNT_HEADER);
            let signature = header_value(&req, SIGNATURE_HEADER);
            let principal = api
                .verify_signature(email.as_deref(), signature.as_deref())
                .await
                .map_err(|e| Error::from(ServerError::from(e)))?;
            trace!("🔐️ Signature check for account #{} ✅️", principal.account_id);
            req.extensions_mut().insert::<Principal>(principal);
            service.call(req).await
        })
    }
}

// A header that is present but not valid UTF-8 is treated like a missing one.
fn header_value(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(|s| s.trim().to_string())
}
