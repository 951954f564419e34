//! Access control middleware for the order management routes.
//!
//! Only verified callers (active, KYC-approved business accounts) may manage orders. The check runs after
//! [`super::SignatureMiddlewareFactory`] has authenticated the request. Anyone else gets a 403 Forbidden response.
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
use order_fellow_engine::{db_types::Principal, traits::CallerVerification, CredentialApi};

use crate::errors::ServerError;

pub struct AclMiddlewareFactory<B> {
    _backend: PhantomData<fn() -> B>,
}

impl<B> AclMiddlewareFactory<B> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        AclMiddlewareFactory { _backend: PhantomData }
    }
}

impl<S, Body, B> Transform<S, ServiceRequest> for AclMiddlewareFactory<B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<Body>, Error = Error> + 'static,
    S::Future: 'static,
    Body: 'static,
    B: CallerVerification + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<Body>;
    type Transform = AclMiddlewareService<S, B>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AclMiddlewareService { service: Rc::new(service), _backend: PhantomData }))
    }
}

pub struct AclMiddlewareService<S, B> {
    service: Rc<S>,
    _backend: PhantomData<fn() -> B>,
}

impl<S, Body, B> Service<ServiceRequest> for AclMiddlewareService<S, B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<Body>, Error = Error> + 'static,
    S::Future: 'static,
    Body: 'static,
    B: CallerVerification + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<Body>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let principal = req.extensions().get::<Principal>().cloned().ok_or_else(|| {
                warn!("🔐️ No authenticated principal found in request extensions");
                ErrorInternalServerError("No authenticated principal found in request extensions")
            })?;
            let api = req.app_data::<web::Data<CredentialApi<B>>>().cloned().ok_or_else(|| {
                warn!("🔐️ No credential API has been configured. Denying access.");
                ErrorInternalServerError("Caller verification is not configured.")
            })?;
            let verified = api.is_verified_caller(&principal).await.map_err(|e| Error::from(ServerError::from(e)))?;
            if verified {
                trace!("🔐️ Account #{} is a verified caller", principal.account_id);
                service.call(req).await
            } else {
                warn!("🔐️ Account #{} is not verified. Denying access.", principal.account_id);
                let msg = format!("Account {} has not been verified.", principal.email);
                Err(ServerError::InsufficientPermissions(msg).into())
            }
        })
    }
}
