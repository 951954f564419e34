//! Request handler definitions
//!
//! Define each route and its handler here. Keep handlers short and push the work into the engine APIs.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! etc.) should be expressed as futures or asynchronous functions.
//!
//! Every route except `/health` is authenticated with a webhook signature. The order management routes additionally
//! require a verified caller, and the webhook route is rate limited per account.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use order_fellow_engine::{
    db_types::{OrderId, Principal},
    order_objects::{ModifyOrderRequest, NewOrderRequest},
    OrderFlowApi,
    OrderManagement,
};

use crate::{data_objects::OrderListParams, errors::ServerError};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// The backend type must also provide the credential lookups that the guarding middleware needs.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires verified_caller) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds+)+ order_fellow_engine::CredentialManagement + order_fellow_engine::CallerVerification + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::<A>::new())
                    .wrap($crate::middleware::SignatureMiddlewareFactory::<A>::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires rate_limit) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds+)+ order_fellow_engine::CredentialManagement + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::RateLimitMiddlewareFactory::new())
                    .wrap($crate::middleware::SignatureMiddlewareFactory::<A>::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// JSON bodies that cannot be decoded are reported as 400 Bad Request with the usual error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Could not decode JSON body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        debug!("💻️ Could not decode query string. {err}");
        ServerError::InvalidRequestPath(err.to_string()).into()
    })
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(webhook => Post "/webhook/" impl OrderManagement where requires rate_limit);
/// Receives a new order from a business account.
///
/// The order is stored with a status of `PENDING` and the customer is sent an order confirmation email. The stored
/// order is returned with 201 Created.
pub async fn webhook<B: OrderManagement>(
    principal: web::ReqData<Principal>,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Received webhook order from {}", principal.email);
    create_order(body.into_inner(), api.as_ref()).await
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(list_orders => Get "/orderreceptions/" impl OrderManagement where requires verified_caller);
/// Lists orders. All query parameters are optional, and all supplied parameters must match.
///
/// `customer_name`, `customer_email`, `customer_phone` and `address` match case-insensitive substrings. `id` and
/// `tracking_status` match exactly.
pub async fn list_orders<B: OrderManagement>(
    query: web::Query<OrderListParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = query.into_inner().into_filter()?;
    debug!("💻️ GET orders. {filter}");
    let orders = api.search_orders(&filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(new_order => Post "/orderreceptions/" impl OrderManagement where requires verified_caller);
pub async fn new_order<B: OrderManagement>(
    principal: web::ReqData<Principal>,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order from {}", principal.email);
    create_order(body.into_inner(), api.as_ref()).await
}

route!(order_by_id => Get "/orderreceptions/{id}/" impl OrderManagement where requires verified_caller);
pub async fn order_by_id<B: OrderManagement>(
    req: HttpRequest,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&req)?;
    debug!("💻️ GET order {order_id}");
    let order = api.fetch_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(modify_order => Patch "/orderreceptions/{id}/" impl OrderManagement where requires verified_caller);
/// Applies a partial update to an order.
///
/// If the tracking status changes, the change is recorded in the order's status history and the customer is emailed.
/// Setting the status the order already has changes nothing.
pub async fn modify_order<B: OrderManagement>(
    req: HttpRequest,
    body: web::Json<ModifyOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&req)?;
    let changes = body.into_inner().validate()?;
    debug!("💻️ PATCH order {order_id}");
    let result = api.update_order(&order_id, changes).await?;
    if let Some(transition) = result.transition {
        info!("💻️ Order {order_id} moved from {} to {}", transition.from, transition.to);
    }
    Ok(HttpResponse::Ok().json(result.order))
}

route!(remove_order => Delete "/orderreceptions/{id}/" impl OrderManagement where requires verified_caller);
pub async fn remove_order<B: OrderManagement>(
    req: HttpRequest,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&req)?;
    debug!("💻️ DELETE order {order_id}");
    api.delete_order(&order_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn create_order<B: OrderManagement>(
    request: NewOrderRequest,
    api: &OrderFlowApi<B>,
) -> Result<HttpResponse, ServerError> {
    let order = request.validate()?;
    let order = api.create_order(order).await?;
    info!("💻️ New order {} for {}", order.id, order.customer.email);
    Ok(HttpResponse::Created().json(order))
}

/// An id that is not a UUID cannot name an order, so it is reported as not found.
fn order_id_from_path(req: &HttpRequest) -> Result<OrderId, ServerError> {
    let raw = req.match_info().get("id").unwrap_or_default();
    raw.parse::<OrderId>().map_err(|e| {
        debug!("💻️ '{raw}' is not an order id. {e}");
        ServerError::NoRecordFound(format!("Order {raw} does not exist."))
    })
}
