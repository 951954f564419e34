use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    http::{header::HeaderMap, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use log::debug;
use order_fellow_engine::{
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        RecordingQueue,
    },
    CredentialApi,
    CredentialPolicy,
    OrderFlowApi,
    SqliteDatabase,
    TransitionPolicy,
    ACCOUNT_HEADER,
    SIGNATURE_HEADER,
};
use serde_json::Value;

use crate::{
    middleware::WebhookRateLimiter,
    routes::{
        health,
        json_config,
        query_config,
        ListOrdersRoute,
        ModifyOrderRoute,
        NewOrderRoute,
        OrderByIdRoute,
        RemoveOrderRoute,
        WebhookRoute,
    },
};

pub const ORDER_JSON: &str =
    r#"{"customer":{"name":"A","phone":"1","email":"a@x.com"},"address":"Addr","item_summary":"Items"}"#;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("Body is not JSON. {e}. {}", self.body))
    }
}

/// A fresh database, a recording job queue and the full set of routes, wired up the same way the server does it.
pub struct TestContext {
    pub db: SqliteDatabase,
    pub queue: RecordingQueue,
    pub credentials: CredentialApi<SqliteDatabase>,
    rate_limiter: web::Data<WebhookRateLimiter>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_rate_limit(0).await
    }

    pub async fn with_rate_limit(limit: u32) -> Self {
        let db = prepare_test_env(&random_db_path()).await;
        let credentials = CredentialApi::new(db.clone(), CredentialPolicy::default());
        let rate_limiter = web::Data::new(WebhookRateLimiter::new(limit));
        Self { db, queue: RecordingQueue::new(), credentials, rate_limiter }
    }

    /// Registers and approves a business account, and returns its webhook secret.
    pub async fn verified_account(&self, email: &str) -> String {
        let username = email.split('@').next().unwrap_or(email);
        let account = self.credentials.register_account(email, username).await.unwrap();
        self.credentials.approve_verification(account.id).await.unwrap();
        let credential = self.credentials.fetch_or_issue_credential(account.id).await.unwrap();
        credential.secret.reveal().clone()
    }

    pub async fn send(&self, req: TestRequest) -> TestResponse {
        let orders_api = OrderFlowApi::new(self.db.clone(), Arc::new(self.queue.clone()), TransitionPolicy::default());
        let app = App::new()
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(self.credentials.clone()))
            .app_data(self.rate_limiter.clone())
            .app_data(json_config())
            .app_data(query_config())
            .service(health)
            .service(WebhookRoute::<SqliteDatabase>::new())
            .service(ListOrdersRoute::<SqliteDatabase>::new())
            .service(NewOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(ModifyOrderRoute::<SqliteDatabase>::new())
            .service(RemoveOrderRoute::<SqliteDatabase>::new());
        let service = test::init_service(app).await;
        debug!("Making request");
        // Errors raised by middleware come back as `Err`, just as they would reach the HTTP dispatcher
        let response = match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => res.into_parts().1.map_into_boxed_body(),
            Err(e) => e.error_response(),
        };
        let status = response.status();
        let headers = response.headers().clone();
        let body = String::from_utf8_lossy(&response.into_body().try_into_bytes().unwrap()).into_owned();
        TestResponse { status, headers, body }
    }
}

pub fn signed(req: TestRequest, email: &str, secret: &str) -> TestRequest {
    req.insert_header((ACCOUNT_HEADER, email)).insert_header((SIGNATURE_HEADER, secret))
}

pub fn post_json(uri: &str, body: &str) -> TestRequest {
    TestRequest::post().uri(uri).insert_header(("Content-Type", "application/json")).set_payload(body.to_string())
}

pub fn patch_json(uri: &str, body: &str) -> TestRequest {
    TestRequest::patch().uri(uri).insert_header(("Content-Type", "application/json")).set_payload(body.to_string())
}
