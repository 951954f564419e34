use std::sync::Arc;

use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use chrono::{Duration, Utc};
use mof_common::Secret;
use order_fellow_engine::{
    db_types::{BusinessAccount, WebhookCredential},
    test_utils::RecordingQueue,
    CredentialApi,
    CredentialError,
    CredentialPolicy,
    OrderFlowApi,
    OrderStoreError,
    TransitionPolicy,
};

use super::{helpers::signed, mocks::MockBackend};
use crate::routes::{json_config, ListOrdersRoute};

const SECRET: &str = "whsk_test-secret";

fn authenticating_backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_fetch_account_by_email().returning(|email| {
        Ok(Some(BusinessAccount {
            id: 7,
            email: email.to_string(),
            username: "shop".into(),
            is_active: true,
            kyc_approved: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }))
    });
    backend.expect_fetch_active_credential().returning(|account_id| {
        Ok(Some(WebhookCredential {
            id: 1,
            account_id,
            secret: Secret::new(SECRET.to_string()),
            is_active: true,
            expires_at: Utc::now() + Duration::days(1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }))
    });
    backend.expect_is_verified_caller().returning(|_| Ok(true));
    backend
}

#[actix_web::test]
async fn database_failures_are_server_errors() {
    let _ = env_logger::try_init().ok();
    let mut orders_backend = MockBackend::new();
    orders_backend
        .expect_search_orders()
        .times(1)
        .returning(|_| Err(OrderStoreError::DatabaseError("disk I/O error".into())));
    let queue = RecordingQueue::new();
    let orders_api = OrderFlowApi::new(orders_backend, Arc::new(queue.clone()), TransitionPolicy::default());
    let credential_api = CredentialApi::new(authenticating_backend(), CredentialPolicy::default());
    let app = App::new()
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(credential_api))
        .app_data(json_config())
        .service(ListOrdersRoute::<MockBackend>::new());
    let service = test::init_service(app).await;

    let req = signed(TestRequest::get().uri("/orderreceptions/"), "shop@example.com", SECRET).to_request();
    let (_, res) = test::call_service(&service, req).await.into_parts();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    assert!(body.contains("disk I/O error"));
    assert!(queue.is_empty());
}

#[actix_web::test]
async fn credential_lookup_failures_are_server_errors() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_account_by_email()
        .returning(|_| Err(CredentialError::DatabaseError("database is locked".into())));
    let credential_api = CredentialApi::new(backend, CredentialPolicy::default());
    let orders_api = OrderFlowApi::new(MockBackend::new(), Arc::new(RecordingQueue::new()), TransitionPolicy::default());
    let app = App::new()
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(credential_api))
        .service(ListOrdersRoute::<MockBackend>::new());
    let service = test::init_service(app).await;

    let req = signed(TestRequest::get().uri("/orderreceptions/"), "shop@example.com", SECRET).to_request();
    let err = test::try_call_service(&service, req).await.expect_err("Expected the signature check to fail");
    assert_eq!(err.as_response_error().status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}
