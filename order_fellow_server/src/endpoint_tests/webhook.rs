use actix_web::{
    http::{header::RETRY_AFTER, StatusCode},
    test::TestRequest,
};
use chrono::{Duration, Utc};
use order_fellow_engine::{
    db_types::{OrderId, TrackingStatus},
    notifications::NotificationJob,
    CredentialManagement,
    OrderManagement,
};

use super::helpers::{patch_json, post_json, signed, TestContext, ORDER_JSON};

const SHOP: &str = "shop@example.com";

#[actix_web::test]
async fn order_lifecycle_end_to_end() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;

    let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let order = res.json();
    assert_eq!(order["tracking_status"], "PENDING");
    assert_eq!(order["customer"]["email"], "a@x.com");
    assert_eq!(order["address"], "Addr");
    let id: OrderId = order["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(ctx.queue.jobs(), vec![NotificationJob::OrderReceivedConfirmation { order_id: id }]);

    let uri = format!("/orderreceptions/{id}/");
    let res = ctx.send(signed(patch_json(&uri, r#"{"tracking_status":"IN_TRANSIT"}"#), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.json()["tracking_status"], "IN_TRANSIT");
    let history = ctx.db.fetch_status_history(&id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, TrackingStatus::InTransit);
    assert_eq!(ctx.queue.len(), 2);
    assert_eq!(ctx.queue.jobs()[1], NotificationJob::OrderStatusUpdate { order_id: id });

    // The same update again changes nothing
    let res = ctx.send(signed(patch_json(&uri, r#"{"tracking_status":"IN_TRANSIT"}"#), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ctx.db.fetch_status_history(&id).await.unwrap().len(), 1);
    assert_eq!(ctx.queue.len(), 2);

    let res = ctx.send(signed(TestRequest::delete().uri(&uri), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(res.body.is_empty());
    assert!(ctx.db.fetch_order(&id).await.unwrap().is_none());
    assert_eq!(ctx.queue.len(), 3);
    assert_eq!(ctx.queue.jobs()[2], NotificationJob::OrderDeletedNotice {
        order_id: id,
        customer_email: "a@x.com".into()
    });

    let res = ctx.send(signed(TestRequest::get().uri(&uri), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn missing_headers_are_bad_requests() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;

    let res = ctx.send(post_json("/webhook/", ORDER_JSON)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["error"].as_str().unwrap().contains("X-Customer-Email"));

    let req = post_json("/webhook/", ORDER_JSON).insert_header(("X-Customer-Email", SHOP));
    let res = ctx.send(req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["error"].as_str().unwrap().contains("X-Webhook-Signature"));

    let req = TestRequest::get().uri("/orderreceptions/").insert_header(("X-Webhook-Signature", secret.as_str()));
    let res = ctx.send(req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(ctx.queue.is_empty());
}

#[actix_web::test]
async fn wrong_secret_is_unauthorized() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;
    let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), SHOP, &format!("{secret}x"))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"], "Authentication Error. Invalid webhook signature.");
    assert!(ctx.queue.is_empty());
    assert!(ctx.db.search_orders(&Default::default()).await.unwrap().is_empty());
}

#[actix_web::test]
async fn expired_secret_is_unauthorized() {
    let ctx = TestContext::new().await;
    ctx.verified_account(SHOP).await;
    let account = ctx.db.fetch_account_by_email(SHOP).await.unwrap().unwrap();
    ctx.db.store_credential(account.id, "whsk_old", Utc::now() - Duration::days(1)).await.unwrap();
    let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), SHOP, "whsk_old")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.json()["error"].as_str().unwrap().contains("expired"));
}

#[actix_web::test]
async fn unknown_or_inactive_accounts_are_not_found() {
    let ctx = TestContext::new().await;
    let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), "nobody@example.com", "whsk_abc")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let secret = ctx.verified_account(SHOP).await;
    let account = ctx.db.fetch_account_by_email(SHOP).await.unwrap().unwrap();
    ctx.db.set_verification_status(account.id, false, true).await.unwrap();
    let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(ctx.queue.is_empty());
}

#[actix_web::test]
async fn unapproved_callers_can_push_orders_but_not_manage_them() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;
    let account = ctx.db.fetch_account_by_email(SHOP).await.unwrap().unwrap();
    ctx.db.set_verification_status(account.id, true, false).await.unwrap();

    let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.json()["id"].as_str().unwrap().to_string();

    let res = ctx.send(signed(TestRequest::get().uri("/orderreceptions/"), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let uri = format!("/orderreceptions/{id}/");
    let res = ctx.send(signed(patch_json(&uri, r#"{"tracking_status":"DELIVERED"}"#), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = ctx.send(signed(TestRequest::delete().uri(&uri), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    // Only the confirmation for the webhook order was queued
    assert_eq!(ctx.queue.len(), 1);
}

#[actix_web::test]
async fn webhook_is_rate_limited_per_account() {
    let ctx = TestContext::with_rate_limit(2).await;
    let secret = ctx.verified_account(SHOP).await;
    let other = ctx.verified_account("other@example.com").await;

    for _ in 0..2 {
        let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), SHOP, &secret)).await;
        assert_eq!(res.status, StatusCode::CREATED);
    }
    let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    let wait = res.headers.get(RETRY_AFTER).unwrap().to_str().unwrap().parse::<u64>().unwrap();
    assert!(wait > 0 && wait <= 30);
    assert_eq!(ctx.queue.len(), 2);

    let res = ctx.send(signed(post_json("/webhook/", ORDER_JSON), "other@example.com", &other)).await;
    assert_eq!(res.status, StatusCode::CREATED);
    // Order management is not limited
    let res = ctx.send(signed(TestRequest::get().uri("/orderreceptions/"), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[actix_web::test]
async fn invalid_payloads_report_field_errors() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;
    let body = r#"{"customer":{"name":"A","phone":"1","email":"not-an-email"},"address":"  "}"#;
    let res = ctx.send(signed(post_json("/webhook/", body), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let json = res.json();
    assert!(json["fields"]["customer.email"].is_array());
    assert!(json["fields"]["address"].is_array());
    assert!(json["fields"]["item_summary"].is_array());

    let res = ctx.send(signed(post_json("/webhook/", "{not json"), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["error"].as_str().unwrap().starts_with("Could not read request body"));
    assert!(ctx.queue.is_empty());
}
