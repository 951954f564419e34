use actix_web::{http::StatusCode, test::TestRequest};
use order_fellow_engine::{db_types::OrderId, notifications::NotificationJob};
use serde_json::Value;

use super::helpers::{patch_json, post_json, signed, TestContext};

const SHOP: &str = "shop@example.com";

fn order_json(name: &str, email: &str, address: &str) -> String {
    serde_json::json!({
        "customer": { "name": name, "phone": "555-0100", "email": email },
        "address": address,
        "item_summary": "1x Teapot",
    })
    .to_string()
}

async fn create(ctx: &TestContext, secret: &str, body: &str) -> Value {
    let res = ctx.send(signed(post_json("/orderreceptions/", body), SHOP, secret)).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.json()
}

fn id_of(order: &Value) -> String {
    order["id"].as_str().unwrap().to_string()
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array().unwrap().iter().map(id_of).collect()
}

#[actix_web::test]
async fn create_and_fetch_orders() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;
    let order = create(&ctx, &secret, &order_json("Alice", "alice@example.com", "1 Main St")).await;
    assert_eq!(order["tracking_status"], "PENDING");
    let id = order["id"].as_str().unwrap();
    let order_id: OrderId = id.parse().unwrap();
    assert_eq!(ctx.queue.jobs(), vec![NotificationJob::OrderReceivedConfirmation { order_id }]);

    let res = ctx.send(signed(TestRequest::get().uri(&format!("/orderreceptions/{id}/")), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::OK);
    let fetched = res.json();
    assert_eq!(fetched["id"], order["id"]);
    assert_eq!(fetched["customer"], order["customer"]);
    assert_eq!(fetched["address"], "1 Main St");
}

#[actix_web::test]
async fn customer_details_is_accepted_as_an_alias() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;
    let body = r#"{"customer_details":{"name":"B","phone":"2","email":"b@x.com"},"address":"A","item_summary":"I"}"#;
    let order = create(&ctx, &secret, body).await;
    assert_eq!(order["customer"]["name"], "B");
}

#[actix_web::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;
    let missing = OrderId::random();
    for uri in [format!("/orderreceptions/{missing}/"), "/orderreceptions/12345/".to_string()] {
        let res = ctx.send(signed(TestRequest::get().uri(&uri), SHOP, &secret)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "GET {uri}");
        let res = ctx.send(signed(patch_json(&uri, r#"{"tracking_status":"DELIVERED"}"#), SHOP, &secret)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "PATCH {uri}");
        let res = ctx.send(signed(TestRequest::delete().uri(&uri), SHOP, &secret)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "DELETE {uri}");
    }
    assert!(ctx.queue.is_empty());
}

#[actix_web::test]
async fn partial_updates() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;
    let order = create(&ctx, &secret, &order_json("Dan", "dan@example.com", "4 Elm St")).await;
    let uri = format!("/orderreceptions/{}/", order["id"].as_str().unwrap());

    let res = ctx.send(signed(patch_json(&uri, r#"{"address":"5 Oak Ave"}"#), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::OK);
    let updated = res.json();
    assert_eq!(updated["address"], "5 Oak Ave");
    assert_eq!(updated["item_summary"], "1x Teapot");
    assert_eq!(updated["tracking_status"], "PENDING");
    assert_eq!(ctx.queue.len(), 1);

    let res = ctx.send(signed(patch_json(&uri, r#"{"tracking_status":"lost at sea"}"#), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["fields"]["tracking_status"].is_array());

    // Orders cannot move backwards
    let res = ctx.send(signed(patch_json(&uri, r#"{"tracking_status":"delivered"}"#), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["tracking_status"], "DELIVERED");
    let res = ctx.send(signed(patch_json(&uri, r#"{"tracking_status":"IN_TRANSIT"}"#), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["fields"]["tracking_status"].is_array());
    assert_eq!(ctx.queue.len(), 2);
}

#[actix_web::test]
async fn list_orders_with_filters() {
    let ctx = TestContext::new().await;
    let secret = ctx.verified_account(SHOP).await;
    let a = id_of(&create(&ctx, &secret, &order_json("Alice Smith", "alice@example.com", "1 Main St")).await);
    let b = id_of(&create(&ctx, &secret, &order_json("Bob Jones", "bob@shop.test", "2 Main St")).await);
    let c = id_of(&create(&ctx, &secret, &order_json("Alicia Keys", "keys@example.com", "9 Side Rd")).await);
    let uri = format!("/orderreceptions/{b}/");
    let res = ctx.send(signed(patch_json(&uri, r#"{"tracking_status":"OUT_FOR_DELIVERY"}"#), SHOP, &secret)).await;
    assert_eq!(res.status, StatusCode::OK);

    let list = |query: &str| {
        let uri = format!("/orderreceptions/{query}");
        signed(TestRequest::get().uri(&uri), SHOP, &secret)
    };
    let res = ctx.send(list("")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ids(&res.json()), vec![a.clone(), b.clone(), c.clone()]);

    let res = ctx.send(list("?customer_name=ali")).await;
    assert_eq!(ids(&res.json()), vec![a.clone(), c.clone()]);
    let res = ctx.send(list("?tracking_status=OUT_FOR_DELIVERY")).await;
    assert_eq!(ids(&res.json()), vec![b.clone()]);
    let res = ctx.send(list("?customer_email=example.com&address=side")).await;
    assert_eq!(ids(&res.json()), vec![c.clone()]);
    let res = ctx.send(list(&format!("?id={a}"))).await;
    assert_eq!(ids(&res.json()), vec![a.clone()]);

    let res = ctx.send(list("?tracking_status=LOST")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["fields"]["tracking_status"].is_array());
    let res = ctx.send(list("?id=12345")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}
