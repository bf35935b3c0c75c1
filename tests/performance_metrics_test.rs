mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, response_json, TestApp, EARLY, LATE, PROMISED};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{json, Value};
use uuid::Uuid;
use vendor_performance_api::{entities::purchase_order, services::performance::VendorPerformance};

async fn completed_order(app: &TestApp, vendor_id: &str, po: &str, delivered: &str, rating: f64) {
    let response = app
        .create_purchase_order(
            vendor_id,
            po,
            json!({
                "status": "completed",
                "delivered_date": delivered,
                "quality_rating": rating
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED, "{po}");
}

async fn patch_order(app: &TestApp, order_id: &str, body: Value) -> Value {
    let response = app
        .request(
            Method::PATCH,
            &format!("/api/v1/purchase_orders/{order_id}"),
            Some(body),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

#[tokio::test]
async fn vendor_without_completed_orders_has_zero_metrics() {
    let app = TestApp::new().await;
    let vendor_id = id_of(&app.create_vendor("V-1").await);

    app.create_purchase_order(
        &vendor_id,
        "PO-P",
        json!({"quality_rating": 5.0, "delivered_date": EARLY}),
    )
    .await;
    app.create_purchase_order(
        &vendor_id,
        "PO-C",
        json!({"status": "canceled", "quality_rating": 1.0}),
    )
    .await;

    assert_eq!(app.performance(&vendor_id).await, (0.0, 0.0));
}

#[tokio::test]
async fn single_on_time_completed_order() {
    let app = TestApp::new().await;
    let vendor_id = id_of(&app.create_vendor("V-1").await);

    completed_order(&app, &vendor_id, "PO-1", EARLY, 5.0).await;

    assert_eq!(app.performance(&vendor_id).await, (100.0, 5.0));
}

#[tokio::test]
async fn delivery_exactly_on_promise_counts_as_on_time() {
    let app = TestApp::new().await;
    let vendor_id = id_of(&app.create_vendor("V-1").await);

    completed_order(&app, &vendor_id, "PO-1", PROMISED, 3.0).await;

    assert_eq!(app.performance(&vendor_id).await, (100.0, 3.0));
}

#[tokio::test]
async fn one_on_time_and_one_late_order() {
    let app = TestApp::new().await;
    let vendor_id = id_of(&app.create_vendor("V-1").await);

    completed_order(&app, &vendor_id, "PO-1", EARLY, 4.5).await;
    completed_order(&app, &vendor_id, "PO-2", LATE, 3.5).await;

    assert_eq!(app.performance(&vendor_id).await, (50.0, 4.0));

    // The vendor resource carries the same cached values
    let vendor = response_json(
        app.request(Method::GET, &format!("/api/v1/vendors/{vendor_id}"), None)
            .await,
    )
    .await;
    assert_eq!(vendor["on_time_delivery_rate"], 50.0);
    assert_eq!(vendor["quality_rating_avg"], 4.0);
}

#[tokio::test]
async fn completing_an_order_updates_metrics() {
    let app = TestApp::new().await;
    let vendor_id = id_of(&app.create_vendor("V-1").await);
    let order = response_json(app.create_purchase_order(&vendor_id, "PO-1", json!({})).await).await;
    assert_eq!(app.performance(&vendor_id).await, (0.0, 0.0));

    patch_order(
        &app,
        &id_of(&order),
        json!({"status": "completed", "delivered_date": LATE, "quality_rating": 2.0}),
    )
    .await;
    assert_eq!(app.performance(&vendor_id).await, (0.0, 2.0));

    patch_order(&app, &id_of(&order), json!({"delivered_date": EARLY})).await;
    assert_eq!(app.performance(&vendor_id).await, (100.0, 2.0));

    patch_order(&app, &id_of(&order), json!({"quality_rating": null})).await;
    assert_eq!(app.performance(&vendor_id).await, (100.0, 0.0));

    patch_order(&app, &id_of(&order), json!({"status": "canceled"})).await;
    assert_eq!(app.performance(&vendor_id).await, (0.0, 0.0));
}

#[tokio::test]
async fn any_purchase_order_write_repairs_stale_metrics() {
    let app = TestApp::new().await;
    let vendor_id = id_of(&app.create_vendor("V-1").await);
    completed_order(&app, &vendor_id, "PO-1", EARLY, 4.0).await;
    let pending =
        response_json(app.create_purchase_order(&vendor_id, "PO-2", json!({})).await).await;

    app.db()
        .execute_unprepared(
            "UPDATE vendors SET on_time_delivery_rate = 12.5, quality_rating_avg = 1.25",
        )
        .await
        .expect("corrupt cached metrics");
    assert_eq!(app.performance(&vendor_id).await, (12.5, 1.25));

    // Touching an unrelated field still recalculates
    patch_order(&app, &id_of(&pending), json!({"quantity": 11})).await;
    assert_eq!(app.performance(&vendor_id).await, (100.0, 4.0));
}

#[tokio::test]
async fn moving_an_order_recalculates_both_vendors() {
    let app = TestApp::new().await;
    let from = id_of(&app.create_vendor("V-FROM").await);
    let to = id_of(&app.create_vendor("V-TO").await);

    completed_order(&app, &from, "PO-STAY", LATE, 2.0).await;
    let moving = response_json(
        app.create_purchase_order(
            &from,
            "PO-MOVE",
            json!({"status": "completed", "delivered_date": EARLY, "quality_rating": 5.0}),
        )
        .await,
    )
    .await;
    assert_eq!(app.performance(&from).await, (50.0, 3.5));

    let moved = patch_order(&app, &id_of(&moving), json!({"vendor": to})).await;
    assert_eq!(moved["vendor"], to.as_str());

    assert_eq!(app.performance(&from).await, (0.0, 2.0));
    assert_eq!(app.performance(&to).await, (100.0, 5.0));
}

#[tokio::test]
async fn deleting_an_order_recalculates_its_vendor() {
    let app = TestApp::new().await;
    let vendor_id = id_of(&app.create_vendor("V-1").await);
    completed_order(&app, &vendor_id, "PO-GOOD", EARLY, 5.0).await;
    let late = response_json(
        app.create_purchase_order(
            &vendor_id,
            "PO-LATE",
            json!({"status": "completed", "delivered_date": LATE, "quality_rating": 1.0}),
        )
        .await,
    )
    .await;
    assert_eq!(app.performance(&vendor_id).await, (50.0, 3.0));

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/purchase_orders/{}", id_of(&late)),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(app.performance(&vendor_id).await, (100.0, 5.0));
}

#[tokio::test]
async fn recalculation_is_idempotent() {
    let app = TestApp::new().await;
    let vendor = app.create_vendor("V-1").await;
    let vendor_id = id_of(&vendor);
    completed_order(&app, &vendor_id, "PO-1", EARLY, 4.0).await;
    completed_order(&app, &vendor_id, "PO-2", LATE, 3.0).await;
    completed_order(&app, &vendor_id, "PO-3", LATE, 2.0).await;

    let id = Uuid::parse_str(&vendor_id).expect("uuid");
    let vendors = &app.state.services.vendors;
    let first = vendors.recalculate_performance(id).await.expect("first");
    let second = vendors.recalculate_performance(id).await.expect("second");

    assert_eq!(first, second);
    assert_eq!(
        first,
        VendorPerformance {
            on_time_delivery_rate: (1.0 / 3.0) * 100.0,
            quality_rating_avg: 3.0,
        }
    );
    let (rate, avg) = app.performance(&vendor_id).await;
    assert_eq!(rate, first.on_time_delivery_rate);
    assert_eq!(avg, first.quality_rating_avg);
}

#[tokio::test]
async fn deleting_a_vendor_removes_its_orders() {
    let app = TestApp::new().await;
    let doomed = id_of(&app.create_vendor("V-DOOMED").await);
    let kept = id_of(&app.create_vendor("V-KEPT").await);
    completed_order(&app, &doomed, "PO-D1", EARLY, 4.0).await;
    app.create_purchase_order(&doomed, "PO-D2", json!({})).await;
    app.create_purchase_order(&kept, "PO-K1", json!({})).await;

    let response = app
        .request(Method::DELETE, &format!("/api/v1/vendors/{doomed}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let orphans = purchase_order::Entity::find()
        .filter(purchase_order::Column::VendorId.eq(Uuid::parse_str(&doomed).expect("uuid")))
        .count(app.db())
        .await
        .expect("count orphans");
    assert_eq!(orphans, 0);

    let remaining =
        response_json(app.request(Method::GET, "/api/v1/purchase_orders", None).await).await;
    assert_eq!(remaining.as_array().map(Vec::len), Some(1));
    assert_eq!(remaining[0]["po_number"], "PO-K1");
}

#[tokio::test]
async fn failed_metric_persist_rolls_back_the_order_write() {
    let app = TestApp::new().await;
    let vendor_id = id_of(&app.create_vendor("LOCKED").await);

    app.db()
        .execute_unprepared(
            "CREATE TRIGGER reject_vendor_metrics \
             BEFORE UPDATE OF on_time_delivery_rate ON vendors \
             WHEN NEW.vendor_code = 'LOCKED' \
             BEGIN SELECT RAISE(ABORT, 'vendor metrics locked'); END;",
        )
        .await
        .expect("install trigger");

    let response = app
        .create_purchase_order(
            &vendor_id,
            "PO-LOST",
            json!({"status": "completed", "delivered_date": EARLY, "quality_rating": 5.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        "Write rolled back: vendor metrics could not be persisted"
    );

    let stored = purchase_order::Entity::find()
        .filter(purchase_order::Column::PoNumber.eq("PO-LOST"))
        .count(app.db())
        .await
        .expect("count orders");
    assert_eq!(stored, 0);
    assert_eq!(app.performance(&vendor_id).await, (0.0, 0.0));
}
