#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use vendor_performance_api::{app_router, config::AppConfig, db, AppState};

/// Helper harness for spinning up the application backed by a scratch SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("vendors_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps every statement of a request on its transaction.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _db_dir: db_dir,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends `body` as-is with a JSON content type.
    pub async fn request_raw(&self, method: Method, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a vendor through the API and returns its JSON body.
    pub async fn create_vendor(&self, vendor_code: &str) -> Value {
        let response = self
            .request(
                Method::POST,
                "/api/v1/vendors",
                Some(json!({
                    "name": format!("Vendor {vendor_code}"),
                    "contact_details": "orders@example.com",
                    "address": "1 Dock Road",
                    "vendor_code": vendor_code,
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await
    }

    /// Creates a purchase order through the API. `overrides` is merged over a
    /// minimal pending order for `vendor_id`.
    pub async fn create_purchase_order(
        &self,
        vendor_id: &str,
        po_number: &str,
        overrides: Value,
    ) -> Response {
        let mut body = json!({
            "po_number": po_number,
            "vendor": vendor_id,
            "delivery_date": PROMISED,
            "items": [{"sku": "BOLT-M8", "qty": 100}],
            "quantity": 100,
        });
        if let (Some(target), Some(extra)) = (body.as_object_mut(), overrides.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }

        self.request(Method::POST, "/api/v1/purchase_orders", Some(body))
            .await
    }

    /// Reads the cached metrics through the performance endpoint.
    pub async fn performance(&self, vendor_id: &str) -> (f64, f64) {
        let response = self
            .request(
                Method::GET,
                &format!("/api/v1/vendors/{vendor_id}/performance"),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        (
            body["on_time_delivery_rate"].as_f64().expect("rate"),
            body["quality_rating_avg"].as_f64().expect("average"),
        )
    }
}

/// Promised delivery time used by the default purchase order.
pub const PROMISED: &str = "2024-03-01T12:00:00Z";
/// Delivered before the promise.
pub const EARLY: &str = "2024-02-28T09:30:00Z";
/// Delivered after the promise.
pub const LATE: &str = "2024-03-04T16:00:00Z";

pub async fn response_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("response body is not UTF-8")
}

pub async fn response_json(response: Response) -> Value {
    serde_json::from_str(&response_text(response).await).expect("response body is not JSON")
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id").to_string()
}
