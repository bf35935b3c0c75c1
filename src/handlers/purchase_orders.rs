use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    ApiJson, ApiPath, ApiQuery,
};
use crate::{
    entities::purchase_order,
    errors::{ApiError, ErrorResponse},
    handlers::AppState,
    services::purchase_orders::{
        CreatePurchaseOrderInput, PurchaseOrderFilter, UpdatePurchaseOrderInput,
    },
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Purchase order routes, mounted at `/api/v1/purchase_orders`
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route(
            "/{id}",
            get(get_purchase_order)
                .put(replace_purchase_order)
                .patch(update_purchase_order)
                .delete(delete_purchase_order),
        )
}

/// List purchase orders, optionally filtered by vendor and status
#[utoipa::path(
    get,
    path = "/api/v1/purchase_orders",
    params(PurchaseOrderFilter),
    responses(
        (status = 200, description = "Purchase orders listed", body = [purchase_order::Model]),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<PurchaseOrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .purchase_orders
        .list_purchase_orders(filter)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// Create a purchase order and recalculate its vendor's metrics
#[utoipa::path(
    post,
    path = "/api/v1/purchase_orders",
    request_body = CreatePurchaseOrderInput,
    responses(
        (status = 201, description = "Purchase order created", body = purchase_order::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Duplicate po_number", body = ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .create_purchase_order(payload)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order created: {}", order.id);
    Ok(created_response(order))
}

/// Get a purchase order by ID
#[utoipa::path(
    get,
    path = "/api/v1/purchase_orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order fetched", body = purchase_order::Model),
        (status = 404, description = "Purchase order not found", body = ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    ApiPath(po_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .get_purchase_order(po_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Replace a purchase order
#[utoipa::path(
    put,
    path = "/api/v1/purchase_orders/{id}",
    request_body = CreatePurchaseOrderInput,
    params(
        ("id" = Uuid, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order replaced", body = purchase_order::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Purchase order not found", body = ErrorResponse),
        (status = 409, description = "Duplicate po_number", body = ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn replace_purchase_order(
    State(state): State<AppState>,
    ApiPath(po_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreatePurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .replace_purchase_order(po_id, payload)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order replaced: {}", po_id);
    Ok(success_response(order))
}

/// Partially update a purchase order
#[utoipa::path(
    patch,
    path = "/api/v1/purchase_orders/{id}",
    request_body = UpdatePurchaseOrderInput,
    params(
        ("id" = Uuid, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order updated", body = purchase_order::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Purchase order not found", body = ErrorResponse),
        (status = 409, description = "Duplicate po_number", body = ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    ApiPath(po_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdatePurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .update_purchase_order(po_id, payload)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order updated: {}", po_id);
    Ok(success_response(order))
}

/// Delete a purchase order
#[utoipa::path(
    delete,
    path = "/api/v1/purchase_orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 204, description = "Purchase order deleted"),
        (status = 404, description = "Purchase order not found", body = ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    ApiPath(po_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .purchase_orders
        .delete_purchase_order(po_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order deleted: {}", po_id);
    Ok(no_content_response())
}
