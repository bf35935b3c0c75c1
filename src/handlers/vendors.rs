use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    ApiJson, ApiPath, ApiQuery,
};
use crate::{
    entities::vendor,
    errors::{ApiError, ErrorResponse},
    handlers::AppState,
    services::{
        performance::VendorPerformance,
        vendors::{CreateVendorInput, UpdateVendorInput},
    },
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

/// Query parameters for listing vendors
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VendorListParams {
    /// Case-insensitive substring of name or vendor code
    pub search: Option<String>,
}

/// Vendor routes, mounted at `/api/v1/vendors`
pub fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vendors).post(create_vendor))
        .route(
            "/{id}",
            get(get_vendor)
                .put(replace_vendor)
                .patch(update_vendor)
                .delete(delete_vendor),
        )
        .route("/{id}/performance", get(get_vendor_performance))
}

/// List vendors
#[utoipa::path(
    get,
    path = "/api/v1/vendors",
    params(VendorListParams),
    responses(
        (status = 200, description = "Vendors listed", body = [vendor::Model])
    ),
    tag = "vendors"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<VendorListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let vendors = state
        .services
        .vendors
        .list_vendors(params.search.as_deref())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendors))
}

/// Create a vendor
#[utoipa::path(
    post,
    path = "/api/v1/vendors",
    request_body = CreateVendorInput,
    responses(
        (status = 201, description = "Vendor created", body = vendor::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Duplicate vendor_code", body = ErrorResponse)
    ),
    tag = "vendors"
)]
pub async fn create_vendor(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateVendorInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let vendor = state
        .services
        .vendors
        .create_vendor(payload)
        .await
        .map_err(map_service_error)?;

    info!("Vendor created: {}", vendor.id);
    Ok(created_response(vendor))
}

/// Get a vendor by ID
#[utoipa::path(
    get,
    path = "/api/v1/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor fetched", body = vendor::Model),
        (status = 404, description = "Vendor not found", body = ErrorResponse)
    ),
    tag = "vendors"
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    ApiPath(vendor_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let vendor = state
        .services
        .vendors
        .get_vendor(vendor_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendor))
}

/// Replace a vendor
#[utoipa::path(
    put,
    path = "/api/v1/vendors/{id}",
    request_body = CreateVendorInput,
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor replaced", body = vendor::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Vendor not found", body = ErrorResponse),
        (status = 409, description = "Duplicate vendor_code", body = ErrorResponse)
    ),
    tag = "vendors"
)]
pub async fn replace_vendor(
    State(state): State<AppState>,
    ApiPath(vendor_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateVendorInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let vendor = state
        .services
        .vendors
        .replace_vendor(vendor_id, payload)
        .await
        .map_err(map_service_error)?;

    info!("Vendor replaced: {}", vendor_id);
    Ok(success_response(vendor))
}

/// Partially update a vendor
#[utoipa::path(
    patch,
    path = "/api/v1/vendors/{id}",
    request_body = UpdateVendorInput,
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor updated", body = vendor::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Vendor not found", body = ErrorResponse),
        (status = 409, description = "Duplicate vendor_code", body = ErrorResponse)
    ),
    tag = "vendors"
)]
pub async fn update_vendor(
    State(state): State<AppState>,
    ApiPath(vendor_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateVendorInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let vendor = state
        .services
        .vendors
        .update_vendor(vendor_id, payload)
        .await
        .map_err(map_service_error)?;

    info!("Vendor updated: {}", vendor_id);
    Ok(success_response(vendor))
}

/// Delete a vendor and all of its purchase orders
#[utoipa::path(
    delete,
    path = "/api/v1/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 204, description = "Vendor deleted"),
        (status = 404, description = "Vendor not found", body = ErrorResponse)
    ),
    tag = "vendors"
)]
pub async fn delete_vendor(
    State(state): State<AppState>,
    ApiPath(vendor_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .vendors
        .delete_vendor(vendor_id)
        .await
        .map_err(map_service_error)?;

    info!("Vendor deleted: {}", vendor_id);
    Ok(no_content_response())
}

/// Cached performance metrics of a vendor
#[utoipa::path(
    get,
    path = "/api/v1/vendors/{id}/performance",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor performance", body = VendorPerformance),
        (status = 404, description = "Vendor not found", body = ErrorResponse)
    ),
    tag = "vendors"
)]
pub async fn get_vendor_performance(
    State(state): State<AppState>,
    ApiPath(vendor_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let performance = state
        .services
        .vendors
        .get_performance(vendor_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(performance))
}
