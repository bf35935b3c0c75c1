use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vendor Performance API",
        version = "1.0.0",
        description = r#"
# Vendor Performance API

Tracks vendors and the purchase orders issued to them.

Every purchase order write recalculates the owning vendor's cached metrics
in the same transaction:

- **on_time_delivery_rate**: percentage of completed orders delivered on or before `delivery_date`
- **quality_rating_avg**: mean `quality_rating` of completed orders that have one

## Error Handling

Failures share one body format. `field` names the offending input where there is one:

```json
{
  "error": "Conflict",
  "message": "Duplicate key on po_number: purchase order with po_number 'PO-1' already exists",
  "field": "po_number",
  "request_id": "6f1c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "vendors", description = "Vendor management and performance"),
        (name = "purchase-orders", description = "Purchase order management")
    ),
    paths(
        // Vendors
        crate::handlers::vendors::list_vendors,
        crate::handlers::vendors::create_vendor,
        crate::handlers::vendors::get_vendor,
        crate::handlers::vendors::replace_vendor,
        crate::handlers::vendors::update_vendor,
        crate::handlers::vendors::delete_vendor,
        crate::handlers::vendors::get_vendor_performance,

        // Purchase orders
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::replace_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order,
        crate::handlers::purchase_orders::delete_purchase_order,
    ),
    components(
        schemas(
            crate::entities::vendor::Model,
            crate::entities::purchase_order::Model,
            crate::entities::PurchaseOrderStatus,
            crate::services::vendors::CreateVendorInput,
            crate::services::vendors::UpdateVendorInput,
            crate::services::purchase_orders::CreatePurchaseOrderInput,
            crate::services::purchase_orders::UpdatePurchaseOrderInput,
            crate::services::performance::VendorPerformance,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
