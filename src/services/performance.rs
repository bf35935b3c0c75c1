//! Vendor performance metrics.
//!
//! The computation is a pure function over a vendor's purchase orders. The
//! persistence step runs on whatever connection it is handed, so callers pass
//! their open transaction and the metrics commit or roll back together with
//! the purchase-order write that triggered them.

use crate::entities::{purchase_order, vendor, PurchaseOrderStatus};
use crate::errors::ServiceError;
use metrics::{counter, histogram};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Cached performance metrics of a vendor
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VendorPerformance {
    /// Percentage (0-100) of completed orders delivered on or before `delivery_date`
    #[schema(example = 50.0)]
    pub on_time_delivery_rate: f64,
    /// Mean `quality_rating` of completed orders that carry one, 0.0 without data
    #[schema(example = 4.0)]
    pub quality_rating_avg: f64,
}

impl VendorPerformance {
    /// Derives metrics from a vendor's orders. Orders that are not completed
    /// are ignored, so the full order set may be passed in.
    pub fn from_orders<'a, I>(orders: I) -> Self
    where
        I: IntoIterator<Item = &'a purchase_order::Model>,
    {
        let mut completed = 0usize;
        let mut on_time = 0usize;
        let mut rated = 0usize;
        let mut rating_sum = 0.0f64;

        for order in orders.into_iter().filter(|o| o.is_completed()) {
            completed += 1;
            if order.delivered_on_time() {
                on_time += 1;
            }
            if let Some(rating) = order.quality_rating {
                rated += 1;
                rating_sum += rating;
            }
        }

        if completed == 0 {
            return Self::default();
        }

        let quality_rating_avg = if rated == 0 {
            0.0
        } else {
            rating_sum / rated as f64
        };

        Self {
            on_time_delivery_rate: (on_time as f64 / completed as f64) * 100.0,
            quality_rating_avg,
        }
    }
}

impl From<&vendor::Model> for VendorPerformance {
    fn from(vendor: &vendor::Model) -> Self {
        Self {
            on_time_delivery_rate: vendor.on_time_delivery_rate,
            quality_rating_avg: vendor.quality_rating_avg,
        }
    }
}

/// Recomputes a vendor's metrics from its completed orders and writes them
/// onto the vendor row, even when the values are unchanged.
///
/// Reads and writes go through `conn`. A failed write is reported as
/// `ConsistencyError` and the caller must abandon its transaction.
#[instrument(skip(conn))]
pub async fn recalculate_vendor_performance<C>(
    conn: &C,
    vendor_id: Uuid,
) -> Result<VendorPerformance, ServiceError>
where
    C: ConnectionTrait,
{
    let started = Instant::now();
    let vendor = vendor::Entity::find_by_id(vendor_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))?;

    let completed = purchase_order::Entity::find()
        .filter(purchase_order::Column::VendorId.eq(vendor_id))
        .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Completed))
        .all(conn)
        .await?;

    let performance = VendorPerformance::from_orders(&completed);
    debug!(
        completed_orders = completed.len(),
        on_time_delivery_rate = performance.on_time_delivery_rate,
        quality_rating_avg = performance.quality_rating_avg,
        "recalculated vendor performance"
    );

    let mut active: vendor::ActiveModel = vendor.into();
    active.on_time_delivery_rate = Set(performance.on_time_delivery_rate);
    active.quality_rating_avg = Set(performance.quality_rating_avg);
    active.update(conn).await.map_err(|e| {
        error!(vendor_id = %vendor_id, error = %e, "failed to persist vendor metrics");
        counter!("vendor_api.performance.persist_failures", 1);
        ServiceError::ConsistencyError(format!(
            "metrics for vendor {} could not be persisted: {}",
            vendor_id, e
        ))
    })?;

    counter!("vendor_api.performance.recalculations", 1);
    histogram!(
        "vendor_api.performance.recalculation_ms",
        started.elapsed().as_secs_f64() * 1000.0
    );
    Ok(performance)
}
