use crate::{
    db::DbPool,
    entities::{purchase_order, vendor, PurchaseOrderStatus},
    errors::ServiceError,
    services::{contains_pattern, not_blank, performance::recalculate_vendor_performance},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const QUALITY_RATING_MIN: f64 = 1.0;
const QUALITY_RATING_MAX: f64 = 5.0;

/// Body of a purchase order create or full replace
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderInput {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    #[schema(example = "PO-2024-0001")]
    pub po_number: String,
    /// Id of the owning vendor
    #[serde(rename = "vendor")]
    pub vendor_id: Uuid,
    /// Defaults to the time of creation
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    pub delivery_date: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub items: Value,
    pub quantity: i32,
    #[serde(default)]
    pub status: PurchaseOrderStatus,
    /// Between 1.0 and 5.0 when present
    #[serde(default)]
    pub quality_rating: Option<f64>,
    /// Defaults to the time of creation
    #[serde(default)]
    pub issue_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_date: Option<DateTime<Utc>>,
}

/// Partial purchase order update.
///
/// For `quality_rating` and `delivered_date` an absent key leaves the stored
/// value alone while an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrderInput {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub po_number: Option<String>,
    #[serde(default, rename = "vendor")]
    pub vendor_id: Option<Uuid>,
    pub order_date: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<Object>)]
    pub items: Option<Value>,
    pub quantity: Option<i32>,
    pub status: Option<PurchaseOrderStatus>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub quality_rating: Option<Option<f64>>,
    pub issue_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub delivered_date: Option<Option<DateTime<Utc>>>,
}

impl From<CreatePurchaseOrderInput> for UpdatePurchaseOrderInput {
    /// Replacement semantics: omitted nullable fields are cleared, omitted
    /// `order_date`/`issue_date` keep their stored values.
    fn from(input: CreatePurchaseOrderInput) -> Self {
        Self {
            po_number: Some(input.po_number),
            vendor_id: Some(input.vendor_id),
            order_date: input.order_date,
            delivery_date: Some(input.delivery_date),
            items: Some(input.items),
            quantity: Some(input.quantity),
            status: Some(input.status),
            quality_rating: Some(input.quality_rating),
            issue_date: input.issue_date,
            delivered_date: Some(input.delivered_date),
        }
    }
}

/// Query filter for listing purchase orders
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseOrderFilter {
    /// Only orders of this vendor
    pub vendor: Option<Uuid>,
    /// Only orders in this status
    pub status: Option<PurchaseOrderStatus>,
    /// Case-insensitive substring of po_number or the vendor's name
    pub search: Option<String>,
}

/// Distinguishes a missing key (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_quality_rating(rating: Option<f64>) -> Result<(), ServiceError> {
    match rating {
        Some(value) if !(QUALITY_RATING_MIN..=QUALITY_RATING_MAX).contains(&value) => Err(
            ServiceError::validation("quality_rating", "Quality rating must be between 1 and 5."),
        ),
        _ => Ok(()),
    }
}

fn check_items(items: &Value) -> Result<(), ServiceError> {
    if items.is_object() || items.is_array() {
        Ok(())
    } else {
        Err(ServiceError::validation(
            "items",
            "items must be a JSON object or array",
        ))
    }
}

/// Purchase order store. Every write recalculates the affected vendor's
/// metrics inside the same transaction.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DbPool>,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(
        skip(self, input),
        fields(po_number = %input.po_number, vendor_id = %input.vendor_id)
    )]
    pub async fn create_purchase_order(
        &self,
        input: CreatePurchaseOrderInput,
    ) -> Result<purchase_order::Model, ServiceError> {
        input.validate()?;
        check_quality_rating(input.quality_rating)?;
        check_items(&input.items)?;

        let txn = self.db.begin().await?;
        ensure_vendor_exists(&txn, input.vendor_id).await?;
        ensure_po_number_available(&txn, &input.po_number, None).await?;

        let now = Utc::now();
        let created = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_number: Set(input.po_number),
            vendor_id: Set(input.vendor_id),
            order_date: Set(input.order_date.unwrap_or(now)),
            delivery_date: Set(input.delivery_date),
            items: Set(input.items),
            quantity: Set(input.quantity),
            status: Set(input.status),
            quality_rating: Set(input.quality_rating),
            issue_date: Set(input.issue_date.unwrap_or(now)),
            delivered_date: Set(input.delivered_date),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_unique_violation(e, "po_number"))?;

        recalculate_vendor_performance(&txn, created.vendor_id).await?;
        txn.commit().await?;

        counter!("vendor_api.purchase_orders.created", 1);
        info!(
            purchase_order_id = %created.id,
            status = %created.status,
            "Purchase order created"
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_purchase_order(
        &self,
        purchase_order_id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        find_purchase_order(&*self.db, purchase_order_id).await
    }

    /// Lists purchase orders oldest first, narrowed by the filter's vendor,
    /// status and search term
    #[instrument(skip(self))]
    pub async fn list_purchase_orders(
        &self,
        filter: PurchaseOrderFilter,
    ) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let mut query = purchase_order::Entity::find();
        if let Some(vendor_id) = filter.vendor {
            query = query.filter(purchase_order::Column::VendorId.eq(vendor_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            let po_number = Expr::col((purchase_order::Entity, purchase_order::Column::PoNumber));
            let vendor_name = Expr::col((vendor::Entity, vendor::Column::Name));
            query = query.inner_join(vendor::Entity).filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(po_number)).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(vendor_name)).like(pattern)),
            );
        }

        let orders = query
            .order_by_asc(purchase_order::Column::CreatedAt)
            .order_by_asc(purchase_order::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(orders)
    }

    /// Applies the fields present in `patch`. Moving the order to another
    /// vendor recalculates both vendors.
    #[instrument(skip(self, patch))]
    pub async fn update_purchase_order(
        &self,
        purchase_order_id: Uuid,
        patch: UpdatePurchaseOrderInput,
    ) -> Result<purchase_order::Model, ServiceError> {
        patch.validate()?;
        if let Some(rating) = patch.quality_rating {
            check_quality_rating(rating)?;
        }
        if let Some(items) = patch.items.as_ref() {
            check_items(items)?;
        }

        let txn = self.db.begin().await?;
        let existing = find_purchase_order(&txn, purchase_order_id).await?;
        let previous_vendor = existing.vendor_id;

        if let Some(vendor_id) = patch.vendor_id {
            if vendor_id != previous_vendor {
                ensure_vendor_exists(&txn, vendor_id).await?;
            }
        }
        if let Some(po_number) = patch.po_number.as_deref() {
            if po_number != existing.po_number {
                ensure_po_number_available(&txn, po_number, Some(purchase_order_id)).await?;
            }
        }

        let mut active: purchase_order::ActiveModel = existing.into();
        if let Some(po_number) = patch.po_number {
            active.po_number = Set(po_number);
        }
        if let Some(vendor_id) = patch.vendor_id {
            active.vendor_id = Set(vendor_id);
        }
        if let Some(order_date) = patch.order_date {
            active.order_date = Set(order_date);
        }
        if let Some(delivery_date) = patch.delivery_date {
            active.delivery_date = Set(delivery_date);
        }
        if let Some(items) = patch.items {
            active.items = Set(items);
        }
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(quality_rating) = patch.quality_rating {
            active.quality_rating = Set(quality_rating);
        }
        if let Some(issue_date) = patch.issue_date {
            active.issue_date = Set(issue_date);
        }
        if let Some(delivered_date) = patch.delivered_date {
            active.delivered_date = Set(delivered_date);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ServiceError::from_unique_violation(e, "po_number"))?;

        recalculate_vendor_performance(&txn, updated.vendor_id).await?;
        if updated.vendor_id != previous_vendor {
            recalculate_vendor_performance(&txn, previous_vendor).await?;
        }
        txn.commit().await?;

        info!(
            purchase_order_id = %purchase_order_id,
            status = %updated.status,
            "Purchase order updated"
        );
        Ok(updated)
    }

    /// Full replacement of the client-writable fields
    pub async fn replace_purchase_order(
        &self,
        purchase_order_id: Uuid,
        input: CreatePurchaseOrderInput,
    ) -> Result<purchase_order::Model, ServiceError> {
        self.update_purchase_order(purchase_order_id, input.into())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_purchase_order(&self, purchase_order_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = find_purchase_order(&txn, purchase_order_id).await?;
        let vendor_id = existing.vendor_id;

        existing.delete(&txn).await?;
        recalculate_vendor_performance(&txn, vendor_id).await?;
        txn.commit().await?;

        counter!("vendor_api.purchase_orders.deleted", 1);
        info!(purchase_order_id = %purchase_order_id, "Purchase order deleted");
        Ok(())
    }
}

async fn find_purchase_order<C: ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    purchase_order::Entity::find_by_id(purchase_order_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Purchase order {} not found", purchase_order_id))
        })
}

/// A vendor referenced from a request body must exist
async fn ensure_vendor_exists<C: ConnectionTrait>(
    conn: &C,
    vendor_id: Uuid,
) -> Result<(), ServiceError> {
    match vendor::Entity::find_by_id(vendor_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::validation(
            "vendor",
            format!("vendor {} does not exist", vendor_id),
        )),
    }
}

async fn ensure_po_number_available<C: ConnectionTrait>(
    conn: &C,
    po_number: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query =
        purchase_order::Entity::find().filter(purchase_order::Column::PoNumber.eq(po_number));
    if let Some(id) = exclude {
        query = query.filter(purchase_order::Column::Id.ne(id));
    }

    if query.one(conn).await?.is_some() {
        return Err(ServiceError::duplicate(
            "po_number",
            format!("purchase order with po_number '{}' already exists", po_number),
        ));
    }
    Ok(())
}
