use crate::{
    db::DbPool,
    entities::{purchase_order, vendor},
    errors::ServiceError,
    services::{
        contains_pattern,
        not_blank,
        performance::{recalculate_vendor_performance, VendorPerformance},
    },
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Body of a vendor create or full replace. Metric fields are not accepted
/// from clients and are dropped during deserialization.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateVendorInput {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    #[schema(example = "Acme Supplies")]
    pub name: String,
    #[schema(example = "jane@acme.test, +1 555 0100")]
    pub contact_details: String,
    #[schema(example = "1 Industrial Way, Springfield")]
    pub address: String,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    #[schema(example = "ACME-001")]
    pub vendor_code: String,
}

/// Partial vendor update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateVendorInput {
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    pub name: Option<String>,
    pub contact_details: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub vendor_code: Option<String>,
}

impl From<CreateVendorInput> for UpdateVendorInput {
    fn from(input: CreateVendorInput) -> Self {
        Self {
            name: Some(input.name),
            contact_details: Some(input.contact_details),
            address: Some(input.address),
            vendor_code: Some(input.vendor_code),
        }
    }
}

/// Vendor store
#[derive(Clone)]
pub struct VendorService {
    db: Arc<DbPool>,
}

impl VendorService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Creates a vendor with zeroed metrics
    #[instrument(skip(self, input), fields(vendor_code = %input.vendor_code))]
    pub async fn create_vendor(
        &self,
        input: CreateVendorInput,
    ) -> Result<vendor::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        ensure_vendor_code_available(&txn, &input.vendor_code, None).await?;

        let now = Utc::now();
        let created = vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            contact_details: Set(input.contact_details),
            address: Set(input.address),
            vendor_code: Set(input.vendor_code),
            on_time_delivery_rate: Set(0.0),
            quality_rating_avg: Set(0.0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_unique_violation(e, "vendor_code"))?;

        txn.commit().await?;

        counter!("vendor_api.vendors.created", 1);
        info!(vendor_id = %created.id, "Vendor created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_vendor(&self, vendor_id: Uuid) -> Result<vendor::Model, ServiceError> {
        find_vendor(&*self.db, vendor_id).await
    }

    /// Lists vendors oldest first, optionally filtered by a case-insensitive
    /// substring of name or vendor code
    #[instrument(skip(self))]
    pub async fn list_vendors(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<vendor::Model>, ServiceError> {
        let mut query = vendor::Entity::find();

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(vendor::Column::Name)))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(vendor::Column::VendorCode)))
                            .like(pattern),
                    ),
            );
        }

        let vendors = query
            .order_by_asc(vendor::Column::CreatedAt)
            .order_by_asc(vendor::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(vendors)
    }

    /// Applies the fields present in `patch`
    #[instrument(skip(self, patch))]
    pub async fn update_vendor(
        &self,
        vendor_id: Uuid,
        patch: UpdateVendorInput,
    ) -> Result<vendor::Model, ServiceError> {
        patch.validate()?;

        let txn = self.db.begin().await?;
        let existing = find_vendor(&txn, vendor_id).await?;

        if let Some(code) = patch.vendor_code.as_deref() {
            if code != existing.vendor_code {
                ensure_vendor_code_available(&txn, code, Some(vendor_id)).await?;
            }
        }

        let mut active: vendor::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(contact_details) = patch.contact_details {
            active.contact_details = Set(contact_details);
        }
        if let Some(address) = patch.address {
            active.address = Set(address);
        }
        if let Some(vendor_code) = patch.vendor_code {
            active.vendor_code = Set(vendor_code);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| ServiceError::from_unique_violation(e, "vendor_code"))?;

        txn.commit().await?;

        info!(vendor_id = %vendor_id, "Vendor updated");
        Ok(updated)
    }

    /// Full replacement of the client-writable fields
    pub async fn replace_vendor(
        &self,
        vendor_id: Uuid,
        input: CreateVendorInput,
    ) -> Result<vendor::Model, ServiceError> {
        input.validate()?;
        self.update_vendor(vendor_id, input.into()).await
    }

    /// Deletes the vendor together with all of its purchase orders
    #[instrument(skip(self))]
    pub async fn delete_vendor(&self, vendor_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = find_vendor(&txn, vendor_id).await?;

        let removed = purchase_order::Entity::delete_many()
            .filter(purchase_order::Column::VendorId.eq(vendor_id))
            .exec(&txn)
            .await?;
        existing.delete(&txn).await?;

        txn.commit().await?;

        counter!("vendor_api.vendors.deleted", 1);
        info!(
            vendor_id = %vendor_id,
            purchase_orders_removed = removed.rows_affected,
            "Vendor deleted"
        );
        Ok(())
    }

    /// Cached metrics as of the last recalculation
    #[instrument(skip(self))]
    pub async fn get_performance(
        &self,
        vendor_id: Uuid,
    ) -> Result<VendorPerformance, ServiceError> {
        let vendor = find_vendor(&*self.db, vendor_id).await?;
        Ok(VendorPerformance::from(&vendor))
    }

    /// Recomputes and stores the vendor's metrics
    #[instrument(skip(self))]
    pub async fn recalculate_performance(
        &self,
        vendor_id: Uuid,
    ) -> Result<VendorPerformance, ServiceError> {
        let txn = self.db.begin().await?;
        let performance = recalculate_vendor_performance(&txn, vendor_id).await?;
        txn.commit().await?;
        Ok(performance)
    }
}

pub(crate) async fn find_vendor<C: ConnectionTrait>(
    conn: &C,
    vendor_id: Uuid,
) -> Result<vendor::Model, ServiceError> {
    vendor::Entity::find_by_id(vendor_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))
}

async fn ensure_vendor_code_available<C: ConnectionTrait>(
    conn: &C,
    vendor_code: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = vendor::Entity::find().filter(vendor::Column::VendorCode.eq(vendor_code));
    if let Some(id) = exclude {
        query = query.filter(vendor::Column::Id.ne(id));
    }

    if query.one(conn).await?.is_some() {
        return Err(ServiceError::duplicate(
            "vendor_code",
            format!("vendor with vendor_code '{}' already exists", vendor_code),
        ));
    }
    Ok(())
}
