use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supplier record with its cached performance metrics.
///
/// `on_time_delivery_rate` and `quality_rating_avg` are only ever written by
/// [`crate::services::performance::recalculate_vendor_performance`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Vendor)]
#[sea_orm(table_name = "vendors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[schema(example = "Acme Supplies")]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub contact_details: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    #[sea_orm(unique)]
    #[schema(example = "ACME-001")]
    pub vendor_code: String,
    /// Percentage of completed orders delivered on or before the promised date
    #[schema(example = 87.5)]
    pub on_time_delivery_rate: f64,
    /// Mean quality rating over rated completed orders
    #[schema(example = 4.2)]
    pub quality_rating_avg: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order::Entity")]
    PurchaseOrders,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
