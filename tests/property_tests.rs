//! Property-based tests for the vendor performance computation.
//!
//! These tests use proptest to check the metric bounds and invariants over
//! arbitrary purchase order sets.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use uuid::Uuid;
use vendor_performance_api::{
    entities::{purchase_order, PurchaseOrderStatus},
    services::performance::VendorPerformance,
};

fn status_strategy() -> impl Strategy<Value = PurchaseOrderStatus> {
    prop_oneof![
        Just(PurchaseOrderStatus::Pending),
        Just(PurchaseOrderStatus::Completed),
        Just(PurchaseOrderStatus::Canceled),
    ]
}

/// Hours relative to the promised delivery; `None` means never delivered.
fn delivery_offset_strategy() -> impl Strategy<Value = Option<i64>> {
    prop::option::of(-240i64..240)
}

fn rating_strategy() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(1.0f64..=5.0)
}

fn order_strategy() -> impl Strategy<Value = purchase_order::Model> {
    (status_strategy(), delivery_offset_strategy(), rating_strategy()).prop_map(
        |(status, offset, quality_rating)| {
            let promised = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
            let now = Utc::now();
            purchase_order::Model {
                id: Uuid::new_v4(),
                po_number: format!("PO-{}", Uuid::new_v4()),
                vendor_id: Uuid::nil(),
                order_date: now,
                delivery_date: promised,
                items: json!([]),
                quantity: 1,
                status,
                quality_rating,
                issue_date: now,
                delivered_date: offset.map(|h| promised + Duration::hours(h)),
                created_at: now,
                updated_at: now,
            }
        },
    )
}

fn orders_strategy() -> impl Strategy<Value = Vec<purchase_order::Model>> {
    prop::collection::vec(order_strategy(), 0..40)
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn on_time_rate_is_a_percentage(orders in orders_strategy()) {
        let perf = VendorPerformance::from_orders(&orders);
        prop_assert!((0.0..=100.0).contains(&perf.on_time_delivery_rate));
    }

    #[test]
    fn quality_average_is_zero_or_within_rating_bounds(orders in orders_strategy()) {
        let perf = VendorPerformance::from_orders(&orders);
        let avg = perf.quality_rating_avg;
        prop_assert!(avg == 0.0 || (1.0 - 1e-9..=5.0 + 1e-9).contains(&avg), "avg = {}", avg);
    }

    #[test]
    fn non_completed_orders_do_not_affect_metrics(orders in orders_strategy()) {
        let completed: Vec<_> = orders
            .iter()
            .filter(|o| o.status == PurchaseOrderStatus::Completed)
            .cloned()
            .collect();
        prop_assert_eq!(
            VendorPerformance::from_orders(&orders),
            VendorPerformance::from_orders(&completed)
        );
    }

    #[test]
    fn metrics_do_not_depend_on_order(orders in orders_strategy()) {
        let forward = VendorPerformance::from_orders(&orders);
        let mut reversed = orders.clone();
        reversed.reverse();
        let backward = VendorPerformance::from_orders(&reversed);

        prop_assert!(approx_eq(forward.on_time_delivery_rate, backward.on_time_delivery_rate));
        prop_assert!(approx_eq(forward.quality_rating_avg, backward.quality_rating_avg));
    }

    #[test]
    fn without_completed_orders_metrics_are_zero(
        orders in prop::collection::vec(order_strategy(), 0..20)
    ) {
        let open: Vec<_> = orders
            .into_iter()
            .filter(|o| o.status != PurchaseOrderStatus::Completed)
            .collect();
        prop_assert_eq!(VendorPerformance::from_orders(&open), VendorPerformance::default());
    }

    #[test]
    fn all_on_time_orders_give_full_rate(
        offsets in prop::collection::vec(-100i64..=0, 1..20)
    ) {
        let promised = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let orders: Vec<_> = offsets
            .iter()
            .map(|h| {
                let now = Utc::now();
                purchase_order::Model {
                    id: Uuid::new_v4(),
                    po_number: format!("PO-{}", Uuid::new_v4()),
                    vendor_id: Uuid::nil(),
                    order_date: now,
                    delivery_date: promised,
                    items: json!({}),
                    quantity: 1,
                    status: PurchaseOrderStatus::Completed,
                    quality_rating: None,
                    issue_date: now,
                    delivered_date: Some(promised + Duration::hours(*h)),
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect();
        let perf = VendorPerformance::from_orders(&orders);
        prop_assert_eq!(perf.on_time_delivery_rate, 100.0);
        prop_assert_eq!(perf.quality_rating_avg, 0.0);
    }
}
