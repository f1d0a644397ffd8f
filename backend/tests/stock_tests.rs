//! Stock classification, forecast, and adjustment tests

use proptest::prelude::*;

use shared::ledger::{forecast_total, is_low_stock, is_out_of_stock, plan_adjustment};
use shared::models::OperationType;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Counting 8 against a ledgered 10 corrects by -2 and records 2
    #[test]
    fn test_adjustment_down() {
        let plan = plan_adjustment(10, 8);
        assert_eq!(plan.diff, -2);
        assert_eq!(plan.previous_quantity, 10);
        assert_eq!(plan.counted_quantity, 8);
        assert_eq!(plan.audit_quantity(), 2);
        assert!(!plan.is_noop());
    }

    /// Counting above the ledger corrects upward
    #[test]
    fn test_adjustment_up() {
        let plan = plan_adjustment(3, 12);
        assert_eq!(plan.diff, 9);
        assert_eq!(plan.audit_quantity(), 9);
    }

    /// A count matching the ledger is a no-op
    #[test]
    fn test_adjustment_noop() {
        let plan = plan_adjustment(7, 7);
        assert!(plan.is_noop());
        assert_eq!(plan.diff, 0);
        assert_eq!(plan.audit_quantity(), 0);
    }

    /// Counting a never-ledgered product starts from zero
    #[test]
    fn test_adjustment_from_empty_ledger() {
        let plan = plan_adjustment(0, 15);
        assert_eq!(plan.diff, 15);
        assert_eq!(plan.previous_quantity, 0);
    }

    /// Counting down to zero is permitted
    #[test]
    fn test_adjustment_to_zero() {
        let plan = plan_adjustment(9, 0);
        assert_eq!(plan.diff, -9);
        assert_eq!(plan.counted_quantity, 0);
    }

    /// Draft receipts add, draft deliveries subtract, the rest are inert
    #[test]
    fn test_forecast_scenario() {
        let draft_lines = vec![
            (OperationType::Receipt, 5),
            (OperationType::Delivery, 2),
        ];
        assert_eq!(forecast_total(10, draft_lines), 13);
    }

    /// Internal transfers and adjustments never move the forecast
    #[test]
    fn test_forecast_ignores_neutral_types() {
        let draft_lines = vec![
            (OperationType::Internal, 100),
            (OperationType::Adjustment, 40),
        ];
        assert_eq!(forecast_total(10, draft_lines), 10);
    }

    /// Forecast with no draft documents is the current stock
    #[test]
    fn test_forecast_with_no_drafts() {
        assert_eq!(forecast_total(42, Vec::new()), 42);
    }

    /// A forecast may dip below zero when deliveries outweigh stock;
    /// it is a projection, not a ledger balance
    #[test]
    fn test_forecast_can_go_negative() {
        let draft_lines = vec![(OperationType::Delivery, 15)];
        assert_eq!(forecast_total(10, draft_lines), -5);
    }

    /// Low stock requires some stock below the threshold
    #[test]
    fn test_low_stock_boundaries() {
        assert!(is_low_stock(1, 10));
        assert!(is_low_stock(9, 10));
        assert!(!is_low_stock(10, 10));
        assert!(!is_low_stock(11, 10));
        assert!(!is_low_stock(0, 10));
    }

    /// Out of stock means exactly zero
    #[test]
    fn test_out_of_stock_boundaries() {
        assert!(is_out_of_stock(0));
        assert!(!is_out_of_stock(1));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = i64> {
        0i64..=10_000
    }

    fn op_type_strategy() -> impl Strategy<Value = OperationType> {
        prop_oneof![
            Just(OperationType::Receipt),
            Just(OperationType::Delivery),
            Just(OperationType::Internal),
            Just(OperationType::Adjustment),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Applying an adjustment's diff to the previous balance always
        /// lands exactly on the counted quantity
        #[test]
        fn prop_adjustment_lands_on_count(
            current in quantity_strategy(),
            counted in quantity_strategy()
        ) {
            let plan = plan_adjustment(current, counted);
            prop_assert_eq!(plan.previous_quantity + plan.diff, plan.counted_quantity);
            prop_assert_eq!(plan.counted_quantity, counted);
        }

        /// The audit magnitude is the absolute correction
        #[test]
        fn prop_adjustment_audit_magnitude(
            current in quantity_strategy(),
            counted in quantity_strategy()
        ) {
            let plan = plan_adjustment(current, counted);
            prop_assert_eq!(plan.audit_quantity(), (counted - current).abs());
            prop_assert!(plan.audit_quantity() >= 0);
        }

        /// Forecast equals stock plus receipts minus deliveries
        #[test]
        fn prop_forecast_formula(
            total in quantity_strategy(),
            lines in prop::collection::vec((op_type_strategy(), 1i64..=500), 0..12)
        ) {
            let receipts: i64 = lines
                .iter()
                .filter(|(t, _)| *t == OperationType::Receipt)
                .map(|(_, q)| q)
                .sum();
            let deliveries: i64 = lines
                .iter()
                .filter(|(t, _)| *t == OperationType::Delivery)
                .map(|(_, q)| q)
                .sum();

            prop_assert_eq!(forecast_total(total, lines), total + receipts - deliveries);
        }

        /// A product is never low and out of stock at once
        #[test]
        fn prop_stock_classes_exclusive(
            total in quantity_strategy(),
            threshold in 0i64..=10_000
        ) {
            prop_assert!(!(is_low_stock(total, threshold) && is_out_of_stock(total)));
        }
    }
}
