//! Stock ledger commit tests
//!
//! Covers the commit planner that backs operation validation:
//! - boundary-crossing bookkeeping (receipts, deliveries, transfers)
//! - all-or-nothing failure on insufficient stock
//! - non-negativity of balances and aggregate counters

use std::collections::{BTreeMap, HashMap};

use proptest::prelude::*;
use uuid::Uuid;

use shared::ledger::{
    plan_commit, CommitPlan, MovementSide, PlanError,
};
use shared::models::{LocationKind, OperationStatus};

fn uid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// In-memory mirror of the ledger a plan gets applied to
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Ledger {
    quants: HashMap<(Uuid, Uuid), i64>,
    totals: HashMap<Uuid, i64>,
}

impl Ledger {
    fn with_quant(mut self, product: Uuid, location: Uuid, quantity: i64) -> Self {
        self.quants.insert((product, location), quantity);
        *self.totals.entry(product).or_insert(0) += quantity;
        self
    }

    fn quant(&self, product: Uuid, location: Uuid) -> i64 {
        self.quants.get(&(product, location)).copied().unwrap_or(0)
    }

    fn total(&self, product: Uuid) -> i64 {
        self.totals.get(&product).copied().unwrap_or(0)
    }

    fn source_view(&self, location: Uuid) -> BTreeMap<Uuid, i64> {
        self.quants
            .iter()
            .filter(|((_, loc), _)| *loc == location)
            .map(|((product, _), quantity)| (*product, *quantity))
            .collect()
    }

    fn apply(&mut self, plan: &CommitPlan) {
        for delta in &plan.quant_deltas {
            let entry = self
                .quants
                .entry((delta.product_id, delta.location_id))
                .or_insert(0);
            *entry += delta.delta;
        }
        for delta in &plan.total_stock_deltas {
            *self.totals.entry(delta.product_id).or_insert(0) += delta.delta;
        }
    }

    fn assert_non_negative(&self) {
        for ((product, location), quantity) in &self.quants {
            assert!(
                *quantity >= 0,
                "quant for {product} at {location} went negative: {quantity}"
            );
        }
        for (product, total) in &self.totals {
            assert!(*total >= 0, "total for {product} went negative: {total}");
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Receipt into an internal location: quant and aggregate both rise
    #[test]
    fn test_receipt_scenario() {
        let product = uid(1);
        let stock = uid(100);
        let mut ledger = Ledger::default();

        let plan = plan_commit(
            &[(product, 10)],
            None,
            Some(MovementSide::internal(stock)),
            &ledger.source_view(stock),
        )
        .unwrap();
        ledger.apply(&plan);

        assert_eq!(ledger.total(product), 10);
        assert_eq!(ledger.quant(product, stock), 10);
        ledger.assert_non_negative();
    }

    /// Delivery out of an internal location: quant and aggregate both drop
    #[test]
    fn test_delivery_scenario() {
        let product = uid(1);
        let stock = uid(100);
        let mut ledger = Ledger::default().with_quant(product, stock, 10);

        let plan = plan_commit(
            &[(product, 4)],
            Some(MovementSide::internal(stock)),
            None,
            &ledger.source_view(stock),
        )
        .unwrap();
        ledger.apply(&plan);

        assert_eq!(ledger.total(product), 6);
        assert_eq!(ledger.quant(product, stock), 6);
        ledger.assert_non_negative();
    }

    /// A delivery exceeding the balance fails and mutates nothing
    #[test]
    fn test_insufficient_stock_scenario() {
        let product = uid(1);
        let stock = uid(100);
        let ledger = Ledger::default().with_quant(product, stock, 6);
        let before = ledger.clone();

        let result = plan_commit(
            &[(product, 100)],
            Some(MovementSide::internal(stock)),
            None,
            &ledger.source_view(stock),
        );

        assert_eq!(
            result.unwrap_err(),
            PlanError::InsufficientStock {
                product_id: product,
                requested: 100,
                available: 6
            }
        );
        // No plan was produced, so the ledger is untouched
        assert_eq!(ledger, before);
        assert_eq!(ledger.total(product), 6);
        assert_eq!(ledger.quant(product, stock), 6);
    }

    /// Failure on a later line leaves earlier lines unapplied too
    #[test]
    fn test_multi_line_failure_is_atomic() {
        let a = uid(1);
        let b = uid(2);
        let stock = uid(100);
        let ledger = Ledger::default()
            .with_quant(a, stock, 50)
            .with_quant(b, stock, 3);
        let before = ledger.clone();

        let result = plan_commit(
            &[(a, 10), (b, 5)],
            Some(MovementSide::internal(stock)),
            None,
            &ledger.source_view(stock),
        );

        assert!(matches!(
            result,
            Err(PlanError::InsufficientStock { product_id, .. }) if product_id == b
        ));
        assert_eq!(ledger, before);
    }

    /// Internal transfer moves the quant but not the aggregate
    #[test]
    fn test_internal_transfer_scenario() {
        let product = uid(1);
        let rack_a = uid(100);
        let rack_b = uid(101);
        let mut ledger = Ledger::default().with_quant(product, rack_a, 8);

        let plan = plan_commit(
            &[(product, 5)],
            Some(MovementSide::internal(rack_a)),
            Some(MovementSide::internal(rack_b)),
            &ledger.source_view(rack_a),
        )
        .unwrap();
        ledger.apply(&plan);

        assert_eq!(ledger.quant(product, rack_a), 3);
        assert_eq!(ledger.quant(product, rack_b), 5);
        assert_eq!(ledger.total(product), 8);
        ledger.assert_non_negative();
    }

    /// A document with no internal side records nothing
    #[test]
    fn test_external_to_external_records_nothing() {
        let product = uid(1);
        let plan = plan_commit(
            &[(product, 7)],
            Some(MovementSide::external(uid(200))),
            Some(MovementSide::external(uid(201))),
            &BTreeMap::new(),
        )
        .unwrap();

        assert!(plan.is_empty());
    }

    /// Two lines for the same product draw on one shared balance
    #[test]
    fn test_lines_share_source_balance() {
        let product = uid(1);
        let stock = uid(100);
        let ledger = Ledger::default().with_quant(product, stock, 10);

        let result = plan_commit(
            &[(product, 6), (product, 5)],
            Some(MovementSide::internal(stock)),
            None,
            &ledger.source_view(stock),
        );

        assert_eq!(
            result.unwrap_err(),
            PlanError::InsufficientStock {
                product_id: product,
                requested: 5,
                available: 4
            }
        );
    }

    /// Receipt then delivery, chained on the same ledger
    #[test]
    fn test_receipt_then_delivery_chain() {
        let product = uid(1);
        let stock = uid(100);
        let mut ledger = Ledger::default();

        let receipt = plan_commit(
            &[(product, 10)],
            None,
            Some(MovementSide::internal(stock)),
            &ledger.source_view(stock),
        )
        .unwrap();
        ledger.apply(&receipt);

        let delivery = plan_commit(
            &[(product, 4)],
            Some(MovementSide::internal(stock)),
            None,
            &ledger.source_view(stock),
        )
        .unwrap();
        ledger.apply(&delivery);

        assert_eq!(ledger.total(product), 6);
        assert_eq!(ledger.quant(product, stock), 6);
    }

    /// Terminal statuses guard against a second commit
    #[test]
    fn test_done_is_terminal() {
        assert!(OperationStatus::Done.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
        assert!(!OperationStatus::Draft.is_terminal());
        assert!(!OperationStatus::Waiting.is_terminal());
        assert!(!OperationStatus::Ready.is_terminal());
    }

    /// Kind drives internal-ness, not the mere presence of a location
    #[test]
    fn test_external_source_needs_no_balance() {
        let product = uid(1);
        let stock = uid(100);
        let mut ledger = Ledger::default();

        // Receipt from a named external vendor location
        let plan = plan_commit(
            &[(product, 3)],
            Some(MovementSide {
                location_id: uid(200),
                kind: LocationKind::External,
            }),
            Some(MovementSide::internal(stock)),
            &BTreeMap::new(),
        )
        .unwrap();
        ledger.apply(&plan);

        assert_eq!(ledger.quant(product, stock), 3);
        assert_eq!(ledger.total(product), 3);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for a small pool of product ids
    fn product_strategy() -> impl Strategy<Value = Uuid> {
        (1u128..=5).prop_map(uid)
    }

    fn lines_strategy() -> impl Strategy<Value = Vec<(Uuid, i64)>> {
        prop::collection::vec((product_strategy(), -5i64..=50), 0..8)
    }

    fn quants_strategy() -> impl Strategy<Value = BTreeMap<Uuid, i64>> {
        prop::collection::btree_map(product_strategy(), 0i64..=100, 0..5)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A successful delivery plan never drives any balance negative
        #[test]
        fn prop_commit_preserves_non_negativity(
            lines in lines_strategy(),
            quants in quants_strategy()
        ) {
            let stock = uid(100);
            let mut ledger = Ledger::default();
            for (product, quantity) in &quants {
                ledger = ledger.with_quant(*product, stock, *quantity);
            }

            if let Ok(plan) = plan_commit(
                &lines,
                Some(MovementSide::internal(stock)),
                None,
                &quants,
            ) {
                ledger.apply(&plan);
                ledger.assert_non_negative();
            }
        }

        /// Lateral transfers conserve both the per-product sum of quants
        /// and the aggregate counter
        #[test]
        fn prop_transfer_conserves_stock(
            lines in lines_strategy(),
            quants in quants_strategy()
        ) {
            let rack_a = uid(100);
            let rack_b = uid(101);
            let mut ledger = Ledger::default();
            for (product, quantity) in &quants {
                ledger = ledger.with_quant(*product, rack_a, *quantity);
            }
            let totals_before: HashMap<Uuid, i64> = ledger.totals.clone();

            if let Ok(plan) = plan_commit(
                &lines,
                Some(MovementSide::internal(rack_a)),
                Some(MovementSide::internal(rack_b)),
                &quants,
            ) {
                prop_assert!(plan.total_stock_deltas.is_empty());
                ledger.apply(&plan);
                for (product, total) in &totals_before {
                    prop_assert_eq!(ledger.total(*product), *total);
                    prop_assert_eq!(
                        ledger.quant(*product, rack_a) + ledger.quant(*product, rack_b),
                        *total
                    );
                }
                ledger.assert_non_negative();
            }
        }

        /// A receipt raises the aggregate by exactly the valid line sum
        #[test]
        fn prop_receipt_raises_total_by_line_sum(
            lines in lines_strategy()
        ) {
            let stock = uid(100);
            let plan = plan_commit(
                &lines,
                None,
                Some(MovementSide::internal(stock)),
                &BTreeMap::new(),
            ).unwrap();

            let mut expected: HashMap<Uuid, i64> = HashMap::new();
            for (product, quantity) in lines {
                if quantity > 0 {
                    *expected.entry(product).or_insert(0) += quantity;
                }
            }

            let mut actual: HashMap<Uuid, i64> = HashMap::new();
            for delta in &plan.total_stock_deltas {
                actual.insert(delta.product_id, delta.delta);
            }
            prop_assert_eq!(actual, expected);
        }

        /// Quant deltas and aggregate deltas agree for one-sided movements
        #[test]
        fn prop_boundary_crossing_deltas_match(
            lines in lines_strategy(),
            quants in quants_strategy()
        ) {
            let stock = uid(100);
            if let Ok(plan) = plan_commit(
                &lines,
                Some(MovementSide::internal(stock)),
                None,
                &quants,
            ) {
                let quant_sum: HashMap<Uuid, i64> = plan
                    .quant_deltas
                    .iter()
                    .map(|d| (d.product_id, d.delta))
                    .collect();
                for delta in &plan.total_stock_deltas {
                    prop_assert_eq!(
                        quant_sum.get(&delta.product_id).copied().unwrap_or(0),
                        delta.delta
                    );
                }
            }
        }

        /// Planning is deterministic
        #[test]
        fn prop_planning_is_deterministic(
            lines in lines_strategy(),
            quants in quants_strategy()
        ) {
            let stock = uid(100);
            let first = plan_commit(&lines, Some(MovementSide::internal(stock)), None, &quants);
            let second = plan_commit(&lines, Some(MovementSide::internal(stock)), None, &quants);
            prop_assert_eq!(first, second);
        }
    }
}
