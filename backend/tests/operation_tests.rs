//! Operation document tests
//!
//! Covers reference generation helpers, the lifecycle state machine, and
//! the type/status string mappings used at the database boundary.

use proptest::prelude::*;

use shared::models::{OperationStatus, OperationType};
use shared::validation::{format_reference, parse_reference_sequence};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// References carry the per-type prefix and a zero-padded suffix
    #[test]
    fn test_reference_format_per_type() {
        assert_eq!(
            format_reference(OperationType::Receipt.reference_prefix(), 1),
            "WH/IN/0001"
        );
        assert_eq!(
            format_reference(OperationType::Delivery.reference_prefix(), 23),
            "WH/OUT/0023"
        );
        assert_eq!(
            format_reference(OperationType::Internal.reference_prefix(), 104),
            "WH/INT/0104"
        );
        assert_eq!(
            format_reference(OperationType::Adjustment.reference_prefix(), 9999),
            "WH/ADJ/9999"
        );
    }

    /// Padding widens past four digits instead of truncating
    #[test]
    fn test_reference_format_wide_sequence() {
        assert_eq!(format_reference("WH/IN", 12345), "WH/IN/12345");
    }

    /// Prefixes are distinct so references cannot collide across types
    #[test]
    fn test_reference_prefixes_distinct() {
        let types = [
            OperationType::Receipt,
            OperationType::Delivery,
            OperationType::Internal,
            OperationType::Adjustment,
        ];
        for (i, a) in types.iter().enumerate() {
            for b in &types[i + 1..] {
                assert_ne!(a.reference_prefix(), b.reference_prefix());
            }
        }
    }

    /// Parsing rejects foreign prefixes and malformed suffixes
    #[test]
    fn test_parse_reference_sequence() {
        assert_eq!(parse_reference_sequence("WH/IN/0042", "WH/IN"), Some(42));
        assert_eq!(parse_reference_sequence("WH/OUT/0042", "WH/IN"), None);
        assert_eq!(parse_reference_sequence("WH/IN/42b", "WH/IN"), None);
        assert_eq!(parse_reference_sequence("WH/IN", "WH/IN"), None);
    }

    /// Draft and the two pending statuses admit transitions; done and
    /// cancelled do not
    #[test]
    fn test_terminal_statuses() {
        assert!(OperationStatus::Done.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
        assert!(!OperationStatus::Draft.is_terminal());
        assert!(!OperationStatus::Waiting.is_terminal());
        assert!(!OperationStatus::Ready.is_terminal());
    }

    /// String mappings round-trip for every status
    #[test]
    fn test_status_string_round_trip() {
        for status in [
            OperationStatus::Draft,
            OperationStatus::Waiting,
            OperationStatus::Ready,
            OperationStatus::Done,
            OperationStatus::Cancelled,
        ] {
            assert_eq!(OperationStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(OperationStatus::from_str("shipped"), None);
    }

    /// String mappings round-trip for every type
    #[test]
    fn test_type_string_round_trip() {
        for op_type in [
            OperationType::Receipt,
            OperationType::Delivery,
            OperationType::Internal,
            OperationType::Adjustment,
        ] {
            assert_eq!(OperationType::from_str(op_type.as_str()), Some(op_type));
        }
        assert_eq!(OperationType::from_str("return"), None);
    }

    /// Only receipts and deliveries move the forecast
    #[test]
    fn test_forecast_directions() {
        assert_eq!(OperationType::Receipt.forecast_direction(), 1);
        assert_eq!(OperationType::Delivery.forecast_direction(), -1);
        assert_eq!(OperationType::Internal.forecast_direction(), 0);
        assert_eq!(OperationType::Adjustment.forecast_direction(), 0);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

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

        /// Format then parse recovers the sequence for any type
        #[test]
        fn prop_reference_round_trip(
            op_type in op_type_strategy(),
            sequence in 1i64..=1_000_000
        ) {
            let prefix = op_type.reference_prefix();
            let reference = format_reference(prefix, sequence);
            prop_assert_eq!(parse_reference_sequence(&reference, prefix), Some(sequence));
        }

        /// References are strictly ordered within a type once padding
        /// width is respected
        #[test]
        fn prop_reference_sequence_monotonic(
            op_type in op_type_strategy(),
            a in 1i64..=9999,
            b in 1i64..=9999
        ) {
            let prefix = op_type.reference_prefix();
            let ref_a = format_reference(prefix, a);
            let ref_b = format_reference(prefix, b);
            prop_assert_eq!(a < b, ref_a < ref_b);
        }

        /// A reference never parses under another type's prefix
        #[test]
        fn prop_reference_prefix_isolation(
            op_type in op_type_strategy(),
            other in op_type_strategy(),
            sequence in 1i64..=9999
        ) {
            prop_assume!(op_type != other);
            let reference = format_reference(op_type.reference_prefix(), sequence);
            prop_assert_eq!(
                parse_reference_sequence(&reference, other.reference_prefix()),
                None
            );
        }
    }
}
