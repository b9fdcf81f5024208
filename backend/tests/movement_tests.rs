//! Stock movement reconciliation tests
//!
//! Tests for the reconciliation rules including:
//! - Entry/exit symmetry of planned stock deltas
//! - Conservation across register -> deactivate/reactivate -> delete
//! - Non-negative clamp on entry reversal
//! - Time-window enforcement for economic edits and deletes

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{
    application_deltas, delete_allowed, economic_edit_allowed, reversal_deltas, total_cost,
    total_price, total_quantity, LineItem, MovementType, StockDelta, StockEffect,
};
use shared::validation::validate_line_items;

/// Build a well-formed line item for the given movement type
fn line(quantity: i32, movement_type: MovementType) -> LineItem {
    let product_id = Uuid::new_v4();
    match movement_type {
        MovementType::Entry => LineItem {
            product_id,
            product_code: None,
            quantity,
            unit_price: None,
            unit_cost: Some(Decimal::from(10)),
        },
        MovementType::Exit => LineItem {
            product_id,
            product_code: None,
            quantity,
            unit_price: Some(Decimal::from(25)),
            unit_cost: None,
        },
    }
}

/// Apply planned deltas to a single product's stock the way the engine
/// does: checked decreases fail, clamped decreases floor at zero.
fn apply(stock: i32, deltas: &[StockDelta]) -> Result<i32, String> {
    let mut stock = stock;
    for delta in deltas {
        stock = match delta.effect {
            StockEffect::Increase { .. } => stock + delta.quantity,
            StockEffect::Decrease => {
                if stock < delta.quantity {
                    return Err(format!(
                        "insufficient stock: requested {}, available {}",
                        delta.quantity, stock
                    ));
                }
                stock - delta.quantity
            }
            StockEffect::DecreaseClamped => (stock - delta.quantity).max(0),
        };
    }
    Ok(stock)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn entry_application_increases_and_touches_last_entry() {
        let items = vec![line(7, MovementType::Entry)];
        let deltas = application_deltas(MovementType::Entry, &items);

        assert_eq!(deltas.len(), 1);
        assert_eq!(
            deltas[0].effect,
            StockEffect::Increase {
                touch_last_entry: true
            }
        );
        assert_eq!(deltas[0].signed_quantity(), 7);
        assert_eq!(apply(10, &deltas).unwrap(), 17);
    }

    #[test]
    fn exit_application_decreases_without_touching_last_entry() {
        let items = vec![line(4, MovementType::Exit)];
        let deltas = application_deltas(MovementType::Exit, &items);

        assert_eq!(deltas[0].effect, StockEffect::Decrease);
        assert_eq!(deltas[0].signed_quantity(), -4);
        assert_eq!(apply(10, &deltas).unwrap(), 6);
    }

    #[test]
    fn exit_reversal_returns_stock() {
        let items = vec![line(4, MovementType::Exit)];
        let deltas = reversal_deltas(MovementType::Exit, &items);

        assert_eq!(
            deltas[0].effect,
            StockEffect::Increase {
                touch_last_entry: false
            }
        );
        assert_eq!(apply(6, &deltas).unwrap(), 10);
    }

    #[test]
    fn entry_reversal_clamps_at_zero() {
        // Intervening exits consumed most of the original entry of 5
        let items = vec![line(5, MovementType::Entry)];
        let deltas = reversal_deltas(MovementType::Entry, &items);

        assert_eq!(deltas[0].effect, StockEffect::DecreaseClamped);
        assert_eq!(apply(2, &deltas).unwrap(), 0);
        assert_eq!(apply(5, &deltas).unwrap(), 0);
        assert_eq!(apply(9, &deltas).unwrap(), 4);
    }

    #[test]
    fn insufficient_stock_rejected_and_stock_unchanged() {
        // Product with stock 5, exit of 8 must fail before mutating
        let items = vec![line(8, MovementType::Exit)];
        let deltas = application_deltas(MovementType::Exit, &items);

        let err = apply(5, &deltas).unwrap_err();
        assert!(err.contains("requested 8"));
        assert!(err.contains("available 5"));
    }

    #[test]
    fn later_lines_see_earlier_lines_effect_on_shared_product() {
        // Two exit lines against the same product: 6 then 5 out of 10.
        // The first succeeds, so only 4 remain for the second.
        let product_id = Uuid::new_v4();
        let items: Vec<LineItem> = [6, 5]
            .into_iter()
            .map(|quantity| LineItem {
                product_id,
                product_code: None,
                quantity,
                unit_price: Some(Decimal::from(25)),
                unit_cost: None,
            })
            .collect();

        let deltas = application_deltas(MovementType::Exit, &items);
        let err = apply(10, &deltas).unwrap_err();
        assert!(err.contains("available 4"));
    }

    #[test]
    fn exit_lifecycle_round_trip() {
        // Product starts at 10. Register exit of 4, deactivate, reactivate,
        // then delete: stock must come back to 10 at each reversal.
        let items = vec![line(4, MovementType::Exit)];
        let application = application_deltas(MovementType::Exit, &items);
        let reversal = reversal_deltas(MovementType::Exit, &items);

        let after_register = apply(10, &application).unwrap();
        assert_eq!(after_register, 6);

        let after_deactivate = apply(after_register, &reversal).unwrap();
        assert_eq!(after_deactivate, 10);

        let after_reactivate = apply(after_deactivate, &application).unwrap();
        assert_eq!(after_reactivate, 6);

        let after_delete = apply(after_reactivate, &reversal).unwrap();
        assert_eq!(after_delete, 10);
    }

    #[test]
    fn economic_edit_window_is_24_hours() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        let within = now - Duration::hours(23);
        assert!(economic_edit_allowed(within, now));

        let boundary = now - Duration::hours(24);
        assert!(economic_edit_allowed(boundary, now));

        let expired = now - Duration::hours(25);
        assert!(!economic_edit_allowed(expired, now));
    }

    #[test]
    fn delete_window_counts_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        assert!(delete_allowed(now - Duration::days(2), now));
        // 3 days and 23 hours is still "3 whole days"
        assert!(delete_allowed(
            now - Duration::days(3) - Duration::hours(23),
            now
        ));
        assert!(!delete_allowed(now - Duration::days(4), now));
    }

    #[test]
    fn totals_derive_from_line_items() {
        let entry_items = vec![
            LineItem {
                product_id: Uuid::new_v4(),
                product_code: None,
                quantity: 3,
                unit_price: None,
                unit_cost: Some(Decimal::new(1050, 2)), // 10.50
            },
            LineItem {
                product_id: Uuid::new_v4(),
                product_code: None,
                quantity: 2,
                unit_price: None,
                unit_cost: Some(Decimal::from(4)),
            },
        ];

        assert_eq!(total_quantity(&entry_items), 5);
        assert_eq!(total_cost(&entry_items), Decimal::new(3950, 2)); // 3*10.50 + 2*4
        assert_eq!(total_price(&entry_items), Decimal::ZERO);

        let exit_items = vec![line(4, MovementType::Exit)];
        assert_eq!(total_price(&exit_items), Decimal::from(100));
    }

    #[test]
    fn movement_type_round_trips_through_strings() {
        assert_eq!(MovementType::parse("entry"), Some(MovementType::Entry));
        assert_eq!(MovementType::parse("exit"), Some(MovementType::Exit));
        assert_eq!(MovementType::parse("transfer"), None);
        assert_eq!(MovementType::Entry.as_str(), "entry");
        assert_eq!(MovementType::Exit.as_str(), "exit");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for positive line quantities
    fn quantity_strategy() -> impl Strategy<Value = i32> {
        1i32..=1000
    }

    fn movement_type_strategy() -> impl Strategy<Value = MovementType> {
        prop_oneof![Just(MovementType::Entry), Just(MovementType::Exit)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Applying a movement and then reversing it restores the starting
        /// stock whenever the application itself was legal.
        #[test]
        fn prop_apply_then_reverse_is_identity(
            movement_type in movement_type_strategy(),
            quantities in prop::collection::vec(quantity_strategy(), 1..8),
            headroom in 0i32..1000
        ) {
            let items: Vec<LineItem> = quantities
                .iter()
                .map(|&q| line(q, movement_type))
                .collect();
            let total: i32 = quantities.iter().sum();

            // Exits need the stock to cover every line
            let start = match movement_type {
                MovementType::Entry => headroom,
                MovementType::Exit => total + headroom,
            };

            let after_apply = apply(start, &application_deltas(movement_type, &items)).unwrap();
            let after_reverse = apply(after_apply, &reversal_deltas(movement_type, &items)).unwrap();

            prop_assert_eq!(after_reverse, start);
        }

        /// Full lifecycle conservation: register, any number of
        /// deactivate/reactivate pairs, then delete.
        #[test]
        fn prop_lifecycle_conserves_stock(
            movement_type in movement_type_strategy(),
            quantity in quantity_strategy(),
            toggles in 0usize..4,
            headroom in 0i32..500
        ) {
            let items = vec![line(quantity, movement_type)];
            let application = application_deltas(movement_type, &items);
            let reversal = reversal_deltas(movement_type, &items);

            let start = match movement_type {
                MovementType::Entry => headroom,
                MovementType::Exit => quantity + headroom,
            };

            // Register
            let mut stock = apply(start, &application).unwrap();

            // Deactivate/reactivate pairs
            for _ in 0..toggles {
                stock = apply(stock, &reversal).unwrap();
                stock = apply(stock, &application).unwrap();
            }

            // Delete
            stock = apply(stock, &reversal).unwrap();

            prop_assert_eq!(stock, start);
        }

        /// Entry reversal never drives stock negative, whatever the
        /// current level is.
        #[test]
        fn prop_entry_reversal_never_negative(
            quantity in quantity_strategy(),
            stock in 0i32..2000
        ) {
            let items = vec![line(quantity, MovementType::Entry)];
            let reversal = reversal_deltas(MovementType::Entry, &items);

            let after = apply(stock, &reversal).unwrap();
            prop_assert!(after >= 0);
            prop_assert_eq!(after, (stock - quantity).max(0));
        }

        /// A failed exit leaves the reported available quantity equal to
        /// the untouched stock.
        #[test]
        fn prop_insufficient_exit_reports_available(
            quantity in quantity_strategy(),
            shortfall in 1i32..100
        ) {
            let stock = (quantity - shortfall).max(0);
            let items = vec![line(quantity, MovementType::Exit)];
            let deltas = application_deltas(MovementType::Exit, &items);

            let err = apply(stock, &deltas).unwrap_err();
            let needle = format!("available {}", stock);
            prop_assert!(err.contains(&needle));
        }

        /// Well-formed line items always pass validation
        #[test]
        fn prop_well_formed_lines_validate(
            movement_type in movement_type_strategy(),
            quantities in prop::collection::vec(quantity_strategy(), 1..10)
        ) {
            let items: Vec<LineItem> = quantities
                .iter()
                .map(|&q| line(q, movement_type))
                .collect();

            prop_assert!(validate_line_items(movement_type, &items).is_ok());
        }

        /// Swapping the required amount field for the other type is always
        /// rejected, naming the offending line.
        #[test]
        fn prop_wrong_amount_field_rejected(
            movement_type in movement_type_strategy(),
            good in 0usize..5,
            quantity in quantity_strategy()
        ) {
            let other = match movement_type {
                MovementType::Entry => MovementType::Exit,
                MovementType::Exit => MovementType::Entry,
            };

            let mut items: Vec<LineItem> =
                (0..good).map(|_| line(quantity, movement_type)).collect();
            items.push(line(quantity, other));

            let violation = validate_line_items(movement_type, &items).unwrap_err();
            prop_assert_eq!(violation.index, good);
        }

        /// The planned deltas preserve line order and quantities
        #[test]
        fn prop_deltas_preserve_order(
            movement_type in movement_type_strategy(),
            quantities in prop::collection::vec(quantity_strategy(), 1..10)
        ) {
            let items: Vec<LineItem> = quantities
                .iter()
                .map(|&q| line(q, movement_type))
                .collect();

            let deltas = application_deltas(movement_type, &items);
            prop_assert_eq!(deltas.len(), items.len());
            for (delta, item) in deltas.iter().zip(&items) {
                prop_assert_eq!(delta.product_id, item.product_id);
                prop_assert_eq!(delta.quantity, item.quantity);
            }
        }
    }
}
