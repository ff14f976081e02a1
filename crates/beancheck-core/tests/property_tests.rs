//! Property-based tests for beancheck-core.
//!
//! Run with: cargo test -p beancheck-core --test `property_tests`

use beancheck_core::{Amount, DisplayContext, Inventory};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn arb_decimal() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64, 0u32..5).prop_map(|(n, scale)| Decimal::new(n, scale))
}

fn arb_currency() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("USD".to_string()),
        Just("EUR".to_string()),
        Just("AAPL".to_string()),
    ]
}

fn arb_amount() -> impl Strategy<Value = Amount> {
    (arb_decimal(), arb_currency()).prop_map(|(n, c)| Amount::new(n, c))
}

proptest! {
    #[test]
    fn amount_display_keeps_written_digits(n in arb_decimal(), c in arb_currency()) {
        let amount = Amount::new(n, c.clone());
        prop_assert_eq!(amount.to_string(), format!("{n} {c}"));
    }

    #[test]
    fn inventory_units_equal_sum(amounts in prop::collection::vec(arb_amount(), 0..20)) {
        let mut inv = Inventory::new();
        for amount in &amounts {
            inv.add(amount);
        }
        for currency in ["USD", "EUR", "AAPL"] {
            let expected: Decimal = amounts
                .iter()
                .filter(|a| a.currency == currency)
                .map(|a| a.number)
                .sum();
            prop_assert_eq!(inv.units(currency), expected);
        }
        prop_assert!(inv.positions().iter().all(|p| !p.is_zero()));
    }

    #[test]
    fn display_context_uses_a_seen_precision(numbers in prop::collection::vec(arb_decimal(), 1..10)) {
        let mut ctx = DisplayContext::new();
        for n in &numbers {
            ctx.update(*n, "USD");
        }
        let precision = ctx.precision("USD").unwrap();
        prop_assert!(numbers.iter().any(|n| n.scale() == precision));
    }
}
