//! Property-Based Test Generators
//!
//! Proptest strategies for amounts, account names and path strings.

use proptest::prelude::*;
use rust_decimal::Decimal;

/// Positive amounts with two decimal places, up to ten million
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Signed amounts with two decimal places, zero excluded
pub fn nonzero_amount_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        positive_amount_strategy(),
        positive_amount_strategy().prop_map(|a| -a),
    ]
}

/// Between 1 and `max` leg amounts
pub fn split_amounts_strategy(max: usize) -> impl Strategy<Value = Vec<Decimal>> {
    proptest::collection::vec(positive_amount_strategy(), 1..=max)
}

/// Account names that are valid for the `/` separator
pub fn account_name_strategy() -> impl Strategy<Value = String> + Clone {
    "[a-z][a-z0-9_-]{0,15}"
}

/// Well-formed paths of up to `depth` components
pub fn path_strategy(depth: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(account_name_strategy(), 0..=depth)
}

/// Renders components as a path
pub fn render_path(components: &[String]) -> String {
    if components.is_empty() {
        "/".to_string()
    } else {
        components.iter().map(|c| format!("/{c}")).collect()
    }
}

/// Path strings that break the path syntax
pub fn malformed_path_strategy() -> impl Strategy<Value = String> {
    let name = account_name_strategy();
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        name.clone(),
        name.clone().prop_map(|n| format!("/{n}/")),
        name.clone().prop_map(|n| format!("//{n}")),
        (name.clone(), name).prop_map(|(a, b)| format!("/{a}//{b}")),
    ]
}
