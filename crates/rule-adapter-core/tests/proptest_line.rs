// crates/rule-adapter-core/tests/proptest_line.rs
// ============================================================================
// Module: Policy Line Property-Based Tests
// Description: Property tests for the row-to-line codec and line parser.
// Purpose: Show escaped lines parse back to exactly the stored values.
// ============================================================================

//! Property-based tests for policy line escaping.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use rule_adapter_core::StoredRow;
use rule_adapter_core::escape_value;
use rule_adapter_core::line::is_quoted;
use rule_adapter_core::parse_policy_line;

fn value_strategy() -> impl Strategy<Value = String> {
    ".{0,12}".prop_filter("already-quoted values pass through verbatim", |value| !is_quoted(value))
}

proptest! {
    #[test]
    fn escaped_lines_parse_to_stored_values(
        ptype in "[pg][0-9]?",
        values in prop::collection::vec(value_strategy(), 1 ..= 6),
    ) {
        let row = StoredRow::encode(&ptype, &values);
        let fields = parse_policy_line(&row.decode(true)).unwrap();
        prop_assert_eq!(&fields[0], &ptype);
        prop_assert_eq!(&fields[1 ..], values.as_slice());
    }

    #[test]
    fn escaping_is_idempotent(value in ".{0,12}") {
        let once = escape_value(&value).into_owned();
        let twice = escape_value(&once).into_owned();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn unescaped_lines_drop_only_empty_values(
        values in prop::collection::vec("[a-z]{0,4}", 0 ..= 6),
    ) {
        let row = StoredRow::encode("p", &values);
        let fields = parse_policy_line(&row.decode(false)).unwrap();
        let expected: Vec<&String> = values.iter().filter(|value| !value.is_empty()).collect();
        prop_assert_eq!(fields[1 ..].iter().collect::<Vec<_>>(), expected);
    }
}
