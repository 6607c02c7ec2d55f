//! The income bracket threshold table.
//!
//! Defined once, here, and consumed by both sides of the imputation:
//! the reference-sample classifier (`assign_bracket`) and the trip-file
//! bracket-code validation (`IncomeBracket::from_code`). A drift between
//! the two would silently misalign the imputed values, so keep any edits
//! to the bracket definition in this file.

use crate::domain::IncomeBracket;

/// Exclusive upper bounds (annual dollars) for the first ten brackets, in
/// ascending order. The eleventh bracket is unbounded above.
pub const BRACKET_UPPER_BOUNDS: [f64; 10] = [
    10_000.0, 15_000.0, 25_000.0, 35_000.0, 50_000.0, 75_000.0, 100_000.0, 125_000.0, 150_000.0,
    200_000.0,
];

/// Classify a continuous income into its bracket.
///
/// Thresholds are exclusive upper bounds applied in ascending order, first
/// match wins: an income of exactly 10,000 falls in the second bracket.
/// Negative or non-finite incomes are unclassifiable and return `None`.
pub fn assign_bracket(income: f64) -> Option<IncomeBracket> {
    if !income.is_finite() || income < 0.0 {
        return None;
    }

    for (i, &bound) in BRACKET_UPPER_BOUNDS.iter().enumerate() {
        if income < bound {
            return IncomeBracket::from_code(i as i64 + 1);
        }
    }
    Some(IncomeBracket::Top)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_ascending() {
        for pair in BRACKET_UPPER_BOUNDS.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn boundary_income_lands_in_next_bracket() {
        // Bounds are exclusive: exactly 10,000 is *not* "< 10k".
        assert_eq!(assign_bracket(10_000.0), Some(IncomeBracket::Under15k));
        assert_eq!(assign_bracket(9_999.99), Some(IncomeBracket::Under10k));
        assert_eq!(assign_bracket(200_000.0), Some(IncomeBracket::Top));
        assert_eq!(assign_bracket(199_999.99), Some(IncomeBracket::Under200k));
    }

    #[test]
    fn zero_income_is_bracket_one() {
        assert_eq!(assign_bracket(0.0), Some(IncomeBracket::Under10k));
    }

    #[test]
    fn negative_and_non_finite_are_unclassifiable() {
        assert_eq!(assign_bracket(-1.0), None);
        assert_eq!(assign_bracket(f64::NAN), None);
        assert_eq!(assign_bracket(f64::INFINITY), None);
    }

    #[test]
    fn every_bracket_is_reachable() {
        let probes = [
            5_000.0, 12_000.0, 20_000.0, 30_000.0, 40_000.0, 60_000.0, 80_000.0, 110_000.0,
            140_000.0, 175_000.0, 250_000.0,
        ];
        for (probe, expected) in probes.iter().zip(IncomeBracket::ALL) {
            assert_eq!(assign_bracket(*probe), Some(expected));
        }
    }
}
