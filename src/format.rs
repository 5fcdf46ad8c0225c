use rust_decimal::{Decimal, RoundingStrategy};

/// Render `value` with exactly `dp` fraction digits.
///
/// Rounds half away from zero, pads with trailing zeros, and never prints a
/// negative zero. Canonical form for every numeric string in report output.
pub fn format_fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = round_fixed(value, dp);
    rounded.rescale(dp);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}

/// Round half away from zero to `dp` fraction digits, as [`format_fixed`] does.
pub fn round_fixed(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Render a fraction (0.0379) as a percentage number ("3.79").
pub fn format_percent(fraction: Decimal, dp: u32) -> String {
    format_fixed(fraction * Decimal::ONE_HUNDRED, dp)
}

/// Trim trailing zeros, for values echoed back to the user as entered.
pub fn format_plain(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn format_fixed_pads_and_rounds() {
        assert_eq!(format_fixed(dec("120"), 2), "120.00");
        assert_eq!(format_fixed(dec("10.5"), 4), "10.5000");
        assert_eq!(format_fixed(dec("1.23455"), 4), "1.2346");
        assert_eq!(format_fixed(dec("-1.23455"), 4), "-1.2346");
        assert_eq!(format_fixed(dec("125000.499"), 2), "125000.50");
    }

    #[test]
    fn format_fixed_never_prints_negative_zero() {
        assert_eq!(format_fixed(dec("-0.0001"), 2), "0.00");
    }

    #[test]
    fn format_percent_scales_fraction() {
        assert_eq!(format_percent(dec("0.037912"), 2), "3.79");
        assert_eq!(format_percent(Decimal::ONE, 2), "100.00");
        assert_eq!(format_percent(dec("200") / dec("600"), 2), "33.33");
    }

    #[test]
    fn format_plain_strips_trailing_zeros() {
        assert_eq!(format_plain(dec("15.000")), "15");
        assert_eq!(format_plain(dec("0.2500")), "0.25");
    }
}
