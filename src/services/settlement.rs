/// Money math shared by subscribe and validate-coupon so the two paths
/// can never disagree on a price.

/// Half-up rounding to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Amount formatting used in API payloads ("80.00").
pub fn money(value: f64) -> String {
    format!("{:.2}", value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub original: f64,
    pub discount: f64,
    pub total: f64,
}

/// Applies an optional percentage discount. The percentage is bounded to
/// [0,100] upstream, but the total is clamped at zero anyway.
pub fn quote(original: f64, discount_percentage: Option<f64>) -> Quote {
    let discount = match discount_percentage {
        Some(pct) => round2(original * pct / 100.0),
        None => 0.0,
    };
    let total = round2((original - discount).max(0.0));
    Quote {
        original: round2(original),
        discount,
        total,
    }
}

/// Staff credit for a coupon-settled payment.
pub fn commission(total: f64, rate: f64) -> f64 {
    round2(total * rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_percent_off_one_hundred() {
        let q = quote(100.0, Some(20.0));
        assert_eq!(money(q.original), "100.00");
        assert_eq!(money(q.discount), "20.00");
        assert_eq!(money(q.total), "80.00");
        assert_eq!(money(commission(q.total, 0.10)), "8.00");
    }

    #[test]
    fn no_coupon_means_no_discount() {
        let q = quote(49.99, None);
        assert_eq!(q.discount, 0.0);
        assert_eq!(money(q.total), "49.99");
    }

    #[test]
    fn full_discount_settles_to_zero() {
        let q = quote(250.0, Some(100.0));
        assert_eq!(money(q.discount), "250.00");
        assert_eq!(money(q.total), "0.00");
        assert_eq!(money(commission(q.total, 0.10)), "0.00");
    }

    #[test]
    fn fractional_amounts_round_half_up() {
        // 33.335 → 33.34 at two decimals
        let q = quote(66.67, Some(50.0));
        assert_eq!(money(q.discount), "33.34");
        assert_eq!(money(q.total), "33.33");
    }

    #[test]
    fn total_never_goes_negative() {
        let q = quote(10.0, Some(100.0));
        assert!(q.total >= 0.0);
    }
}
