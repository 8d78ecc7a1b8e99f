//! Numeric helpers shared by the estimators.

/// Returns the binomial coefficient.
///
/// The multiplicative product is accumulated in floating point. Every partial product is itself a
/// binomial coefficient, so the result is exact up to 2^53 and finite well beyond.
pub fn binomial(n: u64, k: u64) -> f64 {
    if k > n {
        0.0
    } else {
        let k = k.min(n - k);
        (1..=k)
            .fold(1.0, |acc, i| acc * (n - k + i) as f64 / i as f64)
            .round()
    }
}

/// Returns true if `value` is within `relative` tolerance of `target`.
pub fn is_close(value: f64, target: f64, relative: f64) -> bool {
    (value - target).abs() <= relative * target.abs()
}

/// Rounds to a fixed number of decimals, with ties going to the even neighbour.
pub fn round_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(0, 0), 1.0);
        assert_eq!(binomial(5, 2), 10.0);
        assert_eq!(binomial(19, 9), 92378.0);
        assert_eq!(binomial(3, 4), 0.0);
    }

    #[test]
    fn test_binomial_large() {
        assert_eq!(binomial(40, 20), 137846528820.0);
        assert_approx_eq!(binomial(100, 50) / 1.0089134454556419e29, 1.0, epsilon = 1e-12);
        assert!(binomial(1000, 500).is_finite());
    }

    #[test]
    fn test_is_close() {
        assert!(is_close(0.1 + 0.2 + 0.2, 0.5, 1e-9));
        assert!(!is_close(0.500001, 0.5, 1e-9));
    }

    #[test]
    fn test_round_decimals() {
        assert_eq!(round_decimals(0.123456789, 8), 0.12345679);
        assert_eq!(round_decimals(-0.999999999, 8), -1.0);
        assert_eq!(round_decimals(2.5, 0), 2.0);
    }
}
