//! Standard normal CDF and two-sided p-values.
//!
//! We only need `Φ(z)` for Wald tests, so a classic rational approximation
//! is plenty. We use Abramowitz & Stegun 7.1.26 for `erf`, which is
//! accurate to about `1.5e-7` — far below anything that matters for
//! reporting a p-value to four decimals.
//!
//! Numerical notes:
//! - `Φ(z) = 0.5 * (1 + erf(z / sqrt(2)))`
//! - the approximation is defined for `x >= 0`; negative inputs use the
//!   odd symmetry `erf(-x) = -erf(x)`.

/// Error function via Abramowitz & Stegun 7.1.26.
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    let y = 1.0 - poly * (-x * x).exp();

    sign * y
}

/// Standard normal CDF.
pub fn phi(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Two-sided p-value for a z statistic: `2 * (1 - Φ(|z|))`.
///
/// Non-finite inputs yield a p-value of 1 (no evidence), which keeps
/// degenerate coefficients from printing as spuriously significant.
pub fn two_sided_p(z: f64) -> f64 {
    if !z.is_finite() {
        return 1.0;
    }
    let p = 2.0 * (1.0 - phi(z.abs()));
    p.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erf_reference_values() {
        // erf(1) = 0.8427007929...
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
        assert!(erf(0.0).abs() < 1e-12);
    }

    #[test]
    fn phi_reference_values() {
        assert!((phi(0.0) - 0.5).abs() < 1e-12);
        // Φ(1.96) ≈ 0.975
        assert!((phi(1.96) - 0.975).abs() < 1e-4);
        assert!((phi(-1.96) - 0.025).abs() < 1e-4);
    }

    #[test]
    fn two_sided_p_basics() {
        assert!((two_sided_p(1.96) - 0.05).abs() < 1e-3);
        assert!((two_sided_p(0.0) - 1.0).abs() < 1e-12);
        assert_eq!(two_sided_p(f64::NAN), 1.0);
        // Large z underflows to ~0 but stays in range.
        let p = two_sided_p(10.0);
        assert!((0.0..=1.0).contains(&p));
    }
}
