use crate::SfError;

/// Floating point type used throughout the system.
pub type Real = f64;

/// Absolute/relative tolerance pair for float comparisons.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, SfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SfError::NonFinite { what, value: v })
    }
}

/// Check every entry of a slice is finite.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), SfError> {
    for &v in values {
        ensure_finite(v, what)?;
    }
    Ok(())
}

/// Fraction in the closed interval [0, 1].
pub fn is_fraction(v: Real) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
        assert!(ensure_all_finite(&[1.0, Real::INFINITY], "vec").is_err());
        assert!(ensure_all_finite(&[1.0, 2.0], "vec").is_ok());
    }

    #[test]
    fn fraction_bounds() {
        assert!(is_fraction(0.0));
        assert!(is_fraction(1.0));
        assert!(!is_fraction(-0.1));
        assert!(!is_fraction(1.01));
        assert!(!is_fraction(Real::NAN));
    }
}
