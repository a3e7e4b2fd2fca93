//! Natural cubic spline in one dimension.

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A natural cubic spline `y(t)` through a set of knots with strictly increasing `t`.
///
/// Segment `j` is `a_j + b_j dt + c_j dt^2 + d_j dt^3` with `dt = t - t_j`.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    t: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CubicSpline {
    /// Fit a spline through the given knots.
    ///
    /// Returns `None` if there are fewer than two knots, the lengths differ, or `t` is not
    /// strictly increasing.
    pub fn new(t: &[f64], y: &[f64]) -> Option<Self> {
        if t.len() < 2 || t.len() != y.len() {
            return None;
        }

        if t.windows(2).any(|w| !(w[1] > w[0])) {
            return None;
        }

        let n = t.len() - 1;
        let h: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();

        // Tridiagonal system for the second order coefficients, solved with the Thomas algorithm
        let mut alpha = vec![0.0; n + 1];
        for i in 1..n {
            alpha[i] = 3.0 / h[i] * (y[i + 1] - y[i]) - 3.0 / h[i - 1] * (y[i] - y[i - 1]);
        }

        let mut l = vec![1.0; n + 1];
        let mut mu = vec![0.0; n + 1];
        let mut z = vec![0.0; n + 1];

        for i in 1..n {
            l[i] = 2.0 * (t[i + 1] - t[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        let mut b = vec![0.0; n];
        let mut c = vec![0.0; n + 1];
        let mut d = vec![0.0; n];

        for j in (0..n).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (y[j + 1] - y[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
        }

        Some(Self {
            t: t.to_vec(),
            a: y[..n].to_vec(),
            b,
            c: c[..n].to_vec(),
            d,
        })
    }

    /// Evaluate the spline and its first and second derivatives at `t`.
    ///
    /// Values outside the knot range extrapolate the end segments.
    pub fn eval(&self, t: f64) -> (f64, f64, f64) {
        let j = self.segment(t);
        let dt = t - self.t[j];

        let value = self.a[j] + self.b[j] * dt + self.c[j] * dt.powi(2) + self.d[j] * dt.powi(3);
        let d1 = self.b[j] + 2.0 * self.c[j] * dt + 3.0 * self.d[j] * dt.powi(2);
        let d2 = 2.0 * self.c[j] + 6.0 * self.d[j] * dt;

        (value, d1, d2)
    }

    fn segment(&self, t: f64) -> usize {
        let num_segs = self.a.len();
        let upper = self.t.partition_point(|&k| k <= t);

        upper.saturating_sub(1).min(num_segs - 1)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_passes_through_knots() {
        let t = [0.0, 1.0, 2.5, 4.0, 5.0];
        let y = [0.0, 2.0, -1.0, 3.0, 3.5];

        let s = CubicSpline::new(&t, &y).unwrap();

        for (ti, yi) in t.iter().zip(y.iter()) {
            assert_approx_eq!(s.eval(*ti).0, *yi);
        }

        // Natural end conditions
        assert_approx_eq!(s.eval(0.0).2, 0.0);
        assert_approx_eq!(s.eval(5.0).2, 0.0);
    }

    #[test]
    fn test_linear_data() {
        let t = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];

        let s = CubicSpline::new(&t, &y).unwrap();

        let (v, d1, d2) = s.eval(1.5);
        assert_approx_eq!(v, 4.0);
        assert_approx_eq!(d1, 2.0);
        assert_approx_eq!(d2, 0.0);
    }

    #[test]
    fn test_invalid_knots() {
        assert!(CubicSpline::new(&[0.0], &[1.0]).is_none());
        assert!(CubicSpline::new(&[0.0, 1.0], &[1.0]).is_none());
        assert!(CubicSpline::new(&[0.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    }
}
