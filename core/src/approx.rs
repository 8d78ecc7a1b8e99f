macro_rules! assert_approx_eq {
    ($lhs:expr, $rhs:expr) => {
        assert_approx_eq!($lhs, $rhs, epsilon = 1e-6)
    };
    ($lhs:expr, $rhs:expr, epsilon = $epsilon:expr) => {
        match (&($lhs), &($rhs)) {
            (lhs, rhs) => assert!(
                $crate::approx::ApproxEq::approx_eq(lhs, rhs, $epsilon),
                r#"assertion failed: `({} ≈ {})`
  left: `{:?}`,
 right: `{:?}`"#,
                stringify!($lhs),
                stringify!($rhs),
                lhs,
                rhs,
            ),
        }
    };
}

pub trait ApproxEq {
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        // NaN is a legitimate estimator output, so two NaNs compare equal here
        (self.is_nan() && other.is_nan()) || (self - other).abs() < epsilon
    }
}

impl<T> ApproxEq for [T]
where
    T: ApproxEq,
{
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(x, y)| x.approx_eq(y, epsilon))
    }
}

impl<T> ApproxEq for Vec<T>
where
    T: ApproxEq,
{
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.as_slice().approx_eq(other.as_slice(), epsilon)
    }
}

impl<const N: usize, T> ApproxEq for [T; N]
where
    T: ApproxEq,
{
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.as_slice().approx_eq(other.as_slice(), epsilon)
    }
}
