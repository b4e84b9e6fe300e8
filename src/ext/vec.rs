/// Static methods extending slices.
pub struct VecExt;

impl VecExt {
    /// Sort vector/slice using `partial_ord`.
    pub fn sort<T: PartialOrd>(a: &mut [T]) {
        a.sort_unstable_by(|x, y| x.partial_cmp(y).expect("Error in sort: elements are not comparable"));
    }
}

/// Static methods related to vectors over f64.
pub struct F64Ext;

impl F64Ext {
    /// Calculate sample mean.
    pub fn mean<T>(a: &[T]) -> f64
    where T: Into<f64> + Copy,
    {
        a.iter().map(|&x| Into::<f64>::into(x)).sum::<f64>() / a.len() as f64
    }

    /// Returns minimal vector value.
    pub fn min(a: &[f64]) -> f64 {
        a.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Returns maximal vector value.
    pub fn max(a: &[f64]) -> f64 {
        a.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Finds `q`-th quantile in a sorted array.
    /// Uses linear interpolation, if the quantile is between two elements.
    fn interpol_quantile_sorted(a: &[f64], q: f64) -> f64 {
        assert!(0.0 <= q && q <= 1.0, "Quantile must be within [0, 1]!");
        assert!(!a.is_empty(), "Cannot find quantile on an empty array!");
        let f = (a.len() - 1) as f64 * q;
        let i = f as usize;
        let r = f.fract();
        debug_assert_eq!(i as f64 + r, f);

        let x = a[i];
        if r < 1e-6 {
            x
        } else {
            let y = a[i + 1];
            debug_assert!(y >= x);
            x + (y - x) * r
        }
    }

    /// Finds `q`-th quantile in an unsorted array.
    /// Uses linear interpolation, if the quantile is between two elements.
    /// Elements must not be NaN.
    pub fn interpol_quantile(a: &mut [f64], q: f64) -> f64 {
        VecExt::sort(a);
        Self::interpol_quantile_sorted(a, q)
    }

    /// Median of an unsorted array (average of two middle elements for even length).
    /// Does not modify the input.
    pub fn median(a: &[f64]) -> f64 {
        let mut buffer = a.to_vec();
        Self::interpol_quantile(&mut buffer, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_even() {
        assert_eq!(F64Ext::median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(F64Ext::median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(F64Ext::median(&[-5.0]), -5.0);
    }

    #[test]
    fn min_max_mean() {
        let a = [0.5, -1.0, 4.0];
        assert_eq!(F64Ext::min(&a), -1.0);
        assert_eq!(F64Ext::max(&a), 4.0);
        assert!((F64Ext::mean(&a) - 3.5 / 3.0).abs() < 1e-12);
    }
}
