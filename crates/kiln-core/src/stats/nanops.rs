use ndarray::ArrayView2;

/// Median of a sample, mutating the buffer.
///
/// Uses `select_nth_unstable` for O(n) selection without a full sort.
/// NaN values order last under `total_cmp`; callers filter them first.
/// Returns NaN for an empty sample.
pub(crate) fn median_mut(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        return f32::NAN;
    }
    if n == 1 {
        return values[0];
    }
    let mid = n / 2;
    if n % 2 == 1 {
        *values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    } else {
        values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        let upper = values[mid];
        let lower = values[..mid]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        (lower + upper) / 2.0
    }
}

/// Median of an array, ignoring NaN pixels. NaN if no valid pixel exists.
pub fn nan_median(data: ArrayView2<'_, f32>) -> f32 {
    let mut values: Vec<f32> = data.iter().copied().filter(|v| !v.is_nan()).collect();
    median_mut(&mut values)
}

/// Mean of an array, ignoring NaN pixels. NaN if no valid pixel exists.
pub fn nan_mean(data: ArrayView2<'_, f32>) -> f32 {
    let mut sum = 0.0f64;
    let mut count = 0u64;
    for &v in data.iter() {
        if !v.is_nan() {
            sum += v as f64;
            count += 1;
        }
    }
    if count == 0 {
        f32::NAN
    } else {
        (sum / count as f64) as f32
    }
}
