use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::stats::nanops::median_mut;

/// Sliding-window median filter with a square window.
///
/// Edge handling replicates the nearest edge value (clamped indexing).
/// NaN values order last in the window, so a mostly-valid neighborhood
/// still yields a finite median.
pub fn median_filter(data: &Array2<f32>, size: usize) -> Array2<f32> {
    apply_window(data, size, |window| median_mut(window))
}

/// Sliding-window mean (box) filter with a square window.
///
/// Edge handling replicates the nearest edge value (clamped indexing).
pub fn uniform_filter(data: &Array2<f32>, size: usize) -> Array2<f32> {
    apply_window(data, size, |window| {
        window.iter().sum::<f32>() / window.len() as f32
    })
}

fn apply_window<F>(data: &Array2<f32>, size: usize, reduce: F) -> Array2<f32>
where
    F: Fn(&mut [f32]) -> f32 + Sync,
{
    let (h, w) = data.dim();
    let radius = size / 2;
    let span = size as isize;

    let filter_row = |row: usize| -> Vec<f32> {
        let mut window = Vec::with_capacity(size * size);
        let mut out = vec![0.0f32; w];
        for (col, slot) in out.iter_mut().enumerate() {
            window.clear();
            for dy in 0..span {
                let src_row =
                    (row as isize + dy - radius as isize).clamp(0, h as isize - 1) as usize;
                for dx in 0..span {
                    let src_col =
                        (col as isize + dx - radius as isize).clamp(0, w as isize - 1) as usize;
                    window.push(data[[src_row, src_col]]);
                }
            }
            *slot = reduce(&mut window);
        }
        out
    };

    let rows: Vec<Vec<f32>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(filter_row).collect()
    } else {
        (0..h).map(filter_row).collect()
    };

    let mut result = Array2::<f32>::zeros((h, w));
    for (row, row_data) in rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            result[[row, col]] = val;
        }
    }
    result
}
