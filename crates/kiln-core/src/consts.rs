/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Maximum sigma-clipping iterations before accepting the surviving sample.
pub const MAX_CLIP_ITERS: usize = 5;

/// MAD to standard deviation conversion factor for a normal distribution:
/// 1 / Phi^-1(3/4).
pub const MAD_TO_SIGMA: f32 = 1.4826022;

/// Sigma threshold for pixel-wise rejection when combining frame stacks.
pub const STACK_CLIP_SIGMA: f32 = 3.0;

/// Sigma threshold for the summary statistics reported on finished masters.
pub const SUMMARY_CLIP_SIGMA: f32 = 5.0;

/// Flat pixels below this normalized value are masked as globally low.
pub const FLAT_GLOBAL_LOW_LIMIT: f32 = 0.80;

/// Lower bound on the local ratio (pixel / median-filtered pixel) in a flat.
pub const FLAT_LOCAL_RATIO_LOW: f32 = 0.9;

/// Upper bound on the local ratio (pixel / median-filtered pixel) in a flat.
pub const FLAT_LOCAL_RATIO_HIGH: f32 = 1.1;

/// Window size of the median filter used for the local-ratio flat mask.
pub const FLAT_MEDIAN_FILTER_SIZE: usize = 7;

/// Window size of the uniform filter used to grow the flat mask.
pub const MASK_GROW_FILTER_SIZE: usize = 3;

/// A pixel whose 3x3 mask average is at or below this (more than 2 of 9
/// neighbors masked, itself included) is also masked.
pub const MASK_GROW_LIMIT: f32 = 7.0 / 9.0;
