pub mod filters;
pub mod nanops;
pub mod sigma_clip;

pub use filters::{median_filter, uniform_filter};
pub use nanops::{nan_mean, nan_median};
pub use sigma_clip::{
    clipped_mean, clipped_mean_and_sigma_stack, clipped_sigma, clipped_stats, ClippedStats,
};
