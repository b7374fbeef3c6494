use std::path::PathBuf;

use tracing::warn;

use crate::error::Result;
use crate::io::fits;

/// Contiguous half of a sorted, filtered path list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Half {
    First,
    Second,
}

/// Expand a glob pattern into a sorted list of raw frame paths.
///
/// When `exposure_time` is given, frames whose header exposure time does
/// not match are dropped (each candidate's header is read). When `half`
/// is given, the sorted, filtered list is split at the midpoint and only
/// that half is returned.
pub fn find_raw_frames(
    pattern: &str,
    exposure_time: Option<f64>,
    half: Option<Half>,
) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                None
            }
        })
        .collect();
    paths.sort();

    if let Some(want) = exposure_time {
        paths.retain(|path| match fits::read_header(path) {
            Ok(header) => header.exposure_time() == Some(want),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable frame");
                false
            }
        });
    }

    match half {
        Some(Half::First) => paths.truncate(paths.len() / 2),
        Some(Half::Second) => {
            let mid = paths.len() / 2;
            paths.drain(..mid);
        }
        None => {}
    }

    Ok(paths)
}
