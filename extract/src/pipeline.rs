//! The extraction controller: binarize, search, and on failure widen the
//! corridors and try again, a bounded number of times.

use serde::{Deserialize, Serialize};

use crate::connectivity::{dilate, ConnectivityMap};
use crate::filter::sobel;
use crate::find::{discover_start, PathResult, PathSearch, SearchState};
use crate::grid::{PixelGrid, MIN_DIMENSION};
use crate::threshold::{binarize, equalize, histogram, otsu_threshold};

/// How the binarization threshold is chosen.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Threshold {
    /// Compare against this intensity directly.
    Fixed(u8),
    /// Pick the intensity that maximizes between-class variance.
    Otsu,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Additional search attempts after the first one, each preceded by two
    /// dilation passes over the mask.
    pub max_retries: usize,
    pub threshold: Threshold,
    /// Histogram-equalize the image before thresholding.
    pub equalize: bool,
    /// Run the Sobel filter before thresholding.
    pub edge_filter: bool,
    /// Pixels within this distance of the image edge are forced to wall;
    /// clamped to at least 1 so the perimeter stays sealed.
    pub border_seal: usize,
    /// Compare the 3x3 neighborhood mean instead of the single pixel when
    /// binarizing.
    pub neighbor_average: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            threshold: Threshold::Otsu,
            equalize: false,
            edge_filter: false,
            border_seal: 1,
            neighbor_average: false,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("grid must be rectangular and at least 3x3, got {rows}x{columns}")]
    InvalidDimensions { rows: usize, columns: usize },
    #[error("no walkable pixel in start column {column}")]
    NoWalkableStart { column: usize },
    #[error("no path found after {attempts} search attempts")]
    PathNotFound { attempts: usize },
}

/// Extract an ordered left-to-right path through the corridors of `grid`.
///
/// The returned path starts in the first unsealed column and ends in the
/// last one; its hop count is minimal under 8-connectivity for the mask the
/// successful attempt ran on. `PathNotFound` is the recoverable outcome;
/// dimension and start errors are terminal and never retried.
pub fn extract_path(grid: &PixelGrid, config: &ExtractConfig) -> Result<PathResult, ExtractError> {
    if grid.rows() < MIN_DIMENSION || grid.columns() < MIN_DIMENSION {
        return Err(ExtractError::InvalidDimensions {
            rows: grid.rows(),
            columns: grid.columns(),
        });
    }

    // the seal must leave room between the entry and exit columns
    let seal = config.border_seal.max(1);
    if grid.columns() <= 2 * seal + 1 {
        return Err(ExtractError::InvalidDimensions {
            rows: grid.rows(),
            columns: grid.columns(),
        });
    }
    let start_column = seal;
    let goal_column = grid.columns() - 1 - seal;

    let mut source = grid.clone();
    if config.equalize {
        let hist = histogram(&source);
        source = equalize(&source, &hist);
    }
    if config.edge_filter {
        source = sobel(&source);
    }

    let threshold = match config.threshold {
        Threshold::Fixed(value) => value,
        Threshold::Otsu => {
            let hist = histogram(&source);
            let value = otsu_threshold(&hist, source.rows() * source.columns());
            if value == 0 {
                log::warn!("otsu found no informative separation, thresholding at 0");
            }
            value
        }
    };
    log::debug!("binarizing at threshold {threshold}");

    let mut mask = binarize(&source, config.neighbor_average, threshold, seal);

    let attempts = config.max_retries + 1;
    for attempt in 1..=attempts {
        let mut map = ConnectivityMap::from_mask(&mask);

        // re-discovered every attempt: dilation can shift the first walkable
        // row of the start column upwards
        let Some(start) = discover_start(&map, start_column) else {
            return Err(ExtractError::NoWalkableStart {
                column: start_column,
            });
        };

        let search = PathSearch::new(start, goal_column, &mut map);
        match search.finish(&mut map) {
            SearchState::PathFound(result) => {
                log::info!(
                    "found a {}-step path on attempt {attempt} of {attempts}",
                    result.steps
                );
                return Ok(result);
            }
            SearchState::NoPathFound => {
                log::info!("no path on attempt {attempt} of {attempts}");
                if attempt < attempts {
                    dilate(&mut mask);
                    dilate(&mut mask);
                }
            }
            SearchState::Computing => unreachable!("finish always runs to a terminal state"),
        }
    }

    Err(ExtractError::PathNotFound { attempts })
}

#[cfg(test)]
mod test {

    use super::*;

    const DARK: u8 = 10;
    const BRIGHT: u8 = 200;

    /// All-bright grid with a dark (walkable after binarization) corridor at
    /// `row` spanning the given columns.
    fn corridor_grid(rows: usize, columns: usize, row: usize, cols: std::ops::Range<usize>) -> PixelGrid {
        let mut grid = PixelGrid::filled(rows, columns, BRIGHT);
        for col in cols {
            grid.set(row, col, DARK);
        }
        grid
    }

    fn fixed_config() -> ExtractConfig {
        ExtractConfig {
            threshold: Threshold::Fixed(99),
            ..ExtractConfig::default()
        }
    }

    #[test]
    fn test_straight_corridor_end_to_end() {
        // 10x10, corridor at row 5 from the first to the last interior column
        let grid = corridor_grid(10, 10, 5, 1..9);

        let result = extract_path(&grid, &fixed_config()).unwrap();

        assert_eq!(result.steps, 7);
        assert_eq!(result.path.len(), 8);
        for (i, point) in result.path.iter().enumerate() {
            assert_eq!(point.x, i + 1);
            assert_eq!(point.y, 5);
        }
    }

    #[test]
    fn test_otsu_resolves_bimodal_corridor() {
        let grid = corridor_grid(10, 10, 5, 1..9);
        let config = ExtractConfig::default();

        let result = extract_path(&grid, &config).unwrap();
        assert_eq!(result.steps, 7);
    }

    #[test]
    fn test_path_touches_both_edge_columns() {
        // walkable entry and exit columns plus a connecting corridor
        let mut grid = corridor_grid(12, 12, 6, 1..11);
        for row in 1..11 {
            grid.set(row, 1, DARK);
            grid.set(row, 10, DARK);
        }

        let result = extract_path(&grid, &fixed_config()).unwrap();

        assert_eq!(result.path.first().unwrap().x, 1);
        assert_eq!(result.path.last().unwrap().x, 10);
        assert_eq!(result.steps, result.path.len() - 1);
    }

    #[test]
    fn test_broken_corridor_heals_on_retry() {
        // a three-pixel break: unreachable on the first attempt, two
        // dilation passes close it
        let mut grid = corridor_grid(10, 20, 5, 1..19);
        grid.set(5, 9, BRIGHT);
        grid.set(5, 10, BRIGHT);
        grid.set(5, 11, BRIGHT);

        let result = extract_path(&grid, &fixed_config()).unwrap();

        assert_eq!(result.path.first().unwrap().x, 1);
        assert_eq!(result.path.last().unwrap().x, 18);
    }

    #[test]
    fn test_retry_bound_is_exhausted() {
        // the wall between the corridor stubs is far too wide for the four
        // dilation passes the two retries grant
        let mut grid = corridor_grid(12, 40, 5, 1..6);
        for col in 34..39 {
            grid.set(5, col, DARK);
        }

        let result = extract_path(&grid, &fixed_config());
        assert_eq!(result, Err(ExtractError::PathNotFound { attempts: 3 }));
    }

    #[test]
    fn test_no_walkable_start_is_terminal() {
        let grid = PixelGrid::filled(10, 10, BRIGHT);
        let result = extract_path(&grid, &fixed_config());
        assert_eq!(result, Err(ExtractError::NoWalkableStart { column: 1 }));
    }

    #[test]
    fn test_undersized_grid_is_rejected() {
        let grid = PixelGrid::filled(2, 2, 0);
        assert!(matches!(
            extract_path(&grid, &ExtractConfig::default()),
            Err(ExtractError::InvalidDimensions { rows: 2, columns: 2 })
        ));
    }

    #[test]
    fn test_custom_seal_moves_the_endpoints() {
        let grid = corridor_grid(12, 12, 6, 2..10);
        let config = ExtractConfig {
            border_seal: 2,
            ..fixed_config()
        };

        let result = extract_path(&grid, &config).unwrap();
        assert_eq!(result.path.first().unwrap().x, 2);
        assert_eq!(result.path.last().unwrap().x, 9);
    }

    #[test]
    fn test_equalized_low_contrast_corridor() {
        // low-contrast variant: equalization stretches it apart far enough
        // for otsu to separate the classes
        let mut grid = PixelGrid::filled(10, 10, 130);
        for col in 1..9 {
            grid.set(5, col, 120);
        }
        let config = ExtractConfig {
            equalize: true,
            ..ExtractConfig::default()
        };

        let result = extract_path(&grid, &config).unwrap();
        assert_eq!(result.steps, 7);
    }
}
