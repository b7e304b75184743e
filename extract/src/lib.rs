//! Path extraction from scanned maze-like bitmaps: binarize a noisy
//! grayscale grid, then breadth-first search it from the left edge to the
//! right, dilating the walkable regions and retrying when corridors are
//! broken.

pub mod connectivity;
pub mod filter;
pub mod find;
pub mod grid;
pub mod pipeline;
pub mod threshold;

pub use connectivity::{dilate, CellState, ConnectivityMap, Point};
pub use find::{discover_start, PathResult, PathSearch, SearchState};
pub use grid::PixelGrid;
pub use pipeline::{extract_path, ExtractConfig, ExtractError, Threshold};
