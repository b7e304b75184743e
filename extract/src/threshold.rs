//! Histogram generation, Otsu threshold selection, histogram equalization
//! and binarization of a [`PixelGrid`].

use crate::grid::PixelGrid;

/// Number of representable intensity levels.
pub const LEVELS: usize = 256;

/// Pixel count per intensity level. The sum of all counts equals the pixel
/// count of the grid it was built from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Histogram {
    counts: [u32; LEVELS],
}

impl Histogram {
    pub fn count(&self, level: u8) -> u32 {
        self.counts[level as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

/// Count the occurrences of each intensity level.
pub fn histogram(grid: &PixelGrid) -> Histogram {
    let mut counts = [0u32; LEVELS];
    for &value in grid.as_slice() {
        counts[value as usize] += 1;
    }
    Histogram { counts }
}

/// Pick the threshold that maximizes the between-class variance
/// `(mu_total * omega - mu)^2 / (omega * (1 - omega))` over all candidate
/// levels. Ties keep the smallest level; a histogram with all mass on one
/// level yields 0.
pub fn otsu_threshold(hist: &Histogram, pixel_count: usize) -> u8 {
    if pixel_count == 0 {
        return 0;
    }
    let total = pixel_count as f64;

    let mut mean_total = 0.0;
    for level in 0..LEVELS {
        mean_total += level as f64 * f64::from(hist.counts[level]);
    }
    mean_total /= total;

    let mut omega = 0.0; // cumulative probability mass <= t
    let mut mu = 0.0; // cumulative first moment <= t
    let mut best = 0u8;
    let mut best_sigma = 0.0;

    for t in 0..LEVELS {
        let p = f64::from(hist.counts[t]) / total;
        omega += p;
        mu += t as f64 * p;

        // variance is defined as 0 when either class is empty
        if omega <= 0.0 || omega >= 1.0 {
            continue;
        }

        let sigma = (mean_total * omega - mu).powi(2) / (omega * (1.0 - omega));
        if sigma > best_sigma {
            best_sigma = sigma;
            best = t as u8;
        }
    }

    best
}

/// Full-image contrast stretch: remap every pixel through the cumulative
/// distribution of the normalized histogram, `p -> round(CDF[p] * 255)`.
pub fn equalize(grid: &PixelGrid, hist: &Histogram) -> PixelGrid {
    let pixels = (grid.rows() * grid.columns()) as f64;

    let mut mean = 0.0;
    for level in 0..LEVELS {
        mean += level as f64 * f64::from(hist.counts[level]);
    }
    mean /= pixels;

    let mut variance = 0.0;
    for level in 0..LEVELS {
        variance += f64::from(hist.counts[level]) * (level as f64 - mean).powi(2);
    }
    let std_dev = (variance / pixels).sqrt();
    log::debug!("equalize: mean={mean:.2} stddev={std_dev:.2}");

    let mut cdf = [0.0f64; LEVELS];
    let mut acc = 0.0;
    for level in 0..LEVELS {
        acc += f64::from(hist.counts[level]) / pixels;
        cdf[level] = acc;
    }

    let mut out = grid.clone();
    for value in out.as_mut_slice() {
        *value = (cdf[*value as usize] * 255.0).round() as u8;
    }
    out
}

/// Binarize `src` against `threshold`: a pixel above the threshold becomes 0
/// (wall), anything else 255 (walkable). With `neighbor_average` set, the
/// unweighted mean of the 3x3 neighborhood is compared instead of the pixel
/// itself.
///
/// Every pixel within `seal` of an edge is forced to 0 so the search space
/// keeps a closed perimeter. The seal is at least one pixel, which also keeps
/// the 3x3 window of the neighbor-average variant in bounds.
pub fn binarize(src: &PixelGrid, neighbor_average: bool, threshold: u8, seal: usize) -> PixelGrid {
    let rows = src.rows();
    let columns = src.columns();
    let seal = seal.max(1);

    let mut mask = PixelGrid::filled(rows, columns, 0);
    if seal >= rows || seal >= columns {
        return mask;
    }

    for row in seal..rows - seal {
        for col in seal..columns - seal {
            let reference = if neighbor_average {
                let mut sum = 0u32;
                for dr in 0..3 {
                    for dc in 0..3 {
                        sum += u32::from(src.get(row + dr - 1, col + dc - 1));
                    }
                }
                sum as f32 / 9.0
            } else {
                f32::from(src.get(row, col))
            };

            let value = if reference > f32::from(threshold) {
                0
            } else {
                255
            };
            mask.set(row, col, value);
        }
    }

    mask
}
