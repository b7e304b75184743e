use std::fs::File;
use std::io::BufWriter;

use anyhow::{anyhow, Context};
use image::{DynamicImage, Rgb};

use extract::{extract_path, ExtractConfig, PathResult, PixelGrid, Threshold};

/// Flatten a decoded bitmap into the raw single-channel buffer the core
/// operates on.
fn grid_from_image(img: &DynamicImage) -> Result<PixelGrid, anyhow::Error> {
    let gray = img.to_luma8();
    let rows = gray.height() as usize;
    let columns = gray.width() as usize;
    Ok(PixelGrid::from_raw(rows, columns, gray.into_raw())?)
}

/// Render the source in grayscale with the path drawn on top in red.
fn save_overlay(img: &DynamicImage, result: &PathResult, path: &str) -> Result<(), anyhow::Error> {
    let mut overlay = DynamicImage::ImageLuma8(img.to_luma8()).to_rgb8();
    for point in &result.path {
        overlay.put_pixel(point.x as u32, point.y as u32, Rgb([255, 0, 0]));
    }
    overlay
        .save(path)
        .with_context(|| format!("could not write overlay to {path}"))
}

fn parse_config(args: &[String]) -> Result<ExtractConfig, anyhow::Error> {
    let mut config = ExtractConfig::default();
    for arg in args {
        match arg.split_once('=') {
            Some(("--threshold", value)) => {
                config.threshold = Threshold::Fixed(
                    value
                        .parse()
                        .with_context(|| format!("bad threshold {value}"))?,
                );
            }
            _ if arg == "--equalize" => config.equalize = true,
            _ if arg == "--edge-filter" => config.edge_filter = true,
            _ if arg == "--neighbor-average" => config.neighbor_average = true,
            _ if arg.starts_with("--") => return Err(anyhow!("unknown option {arg}")),
            _ => {}
        }
    }
    Ok(config)
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut paths = args.iter().filter(|a| !a.starts_with("--"));
    let input = paths.next().ok_or_else(|| {
        anyhow!("usage: frontend <input> [overlay-out] [json-out] [--threshold=N] [--equalize] [--edge-filter] [--neighbor-average]")
    })?;
    let overlay_out = paths.next();
    let json_out = paths.next();

    let config = parse_config(&args)?;

    let img = image::open(input).with_context(|| format!("could not open {input}"))?;
    let grid = grid_from_image(&img)?;

    log::info!("searching {}x{} image", grid.rows(), grid.columns());
    let result = extract_path(&grid, &config)?;

    println!(
        "path with {} steps from ({}, {}) to ({}, {})",
        result.steps, result.start.x, result.start.y, result.goal.x, result.goal.y
    );

    if let Some(path) = overlay_out {
        save_overlay(&img, &result, path)?;
        log::info!("overlay written to {path}");
    }
    if let Some(path) = json_out {
        let file = File::create(path).with_context(|| format!("could not create {path}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &result)?;
        log::info!("coordinates written to {path}");
    }

    Ok(())
}
