// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use env_logger;
use image::{ImageReader, Rgb};
use image::imageops;
use imageproc::drawing;
use log::{info, warn};

use mser_detect::algorithm::{extract_mser, Params};

/// Example program for running MSER detection on test image(s).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Path of the file or directory to process.
    #[arg(short, long)]
    input: String,

    /// Directory where output file(s) are written.
    #[arg(short, long)]
    output: String,

    /// Level window over which region stability is measured.
    #[arg(short, long, default_value_t = 1)]
    delta: u32,

    /// Minimum region area relative to the image area.
    #[arg(long, default_value_t = 0.0)]
    min_area: f64,

    /// Maximum region area relative to the image area.
    #[arg(long, default_value_t = 1.0)]
    max_area: f64,

    /// Maximum variation of a stable region; unlimited by default.
    #[arg(long, default_value_t = f64::INFINITY)]
    max_variation: f64,

    /// Minimum relative area difference between nested regions.
    #[arg(long, default_value_t = 0.0)]
    min_diversity: f64,

    /// Detect bright regions instead of dark ones.
    #[arg(short, long, default_value_t = false)]
    bright: std::primitive::bool,

    /// Output a line per detected region.
    #[arg(short, long, default_value_t = false)]
    list: std::primitive::bool,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let input_metadata = fs::metadata(&args.input).unwrap_or_else(|e| {
        panic!("Input file/dir '{}' does not exist? {:?}", args.input, e);
    });
    let output_metadata = fs::metadata(&args.output).unwrap_or_else(|e| {
        panic!("Output dir '{}' does not exist? {:?}", args.output, e);
    });
    assert!(output_metadata.is_dir(),
            "Output '{}' must be a directory", args.output);
    let params = Params{delta: args.delta,
                        min_area: args.min_area,
                        max_area: args.max_area,
                        max_variation: args.max_variation,
                        min_diversity: args.min_diversity};
    if input_metadata.is_dir() {
        // Enumerate and process all of the files in the directory.
        let entries = fs::read_dir(&args.input).unwrap_or_else(|e| {
            panic!("Cannot list '{}': {:?}", args.input, e);
        });
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                process_file(path, &args, &params);
            }
        }
    } else {
        // Process the single file.
        assert!(input_metadata.is_file());
        process_file(PathBuf::from(&args.input), &args, &params);
    }
}

fn process_file(input_path: PathBuf, args: &Args, params: &Params) {
    info!("Processing {:?}", input_path);
    let Some(file_name) = input_path.file_name() else {
        warn!("Skipping {:?}: no file name", input_path);
        return;
    };
    let mut output_path = PathBuf::from(&args.output);
    output_path.push(file_name);
    output_path.set_extension("png");

    let img = match ImageReader::open(&input_path).map_err(image::ImageError::from)
        .and_then(|reader| reader.decode()) {
        Ok(img) => img,
        Err(e) => {
            warn!("Skipping {:?} due to: {:?}", input_path, e);
            return;
        },
    };
    let mut img_u8 = img.to_luma8();
    if args.bright {
        imageops::invert(&mut img_u8);
    }
    let (width, height) = img_u8.dimensions();

    let mser_start = Instant::now();
    let forest = extract_mser(&img_u8, params);
    let elapsed = mser_start.elapsed();
    info!("WxH: {}x{}", width, height);
    info!("MSER extraction found {} regions in {} trees in {:?}",
          forest.len(), forest.roots().len(), elapsed);
    info!("{}ms per megapixel\n",
          elapsed.as_secs_f64() * 1000.0 / (width as f64 * height as f64 / 1000000.0));

    // Outline each region; outermost regions get the brightest outline.
    let mut img_color = img.into_rgb8();
    for id in forest.iter() {
        let mut depth = 0_u32;
        let mut ancestor = forest.parent(id);
        while let Some(parent) = ancestor {
            depth += 1;
            ancestor = forest.parent(parent);
        }
        let brightness = (255 - (depth * 40).min(155)) as u8;
        drawing::draw_hollow_rect_mut(
            &mut img_color, forest[id].bounds(), Rgb::<u8>([brightness, 0, 0]));
    }
    if let Err(e) = img_color.save(&output_path) {
        warn!("Could not write {:?}: {:?}", output_path, e);
    }
    if args.list {
        let mut regions_str = String::new();
        regions_str.push_str(format!("# WxH {}x{}\n", width, height).as_str());
        regions_str.push_str("# level, area, (x, y), [left, top, width, height], variation\n");
        for id in forest.iter() {
            let region = &forest[id];
            let bounds = region.bounds();
            regions_str.push_str(format!(
                "{}, {}, {:?}, [{}, {}, {}, {}], {:.4}\n",
                region.level(), region.area(), region.point(),
                bounds.left(), bounds.top(), bounds.width(), bounds.height(),
                region.variation()).as_str());
        }
        info!("{}", regions_str);
    }
}
