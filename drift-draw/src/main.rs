use drift_akaze::AkazeMatcher;
use drift_core::compare;
use image::ImageOutputFormat;
use std::error::Error;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "drift-draw",
    about = "A tool to show the correspondences between two frames of the same camera"
)]
struct Opt {
    /// The normalized displacement above which a correspondence is highlighted.
    #[structopt(short, long, default_value = "0.03")]
    threshold: f64,
    /// The akaze threshold to use.
    ///
    /// 0.01 will be very sparse and 0.0001 will be very dense.
    #[structopt(long, default_value = "0.001")]
    akaze_threshold: f64,
    /// The Hamming distance the best descriptor match must beat the second best match by.
    #[structopt(long, default_value = "24")]
    better_by: u32,
    /// The output path to write to (autodetects image type from extension).
    ///
    /// If this is not provided, then the output goes to stdout as a PNG.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    /// The earlier frame.
    #[structopt(parse(from_os_str))]
    image_a: PathBuf,
    /// The later frame.
    #[structopt(parse(from_os_str))]
    image_b: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::from_args();
    let image_a = image::open(&opt.image_a)?;
    let image_b = image::open(&opt.image_b)?;

    let matcher = AkazeMatcher::new(opt.akaze_threshold, opt.better_by);
    let result = compare(&matcher, &image_a, &image_b, opt.threshold)?;
    eprintln!(
        "{:?}: {} of {} correspondences exceed {}",
        result.verdict,
        result.exceeding.len(),
        result.correspondences.len(),
        opt.threshold
    );

    let image = drift_draw::render_comparison(&image_a, &image_b, &result);
    if let Some(path) = opt.output {
        image.save(path)?;
    } else {
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageOutputFormat::Png)?;
        std::io::stdout().lock().write_all(png.get_ref())?;
    }
    Ok(())
}
