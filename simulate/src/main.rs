use clap::Parser;
use compute_selector::Simulation;
use crossbeam_channel::bounded;
use data::{gradient::Color, Precision};
use engine::Engine;
use eyre::{eyre, Result, WrapErr};
use image::{Rgb, RgbImage};
use ndarray::Array2;
use std::{num::NonZeroUsize, path::PathBuf};
use ui::SharedArgs;

/// Perform slime mold simulation and save the trail map as PNG images
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CLI arguments shared with other front-ends
    #[command(flatten)]
    shared: SharedArgs<Simulation>,

    /// Number of images to be created
    #[arg(short, long, default_value_t = 1000)]
    nbimage: usize,

    /// Directory where output images will be saved
    #[arg(short, long, default_value = "./")]
    output_dir: PathBuf,

    /// Trail intensity that maps to the brightest color
    #[arg(long, default_value_t = ui::MAX_INTENSITY)]
    max_intensity: Precision,

    /// Size of the image buffer between the compute and I/O thread
    ///
    /// A larger buffer enables better performance, at the cost of higher RAM
    /// utilization. 2 is the minimum to fully decouple compute and I/O.
    #[arg(long, default_value_t = NonZeroUsize::new(2).unwrap())]
    output_buffer: NonZeroUsize,
}

fn main() -> Result<()> {
    // Enable logging to stderr
    ui::init_logging();

    // Parse CLI arguments
    let args = Args::parse();
    let params = ui::parameters(&args.shared);
    let shape = [args.shared.nbrow, args.shared.nbcol];
    let steps_per_image = args.shared.nbextrastep;
    let delta_time = args.shared.deltat;
    let amplitude_scale = 1.0 / args.max_intensity;
    std::fs::create_dir_all(&args.output_dir).wrap_err("Failed to create output directory")?;

    // Set up the simulation
    let mut engine = Engine::<Simulation>::new(params, args.shared.backend)?;
    engine.initialize(shape, args.shared.seed)?;
    log::debug!("Simulation parameters: {:?}", engine.parameters());
    engine.set_gradient(ui::gradient_stops(ui::GRADIENT_RESOLUTION))?;
    log::info!(
        "Saving {} images to {}",
        args.nbimage,
        args.output_dir.display()
    );

    // Set up progress reporting
    let progress = ui::init_progress_reporting("Running simulation step", args.nbimage);

    // Set up the image writer thread
    std::thread::scope(|s| {
        // Start the writer thread
        let (sender, receiver) = bounded::<Array2<Color>>(args.output_buffer.into());
        let output_dir = &args.output_dir;
        let writer = s.spawn(move || {
            for (idx, colors) in receiver.into_iter().enumerate() {
                let path = output_dir.join(format!("{idx}.png"));
                to_image(&colors)?
                    .save(&path)
                    .wrap_err_with(|| format!("Failed to save image {}", path.display()))?;
                progress.inc(1);
            }
            progress.finish();
            Ok::<_, eyre::Report>(())
        });

        // Run the simulation on the main thread
        let mut time = 0.0;
        for _ in 0..args.nbimage {
            for _ in 0..steps_per_image {
                engine.advance(delta_time, time)?;
                time += delta_time;
            }
            // If the writer stopped, its error is reported below
            if sender.send(engine.colorize(amplitude_scale)?).is_err() {
                break;
            }
        }
        std::mem::drop(sender);
        writer
            .join()
            .map_err(|_| eyre!("Image writer thread panicked"))?
    })?;

    engine.dispose()?;
    Ok(())
}

/// Turn colorized trail map into an image
fn to_image(colors: &Array2<Color>) -> Result<RgbImage> {
    let width = u32::try_from(colors.ncols()).wrap_err("Image is too wide")?;
    let height = u32::try_from(colors.nrows()).wrap_err("Image is too tall")?;
    let mut image = RgbImage::new(width, height);
    for (color, pixel) in colors.iter().zip(image.pixels_mut()) {
        *pixel = Rgb([color.r, color.g, color.b]);
    }
    Ok(image)
}
