//! This crate collects elements that are shared between the slime mold
//! simulation front-ends: command-line arguments, visualization settings and
//! terminal progress reporting.

#[cfg(feature = "simulation")]
use clap::Args;
#[cfg(feature = "simulation")]
use compute::SimulateBase;
#[cfg(feature = "simulation")]
use data::parameters::{Parameters, Spawn, SpawnAngle, SpawnPattern};
use data::Precision;
#[cfg(feature = "visualization")]
use data::gradient::{Color, ColorStop};
#[cfg(feature = "tui")]
use indicatif::{ProgressBar, ProgressStyle};

/// CLI arguments shared by simulation front-ends
#[cfg(feature = "simulation")]
#[derive(Args)]
pub struct SharedArgs<Simulation: SimulateBase> {
    /// Number of agents
    #[arg(short = 'a', long)]
    pub nbagent: Option<usize>,

    /// Number of simulation steps to perform between images
    #[arg(short = 'e', long, default_value_t = 34)]
    pub nbextrastep: usize,

    /// Number of rows of the images to be created
    #[arg(short = 'r', long, default_value_t = 1080)]
    pub nbrow: usize,

    /// Number of columns of the images to be created
    #[arg(short = 'c', long, default_value_t = 1920)]
    pub nbcol: usize,

    /// Simulated time interval on each simulation step
    #[arg(short = 't', long, default_value_t = 0.02)]
    pub deltat: Precision,

    /// Distance traveled by agents per unit of time
    #[arg(long)]
    pub move_speed: Option<Precision>,

    /// Fraction of the trail that evaporates per unit of time
    #[arg(long)]
    pub evaporate_speed: Option<Precision>,

    /// Speed at which the trail is blurred towards its local average
    #[arg(long)]
    pub diffuse_rate: Option<Precision>,

    /// Maximal rotation speed of agents, in degrees per unit of time
    #[arg(long)]
    pub turn_speed: Option<Precision>,

    /// Distance from agents to their sensors, in cells
    #[arg(long)]
    pub sensor_offset: Option<Precision>,

    /// Half-width of the square area read by a sensor, in cells
    #[arg(long)]
    pub sensor_size: Option<usize>,

    /// Angle between the forward and side sensors, in degrees
    #[arg(long)]
    pub sensor_angle: Option<Precision>,

    /// Half-width of the diffusion neighborhood, in cells
    #[arg(long)]
    pub diffusion_radius: Option<usize>,

    /// Trail deposited by each agent per unit of time
    #[arg(long)]
    pub deposit_amount: Option<Precision>,

    /// Amplitude of random turns, as a fraction of the maximal turn
    #[arg(long)]
    pub steering_jitter: Option<Precision>,

    /// Initial placement of agents
    #[arg(long, value_enum, default_value_t)]
    pub spawn_pattern: SpawnPattern,

    /// Initial heading of agents
    #[arg(long, value_enum, default_value_t)]
    pub spawn_angle: SpawnAngle,

    /// Seed of the random number generator
    #[arg(short, long, default_value_t = 0)]
    pub seed: u64,

    /// Backend-specific CLI arguments
    #[command(flatten)]
    pub backend: Simulation::CliArgs,
}

/// Simulation parameters from CLI arguments, with defaults for those that
/// were not specified
#[cfg(feature = "simulation")]
pub fn parameters(args: &SharedArgs<impl SimulateBase>) -> Parameters {
    let defaults = Parameters::default();
    Parameters {
        num_agents: args.nbagent.unwrap_or(defaults.num_agents),
        move_speed: args.move_speed.unwrap_or(defaults.move_speed),
        evaporate_speed: args.evaporate_speed.unwrap_or(defaults.evaporate_speed),
        diffuse_rate: args.diffuse_rate.unwrap_or(defaults.diffuse_rate),
        turn_speed: args
            .turn_speed
            .map_or(defaults.turn_speed, Precision::to_radians),
        sensor_offset_distance: args.sensor_offset.unwrap_or(defaults.sensor_offset_distance),
        sensor_size: args.sensor_size.unwrap_or(defaults.sensor_size),
        sensor_angle: args
            .sensor_angle
            .map_or(defaults.sensor_angle, Precision::to_radians),
        diffusion_radius: args.diffusion_radius.unwrap_or(defaults.diffusion_radius),
        deposit_amount: args.deposit_amount.unwrap_or(defaults.deposit_amount),
        steering_jitter: args.steering_jitter.unwrap_or(defaults.steering_jitter),
        spawn: Spawn {
            pattern: args.spawn_pattern,
            angle: args.spawn_angle,
        },
    }
}

/// Color gradient shared by the simulation visualizations
#[cfg(feature = "visualization")]
pub const GRADIENT: colorous::Gradient = colorous::INFERNO;

/// Number of color stops sampled from GRADIENT
#[cfg(feature = "visualization")]
pub const GRADIENT_RESOLUTION: usize = 64;

/// Color stops approximating GRADIENT
#[cfg(feature = "visualization")]
pub fn gradient_stops(resolution: usize) -> impl Iterator<Item = ColorStop> {
    assert!(resolution >= 2, "Gradient must have at least two endpoints");
    let last = (resolution - 1) as f64;
    (0..resolution).map(move |idx| {
        let position = idx as f64 / last;
        let colorous::Color { r, g, b } = GRADIENT.eval_continuous(position);
        ColorStop {
            position: position as Precision,
            color: Color { r, g, b },
        }
    })
}

/// Trail intensity that maps to the brightest color of the visualizations
pub const MAX_INTENSITY: Precision = 1.0;

/// Set up logging to stderr, configured via the RUST_LOG environment variable
#[cfg(feature = "tui")]
pub fn init_logging() {
    env_logger::init();
}

/// Set up a progress bar for a certain number of operations
#[cfg(feature = "tui")]
pub fn init_progress_reporting(message: &'static str, len: usize) -> ProgressBar {
    let progress = ProgressBar::new(len as u64).with_message(message);
    if let Ok(style) =
        ProgressStyle::with_template("{msg} {wide_bar} {pos}/{len} ({elapsed}, ETA {eta})")
    {
        progress.set_style(style);
    }
    progress
}
