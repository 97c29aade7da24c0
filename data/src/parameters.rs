//! Simulation parameters

use crate::Precision;
use std::f32::consts::{FRAC_PI_4, TAU};
use thiserror::Error;

/// Simulation parameters
///
/// These stay constant over the course of a simulation run. Speeds and rates
/// are expressed per unit of simulated time, angles are in radians and
/// distances are in trail map cells.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Parameters {
    /// Number of agents
    pub num_agents: usize,

    /// Distance traveled by agents per unit of time
    pub move_speed: Precision,

    /// Fraction of the trail intensity that evaporates per unit of time
    pub evaporate_speed: Precision,

    /// Speed at which the trail map is blurred towards its local average
    pub diffuse_rate: Precision,

    /// Maximal rotation speed of agents in radians per unit of time
    pub turn_speed: Precision,

    /// Distance from an agent to its sensors
    pub sensor_offset_distance: Precision,

    /// Half-width of the square area of trail map cells read by a sensor
    pub sensor_size: usize,

    /// Angle between the forward sensor and the side sensors
    pub sensor_angle: Precision,

    /// Half-width of the square neighborhood used for diffusion
    pub diffusion_radius: usize,

    /// Trail intensity deposited by each agent per unit of time
    pub deposit_amount: Precision,

    /// Amplitude of random turns when no side sensor is clearly favored,
    /// as a fraction of the maximal turn
    pub steering_jitter: Precision,

    /// Initial agent placement
    pub spawn: Spawn,
}
//
impl Default for Parameters {
    fn default() -> Self {
        Self {
            num_agents: 100_000,
            move_speed: 6.6,
            evaporate_speed: 0.14,
            diffuse_rate: 47.96,
            turn_speed: 0.23 * TAU,
            sensor_offset_distance: 6.0,
            sensor_size: 1,
            sensor_angle: FRAC_PI_4,
            diffusion_radius: 1,
            deposit_amount: 1.0,
            steering_jitter: 1.0,
            spawn: Spawn::default(),
        }
    }
}
//
impl Parameters {
    /// Check that these parameters describe a valid simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_agents == 0 {
            return Err(ConfigError::NoAgents);
        }
        for (name, value) in [
            ("move_speed", self.move_speed),
            ("evaporate_speed", self.evaporate_speed),
            ("diffuse_rate", self.diffuse_rate),
            ("turn_speed", self.turn_speed),
            ("sensor_offset_distance", self.sensor_offset_distance),
            ("deposit_amount", self.deposit_amount),
            ("steering_jitter", self.steering_jitter),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if !self.sensor_angle.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "sensor_angle",
                value: self.sensor_angle,
            });
        }
        Ok(())
    }

    /// Check that a trail map shape can be simulated
    pub fn validate_shape(shape: [usize; 2]) -> Result<(), ConfigError> {
        if shape.contains(&0) {
            return Err(ConfigError::EmptyField { shape });
        }
        Ok(())
    }
}

/// Initial agent placement policy
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Spawn {
    /// Where agents are initially located
    pub pattern: SpawnPattern,

    /// Which way agents are initially heading
    pub angle: SpawnAngle,
}

/// Where agents are initially located
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SpawnPattern {
    /// All agents start at the center of the trail map
    #[default]
    Center,

    /// Agents are uniformly distributed over the trail map
    Random,

    /// Agents are uniformly distributed within a centered disk
    RandomInCircle,
}

/// Which way agents are initially heading
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SpawnAngle {
    /// Uniformly distributed heading
    Random,

    /// Heading towards the center of the trail map
    #[default]
    TowardsCenter,

    /// Heading away from the center of the trail map
    AwayFromCenter,
}

/// Simulation configuration errors
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The simulation needs at least one agent
    #[error("the simulation needs at least one agent")]
    NoAgents,

    /// The trail map must contain at least one cell
    #[error("trail map shape {shape:?} contains no cell")]
    EmptyField { shape: [usize; 2] },

    /// A numerical parameter is out of its valid range
    #[error("parameter {name} has invalid value {value}")]
    InvalidParameter {
        name: &'static str,
        value: Precision,
    },

    /// A color gradient must have at least one color stop
    #[error("color gradient has no color stop")]
    EmptyGradient,

    /// Color stops must be located within [0, 1]
    #[error("color stop position {position} is outside of [0, 1]")]
    StopOutOfRange { position: Precision },

    /// Color stops must be sorted by position
    #[error("color stop at {position} comes after a stop at {previous}")]
    UnorderedStops {
        previous: Precision,
        position: Precision,
    },

    /// Colorization was requested before any gradient was configured
    #[error("no color gradient has been configured")]
    MissingGradient,
}
