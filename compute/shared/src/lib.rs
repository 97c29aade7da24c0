//! Common facilities shared by all compute backends

#[cfg(feature = "criterion")]
#[doc(hidden)]
pub mod benchmark;
#[cfg(feature = "cpu")]
pub mod cpu;

use clap::Args;
use data::{colony::Colony, parameters::Parameters, trail::TrailMap, Precision};
use std::{error::Error, fmt::Debug};

/// Commonalities between all ways to set up a simulation
pub trait SimulateBase: Sized {
    /// Supplementary CLI arguments allowing fine-tuning of this backend
    ///
    /// To honor the principle of least surprise and make criterion
    /// microbenchmarks work smoothly, any argument you add must have a default
    /// value and should also be configurable through environment variables.
    type CliArgs: Args + Clone + Debug;

    /// Error type used by simulation operations
    type Error: Error + Send + Sync + 'static;
}

/// Simulation backend that can be created from parameters alone
pub trait SimulateCreate: SimulateBase {
    /// Set up the simulation backend
    ///
    /// `params` must have been validated beforehand.
    fn new(params: Parameters, args: Self::CliArgs) -> Result<Self, Self::Error>;
}

/// Simulation compute backend interface
///
/// A simulation time step is made of two stages that must execute in order:
/// agents first sense, steer, move and deposit onto the current trail map,
/// then the current trail map is diffused and evaporated into the secondary
/// trail map. The secondary trail map then becomes the current one.
pub trait Simulate: SimulateBase {
    /// Perform the agent stepping stage of a time step
    ///
    /// Agents read the current trail map of `colony` and deposit into it.
    fn step_agents(&self, colony: &mut Colony, tick: Tick) -> Result<(), Self::Error>;

    /// Perform the trail processing stage of a time step
    ///
    /// The current trail map is read and the result is written into the
    /// secondary trail map. It is the job of the caller to flip the trail maps
    /// afterwards.
    fn process_trail(&self, trail: &mut TrailMap, tick: Tick) -> Result<(), Self::Error>;

    /// Perform a full time step
    fn perform_step(&self, colony: &mut Colony, tick: Tick) -> Result<(), Self::Error> {
        self.step_agents(colony, tick)?;
        self.process_trail(&mut colony.trail, tick)?;
        colony.trail.flip();
        Ok(())
    }
}

/// Timing of a simulation time step
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tick {
    /// Simulated time elapsed during this step
    pub delta_time: Precision,

    /// Simulated time at the start of this step
    pub time: Precision,
}
//
impl Tick {
    /// Describe a time step
    ///
    /// `delta_time` must not be negative or NaN. This is only checked in debug
    /// builds, release builds treat such time steps as empty.
    pub fn new(delta_time: Precision, time: Precision) -> Self {
        debug_assert!(
            delta_time >= 0.0,
            "time step must be positive or zero, got {delta_time}"
        );
        Self {
            delta_time: delta_time.max(0.0),
            time,
        }
    }
}

/// Placeholder for backends without CLI arguments
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct NoArgs;

/// Macro that generates a complete criterion benchmark harness for you
#[macro_export]
#[cfg(feature = "criterion")]
macro_rules! criterion_benchmark {
    ($backend:ident) => {
        fn criterion_benchmark(c: &mut $crate::benchmark::criterion::Criterion) {
            $crate::benchmark::criterion_benchmark::<$backend::Simulation>(
                c,
                stringify!($backend),
            )
        }
        $crate::benchmark::criterion::criterion_group!(benches, criterion_benchmark);
        $crate::benchmark::criterion::criterion_main!(benches);
    };
}
