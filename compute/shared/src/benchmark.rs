//! Benchmarking utilities
//!
//! Please consider using the macros provided by this crate instead of calling
//! these implementation details directly.

use crate::{Simulate, SimulateCreate, Tick};
use clap::{Args, Command, FromArgMatches};
use criterion::{BenchmarkId, Criterion, Throughput};
use data::{colony::Colony, parameters::Parameters};
use rand::{rngs::StdRng, SeedableRng};
use std::{hint::black_box, sync::Once};

/// Re-export criterion for the criterion_benchmark macro
pub use criterion;

/// Simulated time step used by benchmarks
const DELTA_TIME: data::Precision = 0.02;

// Make sure env_logger is only initialized once
fn init_logger() {
    static INIT_LOGGER: Once = Once::new();
    INIT_LOGGER.call_once(env_logger::init);
}

/// Common criterion benchmark for all slime mold simulation backends
/// Use via the criterion_benchmark macro
pub fn criterion_benchmark<Simulation: SimulateCreate + Simulate>(
    c: &mut Criterion,
    backend_name: &str,
) {
    init_logger();

    let args = Simulation::CliArgs::from_arg_matches(
        &Simulation::CliArgs::augment_args(Command::default().no_binary_name(true))
            .get_matches_from(None::<&str>),
    )
    .expect("Failed to parse arguments from defaults & environment");

    let mut group = c.benchmark_group(backend_name.to_owned());
    for num_agents_pow2 in [10, 14, 17] {
        let num_agents = 2usize.pow(num_agents_pow2);
        let params = Parameters {
            num_agents,
            ..Default::default()
        };
        let sim = Simulation::new(black_box(params), black_box(args.clone()))
            .expect("Failed to set up the simulation");
        for size_pow2 in 7..=10 {
            let size = 2usize.pow(size_pow2);
            let shape = [size, 2 * size];
            let num_elems = (shape[0] * shape[1] + num_agents) as u64;

            let mut rng = StdRng::seed_from_u64(size as u64);
            let mut colony =
                Colony::new(&params, black_box(shape), &mut rng).expect("Failed to set up colony");
            let mut time = 0.0;

            group.throughput(Throughput::Elements(num_elems));
            group.bench_function(
                BenchmarkId::from_parameter(format!(
                    "{}x{}cells,{num_agents}agents",
                    shape[1], shape[0]
                )),
                |b| {
                    b.iter(|| {
                        sim.perform_step(&mut colony, Tick::new(DELTA_TIME, time))
                            .expect("Failed to perform simulation step");
                        time += DELTA_TIME;
                    });
                },
            );
            black_box(colony);
        }
    }
    group.finish();
}
