//! Parallel implementation of the slime mold simulation
//!
//! This crate implements a parallel version of the slime mold simulation
//! based on domain decomposition and fork-join parallelism. Agents and trail
//! map rows are recursively split into blocks until the blocks are small
//! enough to be processed sequentially by the underlying backend.

use clap::Args;
use compute::{
    cpu::{AgentBlock, RowBlock, SimulateCpu},
    SimulateBase, SimulateCreate, Tick,
};
use data::{
    agents::Agent,
    parameters::Parameters,
    trail::{AtomicTrail, FieldView},
    Precision,
};
use rayon::{prelude::*, ThreadPoolBuildError, ThreadPoolBuilder};
use std::num::NonZeroUsize;
use thiserror::Error;

/// Slime mold simulation
pub type Simulation = ParallelSimulation<compute_naive::Simulation>;

/// Parameters are tunable via CLI args and environment variables
#[derive(Args, Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct CliArgs<BackendArgs: Args> {
    /// Number of processing threads
    #[arg(short = 'j', long, env)]
    num_threads: Option<NonZeroUsize>,

    /// Number of processed bytes per parallel task
    ///
    /// There is a granularity compromise between exposing opportunities for
    /// parallelism and keeping individual sequential tasks efficient. This
    /// block size is the tuning knob that lets you fine-tune this compromise.
    /// The default is sized for a typical per-core L2 cache.
    #[arg(long, env, default_value = "262144")]
    seq_block_size: NonZeroUsize,

    /// Expose backend arguments too
    #[command(flatten)]
    backend: BackendArgs,
}

/// Slime mold simulation wrapper that enforces parallel iteration
#[derive(Debug)]
pub struct ParallelSimulation<Backend: SimulateCpu + Sync> {
    /// Number of agents below which parallelism is not considered worthwhile
    sequential_agents: usize,

    /// Number of trail map cells below which parallelism is not considered
    /// worthwhile
    sequential_cells: usize,

    /// Underlying sequential compute backend
    backend: Backend,
}
//
impl<Backend: SimulateCpu + Sync> SimulateBase for ParallelSimulation<Backend> {
    type CliArgs = CliArgs<Backend::CliArgs>;

    type Error = Error<<Backend as SimulateBase>::Error>;
}
//
impl<Backend: SimulateCpu + Sync> SimulateCreate for ParallelSimulation<Backend> {
    fn new(params: Parameters, args: Self::CliArgs) -> Result<Self, Self::Error> {
        if let Some(num_threads) = args.num_threads {
            ThreadPoolBuilder::new()
                .num_threads(num_threads.into())
                .build_global()
                .map_err(Error::ThreadPool)?;
        }
        let seq_block_size = usize::from(args.seq_block_size);
        let sequential_agents = (seq_block_size / std::mem::size_of::<Agent>()).max(1);
        let sequential_cells = (seq_block_size / std::mem::size_of::<Precision>()).max(1);
        log::debug!(
            "Processing up to {sequential_agents} agents or {sequential_cells} cells per task \
             on {} threads",
            rayon::current_num_threads()
        );

        Ok(Self {
            sequential_agents,
            sequential_cells,
            backend: Backend::new(params, args.backend).map_err(Error::Backend)?,
        })
    }
}
//
impl<Backend: SimulateCpu + Sync> SimulateCpu for ParallelSimulation<Backend> {
    fn move_agents(&self, agents: AgentBlock<'_>, trail: FieldView<'_>, tick: Tick) {
        rayon::iter::split(agents, |block| {
            if block.len() <= self.sequential_agents {
                (block, None)
            } else {
                let [half1, half2] = block.split();
                (half1, Some(half2))
            }
        })
        .for_each(|block| {
            self.backend.move_agents(block, trail, tick);
        });
    }

    fn deposit(&self, agents: &[Agent], trail: &AtomicTrail<'_>, tick: Tick) {
        agents
            .par_chunks(self.sequential_agents)
            .for_each(|chunk| self.backend.deposit(chunk, trail, tick));
    }

    fn unchecked_process_rows(&self, block: RowBlock<'_, '_>, tick: Tick) {
        rayon::iter::split(block, |block| {
            if block.len() <= self.sequential_cells || block.output.nrows() < 2 {
                (block, None)
            } else {
                let [half1, half2] = block.split();
                (half1, Some(half2))
            }
        })
        .for_each(|block| {
            self.backend.process_rows(block, tick);
        });
    }
}

/// Things that can go wrong when performing parallel simulation
#[derive(Debug, Error)]
pub enum Error<BackendError: std::error::Error> {
    /// Error from the underlying compute backend
    #[error(transparent)]
    Backend(BackendError),

    /// Failed to configure thread pool
    #[error("failed to configure thread pool")]
    ThreadPool(#[source] ThreadPoolBuildError),
}
