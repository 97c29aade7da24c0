//! Facilities that are specific to CPU implementations

use crate::{Simulate, SimulateBase, SimulateCreate, Tick};
use data::{
    agents::Agent,
    colony::Colony,
    trail::{AtomicTrail, FieldView, FieldViewMut, TrailMap},
};
use ndarray::Axis;

/// Lower-level interface to a CPU compute backend
///
/// The work of a simulation step is expressed in terms of blocks of agents
/// and blocks of trail map rows, which can be processed independently of each
/// other. This is used by the `parallel` backend to slice each step into
/// smaller sub-computations for parallelization purposes.
///
/// If you implement this, then `Simulate` will be implemented automatically
pub trait SimulateCpu: SimulateBase + SimulateCreate {
    /// Make a block of agents sense the trail map, steer and move
    ///
    /// The trail map is only read here. Deposits happen in a separate pass, so
    /// that all agents of a step sense the same trail map.
    fn move_agents(&self, agents: AgentBlock<'_>, trail: FieldView<'_>, tick: Tick);

    /// Make a block of agents deposit trail at their current location
    fn deposit(&self, agents: &[Agent], trail: &AtomicTrail<'_>, tick: Tick);

    /// Diffuse and evaporate a block of trail map rows
    ///
    /// This method does not check the block for consistency, but is used to
    /// implement `process_rows` that does perform some sanity checks.
    fn unchecked_process_rows(&self, block: RowBlock<'_, '_>, tick: Tick);

    /// Like `unchecked_process_rows()`, but with some sanity checks
    #[inline]
    fn process_rows(&self, block: RowBlock<'_, '_>, tick: Tick) {
        block.check();
        self.unchecked_process_rows(block, tick);
    }
}
//
impl<T: SimulateCpu> Simulate for T {
    fn step_agents(&self, colony: &mut Colony, tick: Tick) -> Result<(), Self::Error> {
        let seed = colony.agents.seed();
        self.move_agents(
            AgentBlock {
                first_index: 0,
                seed,
                agents: colony.agents.as_mut_slice(),
            },
            colony.trail.current(),
            tick,
        );
        self.deposit(
            colony.agents.as_slice(),
            &colony.trail.current_atomic(),
            tick,
        );
        Ok(())
    }

    fn process_trail(&self, trail: &mut TrailMap, tick: Tick) -> Result<(), Self::Error> {
        let (input, output) = trail.in_out();
        self.process_rows(
            RowBlock {
                input,
                first_row: 0,
                output,
            },
            tick,
        );
        Ok(())
    }
}

/// Contiguous block of agents from the agent store
#[derive(Debug)]
pub struct AgentBlock<'agents> {
    /// Index of the first agent of the block within the agent store
    pub first_index: usize,

    /// Seed of the per-agent random streams
    pub seed: u64,

    /// Agents from the block
    pub agents: &'agents mut [Agent],
}
//
impl<'agents> AgentBlock<'agents> {
    /// Number of agents in the block
    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Truth that the block contains no agent
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Split the block into two halves
    #[inline]
    pub fn split(self) -> [Self; 2] {
        let Self {
            first_index,
            seed,
            agents,
        } = self;
        let split_point = agents.len() / 2;
        let (first, second) = agents.split_at_mut(split_point);
        [
            Self {
                first_index,
                seed,
                agents: first,
            },
            Self {
                first_index: first_index + split_point,
                seed,
                agents: second,
            },
        ]
    }

    /// Iterate over agents along with their index in the agent store
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Agent)> + '_ {
        let first_index = self.first_index;
        (self.agents.iter_mut())
            .enumerate()
            .map(move |(offset, agent)| (first_index + offset, agent))
    }
}

/// Block of rows from the trail processing stage
///
/// Composed of the full current trail map, which is only read, and of a
/// subset of the rows of the secondary trail map, which are written.
#[derive(Debug)]
pub struct RowBlock<'input, 'output> {
    /// Full current trail map
    pub input: FieldView<'input>,

    /// Index of the first output row within the full trail map
    pub first_row: usize,

    /// Rows of the secondary trail map to be computed
    pub output: FieldViewMut<'output>,
}
//
impl<'input, 'output> RowBlock<'input, 'output> {
    /// Number of output cells
    #[inline]
    pub fn len(&self) -> usize {
        self.output.len()
    }

    /// Truth that the block contains no output cell
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Check that the row block seems correct
    ///
    /// Full correctness checking would involve making sure that the output
    /// rows belong to the buffer paired with the input, which cannot be done.
    /// Therefore, this is only a partial sanity check.
    #[inline]
    pub fn check(&self) {
        debug_assert_eq!(self.input.ncols(), self.output.ncols());
        debug_assert!(self.first_row + self.output.nrows() <= self.input.nrows());
    }

    /// Split the output rows into two halves
    #[inline]
    pub fn split(self) -> [Self; 2] {
        self.check();
        let split_point = self.output.nrows() / 2;
        let (first, second) = self.output.split_at(Axis(0), split_point);
        [
            Self {
                input: self.input,
                first_row: self.first_row,
                output: first,
            },
            Self {
                input: self.input,
                first_row: self.first_row + split_point,
                output: second,
            },
        ]
    }
}
