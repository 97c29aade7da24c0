//! Complete simulation state

use crate::{agents::Agents, parameters::Parameters, trail::TrailMap, Error};
use rand::Rng;

/// Agents and the trail map they move on
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct Colony {
    /// Agent store
    pub agents: Agents,

    /// Double-buffered trail map
    pub trail: TrailMap,
}
//
impl Colony {
    /// Set up a colony on a trail map of a certain shape
    ///
    /// `shape` specifies the trail map dimensions as [rows, cols], e.g. [1080, 1920]
    pub fn new(params: &Parameters, shape: [usize; 2], rng: &mut impl Rng) -> Result<Self, Error> {
        params.validate()?;
        Parameters::validate_shape(shape)?;
        let trail = TrailMap::zeros(shape)?;
        let agents = Agents::spawn(params.num_agents, params.spawn, shape, rng)?;
        Ok(Self { agents, trail })
    }

    /// Check out the shape of the trail map
    pub fn shape(&self) -> [usize; 2] {
        self.trail.shape()
    }

    /// Spawn agents again and clear the trail map
    pub fn reset(&mut self, params: &Parameters, rng: &mut impl Rng) {
        let shape = self.shape();
        self.agents.respawn(params.spawn, shape, rng);
        self.trail.clear();
    }
}
