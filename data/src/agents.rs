//! Population of trail-following agents

use crate::{
    alloc::{self, ResourceError},
    array2,
    parameters::{Spawn, SpawnAngle, SpawnPattern},
    Precision,
};
use rand::Rng;
use rand_distr::{Distribution, UnitDisc};
use std::f32::consts::TAU;

/// Fraction of the largest centered disk that `RandomInCircle` spawns into
const SPAWN_DISK_FILL: Precision = 0.85;

/// Independent point-like agent that senses and deposits trail
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Agent {
    /// Position in trail map coordinates, as `[x, y]` with `x` along columns
    pub position: [Precision; 2],

    /// Heading in radians, counterclockwise from the `x` axis
    pub heading: Precision,
}

/// Dense, fixed-size collection of agents
#[derive(Clone, Debug, PartialEq)]
pub struct Agents {
    /// Agent storage
    agents: Vec<Agent>,

    /// Seed of the per-agent random streams used during steering
    seed: u64,
}
//
impl Agents {
    /// Allocate and spawn `num_agents` agents on a trail map of a certain shape
    ///
    /// `shape` is `[rows, cols]`, i.e. `[height, width]`.
    pub fn spawn(
        num_agents: usize,
        spawn: Spawn,
        shape: [usize; 2],
        rng: &mut impl Rng,
    ) -> Result<Self, ResourceError> {
        let agents = alloc::try_filled_vec("agent store", num_agents, Agent::default())?;
        let mut result = Self { agents, seed: 0 };
        result.respawn(spawn, shape, rng);
        Ok(result)
    }

    /// Spawn the agents again without changing the population size
    pub fn respawn(&mut self, spawn: Spawn, shape: [usize; 2], rng: &mut impl Rng) {
        self.seed = rng.random();
        let center = center(shape);
        let extent = extent(shape);

        // Set the position of the agents
        match spawn.pattern {
            SpawnPattern::Center => {
                for agent in &mut self.agents {
                    agent.position = center;
                }
            }
            SpawnPattern::Random => {
                for agent in &mut self.agents {
                    agent.position = array2(|i| rng.random_range(0.0..extent[i]));
                }
            }
            SpawnPattern::RandomInCircle => {
                let radius = extent[0].min(extent[1]) / 2.0 * SPAWN_DISK_FILL;
                for agent in &mut self.agents {
                    let offset: [Precision; 2] = UnitDisc.sample(rng);
                    let position = array2(|i| center[i] + radius * offset[i]);
                    agent.position = clamp_position(position, shape);
                }
            }
        }

        // Set the heading of the agents
        for agent in &mut self.agents {
            agent.heading = match spawn.angle {
                SpawnAngle::Random => rng.random_range(0.0..TAU),
                SpawnAngle::TowardsCenter => direction(agent.position, center),
                SpawnAngle::AwayFromCenter => direction(center, agent.position),
            };
        }
    }

    /// Number of agents
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Truth that there are no agents, which valid parameters rule out
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Seed of the per-agent random streams used during steering
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Read access to the agents
    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    /// Write access to the agents
    pub fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }
}

/// Size of a trail map of a certain `[rows, cols]` shape, as `[width, height]`
pub fn extent([rows, cols]: [usize; 2]) -> [Precision; 2] {
    [cols as Precision, rows as Precision]
}

/// Center of a trail map of a certain `[rows, cols]` shape, as `[x, y]`
pub fn center(shape: [usize; 2]) -> [Precision; 2] {
    extent(shape).map(|length| length / 2.0)
}

/// Bring a position back inside of a trail map of a certain shape
///
/// Positions are clamped to the center of the last row/column of cells, so
/// that they are safely inside of the trail map even after rounding.
pub fn clamp_position(position: [Precision; 2], shape: [usize; 2]) -> [Precision; 2] {
    let extent = extent(shape);
    array2(|i| position[i].clamp(0.0, (extent[i] - 1.0).max(0.0)))
}

/// Trail map cell containing a position, as `[row, col]`
///
/// The position must be inside of the trail map.
pub fn cell_of([x, y]: [Precision; 2]) -> [usize; 2] {
    debug_assert!(x >= 0.0 && y >= 0.0);
    [y as usize, x as usize]
}

/// Angle of the direction going from `from` to `to`
///
/// Falls back to 0 when both points are the same.
fn direction(from: [Precision; 2], to: [Precision; 2]) -> Precision {
    let [dx, dy] = array2(|i| to[i] - from[i]);
    if dx == 0.0 && dy == 0.0 {
        0.0
    } else {
        dy.atan2(dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const SHAPE: [usize; 2] = [48, 64];

    fn spawn(num_agents: usize, pattern: SpawnPattern, angle: SpawnAngle) -> Agents {
        let mut rng = StdRng::seed_from_u64(42);
        Agents::spawn(num_agents, Spawn { pattern, angle }, SHAPE, &mut rng).unwrap()
    }

    fn assert_in_bounds(agents: &Agents) {
        let [width, height] = extent(SHAPE);
        for agent in agents.as_slice() {
            let [x, y] = agent.position;
            assert!((0.0..width).contains(&x), "{x} out of [0, {width})");
            assert!((0.0..height).contains(&y), "{y} out of [0, {height})");
        }
    }

    #[test]
    fn population_and_bounds() {
        for pattern in [
            SpawnPattern::Center,
            SpawnPattern::Random,
            SpawnPattern::RandomInCircle,
        ] {
            for num_agents in [1, 17, 1000] {
                let agents = spawn(num_agents, pattern, SpawnAngle::Random);
                assert_eq!(agents.len(), num_agents);
                assert_in_bounds(&agents);
            }
        }
    }

    #[test]
    fn center_pattern() {
        let agents = spawn(100, SpawnPattern::Center, SpawnAngle::Random);
        for agent in agents.as_slice() {
            assert_eq!(agent.position, [32.0, 24.0]);
            assert!((0.0..TAU).contains(&agent.heading));
        }
    }

    #[test]
    fn circle_pattern() {
        let agents = spawn(1000, SpawnPattern::RandomInCircle, SpawnAngle::Random);
        let [cx, cy] = center(SHAPE);
        let radius = 24.0 * SPAWN_DISK_FILL;
        for agent in agents.as_slice() {
            let [x, y] = agent.position;
            assert!((x - cx).hypot(y - cy) <= radius + 1e-4);
        }
    }

    #[test]
    fn towards_and_away_from_center() {
        let [cx, cy] = center(SHAPE);
        let towards = spawn(500, SpawnPattern::Random, SpawnAngle::TowardsCenter);
        for agent in towards.as_slice() {
            let [x, y] = agent.position;
            let expected = (cy - y).atan2(cx - x);
            assert!((agent.heading - expected).abs() < 1e-5);
        }
        let away = spawn(500, SpawnPattern::Random, SpawnAngle::AwayFromCenter);
        for agent in away.as_slice() {
            let [x, y] = agent.position;
            let expected = (y - cy).atan2(x - cx);
            assert!((agent.heading - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_direction() {
        let agents = spawn(10, SpawnPattern::Center, SpawnAngle::TowardsCenter);
        assert!(agents.as_slice().iter().all(|agent| agent.heading == 0.0));
        let agents = spawn(10, SpawnPattern::Center, SpawnAngle::AwayFromCenter);
        assert!(agents.as_slice().iter().all(|agent| agent.heading == 0.0));
    }

    #[test]
    fn respawn_keeps_population() {
        let mut rng = StdRng::seed_from_u64(7);
        let spawn = Spawn {
            pattern: SpawnPattern::Random,
            angle: SpawnAngle::Random,
        };
        let mut agents = Agents::spawn(64, spawn, SHAPE, &mut rng).unwrap();
        let before = agents.clone();
        agents.respawn(spawn, SHAPE, &mut rng);
        assert_eq!(agents.len(), 64);
        assert_ne!(agents, before);
        assert_in_bounds(&agents);
    }

    #[test]
    fn clamping() {
        assert_eq!(clamp_position([-3.0, 100.0], SHAPE), [0.0, 47.0]);
        assert_eq!(clamp_position([63.5, 12.25], SHAPE), [63.0, 12.25]);
        assert_eq!(cell_of([63.0, 12.25]), [12, 63]);
    }
}
