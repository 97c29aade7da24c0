//! Naive implementation of the slime mold simulation
//!
//! This version processes agents and trail map cells one after the other, in
//! the most straightforward way. It serves as a reference for other backends,
//! which reuse its per-agent and per-cell logic.

use compute::{
    cpu::{AgentBlock, RowBlock, SimulateCpu},
    NoArgs, SimulateBase, SimulateCreate, Tick,
};
use data::{
    agents::{self, Agent},
    array2,
    parameters::Parameters,
    trail::{AtomicTrail, FieldView},
    Precision,
};
use ndarray::s;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{
    convert::Infallible,
    f32::consts::{PI, TAU},
    ops::Range,
};

/// Slime mold simulation
#[derive(Debug)]
pub struct Simulation {
    /// Simulation parameters
    params: Parameters,
}
//
impl SimulateBase for Simulation {
    type CliArgs = NoArgs;

    type Error = Infallible;
}
//
impl SimulateCreate for Simulation {
    fn new(params: Parameters, _args: NoArgs) -> Result<Self, Infallible> {
        Ok(Self { params })
    }
}
//
impl SimulateCpu for Simulation {
    fn move_agents(&self, mut agents: AgentBlock<'_>, trail: FieldView<'_>, tick: Tick) {
        let seed = agents.seed;
        for (index, agent) in agents.iter_mut() {
            self.move_agent(agent, index, seed, trail, tick);
        }
    }

    fn deposit(&self, agents: &[Agent], trail: &AtomicTrail<'_>, tick: Tick) {
        let amount = self.params.deposit_amount * tick.delta_time;
        for agent in agents {
            trail.add(agents::cell_of(agent.position), amount);
        }
    }

    fn unchecked_process_rows(&self, block: RowBlock<'_, '_>, tick: Tick) {
        let RowBlock {
            input,
            first_row,
            mut output,
        } = block;
        let shape = [input.nrows(), input.ncols()];
        let params = &self.params;

        // The blending weight is clamped so that large time steps cannot
        // overshoot the neighborhood average
        let diffuse_weight = (params.diffuse_rate * tick.delta_time).clamp(0.0, 1.0);
        let evaporation = (1.0 - params.evaporate_speed * tick.delta_time).max(0.0);

        // Iterate over output cells
        let radius = params.diffusion_radius;
        ndarray::azip!((index (out_row, out_col), out in &mut output) {
            // Determine neighborhood input region
            let in_pos = [first_row + out_row, out_col];
            let in_range = array2(|i| window(in_pos[i], radius, shape[i]));
            let neighborhood = input.slice(s![in_range[0].clone(), in_range[1].clone()]);

            // Blend with the neighborhood average
            let value = input[in_pos];
            let diffused = if diffuse_weight > 0.0 {
                let inv_len = 1.0 / neighborhood.len() as Precision;
                let mean = neighborhood.fold(0.0, |acc, &x| acc + x * inv_len);
                value * (1.0 - diffuse_weight) + mean * diffuse_weight
            } else {
                value
            };

            // Evaporate, starting from a finite value so that a fully evaporated
            // cell is zero rather than NaN
            *out = diffused.min(Precision::MAX) * evaporation;
        });
    }
}
//
impl Simulation {
    /// Make an agent sense the trail map, steer and move
    #[inline]
    fn move_agent(
        &self,
        agent: &mut Agent,
        index: usize,
        seed: u64,
        trail: FieldView<'_>,
        tick: Tick,
    ) {
        let params = &self.params;
        let shape = [trail.nrows(), trail.ncols()];
        let [width, height] = agents::extent(shape);

        // Sense the trail map and steer accordingly
        let [left, forward, right] = [params.sensor_angle, 0.0, -params.sensor_angle]
            .map(|angle_offset| self.sense(agent, angle_offset, trail));
        let max_turn = (params.turn_speed * tick.delta_time).min(Precision::MAX);
        let turn = match Turn::decide(left, forward, right) {
            Turn::Straight => 0.0,
            Turn::Left => max_turn,
            Turn::Right => -max_turn,
            Turn::Random => {
                let jitter = 2.0 * random_unit(seed, tick.time, index) - 1.0;
                jitter * params.steering_jitter * max_turn
            }
        };
        if turn != 0.0 {
            let turn = turn.clamp(-Precision::MAX, Precision::MAX);
            agent.heading = wrap_heading(agent.heading + turn);
        }

        // Move forward, any further than the trail map extent ends up clamped
        let distance = (params.move_speed * tick.delta_time).min(width + height);
        let (sin, cos) = agent.heading.sin_cos();
        let [x, y] = agent.position;
        let position = [x + distance * cos, y + distance * sin];

        // Bounce off the edges of the trail map
        let outside_x = !(0.0..width).contains(&position[0]);
        let outside_y = !(0.0..height).contains(&position[1]);
        if outside_x {
            agent.heading = PI - agent.heading;
        }
        if outside_y {
            agent.heading = -agent.heading;
        }
        agent.position = if outside_x || outside_y {
            agent.heading = wrap_heading(agent.heading);
            agents::clamp_position(position, shape)
        } else {
            position
        };
    }

    /// Total trail intensity around a sensor
    ///
    /// The sensor is located `sensor_offset_distance` ahead of the agent, at
    /// an angle `angle_offset` from its heading. Cells outside of the trail
    /// map do not contribute.
    #[inline]
    fn sense(&self, agent: &Agent, angle_offset: Precision, trail: FieldView<'_>) -> Precision {
        let params = &self.params;
        let (sin, cos) = (agent.heading + angle_offset).sin_cos();
        let [x, y] = agent.position;
        let sensor_cell = [
            (y + params.sensor_offset_distance * sin).floor() as isize,
            (x + params.sensor_offset_distance * cos).floor() as isize,
        ];
        let shape = [trail.nrows(), trail.ncols()];
        let range = array2(|i| signed_window(sensor_cell[i], params.sensor_size, shape[i]));
        trail.slice(s![range[0].clone(), range[1].clone()]).sum()
    }
}

/// Steering decision of an agent
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Turn {
    /// Keep the current heading
    Straight,

    /// Turn towards the positive angle sensor
    Left,

    /// Turn towards the negative angle sensor
    Right,

    /// Turn by a random amount in either direction
    Random,
}
//
impl Turn {
    /// Decide which way to turn given sensor readings
    ///
    /// Ties with the forward sensor are resolved by going straight. If both
    /// side sensors beat the forward sensor, no direction is favored and the
    /// agent turns randomly.
    fn decide(left: Precision, forward: Precision, right: Precision) -> Self {
        if forward >= left && forward >= right {
            Self::Straight
        } else if forward < left && forward < right {
            Self::Random
        } else if left > right {
            Self::Left
        } else {
            Self::Right
        }
    }
}

/// Bring a heading back into [0, 2π)
#[inline]
fn wrap_heading(heading: Precision) -> Precision {
    heading.rem_euclid(TAU)
}

/// Random number in [0, 1) for a given agent and time step
///
/// Only depends on its inputs, so results do not depend on the order in which
/// agents are processed.
#[inline]
fn random_unit(seed: u64, time: Precision, index: usize) -> Precision {
    let stream = seed ^ (u64::from(time.to_bits()) << 32) ^ index as u64;
    SmallRng::seed_from_u64(stream).random()
}

/// Range of indices within `radius` of `center` along an axis of length `len`
#[inline]
fn window(center: usize, radius: usize, len: usize) -> Range<usize> {
    center.saturating_sub(radius)..center.saturating_add(radius).saturating_add(1).min(len)
}

/// Like `window()`, but the center may lie outside of the axis
#[inline]
fn signed_window(center: isize, radius: usize, len: usize) -> Range<usize> {
    let radius = isize::try_from(radius).unwrap_or(isize::MAX);
    let len_signed = isize::try_from(len).unwrap_or(isize::MAX);
    let start = center.saturating_sub(radius).clamp(0, len_signed) as usize;
    let end = center
        .saturating_add(radius)
        .saturating_add(1)
        .clamp(0, len_signed) as usize;
    start..end.max(start)
}
