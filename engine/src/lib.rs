//! Slime mold simulation engine
//!
//! An [`Engine`] owns the agents, the double-buffered trail map and the
//! compute backend of one simulation run. It enforces the order in which
//! operations may be called:
//!
//! - A freshly created engine is [`Lifecycle::Uninitialized`]. It must be
//!   initialized with a trail map shape and a random seed before use.
//! - An initialized engine is [`Lifecycle::Ready`]. It can then be advanced,
//!   reset, inspected and colorized any number of times.
//! - A disposed engine has released its storage and cannot be used anymore.

use compute::{Simulate, SimulateCreate, Tick};
use data::{
    agents::Agent,
    alloc::ResourceError,
    colony::Colony,
    gradient::{Color, ColorStop, Gradient},
    parameters::{ConfigError, Parameters},
    trail::FieldView,
    Precision,
};
use ndarray::Array2;
use rand::{rngs::StdRng, SeedableRng};
use std::fmt::{self, Display};
use thiserror::Error;

/// Stage of the life of an [`Engine`]
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Lifecycle {
    /// Storage has not been allocated yet
    Uninitialized,

    /// Between two operations
    Ready,

    /// Agents are sensing, steering, moving and depositing trail
    Stepping,

    /// The trail map is diffusing and evaporating
    Diffusing,

    /// The trail map is being turned into colors
    Presenting,

    /// Storage has been released
    Disposed,
}
//
impl Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Stepping => "stepping",
            Self::Diffusing => "diffusing",
            Self::Presenting => "presenting",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Slime mold simulation engine
#[derive(Debug)]
pub struct Engine<Backend: SimulateCreate + Simulate> {
    /// Simulation parameters
    params: Parameters,

    /// Compute backend
    backend: Backend,

    /// Simulation state, present once initialized
    world: Option<World>,

    /// Color gradient used by `colorize()`
    gradient: Option<Gradient>,

    /// Current stage of the engine's life
    state: Lifecycle,
}

/// State of an initialized engine
#[derive(Debug)]
struct World {
    /// Agents and trail map
    colony: Colony,

    /// Random number generator used when spawning agents
    rng: StdRng,
}
//
impl<Backend: SimulateCreate + Simulate> Engine<Backend> {
    /// Set up an engine, without allocating simulation storage yet
    pub fn new(params: Parameters, args: Backend::CliArgs) -> Result<Self, Error<Backend::Error>> {
        params.validate()?;
        let backend = Backend::new(params, args).map_err(Error::Backend)?;
        Ok(Self {
            params,
            backend,
            world: None,
            gradient: None,
            state: Lifecycle::Uninitialized,
        })
    }

    /// Allocate the trail map and spawn agents
    ///
    /// `shape` is `[rows, cols]`, i.e. `[height, width]`. The same seed always
    /// leads to the same simulation. On failure, the engine stays
    /// uninitialized and initialization can be attempted again.
    pub fn initialize(
        &mut self,
        shape: [usize; 2],
        seed: u64,
    ) -> Result<(), Error<Backend::Error>> {
        self.check_state("initialize", Lifecycle::Uninitialized)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let colony = Colony::new(&self.params, shape, &mut rng)?;
        log::info!(
            "Initialized a {}x{} trail map with {} agents",
            shape[1],
            shape[0],
            colony.agents.len()
        );
        self.world = Some(World { colony, rng });
        self.state = Lifecycle::Ready;
        Ok(())
    }

    /// Advance the simulation by one time step
    ///
    /// `delta_time` is the simulated time elapsed during this step and `time`
    /// the simulated time at its start. `delta_time` must be positive or zero.
    pub fn advance(
        &mut self,
        delta_time: Precision,
        time: Precision,
    ) -> Result<(), Error<Backend::Error>> {
        let tick = Tick::new(delta_time, time);
        let Self {
            backend,
            world,
            state,
            ..
        } = self;
        let colony = &mut ready_world::<Backend::Error>(world, *state, "advance")?.colony;

        log::trace!("Stepping agents at t={time}");
        *state = Lifecycle::Stepping;
        let mut result = backend.step_agents(colony, tick);
        if result.is_ok() {
            log::trace!("Diffusing trail map at t={time}");
            *state = Lifecycle::Diffusing;
            result = backend.process_trail(&mut colony.trail, tick);
        }
        if result.is_ok() {
            colony.trail.flip();
        }
        *state = Lifecycle::Ready;
        result.map_err(Error::Backend)
    }

    /// Read access to the current trail map
    pub fn current_field(&self) -> Result<FieldView<'_>, Error<Backend::Error>> {
        Ok(self.colony("read the trail map of")?.trail.current())
    }

    /// Read access to the agents
    pub fn agents(&self) -> Result<&[Agent], Error<Backend::Error>> {
        Ok(self.colony("read the agents of")?.agents.as_slice())
    }

    /// Spawn agents again and clear the trail map
    ///
    /// The random number generator is not reseeded, so successive resets
    /// produce different agent layouts.
    pub fn reset(&mut self) -> Result<(), Error<Backend::Error>> {
        let World { colony, rng } =
            ready_world::<Backend::Error>(&mut self.world, self.state, "reset")?;
        colony.reset(&self.params, rng);
        log::debug!("Reset {} agents and cleared the trail map", colony.agents.len());
        Ok(())
    }

    /// Configure the color gradient used by `colorize()`
    ///
    /// Stops must be sorted by position within [0, 1]. An invalid gradient
    /// is rejected and the previous gradient, if any, is kept.
    pub fn set_gradient(
        &mut self,
        stops: impl IntoIterator<Item = ColorStop>,
    ) -> Result<(), Error<Backend::Error>> {
        if self.state == Lifecycle::Disposed {
            return Err(self.invalid_state("set the gradient of"));
        }
        let gradient = Gradient::new(stops)?;
        log::debug!("Using a color gradient with {} stops", gradient.stops().len());
        self.gradient = Some(gradient);
        Ok(())
    }

    /// Currently configured color gradient
    pub fn gradient(&self) -> Option<&Gradient> {
        self.gradient.as_ref()
    }

    /// Turn the current trail map into colors
    ///
    /// Trail intensities are multiplied by `amplitude_scale` and the result,
    /// clamped to [0, 1], is looked up in the configured gradient.
    pub fn colorize(
        &mut self,
        amplitude_scale: Precision,
    ) -> Result<Array2<Color>, Error<Backend::Error>> {
        let world = ready_world::<Backend::Error>(&mut self.world, self.state, "colorize")?;
        let colony = &world.colony;
        let gradient = self.gradient.as_ref().ok_or(ConfigError::MissingGradient)?;
        self.state = Lifecycle::Presenting;
        let colors = gradient.colorize(colony.trail.current(), amplitude_scale);
        self.state = Lifecycle::Ready;
        Ok(colors)
    }

    /// Release the simulation storage
    ///
    /// The engine cannot be used anymore afterwards.
    pub fn dispose(&mut self) -> Result<(), Error<Backend::Error>> {
        if !matches!(self.state, Lifecycle::Uninitialized | Lifecycle::Ready) {
            return Err(self.invalid_state("dispose"));
        }
        self.world = None;
        self.gradient = None;
        self.state = Lifecycle::Disposed;
        log::debug!("Disposed of the simulation engine");
        Ok(())
    }

    /// Current stage of the engine's life
    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Simulation parameters
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Shape of the trail map as `[rows, cols]`, once initialized
    pub fn shape(&self) -> Option<[usize; 2]> {
        self.world.as_ref().map(|world| world.colony.shape())
    }

    /// Access the colony of a ready engine
    fn colony(&self, operation: &'static str) -> Result<&Colony, Error<Backend::Error>> {
        match (&self.world, self.state) {
            (Some(world), Lifecycle::Ready) => Ok(&world.colony),
            _ => Err(self.invalid_state(operation)),
        }
    }

    /// Make sure that the engine is in a certain state
    fn check_state(
        &self,
        operation: &'static str,
        expected: Lifecycle,
    ) -> Result<(), Error<Backend::Error>> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    /// Report that an operation is not allowed in the current state
    fn invalid_state(&self, operation: &'static str) -> Error<Backend::Error> {
        Error::InvalidState {
            operation,
            state: self.state,
        }
    }
}

/// Access the world of a ready engine
fn ready_world<'world, BackendError: std::error::Error>(
    world: &'world mut Option<World>,
    state: Lifecycle,
    operation: &'static str,
) -> Result<&'world mut World, Error<BackendError>> {
    match (world, state) {
        (Some(world), Lifecycle::Ready) => Ok(world),
        _ => Err(Error::InvalidState { operation, state }),
    }
}

/// Things that can go wrong when using the simulation engine
#[derive(Debug, Error)]
pub enum Error<BackendError: std::error::Error> {
    /// Invalid simulation configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to allocate simulation storage
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Error from the compute backend
    #[error(transparent)]
    Backend(BackendError),

    /// Operation is not allowed in the current state of the engine
    #[error("cannot {operation} an engine that is {state}")]
    InvalidState {
        operation: &'static str,
        state: Lifecycle,
    },
}
//
impl<BackendError: std::error::Error> From<data::Error> for Error<BackendError> {
    fn from(error: data::Error) -> Self {
        match error {
            data::Error::Config(e) => Self::Config(e),
            data::Error::Resource(e) => Self::Resource(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Args, Command, FromArgMatches};
    use compute::{NoArgs, SimulateBase};
    use data::{
        agents,
        parameters::{Spawn, SpawnAngle, SpawnPattern},
    };
    use std::sync::Once;

    type NaiveEngine = Engine<compute_naive::Simulation>;
    type ParallelEngine = Engine<compute_parallel::Simulation>;

    fn init_logger() {
        static INIT_LOGGER: Once = Once::new();
        INIT_LOGGER.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });
    }

    /// Backend arguments from defaults & environment
    fn default_args<Simulation: SimulateBase>() -> Simulation::CliArgs {
        Simulation::CliArgs::from_arg_matches(
            &Simulation::CliArgs::augment_args(Command::default().no_binary_name(true))
                .get_matches_from(None::<&str>),
        )
        .expect("Failed to parse arguments from defaults & environment")
    }

    fn small_params() -> Parameters {
        Parameters {
            num_agents: 1000,
            spawn: Spawn {
                pattern: SpawnPattern::Random,
                angle: SpawnAngle::TowardsCenter,
            },
            ..Default::default()
        }
    }

    fn ready_engine(params: Parameters, shape: [usize; 2], seed: u64) -> NaiveEngine {
        init_logger();
        let mut engine = NaiveEngine::new(params, NoArgs).unwrap();
        engine.initialize(shape, seed).unwrap();
        engine
    }

    fn assert_in_bounds(agents: &[Agent], [rows, cols]: [usize; 2]) {
        for agent in agents {
            let [x, y] = agent.position;
            assert!((0.0..cols as Precision).contains(&x), "{agent:?} out of bounds");
            assert!((0.0..rows as Precision).contains(&y), "{agent:?} out of bounds");
        }
    }

    #[test]
    fn lifecycle() {
        init_logger();
        let mut engine = NaiveEngine::new(small_params(), NoArgs).unwrap();
        assert_eq!(engine.state(), Lifecycle::Uninitialized);
        assert_eq!(engine.parameters(), &small_params());
        assert_eq!(engine.shape(), None);
        assert!(matches!(
            engine.advance(0.02, 0.0),
            Err(Error::InvalidState {
                operation: "advance",
                state: Lifecycle::Uninitialized
            })
        ));
        assert!(matches!(engine.current_field(), Err(Error::InvalidState { .. })));
        assert!(matches!(engine.agents(), Err(Error::InvalidState { .. })));
        assert!(matches!(engine.reset(), Err(Error::InvalidState { .. })));
        assert!(matches!(engine.colorize(1.0), Err(Error::InvalidState { .. })));

        engine.initialize([20, 30], 42).unwrap();
        assert_eq!(engine.state(), Lifecycle::Ready);
        assert_eq!(engine.shape(), Some([20, 30]));
        assert!(matches!(
            engine.initialize([20, 30], 42),
            Err(Error::InvalidState {
                operation: "initialize",
                state: Lifecycle::Ready
            })
        ));
        engine.advance(0.02, 0.0).unwrap();
        assert_eq!(engine.state(), Lifecycle::Ready);
        engine.reset().unwrap();
        assert_eq!(engine.state(), Lifecycle::Ready);

        engine.dispose().unwrap();
        assert_eq!(engine.state(), Lifecycle::Disposed);
        assert_eq!(engine.shape(), None);
        assert!(matches!(engine.advance(0.02, 0.02), Err(Error::InvalidState { .. })));
        assert!(matches!(engine.current_field(), Err(Error::InvalidState { .. })));
        assert!(matches!(engine.reset(), Err(Error::InvalidState { .. })));
        assert!(matches!(
            engine.set_gradient([]),
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(
            engine.initialize([20, 30], 42),
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(engine.dispose(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn dispose_uninitialized() {
        init_logger();
        let mut engine = NaiveEngine::new(small_params(), NoArgs).unwrap();
        engine.dispose().unwrap();
        assert_eq!(engine.state(), Lifecycle::Disposed);
    }

    #[test]
    fn invalid_configuration() {
        init_logger();
        let params = Parameters {
            num_agents: 0,
            ..small_params()
        };
        assert!(matches!(
            NaiveEngine::new(params, NoArgs),
            Err(Error::Config(ConfigError::NoAgents))
        ));

        let params = Parameters {
            diffuse_rate: Precision::NAN,
            ..small_params()
        };
        assert!(matches!(
            NaiveEngine::new(params, NoArgs),
            Err(Error::Config(ConfigError::InvalidParameter {
                name: "diffuse_rate",
                ..
            }))
        ));
    }

    #[test]
    fn failed_initialization() {
        init_logger();
        let mut engine = NaiveEngine::new(small_params(), NoArgs).unwrap();
        assert!(matches!(
            engine.initialize([0, 10], 1),
            Err(Error::Config(ConfigError::EmptyField { shape: [0, 10] }))
        ));
        assert_eq!(engine.state(), Lifecycle::Uninitialized);
        assert!(matches!(
            engine.initialize([usize::MAX, 2], 1),
            Err(Error::Resource(ResourceError::TooLarge { .. }))
        ));
        assert_eq!(engine.state(), Lifecycle::Uninitialized);

        // Initialization can be retried after a failure
        engine.initialize([10, 10], 1).unwrap();
        assert_eq!(engine.state(), Lifecycle::Ready);
    }

    #[test]
    fn initial_population() {
        let shape = [40, 70];
        let engine = ready_engine(small_params(), shape, 3);
        let agents = engine.agents().unwrap();
        assert_eq!(agents.len(), 1000);
        assert_in_bounds(agents, shape);

        let [cx, cy] = agents::center(shape);
        for agent in agents {
            let [x, y] = agent.position;
            if [x, y] != [cx, cy] {
                let expected = (cy - y).atan2(cx - x);
                assert!((agent.heading - expected).abs() < 1e-5);
            }
        }

        let params = Parameters {
            spawn: Spawn {
                pattern: SpawnPattern::Center,
                angle: SpawnAngle::TowardsCenter,
            },
            ..small_params()
        };
        let engine = ready_engine(params, shape, 3);
        assert!(engine
            .agents()
            .unwrap()
            .iter()
            .all(|agent| agent.position == [35.0, 20.0] && agent.heading == 0.0));
    }

    #[test]
    fn advance() {
        let shape = [30, 50];
        let mut engine = ready_engine(small_params(), shape, 5);
        let mut time = 0.0;
        for _ in 0..20 {
            engine.advance(0.02, time).unwrap();
            time += 0.02;
            assert_eq!(engine.agents().unwrap().len(), 1000);
            assert_in_bounds(engine.agents().unwrap(), shape);
            assert!(engine
                .current_field()
                .unwrap()
                .iter()
                .all(|&x| x.is_finite() && x >= 0.0));
        }
        assert!(engine.current_field().unwrap().sum() > 0.0);

        // Empty time steps change nothing
        let agents = engine.agents().unwrap().to_vec();
        let field = engine.current_field().unwrap().to_owned();
        engine.advance(0.0, time).unwrap();
        assert_eq!(engine.agents().unwrap(), agents);
        assert_eq!(engine.current_field().unwrap(), field);
    }

    #[test]
    fn reset() {
        let shape = [30, 50];
        let mut engine = ready_engine(small_params(), shape, 5);
        for step in 0..10 {
            engine.advance(0.1, step as Precision * 0.1).unwrap();
        }
        let agents_before = engine.agents().unwrap().to_vec();

        engine.reset().unwrap();
        assert_eq!(engine.agents().unwrap().len(), 1000);
        assert_ne!(engine.agents().unwrap(), agents_before);
        assert_in_bounds(engine.agents().unwrap(), shape);
        assert!(engine.current_field().unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn reproducible() {
        let shape = [25, 35];
        let run = |seed| {
            let mut engine = ready_engine(small_params(), shape, seed);
            for step in 0..10 {
                engine.advance(0.05, step as Precision * 0.05).unwrap();
            }
            (
                engine.agents().unwrap().to_vec(),
                engine.current_field().unwrap().to_owned(),
            )
        };
        assert_eq!(run(12), run(12));
        assert_ne!(run(12).0, run(13).0);
    }

    #[test]
    fn backends_agree() {
        init_logger();
        let shape = [33, 47];
        let params = small_params();
        let mut naive = NaiveEngine::new(params, NoArgs).unwrap();
        let mut parallel =
            ParallelEngine::new(params, default_args::<compute_parallel::Simulation>()).unwrap();
        naive.initialize(shape, 77).unwrap();
        parallel.initialize(shape, 77).unwrap();
        for step in 0..10 {
            let time = step as Precision * 0.02;
            naive.advance(0.02, time).unwrap();
            parallel.advance(0.02, time).unwrap();
        }
        assert_eq!(naive.agents().unwrap(), parallel.agents().unwrap());
        assert_eq!(
            naive.current_field().unwrap(),
            parallel.current_field().unwrap()
        );
    }

    #[test]
    fn colorize() {
        let mut engine = ready_engine(small_params(), [8, 12], 9);
        assert!(matches!(
            engine.colorize(1.0),
            Err(Error::Config(ConfigError::MissingGradient))
        ));
        assert_eq!(engine.state(), Lifecycle::Ready);

        let black = Color { r: 0, g: 0, b: 0 };
        let white = Color {
            r: 255,
            g: 255,
            b: 255,
        };
        assert!(matches!(
            engine.set_gradient([
                ColorStop {
                    position: 1.0,
                    color: white
                },
                ColorStop {
                    position: 0.0,
                    color: black
                },
            ]),
            Err(Error::Config(ConfigError::UnorderedStops { .. }))
        ));
        assert!(engine.gradient().is_none());

        engine
            .set_gradient([
                ColorStop {
                    position: 0.0,
                    color: black,
                },
                ColorStop {
                    position: 1.0,
                    color: white,
                },
            ])
            .unwrap();
        let colors = engine.colorize(1.0).unwrap();
        assert_eq!(colors.shape(), &[8, 12]);
        assert!(colors.iter().all(|&color| color == black));
        assert_eq!(engine.state(), Lifecycle::Ready);

        // Deposits make some cells brighter
        engine.advance(1.0, 0.0).unwrap();
        let colors = engine.colorize(1.0).unwrap();
        assert!(colors.iter().any(|&color| color != black));
    }
}
