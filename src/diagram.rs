use log::{debug, info};
use na::{DMatrix, Vector2};

use crate::{
    acrobot::AcrobotPlant,
    config::DemoConfig,
    control::{ConstantController, ControlMethod, Controller},
    error::{DynamicsError, PlaybackError, SetupError, VisualizerError},
    integrators::Integrator,
    model::AcrobotDescription,
    types::{AcrobotState, Float},
    visualizer::{Frame, Visualizer},
};

/// Time and state of the diagram
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub time: Float,
    pub state: AcrobotState,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            time: 0.0,
            state: AcrobotState::zeros(),
        }
    }
}

/// In-memory log of the plant state over simulated time
#[derive(Debug, Default, Clone)]
pub struct StateLogger {
    times: Vec<Float>,
    states: Vec<AcrobotState>,
}

impl StateLogger {
    pub fn record(&mut self, time: Float, state: &AcrobotState) {
        self.times.push(time);
        self.states.push(*state);
    }

    pub fn sample_times(&self) -> &[Float] {
        &self.times
    }

    pub fn states(&self) -> &[AcrobotState] {
        &self.states
    }

    /// Logged states as columns of a 4 x len matrix
    pub fn state_matrix(&self) -> DMatrix<Float> {
        DMatrix::from_fn(AcrobotPlant::NUM_STATES, self.states.len(), |i, j| {
            self.states[j][i]
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.states.clear();
    }
}

pub struct SimulationDiagram {
    plant: AcrobotPlant,
    controller: Box<dyn Controller + Send>,
    logger: StateLogger,
    visualizer: Box<dyn Visualizer + Send>,
    context: Context,
    timestep: Float,
    integrator: Integrator,
}

impl SimulationDiagram {
    /// Wire the plant, controller, logger and visualizer together.
    pub fn new(
        plant: AcrobotPlant,
        method: ControlMethod,
        visualizer: Box<dyn Visualizer + Send>,
        timestep: Float,
        integrator: Integrator,
    ) -> Result<Self, SetupError> {
        let controller: Box<dyn Controller + Send> = match method {
            ControlMethod::Constant => Box::new(ConstantController::zero()),
            ControlMethod::DirectTranscription | ControlMethod::Ddp => {
                return Err(SetupError::ControlMethodNotImplemented(method.tag()))
            }
        };

        Ok(SimulationDiagram {
            plant,
            controller,
            logger: StateLogger::default(),
            visualizer,
            context: Context::default(),
            timestep,
            integrator,
        })
    }

    /// Build the diagram described by a demo configuration. The control
    /// method is checked before the robot description is touched.
    pub fn from_config(
        config: &DemoConfig,
        visualizer: Box<dyn Visualizer + Send>,
    ) -> Result<Self, SetupError> {
        let method: ControlMethod = config.control_method.parse()?;
        config.validate()?;

        let plant = AcrobotDescription::load(&config.model)?.build_plant()?;
        let mut diagram = Self::new(
            plant,
            method,
            visualizer,
            config.timestep,
            config.integrator,
        )?;

        let initial_state = config.initial_state();
        if !initial_state.iter().all(|x| x.is_finite()) {
            return Err(SetupError::NonFiniteInitialState);
        }
        diagram.set_state(&initial_state);
        info!("Simulation diagram built with control method {}", method);
        Ok(diagram)
    }

    pub fn plant(&self) -> &AcrobotPlant {
        &self.plant
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn set_time(&mut self, time: Float) {
        self.context.time = time;
    }

    pub fn set_state(&mut self, state: &AcrobotState) {
        self.context.state = *state;
    }

    pub fn logger(&self) -> &StateLogger {
        &self.logger
    }

    /// Publish the current context to the visualizer.
    pub fn publish(&mut self) -> Result<(), VisualizerError> {
        let q = Vector2::new(self.context.state[0], self.context.state[1]);
        let (elbow, tip) = self.plant.link_positions(&q);
        let frame = Frame {
            time: self.context.time,
            state: self.context.state,
            elbow,
            tip,
        };
        self.visualizer.publish(&frame)
    }

    /// One fixed step: controller, plant update, logging.
    pub fn step(&mut self) -> Result<(), DynamicsError> {
        let u = self
            .controller
            .control(self.context.time, &self.context.state);
        self.context.state =
            self.plant
                .discrete_step(&self.context.state, &u, self.timestep, &self.integrator)?;
        self.context.time += self.timestep;
        self.logger.record(self.context.time, &self.context.state);
        Ok(())
    }

    /// Simulate from the current context until `final_time`, publishing
    /// after every step. Does not pace against the wall clock.
    pub fn advance_to(&mut self, final_time: Float) -> Result<(), PlaybackError> {
        if self.logger.is_empty() {
            self.logger.record(self.context.time, &self.context.state);
        }
        let num_steps = ((final_time - self.context.time) / self.timestep).round();
        let num_steps = if num_steps > 0. { num_steps as usize } else { 0 };
        for _ in 0..num_steps {
            self.step()?;
            self.publish()?;
        }
        debug!(
            "Advanced to t = {:.3} s, {} logged samples",
            self.context.time,
            self.logger.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod diagram_tests {
    use crate::{
        assert_close, assert_vec_close,
        config::DemoConfig,
        error::{ConfigError, SetupError},
        visualizer::{ChannelVisualizer, LogVisualizer},
    };

    use super::*;

    #[test]
    fn unrecognized_method_fails_before_model_load() {
        // Arrange
        let config = DemoConfig {
            control_method: "LQR".to_string(),
            model: "acrobot/missing_description.toml".to_string(),
            ..Default::default()
        };

        // Act
        let result = SimulationDiagram::from_config(&config, Box::new(LogVisualizer::default()));

        // Assert
        // The model path does not exist either, so reaching the loader would
        // have produced a model error instead.
        match result {
            Err(SetupError::Config(ConfigError::UnrecognizedControlMethod(tag))) => {
                assert_eq!(tag, "LQR")
            }
            Err(other) => panic!("expected unrecognized control method, got {}", other),
            Ok(_) => panic!("expected unrecognized control method"),
        }
    }

    #[test]
    fn reserved_methods_have_no_controller() {
        let config = DemoConfig {
            control_method: "DDP".to_string(),
            ..Default::default()
        };

        let result = SimulationDiagram::from_config(&config, Box::new(LogVisualizer::default()));

        assert!(matches!(
            result,
            Err(SetupError::ControlMethodNotImplemented("DDP"))
        ));
    }

    #[test]
    fn missing_model_is_a_setup_error() {
        let config = DemoConfig {
            model: "acrobot/missing_description.toml".to_string(),
            ..Default::default()
        };

        let result = SimulationDiagram::from_config(&config, Box::new(LogVisualizer::default()));

        assert!(matches!(result, Err(SetupError::Model(_))));
    }

    #[test]
    fn publish_sends_context_with_kinematics() {
        // Arrange
        let (visualizer, receiver) = ChannelVisualizer::unbounded();
        let mut diagram =
            SimulationDiagram::from_config(&DemoConfig::default(), Box::new(visualizer)).unwrap();
        let state = AcrobotState::new(crate::PI, 0., 0., 0.);

        // Act
        diagram.set_time(0.25);
        diagram.set_state(&state);
        diagram.publish().unwrap();

        // Assert
        let frame = receiver.try_recv().unwrap();
        assert_close!(frame.time, 0.25, 1e-12);
        assert_vec_close!(frame.state, state, 1e-12);
        assert_close!(frame.tip.y, 3.0, 1e-9);
    }

    #[test]
    fn zero_torque_from_rest_stays_at_rest() {
        // Arrange
        let (visualizer, receiver) = ChannelVisualizer::unbounded();
        let mut diagram =
            SimulationDiagram::from_config(&DemoConfig::default(), Box::new(visualizer)).unwrap();

        // Act
        diagram.advance_to(1.0).unwrap();

        // Assert
        assert_eq!(diagram.logger().len(), 101);
        assert_close!(diagram.context().time, 1.0, 1e-9);
        assert_vec_close!(diagram.context().state, AcrobotState::zeros(), 1e-12);
        assert_eq!(receiver.try_iter().count(), 100);
    }

    #[test]
    fn zero_torque_swing_loses_energy_to_damping() {
        // Arrange
        let (visualizer, _receiver) = ChannelVisualizer::unbounded();
        let config = DemoConfig {
            initial_state: [1.0, 0.0, 0.0, 0.0],
            integrator: Integrator::RungeKutta4,
            ..Default::default()
        };
        let mut diagram = SimulationDiagram::from_config(&config, Box::new(visualizer)).unwrap();
        let initial_energy = diagram.plant().energy(&diagram.context().state);

        // Act
        diagram.advance_to(3.0).unwrap();

        // Assert
        let final_energy = diagram.plant().energy(&diagram.context().state);
        assert!(final_energy < initial_energy);
        let logged = diagram.logger().state_matrix();
        assert_eq!(logged.nrows(), 4);
        assert_eq!(logged.ncols(), diagram.logger().len());
    }
}
