use std::path::PathBuf;

use thiserror::Error;

use crate::{trajopt::SolveStatus, types::Float};

/// Errors in the demo configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unrecognized control method {0}")]
    UnrecognizedControlMethod(String),

    #[error("Expected a positive timestep, found {0}")]
    InvalidTimestep(Float),

    #[error("Total time {total_time} is shorter than one timestep {timestep}")]
    InvalidHorizon { total_time: Float, timestep: Float },

    #[error("Cannot load the configuration file {path:?}: {source}")]
    FileLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot read the configuration file: {0}")]
    Deserialise(#[from] toml::de::Error),
}

/// Errors while locating, reading or validating a robot description.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Robot description resource {0:?} not found")]
    ResourceNotFound(PathBuf),

    #[error("Cannot read the robot description {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed robot description: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid model parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: Float,
        reason: &'static str,
    },
}

/// Errors while assembling the simulation diagram.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Control method {0} has no controller implementation")]
    ControlMethodNotImplemented(&'static str),

    #[error("Initial state has a non-finite entry")]
    NonFiniteInitialState,
}

/// Errors while evaluating the plant dynamics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DynamicsError {
    #[error("Failed to solve M(q) vdot = τ - c(q, v), mass matrix is singular at q = [{0}, {1}]")]
    SingularMassMatrix(Float, Float),

    #[error("Dynamics produced a non-finite state derivative")]
    NonFinite,
}

/// Errors from the trajectory optimizer.
#[derive(Debug, Error)]
pub enum OptimizationError {
    #[error("Trajectory optimizer {solver} failed: {status}")]
    NotConverged { solver: String, status: SolveStatus },

    #[error("Invalid trajectory optimization problem: {0}")]
    InvalidProblem(String),
}

/// Errors raised by a visualizer while publishing.
#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("Frame channel receiver was dropped")]
    ChannelClosed,

    #[error("Failed to draw frame: {0}")]
    Drawing(String),
}

/// Errors from the simulation or playback of a trajectory.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Visualizer(#[from] VisualizerError),

    #[error(transparent)]
    Dynamics(#[from] DynamicsError),

    #[error("Cannot play back an empty trajectory")]
    EmptyTrajectory,

    #[error("Playback task failed to join: {0}")]
    Join(#[from] tokio::task::JoinError),
}
