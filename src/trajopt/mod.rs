//! Direct-transcription trajectory optimization of the acrobot.
//!
//! The horizon is discretized into N samples. States and inputs at every
//! sample are decision variables; consecutive samples are tied together by
//! the discrete plant dynamics. The resulting nonlinear program is solved by
//! sequential quadratic programming, each QP handed to Clarabel.

use std::{fmt, time::Duration};

use na::DMatrix;
use serde::Deserialize;

use crate::{
    acrobot::AcrobotPlant,
    error::{DynamicsError, OptimizationError},
    types::{AcrobotInput, AcrobotState, Float},
};

pub mod cost;
pub mod transcription;

pub use cost::{CostWeights, FinalCost, RunningCost};
pub use transcription::DirectTranscription;

pub const SOLVER_ID: &str = "SQP/Clarabel";

/// Settings of the SQP loop
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Largest acceptable |x_{k+1} - f(x_k, u_k)| entry
    pub constraint_tolerance: Float,
    /// Largest acceptable entry of the SQP step at convergence. Finer values
    /// sit below the round-off of the merit on the swing-up horizon.
    pub step_tolerance: Float,
    /// Weight of the proximal term ρ/2 |z - z_k|² added to every QP
    pub proximal_weight: Float,
    pub qp_max_iterations: u32,
    pub verbose: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            max_iterations: 300,
            constraint_tolerance: 1e-6,
            step_tolerance: 1e-4,
            proximal_weight: 1e-4,
            qp_max_iterations: 200,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Converged,
    MaxIterationsReached,
    QpFailed(String),
    LineSearchFailed,
    DynamicsFailed(DynamicsError),
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Converged => write!(f, "converged"),
            SolveStatus::MaxIterationsReached => write!(f, "iteration limit reached"),
            SolveStatus::QpFailed(status) => write!(f, "QP subproblem failed with status {}", status),
            SolveStatus::LineSearchFailed => write!(f, "line search failed to decrease the merit"),
            SolveStatus::DynamicsFailed(e) => write!(f, "dynamics evaluation failed: {}", e),
        }
    }
}

/// Solved samples of the horizon
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<Float>,
    states: Vec<AcrobotState>,
    inputs: Vec<AcrobotInput>,
}

impl Trajectory {
    pub fn new(times: Vec<Float>, states: Vec<AcrobotState>, inputs: Vec<AcrobotInput>) -> Self {
        assert_eq!(times.len(), states.len());
        assert_eq!(times.len(), inputs.len());
        Trajectory {
            times,
            states,
            inputs,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn sample_times(&self) -> &[Float] {
        &self.times
    }

    pub fn states(&self) -> &[AcrobotState] {
        &self.states
    }

    pub fn inputs(&self) -> &[AcrobotInput] {
        &self.inputs
    }

    /// States as columns of a 4 x N matrix
    pub fn state_samples(&self) -> DMatrix<Float> {
        DMatrix::from_fn(AcrobotPlant::NUM_STATES, self.len(), |i, j| {
            self.states[j][i]
        })
    }

    /// Inputs as columns of a 1 x N matrix
    pub fn input_samples(&self) -> DMatrix<Float> {
        DMatrix::from_fn(AcrobotPlant::NUM_INPUTS, self.len(), |i, j| {
            self.inputs[j][i]
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Float, &AcrobotState)> {
        self.times.iter().cloned().zip(self.states.iter())
    }
}

/// Outcome of a solve. The trajectory is only handed out when the solver
/// converged.
#[derive(Debug, Clone)]
pub struct TrajOptResult {
    pub(crate) status: SolveStatus,
    pub(crate) iterations: usize,
    pub(crate) cost: Float,
    pub(crate) max_defect: Float,
    pub(crate) solve_time: Duration,
    pub(crate) trajectory: Trajectory,
}

impl TrajOptResult {
    pub fn is_success(&self) -> bool {
        self.status == SolveStatus::Converged
    }

    pub fn solver_id(&self) -> &'static str {
        SOLVER_ID
    }

    pub fn status(&self) -> &SolveStatus {
        &self.status
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Objective value at the last iterate
    pub fn cost(&self) -> Float {
        self.cost
    }

    /// Largest dynamics or initial-state violation at the last iterate
    pub fn max_defect(&self) -> Float {
        self.max_defect
    }

    pub fn solve_time(&self) -> Duration {
        self.solve_time
    }

    fn not_converged(&self) -> OptimizationError {
        OptimizationError::NotConverged {
            solver: SOLVER_ID.to_string(),
            status: self.status.clone(),
        }
    }

    pub fn trajectory(&self) -> Result<&Trajectory, OptimizationError> {
        if self.is_success() {
            Ok(&self.trajectory)
        } else {
            Err(self.not_converged())
        }
    }

    pub fn into_trajectory(self) -> Result<Trajectory, OptimizationError> {
        if self.is_success() {
            Ok(self.trajectory)
        } else {
            Err(self.not_converged())
        }
    }

    /// Last iterate regardless of convergence, for diagnostics only.
    pub fn last_iterate(&self) -> &Trajectory {
        &self.trajectory
    }
}
