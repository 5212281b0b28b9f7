use std::time::Instant;

use clarabel::algebra::CscMatrix as ClarabelCscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT::ZeroConeT,
};
use itertools::izip;
use log::{debug, info, warn};
use na::{DVector, Matrix4, Matrix4x1};
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::{
    acrobot::AcrobotPlant,
    error::{DynamicsError, OptimizationError},
    integrators::Integrator,
    trajopt::{
        cost::{FinalCost, RunningCost},
        SolveStatus, SolverSettings, TrajOptResult, Trajectory,
    },
    types::{AcrobotInput, AcrobotState, Float},
};

const NX: usize = AcrobotPlant::NUM_STATES;
const NU: usize = AcrobotPlant::NUM_INPUTS;

/// Direct transcription of the acrobot over a fixed number of samples.
///
/// Decision variables are stacked as
///     z = [x_0, .., x_{N-1}, u_0, .., u_{N-1}]
/// and the dynamics constraints x_{k+1} = f(x_k, u_k), k = 0..N-2, are part of
/// the transcription. Callers add the initial-state constraint and costs.
///
/// Running costs are applied at samples 0..N-2 and scaled by the timestep,
/// final costs at sample N-1.
pub struct DirectTranscription {
    plant: AcrobotPlant,
    num_samples: usize,
    timestep: Float,
    integrator: Integrator,
    initial_state: Option<AcrobotState>,
    running_costs: Vec<RunningCost>,
    final_costs: Vec<FinalCost>,
}

/// Diagonal Hessian and linear term of the objective ½ zᵀ P z + qᵀ z + r
struct QuadraticObjective {
    P: DVector<Float>,
    q: DVector<Float>,
    r: Float,
}

impl QuadraticObjective {
    fn evaluate(&self, z: &DVector<Float>) -> Float {
        0.5 * z.dot(&self.P.component_mul(z)) + self.q.dot(z) + self.r
    }

    fn gradient(&self, z: &DVector<Float>) -> DVector<Float> {
        self.P.component_mul(z) + &self.q
    }
}

/// Linearized dynamics at the current iterate
struct Linearization {
    A: Vec<Matrix4<Float>>,
    B: Vec<Matrix4x1<Float>>,
    f: Vec<AcrobotState>,
}

impl DirectTranscription {
    pub fn new(
        plant: AcrobotPlant,
        num_samples: usize,
        timestep: Float,
    ) -> Result<Self, OptimizationError> {
        if num_samples == 0 {
            return Err(OptimizationError::InvalidProblem(
                "at least one time sample is required".to_string(),
            ));
        }
        if !(timestep > 0.) {
            return Err(OptimizationError::InvalidProblem(format!(
                "timestep must be positive, found {}",
                timestep
            )));
        }
        Ok(DirectTranscription {
            plant,
            num_samples,
            timestep,
            integrator: Integrator::default(),
            initial_state: None,
            running_costs: vec![],
            final_costs: vec![],
        })
    }

    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn timestep(&self) -> Float {
        self.timestep
    }

    pub fn plant(&self) -> &AcrobotPlant {
        &self.plant
    }

    /// Constrain x_0 to equal `x0`. Replaces any earlier initial-state
    /// constraint.
    pub fn add_initial_state_constraint(&mut self, x0: AcrobotState) {
        self.initial_state = Some(x0);
    }

    pub fn add_running_cost(&mut self, cost: RunningCost) {
        self.running_costs.push(cost);
    }

    pub fn add_final_cost(&mut self, cost: FinalCost) {
        self.final_costs.push(cost);
    }

    pub fn sample_times(&self) -> Vec<Float> {
        (0..self.num_samples)
            .map(|k| k as Float * self.timestep)
            .collect()
    }

    fn num_variables(&self) -> usize {
        self.num_samples * (NX + NU)
    }

    fn state_index(&self, k: usize) -> usize {
        k * NX
    }

    fn input_index(&self, k: usize) -> usize {
        self.num_samples * NX + k * NU
    }

    fn state(&self, z: &DVector<Float>, k: usize) -> AcrobotState {
        z.fixed_rows::<NX>(self.state_index(k)).into_owned()
    }

    fn input(&self, z: &DVector<Float>, k: usize) -> AcrobotInput {
        z.fixed_rows::<NU>(self.input_index(k)).into_owned()
    }

    /// Total objective over all samples. Both slices hold `num_samples` entries.
    fn evaluate_cost(&self, states: &[AcrobotState], inputs: &[AcrobotInput]) -> Float {
        let N = self.num_samples;
        let running: Float = izip!(states.iter(), inputs.iter())
            .take(N - 1)
            .map(|(x, u)| {
                self.running_costs
                    .iter()
                    .map(|c| self.timestep * c.evaluate(x, u))
                    .sum::<Float>()
            })
            .sum();
        let terminal: Float = self
            .final_costs
            .iter()
            .map(|c| c.evaluate(&states[N - 1]))
            .sum();
        running + terminal
    }

    /// All costs are separable quadratics, so the objective has a diagonal
    /// Hessian.
    fn quadratic_objective(&self) -> QuadraticObjective {
        let N = self.num_samples;
        let h = self.timestep;
        let mut P = DVector::zeros(self.num_variables());
        let mut q = DVector::zeros(self.num_variables());
        let mut r = 0.;

        for k in 0..N - 1 {
            let ix = self.state_index(k);
            let iu = self.input_index(k);
            for cost in &self.running_costs {
                for i in 0..NX {
                    P[ix + i] += 2. * h * cost.state_weight;
                    q[ix + i] -= 2. * h * cost.state_weight * cost.target[i];
                }
                r += h * cost.state_weight * cost.target.dot(&cost.target);
                P[iu] += 2. * h * cost.input_weight;
            }
        }

        let ix = self.state_index(N - 1);
        for cost in &self.final_costs {
            for i in 0..NX {
                P[ix + i] += 2. * cost.state_weight;
                q[ix + i] -= 2. * cost.state_weight * cost.target[i];
            }
            r += cost.state_weight * cost.target.dot(&cost.target);
        }

        QuadraticObjective { P, q, r }
    }

    /// Zero-input rollout from the initial state
    fn initial_guess(&self) -> Result<DVector<Float>, DynamicsError> {
        let mut z = DVector::zeros(self.num_variables());
        let mut x = self.initial_state.unwrap_or_else(AcrobotState::zeros);
        let u = AcrobotInput::zeros();
        for k in 0..self.num_samples {
            z.fixed_rows_mut::<NX>(self.state_index(k)).copy_from(&x);
            if k + 1 < self.num_samples {
                x = self
                    .plant
                    .discrete_step(&x, &u, self.timestep, &self.integrator)?;
            }
        }
        Ok(z)
    }

    /// Constraint residuals: initial state first, then dynamics defects
    /// x_{k+1} - f(x_k, u_k).
    fn constraint_residuals(&self, z: &DVector<Float>) -> Result<DVector<Float>, DynamicsError> {
        let mut residuals = Vec::with_capacity(self.num_constraints());
        if let Some(x0) = &self.initial_state {
            residuals.extend((self.state(z, 0) - x0).iter());
        }
        for k in 0..self.num_samples - 1 {
            let x_next = self.plant.discrete_step(
                &self.state(z, k),
                &self.input(z, k),
                self.timestep,
                &self.integrator,
            )?;
            residuals.extend((self.state(z, k + 1) - x_next).iter());
        }
        Ok(DVector::from_vec(residuals))
    }

    fn num_constraints(&self) -> usize {
        let initial = if self.initial_state.is_some() { NX } else { 0 };
        initial + (self.num_samples - 1) * NX
    }

    fn linearize(&self, z: &DVector<Float>) -> Result<Linearization, DynamicsError> {
        let mut linearization = Linearization {
            A: Vec::with_capacity(self.num_samples - 1),
            B: Vec::with_capacity(self.num_samples - 1),
            f: Vec::with_capacity(self.num_samples - 1),
        };
        for k in 0..self.num_samples - 1 {
            let x = self.state(z, k);
            let u = self.input(z, k);
            let (A, B) = self
                .plant
                .step_jacobians(&x, &u, self.timestep, &self.integrator)?;
            linearization.A.push(A);
            linearization.B.push(B);
            linearization.f.push(
                self.plant
                    .discrete_step(&x, &u, self.timestep, &self.integrator)?,
            );
        }
        Ok(linearization)
    }

    /// Equality constraints A z = b of the QP subproblem, linearized about
    /// z_bar:
    ///     x_0 = x_init
    ///     x_{k+1} - A_k x_k - B_k u_k = f(x̄_k, ū_k) - A_k x̄_k - B_k ū_k
    fn linear_constraints(
        &self,
        z_bar: &DVector<Float>,
        linearization: &Linearization,
    ) -> (ClarabelCscMatrix<Float>, Vec<Float>) {
        let m = self.num_constraints();
        let n = self.num_variables();
        let mut A = CooMatrix::new(m, n);
        let mut b = Vec::with_capacity(m);
        let mut row = 0;

        if let Some(x0) = &self.initial_state {
            for i in 0..NX {
                A.push(row + i, self.state_index(0) + i, 1.0);
                b.push(x0[i]);
            }
            row += NX;
        }

        for (k, (Ak, Bk, fk)) in izip!(
            linearization.A.iter(),
            linearization.B.iter(),
            linearization.f.iter()
        )
        .enumerate()
        {
            let ix = self.state_index(k);
            let ix_next = self.state_index(k + 1);
            let iu = self.input_index(k);
            let rhs = fk - Ak * self.state(z_bar, k) - Bk * self.input(z_bar, k)[0];
            for i in 0..NX {
                A.push(row + i, ix_next + i, 1.0);
                for j in 0..NX {
                    A.push(row + i, ix + j, -Ak[(i, j)]);
                }
                A.push(row + i, iu, -Bk[i]);
                b.push(rhs[i]);
            }
            row += NX;
        }

        (to_clarabel(&CscMatrix::from(&A)), b)
    }

    /// Solve the transcription by SQP, starting from a zero-input rollout.
    pub fn solve(&self, settings: &SolverSettings) -> TrajOptResult {
        let start = Instant::now();
        let objective = self.quadratic_objective();

        let mut z = match self.initial_guess() {
            Ok(z) => z,
            Err(e) => {
                return self.result(
                    SolveStatus::DynamicsFailed(e),
                    &DVector::zeros(self.num_variables()),
                    0,
                    start,
                )
            }
        };
        let mut residuals = match self.constraint_residuals(&z) {
            Ok(c) => c,
            Err(e) => {
                return self.result(SolveStatus::DynamicsFailed(e), &z, 0, start)
            }
        };

        let mut penalty: Float = 1.0;
        let mut status = SolveStatus::MaxIterationsReached;
        let mut iterations = 0;

        while iterations < settings.max_iterations {
            iterations += 1;

            let linearization = match self.linearize(&z) {
                Ok(l) => l,
                Err(e) => {
                    status = SolveStatus::DynamicsFailed(e);
                    break;
                }
            };

            let (z_qp, multipliers) =
                match self.solve_subproblem(&z, &objective, &linearization, settings) {
                    Ok(solution) => solution,
                    Err(qp_status) => {
                        status = SolveStatus::QpFailed(qp_status);
                        break;
                    }
                };
            let d = z_qp - &z;

            let step_norm = d.amax();
            let max_defect = residuals.amax();
            debug!(
                "SQP iteration {}: cost = {:.6e}, max defect = {:.3e}, step = {:.3e}",
                iterations,
                objective.evaluate(&z),
                max_defect,
                step_norm
            );
            if step_norm <= settings.step_tolerance && max_defect <= settings.constraint_tolerance
            {
                status = SolveStatus::Converged;
                break;
            }

            // ℓ1 merit φ(z) = J(z) + μ |c(z)|₁ with μ above the multiplier magnitudes
            if let Some(lambda_max) = multipliers.iter().map(|l| l.abs()).reduce(Float::max) {
                penalty = penalty.max(1.1 * lambda_max);
            }
            let merit = objective.evaluate(&z) + penalty * residuals.lp_norm(1);
            let directional_derivative =
                (objective.gradient(&z).dot(&d) - penalty * residuals.lp_norm(1)).min(0.);

            match self.line_search(&z, &d, &objective, penalty, merit, directional_derivative) {
                Some((alpha, z_next, residuals_next)) => {
                    if alpha < 1. {
                        debug!("Line search shortened step to α = {:.3e}", alpha);
                    }
                    z = z_next;
                    residuals = residuals_next;
                }
                None if is_stationary(merit, directional_derivative, max_defect, settings) => {
                    debug!(
                        "Merit decrease {:.3e} is below round-off at a feasible iterate",
                        directional_derivative
                    );
                    status = SolveStatus::Converged;
                    break;
                }
                None => {
                    status = SolveStatus::LineSearchFailed;
                    break;
                }
            }
        }

        if status != SolveStatus::Converged {
            warn!(
                "Trajectory optimization stopped after {} iterations: {}",
                iterations, status
            );
        }

        self.result(status, &z, iterations, start)
    }

    /// Backtracking on the merit function. Returns the step length, the new
    /// iterate and its constraint residuals.
    fn line_search(
        &self,
        z: &DVector<Float>,
        d: &DVector<Float>,
        objective: &QuadraticObjective,
        penalty: Float,
        merit: Float,
        directional_derivative: Float,
    ) -> Option<(Float, DVector<Float>, DVector<Float>)> {
        const ARMIJO: Float = 1e-4;
        const MIN_STEP: Float = 1e-8;

        let mut alpha = 1.0;
        while alpha >= MIN_STEP {
            let z_try = z + d * alpha;
            if let Ok(residuals_try) = self.constraint_residuals(&z_try) {
                let merit_try = objective.evaluate(&z_try) + penalty * residuals_try.lp_norm(1);
                if merit_try <= merit + ARMIJO * alpha * directional_derivative {
                    return Some((alpha, z_try, residuals_try));
                }
            }
            alpha *= 0.5;
        }
        None
    }

    /// Solve the convex QP
    ///     min ½ zᵀ(P + ρI)z + (q - ρ z̄)ᵀz   s.t. A z = b
    /// returning the primal solution and equality multipliers, or the
    /// Clarabel status on failure.
    fn solve_subproblem(
        &self,
        z_bar: &DVector<Float>,
        objective: &QuadraticObjective,
        linearization: &Linearization,
        settings: &SolverSettings,
    ) -> Result<(DVector<Float>, Vec<Float>), String> {
        let n = self.num_variables();
        let rho = settings.proximal_weight;

        let P = diagonal_csc(&objective.P.add_scalar(rho));
        let q: Vec<Float> = (&objective.q - z_bar * rho).iter().cloned().collect();
        let (A, b) = self.linear_constraints(z_bar, linearization);
        let cones = if b.is_empty() {
            vec![]
        } else {
            vec![ZeroConeT(b.len())]
        };

        let qp_settings = DefaultSettings {
            verbose: settings.verbose,
            max_iter: settings.qp_max_iterations,
            ..DefaultSettings::default()
        };
        let mut solver = DefaultSolver::new(&P, &q, &A, &b, &cones, qp_settings);
        solver.solve();

        match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => Ok((
                DVector::from_column_slice(&solver.solution.x[..n]),
                solver.solution.z.clone(),
            )),
            other => Err(format!("{:?}", other)),
        }
    }

    fn result(
        &self,
        status: SolveStatus,
        z: &DVector<Float>,
        iterations: usize,
        start: Instant,
    ) -> TrajOptResult {
        let states: Vec<AcrobotState> = (0..self.num_samples).map(|k| self.state(z, k)).collect();
        let inputs: Vec<AcrobotInput> = (0..self.num_samples).map(|k| self.input(z, k)).collect();
        let max_defect = self
            .constraint_residuals(z)
            .map(|c| c.amax())
            .unwrap_or(Float::INFINITY);
        let cost = self.evaluate_cost(&states, &inputs);

        let solve_time = start.elapsed();
        info!(
            "{} finished in {:?} after {} iterations: {} (cost = {:.6e}, max defect = {:.3e})",
            crate::trajopt::SOLVER_ID,
            solve_time,
            iterations,
            status,
            cost,
            max_defect
        );

        TrajOptResult {
            status,
            iterations,
            cost,
            max_defect,
            solve_time,
            trajectory: Trajectory::new(self.sample_times(), states, inputs),
        }
    }
}

/// A feasible iterate whose predicted merit decrease is lost in round-off
/// cannot be improved by any step length.
fn is_stationary(
    merit: Float,
    directional_derivative: Float,
    max_defect: Float,
    settings: &SolverSettings,
) -> bool {
    max_defect <= settings.constraint_tolerance
        && directional_derivative.abs() <= Float::EPSILON.sqrt() * (1. + merit.abs())
}

/// Sparse diagonal matrix in Clarabel's CSC format
fn diagonal_csc(diagonal: &DVector<Float>) -> ClarabelCscMatrix<Float> {
    let n = diagonal.len();
    ClarabelCscMatrix::new(
        n,
        n,
        (0..=n).collect(),
        (0..n).collect(),
        diagonal.iter().cloned().collect(),
    )
}

fn to_clarabel(matrix: &CscMatrix<Float>) -> ClarabelCscMatrix<Float> {
    ClarabelCscMatrix::new(
        matrix.nrows(),
        matrix.ncols(),
        matrix.col_offsets().to_vec(),
        matrix.row_indices().to_vec(),
        matrix.values().to_vec(),
    )
}
