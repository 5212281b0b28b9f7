use na::{Matrix2, Matrix4, Matrix4x1, Vector2};

use crate::{
    error::DynamicsError,
    integrators::Integrator,
    types::{AcrobotInput, AcrobotState, Float, PlanarPoint},
};

/// Physical parameters of one acrobot link
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkParams {
    pub mass: Float,
    pub length: Float,
    /// Distance from the joint to the link center-of-mass
    pub com: Float,
    /// Moment of inertia about the center-of-mass
    pub inertia: Float,
    /// Viscous joint damping
    pub damping: Float,
}

/// Acrobot, i.e. a planar double pendulum actuated only at the elbow.
///
/// θ1 is the shoulder angle measured from hanging straight down, θ2 the
/// elbow angle relative to the first link. Upright is θ1 = π, θ2 = 0.
///
/// Manipulator equation:
///     M(q) vdot + C(q, v) v = τ_g(q) + B u - b v
///
/// Ref: https://underactuated.csail.mit.edu/acrobot.html#section1
#[derive(Debug, Clone, PartialEq)]
pub struct AcrobotPlant {
    pub link1: LinkParams,
    pub link2: LinkParams,
    pub gravity: Float,
}

impl AcrobotPlant {
    pub const NUM_STATES: usize = 4;
    pub const NUM_INPUTS: usize = 1;

    pub fn num_states(&self) -> usize {
        Self::NUM_STATES
    }

    pub fn num_inputs(&self) -> usize {
        Self::NUM_INPUTS
    }

    /// Joint-space mass matrix M(q)
    #[rustfmt::skip]
    pub fn mass_matrix(&self, q: &Vector2<Float>) -> Matrix2<Float> {
        let (l1, l2) = (&self.link1, &self.link2);
        let c2 = q[1].cos();
        let I1 = l1.inertia + l1.mass * l1.com * l1.com;
        let I2 = l2.inertia + l2.mass * l2.com * l2.com;
        let m2l1lc2 = l2.mass * l1.length * l2.com;
        let m12 = I2 + m2l1lc2 * c2;
        Matrix2::new(
            I1 + I2 + l2.mass * l1.length * l1.length + 2. * m2l1lc2 * c2, m12,
            m12,                                                             I2
        )
    }

    /// c(q, v) = C(q, v) v - τ_g(q) + b v, so that M(q) vdot + c(q, v) = B u
    #[rustfmt::skip]
    pub fn dynamics_bias(&self, q: &Vector2<Float>, v: &Vector2<Float>) -> Vector2<Float> {
        let (l1, l2) = (&self.link1, &self.link2);
        let g = self.gravity;
        let s1 = q[0].sin();
        let s2 = q[1].sin();
        let s12 = (q[0] + q[1]).sin();
        let m2l1lc2 = l2.mass * l1.length * l2.com;

        let C = Matrix2::new(
            -2. * m2l1lc2 * s2 * v[1], -m2l1lc2 * s2 * v[1],
            m2l1lc2 * s2 * v[0],       0.
        );
        let tau_g = Vector2::new(
            -l1.mass * g * l1.com * s1 - l2.mass * g * (l1.length * s1 + l2.com * s12),
            -l2.mass * g * l2.com * s12
        );
        let damping = Vector2::new(l1.damping * v[0], l2.damping * v[1]);

        C * v - tau_g + damping
    }

    /// Maps the input to generalized forces, only the elbow is actuated
    pub fn actuation_matrix(&self) -> Vector2<Float> {
        Vector2::new(0., 1.)
    }

    /// Continuous dynamics xdot = f(x, u)
    pub fn dynamics(
        &self,
        x: &AcrobotState,
        u: &AcrobotInput,
    ) -> Result<AcrobotState, DynamicsError> {
        let q = x.fixed_rows::<2>(0).into_owned();
        let v = x.fixed_rows::<2>(2).into_owned();

        let M = self.mass_matrix(&q);
        let tau = self.actuation_matrix() * u[0] - self.dynamics_bias(&q, &v);
        let vdot = M
            .lu()
            .solve(&tau)
            .ok_or(DynamicsError::SingularMassMatrix(q[0], q[1]))?;

        let xdot = AcrobotState::new(v[0], v[1], vdot[0], vdot[1]);
        if xdot.iter().all(|x| x.is_finite()) {
            Ok(xdot)
        } else {
            Err(DynamicsError::NonFinite)
        }
    }

    /// Step the state forward by dt seconds, holding the input constant.
    pub fn discrete_step(
        &self,
        x: &AcrobotState,
        u: &AcrobotInput,
        dt: Float,
        integrator: &Integrator,
    ) -> Result<AcrobotState, DynamicsError> {
        integrator.step(x, dt, |x| self.dynamics(x, u))
    }

    /// Jacobians (∂x_next/∂x, ∂x_next/∂u) of the discrete step, computed by
    /// central finite differences.
    pub fn step_jacobians(
        &self,
        x: &AcrobotState,
        u: &AcrobotInput,
        dt: Float,
        integrator: &Integrator,
    ) -> Result<(Matrix4<Float>, Matrix4x1<Float>), DynamicsError> {
        const EPS: Float = 1e-6;

        let mut A = Matrix4::zeros();
        for i in 0..Self::NUM_STATES {
            let mut x_plus = *x;
            let mut x_minus = *x;
            x_plus[i] += EPS;
            x_minus[i] -= EPS;
            let column = (self.discrete_step(&x_plus, u, dt, integrator)?
                - self.discrete_step(&x_minus, u, dt, integrator)?)
                / (2. * EPS);
            A.set_column(i, &column);
        }

        let u_plus = AcrobotInput::new(u[0] + EPS);
        let u_minus = AcrobotInput::new(u[0] - EPS);
        let B = (self.discrete_step(x, &u_plus, dt, integrator)?
            - self.discrete_step(x, &u_minus, dt, integrator)?)
            / (2. * EPS);

        Ok((A, B))
    }

    /// Elbow and tip positions in the (x, z) plane, shoulder at the origin.
    pub fn link_positions(&self, q: &Vector2<Float>) -> (PlanarPoint, PlanarPoint) {
        let theta12 = q[0] + q[1];
        let elbow = PlanarPoint::new(
            self.link1.length * q[0].sin(),
            -self.link1.length * q[0].cos(),
        );
        let tip = elbow
            + PlanarPoint::new(
                self.link2.length * theta12.sin(),
                -self.link2.length * theta12.cos(),
            );
        (elbow, tip)
    }

    pub fn kinetic_energy(&self, x: &AcrobotState) -> Float {
        let q = x.fixed_rows::<2>(0).into_owned();
        let v = x.fixed_rows::<2>(2).into_owned();
        0.5 * v.dot(&(self.mass_matrix(&q) * v))
    }

    /// Potential energy with zero at the shoulder height
    pub fn potential_energy(&self, x: &AcrobotState) -> Float {
        let (l1, l2) = (&self.link1, &self.link2);
        let c1 = x[0].cos();
        let c12 = (x[0] + x[1]).cos();
        -l1.mass * self.gravity * l1.com * c1
            - l2.mass * self.gravity * (l1.length * c1 + l2.com * c12)
    }

    pub fn energy(&self, x: &AcrobotState) -> Float {
        self.kinetic_energy(x) + self.potential_energy(x)
    }
}
