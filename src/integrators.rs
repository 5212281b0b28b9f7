use serde::Deserialize;

use crate::{
    error::DynamicsError,
    types::{AcrobotState, Float},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    #[default]
    SemiImplicitEuler,
    Euler,
    RungeKutta4,
}

impl Integrator {
    /// Advance x by dt given its continuous dynamics xdot = f(x).
    pub fn step<F>(&self, x: &AcrobotState, dt: Float, f: F) -> Result<AcrobotState, DynamicsError>
    where
        F: Fn(&AcrobotState) -> Result<AcrobotState, DynamicsError>,
    {
        match self {
            Integrator::SemiImplicitEuler => semi_implicit_euler_step(x, dt, f),
            Integrator::Euler => Ok(x + f(x)? * dt),
            Integrator::RungeKutta4 => runge_kutta_4(x, dt, f),
        }
    }
}

/// Semi-Implicit Euler integration step:
///     v(k+1) = v(k) + dt * vdot
///     q(k+1) = q(k) + dt * v(k+1)
///
/// Note: this is energy conserving for Hamiltonian systems, and is the update
/// used by discrete-time multibody plants.
/// Ref: Drake Doc, https://drake.mit.edu/doxygen_cxx/classdrake_1_1systems_1_1_semi_explicit_euler_integrator.html
fn semi_implicit_euler_step<F>(
    x: &AcrobotState,
    dt: Float,
    f: F,
) -> Result<AcrobotState, DynamicsError>
where
    F: Fn(&AcrobotState) -> Result<AcrobotState, DynamicsError>,
{
    let xdot = f(x)?;
    let v1 = x[2] + xdot[2] * dt;
    let v2 = x[3] + xdot[3] * dt;
    Ok(AcrobotState::new(x[0] + v1 * dt, x[1] + v2 * dt, v1, v2))
}

fn runge_kutta_4<F>(x: &AcrobotState, dt: Float, f: F) -> Result<AcrobotState, DynamicsError>
where
    F: Fn(&AcrobotState) -> Result<AcrobotState, DynamicsError>,
{
    let k1 = f(x)?;
    let k2 = f(&(x + k1 * (dt / 2.0)))?;
    let k3 = f(&(x + k2 * (dt / 2.0)))?;
    let k4 = f(&(x + k3 * dt))?;
    Ok(x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0))
}

#[cfg(test)]
mod integrators_tests {
    use crate::{
        acrobot::{AcrobotPlant, LinkParams},
        assert_close, assert_vec_close,
        types::AcrobotInput,
        GRAVITY,
    };

    use super::*;

    /// xdot = [v, -q] per joint, i.e. two decoupled unit harmonic oscillators
    fn oscillator(x: &AcrobotState) -> Result<AcrobotState, DynamicsError> {
        Ok(AcrobotState::new(x[2], x[3], -x[0], -x[1]))
    }

    #[test]
    fn runge_kutta_4_harmonic_oscillator() {
        // Arrange
        let mut x = AcrobotState::new(1., 0., 0., 1.);
        let dt = 1e-2;
        let final_time = 1.0;
        let num_steps = (final_time / dt) as usize;

        // Act
        for _ in 0..num_steps {
            x = Integrator::RungeKutta4.step(&x, dt, oscillator).unwrap();
        }

        // Assert
        let t = num_steps as Float * dt;
        let expected = AcrobotState::new(t.cos(), t.sin(), -t.sin(), t.cos());
        assert_vec_close!(x, expected, 1e-8);
    }

    #[test]
    fn semi_implicit_euler_uses_updated_velocity() {
        let x = AcrobotState::new(1., 0., 0., 1.);
        let dt = 0.1;

        let x_next = Integrator::SemiImplicitEuler
            .step(&x, dt, oscillator)
            .unwrap();

        // v(k+1) = v - dt q, q(k+1) = q + dt v(k+1)
        assert_vec_close!(
            x_next,
            AcrobotState::new(1. + dt * -dt, dt * 1., -dt, 1.),
            1e-12
        );
    }

    #[test]
    fn passive_acrobot_conserves_energy() {
        // Arrange
        let plant = AcrobotPlant {
            link1: LinkParams {
                mass: 1.0,
                length: 1.0,
                com: 0.5,
                inertia: 0.083,
                damping: 0.0,
            },
            link2: LinkParams {
                mass: 1.0,
                length: 2.0,
                com: 1.0,
                inertia: 0.33,
                damping: 0.0,
            },
            gravity: GRAVITY,
        };
        let mut x = AcrobotState::new(1.0, -0.5, 0.0, 0.0);
        let initial_energy = plant.energy(&x);

        // Act
        let final_time = 5.0;
        let dt = 1e-3;
        let num_steps = (final_time / dt) as usize;
        for _ in 0..num_steps {
            x = plant
                .discrete_step(&x, &AcrobotInput::zeros(), dt, &Integrator::RungeKutta4)
                .unwrap();
        }

        // Assert
        assert_close!(plant.energy(&x), initial_energy, 1e-4);
    }
}
