use serde::Deserialize;

use crate::types::{AcrobotInput, AcrobotState, Float};

/// Weights of the swing-up objective
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostWeights {
    pub running_state_weight: Float,
    pub running_input_weight: Float,
    pub final_state_weight: Float,
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights {
            running_state_weight: 0.01,
            running_input_weight: 0.01,
            final_state_weight: 200.0,
        }
    }
}

impl CostWeights {
    pub fn running_cost(&self, target: AcrobotState) -> RunningCost {
        RunningCost {
            target,
            state_weight: self.running_state_weight,
            input_weight: self.running_input_weight,
        }
    }

    pub fn final_cost(&self, target: AcrobotState) -> FinalCost {
        FinalCost {
            target,
            state_weight: self.final_state_weight,
        }
    }
}

/// g(x, u) = w_x (x - x*)ᵀ(x - x*) + w_u uᵀu
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningCost {
    pub target: AcrobotState,
    pub state_weight: Float,
    pub input_weight: Float,
}

impl RunningCost {
    pub fn evaluate(&self, x: &AcrobotState, u: &AcrobotInput) -> Float {
        let x_err = x - self.target;
        self.state_weight * x_err.dot(&x_err) + self.input_weight * u.dot(u)
    }
}

/// h(x) = w (x - x*)ᵀ(x - x*)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalCost {
    pub target: AcrobotState,
    pub state_weight: Float,
}

impl FinalCost {
    pub fn evaluate(&self, x: &AcrobotState) -> Float {
        let x_err = x - self.target;
        self.state_weight * x_err.dot(&x_err)
    }
}

#[cfg(test)]
mod cost_tests {
    use crate::{assert_close, PI};

    use super::*;

    fn upright() -> AcrobotState {
        AcrobotState::new(PI, 0., 0., 0.)
    }

    #[test]
    fn running_cost_vanishes_at_target() {
        let cost = CostWeights::default().running_cost(upright());

        assert_eq!(cost.evaluate(&upright(), &AcrobotInput::zeros()), 0.0);
    }

    #[test]
    fn running_cost_is_weighted_quadratic() {
        let cost = CostWeights::default().running_cost(upright());
        let x = upright() + AcrobotState::new(1., 0., 2., 0.);
        let u = AcrobotInput::new(3.);

        assert_close!(cost.evaluate(&x, &u), 0.01 * 5. + 0.01 * 9., 1e-12);
    }

    #[test]
    fn final_cost_dominates_running_cost_per_sample() {
        // Arrange
        let weights = CostWeights::default();
        let running = weights.running_cost(upright());
        let terminal = weights.final_cost(upright());
        let timestep = 1e-2;

        // Act & Assert
        for x_err in [
            AcrobotState::new(1e-3, 0., 0., 0.),
            AcrobotState::new(-PI, 0., 0., 0.),
            AcrobotState::new(0.5, -0.2, 3.0, 1.0),
        ] {
            let x = upright() + x_err;
            let per_sample = timestep * running.evaluate(&x, &AcrobotInput::zeros());
            let final_term = terminal.evaluate(&x);
            assert!(final_term > per_sample);
            assert_close!(final_term / running.evaluate(&x, &AcrobotInput::zeros()), 200. / 0.01, 1e-6);
        }
    }
}
