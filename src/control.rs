use std::{fmt, str::FromStr};

use crate::{
    error::ConfigError,
    types::{AcrobotInput, AcrobotState, Float},
};

/// Control method selector of the demo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMethod {
    /// Constant (zero) torque
    Constant,
    /// Direct transcription used as feedforward control. Reserved.
    DirectTranscription,
    /// Differential dynamic programming. Reserved.
    Ddp,
}

impl ControlMethod {
    pub fn tag(&self) -> &'static str {
        match self {
            ControlMethod::Constant => "CONST",
            ControlMethod::DirectTranscription => "DT",
            ControlMethod::Ddp => "DDP",
        }
    }
}

impl FromStr for ControlMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONST" => Ok(ControlMethod::Constant),
            "DT" => Ok(ControlMethod::DirectTranscription),
            "DDP" => Ok(ControlMethod::Ddp),
            other => Err(ConfigError::UnrecognizedControlMethod(other.to_string())),
        }
    }
}

impl fmt::Display for ControlMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

pub trait Controller {
    fn control(&mut self, time: Float, state: &AcrobotState) -> AcrobotInput;
}

/// Outputs the same input regardless of time and state.
pub struct ConstantController {
    value: AcrobotInput,
}

impl ConstantController {
    pub fn new(value: AcrobotInput) -> Self {
        ConstantController { value }
    }

    pub fn zero() -> Self {
        Self::new(AcrobotInput::zeros())
    }
}

impl Controller for ConstantController {
    fn control(&mut self, _time: Float, _state: &AcrobotState) -> AcrobotInput {
        self.value
    }
}

#[cfg(test)]
mod control_tests {
    use super::*;

    #[test]
    fn parse_control_methods() {
        assert_eq!("CONST".parse::<ControlMethod>().unwrap(), ControlMethod::Constant);
        assert_eq!(
            "DT".parse::<ControlMethod>().unwrap(),
            ControlMethod::DirectTranscription
        );
        assert_eq!("DDP".parse::<ControlMethod>().unwrap(), ControlMethod::Ddp);
    }

    #[test]
    fn unrecognized_control_method() {
        let result = "LQR".parse::<ControlMethod>();

        match result {
            Err(ConfigError::UnrecognizedControlMethod(tag)) => assert_eq!(tag, "LQR"),
            other => panic!("expected unrecognized control method, got {:?}", other),
        }
    }

    #[test]
    fn tags_are_case_sensitive() {
        assert!("const".parse::<ControlMethod>().is_err());
    }

    #[test]
    fn constant_controller_outputs_zero_torque() {
        let mut controller = ConstantController::zero();

        let u = controller.control(0.5, &AcrobotState::new(1., 2., 3., 4.));

        assert_eq!(u, AcrobotInput::zeros());
    }
}
