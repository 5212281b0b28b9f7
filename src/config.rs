use std::{fs::read_to_string, path::Path, path::PathBuf};

use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    error::ConfigError,
    integrators::Integrator,
    model::ACROBOT_RESOURCE,
    trajopt::{CostWeights, SolverSettings},
    types::{AcrobotState, Float},
    visualizer::VisualizerKind,
    PI,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Horizon of the optimization, in seconds
    pub total_time: Float,
    pub timestep: Float,
    /// CONST, DT or DDP
    pub control_method: String,
    pub initial_state: [Float; 4],
    pub target_state: [Float; 4],
    /// Path to a robot description, or a name under `resources/`
    pub model: String,
    pub integrator: Integrator,
    /// Simulate the diagram with its controller before optimizing
    pub simulate: bool,
    pub log_level: String,
    pub plot_path: Option<PathBuf>,
    pub costs: CostWeights,
    pub solver: SolverSettings,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Time spent publishing a frame, subtracted from every sleep
    pub publish_overhead: Float,
    /// Pause after every pass through the trajectory, in seconds
    pub pass_pause: Float,
    pub visualizer: VisualizerKind,
    pub snapshot_path: PathBuf,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            total_time: 2.0,
            timestep: 1e-2,
            control_method: "CONST".to_string(),
            initial_state: [0.; 4],
            target_state: [PI, 0., 0., 0.],
            model: ACROBOT_RESOURCE.to_string(),
            integrator: Integrator::default(),
            simulate: false,
            log_level: "info".to_string(),
            plot_path: None,
            costs: CostWeights::default(),
            solver: SolverSettings::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            publish_overhead: 3e-4,
            pass_pause: 1.0,
            visualizer: VisualizerKind::default(),
            snapshot_path: PathBuf::from("acrobot.png"),
        }
    }
}

impl DemoConfig {
    /// Check the horizon. The control method is checked where it is parsed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.timestep > 0.) || !self.timestep.is_finite() {
            return Err(ConfigError::InvalidTimestep(self.timestep));
        }
        if !(self.total_time >= self.timestep) {
            return Err(ConfigError::InvalidHorizon {
                total_time: self.total_time,
                timestep: self.timestep,
            });
        }
        Ok(())
    }

    pub fn initial_state(&self) -> AcrobotState {
        AcrobotState::from_column_slice(&self.initial_state)
    }

    pub fn target_state(&self) -> AcrobotState {
        AcrobotState::from_column_slice(&self.target_state)
    }

    /// Number of samples over the horizon, N = round(total_time / timestep)
    pub fn num_time_samples(&self) -> usize {
        (self.total_time / self.timestep).round() as usize
    }
}

/// Load a TOML file into any deserialisable configuration.
pub fn load<P, C>(path: P) -> Result<C, ConfigError>
where
    P: AsRef<Path>,
    C: DeserializeOwned,
{
    let path = path.as_ref();
    let config_str = read_to_string(path).map_err(|source| ConfigError::FileLoad {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(toml::from_str(config_str.as_str())?)
}

#[cfg(test)]
mod config_tests {
    use std::fs;

    use crate::assert_close;

    use super::*;

    #[test]
    fn defaults_match_swing_up_demo() {
        let config = DemoConfig::default();

        assert_eq!(config.total_time, 2.0);
        assert_eq!(config.timestep, 1e-2);
        assert_eq!(config.control_method, "CONST");
        assert_eq!(config.initial_state(), AcrobotState::zeros());
        assert_eq!(config.target_state(), AcrobotState::new(PI, 0., 0., 0.));
        assert_eq!(config.costs.running_state_weight, 0.01);
        assert_eq!(config.costs.running_input_weight, 0.01);
        assert_eq!(config.costs.final_state_weight, 200.0);
        assert_eq!(config.playback.publish_overhead, 3e-4);
        assert_eq!(config.playback.pass_pause, 1.0);
        assert_eq!(config.playback.visualizer, VisualizerKind::Log);
        assert!(!config.simulate);
        assert_eq!(config.num_time_samples(), 200);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        // Arrange
        let toml_str = r#"
            timestep = 0.05
            control_method = "DT"

            [costs]
            final_state_weight = 50.0

            [playback]
            visualizer = "snapshot"
        "#;

        // Act
        let config: DemoConfig = toml::from_str(toml_str).unwrap();

        // Assert
        assert_eq!(config.timestep, 0.05);
        assert_eq!(config.control_method, "DT");
        assert_eq!(config.costs.final_state_weight, 50.0);
        assert_eq!(config.costs.running_input_weight, 0.01);
        assert_eq!(config.playback.visualizer, VisualizerKind::Snapshot);
        assert_eq!(config.playback.pass_pause, 1.0);
        assert_eq!(config.num_time_samples(), 40);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result: Result<DemoConfig, _> = toml::from_str("time_step = 0.1");
        assert!(result.is_err());
    }

    #[test]
    fn bundled_demo_config_equals_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/demo.toml");

        let config: DemoConfig = load(&path).unwrap();

        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn load_reads_file_from_disk() {
        // Arrange
        let path = std::env::temp_dir().join(format!(
            "acrobot_trajopt_config_{}.toml",
            std::process::id()
        ));
        fs::write(&path, "total_time = 1.5\ninitial_state = [0.1, 0.0, 0.0, 0.0]\n").unwrap();

        // Act
        let config: Result<DemoConfig, ConfigError> = load(&path);
        fs::remove_file(&path).unwrap();

        // Assert
        let config = config.unwrap();
        assert_close!(config.total_time, 1.5, 1e-12);
        assert_close!(config.initial_state()[0], 0.1, 1e-12);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let result: Result<DemoConfig, ConfigError> = load("/nonexistent/demo.toml");
        assert!(matches!(result, Err(ConfigError::FileLoad { .. })));
    }

    #[test]
    fn validate_rejects_degenerate_horizon() {
        let config = DemoConfig {
            timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimestep(_))
        ));

        let config = DemoConfig {
            total_time: 1e-3,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHorizon { .. })
        ));

        assert!(DemoConfig::default().validate().is_ok());
    }
}
