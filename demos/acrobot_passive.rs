//! # Passive acrobot
//!
//! Simulates the acrobot under zero torque from the configured initial
//! state and plots the logged joint angles.
//!
//! Usage: `acrobot_passive [config.toml]`

use acrobot_trajopt::{
    config::{self, DemoConfig},
    diagram::SimulationDiagram,
    logger::{logger_init, parse_level},
    plot::plot_logged_states,
    visualizer::LogVisualizer,
};
use color_eyre::{eyre::WrapErr, Result};
use log::info;

fn main() -> Result<()> {
    color_eyre::install()?;

    let mut config: DemoConfig = match std::env::args().nth(1) {
        Some(path) => config::load(&path)
            .wrap_err_with(|| format!("Failed to load the configuration {}", path))?,
        None => DemoConfig {
            initial_state: [1.0, 0.0, 0.0, 0.0],
            total_time: 10.0,
            ..Default::default()
        },
    };
    config.control_method = "CONST".to_string();

    logger_init(parse_level(&config.log_level)?).wrap_err("Failed to initialise logging")?;
    info!("Passive acrobot\n");

    let mut diagram = SimulationDiagram::from_config(&config, Box::new(LogVisualizer::default()))
        .wrap_err("Failed to build the simulation diagram")?;
    let initial_energy = diagram.plant().energy(&diagram.context().state);

    diagram.advance_to(config.total_time)?;

    let final_energy = diagram.plant().energy(&diagram.context().state);
    info!(
        "Simulated {} s: energy {:.4} J -> {:.4} J",
        config.total_time, initial_energy, final_energy
    );

    let path = config
        .plot_path
        .clone()
        .unwrap_or_else(|| "acrobot_passive.png".into());
    plot_logged_states(&path, diagram.logger())?;
    info!("Plot written to {:?}", path);

    Ok(())
}
