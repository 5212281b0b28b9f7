//! # Acrobot swing-up
//!
//! Optimizes a swing-up trajectory for the acrobot by direct transcription
//! and plays it back through the visualizer until Ctrl-C.
//!
//! Usage: `acrobot_trajopt [config.toml]`

use std::{sync::Arc, time::Duration};

use acrobot_trajopt::{
    config::{self, DemoConfig},
    control::ControlMethod,
    diagram::SimulationDiagram,
    logger::{logger_init, parse_level},
    model::AcrobotDescription,
    playback::{Playback, PlaybackSettings},
    plot::{plot_logged_states, plot_trajectory},
    trajopt::DirectTranscription,
};
use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- CONFIGURATION ----

    let config: DemoConfig = match std::env::args().nth(1) {
        Some(path) => config::load(&path)
            .wrap_err_with(|| format!("Failed to load the configuration {}", path))?,
        None => DemoConfig::default(),
    };

    logger_init(parse_level(&config.log_level)?).wrap_err("Failed to initialise logging")?;
    info!("Acrobot swing-up\n");

    // The control method is checked before any model is loaded
    let method: ControlMethod = config.control_method.parse()?;
    info!("Control method: {}", method);

    // ---- DIAGRAM ----

    let description =
        AcrobotDescription::load(&config.model).wrap_err("Failed to load the robot description")?;
    let reach = description.link1.length + description.link2.length;
    let visualizer = config
        .playback
        .visualizer
        .build(&config.playback.snapshot_path, reach);
    let mut diagram = SimulationDiagram::from_config(&config, visualizer)
        .wrap_err("Failed to build the simulation diagram")?;

    if config.simulate {
        diagram.advance_to(config.total_time)?;
        info!(
            "Simulated {} s, final state {:?}",
            config.total_time,
            diagram.context().state.as_slice()
        );
        if let Some(path) = &config.plot_path {
            plot_logged_states(path.with_extension("sim.png"), diagram.logger())?;
        }
        diagram.set_time(0.);
        diagram.set_state(&config.initial_state());
    }

    // ---- TRAJECTORY OPTIMIZATION ----

    // Independent of the plant inside the diagram
    let plant = description.build_plant()?;
    let num_samples = config.num_time_samples();
    let mut trajopt = DirectTranscription::new(plant, num_samples, config.timestep)?
        .with_integrator(config.integrator);
    trajopt.add_initial_state_constraint(config.initial_state());
    trajopt.add_running_cost(config.costs.running_cost(config.target_state()));
    trajopt.add_final_cost(config.costs.final_cost(config.target_state()));

    info!(
        "Optimizing {} samples over {} s",
        num_samples, config.total_time
    );
    let result = trajopt.solve(&config.solver);
    info!(
        "Solved in {:.3} s using {}",
        result.solve_time().as_secs_f64(),
        result.solver_id()
    );
    let trajectory = Arc::new(
        result
            .into_trajectory()
            .wrap_err("Trajectory optimization failed")?,
    );

    if let Some(path) = &config.plot_path {
        plot_trajectory(path, &trajectory)?;
        info!("Trajectory plot written to {:?}", path);
    }

    // ---- PLAYBACK ----

    let handle = Playback::spawn(
        diagram,
        trajectory,
        PlaybackSettings::from_config(&config),
    )?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.wrap_err("Failed to listen for Ctrl-C")?;
            info!("Ctrl-C received");
        }
        _ = async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        } => {
            warn!("Playback exited on its own");
        }
    }

    let stats = handle.stop().await?;
    info!(
        "Played {} passes ({} frames)",
        stats.passes_completed, stats.frames_published
    );

    Ok(())
}
