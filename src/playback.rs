//! Wall-clock playback of a solved trajectory through the diagram's
//! visualizer. Runs as a tokio task until stopped.

use std::{sync::Arc, time::Duration};

use log::{debug, info};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config::DemoConfig, diagram::SimulationDiagram, error::PlaybackError, trajopt::Trajectory,
    types::Float,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    /// Time between samples of the trajectory
    pub timestep: Float,
    /// Time taken to publish one frame
    pub publish_overhead: Float,
    /// Pause after each pass
    pub pass_pause: Float,
}

impl PlaybackSettings {
    pub fn from_config(config: &DemoConfig) -> Self {
        PlaybackSettings {
            timestep: config.timestep,
            publish_overhead: config.playback.publish_overhead,
            pass_pause: config.playback.pass_pause,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub passes_completed: usize,
    pub frames_published: usize,
}

/// Sleep between frames, max(timestep - overhead, 0).
pub fn sleep_duration(timestep: Float, overhead: Float) -> Duration {
    seconds((timestep - overhead).max(0.))
}

fn seconds(secs: Float) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.)).unwrap_or(Duration::ZERO)
}

pub struct Playback;

impl Playback {
    /// Move the diagram into a new task that replays `trajectory` until
    /// stopped.
    pub fn spawn(
        diagram: SimulationDiagram,
        trajectory: Arc<Trajectory>,
        settings: PlaybackSettings,
    ) -> Result<PlaybackHandle, PlaybackError> {
        if trajectory.is_empty() {
            return Err(PlaybackError::EmptyTrajectory);
        }

        let (stop, stop_receiver) = watch::channel(false);
        let task = tokio::spawn(run(diagram, trajectory, settings, stop_receiver));
        info!("Playback started");
        Ok(PlaybackHandle { stop, task })
    }
}

pub struct PlaybackHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<Result<PlaybackStats, PlaybackError>>,
}

impl PlaybackHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn stop(self) -> Result<PlaybackStats, PlaybackError> {
        // Fails only if the task already exited, which the join reports
        let _ = self.stop.send(true);
        let stats = self.task.await??;
        info!(
            "Playback stopped after {} passes, {} frames",
            stats.passes_completed, stats.frames_published
        );
        Ok(stats)
    }
}

async fn run(
    mut diagram: SimulationDiagram,
    trajectory: Arc<Trajectory>,
    settings: PlaybackSettings,
    mut stop: watch::Receiver<bool>,
) -> Result<PlaybackStats, PlaybackError> {
    let frame_sleep = sleep_duration(settings.timestep, settings.publish_overhead);
    let pass_pause = seconds(settings.pass_pause);
    let mut stats = PlaybackStats::default();

    loop {
        for (time, state) in trajectory.iter() {
            if *stop.borrow() {
                return Ok(stats);
            }
            diagram.set_time(time);
            diagram.set_state(state);
            diagram.publish()?;
            stats.frames_published += 1;

            if wait_or_stop(&mut stop, frame_sleep).await {
                return Ok(stats);
            }
        }

        stats.passes_completed += 1;
        debug!("Playback pass {} complete", stats.passes_completed);

        if wait_or_stop(&mut stop, pass_pause).await {
            return Ok(stats);
        }
    }
}

/// Sleep for `duration`, returning early with true if a stop is signalled
/// or the handle is dropped.
async fn wait_or_stop(stop: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    if *stop.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = stop.changed() => changed.is_err() || *stop.borrow(),
    }
}
