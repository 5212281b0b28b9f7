use std::path::{Path, PathBuf};

use log::debug;
use plotters::prelude::*;
use serde::Deserialize;

use crate::{
    error::VisualizerError,
    types::{AcrobotState, Float, PlanarPoint},
    util::wrap_angle,
};

/// Snapshot of the acrobot published to a visualizer
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub time: Float,
    pub state: AcrobotState,
    pub elbow: PlanarPoint,
    pub tip: PlanarPoint,
}

pub trait Visualizer {
    fn publish(&mut self, frame: &Frame) -> Result<(), VisualizerError>;
}

/// Which visualizer the demo should build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizerKind {
    #[default]
    Log,
    Snapshot,
}

impl VisualizerKind {
    /// Build the visualizer of this kind. `reach` is the combined length of
    /// both links.
    pub fn build(&self, snapshot_path: &Path, reach: Float) -> Box<dyn Visualizer + Send> {
        match self {
            VisualizerKind::Log => Box::new(LogVisualizer::default()),
            VisualizerKind::Snapshot => Box::new(SnapshotVisualizer::new(snapshot_path, reach)),
        }
    }
}

/// Writes every frame to the log at debug level, angles wrapped to (-π, π].
#[derive(Default)]
pub struct LogVisualizer {}

impl Visualizer for LogVisualizer {
    fn publish(&mut self, frame: &Frame) -> Result<(), VisualizerError> {
        debug!(
            "t = {:7.3} s  q = [{:+.3}, {:+.3}]  elbow = ({:+.3}, {:+.3})  tip = ({:+.3}, {:+.3})",
            frame.time,
            wrap_angle(frame.state[0]),
            wrap_angle(frame.state[1]),
            frame.elbow.x,
            frame.elbow.y,
            frame.tip.x,
            frame.tip.y
        );
        Ok(())
    }
}

/// Forwards frames to a channel, e.g. for an external renderer.
pub struct ChannelVisualizer {
    sender: flume::Sender<Frame>,
}

impl ChannelVisualizer {
    pub fn new(sender: flume::Sender<Frame>) -> Self {
        ChannelVisualizer { sender }
    }

    /// Visualizer paired with the receiving end of an unbounded channel
    pub fn unbounded() -> (Self, flume::Receiver<Frame>) {
        let (sender, receiver) = flume::unbounded();
        (Self::new(sender), receiver)
    }
}

impl Visualizer for ChannelVisualizer {
    fn publish(&mut self, frame: &Frame) -> Result<(), VisualizerError> {
        self.sender
            .send(frame.clone())
            .map_err(|_| VisualizerError::ChannelClosed)
    }
}

/// Draws the links into a PNG file, overwritten on every publish.
pub struct SnapshotVisualizer {
    path: PathBuf,
    /// Half-width of the square view, in meters
    extent: Float,
    size: (u32, u32),
}

impl SnapshotVisualizer {
    pub fn new(path: impl Into<PathBuf>, reach: Float) -> Self {
        SnapshotVisualizer {
            path: path.into(),
            extent: 1.1 * reach,
            size: (480, 480),
        }
    }
}

pub(crate) fn drawing_error<E: std::fmt::Display>(e: E) -> VisualizerError {
    VisualizerError::Drawing(e.to_string())
}

impl Visualizer for SnapshotVisualizer {
    fn publish(&mut self, frame: &Frame) -> Result<(), VisualizerError> {
        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(drawing_error)?;

        let extent = self.extent;
        let mut chart = ChartBuilder::on(&root)
            .caption(format!("t = {:.2} s", frame.time), ("sans-serif", 20))
            .margin(10)
            .build_cartesian_2d(-extent..extent, -extent..extent)
            .map_err(drawing_error)?;

        let joints = [
            (0.0, 0.0),
            (frame.elbow.x, frame.elbow.y),
            (frame.tip.x, frame.tip.y),
        ];
        chart
            .draw_series(LineSeries::new(joints, BLUE.stroke_width(3)))
            .map_err(drawing_error)?;
        chart
            .draw_series(joints.iter().map(|p| Circle::new(*p, 5, RED.filled())))
            .map_err(drawing_error)?;

        root.present().map_err(drawing_error)
    }
}

#[cfg(test)]
mod visualizer_tests {
    use super::*;

    fn frame(time: Float) -> Frame {
        Frame {
            time,
            state: AcrobotState::zeros(),
            elbow: PlanarPoint::new(0., -1.),
            tip: PlanarPoint::new(0., -3.),
        }
    }

    #[test]
    fn channel_visualizer_forwards_frames() {
        let (mut visualizer, receiver) = ChannelVisualizer::unbounded();

        visualizer.publish(&frame(0.0)).unwrap();
        visualizer.publish(&frame(0.1)).unwrap();

        let times: Vec<Float> = receiver.try_iter().map(|f| f.time).collect();
        assert_eq!(times, vec![0.0, 0.1]);
    }

    #[test]
    fn channel_visualizer_reports_closed_receiver() {
        let (mut visualizer, receiver) = ChannelVisualizer::unbounded();
        drop(receiver);

        let result = visualizer.publish(&frame(0.0));

        assert!(matches!(result, Err(VisualizerError::ChannelClosed)));
    }

    #[test]
    fn log_visualizer_never_fails() {
        let mut visualizer = VisualizerKind::Log.build(Path::new("unused.png"), 3.0);
        assert!(visualizer.publish(&frame(0.0)).is_ok());
    }
}
