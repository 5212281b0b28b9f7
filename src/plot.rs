use std::path::Path;

use itertools::izip;
use plotters::prelude::*;

use crate::{
    diagram::StateLogger,
    error::VisualizerError,
    trajopt::Trajectory,
    types::{AcrobotState, Float},
    visualizer::drawing_error,
};

/// Plot the joint angles of a solved trajectory, and its input on a
/// second panel.
pub fn plot_trajectory<P: AsRef<Path>>(
    path: P,
    trajectory: &Trajectory,
) -> Result<(), VisualizerError> {
    let root = BitMapBackend::new(path.as_ref(), (640, 720)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;
    let (upper, lower) = root.split_vertically(480);

    draw_angles(
        &upper,
        "Joint angles vs. time",
        trajectory.sample_times(),
        trajectory.states(),
    )?;

    let inputs: Vec<Float> = trajectory.inputs().iter().map(|u| u[0]).collect();
    let final_time = last_time(trajectory.sample_times());
    let (min_u, max_u) = range(inputs.iter().cloned());
    let mut chart = ChartBuilder::on(&lower)
        .caption("Elbow torque", ("sans-serif", 16))
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0.0..final_time, min_u..max_u)
        .map_err(drawing_error)?;
    chart.configure_mesh().draw().map_err(drawing_error)?;
    chart
        .draw_series(LineSeries::new(
            izip!(trajectory.sample_times().iter().cloned(), inputs),
            &GREEN,
        ))
        .map_err(drawing_error)?;

    root.present().map_err(drawing_error)
}

/// Plot the joint angles recorded by a simulation logger.
pub fn plot_logged_states<P: AsRef<Path>>(
    path: P,
    logger: &StateLogger,
) -> Result<(), VisualizerError> {
    let root = BitMapBackend::new(path.as_ref(), (640, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;
    draw_angles(
        &root,
        "Simulated joint angles vs. time",
        logger.sample_times(),
        logger.states(),
    )?;
    root.present().map_err(drawing_error)
}

fn draw_angles<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    caption: &str,
    times: &[Float],
    states: &[AcrobotState],
) -> Result<(), VisualizerError> {
    let final_time = last_time(times);
    let (min_y, max_y) = range(states.iter().flat_map(|x| [x[0], x[1]]));

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0.0..final_time, min_y..max_y)
        .map_err(drawing_error)?;
    chart.configure_mesh().draw().map_err(drawing_error)?;

    for (joint, color) in [(0, BLUE), (1, RED)] {
        chart
            .draw_series(LineSeries::new(
                izip!(times.iter().cloned(), states.iter().map(|x| x[joint])),
                &color,
            ))
            .map_err(drawing_error)?
            .label(format!("q{}", joint + 1))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing_error)?;

    Ok(())
}

fn last_time(times: &[Float]) -> Float {
    match times.last() {
        Some(t) if *t > 0. => *t,
        _ => 1.0,
    }
}

/// Axis limits covering the data, padded when the data is flat
fn range(data: impl Iterator<Item = Float>) -> (Float, Float) {
    let (min, max) = data.fold((Float::INFINITY, Float::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (-1.0, 1.0);
    }
    if max - min < 1e-9 {
        return (min - 1.0, max + 1.0);
    }
    (min, max)
}
