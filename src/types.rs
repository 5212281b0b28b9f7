use na::{Vector1, Vector2, Vector4};

pub type Float = f64;

/// [θ1, θ2, θ1dot, θ2dot]
pub type AcrobotState = Vector4<Float>;

/// Elbow torque
pub type AcrobotInput = Vector1<Float>;

/// Point in the plane of motion, (x, z) with z pointing up
pub type PlanarPoint = Vector2<Float>;
