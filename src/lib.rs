#![allow(non_snake_case)]

use types::Float;
pub extern crate nalgebra as na;

pub mod acrobot;
pub mod config;
pub mod control;
pub mod diagram;
pub mod error;
pub mod integrators;
pub mod logger;
pub mod model;
pub mod playback;
pub mod plot;
pub mod trajopt;
pub mod types;
pub mod util;
pub mod visualizer;

pub const GRAVITY: Float = 9.81;

pub const PI: Float = std::f64::consts::PI;
pub const TWO_PI: Float = 2.0 * PI;
