use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use log::debug;
use serde::Deserialize;

use crate::{
    acrobot::{AcrobotPlant, LinkParams},
    error::ModelError,
    types::Float,
};

/// Identifier of the built-in acrobot description
pub const ACROBOT_RESOURCE: &str = "acrobot/acrobot.toml";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkDescription {
    pub mass: Float,
    pub length: Float,
    pub com: Float,
    pub inertia: Float,
    #[serde(default)]
    pub damping: Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcrobotDescription {
    pub link1: LinkDescription,
    pub link2: LinkDescription,
    #[serde(default = "default_gravity")]
    pub gravity: Float,
}

fn default_gravity() -> Float {
    crate::GRAVITY
}

/// Resolve a resource identifier to a file under `resources/`.
pub fn find_resource(name: &str) -> Result<PathBuf, ModelError> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("resources")
        .join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ModelError::ResourceNotFound(path))
    }
}

impl AcrobotDescription {
    pub fn from_toml(source: &str) -> Result<Self, ModelError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let source = read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source)
    }

    /// Load a description given either a resource identifier or a path to a
    /// file. Existing paths take precedence.
    pub fn load(resource: &str) -> Result<Self, ModelError> {
        let path = Path::new(resource);
        let path = if path.is_file() {
            path.to_path_buf()
        } else {
            find_resource(resource)?
        };
        debug!("Loading robot description from {:?}", path);
        Self::from_file(&path)
    }

    /// Build a validated plant instance. Each call returns an independent
    /// model.
    pub fn build_plant(&self) -> Result<AcrobotPlant, ModelError> {
        AcrobotPlant::new(self.link1.into(), self.link2.into(), self.gravity)
    }
}

impl From<LinkDescription> for LinkParams {
    fn from(link: LinkDescription) -> Self {
        LinkParams {
            mass: link.mass,
            length: link.length,
            com: link.com,
            inertia: link.inertia,
            damping: link.damping,
        }
    }
}

impl AcrobotPlant {
    pub fn new(link1: LinkParams, link2: LinkParams, gravity: Float) -> Result<Self, ModelError> {
        validate_link(&link1, ["link1.mass", "link1.length", "link1.com", "link1.inertia", "link1.damping"])?;
        validate_link(&link2, ["link2.mass", "link2.length", "link2.com", "link2.inertia", "link2.damping"])?;
        if !gravity.is_finite() {
            return Err(invalid("gravity", gravity, "must be finite"));
        }
        Ok(AcrobotPlant {
            link1,
            link2,
            gravity,
        })
    }
}

fn invalid(name: &'static str, value: Float, reason: &'static str) -> ModelError {
    ModelError::InvalidParameter {
        name,
        value,
        reason,
    }
}

/// Names are [mass, length, com, inertia, damping]
fn validate_link(link: &LinkParams, names: [&'static str; 5]) -> Result<(), ModelError> {
    let values = [link.mass, link.length, link.com, link.inertia, link.damping];
    for (name, value) in names.iter().zip(values.iter()) {
        if !value.is_finite() {
            return Err(invalid(*name, *value, "must be finite"));
        }
    }

    if link.mass <= 0. {
        return Err(invalid(names[0], link.mass, "must be positive"));
    }
    if link.length <= 0. {
        return Err(invalid(names[1], link.length, "must be positive"));
    }
    if link.com < 0. || link.com > link.length {
        return Err(invalid(names[2], link.com, "must lie on the link"));
    }
    if link.inertia < 0. {
        return Err(invalid(names[3], link.inertia, "must be non-negative"));
    }
    if link.damping < 0. {
        return Err(invalid(names[4], link.damping, "must be non-negative"));
    }
    Ok(())
}

#[cfg(test)]
mod model_tests {
    use crate::{assert_close, GRAVITY};

    use super::*;

    #[test]
    fn built_in_resource_loads() {
        // Act
        let description = AcrobotDescription::load(ACROBOT_RESOURCE).unwrap();
        let plant = description.build_plant().unwrap();

        // Assert
        assert_close!(plant.link1.mass, 1.0, 1e-12);
        assert_close!(plant.link1.length, 1.0, 1e-12);
        assert_close!(plant.link2.length, 2.0, 1e-12);
        assert_close!(plant.link2.com, 1.0, 1e-12);
        assert_close!(plant.link2.inertia, 0.33, 1e-12);
        assert_close!(plant.gravity, GRAVITY, 1e-12);
    }

    #[test]
    fn plants_are_independent() {
        let description = AcrobotDescription::load(ACROBOT_RESOURCE).unwrap();
        let mut sim_plant = description.build_plant().unwrap();
        let opt_plant = description.build_plant().unwrap();

        sim_plant.link2.mass = 5.0;

        assert_close!(opt_plant.link2.mass, 1.0, 1e-12);
    }

    #[test]
    fn missing_resource() {
        let result = AcrobotDescription::load("acrobot/does_not_exist.toml");
        assert!(matches!(result, Err(ModelError::ResourceNotFound(_))));
    }

    #[test]
    fn malformed_description() {
        let result = AcrobotDescription::from_toml("gravity = 9.81\n[link1]\nmass = 1.0\n");
        assert!(matches!(result, Err(ModelError::Parse(_))));
    }

    #[test]
    fn gravity_defaults_when_omitted() {
        let source = r#"
            [link1]
            mass = 1.0
            length = 1.0
            com = 0.5
            inertia = 0.083

            [link2]
            mass = 1.0
            length = 2.0
            com = 1.0
            inertia = 0.33
        "#;

        let description = AcrobotDescription::from_toml(source).unwrap();

        assert_close!(description.gravity, GRAVITY, 1e-12);
        assert_close!(description.link1.damping, 0.0, 1e-12);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let mut description = AcrobotDescription::load(ACROBOT_RESOURCE).unwrap();
        description.link2.mass = -1.0;
        assert!(matches!(
            description.build_plant(),
            Err(ModelError::InvalidParameter {
                name: "link2.mass",
                ..
            })
        ));

        let mut description = AcrobotDescription::load(ACROBOT_RESOURCE).unwrap();
        description.link1.com = 1.5;
        assert!(matches!(
            description.build_plant(),
            Err(ModelError::InvalidParameter {
                name: "link1.com",
                ..
            })
        ));

        let mut description = AcrobotDescription::load(ACROBOT_RESOURCE).unwrap();
        description.gravity = Float::NAN;
        assert!(matches!(
            description.build_plant(),
            Err(ModelError::InvalidParameter {
                name: "gravity",
                ..
            })
        ));
    }
}
