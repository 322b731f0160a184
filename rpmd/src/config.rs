//! Configuration for the ring-polymer integrator.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::constants::BOLTZ;
use crate::context::System;
use crate::error::{Result, RpmdError};

/// Integrator inputs: step size, thermodynamic state, ring topology, and the
/// contraction schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpmdConfig {
    /// Time step, ps.
    pub step_size: f64,
    /// Target temperature, K.
    pub temperature: f64,
    /// Centroid friction for the thermostat, 1/ps.
    pub friction: f64,
    /// Number of ring-polymer copies (beads), P.
    pub num_copies: usize,
    /// Open-chain topology instead of the closed ring.
    #[serde(default)]
    pub open_path: bool,
    /// Whether the PILE-L thermostat is applied.
    #[serde(default = "default_apply_thermostat")]
    pub apply_thermostat: bool,
    /// Seed for the integrator's random-number stream.
    pub random_seed: u64,
    /// Bitmask of force groups the integrator evaluates at all.
    #[serde(default = "default_integration_groups")]
    pub integration_groups: u32,
    /// Contraction schedule: force group -> number of copies to evaluate it
    /// on. Groups mapped to `num_copies` are left uncontracted.
    #[serde(default)]
    pub contractions: BTreeMap<u32, usize>,
}

fn default_apply_thermostat() -> bool {
    true
}

fn default_integration_groups() -> u32 {
    u32::MAX
}

impl RpmdConfig {
    /// Load a configuration from a YAML file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RpmdConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a YAML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check every parameter against its domain.
    pub fn validate(&self) -> Result<()> {
        if self.step_size <= 0.0 {
            return Err(RpmdError::InvalidConfig(
                "step size must be positive".to_string(),
            ));
        }
        if self.temperature <= 0.0 {
            return Err(RpmdError::InvalidConfig(
                "temperature must be positive".to_string(),
            ));
        }
        if self.friction < 0.0 {
            return Err(RpmdError::InvalidConfig(
                "friction must be non-negative".to_string(),
            ));
        }
        if self.num_copies == 0 {
            return Err(RpmdError::InvalidConfig(
                "number of copies must be at least 1".to_string(),
            ));
        }
        for (&group, &copies) in &self.contractions {
            if group > 31 {
                return Err(RpmdError::InvalidForceGroup(group));
            }
            if copies == 0 || copies > self.num_copies {
                return Err(RpmdError::InvalidContractionCopies {
                    copies,
                    total: self.num_copies,
                });
            }
        }
        Ok(())
    }

    /// Sample bead velocities from the ring-polymer equilibrium
    /// distribution at the target temperature.
    ///
    /// Each bead velocity component is drawn with dispersion
    /// sqrt(P kB T / m), the stationary distribution the thermostat relaxes
    /// to. Virtual sites (zero mass) are left at zero. The sampler owns its
    /// RNG, seeded from `seed`, so it does not disturb the integrator's
    /// stream.
    pub fn sample_velocities(&self, system: &System, seed: u64) -> Vec<Vec<Vector3<f64>>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let nkt = self.num_copies as f64 * BOLTZ * self.temperature;
        let mut velocities =
            vec![vec![Vector3::zeros(); system.num_particles()]; self.num_copies];
        for bead in velocities.iter_mut() {
            for (v, &mass) in bead.iter_mut().zip(system.masses()) {
                if mass == 0.0 {
                    continue;
                }
                let sigma = (nkt / mass).sqrt();
                let x: f64 = StandardNormal.sample(&mut rng);
                let y: f64 = StandardNormal.sample(&mut rng);
                let z: f64 = StandardNormal.sample(&mut rng);
                *v = Vector3::new(x, y, z) * sigma;
            }
        }
        velocities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_config() -> RpmdConfig {
        RpmdConfig {
            step_size: 0.001,
            temperature: 300.0,
            friction: 1.0,
            num_copies: 8,
            open_path: false,
            apply_thermostat: true,
            random_seed: 42,
            integration_groups: u32::MAX,
            contractions: BTreeMap::new(),
        }
    }

    #[test]
    fn test_config_validation() {
        let mut config = create_test_config();
        assert!(config.validate().is_ok());

        config.step_size = -0.1;
        assert!(config.validate().is_err());
        config.step_size = 0.001;

        config.temperature = 0.0;
        assert!(config.validate().is_err());
        config.temperature = 300.0;

        config.num_copies = 0;
        assert!(config.validate().is_err());
        config.num_copies = 8;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_contraction_validation() {
        let mut config = create_test_config();

        config.contractions.insert(32, 4);
        assert!(matches!(
            config.validate(),
            Err(RpmdError::InvalidForceGroup(32))
        ));
        config.contractions.clear();

        config.contractions.insert(1, 9);
        assert!(matches!(
            config.validate(),
            Err(RpmdError::InvalidContractionCopies { copies: 9, total: 8 })
        ));
        config.contractions.clear();

        config.contractions.insert(1, 0);
        assert!(config.validate().is_err());
        config.contractions.clear();

        config.contractions.insert(1, 4);
        config.contractions.insert(3, 8); // == num_copies, allowed
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = create_test_config();
        config.contractions.insert(1, 4);

        let temp_file = NamedTempFile::new().unwrap();
        config.to_file(temp_file.path()).unwrap();
        let loaded = RpmdConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(loaded.num_copies, config.num_copies);
        assert_eq!(loaded.contractions, config.contractions);
        assert_eq!(loaded.random_seed, config.random_seed);
    }

    #[test]
    fn test_sample_velocities_shape_and_virtual_sites() {
        let config = create_test_config();
        let system = System::new(vec![18.0, 0.0, 1.008]);
        let velocities = config.sample_velocities(&system, 7);

        assert_eq!(velocities.len(), 8);
        assert_eq!(velocities[0].len(), 3);
        for bead in &velocities {
            assert_eq!(bead[1], Vector3::zeros());
            assert!(bead[0].norm() > 0.0);
        }
    }

    #[test]
    fn test_sample_velocities_reproducible() {
        let config = create_test_config();
        let system = System::new(vec![18.0, 1.008]);
        let a = config.sample_velocities(&system, 123);
        let b = config.sample_velocities(&system, 123);
        assert_eq!(a, b);
    }
}
