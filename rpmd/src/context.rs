//! The seam between the integrator and the external physics engine.
//!
//! The integrator never computes a potential itself. For every bead it
//! stages a configuration into a [`PhysicsContext`], asks the engine for
//! forces on a chosen set of force groups, and reads the result back. The
//! trait is the whole surface the engine has to provide; everything else in
//! this crate is engine-agnostic.

use nalgebra::Vector3;

use crate::error::Result;

/// Access to the external physics engine's working state.
///
/// The context is a shared scratchpad owned by the caller: the integrator
/// writes bead configurations into it during force evaluations and restores
/// bead-owned state before returning. Arrays have one entry per particle.
pub trait PhysicsContext {
    fn positions(&self) -> &[Vector3<f64>];
    fn positions_mut(&mut self) -> &mut [Vector3<f64>];
    fn velocities(&self) -> &[Vector3<f64>];
    fn velocities_mut(&mut self) -> &mut [Vector3<f64>];
    fn forces(&self) -> &[Vector3<f64>];

    /// Reconstruct virtual-site positions from the particles they depend on.
    fn compute_virtual_sites(&mut self);

    /// The three periodic box vectors, in nm.
    fn periodic_box_vectors(&self) -> [Vector3<f64>; 3];

    /// Let forces with per-step state (Monte Carlo moves and the like) act
    /// on the context. May modify positions and velocities; must not be
    /// combined with anything that changes the periodic box.
    fn update_context_state(&mut self) -> Result<()>;

    /// Evaluate forces and/or energy for the current context positions,
    /// restricted to the force groups whose bits are set in `group_mask`.
    /// Returns the potential energy (0.0 when `compute_energy` is false).
    fn calc_forces_and_energy(
        &mut self,
        compute_forces: bool,
        compute_energy: bool,
        group_mask: u32,
    ) -> Result<f64>;

    fn time(&self) -> f64;
    fn set_time(&mut self, time: f64);
    fn step_count(&self) -> u64;
    fn set_step_count(&mut self, count: u64);
}

/// Static description of the physical system: per-particle masses in amu.
///
/// A zero mass marks a virtual site. Virtual sites are never thermostatted,
/// kicked, or drifted; their positions are passed through to the engine,
/// which reconstructs them.
#[derive(Debug, Clone)]
pub struct System {
    masses: Vec<f64>,
}

impl System {
    pub fn new(masses: Vec<f64>) -> Self {
        System { masses }
    }

    pub fn num_particles(&self) -> usize {
        self.masses.len()
    }

    pub fn particle_mass(&self, particle: usize) -> f64 {
        self.masses[particle]
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }
}
