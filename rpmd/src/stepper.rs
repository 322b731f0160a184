//! The top-level stepper: owns the replica ensemble and composes the
//! thermostat, the free-polymer drift, and the force driver into one
//! symplectic step.
//!
//! Step layout (BAOAB-style, thermostat optional):
//!
//! ```text
//! thermostat(dt/2) -> kick(dt/2) -> free-polymer drift(dt)
//!   -> force evaluation -> kick(dt/2) -> thermostat(dt/2)
//! ```
//!
//! The closed ring and the open chain share this skeleton; they differ in
//! the normal-mode transform, the mode-frequency formula, the thermostat
//! noise structure, and the endpoint force treatment, all selected once at
//! construction.

use std::collections::BTreeMap;

use itertools::izip;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustfft::num_complex::Complex;
use tracing::info;

use crate::config::RpmdConfig;
use crate::constants::{BOLTZ, HBAR};
use crate::context::{PhysicsContext, System};
use crate::contraction::ContractionOperator;
use crate::error::{Result, RpmdError};
use crate::propagator::{chain_frequencies, ring_frequencies, FreePolymerPropagator};
use crate::thermostat::PileThermostat;
use crate::transform::{ChainTransform, RingTransform};

/// Normal-mode machinery for the active topology.
pub(crate) enum ModeBasis {
    Ring(RingTransform),
    Chain(ChainTransform),
}

/// One entry of the contraction schedule: the force groups in `group_mask`
/// are evaluated on `copies` beads and extrapolated back.
pub(crate) struct Contraction {
    pub(crate) copies: usize,
    pub(crate) group_mask: u32,
    pub(crate) operator: ContractionOperator,
}

/// Replica-aware integrator for P copies of an N-particle system.
///
/// The stepper owns the three P x N ensembles (positions, velocities,
/// forces) for its whole lifetime; callers observe and modify them only
/// through the bulk accessors.
pub struct RpmdStepper {
    pub(crate) config: RpmdConfig,
    pub(crate) masses: Vec<f64>,
    pub(crate) positions: Vec<Vec<Vector3<f64>>>,
    pub(crate) velocities: Vec<Vec<Vector3<f64>>>,
    pub(crate) forces: Vec<Vec<Vector3<f64>>>,
    pub(crate) groups_not_contracted: u32,
    pub(crate) contractions: Vec<Contraction>,
    pub(crate) contracted_positions: Vec<Vec<Vector3<f64>>>,
    pub(crate) contracted_forces: Vec<Vec<Vector3<f64>>>,
    pub(crate) rng: StdRng,
    pub(crate) basis: ModeBasis,
    propagator: FreePolymerPropagator,
    thermostat: PileThermostat,
}

impl RpmdStepper {
    /// Initialize the stepper: size the ensembles, build the contraction
    /// schedule, seed the random-number stream.
    pub fn new(system: &System, config: RpmdConfig) -> Result<Self> {
        config.validate()?;
        let num_copies = config.num_copies;
        let num_particles = system.num_particles();

        // Invert the group -> copies map into copies -> group mask. Groups
        // mapped to the full copy count stay uncontracted.
        let mut groups_not_contracted = u32::MAX;
        let mut groups_by_copies: BTreeMap<usize, u32> = BTreeMap::new();
        for (&group, &copies) in &config.contractions {
            if copies != num_copies {
                *groups_by_copies.entry(copies).or_insert(0) |= 1 << group;
                groups_not_contracted &= !(1 << group);
            }
        }
        groups_not_contracted &= config.integration_groups;

        let max_contracted = groups_by_copies.keys().next_back().copied().unwrap_or(0);
        let contractions: Vec<Contraction> = groups_by_copies
            .into_iter()
            .map(|(copies, group_mask)| Contraction {
                copies,
                group_mask,
                operator: ContractionOperator::new(num_copies, copies),
            })
            .collect();

        let (basis, propagator, thermostat) = if config.open_path {
            let omega_n =
                2.0 * (num_copies as f64 - 1.0) * BOLTZ * config.temperature / HBAR;
            (
                ModeBasis::Chain(ChainTransform::new(num_copies)),
                FreePolymerPropagator::new(
                    chain_frequencies(num_copies, omega_n),
                    config.step_size,
                ),
                PileThermostat::open(
                    num_copies,
                    config.step_size,
                    config.temperature,
                    config.friction,
                ),
            )
        } else {
            let omega_n = 2.0 * num_copies as f64 * BOLTZ * config.temperature / HBAR;
            (
                ModeBasis::Ring(RingTransform::new(num_copies)),
                FreePolymerPropagator::new(
                    ring_frequencies(num_copies, omega_n),
                    config.step_size,
                ),
                PileThermostat::closed(
                    num_copies,
                    config.step_size,
                    config.temperature,
                    config.friction,
                ),
            )
        };

        info!(
            "initialized ring-polymer stepper: {} copies, {} particles, {} topology, {} contraction(s)",
            num_copies,
            num_particles,
            if config.open_path { "open" } else { "closed" },
            contractions.len()
        );

        Ok(RpmdStepper {
            rng: StdRng::seed_from_u64(config.random_seed),
            masses: system.masses().to_vec(),
            positions: vec![vec![Vector3::zeros(); num_particles]; num_copies],
            velocities: vec![vec![Vector3::zeros(); num_particles]; num_copies],
            forces: vec![vec![Vector3::zeros(); num_particles]; num_copies],
            groups_not_contracted,
            contractions,
            contracted_positions: vec![vec![Vector3::zeros(); num_particles]; max_contracted],
            contracted_forces: vec![vec![Vector3::zeros(); num_particles]; max_contracted],
            basis,
            propagator,
            thermostat,
            config,
        })
    }

    /// Advance the ensemble by one time step.
    ///
    /// `forces_are_valid` tells the stepper the forces array already matches
    /// the current positions, so the leading evaluation can be skipped.
    pub fn execute<C: PhysicsContext>(
        &mut self,
        context: &mut C,
        forces_are_valid: bool,
    ) -> Result<()> {
        if self.config.open_path && !self.contractions.is_empty() {
            return Err(RpmdError::OpenPathContraction);
        }
        if !forces_are_valid {
            self.compute_forces(context)?;
        }
        if self.config.apply_thermostat {
            self.thermostat_half_step();
        }
        self.half_kick();
        self.drift();
        self.compute_forces(context)?;
        self.half_kick();
        if self.config.apply_thermostat {
            self.thermostat_half_step();
        }
        context.set_time(context.time() + self.config.step_size);
        context.set_step_count(context.step_count() + 1);
        Ok(())
    }

    /// Kinetic energy of the bead currently staged in the context.
    pub fn compute_kinetic_energy<C: PhysicsContext>(&self, context: &C) -> f64 {
        0.5 * context
            .velocities()
            .iter()
            .zip(&self.masses)
            .filter(|&(_, &mass)| mass > 0.0)
            .map(|(v, &mass)| mass * v.norm_squared())
            .sum::<f64>()
    }

    /// One PILE-L half-step on every thermostatted degree of freedom.
    fn thermostat_half_step(&mut self) {
        let num_copies = self.config.num_copies;
        match &self.basis {
            ModeBasis::Ring(transform) => {
                let scale = transform.scale();
                let mut column = vec![Complex::new(0.0, 0.0); num_copies];
                for (particle, &mass) in self.masses.iter().enumerate() {
                    if mass == 0.0 {
                        continue;
                    }
                    for component in 0..3 {
                        for (k, value) in column.iter_mut().enumerate() {
                            *value = Complex::new(
                                scale * self.velocities[k][particle][component],
                                0.0,
                            );
                        }
                        transform.to_modes(&mut column);
                        self.thermostat.kick_ring(&mut column, mass, &mut self.rng);
                        transform.from_modes(&mut column);
                        for (k, value) in column.iter().enumerate() {
                            self.velocities[k][particle][component] = scale * value.re;
                        }
                    }
                }
            }
            ModeBasis::Chain(transform) => {
                let mut column = vec![0.0; num_copies];
                for (particle, &mass) in self.masses.iter().enumerate() {
                    if mass == 0.0 {
                        continue;
                    }
                    for component in 0..3 {
                        for (k, value) in column.iter_mut().enumerate() {
                            *value = self.velocities[k][particle][component];
                        }
                        transform.to_modes(&mut column);
                        self.thermostat.kick_chain(&mut column, mass, &mut self.rng);
                        transform.from_modes(&mut column);
                        for (k, &value) in column.iter().enumerate() {
                            self.velocities[k][particle][component] = value;
                        }
                    }
                }
            }
        }
    }

    /// Half-step velocity kick from the current forces.
    fn half_kick(&mut self) {
        let half_dt = 0.5 * self.config.step_size;
        for (bead_velocities, bead_forces) in self.velocities.iter_mut().zip(&self.forces) {
            for (v, &f, &mass) in izip!(bead_velocities.iter_mut(), bead_forces, &self.masses) {
                if mass != 0.0 {
                    *v += f * (half_dt / mass);
                }
            }
        }
    }

    /// Evolve the free polymer exactly for one step in the mode basis.
    fn drift(&mut self) {
        let num_copies = self.config.num_copies;
        match &self.basis {
            ModeBasis::Ring(transform) => {
                let scale = transform.scale();
                let mut q = vec![Complex::new(0.0, 0.0); num_copies];
                let mut v = vec![Complex::new(0.0, 0.0); num_copies];
                for (particle, &mass) in self.masses.iter().enumerate() {
                    if mass == 0.0 {
                        continue;
                    }
                    for component in 0..3 {
                        for k in 0..num_copies {
                            q[k] = Complex::new(
                                scale * self.positions[k][particle][component],
                                0.0,
                            );
                            v[k] = Complex::new(
                                scale * self.velocities[k][particle][component],
                                0.0,
                            );
                        }
                        transform.to_modes(&mut q);
                        transform.to_modes(&mut v);
                        self.propagator.advance(&mut q, &mut v);
                        transform.from_modes(&mut q);
                        transform.from_modes(&mut v);
                        for k in 0..num_copies {
                            self.positions[k][particle][component] = scale * q[k].re;
                            self.velocities[k][particle][component] = scale * v[k].re;
                        }
                    }
                }
            }
            ModeBasis::Chain(transform) => {
                let mut q = vec![0.0; num_copies];
                let mut v = vec![0.0; num_copies];
                for (particle, &mass) in self.masses.iter().enumerate() {
                    if mass == 0.0 {
                        continue;
                    }
                    for component in 0..3 {
                        for k in 0..num_copies {
                            q[k] = self.positions[k][particle][component];
                            v[k] = self.velocities[k][particle][component];
                        }
                        transform.to_modes(&mut q);
                        transform.to_modes(&mut v);
                        self.propagator.advance(&mut q, &mut v);
                        transform.from_modes(&mut q);
                        transform.from_modes(&mut v);
                        for k in 0..num_copies {
                            self.positions[k][particle][component] = q[k];
                            self.velocities[k][particle][component] = v[k];
                        }
                    }
                }
            }
        }
    }

    pub fn num_copies(&self) -> usize {
        self.config.num_copies
    }

    pub fn num_particles(&self) -> usize {
        self.masses.len()
    }

    /// The group mask used for the full-copy-count force evaluation.
    pub fn groups_not_contracted(&self) -> u32 {
        self.groups_not_contracted
    }

    /// The contraction schedule as (copies, group mask) pairs, ascending in
    /// copy count.
    pub fn contraction_schedule(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.contractions.iter().map(|c| (c.copies, c.group_mask))
    }

    pub fn positions(&self, copy: usize) -> &[Vector3<f64>] {
        &self.positions[copy]
    }

    pub fn velocities(&self, copy: usize) -> &[Vector3<f64>] {
        &self.velocities[copy]
    }

    pub fn forces(&self, copy: usize) -> &[Vector3<f64>] {
        &self.forces[copy]
    }

    /// Overwrite one bead's positions.
    pub fn set_positions(&mut self, copy: usize, positions: &[Vector3<f64>]) {
        self.positions[copy].copy_from_slice(positions);
    }

    /// Overwrite one bead's velocities.
    pub fn set_velocities(&mut self, copy: usize, velocities: &[Vector3<f64>]) {
        self.velocities[copy].copy_from_slice(velocities);
    }

    /// Stage one bead into the context for observation.
    pub fn copy_to_context<C: PhysicsContext>(&self, copy: usize, context: &mut C) {
        context.positions_mut().copy_from_slice(&self.positions[copy]);
        context.velocities_mut().copy_from_slice(&self.velocities[copy]);
    }

    /// Read one bead back out of the context.
    pub fn copy_from_context<C: PhysicsContext>(&mut self, copy: usize, context: &C) {
        self.positions[copy].copy_from_slice(context.positions());
        self.velocities[copy].copy_from_slice(context.velocities());
    }
}
