//! Ring-polymer molecular dynamics (RPMD) integrator kernel.
//!
//! This library propagates P replicas ("beads") of an N-particle system
//! through time under either the closed ring-polymer Hamiltonian (standard
//! RPMD) or the open chain Hamiltonian (LePIGS/PIGS). The free polymer is
//! evolved analytically in its normal-mode basis, a PILE-L Langevin
//! thermostat acts per mode, and slowly varying force groups can be
//! contracted onto a reduced number of beads.
//!
//! Forces and energies come from an external physics engine behind the
//! [`PhysicsContext`] trait; this crate never evaluates a potential itself.
//!
//! # Modules
//!
//! - `config`: integrator options, validation, and YAML I/O
//! - `constants`: physical constants in MD units (nm, ps, amu, kJ/mol, K)
//! - `context`: the physics-engine trait and the system description
//! - `transform`: normal-mode transforms (complex FFT ring, DCT chain)
//! - `propagator`: exact free-polymer evolution in the mode basis
//! - `thermostat`: PILE-L per-mode Ornstein-Uhlenbeck kicks
//! - `contraction`: frequency-domain bead-count changes
//! - `stepper`: the orchestrating integrator

pub mod config;
pub mod constants;
pub mod context;
pub mod contraction;
pub mod error;
mod forces;
pub mod propagator;
pub mod stepper;
pub mod thermostat;
pub mod transform;

pub use config::RpmdConfig;
pub use context::{PhysicsContext, System};
pub use contraction::ContractionOperator;
pub use error::{Result, RpmdError};
pub use propagator::FreePolymerPropagator;
pub use stepper::RpmdStepper;
pub use thermostat::PileThermostat;
pub use transform::{ChainTransform, RingTransform};
