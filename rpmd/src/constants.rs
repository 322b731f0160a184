//! Physical constants in the simulation unit system.
//!
//! Units: positions in nm, velocities in nm/ps, masses in amu, energies in
//! kJ/mol, temperatures in K. Molar constants absorb Avogadro's number so
//! that per-particle and per-mole quantities can be mixed freely.

/// Avogadro's number, 1/mol.
pub const AVOGADRO: f64 = 6.0221367e23;

/// Boltzmann constant, J/K.
pub const BOLTZMANN: f64 = 1.380658e-23;

/// Molar Boltzmann constant, kJ/(mol K).
pub const BOLTZ: f64 = BOLTZMANN * AVOGADRO / 1000.0;

/// Reduced Planck constant, kJ ps/mol (1.054571628e-34 J s converted to
/// molar MD units).
pub const HBAR: f64 = 1.054571628e-34 * AVOGADRO / (1000.0 * 1e-12);
