//! Ring-polymer contraction: lossy bead-count changes in the frequency
//! domain.
//!
//! Contracting positions from P beads to P' keeps the P' lowest-frequency
//! Fourier bins of the ring (the low block and the mirrored high block) and
//! inverse-transforms at the reduced length. Extending forces from P' back
//! to P zero-pads the discarded middle of the spectrum and
//! inverse-transforms at the full length, accumulating into the full-P
//! forces.
//!
//! The scales are asymmetric: positions pick up 1/P after the reduced
//! inverse transform (contraction averages), forces pick up 1/P' after the
//! full inverse transform (extension distributes). Their product preserves
//! the virial work done by the contracted groups.
//!
//! Only the closed ring supports contraction; the open chain refuses a
//! non-empty schedule before this operator is ever constructed.

use std::sync::Arc;

use nalgebra::Vector3;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Bead-count change between a P-bead and a P'-bead representation for one
/// contracted force group.
pub struct ContractionOperator {
    total_copies: usize,
    copies: usize,
    full_forward: Arc<dyn Fft<f64>>,
    full_inverse: Arc<dyn Fft<f64>>,
    // Absent for P' = 1, where the reduced transform is the identity.
    reduced_forward: Option<Arc<dyn Fft<f64>>>,
    reduced_inverse: Option<Arc<dyn Fft<f64>>>,
}

impl ContractionOperator {
    pub fn new(total_copies: usize, copies: usize) -> Self {
        let mut planner = FftPlanner::new();
        let (reduced_forward, reduced_inverse) = if copies > 1 {
            (
                Some(planner.plan_fft_forward(copies)),
                Some(planner.plan_fft_inverse(copies)),
            )
        } else {
            (None, None)
        };
        ContractionOperator {
            total_copies,
            copies,
            full_forward: planner.plan_fft_forward(total_copies),
            full_inverse: planner.plan_fft_inverse(total_copies),
            reduced_forward,
            reduced_inverse,
        }
    }

    pub fn copies(&self) -> usize {
        self.copies
    }

    /// First retained bin index past the low block: ceil((P' + 1) / 2).
    fn low_block_end(&self) -> usize {
        (self.copies + 1) / 2
    }

    /// Contract full-P positions into the first `copies` rows of
    /// `contracted`.
    pub fn contract_positions(
        &self,
        positions: &[Vec<Vector3<f64>>],
        contracted: &mut [Vec<Vector3<f64>>],
    ) {
        let num_particles = positions[0].len();
        let scale = 1.0 / self.total_copies as f64;
        let mut spectrum = vec![Complex::new(0.0, 0.0); self.total_copies];

        for particle in 0..num_particles {
            for component in 0..3 {
                for (k, bin) in spectrum.iter_mut().enumerate() {
                    *bin = Complex::new(positions[k][particle][component], 0.0);
                }
                self.full_forward.process(&mut spectrum);
                if let Some(inverse) = &self.reduced_inverse {
                    let start = self.low_block_end();
                    let end = self.total_copies - self.copies + start;
                    let shift = self.total_copies - self.copies;
                    for k in end..self.total_copies {
                        spectrum[k - shift] = spectrum[k];
                    }
                    inverse.process(&mut spectrum[..self.copies]);
                }
                for (k, row) in contracted.iter_mut().enumerate().take(self.copies) {
                    row[particle][component] = scale * spectrum[k].re;
                }
            }
        }
    }

    /// Extend contracted forces back to the full bead count, adding into
    /// `forces`.
    pub fn extend_forces(
        &self,
        contracted_forces: &[Vec<Vector3<f64>>],
        forces: &mut [Vec<Vector3<f64>>],
    ) {
        let num_particles = forces[0].len();
        let scale = 1.0 / self.copies as f64;
        let mut spectrum = vec![Complex::new(0.0, 0.0); self.total_copies];

        for particle in 0..num_particles {
            for component in 0..3 {
                for (k, row) in contracted_forces.iter().enumerate().take(self.copies) {
                    spectrum[k] = Complex::new(row[particle][component], 0.0);
                }
                if let Some(forward) = &self.reduced_forward {
                    forward.process(&mut spectrum[..self.copies]);
                }
                let start = self.low_block_end();
                let end = self.total_copies - self.copies + start;
                let shift = self.total_copies - self.copies;
                // Unpack high bins top-down so each source is read before
                // anything overwrites it.
                for k in (end..self.total_copies).rev() {
                    spectrum[k] = spectrum[k - shift];
                }
                for bin in &mut spectrum[start..end] {
                    *bin = Complex::new(0.0, 0.0);
                }
                self.full_inverse.process(&mut spectrum);
                for (k, row) in forces.iter_mut().enumerate() {
                    row[particle][component] += scale * spectrum[k].re;
                }
            }
        }
    }
}
