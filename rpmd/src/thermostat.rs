//! PILE-L thermostat: per-mode Ornstein-Uhlenbeck velocity kicks in the
//! normal-mode basis.
//!
//! The centroid mode gets a white-noise Langevin kick with the
//! caller-supplied friction; every internal mode is critically damped with
//! friction 2 w_k. Each application advances the thermostat by half a time
//! step, so a full BAOAB step applies it twice.
//!
//! For the closed ring the mode amplitudes are complex with Hermitian
//! symmetry (real bead velocities). One pair of normals is drawn per
//! conjugate pair of modes and the conjugate kick is written into the
//! mirror bin, which keeps the inverse transform real. The Nyquist bin of
//! an even-P ring is its own mirror: it is kicked as a real mode with its
//! variance doubled.

use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use rustfft::num_complex::Complex;

use crate::constants::{BOLTZ, HBAR};
use crate::propagator::{chain_frequencies, ring_frequencies};

struct ModeCoefficients {
    index: usize,
    c1: f64,
    c2: f64,
    nyquist: bool,
}

/// Precomputed friction/noise coefficients for one half-step application.
pub struct PileThermostat {
    c1_0: f64,
    c2_0: f64,
    nkt: f64,
    modes: Vec<ModeCoefficients>,
}

impl PileThermostat {
    /// Coefficients for a closed ring of `num_copies` beads.
    pub fn closed(num_copies: usize, dt: f64, temperature: f64, friction: f64) -> Self {
        let half_dt = 0.5 * dt;
        let nkt = num_copies as f64 * BOLTZ * temperature;
        let omega_n = 2.0 * nkt / HBAR;
        let frequencies = ring_frequencies(num_copies, omega_n);

        let mut modes = Vec::with_capacity(num_copies / 2);
        for (k, &w) in frequencies.iter().enumerate().take(num_copies / 2 + 1).skip(1) {
            let nyquist = num_copies % 2 == 0 && k == num_copies / 2;
            let c1 = (-2.0 * w * half_dt).exp();
            let mut c2 = ((1.0 - c1 * c1) / 2.0).sqrt();
            if nyquist {
                c2 *= std::f64::consts::SQRT_2;
            }
            modes.push(ModeCoefficients {
                index: k,
                c1,
                c2,
                nyquist,
            });
        }
        let c1_0 = (-half_dt * friction).exp();
        let c2_0 = (1.0 - c1_0 * c1_0).sqrt();
        PileThermostat {
            c1_0,
            c2_0,
            nkt,
            modes,
        }
    }

    /// Coefficients for an open chain of `num_copies` beads. The noise
    /// amplitude keeps n = P while the frequency scale uses P - 1 chain
    /// links.
    pub fn open(num_copies: usize, dt: f64, temperature: f64, friction: f64) -> Self {
        let half_dt = 0.5 * dt;
        let nkt = num_copies as f64 * BOLTZ * temperature;
        let omega_n = 2.0 * (num_copies as f64 - 1.0) * BOLTZ * temperature / HBAR;
        let frequencies = chain_frequencies(num_copies, omega_n);

        let mut modes = Vec::with_capacity(num_copies.saturating_sub(1));
        for (k, &w) in frequencies.iter().enumerate().skip(1) {
            let c1 = (-2.0 * w * half_dt).exp();
            let c2 = (1.0 - c1 * c1).sqrt();
            modes.push(ModeCoefficients {
                index: k,
                c1,
                c2,
                nyquist: false,
            });
        }
        let c1_0 = (-half_dt * friction).exp();
        let c2_0 = (1.0 - c1_0 * c1_0).sqrt();
        PileThermostat {
            c1_0,
            c2_0,
            nkt,
            modes,
        }
    }

    /// Kick complex ring modes for one particle component.
    ///
    /// `modes` holds the Fourier modes of the bead velocities; Hermitian
    /// symmetry is restored explicitly after the noise is added.
    pub fn kick_ring(&self, modes: &mut [Complex<f64>], mass: f64, rng: &mut StdRng) {
        let num_copies = modes.len();
        let thermal = (self.nkt / mass).sqrt();

        let xi: f64 = StandardNormal.sample(rng);
        modes[0].re = modes[0].re * self.c1_0 + self.c2_0 * thermal * xi;

        for mode in &self.modes {
            let c3 = mode.c2 * thermal;
            let xi1: f64 = StandardNormal.sample(rng);
            let rand1 = c3 * xi1;
            let rand2 = if mode.nyquist {
                0.0
            } else {
                let xi2: f64 = StandardNormal.sample(rng);
                c3 * xi2
            };
            modes[mode.index] = modes[mode.index] * mode.c1 + Complex::new(rand1, rand2);
            let mirror = num_copies - mode.index;
            if mode.index < mirror {
                modes[mirror] = modes[mirror] * mode.c1 + Complex::new(rand1, -rand2);
            }
        }
    }

    /// Kick real chain modes for one particle component.
    pub fn kick_chain(&self, modes: &mut [f64], mass: f64, rng: &mut StdRng) {
        let thermal = (self.nkt / mass).sqrt();

        let xi: f64 = StandardNormal.sample(rng);
        modes[0] = modes[0] * self.c1_0 + self.c2_0 * thermal * xi;

        for mode in &self.modes {
            let xi: f64 = StandardNormal.sample(rng);
            modes[mode.index] = modes[mode.index] * mode.c1 + mode.c2 * thermal * xi;
        }
    }
}
