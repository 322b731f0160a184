//! Normal-mode transforms over the bead index.
//!
//! Closed rings use the complex discrete Fourier transform; open chains use
//! the orthonormal DCT-II (forward) and DCT-III (inverse). Both wrappers
//! follow the same convention: `to_modes` followed by `from_modes` is the
//! identity to round-off, and mode 0 is the centroid.
//!
//! The ring transform itself runs at unit scale; callers multiply by
//! [`RingTransform::scale`] (1/sqrt(P)) when loading the buffer and again
//! when storing it, which makes the round trip symmetric. The chain
//! transform bakes the orthonormal factors in, so chain buffers are loaded
//! and stored unscaled.

use std::sync::Arc;

use rustdct::{Dct2, Dct3, DctPlanner};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Forward/inverse complex FFT over a closed ring of P beads.
pub struct RingTransform {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scale: f64,
    len: usize,
}

impl RingTransform {
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        RingTransform {
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
            scale: 1.0 / (len as f64).sqrt(),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The 1/sqrt(P) factor callers apply on load and on store.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn to_modes(&self, buffer: &mut [Complex<f64>]) {
        self.forward.process(buffer);
    }

    pub fn from_modes(&self, buffer: &mut [Complex<f64>]) {
        self.inverse.process(buffer);
    }
}

/// Orthonormal DCT-II/III pair over an open chain of P beads.
pub struct ChainTransform {
    dct2: Arc<dyn Dct2<f64>>,
    dct3: Arc<dyn Dct3<f64>>,
    len: usize,
}

impl ChainTransform {
    pub fn new(len: usize) -> Self {
        let mut planner = DctPlanner::new();
        ChainTransform {
            dct2: planner.plan_dct2(len),
            dct3: planner.plan_dct3(len),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn to_modes(&self, buffer: &mut [f64]) {
        self.dct2.process_dct2(buffer);
        let scale = (2.0 / self.len as f64).sqrt();
        for x in buffer.iter_mut() {
            *x *= scale;
        }
        buffer[0] *= std::f64::consts::FRAC_1_SQRT_2;
    }

    pub fn from_modes(&self, buffer: &mut [f64]) {
        let scale = (2.0 / self.len as f64).sqrt();
        buffer[0] *= std::f64::consts::SQRT_2;
        for x in buffer.iter_mut() {
            *x *= scale;
        }
        self.dct3.process_dct3(buffer);
    }
}
