// Free ring-polymer evolution without forces or thermostat.
//
// An 8-bead ring of a single particle is started away from its centroid
// with a small internal-mode excitation. The exact normal-mode propagator
// conserves the ring Hamiltonian
//
//   H = sum_j m v_j^2 / 2 + (m / 2) (w_n / 2)^2 sum_j (q_j - q_{j+1})^2
//
// to round-off; the demo prints the relative energy drift while the
// centroid drifts linearly.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use rpmd::constants::{BOLTZ, HBAR};
use rpmd::{PhysicsContext, Result, RpmdConfig, RpmdStepper, System};

/// An engine with no potential: zero forces, fixed box.
struct FreeContext {
    positions: Vec<Vector3<f64>>,
    velocities: Vec<Vector3<f64>>,
    forces: Vec<Vector3<f64>>,
    time: f64,
    step_count: u64,
}

impl FreeContext {
    fn new(num_particles: usize) -> Self {
        FreeContext {
            positions: vec![Vector3::zeros(); num_particles],
            velocities: vec![Vector3::zeros(); num_particles],
            forces: vec![Vector3::zeros(); num_particles],
            time: 0.0,
            step_count: 0,
        }
    }
}

impl PhysicsContext for FreeContext {
    fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }
    fn positions_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.positions
    }
    fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }
    fn velocities_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.velocities
    }
    fn forces(&self) -> &[Vector3<f64>] {
        &self.forces
    }
    fn compute_virtual_sites(&mut self) {}
    fn periodic_box_vectors(&self) -> [Vector3<f64>; 3] {
        [
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(0.0, 0.0, 2.0),
        ]
    }
    fn update_context_state(&mut self) -> Result<()> {
        Ok(())
    }
    fn calc_forces_and_energy(&mut self, _: bool, _: bool, _: u32) -> Result<f64> {
        for f in self.forces.iter_mut() {
            *f = Vector3::zeros();
        }
        Ok(0.0)
    }
    fn time(&self) -> f64 {
        self.time
    }
    fn set_time(&mut self, time: f64) {
        self.time = time;
    }
    fn step_count(&self) -> u64 {
        self.step_count
    }
    fn set_step_count(&mut self, count: u64) {
        self.step_count = count;
    }
}

fn ring_energy(stepper: &RpmdStepper, mass: f64, omega_n: f64) -> f64 {
    let num_copies = stepper.num_copies();
    let spring = 0.5 * mass * (0.5 * omega_n) * (0.5 * omega_n);
    let mut energy = 0.0;
    for copy in 0..num_copies {
        let next = (copy + 1) % num_copies;
        let dq = stepper.positions(copy)[0] - stepper.positions(next)[0];
        energy += 0.5 * mass * stepper.velocities(copy)[0].norm_squared();
        energy += spring * dq.norm_squared();
    }
    energy
}

fn main() {
    let num_copies = 8;
    let mass = 1.008; // hydrogen, where quantum effects matter most
    let temperature = 300.0;

    let config = RpmdConfig {
        step_size: 0.0001,
        temperature,
        friction: 0.0,
        num_copies,
        open_path: false,
        apply_thermostat: false,
        random_seed: 2024,
        integration_groups: u32::MAX,
        contractions: BTreeMap::new(),
    };
    let omega_n = 2.0 * num_copies as f64 * BOLTZ * temperature / HBAR;

    let system = System::new(vec![mass]);
    let mut stepper = RpmdStepper::new(&system, config).expect("valid configuration");
    let mut context = FreeContext::new(1);

    // Spread the beads around the centroid and give the centroid a push.
    for copy in 0..num_copies {
        let angle = 2.0 * std::f64::consts::PI * copy as f64 / num_copies as f64;
        stepper.set_positions(copy, &[Vector3::new(0.02 * angle.cos(), 0.02 * angle.sin(), 0.0)]);
        stepper.set_velocities(copy, &[Vector3::new(1.0, 0.0, 0.0)]);
    }

    let e0 = ring_energy(&stepper, mass, omega_n);
    println!("ring frequency scale: {omega_n:.2} 1/ps");
    println!("initial ring energy:  {e0:.8} kJ/mol");
    println!();
    println!("{:>8} {:>12} {:>14} {:>16}", "step", "time/ps", "centroid-x/nm", "energy drift");

    for step in 0..=5000 {
        if step % 500 == 0 {
            let centroid_x = (0..num_copies)
                .map(|c| stepper.positions(c)[0].x)
                .sum::<f64>()
                / num_copies as f64;
            let drift = (ring_energy(&stepper, mass, omega_n) - e0).abs() / e0;
            println!(
                "{:>8} {:>12.4} {:>14.6} {:>16.3e}",
                step,
                context.time(),
                centroid_x,
                drift
            );
        }
        if step < 5000 {
            stepper.execute(&mut context, false).expect("step succeeds");
        }
    }
}
