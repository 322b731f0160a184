// PILE-L thermostat equilibration of a free ring polymer.
//
// Four beads of a water-mass particle start at rest. The thermostat pumps
// the centroid mode up to kB T / m and every internal mode to its own
// stationary variance; the demo prints the effective centroid temperature
// converging toward the 300 K target.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use rpmd::constants::BOLTZ;
use rpmd::{PhysicsContext, Result, RpmdConfig, RpmdStepper, System};

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

fn main() {
    let mass = 18.0;
    let temperature = 300.0;
    let num_copies = 4;

    let config = RpmdConfig {
        step_size: 0.0005,
        temperature,
        friction: 1.0,
        num_copies,
        open_path: false,
        apply_thermostat: true,
        random_seed: 7,
        integration_groups: u32::MAX,
        contractions: BTreeMap::new(),
    };

    let system = System::new(vec![mass]);
    let mut stepper = RpmdStepper::new(&system, config).expect("valid configuration");
    let mut context = FreeContext::new(1);

    println!("target temperature: {temperature} K");
    println!();
    println!("{:>9} {:>10} {:>20}", "step", "time/ps", "centroid temp/K");

    let mut sum_sq = 0.0;
    let mut samples = 0u64;
    for step in 1..=400_000u64 {
        stepper.execute(&mut context, false).expect("step succeeds");

        let mut centroid = Vector3::zeros();
        for copy in 0..num_copies {
            centroid += stepper.velocities(copy)[0];
        }
        centroid /= num_copies as f64;
        sum_sq += centroid.norm_squared();
        samples += 1;

        if step % 50_000 == 0 {
            // T_eff = m <v^2> / (3 kB), averaged since the last printout
            let t_eff = mass * sum_sq / (3.0 * samples as f64 * BOLTZ);
            println!("{:>9} {:>10.1} {:>20.1}", step, context.time(), t_eff);
            sum_sq = 0.0;
            samples = 0;
        }
    }
}
