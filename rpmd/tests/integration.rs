//! End-to-end tests of the stepper driven through a mock physics engine.

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use nalgebra::Vector3;

use rpmd::constants::{BOLTZ, HBAR};
use rpmd::{PhysicsContext, Result, RpmdConfig, RpmdError, RpmdStepper, System};

/// Minimal engine: applies a constant force to every particle, keeps a
/// fixed periodic box, and records every force-evaluation group mask.
struct MockContext {
    positions: Vec<Vector3<f64>>,
    velocities: Vec<Vector3<f64>>,
    forces: Vec<Vector3<f64>>,
    box_vectors: [Vector3<f64>; 3],
    time: f64,
    step_count: u64,
    constant_force: Vector3<f64>,
    evaluations: Vec<u32>,
    barostat_misbehaves: bool,
}

impl MockContext {
    fn new(num_particles: usize) -> Self {
        MockContext {
            positions: vec![Vector3::zeros(); num_particles],
            velocities: vec![Vector3::zeros(); num_particles],
            forces: vec![Vector3::zeros(); num_particles],
            box_vectors: [
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
                Vector3::new(0.0, 0.0, 2.0),
            ],
            time: 0.0,
            step_count: 0,
            constant_force: Vector3::zeros(),
            evaluations: Vec::new(),
            barostat_misbehaves: false,
        }
    }

    fn with_constant_force(num_particles: usize, force: Vector3<f64>) -> Self {
        let mut context = Self::new(num_particles);
        context.constant_force = force;
        context
    }
}

impl PhysicsContext for MockContext {
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
        self.box_vectors
    }

    fn update_context_state(&mut self) -> Result<()> {
        if self.barostat_misbehaves {
            self.box_vectors[0].x += 0.01;
        }
        Ok(())
    }

    fn calc_forces_and_energy(
        &mut self,
        _compute_forces: bool,
        _compute_energy: bool,
        group_mask: u32,
    ) -> Result<f64> {
        self.evaluations.push(group_mask);
        for f in self.forces.iter_mut() {
            *f = self.constant_force;
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

fn config(num_copies: usize) -> RpmdConfig {
    RpmdConfig {
        step_size: 0.001,
        temperature: 300.0,
        friction: 1.0,
        num_copies,
        open_path: false,
        apply_thermostat: false,
        random_seed: 42,
        integration_groups: u32::MAX,
        contractions: BTreeMap::new(),
    }
}

#[test]
fn test_single_bead_linear_drift() {
    // One bead, one particle of 1 amu, no forces, no thermostat: the
    // centroid drifts linearly, 1000 steps of 1 fs at 1 nm/ps cover 1 nm.
    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, config(1)).unwrap();
    let mut context = MockContext::new(1);

    stepper.set_velocities(0, &[Vector3::new(1.0, 0.0, 0.0)]);
    for _ in 0..1000 {
        stepper.execute(&mut context, false).unwrap();
    }

    let q = stepper.positions(0)[0];
    assert_relative_eq!(q.x, 1.0, epsilon = 1e-9);
    assert_relative_eq!(q.y, 0.0, epsilon = 1e-12);
    assert_relative_eq!(q.z, 0.0, epsilon = 1e-12);
    assert_relative_eq!(context.time(), 1.0, epsilon = 1e-9);
    assert_eq!(context.step_count(), 1000);
}

#[test]
fn test_two_bead_ring_oscillation() {
    // Two beads at (+-0.1, 0, 0) with zero velocity excite only mode 1,
    // whose frequency is the full ring scale w_n. After one period the
    // ring returns to its starting configuration; after half a period the
    // beads have swapped signs.
    let temperature = 300.0;
    let num_copies = 2;
    let omega_n = 2.0 * num_copies as f64 * BOLTZ * temperature / HBAR;
    let period = 2.0 * std::f64::consts::PI / omega_n;
    let steps = 1000;

    let mut cfg = config(num_copies);
    cfg.step_size = period / steps as f64;
    cfg.temperature = temperature;

    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    let mut context = MockContext::new(1);

    stepper.set_positions(0, &[Vector3::new(0.1, 0.0, 0.0)]);
    stepper.set_positions(1, &[Vector3::new(-0.1, 0.0, 0.0)]);

    for _ in 0..steps / 2 {
        stepper.execute(&mut context, false).unwrap();
    }
    assert_relative_eq!(stepper.positions(0)[0].x, -0.1, epsilon = 1e-9);
    assert_relative_eq!(stepper.positions(1)[0].x, 0.1, epsilon = 1e-9);

    for _ in 0..steps / 2 {
        stepper.execute(&mut context, false).unwrap();
    }
    assert_relative_eq!(stepper.positions(0)[0].x, 0.1, epsilon = 1e-9);
    assert_relative_eq!(stepper.positions(1)[0].x, -0.1, epsilon = 1e-9);
}

#[test]
fn test_virtual_sites_are_left_alone() {
    // A zero-mass particle is never kicked, drifted, or thermostatted.
    let system = System::new(vec![1.0, 0.0]);
    let mut cfg = config(4);
    cfg.apply_thermostat = true;
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    let mut context = MockContext::with_constant_force(2, Vector3::new(1.0, 0.0, 0.0));

    let site = Vector3::new(0.25, 0.25, 0.25);
    for copy in 0..4 {
        stepper.set_positions(copy, &[Vector3::zeros(), site]);
    }
    for _ in 0..10 {
        stepper.execute(&mut context, false).unwrap();
    }
    for copy in 0..4 {
        assert_eq!(stepper.positions(copy)[1], site);
        assert_eq!(stepper.velocities(copy)[1], Vector3::zeros());
        // The massive particle moved.
        assert!(stepper.velocities(copy)[0].norm() > 0.0);
    }
}

fn centroid_velocity(stepper: &RpmdStepper, particle: usize) -> Vector3<f64> {
    let mut sum = Vector3::zeros();
    for copy in 0..stepper.num_copies() {
        sum += stepper.velocities(copy)[particle];
    }
    sum / stepper.num_copies() as f64
}

#[test]
fn test_thermostat_equilibration_short() {
    // Starting from rest, the centroid velocity variance relaxes toward
    // kB T / m. The run is short, so the tolerance is statistical.
    let mass = 18.0;
    let temperature = 300.0;
    let mut cfg = config(4);
    cfg.apply_thermostat = true;
    cfg.friction = 2.0;
    cfg.step_size = 0.0005;
    cfg.temperature = temperature;

    let system = System::new(vec![mass]);
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    let mut context = MockContext::new(1);

    // Equilibrate, then accumulate.
    for _ in 0..20_000 {
        stepper.execute(&mut context, false).unwrap();
    }
    let mut sum_sq = 0.0;
    let mut sum = Vector3::zeros();
    let samples = 200_000;
    for _ in 0..samples {
        stepper.execute(&mut context, false).unwrap();
        let c = centroid_velocity(&stepper, 0);
        sum_sq += c.norm_squared();
        sum += c;
    }
    let mean_sq = sum_sq / (3.0 * samples as f64);
    let expected = BOLTZ * temperature / mass;
    assert_relative_eq!(mean_sq, expected, max_relative = 0.25);
    // The mean stays small against the thermal velocity scale.
    assert!((sum / samples as f64).norm() < 0.5 * expected.sqrt());
}

#[test]
#[ignore] // Slow statistical test; run with --ignored for the tight check.
fn test_thermostat_equilibration_long() {
    let mass = 18.0;
    let temperature = 300.0;
    let mut cfg = config(4);
    cfg.apply_thermostat = true;
    cfg.friction = 1.0;
    cfg.step_size = 0.0005;
    cfg.temperature = temperature;

    let system = System::new(vec![mass]);
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    let mut context = MockContext::new(1);

    for _ in 0..50_000 {
        stepper.execute(&mut context, false).unwrap();
    }
    let mut sum_sq = 0.0;
    let samples = 1_000_000;
    for _ in 0..samples {
        stepper.execute(&mut context, false).unwrap();
        sum_sq += centroid_velocity(&stepper, 0).norm_squared();
    }
    let mean_sq = sum_sq / (3.0 * samples as f64);
    let expected = BOLTZ * temperature / mass;
    assert_relative_eq!(mean_sq, expected, max_relative = 0.10);
}

#[test]
fn test_bead_velocity_variance_is_scaled_by_copies() {
    // Individual bead velocities equilibrate at P kB T / m, not kB T / m.
    let mass = 1.0;
    let temperature = 300.0;
    let num_copies = 2;
    let mut cfg = config(num_copies);
    cfg.apply_thermostat = true;
    cfg.friction = 10.0;
    cfg.step_size = 0.001;

    let system = System::new(vec![mass]);
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    let mut context = MockContext::new(1);

    for _ in 0..10_000 {
        stepper.execute(&mut context, false).unwrap();
    }
    let mut sum_sq = 0.0;
    let samples = 100_000;
    for _ in 0..samples {
        stepper.execute(&mut context, false).unwrap();
        for copy in 0..num_copies {
            sum_sq += stepper.velocities(copy)[0].norm_squared();
        }
    }
    let mean_sq = sum_sq / (3.0 * (samples * num_copies) as f64);
    let expected = num_copies as f64 * BOLTZ * temperature / mass;
    assert_relative_eq!(mean_sq, expected, max_relative = 0.15);
}

#[test]
fn test_open_path_rejects_contractions() {
    let mut cfg = config(6);
    cfg.open_path = true;
    cfg.contractions.insert(1, 3);

    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    let mut context = MockContext::new(1);

    stepper.set_positions(0, &[Vector3::new(0.5, 0.0, 0.0)]);
    let before: Vec<_> = (0..6).map(|c| stepper.positions(c).to_vec()).collect();

    let err = stepper.execute(&mut context, false).unwrap_err();
    assert!(matches!(err, RpmdError::OpenPathContraction));

    // The refusal happens before any state is touched.
    for (copy, old) in before.iter().enumerate() {
        assert_eq!(stepper.positions(copy), old.as_slice());
    }
    assert_eq!(context.evaluations.len(), 0);
    assert_eq!(context.step_count(), 0);
}

#[test]
fn test_contracted_groups_are_evaluated_on_fewer_beads() {
    // Groups {0, 1} active, group 1 contracted onto 4 beads: each force
    // pass does 8 full evaluations with mask 0b01 and 4 contracted ones
    // with mask 0b10.
    let mut cfg = config(8);
    cfg.integration_groups = 0b11;
    cfg.contractions.insert(1, 4);

    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    assert_eq!(stepper.groups_not_contracted(), 0b01);

    let mut context = MockContext::new(1);
    stepper.execute(&mut context, false).unwrap();

    // Two force passes per step (leading pass and post-drift pass).
    let expected_pass: Vec<u32> = std::iter::repeat(0b01)
        .take(8)
        .chain(std::iter::repeat(0b10).take(4))
        .collect();
    let expected: Vec<u32> = expected_pass
        .iter()
        .chain(expected_pass.iter())
        .copied()
        .collect();
    assert_eq!(context.evaluations, expected);
}

#[test]
fn test_barostat_guard_fails_on_first_bead() {
    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, config(4)).unwrap();
    let mut context = MockContext::new(1);
    context.barostat_misbehaves = true;

    let err = stepper.execute(&mut context, false).unwrap_err();
    assert!(matches!(err, RpmdError::BarostatMovedBox));
    // No force evaluation happened: the box check precedes it.
    assert_eq!(context.evaluations.len(), 0);
}

#[test]
fn test_identical_seeds_give_identical_trajectories() {
    let run = |seed: u64| {
        let mut cfg = config(4);
        cfg.apply_thermostat = true;
        cfg.random_seed = seed;
        let system = System::new(vec![18.0, 1.008]);
        let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
        let mut context = MockContext::with_constant_force(2, Vector3::new(0.3, -0.1, 0.0));
        for copy in 0..4 {
            stepper.set_positions(
                copy,
                &[Vector3::new(0.1, 0.0, 0.0), Vector3::new(-0.1, 0.0, 0.0)],
            );
        }
        for _ in 0..50 {
            stepper.execute(&mut context, false).unwrap();
        }
        (0..4)
            .map(|c| stepper.positions(c).to_vec())
            .collect::<Vec<_>>()
    };

    let a = run(7);
    let b = run(7);
    let c = run(8);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_open_path_endpoint_forces_are_halved() {
    let mut cfg = config(3);
    cfg.open_path = true;

    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    let mut context = MockContext::with_constant_force(1, Vector3::new(1.0, 0.0, 0.0));

    stepper.execute(&mut context, false).unwrap();

    assert_relative_eq!(stepper.forces(0)[0].x, 0.5, epsilon = 1e-15);
    assert_relative_eq!(stepper.forces(1)[0].x, 1.0, epsilon = 1e-15);
    assert_relative_eq!(stepper.forces(2)[0].x, 0.5, epsilon = 1e-15);
}

#[test]
fn test_open_chain_oscillation_frequency() {
    // Two open-chain beads excite chain mode 1 at w_n sin(pi/4) with
    // w_n built from P - 1 links.
    let temperature = 300.0;
    let num_copies = 2;
    let omega_n = 2.0 * (num_copies as f64 - 1.0) * BOLTZ * temperature / HBAR;
    let omega_1 = omega_n * (std::f64::consts::PI / 4.0).sin();
    let period = 2.0 * std::f64::consts::PI / omega_1;
    let steps = 1000;

    let mut cfg = config(num_copies);
    cfg.open_path = true;
    cfg.step_size = period / steps as f64;

    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, cfg).unwrap();
    let mut context = MockContext::new(1);

    stepper.set_positions(0, &[Vector3::new(0.1, 0.0, 0.0)]);
    stepper.set_positions(1, &[Vector3::new(-0.1, 0.0, 0.0)]);

    for _ in 0..steps {
        stepper.execute(&mut context, false).unwrap();
    }
    assert_relative_eq!(stepper.positions(0)[0].x, 0.1, epsilon = 1e-9);
    assert_relative_eq!(stepper.positions(1)[0].x, -0.1, epsilon = 1e-9);
}

#[test]
fn test_forces_are_valid_skips_leading_evaluation() {
    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, config(2)).unwrap();
    let mut context = MockContext::new(1);

    stepper.execute(&mut context, true).unwrap();
    // Only the post-drift pass ran: 2 evaluations instead of 4.
    assert_eq!(context.evaluations.len(), 2);
}

#[test]
fn test_kinetic_energy_of_staged_bead() {
    let system = System::new(vec![2.0, 0.0, 3.0]);
    let mut stepper = RpmdStepper::new(&system, config(2)).unwrap();
    let mut context = MockContext::new(3);

    stepper.set_velocities(
        1,
        &[
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(9.0, 9.0, 9.0), // virtual site, ignored
            Vector3::new(0.0, 2.0, 0.0),
        ],
    );
    stepper.copy_to_context(1, &mut context);

    // 0.5 * (2 * 1 + 3 * 4) = 7
    assert_relative_eq!(stepper.compute_kinetic_energy(&context), 7.0, epsilon = 1e-12);
}

#[test]
fn test_copy_round_trip_through_context() {
    let system = System::new(vec![1.0]);
    let mut stepper = RpmdStepper::new(&system, config(2)).unwrap();
    let mut context = MockContext::new(1);

    stepper.set_positions(0, &[Vector3::new(0.4, 0.5, 0.6)]);
    stepper.copy_to_context(0, &mut context);
    stepper.copy_from_context(1, &context);
    assert_eq!(stepper.positions(1)[0], Vector3::new(0.4, 0.5, 0.6));
}
