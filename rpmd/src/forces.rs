//! The replica force driver: stages each bead into the physics engine,
//! gathers forces for the uncontracted groups, then runs the contracted
//! passes.

use tracing::debug;

use crate::context::PhysicsContext;
use crate::error::{Result, RpmdError};
use crate::stepper::RpmdStepper;

impl RpmdStepper {
    pub(crate) fn compute_forces<C: PhysicsContext>(&mut self, context: &mut C) -> Result<()> {
        if self.config.open_path {
            self.compute_forces_open(context)
        } else {
            self.compute_forces_closed(context)
        }
    }

    /// Full-copy-count pass: one engine evaluation per bead, in bead-index
    /// order. The per-step context update (Monte Carlo moves and the like)
    /// runs exactly once per bead here, and its side effects on positions
    /// and velocities are written back into bead storage.
    fn evaluate_full_beads<C: PhysicsContext>(&mut self, context: &mut C) -> Result<()> {
        for copy in 0..self.config.num_copies {
            context.positions_mut().copy_from_slice(&self.positions[copy]);
            context.velocities_mut().copy_from_slice(&self.velocities[copy]);
            context.compute_virtual_sites();
            let initial_box = context.periodic_box_vectors();
            context.update_context_state()?;
            if context.periodic_box_vectors() != initial_box {
                return Err(RpmdError::BarostatMovedBox);
            }
            self.positions[copy].copy_from_slice(context.positions());
            self.velocities[copy].copy_from_slice(context.velocities());
            context.calc_forces_and_energy(true, false, self.groups_not_contracted)?;
            self.forces[copy].copy_from_slice(context.forces());
        }
        Ok(())
    }

    fn compute_forces_closed<C: PhysicsContext>(&mut self, context: &mut C) -> Result<()> {
        self.evaluate_full_beads(context)?;

        for contraction in &self.contractions {
            debug!(
                "contracted force pass: {} copies, group mask {:#x}",
                contraction.copies, contraction.group_mask
            );
            contraction
                .operator
                .contract_positions(&self.positions, &mut self.contracted_positions);

            for copy in 0..contraction.copies {
                context
                    .positions_mut()
                    .copy_from_slice(&self.contracted_positions[copy]);
                context.compute_virtual_sites();
                context.calc_forces_and_energy(true, false, contraction.group_mask)?;
                self.contracted_forces[copy].copy_from_slice(context.forces());
            }

            contraction
                .operator
                .extend_forces(&self.contracted_forces, &mut self.forces);
        }
        Ok(())
    }

    fn compute_forces_open<C: PhysicsContext>(&mut self, context: &mut C) -> Result<()> {
        self.evaluate_full_beads(context)?;

        // The endpoints carry half the potential in the symmetric
        // trapezoidal discretization of the open path.
        let last = self.config.num_copies - 1;
        for force in self.forces[0].iter_mut() {
            *force *= 0.5;
        }
        if last > 0 {
            for force in self.forces[last].iter_mut() {
                *force *= 0.5;
            }
        }
        Ok(())
    }
}
