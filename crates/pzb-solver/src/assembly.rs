//! Global matrix assembly.
//!
//! ## Assembly Process
//!
//! 1. Allocate dense `N×N` mass and stiffness matrices
//! 2. Loop over all elements:
//!    - beam (and piezo layer) 4×4 blocks into `[2e, 2e+4)`
//!    - coupling θ into the structural × potential blocks, and θᵀ back
//!    - `-C_p` into the potential block
//! 3. Form proportional damping `C = β_M·M + β_K·K`
//! 4. Build the reference load pattern (nodal forces, then nodal charges)

use nalgebra::{DMatrix, DVector};
use pzb_model::BeamModel;
use serde::{Deserialize, Serialize};

use crate::elements::{Element, EulerBernoulliBeam, PiezoPatch};
use crate::error::{Result, SolverError};
use crate::materials::{ElementProperties, element_properties};
use crate::mesh::{DofMap, Mesh};

/// Rayleigh damping coefficients, `C = mass·M + stiffness·K`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayleighDamping {
    pub mass: f64,
    pub stiffness: f64,
}

impl Default for RayleighDamping {
    fn default() -> Self {
        Self {
            mass: 5e-4,
            stiffness: 5e-4,
        }
    }
}

impl RayleighDamping {
    pub fn undamped() -> Self {
        Self {
            mass: 0.0,
            stiffness: 0.0,
        }
    }

    pub fn matrix(&self, mass: &DMatrix<f64>, stiffness: &DMatrix<f64>) -> DMatrix<f64> {
        mass * self.mass + stiffness * self.stiffness
    }
}

/// Full-size assembled system. Read-only once built.
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    pub mass: DMatrix<f64>,
    pub stiffness: DMatrix<f64>,
    pub damping: DMatrix<f64>,
    /// Load amplitudes, scaled by `sin(ωt)` during integration.
    pub force: DVector<f64>,
    pub num_dofs: usize,
    pub dof_map: DofMap,
}

impl GlobalSystem {
    /// Builds mesh, DOF table and matrices for `model`.
    pub fn from_model(model: &BeamModel) -> Result<Self> {
        model.validate()?;
        let mesh = Mesh::uniform(model.geometry.length, model.num_elements)?;
        let dof_map = DofMap::new(&mesh, model.has_piezo());
        let properties = element_properties(model);
        let damping = RayleighDamping {
            mass: model.damping.mass_coefficient,
            stiffness: model.damping.stiffness_coefficient,
        };

        let mut system = Self::assemble(&mesh, dof_map, &properties, damping)?;
        system.force = load_pattern(model, &system.dof_map)?;
        Ok(system)
    }

    /// Scatter-adds every element into the global matrices.
    pub fn assemble(
        mesh: &Mesh,
        dof_map: DofMap,
        properties: &[ElementProperties],
        damping: RayleighDamping,
    ) -> Result<Self> {
        if properties.len() != mesh.num_elements() {
            return Err(SolverError::config(format!(
                "{} element property sets for {} elements",
                properties.len(),
                mesh.num_elements()
            )));
        }

        let n = dof_map.total();
        let mut mass = DMatrix::zeros(n, n);
        let mut stiffness = DMatrix::zeros(n, n);

        for element in &mesh.elements {
            let props = &properties[element.index];
            let dofs = dof_map.structural_dofs(element.index);

            let beam = EulerBernoulliBeam::new(mesh.element_length, props.structure)?;
            scatter4(&mut stiffness, &dofs, &beam.stiffness_matrix());
            scatter4(&mut mass, &dofs, &beam.mass_matrix());

            let Some(piezo) = props.piezo else {
                continue;
            };
            let potentials = dof_map.potential_dofs(element.index).ok_or_else(|| {
                SolverError::config(format!(
                    "element {} carries a piezo layer but the DOF map has no potentials",
                    element.index + 1
                ))
            })?;

            let patch = PiezoPatch::new(mesh.element_length, piezo)?;
            scatter4(&mut stiffness, &dofs, &patch.stiffness_matrix());
            scatter4(&mut mass, &dofs, &patch.mass_matrix());

            let theta = patch.coupling_matrix();
            for (i, &gi) in dofs.iter().enumerate() {
                for (j, &gj) in potentials.iter().enumerate() {
                    stiffness[(gi, gj)] += theta[(i, j)];
                    stiffness[(gj, gi)] += theta[(i, j)];
                }
            }

            let cp = patch.capacitance_matrix();
            for (i, &gi) in potentials.iter().enumerate() {
                for (j, &gj) in potentials.iter().enumerate() {
                    stiffness[(gi, gj)] -= cp[(i, j)];
                }
            }
        }

        let damping_matrix = damping.matrix(&mass, &stiffness);
        log::debug!(
            "assembled {} elements into {n}×{n} system (potential DOFs: {})",
            mesh.num_elements(),
            dof_map.has_potential()
        );

        Ok(Self {
            mass,
            stiffness,
            damping: damping_matrix,
            force: DVector::zeros(n),
            num_dofs: n,
            dof_map,
        })
    }

    /// Largest absolute asymmetry over M, K and C.
    pub fn max_asymmetry(&self) -> f64 {
        [&self.mass, &self.stiffness, &self.damping]
            .iter()
            .map(|m| (*m - m.transpose()).amax())
            .fold(0.0, f64::max)
    }
}

fn scatter4(global: &mut DMatrix<f64>, dofs: &[usize; 4], local: &nalgebra::Matrix4<f64>) {
    for (i, &gi) in dofs.iter().enumerate() {
        for (j, &gj) in dofs.iter().enumerate() {
            global[(gi, gj)] += local[(i, j)];
        }
    }
}

/// Nodal forces followed by nodal charges (zero when not given).
fn load_pattern(model: &BeamModel, dof_map: &DofMap) -> Result<DVector<f64>> {
    let mut force = DVector::zeros(dof_map.total());
    if model.force.len() != dof_map.num_structural() {
        return Err(SolverError::config(format!(
            "{} force amplitudes for {} structural DOFs",
            model.force.len(),
            dof_map.num_structural()
        )));
    }
    for (i, f) in model.force.iter().enumerate() {
        force[i] = *f;
    }
    for (node, q) in model.charge.iter().enumerate() {
        let dof = dof_map.node_potential(node).ok_or_else(|| {
            SolverError::config(format!("charge given for node {} without potential DOF", node + 1))
        })?;
        force[dof] = *q;
    }
    Ok(force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pzb_model::{BeamGeometry, ElementMaterial, PiezoLayer};

    fn unit_model(n: usize) -> BeamModel {
        let mut geometry = BeamGeometry::rectangular(1.0, 1.0, 1.0);
        geometry.inertia = Some(1.0);
        BeamModel::uniform(
            n,
            geometry,
            ElementMaterial {
                young_modulus: 1.0,
                density: 1.0,
            },
        )
    }

    fn piezo_model() -> BeamModel {
        let mut model = unit_model(2);
        model.piezo = Some(PiezoLayer {
            layers: 1,
            width: 0.5,
            thickness: 0.1,
            e31: -2.0,
            k33: 0.3,
            density: 2.0,
            elastic_moduli: vec![3.0, 3.0],
            active: vec![true, false],
        });
        model.potential_free = vec![true; 3];
        model.charge = vec![0.0, 0.0, 1.0e-3];
        model
    }

    #[test]
    fn single_element_is_symmetric_and_singular() {
        let system = GlobalSystem::from_model(&unit_model(1)).unwrap();
        assert_eq!(system.num_dofs, 4);
        assert!(system.max_asymmetry() < 1e-14);

        let det = system.stiffness.determinant();
        assert!(det.abs() < 1e-9, "unconstrained stiffness should be singular, det={det}");
    }

    #[test]
    fn overlapping_dofs_accumulate() {
        let system = GlobalSystem::from_model(&unit_model(2)).unwrap();
        // l = 0.5, EI/l³ = 8: shared node gets 12·8 from both elements.
        assert_relative_eq!(system.stiffness[(2, 2)], 2.0 * 12.0 * 8.0, max_relative = 1e-14);
        assert_relative_eq!(system.stiffness[(0, 0)], 12.0 * 8.0, max_relative = 1e-14);
        assert_eq!(system.stiffness[(0, 4)], 0.0);
    }

    #[test]
    fn translational_mass_sums_to_beam_mass() {
        let system = GlobalSystem::from_model(&unit_model(3)).unwrap();
        let mut translation = DVector::zeros(system.num_dofs);
        for i in (0..system.num_dofs).step_by(2) {
            translation[i] = 1.0;
        }
        let total = translation.dot(&(&system.mass * &translation));
        assert_relative_eq!(total, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn damping_is_rayleigh_combination() {
        let system = GlobalSystem::from_model(&unit_model(2)).unwrap();
        let expected = &system.mass * 5e-4 + &system.stiffness * 5e-4;
        assert_relative_eq!(system.damping, expected, epsilon = 1e-15);
    }

    #[test]
    fn piezo_blocks_land_in_potential_rows() {
        let model = piezo_model();
        let system = GlobalSystem::from_model(&model).unwrap();
        assert_eq!(system.num_dofs, 9);
        assert!(system.max_asymmetry() < 1e-14);

        // Potential block carries no mass.
        for i in 6..9 {
            for j in 0..9 {
                assert_eq!(system.mass[(i, j)], 0.0);
            }
        }
        // Only element 1 is active, so node 3 potential is untouched.
        assert_eq!(system.stiffness[(8, 8)], 0.0);
        assert!(system.stiffness[(6, 6)] < 0.0);
        assert!(system.stiffness[(1, 6)] != 0.0);
        assert_eq!(system.stiffness[(4, 6)], 0.0);
        assert_eq!(system.force[8], 1.0e-3);
    }
}
