//! Boundary flags and projection onto the free DOFs.
//!
//! Each global DOF is either free or fixed (zero). The reduced system keeps
//! the free rows/columns in their original relative order:
//!
//! ```text
//! M_r[a][b] = M[free[a]][free[b]]      (likewise K, C)
//! F_r[a]    = F[free[a]]
//! ```

use nalgebra::{DMatrix, DVector};
use pzb_model::BeamModel;

use crate::assembly::GlobalSystem;
use crate::error::{Result, SolverError};
use crate::mesh::{DofKind, DofMap};

/// Free/fixed flag per global DOF, `true` = free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryFlags {
    free: Vec<bool>,
    expected_free: Option<usize>,
}

impl BoundaryFlags {
    pub fn new(free: Vec<bool>) -> Self {
        Self {
            free,
            expected_free: None,
        }
    }

    /// Declares how many DOFs the caller expects to be free.
    pub fn with_expected_free(mut self, expected: Option<usize>) -> Self {
        self.expected_free = expected;
        self
    }

    /// Structural flags from the model followed by potential flags.
    ///
    /// Potentials of nodes that touch no active piezo element are fixed
    /// regardless of the model, since their rows would be empty.
    pub fn from_model(model: &BeamModel, dof_map: &DofMap) -> Self {
        let mut free = model.structural_free.clone();
        if let Some(piezo) = &model.piezo {
            for node in 0..model.num_nodes() {
                let touches_patch = (node > 0 && piezo.is_active(node - 1))
                    || (node < model.num_elements && piezo.is_active(node));
                let declared = model.potential_free.get(node).copied().unwrap_or(true);
                free.push(declared && touches_patch);
            }
        }
        debug_assert!(free.len() == dof_map.total());
        Self {
            free,
            expected_free: model.expected_free,
        }
    }

    pub fn is_free(&self, dof: usize) -> bool {
        self.free.get(dof).copied().unwrap_or(false)
    }

    pub fn num_free(&self) -> usize {
        self.free.iter().filter(|f| **f).count()
    }

    /// Global indices of the free DOFs, ascending.
    pub fn free_dofs(&self) -> Vec<usize> {
        self.free
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.then_some(i))
            .collect()
    }

    /// Position of a global DOF in the reduced system, `None` when fixed.
    pub fn reduced_index(&self, dof: usize) -> Option<usize> {
        if !self.is_free(dof) {
            return None;
        }
        Some(self.free[..dof].iter().filter(|f| **f).count())
    }

    /// Single compaction pass over M, K, C and F.
    pub fn reduce(&self, system: &GlobalSystem) -> Result<ReducedSystem> {
        let n = system.num_dofs;
        if self.free.len() != n {
            return Err(SolverError::config(format!(
                "{} boundary flags for {n} DOFs",
                self.free.len()
            )));
        }
        let free = self.free_dofs();
        if free.is_empty() {
            return Err(SolverError::config("every DOF is fixed"));
        }
        if let Some(expected) = self.expected_free
            && expected != free.len()
        {
            return Err(SolverError::config(format!(
                "declared {expected} free DOFs but the flags leave {}",
                free.len()
            )));
        }

        let n2 = free.len();
        let mut mass = DMatrix::zeros(n2, n2);
        let mut stiffness = DMatrix::zeros(n2, n2);
        let mut damping = DMatrix::zeros(n2, n2);
        let mut force = DVector::zeros(n2);

        for (a, &ga) in free.iter().enumerate() {
            force[a] = system.force[ga];
            for (b, &gb) in free.iter().enumerate() {
                mass[(a, b)] = system.mass[(ga, gb)];
                stiffness[(a, b)] = system.stiffness[(ga, gb)];
                damping[(a, b)] = system.damping[(ga, gb)];
            }
        }

        let kinds = free.iter().map(|&g| system.dof_map.kind(g)).collect();
        log::debug!("reduced {n} DOFs to {n2} free DOFs");

        Ok(ReducedSystem {
            mass,
            stiffness,
            damping,
            force,
            free_dofs: free,
            kinds,
            num_full: n,
        })
    }
}

/// The linear system restricted to the free DOFs.
#[derive(Debug, Clone)]
pub struct ReducedSystem {
    pub mass: DMatrix<f64>,
    pub stiffness: DMatrix<f64>,
    pub damping: DMatrix<f64>,
    /// Load amplitudes on the free DOFs.
    pub force: DVector<f64>,
    /// Global index of each reduced DOF.
    pub free_dofs: Vec<usize>,
    pub kinds: Vec<DofKind>,
    pub num_full: usize,
}

impl ReducedSystem {
    /// Wraps already-reduced structural matrices, every DOF free.
    pub fn from_matrices(
        mass: DMatrix<f64>,
        stiffness: DMatrix<f64>,
        damping: DMatrix<f64>,
        force: DVector<f64>,
    ) -> Result<Self> {
        let n = mass.nrows();
        let square = |m: &DMatrix<f64>| m.nrows() == n && m.ncols() == n;
        if !(square(&mass) && square(&stiffness) && square(&damping)) || force.len() != n {
            return Err(SolverError::config("reduced matrices must share one square size"));
        }
        Ok(Self {
            mass,
            stiffness,
            damping,
            force,
            free_dofs: (0..n).collect(),
            kinds: (0..n)
                .map(|i| if i % 2 == 0 { DofKind::Transverse } else { DofKind::Rotation })
                .collect(),
            num_full: n,
        })
    }

    pub fn size(&self) -> usize {
        self.free_dofs.len()
    }

    /// Load vector at time `t` for forcing frequency `omega`.
    pub fn force_at(&self, omega: f64, t: f64) -> DVector<f64> {
        &self.force * (omega * t).sin()
    }

    /// Scatters a reduced vector back to full size, fixed DOFs at zero.
    pub fn expand(&self, reduced: &DVector<f64>) -> DVector<f64> {
        let mut full = DVector::zeros(self.num_full);
        for (a, &g) in self.free_dofs.iter().enumerate() {
            full[g] = reduced[a];
        }
        full
    }

    pub fn reduced_index(&self, global: usize) -> Option<usize> {
        self.free_dofs.binary_search(&global).ok()
    }

    pub fn potential_count(&self) -> usize {
        self.kinds
            .iter()
            .filter(|k| **k == DofKind::Potential)
            .count()
    }
}
