//! Uniform 1-D beam mesh and its DOF numbering.
//!
//! Structural DOFs are numbered node by node, transverse displacement first:
//!
//! ```text
//! node   0      1      2    ...   n
//! dofs  0 1    2 3    4 5        2n 2n+1
//! ```
//!
//! Element `e` therefore touches `[2e, 2e+4)`. When a piezo layer exists,
//! one potential DOF per node is appended after every structural DOF
//! (`2(n+1) + node`).

use crate::error::{Result, SolverError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub index: usize,
    pub x: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamElement {
    pub index: usize,
    pub nodes: [usize; 2],
}

/// Equal-length elements chained end to end. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub nodes: Vec<Node>,
    pub elements: Vec<BeamElement>,
    pub element_length: f64,
}

impl Mesh {
    pub fn uniform(length: f64, num_elements: usize) -> Result<Self> {
        if num_elements == 0 {
            return Err(SolverError::config("mesh needs at least one element"));
        }
        let element_length = length / num_elements as f64;
        if !element_length.is_finite() || element_length <= 0.0 {
            return Err(SolverError::config(format!(
                "element length must be positive, got {element_length}"
            )));
        }

        let nodes = (0..=num_elements)
            .map(|index| Node {
                index,
                x: index as f64 * element_length,
            })
            .collect();
        let elements = (0..num_elements)
            .map(|index| BeamElement {
                index,
                nodes: [index, index + 1],
            })
            .collect();

        Ok(Self {
            nodes,
            elements,
            element_length,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }
}

/// What a global DOF represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DofKind {
    Transverse,
    Rotation,
    Potential,
}

/// Element-to-global DOF table, built once from the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct DofMap {
    num_nodes: usize,
    with_potential: bool,
    structural: Vec<[usize; 4]>,
    potential: Vec<[usize; 2]>,
}

impl DofMap {
    pub fn new(mesh: &Mesh, with_potential: bool) -> Self {
        let num_nodes = mesh.num_nodes();
        let structural = mesh
            .elements
            .iter()
            .map(|e| {
                let [a, b] = e.nodes;
                [2 * a, 2 * a + 1, 2 * b, 2 * b + 1]
            })
            .collect();
        let potential = if with_potential {
            mesh.elements
                .iter()
                .map(|e| {
                    let [a, b] = e.nodes;
                    [2 * num_nodes + a, 2 * num_nodes + b]
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            num_nodes,
            with_potential,
            structural,
            potential,
        }
    }

    pub fn structural_dofs(&self, element: usize) -> [usize; 4] {
        self.structural[element]
    }

    pub fn potential_dofs(&self, element: usize) -> Option<[usize; 2]> {
        self.potential.get(element).copied()
    }

    pub fn node_potential(&self, node: usize) -> Option<usize> {
        (self.with_potential && node < self.num_nodes).then_some(2 * self.num_nodes + node)
    }

    pub fn num_structural(&self) -> usize {
        2 * self.num_nodes
    }

    pub fn dofs_per_node(&self) -> usize {
        if self.with_potential { 3 } else { 2 }
    }

    pub fn total(&self) -> usize {
        self.num_nodes * self.dofs_per_node()
    }

    pub fn has_potential(&self) -> bool {
        self.with_potential
    }

    pub fn kind(&self, dof: usize) -> DofKind {
        if dof >= self.num_structural() {
            DofKind::Potential
        } else if dof % 2 == 0 {
            DofKind::Transverse
        } else {
            DofKind::Rotation
        }
    }
}
