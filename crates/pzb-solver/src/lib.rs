//! Transient finite element solver for Euler-Bernoulli beams with bonded
//! piezoelectric patches.
//!
//! The beam is meshed into equal 2-node elements with transverse
//! displacement and rotation per node, plus one electric potential per node
//! when a piezo layer is present. Mass, stiffness and Rayleigh damping are
//! assembled once, reduced to the free DOFs, and integrated with the
//! incremental Newmark scheme across a sweep of harmonic forcing frequencies.

pub mod analysis;
pub mod assembly;
pub mod backend;
pub mod boundary_conditions;
pub mod dynamic_solver;
pub mod elements;
pub mod error;
pub mod materials;
pub mod mesh;
pub mod modal_solver;
pub mod sweep;

pub use analysis::{AnalysisConfig, AnalysisPipeline};
pub use assembly::{GlobalSystem, RayleighDamping};
pub use backend::{
    BackendKind, GaussianElimination, LinearSolver, NativeLu, default_backend,
    generalized_eigenvalues,
};
pub use boundary_conditions::{BoundaryFlags, ReducedSystem};
pub use dynamic_solver::{NewmarkCoefficients, NewmarkConfig, NewmarkIntegrator, State, time_step};
pub use elements::{Element, EulerBernoulliBeam, PiezoPatch};
pub use error::{Result, SolverError};
pub use materials::{ElementProperties, PiezoProperties, SectionProperties, element_properties};
pub use mesh::{BeamElement, DofKind, DofMap, Mesh, Node};
pub use modal_solver::{ModalResults, ModalSolver};
pub use sweep::{
    ExecutionMode, FailurePolicy, FrequencyResult, FrequencySweep, SweepConfig, SweepSummary,
};
