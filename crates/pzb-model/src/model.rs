//! Typed description of a beam run: geometry, materials, piezo layer,
//! loading, constraints and the time/sweep controls.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Largest number of frequencies a sweep may evaluate.
pub const MAX_SWEEP_FREQUENCIES: usize = 100_000;

/// Cross-section of the host beam, constant along its length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SectionShape {
    Rectangular { width: f64, height: f64 },
    /// Solid bar without a wall thickness, tube otherwise.
    Circular {
        diameter: f64,
        wall_thickness: Option<f64>,
    },
}

/// Overall beam geometry. The beam is split into equal-length elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamGeometry {
    pub length: f64,
    pub section: SectionShape,
    /// Overrides the second moment of area of the section when set.
    pub inertia: Option<f64>,
}

impl BeamGeometry {
    pub fn rectangular(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            section: SectionShape::Rectangular { width, height },
            inertia: None,
        }
    }

    pub fn circular(length: f64, diameter: f64, wall_thickness: Option<f64>) -> Self {
        Self {
            length,
            section: SectionShape::Circular {
                diameter,
                wall_thickness,
            },
            inertia: None,
        }
    }

    pub fn area(&self) -> f64 {
        match self.section {
            SectionShape::Rectangular { width, height } => width * height,
            SectionShape::Circular {
                diameter,
                wall_thickness,
            } => {
                let bore = bore_diameter(diameter, wall_thickness);
                PI / 4.0 * (diameter.powi(2) - bore.powi(2))
            }
        }
    }

    pub fn second_moment(&self) -> f64 {
        self.inertia.unwrap_or_else(|| match self.section {
            SectionShape::Rectangular { width, height } => width * height.powi(3) / 12.0,
            SectionShape::Circular {
                diameter,
                wall_thickness,
            } => {
                let bore = bore_diameter(diameter, wall_thickness);
                PI / 64.0 * (diameter.powi(4) - bore.powi(4))
            }
        })
    }

    /// Outer depth of the section in the bending plane.
    pub fn depth(&self) -> f64 {
        match self.section {
            SectionShape::Rectangular { height, .. } => height,
            SectionShape::Circular { diameter, .. } => diameter,
        }
    }

    pub fn is_rectangular(&self) -> bool {
        matches!(self.section, SectionShape::Rectangular { .. })
    }
}

fn bore_diameter(diameter: f64, wall_thickness: Option<f64>) -> f64 {
    wall_thickness.map_or(0.0, |t| diameter - 2.0 * t)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementMaterial {
    pub young_modulus: f64,
    pub density: f64,
}

/// Piezoelectric patches bonded on the structure.
///
/// `layers` identical patches share the element-wise `active` pattern; an
/// inactive element carries no patch at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiezoLayer {
    pub layers: usize,
    pub width: f64,
    pub thickness: f64,
    pub e31: f64,
    pub k33: f64,
    pub density: f64,
    /// Elastic modulus c11 per element.
    pub elastic_moduli: Vec<f64>,
    pub active: Vec<bool>,
}

impl PiezoLayer {
    pub fn is_active(&self, element: usize) -> bool {
        self.active.get(element).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Damping {
    pub mass_coefficient: f64,
    pub stiffness_coefficient: f64,
}

impl Default for Damping {
    fn default() -> Self {
        Self {
            mass_coefficient: 5e-4,
            stiffness_coefficient: 5e-4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegrationMethod {
    #[default]
    AverageAcceleration,
    LinearAcceleration,
}

impl IntegrationMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AVERAGE" | "AVERAGEACCELERATION" | "TRAPEZOIDAL" => Some(Self::AverageAcceleration),
            "LINEAR" | "LINEARACCELERATION" => Some(Self::LinearAcceleration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeControl {
    pub start_time: f64,
    pub steps_per_period: usize,
    pub periods: usize,
    pub transient_periods: usize,
}

impl TimeControl {
    pub fn total_steps(&self) -> usize {
        self.steps_per_period.saturating_mul(self.periods)
    }

    /// Rejects controls that leave nothing to integrate or record.
    pub fn check(&self) -> Result<(), String> {
        if !self.start_time.is_finite() {
            return Err(format!("start time must be finite, got {}", self.start_time));
        }
        if self.steps_per_period == 0 {
            return Err("steps per period must be at least 1".to_string());
        }
        if self.periods == 0 {
            return Err("number of periods must be at least 1".to_string());
        }
        if self.steps_per_period.checked_mul(self.periods).is_none() {
            return Err(format!(
                "{} periods of {} steps overflow the step counter",
                self.periods, self.steps_per_period
            ));
        }
        if self.transient_periods >= self.periods {
            return Err(format!(
                "transient periods ({}) leave no steady-state periods out of {}",
                self.transient_periods, self.periods
            ));
        }
        Ok(())
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            steps_per_period: 64,
            periods: 40,
            transient_periods: 0,
        }
    }
}

/// Inclusive range of forcing angular frequencies in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl SweepRange {
    pub fn single(frequency: f64) -> Self {
        Self {
            start: frequency,
            end: frequency,
            step: 1.0,
        }
    }

    pub fn count(&self) -> usize {
        // float-to-int casts saturate, NaN maps to 0
        let span = ((self.end - self.start) / self.step + 1e-9).floor();
        (span as usize).saturating_add(1)
    }

    /// Rejects ranges that are empty, run backwards or exceed
    /// [`MAX_SWEEP_FREQUENCIES`].
    pub fn check(&self) -> Result<(), String> {
        for (what, value) in [("sweep start", self.start), ("sweep end", self.end)] {
            if !value.is_finite() {
                return Err(format!("{what} must be finite, got {value}"));
            }
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(format!("sweep step must be positive, got {}", self.step));
        }
        if self.start < 0.0 {
            return Err(format!("sweep start must not be negative, got {}", self.start));
        }
        if self.end < self.start {
            return Err(format!(
                "sweep end {} is below sweep start {}",
                self.end, self.start
            ));
        }
        let span = ((self.end - self.start) / self.step + 1e-9).floor();
        if !span.is_finite() || span + 1.0 > MAX_SWEEP_FREQUENCIES as f64 {
            return Err(format!(
                "sweep from {} to {} in steps of {} exceeds {MAX_SWEEP_FREQUENCIES} frequencies",
                self.start, self.end, self.step
            ));
        }
        Ok(())
    }

    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.count())
            .map(|j| self.start + j as f64 * self.step)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputControl {
    /// Frequency whose time history is written; every frequency when `None`.
    pub history_frequency: Option<f64>,
    /// Number of leading reduced DOFs written per history row.
    pub history_dofs: usize,
    /// Global DOF (0-based) whose peak forms the frequency response.
    pub response_dof: Option<usize>,
}

impl Default for OutputControl {
    fn default() -> Self {
        Self {
            history_frequency: None,
            history_dofs: 4,
            response_dof: None,
        }
    }
}

/// Everything needed to assemble and drive one beam run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamModel {
    pub num_elements: usize,
    pub geometry: BeamGeometry,
    /// One entry per element, in element order.
    pub materials: Vec<ElementMaterial>,
    pub piezo: Option<PiezoLayer>,
    /// Nodal force amplitudes, two per node (transverse, rotation).
    pub force: Vec<f64>,
    /// Nodal charge amplitudes, one per node. Empty without a piezo layer.
    pub charge: Vec<f64>,
    /// Structural boundary flags, two per node, `true` = free.
    pub structural_free: Vec<bool>,
    /// Potential boundary flags, one per node, `true` = free.
    pub potential_free: Vec<bool>,
    /// Declared count of free DOFs, checked against the flags.
    pub expected_free: Option<usize>,
    pub damping: Damping,
    pub method: IntegrationMethod,
    pub time: TimeControl,
    pub sweep: SweepRange,
    pub output: OutputControl,
}

impl BeamModel {
    /// A uniform unloaded beam with every structural DOF free and default controls.
    pub fn uniform(num_elements: usize, geometry: BeamGeometry, material: ElementMaterial) -> Self {
        let num_nodes = num_elements + 1;
        Self {
            num_elements,
            geometry,
            materials: vec![material; num_elements],
            piezo: None,
            force: vec![0.0; 2 * num_nodes],
            charge: Vec::new(),
            structural_free: vec![true; 2 * num_nodes],
            potential_free: Vec::new(),
            expected_free: None,
            damping: Damping::default(),
            method: IntegrationMethod::default(),
            time: TimeControl::default(),
            sweep: SweepRange::single(1.0),
            output: OutputControl::default(),
        }
    }

    /// Clamps both DOFs of the first node.
    pub fn clamp_root(mut self) -> Self {
        self.structural_free[0] = false;
        self.structural_free[1] = false;
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.num_elements + 1
    }

    pub fn element_length(&self) -> f64 {
        self.geometry.length / self.num_elements as f64
    }

    pub fn has_piezo(&self) -> bool {
        self.piezo.is_some()
    }

    pub fn structural_dofs(&self) -> usize {
        2 * self.num_nodes()
    }

    pub fn dofs_per_node(&self) -> usize {
        if self.has_piezo() { 3 } else { 2 }
    }

    pub fn total_dofs(&self) -> usize {
        self.num_nodes() * self.dofs_per_node()
    }

    /// Transverse displacement DOF of the last node.
    pub fn tip_dof(&self) -> usize {
        2 * self.num_elements
    }

    pub fn response_dof(&self) -> usize {
        self.output.response_dof.unwrap_or_else(|| self.tip_dof())
    }

    /// Checks sizes and physical ranges. Called by the deck builder and
    /// again by the solver before assembly.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_elements == 0 {
            return invalid("beam needs at least one element");
        }
        let n_nodes = self.num_nodes();

        positive("beam length", self.geometry.length)?;
        match self.geometry.section {
            SectionShape::Rectangular { width, height } => {
                positive("beam width", width)?;
                positive("beam height", height)?;
            }
            SectionShape::Circular {
                diameter,
                wall_thickness,
            } => {
                positive("beam diameter", diameter)?;
                if let Some(t) = wall_thickness {
                    positive("wall thickness", t)?;
                    if 2.0 * t > diameter {
                        return invalid(format!(
                            "wall thickness {t} exceeds the radius of a {diameter} tube"
                        ));
                    }
                }
            }
        }
        if let Some(inertia) = self.geometry.inertia {
            positive("section inertia", inertia)?;
        }
        positive("element length", self.element_length())?;

        expect_len("materials", self.materials.len(), self.num_elements)?;
        for (i, m) in self.materials.iter().enumerate() {
            positive(&format!("young modulus of element {}", i + 1), m.young_modulus)?;
            positive(&format!("density of element {}", i + 1), m.density)?;
        }

        expect_len("force amplitudes", self.force.len(), 2 * n_nodes)?;
        expect_len("structural boundary flags", self.structural_free.len(), 2 * n_nodes)?;
        if self.force.iter().any(|f| !f.is_finite()) {
            return invalid("force amplitudes must be finite");
        }

        match &self.piezo {
            Some(piezo) => {
                if !self.geometry.is_rectangular() {
                    return invalid("piezo patches need a rectangular beam section");
                }
                if piezo.layers == 0 {
                    return invalid("piezo layer count must be at least 1");
                }
                positive("piezo width", piezo.width)?;
                positive("piezo thickness", piezo.thickness)?;
                positive("piezo k33", piezo.k33)?;
                positive("piezo density", piezo.density)?;
                finite("piezo e31", piezo.e31)?;
                expect_len("piezo flags", piezo.active.len(), self.num_elements)?;
                expect_len("piezo elastic moduli", piezo.elastic_moduli.len(), self.num_elements)?;
                for (i, c11) in piezo.elastic_moduli.iter().enumerate() {
                    if piezo.is_active(i) {
                        positive(&format!("piezo c11 of element {}", i + 1), *c11)?;
                    }
                }
                if !self.charge.is_empty() {
                    expect_len("charge amplitudes", self.charge.len(), n_nodes)?;
                }
                if !self.potential_free.is_empty() {
                    expect_len("potential boundary flags", self.potential_free.len(), n_nodes)?;
                }
            }
            None => {
                if !self.charge.is_empty() || !self.potential_free.is_empty() {
                    return invalid("electrical loads or boundaries given without a piezo layer");
                }
            }
        }

        finite("mass damping coefficient", self.damping.mass_coefficient)?;
        finite("stiffness damping coefficient", self.damping.stiffness_coefficient)?;
        if self.damping.mass_coefficient < 0.0 || self.damping.stiffness_coefficient < 0.0 {
            return invalid("damping coefficients must not be negative");
        }

        self.time.check().map_err(ModelError::Invalid)?;
        self.sweep.check().map_err(ModelError::Invalid)?;

        if self.output.history_dofs == 0 {
            return invalid("history must record at least one DOF");
        }
        let response = self.response_dof();
        if response >= self.total_dofs() {
            return invalid(format!(
                "response DOF {} is outside the {} model DOFs",
                response + 1,
                self.total_dofs()
            ));
        }

        Ok(())
    }
}

fn invalid<T>(message: impl Into<String>) -> Result<T, ModelError> {
    Err(ModelError::Invalid(message.into()))
}

fn finite(what: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() {
        Ok(())
    } else {
        invalid(format!("{what} must be finite, got {value}"))
    }
}

fn positive(what: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        invalid(format!("{what} must be positive, got {value}"))
    }
}

fn expect_len(what: &str, got: usize, expected: usize) -> Result<(), ModelError> {
    if got == expected {
        Ok(())
    } else {
        invalid(format!("expected {expected} {what}, got {got}"))
    }
}
