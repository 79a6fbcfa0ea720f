//! Per-element section and material properties.
//!
//! The structure is a rectangular (or user-inertia) section. A bonded piezo
//! layer of `n` patches, width `bp`, thickness `hp` on a structure of
//! thickness `hs` contributes
//!
//! ```text
//! A_p = n bp hp
//! I_p = n (bp hp³/12 + bp hp ((hp + hs)/2)²)
//! ```
//!
//! plus electromechanical coupling with lever arm `z = (hs + hp)/2`.

use pzb_model::{BeamModel, PiezoLayer};

/// Bending rigidity `EI` and mass per unit length `ρA` of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionProperties {
    pub flexural_rigidity: f64,
    pub mass_per_length: f64,
}

impl SectionProperties {
    pub fn new(flexural_rigidity: f64, mass_per_length: f64) -> Self {
        Self {
            flexural_rigidity,
            mass_per_length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiezoProperties {
    /// Mechanical contribution of the patches.
    pub layer: SectionProperties,
    /// `n e31 bp z`, multiplies the curvature/potential coupling.
    pub coupling: f64,
    /// `n k33 bp / hp`, capacitance per unit length.
    pub permittivity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementProperties {
    pub structure: SectionProperties,
    pub piezo: Option<PiezoProperties>,
}

pub fn piezo_area(piezo: &PiezoLayer) -> f64 {
    piezo.layers as f64 * piezo.width * piezo.thickness
}

pub fn piezo_inertia(piezo: &PiezoLayer, structure_height: f64) -> f64 {
    let (bp, hp) = (piezo.width, piezo.thickness);
    let arm = (hp + structure_height) / 2.0;
    piezo.layers as f64 * (bp * hp.powi(3) / 12.0 + bp * hp * arm * arm)
}

/// Properties of every element in order.
pub fn element_properties(model: &BeamModel) -> Vec<ElementProperties> {
    let area = model.geometry.area();
    let inertia = model.geometry.second_moment();
    let hs = model.geometry.depth();

    model
        .materials
        .iter()
        .enumerate()
        .map(|(index, material)| {
            let structure =
                SectionProperties::new(material.young_modulus * inertia, material.density * area);
            let piezo = model
                .piezo
                .as_ref()
                .filter(|p| p.is_active(index))
                .map(|p| {
                    let n = p.layers as f64;
                    PiezoProperties {
                        layer: SectionProperties::new(
                            p.elastic_moduli[index] * piezo_inertia(p, hs),
                            p.density * piezo_area(p),
                        ),
                        coupling: n * p.e31 * p.width * (hs + p.thickness) / 2.0,
                        permittivity: n * p.k33 * p.width / p.thickness,
                    }
                });
            ElementProperties { structure, piezo }
        })
        .collect()
}
