//! Builds a [`BeamModel`] from a parsed deck.

use pzb_deck::{Card, Deck, parse_field, split_fields};

use crate::error::ModelError;
use crate::model::{
    BeamGeometry, BeamModel, Damping, ElementMaterial, IntegrationMethod, OutputControl,
    PiezoLayer, SweepRange, TimeControl,
};

impl BeamModel {
    pub fn from_deck(deck: &Deck) -> Result<Self, ModelError> {
        let beam = required(deck, "BEAM")?;
        let num_elements: usize = beam.parse_parameter("ELEMENTS")?.ok_or_else(|| {
            ModelError::card(beam.line_start, "missing ELEMENTS parameter in *BEAM card")
        })?;
        if num_elements == 0 {
            return Err(ModelError::card(beam.line_start, "ELEMENTS must be at least 1"));
        }
        let num_nodes = num_elements + 1;

        let geometry = beam_geometry(beam, deck.unique_card("SECTION")?)?;

        let material_rows = per_element_rows(required(deck, "MATERIAL")?, num_elements, 2)?;
        let materials = material_rows
            .into_iter()
            .map(|row| ElementMaterial {
                young_modulus: row[0],
                density: row[1],
            })
            .collect();

        let piezo = match deck.unique_card("PIEZO")? {
            Some(card) => Some(piezo_layer(deck, card, num_elements)?),
            None => {
                if let Some(card) = deck.unique_card("PIEZO MATERIAL")? {
                    return Err(ModelError::card(
                        card.line_start,
                        "*PIEZO MATERIAL given without a *PIEZO card",
                    ));
                }
                None
            }
        };

        let force = exact_values(required(deck, "FORCE")?, 2 * num_nodes, "nodal forces")?;

        let boundary = required(deck, "BOUNDARY")?;
        let structural_free = flags(boundary, 2 * num_nodes)?;
        let expected_free = boundary.parse_parameter("FREE")?;

        let charge = match deck.unique_card("CHARGE")? {
            Some(card) => {
                require_piezo(&piezo, card)?;
                exact_values(card, num_nodes, "nodal charges")?
            }
            None => Vec::new(),
        };
        let potential_free = match deck.unique_card("POTENTIAL BOUNDARY")? {
            Some(card) => {
                require_piezo(&piezo, card)?;
                flags(card, num_nodes)?
            }
            None if piezo.is_some() => vec![true; num_nodes],
            None => Vec::new(),
        };

        let damping = match deck.unique_card("DAMPING")? {
            Some(card) => {
                let v = exact_values(card, 2, "damping coefficients (mass, stiffness)")?;
                Damping {
                    mass_coefficient: v[0],
                    stiffness_coefficient: v[1],
                }
            }
            None => Damping::default(),
        };

        let method = match deck.unique_card("NEWMARK")? {
            Some(card) => match card.parameter("METHOD") {
                None => IntegrationMethod::default(),
                Some(name) => IntegrationMethod::from_name(name).ok_or_else(|| {
                    ModelError::card(card.line_start, format!("unknown Newmark method '{name}'"))
                })?,
            },
            None => IntegrationMethod::default(),
        };

        let time = time_control(required(deck, "TIME")?)?;

        let sweep = sweep_range(required(deck, "SWEEP")?)?;

        let output = match deck.unique_card("OUTPUT")? {
            Some(card) => output_control(card)?,
            None => OutputControl::default(),
        };

        let model = BeamModel {
            num_elements,
            geometry,
            materials,
            piezo,
            force,
            charge,
            structural_free,
            potential_free,
            expected_free,
            damping,
            method,
            time,
            sweep,
            output,
        };
        model.validate()?;

        log::debug!(
            "built beam model: {} elements, {} DOFs, piezo={}, {} sweep frequencies",
            model.num_elements,
            model.total_dofs(),
            model.has_piezo(),
            model.sweep.count()
        );
        Ok(model)
    }
}

fn required<'a>(deck: &'a Deck, keyword: &'static str) -> Result<&'a Card, ModelError> {
    deck.unique_card(keyword)?
        .ok_or(ModelError::MissingCard(keyword))
}

fn require_piezo(piezo: &Option<PiezoLayer>, card: &Card) -> Result<(), ModelError> {
    if piezo.is_none() {
        return Err(ModelError::card(
            card.line_start,
            format!("*{} requires a *PIEZO card", card.keyword),
        ));
    }
    Ok(())
}

fn exact_values(card: &Card, expected: usize, what: &str) -> Result<Vec<f64>, ModelError> {
    let values: Vec<f64> = card.values()?;
    if values.len() != expected {
        return Err(ModelError::card(
            card.body_line(),
            format!(
                "*{} expects {expected} {what}, got {}",
                card.keyword,
                values.len()
            ),
        ));
    }
    Ok(values)
}

fn flags(card: &Card, expected: usize) -> Result<Vec<bool>, ModelError> {
    let fields = card.fields();
    if fields.len() != expected {
        return Err(ModelError::card(
            card.body_line(),
            format!("*{} expects {expected} flags, got {}", card.keyword, fields.len()),
        ));
    }
    fields
        .into_iter()
        .map(|(line, field)| parse_flag(line, field))
        .collect()
}

fn parse_flag(line: usize, field: &str) -> Result<bool, ModelError> {
    match parse_field::<u8>(line, field)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ModelError::card(
            line,
            format!("flag must be 0 or 1, got {other}"),
        )),
    }
}

/// Reads `element, v1, .., vN` rows, one per element, in any order.
fn per_element_rows(
    card: &Card,
    num_elements: usize,
    values_per_row: usize,
) -> Result<Vec<Vec<f64>>, ModelError> {
    let mut rows: Vec<Option<Vec<f64>>> = vec![None; num_elements];

    for data in &card.data_lines {
        let fields = split_fields(&data.text);
        if fields.len() != values_per_row + 1 {
            return Err(ModelError::card(
                data.line,
                format!(
                    "*{} rows need an element id and {values_per_row} values, got {} fields",
                    card.keyword,
                    fields.len()
                ),
            ));
        }
        let id: usize = parse_field(data.line, fields[0])?;
        if id == 0 || id > num_elements {
            return Err(ModelError::card(
                data.line,
                format!("element {id} is outside 1..={num_elements}"),
            ));
        }
        let slot = &mut rows[id - 1];
        if slot.is_some() {
            return Err(ModelError::card(
                data.line,
                format!("element {id} listed twice in *{}", card.keyword),
            ));
        }
        let values = fields[1..]
            .iter()
            .map(|f| parse_field::<f64>(data.line, f))
            .collect::<Result<Vec<_>, _>>()?;
        *slot = Some(values);
    }

    let missing: Vec<String> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.is_none())
        .map(|(i, _)| (i + 1).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ModelError::card(
            card.line_start,
            format!(
                "*{} has no row for element(s) {}",
                card.keyword,
                missing.join(", ")
            ),
        ));
    }

    Ok(rows.into_iter().flatten().collect())
}

fn piezo_layer(deck: &Deck, card: &Card, num_elements: usize) -> Result<PiezoLayer, ModelError> {
    let layers: usize = card.parse_parameter("LAYERS")?.unwrap_or(1);
    let fields = card.fields();
    if fields.len() != 5 + num_elements {
        return Err(ModelError::card(
            card.body_line(),
            format!(
                "*PIEZO expects 5 properties and {num_elements} element flags, got {} fields",
                fields.len()
            ),
        ));
    }
    let props = fields[..5]
        .iter()
        .map(|(line, f)| parse_field::<f64>(*line, f))
        .collect::<Result<Vec<_>, _>>()?;
    let active = fields[5..]
        .iter()
        .map(|(line, f)| parse_flag(*line, f))
        .collect::<Result<Vec<_>, _>>()?;

    let moduli_card = deck.unique_card("PIEZO MATERIAL")?.ok_or(ModelError::MissingCard("PIEZO MATERIAL"))?;
    let elastic_moduli = per_element_rows(moduli_card, num_elements, 1)?
        .into_iter()
        .map(|row| row[0])
        .collect();

    Ok(PiezoLayer {
        layers,
        width: props[0],
        thickness: props[1],
        e31: props[2],
        k33: props[3],
        density: props[4],
        elastic_moduli,
        active,
    })
}

fn time_control(card: &Card) -> Result<TimeControl, ModelError> {
    let fields = card.fields();
    if fields.len() != 4 {
        return Err(ModelError::card(
            card.body_line(),
            format!(
                "*TIME expects start time, steps per period, periods and transient periods, got {} fields",
                fields.len()
            ),
        ));
    }
    let (line, raw) = fields[0];
    let start_time: f64 = parse_field(line, raw)?;
    let mut counts = [0usize; 3];
    for (slot, (line, raw)) in counts.iter_mut().zip(&fields[1..]) {
        *slot = parse_field(*line, raw)?;
    }
    let time = TimeControl {
        start_time,
        steps_per_period: counts[0],
        periods: counts[1],
        transient_periods: counts[2],
    };
    time
        .check()
        .map_err(|message| ModelError::card(card.body_line(), message))?;
    Ok(time)
}

fn sweep_range(card: &Card) -> Result<SweepRange, ModelError> {
    let v = exact_values(card, 3, "sweep values (start, end, step)")?;
    let sweep = SweepRange {
        start: v[0],
        end: v[1],
        step: v[2],
    };
    sweep
        .check()
        .map_err(|message| ModelError::card(card.body_line(), message))?;
    Ok(sweep)
}

/// `*BEAM` data is `length, width, height` for a rectangular section and
/// `length, diameter[, wall thickness]` under `*SECTION, SHAPE=CIRCULAR`.
fn beam_geometry(beam: &Card, section: Option<&Card>) -> Result<BeamGeometry, ModelError> {
    let shape = section.and_then(|card| card.parameter("SHAPE").map(|shape| (card, shape)));
    let circular = match shape {
        None => false,
        Some((card, shape)) => match shape.trim().to_ascii_uppercase().as_str() {
            "RECTANGULAR" => false,
            "CIRCULAR" => true,
            _ => {
                return Err(ModelError::card(
                    card.line_start,
                    format!("unknown section shape '{shape}'"),
                ));
            }
        },
    };

    let mut geometry = if circular {
        let dims: Vec<f64> = beam.values()?;
        if !(2..=3).contains(&dims.len()) {
            return Err(ModelError::card(
                beam.body_line(),
                format!(
                    "*BEAM with a circular section expects length, diameter and an optional wall thickness, got {} values",
                    dims.len()
                ),
            ));
        }
        BeamGeometry::circular(dims[0], dims[1], dims.get(2).copied())
    } else {
        let dims = exact_values(beam, 3, "beam dimensions (length, width, height)")?;
        BeamGeometry::rectangular(dims[0], dims[1], dims[2])
    };

    if let Some(card) = section {
        geometry.inertia = card.parse_parameter("INERTIA")?;
    }
    Ok(geometry)
}

fn output_control(card: &Card) -> Result<OutputControl, ModelError> {
    let defaults = OutputControl::default();
    let response_dof = match card.parse_parameter::<usize>("RESPONSE DOF")? {
        Some(0) => {
            return Err(ModelError::card(card.line_start, "RESPONSE DOF is 1-based"));
        }
        Some(dof) => Some(dof - 1),
        None => None,
    };
    Ok(OutputControl {
        history_frequency: card.parse_parameter("HISTORY FREQUENCY")?,
        history_dofs: card.parse_parameter("DOFS")?.unwrap_or(defaults.history_dofs),
        response_dof,
    })
}
