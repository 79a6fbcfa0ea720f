//! Beam model built from a parsed deck, plus a card-level summary.

use std::collections::BTreeMap;

use pzb_deck::Deck;

mod builder;
pub mod error;
pub mod model;

pub use error::ModelError;
pub use model::{
    BeamGeometry, BeamModel, Damping, ElementMaterial, IntegrationMethod, MAX_SWEEP_FREQUENCIES,
    OutputControl, PiezoLayer, SectionShape, SweepRange, TimeControl,
};

/// Card-level overview of a deck, available even when the model is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub total_cards: usize,
    pub total_data_lines: usize,
    pub keyword_counts: BTreeMap<String, usize>,
    pub declared_elements: Option<usize>,
    pub material_rows: usize,
    pub has_piezo: bool,
    pub has_charge: bool,
    pub has_sweep: bool,
    pub has_time: bool,
    pub has_output: bool,
}

impl ModelSummary {
    pub fn from_deck(deck: &Deck) -> Self {
        let mut keyword_counts = BTreeMap::<String, usize>::new();
        let mut declared_elements = None;
        let mut material_rows = 0usize;

        let mut has_piezo = false;
        let mut has_charge = false;
        let mut has_sweep = false;
        let mut has_time = false;
        let mut has_output = false;

        for card in &deck.cards {
            *keyword_counts.entry(card.keyword.clone()).or_insert(0) += 1;

            match normalized(&card.keyword).as_str() {
                "BEAM" => {
                    declared_elements = card.parse_parameter::<usize>("ELEMENTS").ok().flatten();
                }
                "MATERIAL" => material_rows += card.data_lines.len(),
                "PIEZO" => has_piezo = true,
                "CHARGE" => has_charge = true,
                "SWEEP" => has_sweep = true,
                "TIME" => has_time = true,
                "OUTPUT" => has_output = true,
                _ => {}
            }
        }

        let total_cards = deck.cards.len();
        let total_data_lines = deck.cards.iter().map(|c| c.data_lines.len()).sum();

        Self {
            total_cards,
            total_data_lines,
            keyword_counts,
            declared_elements,
            material_rows,
            has_piezo,
            has_charge,
            has_sweep,
            has_time,
            has_output,
        }
    }
}

fn normalized(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_ascii_uppercase()
}
