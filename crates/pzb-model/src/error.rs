use pzb_deck::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("missing required *{0} card")]
    MissingCard(&'static str),

    #[error("line {line}: {message}")]
    Card { line: usize, message: String },

    #[error("invalid model: {0}")]
    Invalid(String),
}

impl ModelError {
    pub(crate) fn card(line: usize, message: impl Into<String>) -> Self {
        Self::Card {
            line,
            message: message.into(),
        }
    }
}
