//! Error taxonomy of the solver: configuration, numerical and I/O.

use pzb_io::IoError;
use pzb_model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("singular system: pivot {pivot:e} in column {column} is below {threshold:e}")]
    Singular {
        column: usize,
        pivot: f64,
        threshold: f64,
    },

    #[error("non-finite value in column {column} during elimination")]
    NonFinite { column: usize },

    #[error("numerical error: {0}")]
    Numerical(String),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error("frequency {frequency} rad/s failed: {source}")]
    Frequency {
        frequency: f64,
        #[source]
        source: Box<SolverError>,
    },
}

impl SolverError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for failures of the arithmetic rather than of the input or output.
    pub fn is_numerical(&self) -> bool {
        match self {
            Self::Singular { .. } | Self::NonFinite { .. } | Self::Numerical(_) => true,
            Self::Frequency { source, .. } => source.is_numerical(),
            _ => false,
        }
    }
}
