//! Output side of a piezo beam run.
//!
//! - **Result sinks** receiving time-history and frequency-response rows
//! - **Flat-file writers/readers** for `history.dat` and `response.dat`
//! - **JSON run report** persistence

pub mod error;
mod output;
mod report;

pub use error::{IoError, Result};
pub use output::{
    FileSink, HISTORY_FILE, HistoryRow, MemorySink, RESPONSE_FILE, ResponseRow, ResultSink,
    read_history, read_response,
};
pub use report::{REPORT_FILE, RunReport, RunStatus, load_report, save_report};
