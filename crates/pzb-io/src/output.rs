//! Flat-file result writers.
//!
//! Two tab-separated files are produced per run:
//!
//! ```text
//! history.dat   frequency  time  u[0..k]  v[0..k]  a[0..k]
//! response.dat  frequency  peak-displacement
//! ```
//!
//! Both are opened once, written in sweep order and flushed on [`ResultSink::finish`].

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{IoError, Result};

pub const HISTORY_FILE: &str = "history.dat";
pub const RESPONSE_FILE: &str = "response.dat";

/// State of the leading reduced DOFs at one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub frequency: f64,
    pub time: f64,
    pub displacement: Vec<f64>,
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,
}

/// Peak steady-state displacement for one forcing frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseRow {
    pub frequency: f64,
    pub peak: f64,
}

/// Destination for sweep output. Implementations are single-writer.
pub trait ResultSink {
    fn write_history(&mut self, row: &HistoryRow) -> Result<()>;

    fn write_response(&mut self, row: &ResponseRow) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes `history.dat` and `response.dat` into a directory.
pub struct FileSink {
    history_path: PathBuf,
    response_path: PathBuf,
    history: BufWriter<File>,
    response: BufWriter<File>,
}

impl FileSink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::create_with_paths(dir.join(HISTORY_FILE), dir.join(RESPONSE_FILE))
    }

    pub fn create_with_paths(
        history_path: impl Into<PathBuf>,
        response_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let history_path = history_path.into();
        let response_path = response_path.into();
        let history = BufWriter::new(create_file(&history_path)?);
        let response = BufWriter::new(create_file(&response_path)?);
        log::debug!(
            "opened result files {} and {}",
            history_path.display(),
            response_path.display()
        );
        Ok(Self {
            history_path,
            response_path,
            history,
            response,
        })
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn response_path(&self) -> &Path {
        &self.response_path
    }
}

impl ResultSink for FileSink {
    fn write_history(&mut self, row: &HistoryRow) -> Result<()> {
        let mut line = format!("{:.9e}\t{:.9e}", row.frequency, row.time);
        for value in row
            .displacement
            .iter()
            .chain(&row.velocity)
            .chain(&row.acceleration)
        {
            line.push('\t');
            line.push_str(&format!("{value:.9e}"));
        }
        writeln!(self.history, "{line}")?;
        Ok(())
    }

    fn write_response(&mut self, row: &ResponseRow) -> Result<()> {
        writeln!(self.response, "{:.9e}\t{:.9e}", row.frequency, row.peak)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.history.flush()?;
        self.response.flush()?;
        Ok(())
    }
}

/// Keeps every row in memory. Used by tests and by callers that post-process.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub history: Vec<HistoryRow>,
    pub response: Vec<ResponseRow>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn write_history(&mut self, row: &HistoryRow) -> Result<()> {
        self.history.push(row.clone());
        Ok(())
    }

    fn write_response(&mut self, row: &ResponseRow) -> Result<()> {
        self.response.push(*row);
        Ok(())
    }
}

/// Reads a `response.dat` file back.
pub fn read_response(path: impl AsRef<Path>) -> Result<Vec<ResponseRow>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let values = parse_row(&line, index + 1)?;
        if values.len() != 2 {
            return Err(IoError::InvalidData(format!(
                "response line {} has {} columns, expected 2",
                index + 1,
                values.len()
            )));
        }
        rows.push(ResponseRow {
            frequency: values[0],
            peak: values[1],
        });
    }
    Ok(rows)
}

/// Reads a `history.dat` file back; `dofs` is the per-quantity column count.
pub fn read_history(path: impl AsRef<Path>, dofs: usize) -> Result<Vec<HistoryRow>> {
    let reader = BufReader::new(File::open(path)?);
    let expected = 2 + 3 * dofs;
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let values = parse_row(&line, index + 1)?;
        if values.len() != expected {
            return Err(IoError::InvalidData(format!(
                "history line {} has {} columns, expected {expected}",
                index + 1,
                values.len()
            )));
        }
        rows.push(HistoryRow {
            frequency: values[0],
            time: values[1],
            displacement: values[2..2 + dofs].to_vec(),
            velocity: values[2 + dofs..2 + 2 * dofs].to_vec(),
            acceleration: values[2 + 2 * dofs..].to_vec(),
        });
    }
    Ok(rows)
}

fn parse_row(line: &str, number: usize) -> Result<Vec<f64>> {
    line.split('\t')
        .map(|field| {
            field.trim().parse::<f64>().map_err(|e| {
                IoError::InvalidData(format!("line {number}: invalid value '{field}': {e}"))
            })
        })
        .collect()
}

fn create_file(path: &Path) -> Result<File> {
    ensure_parent_dir(path).map_err(|source| IoError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    File::create(path).map_err(|source| IoError::Create {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(frequency: f64, time: f64) -> HistoryRow {
        HistoryRow {
            frequency,
            time,
            displacement: vec![1.0e-3, -2.0e-3],
            velocity: vec![0.5, 0.25],
            acceleration: vec![-10.0, 3.0],
        }
    }

    #[test]
    fn file_sink_writes_documented_columns() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let mut sink = FileSink::create(tmp.path().join("run")).expect("sink should open");
        sink.write_history(&row(3.5, 0.01)).unwrap();
        sink.write_history(&row(3.5, 0.02)).unwrap();
        sink.write_response(&ResponseRow {
            frequency: 3.5,
            peak: 0.125,
        })
        .unwrap();
        sink.finish().unwrap();

        let history = fs::read_to_string(sink.history_path()).unwrap();
        let first: Vec<&str> = history.lines().next().unwrap().split('\t').collect();
        assert_eq!(first.len(), 8);
        assert_eq!(first[0].parse::<f64>().unwrap(), 3.5);
        assert_eq!(first[3].parse::<f64>().unwrap(), -2.0e-3);

        let rows = read_history(sink.history_path(), 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].time, 0.02);
        assert_eq!(rows[1].acceleration, vec![-10.0, 3.0]);

        let response = read_response(sink.response_path()).unwrap();
        assert_eq!(
            response,
            vec![ResponseRow {
                frequency: 3.5,
                peak: 0.125
            }]
        );
    }

    #[test]
    fn read_history_rejects_wrong_column_count() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("history.dat");
        fs::write(&path, "1.0\t0.0\t1.0\n").unwrap();
        let err = read_history(&path, 2).expect_err("three columns for two dofs");
        assert!(matches!(err, IoError::InvalidData(_)));
    }

    #[test]
    fn create_reports_unwritable_path() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = FileSink::create(blocker.join("nested")).err().expect("parent is a file");
        assert!(matches!(err, IoError::Create { .. }));
    }

    #[test]
    fn memory_sink_keeps_rows_in_order() {
        let mut sink = MemorySink::new();
        sink.write_history(&row(1.0, 0.0)).unwrap();
        sink.write_history(&row(2.0, 0.0)).unwrap();
        sink.write_response(&ResponseRow {
            frequency: 1.0,
            peak: 0.5,
        })
        .unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.history.len(), 2);
        assert_eq!(sink.history[1].frequency, 2.0);
        assert_eq!(sink.response[0].peak, 0.5);
    }
}
