//! Moving temperature data to and from CSV files
//!
//! Grids are stored row-major, one grid row per text line, with values
//! separated by commas.

use crate::{surface::Temperature, Precision};
use ndarray::ArrayView2;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Things that can go wrong when moving grids to and from CSV files
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to access the underlying file
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A cell does not parse as a floating-point value
    #[error("malformed value at {}:{line}, column {column}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    /// A row does not have the same length as the first one
    #[error("{}:{line} holds {got} values where {expected} were expected", path.display())]
    Ragged {
        path: PathBuf,
        line: usize,
        expected: usize,
        got: usize,
    },

    /// The grid is not square
    #[error("expected a square grid, got {rows} rows of {cols} values in {}", path.display())]
    NotSquare {
        path: PathBuf,
        rows: usize,
        cols: usize,
    },
}

/// Read a square temperature grid from a CSV file
pub fn read_matrix(path: impl AsRef<Path>) -> Result<Temperature, Error> {
    let path = path.as_ref();
    let io_error = |source| Error::Io {
        path: path.to_owned(),
        source,
    };

    let file = File::open(path).map_err(io_error)?;
    let mut values = Vec::new();
    let mut cols = None;
    let mut rows = 0;
    for (line_idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_error)?;
        if line.is_empty() {
            continue;
        }
        let mut row_len = 0;
        for (col_idx, cell) in line.split(',').enumerate() {
            let value: Precision = cell.trim().parse().map_err(|_| Error::Malformed {
                path: path.to_owned(),
                line: line_idx + 1,
                column: col_idx + 1,
            })?;
            values.push(value);
            row_len += 1;
        }
        let expected = *cols.get_or_insert(row_len);
        if row_len != expected {
            return Err(Error::Ragged {
                path: path.to_owned(),
                line: line_idx + 1,
                expected,
                got: row_len,
            });
        }
        rows += 1;
    }

    let cols = cols.unwrap_or(0);
    if rows != cols {
        return Err(Error::NotSquare {
            path: path.to_owned(),
            rows,
            cols,
        });
    }
    Ok(Temperature::from_shape_vec((rows, cols), values)
        .expect("row lengths were checked above"))
}

/// Mechanism to write settled snapshots next to the input file
///
/// A 100-step run on `temperature.csv` with 4 checkpoints produces
/// `temperature_25.csv`, `temperature_50.csv`, `temperature_75.csv` and
/// `temperature_100.csv`.
#[derive(Clone, Debug)]
pub struct Writer {
    /// Input path with its extension stripped, from which snapshot names
    /// are derived
    base: PathBuf,
}
//
impl Writer {
    /// Derive the snapshot naming scheme from the input file location
    pub fn new(input: impl AsRef<Path>) -> Self {
        let mut base = input.as_ref().to_owned();
        base.set_extension("");
        Self { base }
    }

    /// Path the snapshot for a given cumulative step count goes to
    pub fn snapshot_path(&self, completed_steps: usize) -> PathBuf {
        let mut name = self
            .base
            .file_name()
            .map(|stem| stem.to_owned())
            .unwrap_or_default();
        name.push(format!("_{completed_steps}.csv"));
        self.base.with_file_name(name)
    }

    /// Write one settled snapshot, labelled by cumulative completed steps
    pub fn write(
        &mut self,
        snapshot: ArrayView2<'_, Precision>,
        completed_steps: usize,
    ) -> Result<PathBuf, Error> {
        let path = self.snapshot_path(completed_steps);
        let io_error = |source| Error::Io {
            path: path.clone(),
            source,
        };

        let mut file = BufWriter::new(File::create(&path).map_err(io_error)?);
        for row in snapshot.rows() {
            let mut cells = row.iter();
            if let Some(first) = cells.next() {
                write!(file, "{first}").map_err(io_error)?;
            }
            for value in cells {
                write!(file, ",{value}").map_err(io_error)?;
            }
            writeln!(file).map_err(io_error)?;
        }
        file.flush().map_err(io_error)?;
        Ok(path)
    }
}
