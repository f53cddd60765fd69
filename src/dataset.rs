//! Tabular data: feature rows plus one label per row.
//!
//! Files are delimited text with the label in the last column. Lines that
//! start with the comment character (KEEL headers use `@`) and blank lines
//! are skipped.

use crate::error::{Result, SymregError};
use crate::random::shuffle;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use rand::Rng;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default comment marker for delimited files.
pub const DEFAULT_COMMENT: char = '@';

/// Default field delimiter for delimited files.
pub const DEFAULT_DELIMITER: char = ',';

/// Feature matrix and labels.
///
/// Every row has the same width and `labels.len() == features.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl Dataset {
    /// Validates the shape and wraps the data.
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<f64>) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(SymregError::InvalidData(format!(
                "{} rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if let Some(first) = features.first() {
            let width = first.len();
            if let Some(i) = features.iter().position(|r| r.len() != width) {
                return Err(SymregError::InvalidData(format!(
                    "row {i} has {} values, expected {width}",
                    features[i].len()
                )));
            }
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Width of a feature row; 0 for an empty data set.
    pub fn num_variables(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Reads a delimited file; see [`parse_delimited`](Self::parse_delimited).
    pub fn read_delimited<P: AsRef<Path>>(path: P, comment: char, delimiter: char) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::parse_delimited(file, comment, delimiter)
    }

    /// Parses delimited text. Each kept line needs at least one feature and
    /// the label. `comment` and `delimiter` must be ASCII.
    pub fn parse_delimited<R: Read>(reader: R, comment: char, delimiter: char) -> Result<Self> {
        let mut rows = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(ascii_byte(comment, "comment")?))
            .delimiter(ascii_byte(delimiter, "delimiter")?)
            .from_reader(reader);

        let mut features: Vec<Vec<f64>> = Vec::new();
        let mut labels = Vec::new();

        for record in rows.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());

            let mut values = record
                .iter()
                .map(|field| {
                    field.parse::<f64>().map_err(|_| {
                        SymregError::InvalidData(format!(
                            "line {line}: cannot parse '{field}' as a number"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            let Some(label) = values.pop().filter(|_| !values.is_empty()) else {
                return Err(SymregError::InvalidData(format!(
                    "line {line}: expected at least one feature and a label"
                )));
            };
            if let Some(first) = features.first() {
                if first.len() != values.len() {
                    return Err(SymregError::InvalidData(format!(
                        "line {line}: {} features, expected {}",
                        values.len(),
                        first.len()
                    )));
                }
            }
            features.push(values);
            labels.push(label);
        }

        Ok(Self { features, labels })
    }

    /// Writes one row per line, features then label.
    pub fn write_delimited<P: AsRef<Path>>(&self, path: P, delimiter: char) -> Result<()> {
        let mut out = WriterBuilder::new()
            .has_headers(false)
            .delimiter(ascii_byte(delimiter, "delimiter")?)
            .from_path(path.as_ref())?;
        for (row, label) in self.features.iter().zip(&self.labels) {
            out.write_record(row.iter().chain(std::iter::once(label)).map(f64::to_string))?;
        }
        out.flush()?;
        Ok(())
    }

    /// Rows (with their labels) in random order.
    pub fn shuffled<R: Rng>(&self, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        shuffle(&mut order, rng);
        self.select(order)
    }

    /// First `mid` rows and the rest.
    pub fn split_at(&self, mid: usize) -> (Self, Self) {
        let mid = mid.min(self.len());
        (self.select(0..mid), self.select(mid..self.len()))
    }

    /// Holds out a contiguous block of `round(len * test_ratio)` rows
    /// starting at `start`, or at a random offset when `start` is `None`.
    ///
    /// Returns `(train, test)`.
    pub fn split_train_test<R: Rng>(
        &self,
        test_ratio: f64,
        start: Option<usize>,
        rng: &mut R,
    ) -> Result<(Self, Self)> {
        if !(0.0..=1.0).contains(&test_ratio) {
            return Err(SymregError::InvalidConfig(format!(
                "test_ratio must be within [0, 1], got {test_ratio}"
            )));
        }
        let n = self.len();
        let test_len = ((n as f64) * test_ratio).round() as usize;
        let max_start = n - test_len;
        let start = match start {
            Some(s) if s > max_start => {
                return Err(SymregError::InvalidConfig(format!(
                    "test block at {s} of length {test_len} exceeds {n} rows"
                )))
            }
            Some(s) => s,
            None => rng.random_range(0..=max_start),
        };
        let end = start + test_len;
        let train = self.select((0..start).chain(end..n));
        let test = self.select(start..end);
        Ok((train, test))
    }

    /// Contiguous k-fold partition as `(train, test)` pairs.
    ///
    /// Fold sizes differ by at most one; the first `len % k` folds get the
    /// extra row. Fails when `k < 2` or `k > len`.
    pub fn folds(&self, k: usize) -> Result<Vec<(Self, Self)>> {
        let rows = self.len();
        if k < 2 || k > rows {
            return Err(SymregError::InvalidFolds { k, rows });
        }
        let base = rows / k;
        let extra = rows % k;

        let mut out = Vec::with_capacity(k);
        let mut start = 0;
        for fold in 0..k {
            let size = base + usize::from(fold < extra);
            let end = start + size;
            let train = self.select((0..start).chain(end..rows));
            let test = self.select(start..end);
            out.push((train, test));
            start = end;
        }
        Ok(out)
    }

    fn select<I: IntoIterator<Item = usize>>(&self, indices: I) -> Self {
        let (features, labels) = indices
            .into_iter()
            .map(|i| (self.features[i].clone(), self.labels[i]))
            .unzip();
        Self { features, labels }
    }
}

fn ascii_byte(c: char, what: &str) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(SymregError::InvalidConfig(format!(
            "{what} must be an ASCII character, got {c:?}"
        )))
    }
}
