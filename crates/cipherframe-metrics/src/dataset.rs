//! CSV dataset adapter for per-frame measurements.

use std::collections::BTreeMap;
use std::io::Read;

use crate::MetricsError;

/// Column identifying frame rows; rows with an empty value are dropped.
pub const FRAME_COLUMN: &str = "Frame";

/// One dataset row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSample {
    cells: BTreeMap<String, String>,
}

impl MetricSample {
    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        }
    }

    /// Raw cell text.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Cell parsed as a finite number.
    ///
    /// # Errors
    /// Returns [`MetricsError::MissingColumn`] for an absent column and
    /// [`MetricsError::InvalidNumber`] for text that is not a finite number.
    pub fn number(&self, column: &str) -> Result<f64, MetricsError> {
        let text = self
            .get(column)
            .ok_or_else(|| MetricsError::MissingColumn(column.to_string()))?;
        match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(MetricsError::InvalidNumber {
                column: column.to_string(),
                value: text.to_string(),
            }),
        }
    }
}

/// Parsed per-frame dataset of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDataset {
    headers: Vec<String>,
    rows: Vec<MetricSample>,
}

impl MetricDataset {
    /// Parses a headed CSV dataset.
    ///
    /// Rows whose [`FRAME_COLUMN`] cell is empty are dropped. Short rows are
    /// accepted; their missing cells are absent from the row.
    ///
    /// # Errors
    /// Returns [`MetricsError::Csv`] for unreadable input and
    /// [`MetricsError::MissingColumn`] when the header lacks [`FRAME_COLUMN`].
    pub fn from_csv_reader(reader: impl Read) -> Result<Self, MetricsError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if !headers.iter().any(|header| header == FRAME_COLUMN) {
            return Err(MetricsError::MissingColumn(FRAME_COLUMN.to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = MetricSample::from_pairs(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(header, cell)| (header.as_str(), cell)),
            );
            if row.get(FRAME_COLUMN).is_some_and(|frame| !frame.is_empty()) {
                rows.push(row);
            }
        }

        Ok(Self { headers, rows })
    }

    /// Returns `true` when the header carries `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|header| header == column)
    }

    /// Number of frame rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when no frame rows remain.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Summary row: the last frame row.
    ///
    /// # Errors
    /// Returns [`MetricsError::EmptyDataset`] when there are no frame rows.
    pub fn summary(&self) -> Result<&MetricSample, MetricsError> {
        self.rows.last().ok_or(MetricsError::EmptyDataset)
    }
}
