use camino::Utf8Path;

use crate::error::BiomartError;

/// Uniform tabular output of every discovery and query operation: ordered
/// rows of string cells, with an optional sequence of column labels.
///
/// Labels are kept independent of row width: a wire row carrying fewer or
/// more cells than there are labels does not invalidate the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    labels: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { labels: None, rows }
    }

    pub fn with_labels(labels: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            labels: Some(labels),
            rows,
        }
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, label: &str) -> Result<usize, BiomartError> {
        let labels = self.labels.as_ref().ok_or(BiomartError::Unlabeled)?;
        labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| BiomartError::MissingColumn(label.to_string()))
    }

    /// Cells of a labeled column, top to bottom. Rows too short for the
    /// column yield an empty cell.
    pub fn column(&self, label: &str) -> Result<Vec<&str>, BiomartError> {
        let index = self.column_index(label)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
            .collect())
    }

    /// Writes the table as CSV, labels first when present.
    pub fn write_csv(&self, path: &Utf8Path) -> Result<(), BiomartError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path.as_std_path())
            .map_err(|err| BiomartError::Csv(err.to_string()))?;
        if let Some(labels) = &self.labels {
            writer
                .write_record(labels)
                .map_err(|err| BiomartError::Csv(err.to_string()))?;
        }
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|err| BiomartError::Csv(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| BiomartError::Csv(err.to_string()))?;
        Ok(())
    }
}
