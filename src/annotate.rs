use std::collections::HashMap;

use crate::error::BiomartError;
use crate::session::MartSession;
use crate::table::Table;
use crate::transport::MartTransport;

/// Joins caller tables against an annotation table on a key column.
/// By default the annotation table is the session's last query result.
pub struct Annotator<'a, T: MartTransport> {
    session: &'a MartSession<T>,
}

impl<'a, T: MartTransport> Annotator<'a, T> {
    pub fn new(session: &'a MartSession<T>) -> Self {
        Self { session }
    }

    /// Joins `table` against the session's last result. Errors when no
    /// query has been run yet.
    pub fn annotate(
        &self,
        table: &Table,
        left_key: &str,
        right_key: &str,
        keep_unmatched: bool,
    ) -> Result<Table, BiomartError> {
        let annotation = self
            .session
            .last_result()
            .ok_or(BiomartError::MissingAnnotation)?;
        annotate_with(table, annotation, left_key, right_key, keep_unmatched)
    }
}

/// Equi-joins two labeled tables on the given key columns. Inner join by
/// default; with `keep_unmatched` every unmatched left row is kept, padded
/// with empty cells. A left row matching several annotation rows produces
/// one output row per match. Output labels concatenate left then right.
pub fn annotate_with(
    left: &Table,
    right: &Table,
    left_key: &str,
    right_key: &str,
    keep_unmatched: bool,
) -> Result<Table, BiomartError> {
    let left_index = left.column_index(left_key)?;
    let right_index = right.column_index(right_key)?;
    let left_labels = left.labels().ok_or(BiomartError::Unlabeled)?;
    let right_labels = right.labels().ok_or(BiomartError::Unlabeled)?;
    let right_width = right_labels.len();

    let mut labels = left_labels.to_vec();
    labels.extend(right_labels.iter().cloned());

    let mut by_key: HashMap<&str, Vec<&Vec<String>>> = HashMap::new();
    for row in right.rows() {
        let key = row.get(right_index).map(String::as_str).unwrap_or("");
        by_key.entry(key).or_default().push(row);
    }

    let mut rows = Vec::new();
    for row in left.rows() {
        let key = row.get(left_index).map(String::as_str).unwrap_or("");
        match by_key.get(key) {
            Some(matches) => {
                for matched in matches {
                    let mut combined = row.clone();
                    combined.extend(matched.iter().cloned());
                    rows.push(combined);
                }
            }
            None if keep_unmatched => {
                let mut combined = row.clone();
                combined.extend(std::iter::repeat_n(String::new(), right_width));
                rows.push(combined);
            }
            None => {}
        }
    }
    Ok(Table::with_labels(labels, rows))
}
