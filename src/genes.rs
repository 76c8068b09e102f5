//! Default gene query and its post-processing: the fixed positional
//! attribute set, integer coercion of coordinates, dropping of unresolved
//! rows and the strand-aware genomic sort.

use crate::error::BiomartError;
use crate::query::Filters;
use crate::session::MartSession;
use crate::table::Table;
use crate::transport::MartTransport;

/// Attributes every default query requests, in column order, ahead of any
/// caller-supplied extras.
pub const CORE_ATTRIBUTES: [&str; 6] = [
    "ensembl_gene_id",
    "external_gene_name",
    "chromosome_name",
    "start_position",
    "end_position",
    "strand",
];

pub const ENSEMBL_MART: &str = "ENSEMBL_MART_ENSEMBL";
pub const HUMAN_DATASET: &str = "hsapiens_gene_ensembl";
pub const MOUSE_DATASET: &str = "mmusculus_gene_ensembl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneRecord {
    pub ensembl_gene_id: String,
    pub external_gene_name: String,
    pub chromosome_name: String,
    pub start_position: i64,
    pub end_position: i64,
    pub strand: i32,
    /// Cells of caller-supplied extra attributes, in request order.
    pub extra: Vec<String>,
}

impl GeneRecord {
    /// TSS-oriented coordinate: the end position on the reverse strand,
    /// the start position otherwise.
    pub fn tss(&self) -> i64 {
        if self.strand < 0 {
            self.end_position
        } else {
            self.start_position
        }
    }
}

/// Typed result of a default query. No record has an empty
/// `external_gene_name`; rows that arrived unresolved were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneTable {
    records: Vec<GeneRecord>,
    extra_labels: Vec<String>,
}

impl GeneTable {
    /// Builds a gene table from a raw query result whose first six columns
    /// are [`CORE_ATTRIBUTES`]. Rows without a gene name (including the
    /// trailing blank row a trailing newline produces) are dropped; a
    /// non-numeric coordinate is an error, not masked.
    pub fn from_table(table: &Table, extra_labels: &[String]) -> Result<Self, BiomartError> {
        let mut records = Vec::new();
        for row in table.rows() {
            let gene_name = cell(row, 1);
            if gene_name.is_empty() {
                continue;
            }
            records.push(GeneRecord {
                ensembl_gene_id: cell(row, 0).to_string(),
                external_gene_name: gene_name.to_string(),
                chromosome_name: cell(row, 2).to_string(),
                start_position: coerce_int(row, 3, "start_position")?,
                end_position: coerce_int(row, 4, "end_position")?,
                strand: coerce_int(row, 5, "strand")? as i32,
                extra: row.get(6..).unwrap_or(&[]).to_vec(),
            });
        }
        Ok(Self {
            records,
            extra_labels: extra_labels.to_vec(),
        })
    }

    pub fn records(&self) -> &[GeneRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable-sorts records by chromosome name (lexicographic, so "11"
    /// sorts before "2") and then by TSS-oriented coordinate. This matches
    /// the ordering of samtools-sorted interval files so that downstream
    /// interval matching can walk both in one pass.
    pub fn sort_on_starts(mut self) -> Self {
        self.records
            .sort_by(|a, b| (a.chromosome_name.as_str(), a.tss()).cmp(&(b.chromosome_name.as_str(), b.tss())));
        self
    }

    /// Renders back to a string table labeled with the core attributes
    /// followed by the extra attribute labels.
    pub fn to_table(&self) -> Table {
        let mut labels: Vec<String> = CORE_ATTRIBUTES.iter().map(|a| a.to_string()).collect();
        labels.extend(self.extra_labels.iter().cloned());
        let rows = self
            .records
            .iter()
            .map(|record| {
                let mut row = vec![
                    record.ensembl_gene_id.clone(),
                    record.external_gene_name.clone(),
                    record.chromosome_name.clone(),
                    record.start_position.to_string(),
                    record.end_position.to_string(),
                    record.strand.to_string(),
                ];
                row.extend(record.extra.iter().cloned());
                row
            })
            .collect();
        Table::with_labels(labels, rows)
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

fn coerce_int(row: &[String], index: usize, column: &str) -> Result<i64, BiomartError> {
    let value = cell(row, index);
    value.parse().map_err(|_| BiomartError::Coerce {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Convenience layer running the default gene query through a session.
pub struct DefaultQueryRunner<'a, T: MartTransport> {
    session: &'a mut MartSession<T>,
}

impl<'a, T: MartTransport> DefaultQueryRunner<'a, T> {
    pub fn new(session: &'a mut MartSession<T>) -> Self {
        Self { session }
    }

    /// Prepends [`CORE_ATTRIBUTES`] to the extra attributes, runs the
    /// query and post-processes the result into a [`GeneTable`].
    pub fn run_default(
        &mut self,
        filters: &Filters,
        extra: &[String],
    ) -> Result<GeneTable, BiomartError> {
        let mut attributes: Vec<String> = CORE_ATTRIBUTES.iter().map(|a| a.to_string()).collect();
        attributes.extend(extra.iter().cloned());
        let table = self.session.run_query(filters, &attributes)?;
        GeneTable::from_table(&table, extra)
    }

    /// Selects the human gene dataset and runs the default query.
    pub fn human_default(
        &mut self,
        filters: &Filters,
        extra: &[String],
    ) -> Result<GeneTable, BiomartError> {
        self.session.set_mart(ENSEMBL_MART);
        self.session.set_dataset(HUMAN_DATASET)?;
        self.run_default(filters, extra)
    }

    /// Selects the mouse gene dataset and runs the default query.
    pub fn mouse_default(
        &mut self,
        filters: &Filters,
        extra: &[String],
    ) -> Result<GeneTable, BiomartError> {
        self.session.set_mart(ENSEMBL_MART);
        self.session.set_dataset(MOUSE_DATASET)?;
        self.run_default(filters, extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn record(chromosome: &str, start: i64, end: i64, strand: i32) -> GeneRecord {
        GeneRecord {
            ensembl_gene_id: "ENSG".to_string(),
            external_gene_name: "GENE".to_string(),
            chromosome_name: chromosome.to_string(),
            start_position: start,
            end_position: end,
            strand,
            extra: Vec::new(),
        }
    }

    fn table_of(records: Vec<GeneRecord>) -> GeneTable {
        GeneTable {
            records,
            extra_labels: Vec::new(),
        }
    }

    #[test]
    fn reverse_strand_sorts_on_end_position() {
        // The reverse-strand gene's TSS (its end, 50) precedes the
        // forward-strand gene's start at 100.
        let sorted = table_of(vec![
            record("1", 40, 100, 1),
            record("1", 10, 50, -1),
        ])
        .sort_on_starts();
        assert_eq!(sorted.records()[0].end_position, 50);
        assert_eq!(sorted.records()[1].start_position, 40);
    }

    #[test]
    fn chromosomes_sort_lexicographically() {
        let sorted = table_of(vec![
            record("2", 1, 2, 1),
            record("11", 1, 2, 1),
            record("1", 1, 2, 1),
        ])
        .sort_on_starts();
        let chromosomes: Vec<&str> = sorted
            .records()
            .iter()
            .map(|r| r.chromosome_name.as_str())
            .collect();
        assert_eq!(chromosomes, vec!["1", "11", "2"]);
    }

    #[test]
    fn sort_is_idempotent() {
        let table = table_of(vec![
            record("2", 5, 9, 1),
            record("1", 30, 70, -1),
            record("1", 20, 90, 1),
        ]);
        let once = table.sort_on_starts();
        let twice = once.clone().sort_on_starts();
        assert_eq!(once, twice);
    }

    #[test]
    fn rows_without_gene_name_are_dropped() {
        let table = Table::new(vec![
            str_row(&["ENSG1", "FH", "1", "10", "20", "1"]),
            str_row(&["ENSG2", "", "1", "30", "40", "1"]),
            str_row(&[""]),
        ]);
        let genes = GeneTable::from_table(&table, &[]).unwrap();
        assert_eq!(genes.len(), 1);
        assert_eq!(genes.records()[0].ensembl_gene_id, "ENSG1");
    }

    #[test]
    fn non_numeric_coordinate_is_a_coercion_error() {
        let table = Table::new(vec![str_row(&["ENSG1", "FH", "1", "oops", "20", "1"])]);
        let err = GeneTable::from_table(&table, &[]).unwrap_err();
        assert_matches!(err, BiomartError::Coerce { column, .. } if column == "start_position");
    }

    #[test]
    fn round_trips_extras_through_to_table() {
        let extra = vec!["hgnc_symbol".to_string()];
        let table = Table::new(vec![str_row(&["ENSG1", "FH", "1", "10", "20", "-1", "FH"])]);
        let genes = GeneTable::from_table(&table, &extra).unwrap();
        let rendered = genes.to_table();
        assert_eq!(rendered.labels().unwrap().len(), 7);
        assert_eq!(rendered.column("hgnc_symbol").unwrap(), vec!["FH"]);
        assert_eq!(rendered.column("strand").unwrap(), vec!["-1"]);
    }

    fn str_row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }
}
