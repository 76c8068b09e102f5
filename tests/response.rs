use assert_matches::assert_matches;

use biomart_client::error::BiomartError;
use biomart_client::response::{
    ATTRIBUTE_LABELS, ConfigValue, DATASET_LABELS, FILTER_LABELS, parse_attributes, parse_config,
    parse_datasets, parse_filters, parse_marts, parse_query_result,
};

fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(format!("tests/fixtures/{name}")).unwrap()
}

#[test]
fn registry_parses_all_locations() {
    let marts = parse_marts(&fixture("registry.xml")).unwrap();
    assert_eq!(marts.len(), 3);

    let names: Vec<&str> = marts.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "ENSEMBL_MART_ENSEMBL",
            "ENSEMBL_MART_MOUSE",
            "ENSEMBL_MART_SEQUENCE"
        ]
    );
    assert_eq!(marts[0].display_name, "Ensembl Genes 110");
    assert_eq!(marts[0].path, "/biomart/martservice");
    assert_eq!(marts[2].visible, "0");
}

#[test]
fn registry_error_page_is_a_structured_error() {
    let err = parse_marts(b"<html><body>BioMart is down</body></html>").unwrap_err();
    assert_matches!(err, BiomartError::RegistryParse(_));
}

#[test]
fn config_tree_exposes_dataset_and_version() {
    let config = parse_config(&fixture("config_fcatus.xml")).unwrap();
    assert_eq!(config.attr("@dataset"), Some("fcatus_gene_ensembl"));
    assert_eq!(config.attr("@version"), Some("Felis_catus_9.0"));

    let keys: Vec<&str> = config.keys().collect();
    assert!(keys.contains(&"Exportable"));
    assert!(keys.contains(&"Importable"));
    assert!(keys.contains(&"MainTable"));

    // The two MainTable siblings collapse into one list entry.
    match config.get("MainTable").unwrap() {
        ConfigValue::List(items) => {
            assert_eq!(items.len(), 2);
            assert_eq!(
                items[0],
                ConfigValue::Text("fcatus_gene_ensembl__gene__main".to_string())
            );
        }
        other => panic!("expected a list, got {other:?}"),
    }

    // Nested elements keep their attributes under @-keys.
    match config.get("FilterPage").unwrap() {
        ConfigValue::Node(page) => {
            assert_eq!(page.attr("@internalName"), Some("filters"));
            assert!(page.get("FilterGroup").is_some());
        }
        other => panic!("expected a node, got {other:?}"),
    }
}

#[test]
fn dataset_listing_drops_the_leading_field() {
    let table = parse_datasets(&fixture("datasets.tsv")).unwrap();
    assert_eq!(table.labels().unwrap(), &DATASET_LABELS.map(String::from));
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows()[0][0], "fcatus_gene_ensembl");
    assert_eq!(table.column("date").unwrap()[0], "2023-04-28");
}

#[test]
fn dataset_labels_are_distinct() {
    let mut labels = DATASET_LABELS.to_vec();
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), DATASET_LABELS.len());
}

#[test]
fn attribute_listing_keeps_all_fields() {
    let table = parse_attributes(&fixture("attributes.tsv")).unwrap();
    assert_eq!(table.labels().unwrap(), &ATTRIBUTE_LABELS.map(String::from));
    assert_eq!(table.rows()[0][0], "ensembl_gene_id");
    assert_eq!(table.column("id").unwrap()[1], "name_1059");
}

#[test]
fn filter_listing_keeps_all_fields() {
    let table = parse_filters(&fixture("filters.tsv")).unwrap();
    assert_eq!(table.labels().unwrap(), &FILTER_LABELS.map(String::from));
    assert_eq!(table.column("name").unwrap()[0], "chromosome_name");
    assert_eq!(table.column("qualifiers").unwrap()[1], ">=");
}

#[test]
fn query_result_with_trailing_newline_has_one_row_per_line() {
    let attributes = vec!["ensembl_gene_id".to_string(), "hgnc_symbol".to_string()];
    let table = parse_query_result(&fixture("query_two_genes.tsv"), &attributes).unwrap();
    // Two semantic data lines plus the trailing empty line: three rows.
    assert_eq!(table.len(), 3);
    assert_eq!(table.labels().unwrap(), attributes.as_slice());
}

#[test]
fn multi_attribute_labels_match_request_order() {
    let attributes = vec![
        "uniprotswissprot".to_string(),
        "ensembl_gene_id".to_string(),
        "hgnc_symbol".to_string(),
    ];
    let table = parse_query_result(b"P07954\tENSG00000091483\tFH\n", &attributes).unwrap();
    assert_eq!(table.labels().unwrap(), attributes.as_slice());
    assert_eq!(table.column("hgnc_symbol").unwrap()[0], "FH");
}

#[test]
fn invalid_utf8_is_a_structured_error() {
    assert_matches!(
        parse_query_result(&[0xff, 0xfe, 0x00], &[]),
        Err(BiomartError::Utf8(_))
    );
}
