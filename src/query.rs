use indexmap::IndexMap;
use serde_json::Value;

use crate::error::BiomartError;

/// A filter value: a scalar, or an ordered list rendered comma-joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FilterValue {
    pub fn render(&self) -> String {
        match self {
            FilterValue::Scalar(value) => value.clone(),
            FilterValue::List(values) => values.join(","),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Scalar(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::List(values)
    }
}

/// Ordered filter mapping. Iteration order is insertion order and affects
/// only how filters are serialized into the query, never query semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    entries: IndexMap<String, FilterValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Parses a JSON object into filters, e.g. from a CLI `--filters` flag.
    /// Strings, numbers and booleans become scalars; arrays become lists.
    pub fn from_json_str(raw: &str) -> Result<Self, BiomartError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| BiomartError::InvalidFilterJson(err.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| BiomartError::InvalidFilterJson("expected a JSON object".to_string()))?;

        let mut filters = Filters::new();
        for (name, value) in object {
            match value {
                Value::Array(items) => {
                    let rendered = items
                        .iter()
                        .map(|item| {
                            render_json_scalar(item).ok_or_else(|| {
                                BiomartError::InvalidFilterJson(format!(
                                    "filter {name} holds a non-scalar array element"
                                ))
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    filters.insert(name.clone(), FilterValue::List(rendered));
                }
                other => {
                    let rendered = render_json_scalar(other).ok_or_else(|| {
                        BiomartError::InvalidFilterJson(format!(
                            "filter {name} must be a scalar or an array of scalars"
                        ))
                    })?;
                    filters.insert(name.clone(), rendered);
                }
            }
        }
        Ok(filters)
    }
}

fn render_json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn render_filters(filters: &Filters) -> String {
    let mut out = String::new();
    for (name, value) in filters.iter() {
        out.push_str(&format!(
            "<Filter name = \"{name}\" value = \"{}\" />",
            value.render()
        ));
    }
    out
}

pub fn render_attributes(attributes: &[String]) -> String {
    let mut out = String::new();
    for name in attributes {
        out.push_str(&format!("<Attribute name = \"{name}\" />"));
    }
    out
}

/// Builds the full query URL for a dataset, filters and attributes.
///
/// The query parameter is the fixed BioMart micro-XML dialect, spacing
/// included. Names and values are embedded as-is: callers must not supply
/// values containing characters that would break the embedded XML.
pub fn build_query(
    base_url: &str,
    dataset: &str,
    filters: &Filters,
    attributes: &[String],
) -> String {
    format!(
        "{base_url}martservice?query=<?xml version=\"1.0\" encoding=\"UTF-8\"?><!DOCTYPE Query>\
         <Query virtualSchemaName = \"default\" formatter = \"TSV\" header = \"0\" \
         uniqueRows = \"0\" count = \"\" datasetConfigVersion = \"0.6\" >\
         <Dataset name = \"{dataset}\" interface = \"default\" >{}{}</Dataset></Query>",
        render_filters(filters),
        render_attributes(attributes),
    )
}
