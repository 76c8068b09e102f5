//! Parsers for the response shapes the BioMart service produces: the XML
//! mart registry, the tab-separated dataset/attribute/filter listings, the
//! XML dataset config tree and the tab-separated query result.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Deserialize;

use crate::error::BiomartError;
use crate::table::Table;

/// Column labels of the dataset listing, after the leading field of every
/// wire line is dropped. Columns five through seven are undocumented by the
/// service; they carry placeholder labels.
pub const DATASET_LABELS: [&str; 8] = [
    "name",
    "description",
    "number",
    "id",
    "unknown_col1",
    "unknown_col2",
    "unknown_col3",
    "date",
];

pub const ATTRIBUTE_LABELS: [&str; 7] = [
    "name",
    "description",
    "values",
    "text_filters",
    "qualifiers",
    "label",
    "id",
];

pub const FILTER_LABELS: [&str; 9] = [
    "name",
    "description",
    "values",
    "unknown",
    "text_filters",
    "data_type",
    "qualifiers",
    "label",
    "id",
];

/// One `MartURLLocation` descriptor from the registry listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Mart {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@database", default)]
    pub database: String,
    #[serde(rename = "@displayName", default)]
    pub display_name: String,
    #[serde(rename = "@host", default)]
    pub host: String,
    #[serde(rename = "@path", default)]
    pub path: String,
    #[serde(rename = "@port", default)]
    pub port: String,
    #[serde(rename = "@serverVirtualSchema", default)]
    pub server_virtual_schema: String,
    #[serde(rename = "@visible", default)]
    pub visible: String,
    #[serde(rename = "@default", default)]
    pub default: String,
    #[serde(rename = "@includeDatasets", default)]
    pub include_datasets: String,
    #[serde(rename = "@martUser", default)]
    pub mart_user: String,
}

impl Mart {
    /// Attribute name/value pairs in wire order, for human-readable output.
    pub fn fields(&self) -> [(&'static str, &str); 11] {
        [
            ("name", &self.name),
            ("database", &self.database),
            ("displayName", &self.display_name),
            ("host", &self.host),
            ("path", &self.path),
            ("port", &self.port),
            ("serverVirtualSchema", &self.server_virtual_schema),
            ("visible", &self.visible),
            ("default", &self.default),
            ("includeDatasets", &self.include_datasets),
            ("martUser", &self.mart_user),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct MartRegistryXml {
    #[serde(rename = "MartURLLocation", default)]
    locations: Vec<Mart>,
}

/// Parses the registry listing. A response without the expected nesting
/// (for example an HTML error page) is a structured error, never a panic.
pub fn parse_marts(bytes: &[u8]) -> Result<Vec<Mart>, BiomartError> {
    let text = decode(bytes)?;
    let registry: MartRegistryXml = quick_xml::de::from_str(text)
        .map_err(|err| BiomartError::RegistryParse(err.to_string()))?;
    if registry.locations.is_empty() {
        return Err(BiomartError::RegistryParse(
            "registry lists no MartURLLocation entries".to_string(),
        ));
    }
    Ok(registry.locations)
}

/// A value in the config tree: element text, a nested node, or the
/// collapsed list of repeated sibling elements.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Text(String),
    Node(ConfigNode),
    List(Vec<ConfigValue>),
}

/// Nested mapping over a config XML element: attributes are keyed `@name`,
/// child elements by element name, repeated names collapse into a list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigNode {
    entries: IndexMap<String, ConfigValue>,
}

impl ConfigNode {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// Text value under a key, typically an `@attribute` entry.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            ConfigValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, value: ConfigValue) {
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(key, value);
            }
            Some(ConfigValue::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, ConfigValue::List(Vec::new()));
                if let ConfigValue::List(items) = existing {
                    items.push(first);
                    items.push(value);
                }
            }
        }
    }
}

/// Parses the config-tree response and returns the `DatasetConfig` node.
/// Any other root element is a structured error.
pub fn parse_config(bytes: &[u8]) -> Result<ConfigNode, BiomartError> {
    let text = decode(bytes)?;
    let (name, value) = parse_xml_tree(text)?
        .ok_or_else(|| BiomartError::ConfigParse("document holds no root element".to_string()))?;
    if name != "DatasetConfig" {
        return Err(BiomartError::ConfigParse(format!(
            "expected DatasetConfig root, found {name}"
        )));
    }
    match value {
        ConfigValue::Node(node) => Ok(node),
        ConfigValue::Text(_) | ConfigValue::List(_) => Err(BiomartError::ConfigParse(
            "DatasetConfig carries no attributes or child elements".to_string(),
        )),
    }
}

fn parse_xml_tree(text: &str) -> Result<Option<(String, ConfigValue)>, BiomartError> {
    let mut reader = Reader::from_str(text);
    // name, accumulated node, accumulated text
    let mut stack: Vec<(String, ConfigNode, String)> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = element_name(&start);
                let node = node_from_attrs(&start)?;
                stack.push((name, node, String::new()));
            }
            Ok(Event::Empty(start)) => {
                let name = element_name(&start);
                let node = node_from_attrs(&start)?;
                attach(&mut stack, &mut root, name, finish(node, ""));
            }
            Ok(Event::Text(text)) => {
                if let Some((_, _, buffer)) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|err| BiomartError::ConfigParse(err.to_string()))?;
                    buffer.push_str(unescaped.trim());
                }
            }
            Ok(Event::End(_)) => {
                let (name, node, text) = stack.pop().ok_or_else(|| {
                    BiomartError::ConfigParse("unbalanced closing element".to_string())
                })?;
                attach(&mut stack, &mut root, name, finish(node, &text));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(BiomartError::ConfigParse(err.to_string())),
        }
    }
    Ok(root)
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn node_from_attrs(start: &BytesStart<'_>) -> Result<ConfigNode, BiomartError> {
    let mut node = ConfigNode::default();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| BiomartError::ConfigParse(err.to_string()))?;
        let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
        let value = attr
            .unescape_value()
            .map_err(|err| BiomartError::ConfigParse(err.to_string()))?
            .into_owned();
        node.insert(key, ConfigValue::Text(value));
    }
    Ok(node)
}

fn finish(mut node: ConfigNode, text: &str) -> ConfigValue {
    if node.is_empty() {
        return ConfigValue::Text(text.to_string());
    }
    if !text.is_empty() {
        node.insert("#text".to_string(), ConfigValue::Text(text.to_string()));
    }
    ConfigValue::Node(node)
}

fn attach(
    stack: &mut [(String, ConfigNode, String)],
    root: &mut Option<(String, ConfigValue)>,
    name: String,
    value: ConfigValue,
) {
    if let Some((_, parent, _)) = stack.last_mut() {
        parent.insert(name, value);
    } else if root.is_none() {
        *root = Some((name, value));
    }
}

pub fn parse_datasets(bytes: &[u8]) -> Result<Table, BiomartError> {
    parse_listing(bytes, &DATASET_LABELS, true)
}

pub fn parse_attributes(bytes: &[u8]) -> Result<Table, BiomartError> {
    parse_listing(bytes, &ATTRIBUTE_LABELS, false)
}

pub fn parse_filters(bytes: &[u8]) -> Result<Table, BiomartError> {
    parse_listing(bytes, &FILTER_LABELS, false)
}

// Lines with fewer than two tab-separated fields are blank or trailing
// noise and are skipped.
fn parse_listing(
    bytes: &[u8],
    labels: &[&str],
    drop_first_field: bool,
) -> Result<Table, BiomartError> {
    let text = decode(bytes)?;
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() < 2 {
            continue;
        }
        let start = usize::from(drop_first_field);
        rows.push(fields[start..].iter().map(|cell| cell.to_string()).collect());
    }
    Ok(Table::with_labels(
        labels.iter().map(|label| label.to_string()).collect(),
        rows,
    ))
}

/// Parses a query result. Unlike the listings, every line becomes a row,
/// including a trailing empty line from a trailing newline. Column labels
/// are the requested attribute names, attached only when more than one
/// attribute was requested; cells stay strings.
pub fn parse_query_result(bytes: &[u8], attributes: &[String]) -> Result<Table, BiomartError> {
    let text = decode(bytes)?;
    let rows: Vec<Vec<String>> = text
        .split('\n')
        .map(|line| line.trim().split('\t').map(str::to_string).collect())
        .collect();
    if attributes.len() > 1 {
        Ok(Table::with_labels(attributes.to_vec(), rows))
    } else {
        Ok(Table::new(rows))
    }
}

fn decode(bytes: &[u8]) -> Result<&str, BiomartError> {
    std::str::from_utf8(bytes).map_err(|err| BiomartError::Utf8(err.to_string()))
}
