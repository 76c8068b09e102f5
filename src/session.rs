use camino::Utf8PathBuf;
use tracing::{error, warn};

use crate::error::BiomartError;
use crate::query::{Filters, build_query};
use crate::response::{
    ConfigNode, ConfigValue, Mart, parse_attributes, parse_config, parse_datasets, parse_filters,
    parse_marts, parse_query_result,
};
use crate::table::Table;
use crate::transport::MartTransport;

pub const DEFAULT_BASE_URL: &str = "http://www.ensembl.org/biomart/";

/// Stateful wrapper over a transport, holding the selected mart and dataset.
///
/// Dataset, attribute, filter, config and query operations check that a mart
/// (and where required a dataset) has been selected before any network call
/// is made; a failed check returns the state-precondition error channel
/// ([`BiomartError::is_state`]) without touching the transport.
///
/// A session is independently owned and not meant for shared concurrent
/// use; callers wanting concurrency create independent sessions.
pub struct MartSession<T: MartTransport> {
    transport: T,
    base_url: String,
    mart: Option<String>,
    dataset: Option<String>,
    dataset_version: String,
    last_result: Option<Table>,
}

impl<T: MartTransport> MartSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_base_url(transport, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(transport: T, base_url: &str) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Self {
            transport,
            base_url,
            mart: None,
            dataset: None,
            dataset_version: String::new(),
            last_result: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn mart(&self) -> Option<&str> {
        self.mart.as_deref()
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    /// `{dataset}-{config version}`, stamped by [`set_dataset`]; empty until
    /// a dataset has been selected. Used to namestamp saved files.
    ///
    /// [`set_dataset`]: MartSession::set_dataset
    pub fn dataset_version(&self) -> &str {
        &self.dataset_version
    }

    /// The result of the most recent query or cached listing.
    pub fn last_result(&self) -> Option<&Table> {
        self.last_result.as_ref()
    }

    pub fn set_mart(&mut self, mart: &str) {
        if let Some(current) = &self.mart {
            warn!("overriding current mart {current} with {mart}");
        }
        self.mart = Some(mart.to_string());
    }

    /// Selects a dataset and derives `dataset_version` from the dataset's
    /// config tree. The assignment sticks even when the config fetch fails;
    /// the mart check happens lazily inside that fetch.
    pub fn set_dataset(&mut self, dataset: &str) -> Result<(), BiomartError> {
        if let Some(current) = &self.dataset {
            warn!("overriding current dataset {current} with {dataset}");
        }
        self.dataset = Some(dataset.to_string());
        let config = self.list_configs(false)?;
        if let Some(version) = config.attr("@version") {
            if !version.is_empty() {
                self.dataset_version = format!("{dataset}-{version}");
            }
        }
        Ok(())
    }

    /// Lists the marts the service exposes. Needs no selected state and is
    /// not cached.
    pub fn list_marts(&self, print_values: bool) -> Result<Vec<Mart>, BiomartError> {
        let url = format!("{}martservice?type=registry", self.base_url);
        let marts = parse_marts(&self.fetch(&url)?)?;
        if print_values {
            for mart in &marts {
                println!("Database: {}", mart.database);
                for (name, value) in mart.fields() {
                    println!("{name}: {value}");
                }
            }
        }
        Ok(marts)
    }

    /// Lists the datasets of the selected mart; the result is cached as
    /// the session's last result.
    pub fn list_datasets(&mut self, print_values: bool) -> Result<Table, BiomartError> {
        let mart = self.check_mart()?;
        let url = format!("{}martservice?type=datasets&mart={mart}", self.base_url);
        let table = parse_datasets(&self.fetch(&url)?)?;
        if print_values {
            print_table(&table);
        }
        self.last_result = Some(table.clone());
        Ok(table)
    }

    /// Lists the attributes of the selected dataset; cached.
    pub fn list_attributes(&mut self, print_values: bool) -> Result<Table, BiomartError> {
        let (mart, dataset) = self.check_mart_and_dataset()?;
        let url = format!(
            "{}martservice?type=attributes&dataset={dataset}&mart={mart}",
            self.base_url
        );
        let table = parse_attributes(&self.fetch(&url)?)?;
        if print_values {
            print_table(&table);
        }
        self.last_result = Some(table.clone());
        Ok(table)
    }

    /// Lists the filters of the selected dataset; cached.
    pub fn list_filters(&mut self, print_values: bool) -> Result<Table, BiomartError> {
        let (mart, dataset) = self.check_mart_and_dataset()?;
        let url = format!(
            "{}martservice?type=filters&dataset={dataset}&mart={mart}",
            self.base_url
        );
        let table = parse_filters(&self.fetch(&url)?)?;
        if print_values {
            print_table(&table);
        }
        self.last_result = Some(table.clone());
        Ok(table)
    }

    /// Fetches the config tree of the selected dataset. Not cached.
    pub fn list_configs(&self, print_values: bool) -> Result<ConfigNode, BiomartError> {
        let (mart, dataset) = self.check_mart_and_dataset()?;
        let url = format!(
            "{}martservice?type=configuration&dataset={dataset}&mart={mart}",
            self.base_url
        );
        let config = parse_config(&self.fetch(&url)?)?;
        if print_values {
            if let Some(dataset) = config.attr("@dataset") {
                println!("Dataset: {dataset}");
            }
            for (key, value) in config.entries() {
                println!("{key}: {}", summarize(value));
            }
        }
        Ok(config)
    }

    /// Runs a filtered attribute-selection query against the selected
    /// dataset and caches the resulting table as the last result.
    pub fn run_query(
        &mut self,
        filters: &Filters,
        attributes: &[String],
    ) -> Result<Table, BiomartError> {
        let (_, dataset) = self.check_mart_and_dataset()?;
        let url = build_query(&self.base_url, &dataset, filters, attributes);
        let table = parse_query_result(&self.fetch(&url)?, attributes)?;
        self.last_result = Some(table.clone());
        Ok(table)
    }

    /// Writes a table to `{prefix}{dataset_version}.csv` and returns the
    /// path written.
    pub fn save_as_csv(
        &self,
        table: &Table,
        path_prefix: &str,
    ) -> Result<Utf8PathBuf, BiomartError> {
        let path = Utf8PathBuf::from(format!("{path_prefix}{}.csv", self.dataset_version));
        table.write_csv(&path)?;
        Ok(path)
    }

    fn check_mart(&self) -> Result<String, BiomartError> {
        match &self.mart {
            Some(mart) => Ok(mart.clone()),
            None => {
                warn!("no mart selected: call set_mart before this operation");
                Err(BiomartError::MartNotSet)
            }
        }
    }

    fn check_mart_and_dataset(&self) -> Result<(String, String), BiomartError> {
        let mart = self.check_mart()?;
        match &self.dataset {
            Some(dataset) => Ok((mart, dataset.clone())),
            None => {
                warn!("no dataset selected: call set_dataset before this operation");
                Err(BiomartError::DatasetNotSet)
            }
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, BiomartError> {
        match self.transport.fetch(url) {
            Ok(bytes) if bytes.is_empty() => {
                warn!(url, "empty response");
                Err(BiomartError::EmptyResponse(url.to_string()))
            }
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                error!(url, "biomart request failed: {err}");
                Err(err)
            }
        }
    }
}

fn print_table(table: &Table) {
    for row in table.rows() {
        println!("{}", row.join("\t"));
    }
}

fn summarize(value: &ConfigValue) -> String {
    match value {
        ConfigValue::Text(text) => text.clone(),
        ConfigValue::Node(node) => format!("[{} entries]", node.len()),
        ConfigValue::List(items) => format!("[{} elements]", items.len()),
    }
}
