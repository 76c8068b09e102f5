use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use biomart_client::error::BiomartError;
use biomart_client::genes::{CORE_ATTRIBUTES, DefaultQueryRunner};
use biomart_client::query::Filters;
use biomart_client::session::{DEFAULT_BASE_URL, MartSession};
use biomart_client::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "biomart")]
#[command(about = "Query Ensembl BioMart: discover marts, datasets, attributes and filters, run queries")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List available marts")]
    Marts,
    #[command(about = "List datasets for a mart")]
    Datasets(MartArgs),
    #[command(about = "List attributes for a dataset")]
    Attributes(DatasetArgs),
    #[command(about = "List filters for a dataset")]
    Filters(DatasetArgs),
    #[command(about = "Show the config tree for a dataset")]
    Configs(DatasetArgs),
    #[command(about = "Run a query and save the result as CSV")]
    Query(QueryArgs),
}

#[derive(Args)]
struct MartArgs {
    #[arg(long)]
    mart: String,
}

#[derive(Args)]
struct DatasetArgs {
    #[arg(long)]
    mart: String,

    #[arg(long)]
    dataset: String,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long)]
    mart: String,

    #[arg(long)]
    dataset: String,

    #[arg(long, help = "Filters as a JSON object, e.g. '{\"ensembl_gene_id\": \"ENSG...\"}'")]
    filters: Option<String>,

    #[arg(long, help = "Attributes as a comma-separated list")]
    attributes: Option<String>,

    #[arg(long, help = "Run the default gene query and sort by chromosome and TSS")]
    sort: bool,

    #[arg(long, default_value = "", help = "Output directory or file prefix")]
    out: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(biomart) = report.downcast_ref::<BiomartError>() {
            return ExitCode::from(map_exit_code(biomart));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BiomartError) -> u8 {
    if error.is_state() {
        return 2;
    }
    match error {
        BiomartError::InvalidFilterJson(_) => 2,
        BiomartError::Http(_) | BiomartError::Status { .. } | BiomartError::EmptyResponse(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let transport = HttpTransport::new().into_diagnostic()?;
    let mut session = MartSession::with_base_url(transport, &cli.url);

    match cli.command {
        Commands::Marts => {
            session.list_marts(true).into_diagnostic()?;
        }
        Commands::Datasets(args) => {
            session.set_mart(&args.mart);
            session.list_datasets(true).into_diagnostic()?;
        }
        Commands::Attributes(args) => {
            select(&mut session, &args)?;
            session.list_attributes(true).into_diagnostic()?;
        }
        Commands::Filters(args) => {
            select(&mut session, &args)?;
            session.list_filters(true).into_diagnostic()?;
        }
        Commands::Configs(args) => {
            select(&mut session, &args)?;
            session.list_configs(true).into_diagnostic()?;
        }
        Commands::Query(args) => run_query(&mut session, args)?,
    }
    Ok(())
}

fn select(session: &mut MartSession<HttpTransport>, args: &DatasetArgs) -> miette::Result<()> {
    session.set_mart(&args.mart);
    session.set_dataset(&args.dataset).into_diagnostic()?;
    Ok(())
}

fn run_query(session: &mut MartSession<HttpTransport>, args: QueryArgs) -> miette::Result<()> {
    session.set_mart(&args.mart);
    session.set_dataset(&args.dataset).into_diagnostic()?;

    let filters = match &args.filters {
        Some(raw) => Filters::from_json_str(raw).into_diagnostic()?,
        None => Filters::new(),
    };
    let attributes = split_attributes(args.attributes.as_deref());

    let table = if args.sort {
        // The default query already requests the core attributes; only
        // pass the remainder as extras.
        let extra: Vec<String> = attributes
            .iter()
            .filter(|a| !CORE_ATTRIBUTES.contains(&a.as_str()))
            .cloned()
            .collect();
        let mut runner = DefaultQueryRunner::new(session);
        runner
            .run_default(&filters, &extra)
            .into_diagnostic()?
            .sort_on_starts()
            .to_table()
    } else {
        session.run_query(&filters, &attributes).into_diagnostic()?
    };

    let saved = session.save_as_csv(&table, &args.out).into_diagnostic()?;
    println!("saved {saved}");
    Ok(())
}

fn split_attributes(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
