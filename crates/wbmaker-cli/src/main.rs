//! wbmaker CLI
//!
//! Command-line access to a Wikibase instance:
//! - Running SPARQL SELECTs and listing the property map
//! - Hierarchy paths between a class and one of its ancestors
//! - Filling wiki templates from SPARQL or item data
//! - Producing `wbeditentity` payloads from item descriptions

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use wbmaker::config::{DEFAULT_CONFIG_FILE, DEFAULT_SECTION};
use wbmaker::item::{item_data_template, ItemData};
use wbmaker::{DataToInfo, SparqlExecutor, Wb, WbConfig};
use wbmaker_hierarchy::{HierarchyAnalyzer, PathQuery, DEFAULT_MAX_PATHS};

mod output;

#[derive(Parser)]
#[command(name = "wbmaker")]
#[command(author, version, about = "wbmaker: structured data helpers for Wikibase")]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Section of the configuration file to use.
    #[arg(long, global = true, default_value = DEFAULT_SECTION)]
    section: String,

    /// Use public Wikidata instead of a configuration file.
    #[arg(long, global = true)]
    wikidata: bool,

    /// Debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a SPARQL SELECT read from a file (`-` for stdin).
    Query {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = QueryOutput::Table)]
        output: QueryOutput,
    },

    /// List the instance's properties (id, label, datatype).
    Props,

    /// Shortest (and optionally best-annotated) subclass path between two classes.
    Path {
        /// Start entity id, e.g. `Q5`.
        #[arg(long)]
        start: String,
        /// Ancestor entity id (default: the configured top class).
        #[arg(long)]
        end: Option<String>,
        /// Also search for the path with the most local links.
        #[arg(long)]
        alternate: bool,
        #[arg(long, default_value_t = DEFAULT_MAX_PATHS)]
        max_paths: usize,
        /// JSON object mapping entity ids to local identifiers.
        #[arg(long)]
        lookup: Option<PathBuf>,
        /// Print the analysis as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render a wikitext template call for an item.
    FillTemplate {
        #[arg(long)]
        qid: String,
        /// Template name, with or without `Template:`.
        #[arg(long)]
        template: String,
        /// SPARQL file selecting `?param ?value`; `{qid}` is substituted.
        #[arg(long, conflicts_with = "mapping")]
        sparql: Option<PathBuf>,
        /// `param=P123` pairs read from the item's claims.
        #[arg(long, value_parser = parse_mapping, required_unless_present = "sparql")]
        mapping: Vec<(String, String)>,
        /// Also print the template's current source.
        #[arg(long)]
        show_source: bool,
    },

    /// Build a `wbeditentity` payload from an item description (JSON).
    Item {
        #[arg(required_unless_present = "skeleton")]
        input: Option<PathBuf>,
        /// Print an empty item description instead.
        #[arg(long)]
        skeleton: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QueryOutput {
    Table,
    Json,
    Lookup,
}

fn parse_mapping(raw: &str) -> std::result::Result<(String, String), String> {
    let (param, pid) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PARAM=PID, got `{raw}`"))?;
    let (param, pid) = (param.trim(), pid.trim());
    if param.is_empty() || pid.is_empty() {
        return Err(format!("expected PARAM=PID, got `{raw}`"));
    }
    Ok((param.to_string(), pid.to_string()))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Query { input, output } => cmd_query(&cli, input, *output),
        Commands::Props => cmd_props(&cli),
        Commands::Path {
            start,
            end,
            alternate,
            max_paths,
            lookup,
            json,
        } => {
            let mut query = PathQuery::new(start.as_str())
                .alternate(*alternate)
                .max_paths(*max_paths);
            if let Some(end) = end {
                query = query.to(end.as_str());
            }
            cmd_path(&cli, &query, lookup.as_deref(), *json)
        }
        Commands::FillTemplate {
            qid,
            template,
            sparql,
            mapping,
            show_source,
        } => cmd_fill_template(&cli, qid, template, sparql.as_deref(), mapping, *show_source),
        Commands::Item { input, skeleton } => {
            if *skeleton {
                println!("{}", serde_json::to_string_pretty(&item_data_template())?);
                return Ok(());
            }
            let input = input.as_deref().ok_or_else(|| anyhow!("no input file"))?;
            cmd_item(&cli, input)
        }
    }
}

fn load_wb(cli: &Cli) -> Result<Wb> {
    let config = if cli.wikidata {
        let mut config = WbConfig::wikidata();
        config.apply_env_overrides();
        config
    } else {
        WbConfig::load(&cli.config, &cli.section).with_context(|| {
            format!(
                "failed to load section [{}] of {}",
                cli.section,
                cli.config.display()
            )
        })?
    };
    tracing::debug!(?config, "configuration loaded");
    Ok(Wb::new(config, false)?)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn cmd_query(cli: &Cli, input: &Path, output: QueryOutput) -> Result<()> {
    let query = read_input(input)?;
    let wb = load_wb(cli)?;
    let Some(table) = wb.sparql().select_table(&query)? else {
        eprintln!("{} query returned no results", "warn".yellow().bold());
        return Ok(());
    };
    let rows = table.len();
    match output {
        QueryOutput::Table => println!("{}", output::table_tsv(&table)),
        QueryOutput::Json => println!("{}", serde_json::to_string_pretty(&table.rows)?),
        QueryOutput::Lookup => {
            let lookup = output::sorted_lookup(table.into_lookup());
            println!("{}", serde_json::to_string_pretty(&lookup)?);
        }
    }
    eprintln!("{} {} rows", "ok".green().bold(), rows);
    Ok(())
}

fn cmd_props(cli: &Cli) -> Result<()> {
    let wb = load_wb(cli)?;
    let props = wb.property_map().context("failed to fetch the property map")?;
    for line in output::property_lines(&props) {
        println!("{line}");
    }
    eprintln!("{} {} properties", "ok".green().bold(), props.len());
    Ok(())
}

fn cmd_path(cli: &Cli, query: &PathQuery, lookup: Option<&Path>, json: bool) -> Result<()> {
    let lookup: HashMap<String, String> = match lookup {
        Some(path) => serde_json::from_str(&read_input(path)?)
            .with_context(|| format!("{} is not a JSON object of strings", path.display()))?,
        None => HashMap::new(),
    };
    let wb = load_wb(cli)?;
    let analyzer = HierarchyAnalyzer::for_wb(&wb);
    let analysis = analyzer
        .diagnose(query, &lookup)
        .map_err(|reason| anyhow!("no hierarchy path for {}: {reason}", query.start))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}", output::path_report(&analysis));
        if query.want_alternate && !analysis.has_alternate() {
            eprintln!(
                "{} no examined path has more than one local link",
                "note".yellow().bold()
            );
        }
    }
    Ok(())
}

fn cmd_fill_template(
    cli: &Cli,
    qid: &str,
    template: &str,
    sparql: Option<&Path>,
    mapping: &[(String, String)],
    show_source: bool,
) -> Result<()> {
    let wb = load_wb(cli)?;
    let info = DataToInfo::new(&wb);

    if show_source {
        match info.get_wikipedia_template(template)? {
            Some(source) => eprintln!("{}\n{source}", "template source".cyan().bold()),
            None => eprintln!("{} template {template} not found", "warn".yellow().bold()),
        }
    }

    let filled = match sparql {
        Some(path) => {
            let query = read_input(path)?;
            info.fill_template_from_sparql(qid, template, &query)?
        }
        None => info.fill_template_from_item_data(qid, template, mapping)?,
    };
    match filled {
        Some(text) => println!("{text}"),
        None => bail!("no template parameters found for {qid}"),
    }
    Ok(())
}

fn cmd_item(cli: &Cli, input: &Path) -> Result<()> {
    let data: ItemData = serde_json::from_str(&read_input(input)?)
        .with_context(|| format!("{} is not a valid item description", input.display()))?;
    let wb = load_wb(cli)?;
    let document = wb.build_item(&data)?;
    println!("{}", serde_json::to_string_pretty(&document.edit_payload()?)?);
    match &data.qid {
        Some(qid) if !qid.is_empty() => {
            eprintln!("{} edit payload for {}", "ok".green().bold(), qid.bold())
        }
        _ => eprintln!("{} payload for a new item", "ok".green().bold()),
    }
    Ok(())
}
