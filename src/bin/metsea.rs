use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use metsea::app::{
    App, EnrichResult, FetchOptions, FetchResult, NetworkResult, NetworkSelection, ProgressSink,
    StatusResult, load_query,
};
use metsea::config::{ConfigLoader, ResolvedConfig, ResolvedQuery};
use metsea::domain::{AdjustMethod, CompoundId, Organism, PathwayId};
use metsea::error::MetseaError;
use metsea::kegg::{KeggClient, KeggHttpClient};
use metsea::output::{ConsoleSink, JsonOutput, OutputMode, write_enrichment_csv, write_pairs_csv};
use metsea::plot::{bar_plot, dot_plot, network_plot};
use metsea::store::Store;

#[derive(Parser)]
#[command(name = "metsea")]
#[command(about = "KEGG metabolite set enrichment analysis (pathway scoring, networks, plots)")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download the KEGG pathway tables into the cache")]
    Fetch(FetchArgs),
    #[command(about = "Score a compound query against the pathway catalog")]
    Enrich(EnrichArgs),
    #[command(about = "Pairwise shared-compound analysis over pathways")]
    Network(NetworkArgs),
    #[command(about = "Show store locations and cached tables")]
    Status,
    #[command(about = "Clear the project store")]
    Clear(ClearArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long)]
    organism: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct EnrichArgs {
    #[arg(long)]
    organism: Option<String>,

    #[arg(long)]
    query: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    adjust: Option<AdjustMethod>,

    #[arg(long)]
    alpha: Option<f64>,

    #[arg(long)]
    min_shared: Option<usize>,

    #[arg(long)]
    out: Option<String>,

    #[arg(long)]
    plots: bool,

    #[arg(long)]
    network: bool,

    #[arg(long)]
    offline: bool,

    #[arg(long)]
    refresh: bool,
}

#[derive(Args)]
struct NetworkArgs {
    #[arg(long)]
    organism: Option<String>,

    #[arg(long)]
    pathways: Option<String>,

    #[arg(long)]
    query: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    adjust: Option<AdjustMethod>,

    #[arg(long)]
    alpha: Option<f64>,

    #[arg(long)]
    min_shared: Option<usize>,

    #[arg(long)]
    out: Option<String>,

    #[arg(long)]
    plots: bool,

    #[arg(long)]
    offline: bool,

    #[arg(long)]
    refresh: bool,
}

#[derive(Args)]
struct ClearArgs {
    #[arg(long)]
    cache: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MetseaError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MetseaError) -> u8 {
    match error {
        MetseaError::InvalidCompoundId(_)
        | MetseaError::InvalidPathwayId(_)
        | MetseaError::InvalidOrganism(_)
        | MetseaError::InvalidAdjustMethod(_)
        | MetseaError::InvalidMinShared(_)
        | MetseaError::InvalidPValue(_)
        | MetseaError::MissingOrganism
        | MetseaError::MissingQuery
        | MetseaError::ConfigRead(_)
        | MetseaError::ConfigParse(_)
        | MetseaError::QueryRead(_)
        | MetseaError::TableNotCached(_) => 2,
        MetseaError::KeggHttp(_) | MetseaError::KeggStatus { .. } => 3,
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
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let store = Store::new()?;

    match cli.command {
        Some(Commands::Fetch(args)) => run_fetch(args, store, output_mode),
        Some(Commands::Enrich(args)) => run_enrich(args, store, output_mode),
        Some(Commands::Network(args)) => run_network(args, store, output_mode),
        Some(Commands::Status) => run_status(store, output_mode),
        Some(Commands::Clear(args)) => run_clear(args, store, output_mode),
        None => {
            // A bare `metsea` runs the configured analysis when metsea.json
            // carries enough to do so.
            let configured = matches!(output_mode, OutputMode::Interactive)
                && matches!(
                    ConfigLoader::resolve(None),
                    Ok(resolved) if resolved.organism.is_some() && resolved.query.is_some()
                );
            if configured {
                run_enrich(
                    EnrichArgs {
                        organism: None,
                        query: None,
                        config: None,
                        adjust: None,
                        alpha: None,
                        min_shared: None,
                        out: None,
                        plots: false,
                        network: false,
                        offline: false,
                        refresh: false,
                    },
                    store,
                    output_mode,
                )
            } else {
                Err(miette::Report::msg(
                    "command required (try `metsea --help`)",
                ))
            }
        }
    }
}

fn run_fetch(args: FetchArgs, store: Store, output_mode: OutputMode) -> miette::Result<()> {
    let resolved = ConfigLoader::resolve(args.config.as_deref())?;
    let organism = resolve_organism(args.organism.as_deref(), &resolved)?;
    let options = FetchOptions {
        force: args.force,
        offline: false,
    };

    let kegg = KeggHttpClient::new()?;
    let app = App::new(store, kegg);

    let console = ConsoleSink::new();
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &console,
    };

    let result = app.fetch_catalog(&organism, &options, sink)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_fetch(&result).into_diagnostic()?,
        OutputMode::Interactive => print_fetch_summary(&result),
    }
    Ok(())
}

fn run_enrich(args: EnrichArgs, store: Store, output_mode: OutputMode) -> miette::Result<()> {
    let EnrichArgs {
        organism,
        query,
        config,
        adjust,
        alpha,
        min_shared,
        out,
        plots,
        network,
        offline,
        refresh,
    } = args;

    let resolved = ConfigLoader::resolve(config.as_deref())?;
    let organism = resolve_organism(organism.as_deref(), &resolved)?;
    let query = resolve_query(query.as_deref(), &resolved)?;
    let adjust = adjust.unwrap_or(resolved.adjust);
    let alpha = resolve_alpha(alpha, &resolved)?;
    let min_shared = resolve_min_shared(min_shared, &resolved)?;
    let options = FetchOptions {
        force: refresh,
        offline,
    };

    let kegg = KeggHttpClient::new()?;
    let app = App::new(store, kegg);
    let out_dir = resolve_out_dir(out.as_deref(), &resolved, app.store());

    let console = ConsoleSink::new();
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &console,
    };

    let result = app.enrich(&organism, &query, adjust, &options, sink)?;

    let mut written: Vec<Utf8PathBuf> = Vec::new();
    if !result.rows.is_empty() {
        let table_path = out_dir.join("enrichment.csv");
        write_enrichment_csv(&table_path, &result.rows)?;
        written.push(table_path);
        if plots {
            written.push(bar_plot(&result.rows, &out_dir)?);
            written.push(dot_plot(&result.rows, &out_dir)?);
        }
    }

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_enrich(&result).into_diagnostic()?,
        OutputMode::Interactive => print_enrich_summary(&result, alpha),
    }

    if network {
        let significant: Vec<PathwayId> = result
            .rows
            .iter()
            .filter(|row| row.adjusted_p_value <= alpha)
            .map(|row| row.pathway_id.clone())
            .collect();
        let (network_result, graph) = app.network(
            &organism,
            NetworkSelection::Pathways(significant),
            min_shared,
            alpha,
            adjust,
            &options,
            sink,
        )?;
        if !network_result.pairs.is_empty() {
            let pairs_path = out_dir.join("shared_pairs.csv");
            write_pairs_csv(&pairs_path, &network_result.pairs)?;
            written.push(pairs_path);
        }
        if plots && graph.node_count() > 0 {
            written.push(network_plot(&graph, &out_dir)?);
        }
        match output_mode {
            OutputMode::NonInteractive => {
                JsonOutput::print_network(&network_result).into_diagnostic()?
            }
            OutputMode::Interactive => print_network_summary(&network_result),
        }
    }

    if matches!(output_mode, OutputMode::Interactive) {
        print_written(&written);
    }
    Ok(())
}

fn run_network(args: NetworkArgs, store: Store, output_mode: OutputMode) -> miette::Result<()> {
    let resolved = ConfigLoader::resolve(args.config.as_deref())?;
    let organism = resolve_organism(args.organism.as_deref(), &resolved)?;
    let adjust = args.adjust.unwrap_or(resolved.adjust);
    let alpha = resolve_alpha(args.alpha, &resolved)?;
    let min_shared = resolve_min_shared(args.min_shared, &resolved)?;
    let selection = resolve_selection(&args, &resolved)?;
    let options = FetchOptions {
        force: args.refresh,
        offline: args.offline,
    };

    let kegg = KeggHttpClient::new()?;
    let app = App::new(store, kegg);
    let out_dir = resolve_out_dir(args.out.as_deref(), &resolved, app.store());

    let console = ConsoleSink::new();
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &console,
    };

    let (result, graph) =
        app.network(&organism, selection, min_shared, alpha, adjust, &options, sink)?;

    let mut written: Vec<Utf8PathBuf> = Vec::new();
    if !result.pairs.is_empty() {
        let pairs_path = out_dir.join("shared_pairs.csv");
        write_pairs_csv(&pairs_path, &result.pairs)?;
        written.push(pairs_path);
    }
    if args.plots && graph.node_count() > 0 {
        written.push(network_plot(&graph, &out_dir)?);
    }

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_network(&result).into_diagnostic()?,
        OutputMode::Interactive => {
            print_network_summary(&result);
            print_written(&written);
        }
    }
    Ok(())
}

fn run_status(store: Store, output_mode: OutputMode) -> miette::Result<()> {
    let app = App::new(store, NopKegg);
    let console = ConsoleSink::new();
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &console,
    };

    let result = app.status(sink)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_status(&result).into_diagnostic()?,
        OutputMode::Interactive => print_status_summary(&result),
    }
    Ok(())
}

fn run_clear(args: ClearArgs, store: Store, output_mode: OutputMode) -> miette::Result<()> {
    let app = App::new(store, NopKegg);
    let console = ConsoleSink::new();
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &console,
    };

    let result = app.clear(args.cache, sink)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_clear(&result).into_diagnostic()?,
        OutputMode::Interactive => {
            let green = "\x1b[32m";
            let reset = "\x1b[0m";
            let scope = if result.cleared_cache {
                "project store and table cache"
            } else {
                "project store"
            };
            println!("{green}🧹 cleared {scope}{reset}");
        }
    }
    Ok(())
}

/// KEGG client for subcommands that never touch the network.
struct NopKegg;

impl KeggClient for NopKegg {
    fn fetch_pathway_list(&self, _organism: &Organism) -> Result<String, MetseaError> {
        Err(MetseaError::KeggHttp(
            "KEGG client not configured".to_string(),
        ))
    }

    fn fetch_compound_links(&self) -> Result<String, MetseaError> {
        Err(MetseaError::KeggHttp(
            "KEGG client not configured".to_string(),
        ))
    }
}

fn resolve_organism(
    flag: Option<&str>,
    resolved: &ResolvedConfig,
) -> Result<Organism, MetseaError> {
    match flag {
        Some(code) => code.parse(),
        None => resolved
            .organism
            .clone()
            .ok_or(MetseaError::MissingOrganism),
    }
}

fn resolve_query(
    flag: Option<&str>,
    resolved: &ResolvedConfig,
) -> Result<Vec<CompoundId>, MetseaError> {
    match flag {
        Some(path) => load_query(&ResolvedQuery::File(Utf8PathBuf::from(path))),
        None => match &resolved.query {
            Some(source) => load_query(source),
            None => Err(MetseaError::MissingQuery),
        },
    }
}

fn resolve_selection(
    args: &NetworkArgs,
    resolved: &ResolvedConfig,
) -> Result<NetworkSelection, MetseaError> {
    if let Some(list) = &args.pathways {
        let mut ids = Vec::new();
        for part in list.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            ids.push(part.parse::<PathwayId>()?);
        }
        return Ok(NetworkSelection::Pathways(ids));
    }
    if let Some(path) = &args.query {
        let query = load_query(&ResolvedQuery::File(Utf8PathBuf::from(path)))?;
        return Ok(NetworkSelection::Query(query));
    }
    match &resolved.query {
        Some(source) => Ok(NetworkSelection::Query(load_query(source)?)),
        None => Err(MetseaError::MissingQuery),
    }
}

fn resolve_alpha(flag: Option<f64>, resolved: &ResolvedConfig) -> Result<f64, MetseaError> {
    let alpha = flag.unwrap_or(resolved.alpha);
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(MetseaError::InvalidPValue(alpha));
    }
    Ok(alpha)
}

fn resolve_min_shared(flag: Option<usize>, resolved: &ResolvedConfig) -> Result<usize, MetseaError> {
    let min_shared = flag.unwrap_or(resolved.min_shared);
    if min_shared == 0 {
        return Err(MetseaError::InvalidMinShared(min_shared));
    }
    Ok(min_shared)
}

fn resolve_out_dir(flag: Option<&str>, resolved: &ResolvedConfig, store: &Store) -> Utf8PathBuf {
    match flag {
        Some(path) => Utf8PathBuf::from(path),
        None => resolved
            .out
            .clone()
            .unwrap_or_else(|| store.results_dir()),
    }
}

fn print_fetch_summary(result: &FetchResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}📦 metsea fetch: {}{reset}", result.organism);
    for table in &result.tables {
        let (icon, color) = if table.action.contains("cache") {
            ("♻️", green)
        } else if table.action.contains("download") {
            ("⬇️", cyan)
        } else {
            ("•", yellow)
        };
        println!(
            "{color}{icon} {} {} ({}) {} lines{reset}",
            table.table, table.id, table.action, table.lines
        );
        println!("{color}   🗃️  cache: {}{reset}", table.cache_path);
    }
}

fn print_enrich_summary(result: &EnrichResult, alpha: f64) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}🧪 metsea enrichment: {}{reset}", result.organism);
    println!(
        "{green}   {} of {} pathways overlap the {}-compound query (background {}){reset}",
        result.rows.len(),
        result.catalog_pathways,
        result.query_count,
        result.background_size
    );
    if result.rows.is_empty() {
        println!("{yellow}   no pathway shares a compound with the query{reset}");
        return;
    }
    let significant = result
        .rows
        .iter()
        .filter(|row| row.adjusted_p_value <= alpha)
        .count();
    println!(
        "{green}   {significant} at adjusted p <= {alpha} ({} adjustment){reset}",
        result.adjust
    );
    for row in result.rows.iter().take(10) {
        println!(
            "{cyan}   {:<12}{reset} adj p {:9.3e}  ratio {:5.2}  [{}]  {}",
            row.pathway_id.as_str(),
            row.adjusted_p_value,
            row.enrichment_ratio,
            row.meta_ratio,
            row.description
        );
    }
}

fn print_network_summary(result: &NetworkResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}🕸️ metsea network: {}{reset}", result.organism);
    println!(
        "{green}   {} pathways selected, {} pairs with >= {} shared compounds{reset}",
        result.selected.len(),
        result.pairs.len(),
        result.min_shared
    );
    if result.pairs.is_empty() {
        println!("{yellow}   no pathway pair meets the threshold{reset}");
        return;
    }
    for pair in result.pairs.iter().take(10) {
        println!(
            "{cyan}   {:<12} <-> {:<12}{reset} {} shared: {}",
            pair.from.as_str(),
            pair.to.as_str(),
            pair.shared_count,
            pair.shared_ids
        );
    }
}

fn print_status_summary(result: &StatusResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}🗂️ metsea status{reset}");
    println!("   project: {}", result.project_root);
    println!("   cache:   {}", result.cache_root);
    if result.tables.is_empty() {
        println!("{yellow}   no cached KEGG tables (run `metsea fetch`){reset}");
        return;
    }
    for table in &result.tables {
        println!(
            "{green}   {} {} ({} lines, fetched {}){reset}",
            table.table, table.id, table.lines, table.fetched_at
        );
    }
}

fn print_written(written: &[Utf8PathBuf]) {
    let green = "\x1b[32m";
    let reset = "\x1b[0m";
    for path in written {
        println!("{green}   📁 saved: {path}{reset}");
    }
}
