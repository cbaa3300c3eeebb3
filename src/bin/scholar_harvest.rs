use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scholar_harvest::config::{ConfigLoader, ResolvedConfig};
use scholar_harvest::error::HarvestError;
use scholar_harvest::harvest::Harvester;
use scholar_harvest::output::{ConsoleOutput, JsonOutput, OutputMode};
use scholar_harvest::registry::{PaperRegistry, ReferenceGraph};
use scholar_harvest::scholar::ScholarHttpClient;
use scholar_harvest::snapshot::{self, LoadOutcome, SnapshotSummary};
use scholar_harvest::titles::read_titles;

#[derive(Parser)]
#[command(name = "scholar-harvest")]
#[command(about = "Collect paper metadata, reference graphs and arXiv PDFs from Semantic Scholar")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Harvest every title in the titles file and save a snapshot")]
    Run(RunArgs),
    #[command(about = "Summarize a saved snapshot")]
    Inspect(InspectArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    titles: Option<String>,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    pdf_root: Option<String>,

    #[arg(long)]
    snapshot_dir: Option<String>,

    #[arg(long)]
    no_pdf: bool,

    #[arg(long)]
    resume: Option<String>,
}

#[derive(Args)]
struct InspectArgs {
    path: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::ConfigRead(_)
        | HarvestError::ConfigParse(_)
        | HarvestError::TitlesRead(_) => 2,
        error if error.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    config.verbose |= cli.verbose;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Run(args) => run_harvest(args, config, output_mode),
        Commands::Inspect(args) => run_inspect(args, output_mode),
    }
}

fn run_harvest(
    args: RunArgs,
    mut config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    if let Some(titles) = args.titles {
        config.titles = Utf8PathBuf::from(titles);
    }
    if let Some(prefix) = args.prefix {
        config.prefix = prefix;
    }
    if let Some(pdf_root) = args.pdf_root {
        config.pdf_root = Utf8PathBuf::from(pdf_root);
    }
    if let Some(snapshot_dir) = args.snapshot_dir {
        config.snapshot_dir = Utf8PathBuf::from(snapshot_dir);
    }
    if args.no_pdf {
        config.download_pdfs = false;
    }

    let titles = read_titles(&config.titles)?;
    info!(count = titles.len(), path = %config.titles, "loaded titles");

    let (registry, graph) = match args.resume {
        Some(path) => {
            let path = Utf8PathBuf::from(path);
            let outcome = snapshot::load(&path)?;
            if matches!(outcome, LoadOutcome::NotFound) {
                warn!(%path, "resume snapshot not found, starting empty");
            }
            outcome.into_collections()
        }
        None => (PaperRegistry::new(), ReferenceGraph::new()),
    };

    let client = ScholarHttpClient::new(config.client_options())?;
    let mut harvester =
        Harvester::with_collections(client, config.harvest_options(), registry, graph);
    let report = match output_mode {
        OutputMode::Human => harvester.run(&titles, &ConsoleOutput),
        OutputMode::Json => harvester.run(&titles, &JsonOutput),
    };

    let path = config
        .snapshot_dir
        .join(snapshot::snapshot_file_name(&chrono::Local::now(), report.processed));
    let (registry, graph) = harvester.into_collections();
    snapshot::save(&registry, &graph, &path)?;
    info!(%path, "Data saved");

    match output_mode {
        OutputMode::Human => {
            ConsoleOutput::print_report(&report);
            println!("Snapshot: {path}");
            Ok(())
        }
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic(),
    }
}

fn run_inspect(args: InspectArgs, output_mode: OutputMode) -> miette::Result<()> {
    let path = Utf8PathBuf::from(args.path);
    let outcome = snapshot::load(&path)?;
    let summary = SnapshotSummary::from_outcome(&path, &outcome);
    match output_mode {
        OutputMode::Human => {
            ConsoleOutput::print_summary(&summary);
            Ok(())
        }
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic(),
    }
}
