use anyhow::Result;
use cfp_rankings::cli::{doctor, extract_cmd, inspect_cmd, scrape_cmd};
use cfp_rankings::scrape::CancelToken;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cfp-rankings")]
#[command(about = "Scrape weekly College Football Playoff rankings")]
#[command(version)]
struct Cli {
    /// Only print errors
    #[arg(long, short, global = true)]
    quiet: bool,
    /// Show per-week detail and debug logs
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Machine-readable output on stdout
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every week of every season in range and export CSVs
    Scrape(scrape_cmd::ScrapeArgs),
    /// Run extraction on a saved HTML snapshot
    Extract(extract_cmd::ExtractArgs),
    /// Load the rankings page and describe its dropdowns and tables
    Inspect(inspect_cmd::InspectArgs),
    /// Check that a browser is available and output locations are writable
    Doctor,
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "cfp_rankings=debug"
    } else if cli.quiet {
        "cfp_rankings=warn"
    } else {
        "cfp_rankings=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_ansi(!cli.no_color).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The output helpers read these.
    if cli.quiet {
        std::env::set_var("RANKINGS_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("RANKINGS_VERBOSE", "1");
    }
    if cli.json {
        std::env::set_var("RANKINGS_JSON", "1");
    }
    if cli.no_color {
        std::env::set_var("RANKINGS_NO_COLOR", "1");
    }
    init_tracing(&cli);

    match cli.command {
        Commands::Scrape(args) => {
            let cancel = CancelToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, finishing current week");
                    on_signal.cancel();
                }
            });
            scrape_cmd::run(args, cancel).await
        }
        Commands::Extract(args) => extract_cmd::run(args).await,
        Commands::Inspect(args) => inspect_cmd::run(args).await,
        Commands::Doctor => doctor::run().await,
    }
}
