use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use conda_news::check::UpdateCheck;
use conda_news::config::CheckConfig;
use conda_news::mirror::MirrorTable;
use conda_news::repodata::http::HttpRepoDataSource;
use conda_news::report::ReportLine;

#[derive(Parser)]
#[command(name = "conda-news")]
#[command(version, about = "Report new conda package builds and their download URLs")]
struct Cli {
    /// Path to the TOML configuration file
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = CheckConfig::load(&cli.config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: CheckConfig) -> anyhow::Result<()> {
    let mirrors = MirrorTable::new(config.mirrored_channels.iter().map(String::as_str));
    let source = HttpRepoDataSource::new(config.cache_dir.clone());
    let check = UpdateCheck::new(&config)?;

    let records = check.run(&source).await?;

    for record in &records {
        println!("{}", ReportLine::from_record(record, &mirrors));
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
