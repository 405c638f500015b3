use anyhow::Result;
use clap::Parser;
use innoscope_rs::cli::Args;
use innoscope_rs::launch;

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("INNOSCOPE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("❌ {}", innoscope_rs::error::public_message(&error));
        tracing::debug!("{:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // .env 中的 API KEY 需要在加载配置之前生效
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.quiet, args.verbose)?;

    let stream = args.stream;
    let command = args.command.clone();
    let config = args.into_config()?;

    launch(&config, command, stream).await
}
