use clap::Parser;

/// Runs the weekly batch: fetch, diff, persist, notify. Storage location
/// and credentials come from the environment, not flags.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Args::parse();

    cf_weekly::run_weekly_update().await?;

    Ok(())
}
