use clap::Parser;
use dotsol_maker::cli::{run, Cli};
use dotsol_maker::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
