use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    cli::Cli::parse().run()
}
