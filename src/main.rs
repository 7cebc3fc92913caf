use std::sync::Arc;

use clap::Parser;

use defguard_client_lib::bootstrap::{load_for_host, tracing::init_tracing_subscriber};
use defguard_client_lib::cli::{run, Cli};
use defguard_client_lib::terminal::Console;
use dg_infra::fs::app_data_dir::logs_dir;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_for_host(cli.config.clone())?;
    init_tracing_subscriber(&logs_dir(&config.data_dir), cli.verbose)?;

    run(cli, config, Arc::new(Console::stdio())).await
}
