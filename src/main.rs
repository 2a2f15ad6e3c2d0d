// Entrypoint for the CLI application.
// - Keeps `main` small: parse config, authorize, then hand the API client to
//   the navigator loop.
// - Returns `anyhow::Result` so fatal errors print with context.

use anyhow::Context;
use clap::Parser;
use classroom_cli::api::ApiClient;
use classroom_cli::auth;
use classroom_cli::config::Config;
use classroom_cli::launcher::SystemLauncher;
use classroom_cli::navigator::Navigator;
use classroom_cli::ui::{self, TerminalScreen};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Logs go to stderr so they never interleave with the menus on stdout.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    println!("be patient...");
    let token = auth::ensure_token(&config, ui::ask_authorization_code)
        .context("Failed to authorize with Google")?;
    let api = ApiClient::from_config(&config, &token.access_token)?;

    // Blocks until the user picks "exit" from the course list.
    let mut navigator = Navigator::new(
        api.clone(),
        api,
        SystemLauncher::from_config(&config),
        TerminalScreen::new(),
        config.download_dir.clone(),
    );
    navigator.run()?;
    println!("goodbye");
    Ok(())
}
