// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use fintrack::api::ApiClient;
use fintrack::config::{Config, LOG_ENV};
use fintrack::{cli, commands, db};

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let conn = db::open_or_init()?;
    let cfg = Config::load(&conn, matches.get_one::<String>("api-url").map(String::as_str))?;
    cfg.theme.install();
    tracing::debug!(api_url = %cfg.api_url, theme = %cfg.theme, "configuration loaded");
    let api = ApiClient::new(&cfg.api_url)?;

    match matches.subcommand() {
        Some(("config", sub)) => commands::settings::handle(&conn, &cfg, sub)?,
        Some(("expense", sub)) => commands::expenses::handle(&api, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&api, sub)?,
        Some(("import", sub)) => commands::importer::handle(&api, sub)?,
        Some(("recon", sub)) => commands::reconcile::handle(&api, sub)?,
        Some(("splitwise", sub)) => commands::splitwise::handle(&api, &cfg, sub)?,
        Some(("dashboard", sub)) => commands::dashboard::handle(&api, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
