// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{save_api_url, save_splitwise_user, save_theme, stored_theme, Config, Theme};
use crate::db::db_path;
use crate::utils::pretty_table;
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &Connection, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => show(cfg)?,
        Some(("set-api-url", sub)) => {
            let url = sub.get_one::<String>("url").context("url is required")?;
            save_api_url(conn, url)?;
            println!("API URL set to {}", url.trim().trim_end_matches('/'));
        }
        Some(("set-splitwise-user", sub)) => {
            let name = sub.get_one::<String>("name").context("name is required")?;
            let id = sub.get_one::<String>("id").map(String::as_str);
            save_splitwise_user(conn, name, id)?;
            println!("Splitwise user set to {}", name.trim());
        }
        Some(("theme", sub)) => {
            let mode = sub.get_one::<String>("mode").context("mode is required")?;
            let theme = set_theme(conn, mode)?;
            println!("Theme set to {}", theme);
        }
        _ => {}
    }
    Ok(())
}

fn show(cfg: &Config) -> Result<()> {
    let db = db_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "-".into());
    let rows = vec![
        vec!["api_url".to_string(), cfg.api_url.clone()],
        vec!["theme".to_string(), cfg.theme.to_string()],
        vec![
            "splitwise user".to_string(),
            cfg.splitwise_user.clone().unwrap_or_else(|| "-".into()),
        ],
        vec![
            "splitwise user id".to_string(),
            cfg.splitwise_user_id.clone().unwrap_or_else(|| "-".into()),
        ],
        vec!["settings db".to_string(), db],
    ];
    println!("{}", pretty_table(&["Setting", "Value"], rows));
    Ok(())
}

/// Applies `light`, `dark` or `toggle` and stores the result.
pub fn set_theme(conn: &Connection, mode: &str) -> Result<Theme> {
    let theme = match mode {
        "toggle" => stored_theme(conn)?.toggled(),
        other => other.parse()?,
    };
    save_theme(conn, theme)?;
    Ok(theme)
}
