// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{get_setting, set_setting};
use anyhow::{Result, bail};
use once_cell::sync::OnceCell;
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const API_URL_ENV: &str = "FINTRACK_API_URL";
pub const LOG_ENV: &str = "FINTRACK_LOG";

const KEY_API_URL: &str = "api_url";
const KEY_THEME: &str = "theme";
const KEY_SPLITWISE_USER: &str = "splitwise_user";
const KEY_SPLITWISE_USER_ID: &str = "splitwise_user_id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

static THEME: OnceCell<Theme> = OnceCell::new();

impl Theme {
    /// Process-wide theme; light until `install` runs.
    pub fn current() -> Theme {
        THEME.get().copied().unwrap_or_default()
    }

    /// First call wins; later calls are ignored.
    pub fn install(self) {
        let _ = THEME.set(self);
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => bail!("Unknown theme '{}', expected light|dark", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub api_url: String,
    pub theme: Theme,
    /// Name the Splitwise listing is requested for.
    pub splitwise_user: Option<String>,
    /// Splitwise user id whose owed share is reported.
    pub splitwise_user_id: Option<String>,
}

impl Config {
    /// Flag beats environment beats stored setting beats the default.
    pub fn load(conn: &Connection, flag: Option<&str>) -> Result<Config> {
        let env = std::env::var(API_URL_ENV).ok();
        let stored = get_setting(conn, KEY_API_URL)?;
        Ok(Config {
            api_url: resolve_api_url(flag, env.as_deref(), stored.as_deref()),
            theme: stored_theme(conn)?,
            splitwise_user: get_setting(conn, KEY_SPLITWISE_USER)?,
            splitwise_user_id: get_setting(conn, KEY_SPLITWISE_USER_ID)?,
        })
    }
}

pub fn resolve_api_url(flag: Option<&str>, env: Option<&str>, stored: Option<&str>) -> String {
    [flag, env, stored]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_API_URL)
        .trim_end_matches('/')
        .to_string()
}

/// A stored value that no longer parses falls back to light.
pub fn stored_theme(conn: &Connection) -> Result<Theme> {
    Ok(get_setting(conn, KEY_THEME)?
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

pub fn save_theme(conn: &Connection, theme: Theme) -> Result<()> {
    set_setting(conn, KEY_THEME, theme.as_str())
}

pub fn save_api_url(conn: &Connection, url: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("API URL must start with http:// or https://, got '{}'", url);
    }
    set_setting(conn, KEY_API_URL, url.trim_end_matches('/'))
}

/// Stores the Splitwise user name and, when given, their user id.
pub fn save_splitwise_user(conn: &Connection, name: &str, user_id: Option<&str>) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Splitwise user name must not be empty");
    }
    set_setting(conn, KEY_SPLITWISE_USER, name)?;
    if let Some(id) = user_id.map(str::trim).filter(|id| !id.is_empty()) {
        set_setting(conn, KEY_SPLITWISE_USER_ID, id)?;
    }
    Ok(())
}
