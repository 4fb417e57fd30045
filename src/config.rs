//! Server configuration: CLI flags first, then environment, then defaults.

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Pizza ranking backend.
///
/// Stores ratings in a spreadsheet-style workbook and serves them over a
/// small JSON API.
#[derive(Parser, Debug, Default)]
#[command(name = "website", version, about)]
pub struct Cli {
    /// Listen address [env: PIZZA_BIND, or PORT] [default: 0.0.0.0:5001]
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Workbook file, gzip-compressed bincode [env: PIZZA_WORKBOOK]
    #[arg(long, short = 'w')]
    pub workbook: Option<PathBuf>,

    /// CSV used to seed the spots sheet when it is empty [env: PIZZA_SPOTS_CSV]
    #[arg(long, short = 's')]
    pub spots_csv: Option<PathBuf>,

    /// Allowed CORS origin, repeatable [env: PIZZA_ALLOWED_ORIGINS, comma-separated]
    #[arg(long = "allow-origin", short = 'o')]
    pub allow_origin: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub workbook: Option<PathBuf>,
    pub spots_csv: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_cli_and_env(cli: Cli) -> Self {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve(cli: Cli, env: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = cli
            .bind
            .or_else(|| env("PIZZA_BIND"))
            .or_else(|| env("PORT").map(|port| format!("0.0.0.0:{port}")))
            .unwrap_or_else(|| format!("0.0.0.0:{DEFAULT_PORT}"));

        let workbook = cli
            .workbook
            .or_else(|| env("PIZZA_WORKBOOK").map(PathBuf::from));

        let spots_csv = cli
            .spots_csv
            .or_else(|| env("PIZZA_SPOTS_CSV").map(PathBuf::from));

        let mut allowed_origins = cli.allow_origin;
        if allowed_origins.is_empty() {
            allowed_origins = env("PIZZA_ALLOWED_ORIGINS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
        }
        if allowed_origins.is_empty() {
            allowed_origins.push(DEFAULT_ALLOWED_ORIGIN.to_string());
        }

        Self {
            bind_addr,
            workbook,
            spots_csv,
            allowed_origins,
        }
    }
}
