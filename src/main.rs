//! marksheetd: ranked marksheet sidecar speaking JSON lines on stdin/stdout.

mod config;
mod db;
mod error;
mod export;
mod grading;
mod ipc;
mod ranking;
mod records;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "marksheetd")]
#[command(version)]
#[command(about = "Ranked student marksheets over a JSON-lines pipe")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

// stdout carries responses only; logs go to stderr.
fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("marksheetd: logging already initialised");
    }
}

fn startup(cli: &Cli) -> Result<ipc::AppState> {
    let config = match &cli.config {
        Some(path) => config::Config::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => config::Config::default(),
    };

    let roster = match &config.roster.path {
        Some(p) => db::load_roster(&config.resolve(p))?,
        None => records::demo_records(),
    };
    let mut conn = db::open_store()?;
    let seeded = db::seed(&mut conn, &roster)?;
    let backend = export::backend_from_config(&config);

    info!(
        records = seeded,
        institution = %config.institution.name,
        backend = ?config.export.backend,
        "marksheetd ready"
    );
    Ok(ipc::AppState {
        config,
        db: conn,
        backend,
        selected: None,
    })
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut state = match startup(&cli) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
